//! Wires the monitor together and runs it until cancelled

use anyhow::{anyhow, Result};
use chrono::Utc;
use futures::future::join_all;
use reqwest::Client as HttpClient;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::alarm_cache::AlarmCache;
use crate::config::Config;
use crate::constants::alerts::{DELIVERY_TIMEOUT, QUEUE_SIZE};
use crate::constants::endpoints::{HEALTH_CHECK_INTERVAL, PROBE_TIMEOUT, RECONNECT_BACKOFF};
use crate::constants::epochs::INDEXER_TIMEOUT;
use crate::constants::SENTINEL_ENTITY;
use crate::epoch::{EpochTracker, IndexerClient};
use crate::errors::EndpointError;
use crate::events::{run_session, SessionContext};
use crate::health::EndpointTracker;
use crate::persistence::SavedState;
use crate::rpc::ConnectionManager;
use crate::sequencer::SequencerSet;
use crate::services::{AlertDispatcher, AlertService};
use crate::watch::Watcher;
use crate::web::{start_web_server, AppState, Dashboard};

pub const NO_ENDPOINTS_ERROR: &str = "no usable RPC endpoints available";

fn http_client(timeout: Duration) -> Result<HttpClient> {
    HttpClient::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| anyhow!("Failed to build HTTP client: {}", e))
}

/// Runs every monitor task until `cancel` fires, then persists state.
pub async fn run(config: Arc<Config>, cancel: CancellationToken) -> Result<()> {
    let sequencer_set_url = config.sequencer_set_url()?;
    let l2_rpc_url = config.l2_rpc_url()?;
    let indexer_http = http_client(INDEXER_TIMEOUT)?;

    let endpoints = Arc::new(EndpointTracker::new(
        &config.node_infos,
        &config.chain_id,
        http_client(PROBE_TIMEOUT)?,
    ));
    let connections = Arc::new(ConnectionManager::new(endpoints.clone()));
    let sequencers = Arc::new(SequencerSet::new(&config));
    let alarms = Arc::new(AlarmCache::new(config.flap_window()));
    let dashboard = Arc::new(Dashboard::new(config.hide_logs));

    SavedState::load(&config.state_file)
        .await
        .apply(&sequencers, &alarms, &endpoints)
        .await;

    let (queue_tx, queue_rx) = mpsc::channel(QUEUE_SIZE);
    let alerts = AlertService::new(queue_tx, alarms.clone(), sequencers.clone());
    for id in sequencers.ids() {
        alerts.refresh_count(sequencers.name(id)).await;
    }
    alerts.refresh_count(SENTINEL_ENTITY).await;

    info!(
        "⚙️ monitoring {} sequencers on {} through {} RPC endpoints",
        sequencers.ids().count(),
        config.chain_id,
        config.node_infos.len()
    );

    let mut tasks: Vec<JoinHandle<()>> = Vec::new();

    let dispatcher = AlertDispatcher::new(queue_rx, alarms.clone(), http_client(DELIVERY_TIMEOUT)?);
    tasks.push(tokio::spawn(dispatcher.run(cancel.clone())));

    let epochs = EpochTracker::new(
        IndexerClient::new(indexer_http.clone(), &sequencer_set_url),
        indexer_http,
        &l2_rpc_url,
        sequencers.clone(),
        alerts.clone(),
    );
    tasks.push(tokio::spawn(epochs.run(cancel.clone())));

    let watcher = Watcher::new(
        &config,
        sequencers.clone(),
        endpoints.clone(),
        alerts.clone(),
        Utc::now(),
    );
    tasks.push(tokio::spawn(watcher.run(cancel.clone())));

    tasks.push(tokio::spawn(health_loop(
        connections.clone(),
        sequencers.clone(),
        cancel.clone(),
    )));

    if config.enable_dashboard {
        let addr = config.listen_addr()?;
        let state = AppState::new(dashboard.clone(), sequencers.clone(), endpoints.clone());
        let web_cancel = cancel.clone();
        tasks.push(tokio::spawn(async move {
            if let Err(e) = start_web_server(addr, state, web_cancel).await {
                error!("❌ dashboard server failed: {}", e);
            }
        }));
    }

    let ctx = SessionContext {
        sequencers: sequencers.clone(),
        alarms: alarms.clone(),
        dashboard,
        idle_timeout: config.idle_timeout(),
    };
    stream_loop(&connections, &ctx, &alerts, &cancel).await;

    join_all(tasks).await;

    SavedState::capture(&sequencers, &alarms, &endpoints)
        .await
        .save(&config.state_file)
        .await
}

/// Connects, runs one event session, and reconnects with backoff until cancelled.
async fn stream_loop(
    connections: &ConnectionManager,
    ctx: &SessionContext,
    alerts: &AlertService,
    cancel: &CancellationToken,
) {
    while !cancel.is_cancelled() {
        let was_unavailable = connections.tracker().no_endpoints();

        match connections.connect().await {
            Ok(connection) => {
                refresh_validators(connections, &ctx.sequencers).await;

                let endpoint = connection.endpoint;
                let rpc_url = connection.rpc_url.clone();
                match run_session(connection, ctx, cancel).await {
                    Ok(()) => break,
                    Err(e) => {
                        warn!("❌ event session on {} ended: {}", rpc_url, e);
                        ctx.dashboard
                            .log(&format!("❌ event session on {} ended: {}", rpc_url, e))
                            .await;
                        let reason = EndpointError::Unreachable {
                            url: rpc_url,
                            reason: e.to_string(),
                        };
                        connections
                            .tracker()
                            .mark_down(endpoint, &reason, Utc::now())
                            .await;
                    }
                }
            }
            Err(e) => {
                error!("❌ {}", e);
                if !was_unavailable {
                    alerts.cache().clear_entity(SENTINEL_ENTITY).await;
                    ctx.sequencers
                        .set_last_error(SENTINEL_ENTITY, NO_ENDPOINTS_ERROR)
                        .await;
                    alerts.refresh_count(SENTINEL_ENTITY).await;
                }
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(RECONNECT_BACKOFF) => {}
        }
    }
    info!("event stream stopped");
}

async fn health_loop(
    connections: Arc<ConnectionManager>,
    sequencers: Arc<SequencerSet>,
    cancel: CancellationToken,
) {
    let start = tokio::time::Instant::now() + HEALTH_CHECK_INTERVAL;
    let mut interval = tokio::time::interval_at(start, HEALTH_CHECK_INTERVAL);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                connections.tracker().health_pass().await;
                refresh_validators(&connections, &sequencers).await;

                if let Ok(status) = connections.status().await {
                    debug!(
                        "active node {} at height {}",
                        connections.active_url().await.unwrap_or_default(),
                        status.sync_info.latest_block_height
                    );
                }
            }
        }
    }
}

async fn refresh_validators(connections: &ConnectionManager, sequencers: &SequencerSet) {
    match connections.validator_set().await {
        Ok(set) => sequencers.update_validators(&set).await,
        Err(e) => warn!("could not refresh validator set: {}", e),
    }
}
