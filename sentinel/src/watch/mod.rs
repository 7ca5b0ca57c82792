//! Periodic detector loop
//!
//! One tick drives stall, no-endpoints, consecutive-miss and endpoint
//! downtime detection and turns their edges into alarms.

pub mod detectors;

pub use detectors::{
    EndpointDownDetector, MissDetector, NoEndpointsDetector, StallDetector, Transition,
    NO_ENDPOINTS_MESSAGE,
};

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::constants::alerts::{STALLED_PREFIX, WATCH_INTERVAL};
use crate::constants::SENTINEL_ENTITY;
use crate::health::EndpointTracker;
use crate::sequencer::{SequencerId, SequencerSet};
use crate::services::AlertService;

pub struct Watcher {
    sequencers: Arc<SequencerSet>,
    endpoints: Arc<EndpointTracker>,
    alerts: AlertService,
    stall: StallDetector,
    no_endpoints: NoEndpointsDetector,
    misses: Vec<(SequencerId, MissDetector)>,
    endpoint_down: EndpointDownDetector,
}

impl Watcher {
    pub fn new(
        config: &Config,
        sequencers: Arc<SequencerSet>,
        endpoints: Arc<EndpointTracker>,
        alerts: AlertService,
        started: DateTime<Utc>,
    ) -> Self {
        let misses = config
            .sequencers
            .values()
            .enumerate()
            .map(|(i, seq)| {
                (
                    SequencerId::new(i),
                    MissDetector::new(
                        seq.alerts.consecutive_enabled,
                        u64::from(seq.alerts.consecutive_missed),
                    ),
                )
            })
            .collect();

        Self {
            sequencers,
            endpoints,
            alerts,
            stall: StallDetector::new(
                config.stalled_enabled,
                config.stalled_minutes,
                &config.chain_id,
                started,
            ),
            no_endpoints: NoEndpointsDetector::new(
                config.alert_if_no_servers,
                config.node_down_alert_minutes,
            ),
            misses,
            endpoint_down: EndpointDownDetector::new(
                config.node_down_alert_minutes,
                &config.node_down_alert_severity,
            ),
        }
    }

    /// Picks up alarms that were open before a restart so they can resolve.
    pub async fn sync_with_cache(&mut self) {
        let cache = self.alerts.cache().clone();

        self.stall
            .set_alarmed(cache.is_active(SENTINEL_ENTITY, self.stall.message()).await);
        self.no_endpoints
            .set_alarmed(cache.is_active(SENTINEL_ENTITY, NO_ENDPOINTS_MESSAGE).await);

        for (id, detector) in self.misses.iter_mut() {
            let name = self.sequencers.name(*id);
            detector.set_alarmed(cache.is_active(name, &detector.message()).await);
        }

        for (_, endpoint) in self.endpoints.snapshot().await {
            let message = self.endpoint_down.message(&endpoint.rpc_url);
            if cache.is_active(SENTINEL_ENTITY, &message).await {
                self.endpoint_down.set_alarmed(&endpoint.rpc_url);
            }
        }
    }

    pub async fn run(mut self, cancel: CancellationToken) {
        self.sync_with_cache().await;
        info!("⚙️ alarm watcher started");

        let mut interval = tokio::time::interval(WATCH_INTERVAL);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => self.tick(Utc::now()).await,
            }
        }
    }

    pub async fn tick(&mut self, now: DateTime<Utc>) {
        self.check_stalled(now).await;
        self.check_no_endpoints(now).await;
        self.check_misses().await;
        self.check_endpoints(now).await;
    }

    async fn check_stalled(&mut self, now: DateTime<Utc>) {
        let last_block = self.sequencers.monitor().await.last_block_time;
        match self.stall.check(last_block, now) {
            Some(Transition::Raise) => {
                warn!("❌ {}", self.stall.message());
                self.alerts
                    .raise(SENTINEL_ENTITY, self.stall.message(), "critical", SENTINEL_ENTITY)
                    .await;
            }
            Some(Transition::Clear) => {
                info!("🟢 blocks are being produced again");
                self.alerts
                    .resolve(SENTINEL_ENTITY, self.stall.message(), SENTINEL_ENTITY)
                    .await;
                self.alerts
                    .cache()
                    .clear_prefix(SENTINEL_ENTITY, STALLED_PREFIX)
                    .await;
                self.alerts.refresh_count(SENTINEL_ENTITY).await;
            }
            None => {}
        }
    }

    async fn check_no_endpoints(&mut self, now: DateTime<Utc>) {
        match self
            .no_endpoints
            .check(self.endpoints.no_endpoints_reported(), now) {
            Some(Transition::Raise) => {
                self.alerts
                    .raise(SENTINEL_ENTITY, NO_ENDPOINTS_MESSAGE, "critical", SENTINEL_ENTITY)
                    .await;
            }
            Some(Transition::Clear) => {
                self.alerts
                    .resolve(SENTINEL_ENTITY, NO_ENDPOINTS_MESSAGE, SENTINEL_ENTITY)
                    .await;
            }
            None => {}
        }
    }

    async fn check_misses(&mut self) {
        for (id, detector) in self.misses.iter_mut() {
            let (consecutive, priority) = self
                .sequencers
                .with(*id, |s| (s.stats.consecutive_miss, s.alerts.consecutive_priority.clone()))
                .await;
            let name = self.sequencers.name(*id);
            let dedup_id = format!("{}consecutive", self.sequencers.address(*id));

            match detector.check(consecutive) {
                Some(Transition::Raise) => {
                    self.alerts
                        .raise(name, &detector.message(), &priority, &dedup_id)
                        .await;
                }
                Some(Transition::Clear) => {
                    self.alerts
                        .resolve(name, &detector.message(), &dedup_id)
                        .await;
                }
                None => {}
            }
        }
    }

    async fn check_endpoints(&mut self, now: DateTime<Utc>) {
        for (id, endpoint) in self.endpoints.snapshot().await {
            let message = self.endpoint_down.message(&endpoint.rpc_url);
            match self.endpoint_down.check(&endpoint, now) {
                Some(Transition::Raise) => {
                    warn!("❌ RPC node {} is down", endpoint.rpc_url);
                    let severity = self.endpoint_down.severity().to_string();
                    self.alerts
                        .raise(SENTINEL_ENTITY, &message, &severity, &endpoint.rpc_url)
                        .await;
                }
                Some(Transition::Clear) => {
                    info!("🟢 RPC node {} is back", endpoint.rpc_url);
                    self.alerts
                        .resolve(SENTINEL_ENTITY, &message, &endpoint.rpc_url)
                        .await;
                }
                None => {}
            }

            if endpoint.was_down {
                self.endpoints.clear_was_down(id).await;
            }
        }
    }
}
