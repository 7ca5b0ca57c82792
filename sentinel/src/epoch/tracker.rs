use futures::future::join_all;
use reqwest::Client as HttpClient;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::indexer::IndexerClient;
use super::types::{parse_block_number, Epoch, EpochSnapshot};
use crate::constants::epochs::{FETCH_COUNT, POLL_INTERVAL};
use crate::errors::SentinelError;
use crate::rpc::l2;
use crate::sequencer::{SequencerId, SequencerSet};
use crate::services::AlertService;

/// Membership change between two snapshots of one sequencer
#[derive(Debug, Clone, PartialEq)]
pub enum EpochTransition {
    /// Indexer stopped returning epochs
    Unavailable,
    /// Epochs are back after being unavailable, or the first snapshot arrived
    Recovered,
    /// An epoch the indexer should still return has vanished
    Recommitted(Epoch),
    /// A new epoch was assigned
    NewMiningTask(Epoch),
}

/// Compares snapshots. `window` is how many epochs the indexer returns at
/// most; older epochs falling off a full window are not a recommit.
pub fn diff_snapshots(old: &EpochSnapshot, new: &EpochSnapshot, window: usize) -> Option<EpochTransition> {
    match (old.is_empty(), new.is_empty()) {
        (true, true) => return None,
        (false, true) => return Some(EpochTransition::Unavailable),
        (true, false) => return Some(EpochTransition::Recovered),
        (false, false) => {}
    }

    if let Some(gone) = vanished(old, new, window) {
        return Some(EpochTransition::Recommitted(gone.clone()));
    }

    new.latest()
        .filter(|latest| !old.contains(&latest.id))
        .map(|latest| EpochTransition::NewMiningTask(latest.clone()))
}

fn vanished<'a>(old: &'a EpochSnapshot, new: &EpochSnapshot, window: usize) -> Option<&'a Epoch> {
    let latest = old.latest()?;
    if !new.contains(&latest.id) {
        return Some(latest);
    }

    let full = new.epochs.len() >= window;
    let oldest_block = new.epochs.last().and_then(|e| parse_block_number(&e.block));

    old.epochs.iter().find(|epoch| {
        if new.contains(&epoch.id) {
            return false;
        }
        if !full {
            return true;
        }
        // full window: only count epochs newer than the oldest one returned
        matches!(
            (parse_block_number(&epoch.block), oldest_block),
            (Some(block), Some(oldest)) if block >= oldest
        )
    })
}

pub fn unavailable_message(name: &str, address: &str) -> String {
    format!("🚨 cannot fetch sequencer info : {:>20} ({})", name, address)
}

pub const RECOMMITTED_MESSAGE: &str = "❌ sequencer has recommitted!! please check your sequencer status";

pub fn mining_message(epoch: &Epoch) -> String {
    format!(
        "💎 sequencer has new mining task\t\tspanId: {:>4}, startBlock: {:>8}, endBlock: {:>8}, recommitted: {}",
        epoch.id, epoch.start_block, epoch.end_block, epoch.recommitted
    )
}

/// Polls the indexer for every sequencer and raises membership alerts.
pub struct EpochTracker {
    indexer: IndexerClient,
    http_client: HttpClient,
    l2_rpc_url: String,
    sequencers: Arc<SequencerSet>,
    alerts: AlertService,
}

impl EpochTracker {
    pub fn new(
        indexer: IndexerClient,
        http_client: HttpClient,
        l2_rpc_url: &str,
        sequencers: Arc<SequencerSet>,
        alerts: AlertService,
    ) -> Self {
        Self {
            indexer,
            http_client,
            l2_rpc_url: l2_rpc_url.to_string(),
            sequencers,
            alerts,
        }
    }

    pub async fn run(self, cancel: CancellationToken) {
        info!("⚙️ watching for sequencer-set changes");
        let mut interval = tokio::time::interval(POLL_INTERVAL);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => self.poll_once().await,
            }
        }
    }

    pub async fn poll_once(&self) {
        let height = match l2::fetch_block_number(&self.http_client, &self.l2_rpc_url).await {
            Ok(height) => Some(height),
            Err(e) => {
                warn!("could not fetch L2 height: {}", e);
                None
            }
        };

        join_all(self.sequencers.ids().map(|id| self.poll_sequencer(id, height))).await;
    }

    async fn poll_sequencer(&self, id: SequencerId, height: Option<u64>) {
        let name = self.sequencers.name(id);
        let address = self.sequencers.address(id);

        let epochs = match self.indexer.fetch_epochs(address).await {
            Ok(epochs) => epochs,
            Err(e) => {
                warn!("{} ({})", SentinelError::Indexer(e.to_string()), name);
                return;
            }
        };

        let new = EpochSnapshot::new(epochs, height);
        let old = self.sequencers.with(id, |s| s.epochs.clone()).await;
        if new == old {
            return;
        }

        if let Some(transition) = diff_snapshots(&old, &new, FETCH_COUNT as usize) {
            self.handle(id, transition).await;
        }

        self.sequencers.with_mut(id, |s| s.epochs = new).await;
    }

    async fn handle(&self, id: SequencerId, transition: EpochTransition) {
        let name = self.sequencers.name(id);
        let address = self.sequencers.address(id);

        match transition {
            EpochTransition::Unavailable => {
                self.alerts
                    .raise(name, &unavailable_message(name, address), "warn", &format!("{}sequencer-set", address))
                    .await;
            }
            EpochTransition::Recovered => {
                self.alerts
                    .resolve_if_active(name, &unavailable_message(name, address), &format!("{}sequencer-set", address))
                    .await;
            }
            EpochTransition::Recommitted(epoch) => {
                warn!("❌ {} epoch {} vanished from the sequencer set", name, epoch.id);
                self.alerts
                    .raise_transient(name, RECOMMITTED_MESSAGE, "critical", &format!("{}respan", address))
                    .await;
            }
            EpochTransition::NewMiningTask(epoch) => {
                let message = mining_message(&epoch);
                info!("{} {}", name, message);
                if self.sequencers.with(id, |s| s.alerts.notify_mining).await {
                    self.alerts
                        .raise_transient(name, &message, "info", &format!("{}mining", address))
                        .await;
                } else {
                    debug!("mining notifications disabled for {}", name);
                }
            }
        }
    }
}
