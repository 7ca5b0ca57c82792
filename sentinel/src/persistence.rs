//! State file: alarms, block history, down endpoints and epoch snapshots
//!
//! Read once at startup and written on shutdown.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tokio::fs;
use tracing::{info, warn};

use crate::alarm_cache::{AlarmCache, AlarmState};
use crate::epoch::EpochSnapshot;
use crate::errors::SentinelError;
use crate::health::EndpointTracker;
use crate::sequencer::SequencerSet;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SavedState {
    #[serde(default)]
    pub alarms: AlarmState,
    #[serde(default)]
    pub blocks: HashMap<String, Vec<i32>>,
    #[serde(default)]
    pub nodes_down: HashMap<String, DateTime<Utc>>,
    #[serde(default)]
    pub sequencers: HashMap<String, EpochSnapshot>,
}

impl SavedState {
    /// A missing or unreadable file yields an empty state.
    pub async fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) => {
                warn!("cannot read state file {}, starting fresh: {}", path.display(), e);
                return Self::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(state) => {
                info!("⚙️ restored state from {}", path.display());
                state
            }
            Err(e) => {
                warn!("cannot parse state file {}, starting fresh: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_vec_pretty(self)
            .map_err(|e| SentinelError::Persistence(format!("cannot serialize state: {}", e)))?;

        let tmp = path.with_extension("tmp");
        fs::write(&tmp, content)
            .await
            .map_err(|e| SentinelError::Persistence(format!("cannot write {}: {}", tmp.display(), e)))?;
        fs::rename(&tmp, path)
            .await
            .map_err(|e| {
                SentinelError::Persistence(format!("cannot move state file into {}: {}", path.display(), e))
            })?;

        info!("saved state to {}", path.display());
        Ok(())
    }

    pub async fn capture(
        sequencers: &SequencerSet,
        alarms: &AlarmCache,
        endpoints: &EndpointTracker,
    ) -> Self {
        Self {
            alarms: alarms.snapshot().await,
            blocks: sequencers.blocks_by_name().await,
            nodes_down: endpoints.down_since_by_url().await,
            sequencers: sequencers.epochs_by_name().await,
        }
    }

    pub async fn apply(
        self,
        sequencers: &SequencerSet,
        alarms: &AlarmCache,
        endpoints: &EndpointTracker,
    ) {
        alarms.restore(self.alarms).await;
        endpoints.restore_down_since(&self.nodes_down).await;
        sequencers.restore(self.blocks, self.sequencers).await;
    }
}
