//! Monitored sequencers and the monitor's own status
//!
//! Sequencers are created once from configuration and addressed by
//! `SequencerId` everywhere inside the process. Names only matter for alarm
//! keys, the state file and the dashboard.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::config::{AlertConfig, ChannelSettings, Config};
use crate::constants::history::{NO_DATA, SHOW_BLOCKS};
use crate::constants::SENTINEL_ENTITY;
use crate::epoch::EpochSnapshot;
use crate::events::{Finalization, StatusType};
use crate::rpc::{Validator, ValidatorSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SequencerId(usize);

impl SequencerId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignStats {
    pub signed: u64,
    pub proposed: u64,
    pub total_miss: u64,
    pub prevote_miss: u64,
    pub precommit_miss: u64,
    pub consecutive_miss: u64,
}

#[derive(Debug, Clone)]
pub struct Sequencer {
    pub name: String,
    /// As configured, `0x` prefixed
    pub address: String,
    pub alerts: AlertConfig,
    pub channels: ChannelSettings,
    pub validator: Option<Validator>,
    /// Newest first, always `SHOW_BLOCKS` long
    pub blocks: Vec<i32>,
    pub stats: SignStats,
    pub epochs: EpochSnapshot,
    pub active_alerts: usize,
    pub last_error: String,
}

impl Sequencer {
    fn new(name: &str, address: &str, alerts: AlertConfig, channels: ChannelSettings) -> Self {
        Self {
            name: name.to_string(),
            address: address.to_string(),
            alerts,
            channels,
            validator: None,
            blocks: vec![NO_DATA; SHOW_BLOCKS],
            stats: SignStats::default(),
            epochs: EpochSnapshot::default(),
            active_alerts: 0,
            last_error: String::new(),
        }
    }

    pub fn jailed(&self) -> bool {
        self.validator.as_ref().map(|v| v.jailed).unwrap_or(false)
    }

    /// Applies a final status for one height to counters and history.
    pub fn record(&mut self, status: StatusType) {
        match status {
            StatusType::Missed => {
                self.stats.total_miss += 1;
                self.stats.consecutive_miss += 1;
            }
            StatusType::Prevote => {
                self.stats.prevote_miss += 1;
                self.stats.total_miss += 1;
                self.stats.consecutive_miss += 1;
            }
            StatusType::Precommit => {
                self.stats.precommit_miss += 1;
                self.stats.total_miss += 1;
                self.stats.consecutive_miss += 1;
            }
            StatusType::Signed => {
                self.stats.signed += 1;
                self.stats.consecutive_miss = 0;
            }
            StatusType::Proposed => {
                self.stats.proposed += 1;
                self.stats.signed += 1;
                self.stats.consecutive_miss = 0;
            }
        }

        self.blocks.insert(0, status.code());
        self.blocks.truncate(SHOW_BLOCKS);
    }

    /// Loads persisted history, padding or truncating to the ring length.
    pub fn restore_blocks(&mut self, mut blocks: Vec<i32>) {
        blocks.resize(SHOW_BLOCKS, NO_DATA);
        self.blocks = blocks;
    }

    pub fn status(&self) -> SequencerStatus {
        SequencerStatus {
            name: self.name.clone(),
            address: self.address.clone(),
            jailed: self.jailed(),
            active_alerts: self.active_alerts,
            last_error: self.last_error.clone(),
            epochs: self.epochs.ids(),
            producing: self.epochs.is_now,
            stats: self.stats.clone(),
            blocks: self.blocks.clone(),
        }
    }
}

/// Status served to the dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequencerStatus {
    pub name: String,
    pub address: String,
    pub jailed: bool,
    pub active_alerts: usize,
    pub last_error: String,
    pub epochs: Vec<String>,
    pub producing: bool,
    pub stats: SignStats,
    pub blocks: Vec<i32>,
}

/// State of the monitor itself, the owner of global alerts
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitorStatus {
    pub last_block_height: Option<i64>,
    pub last_block_time: Option<DateTime<Utc>>,
    pub last_error: String,
    pub active_alerts: usize,
}

struct Inner {
    sequencers: Vec<Sequencer>,
    monitor: MonitorStatus,
}

pub struct SequencerSet {
    names: Vec<String>,
    by_name: HashMap<String, SequencerId>,
    addresses: Vec<String>,
    global_channels: ChannelSettings,
    inner: RwLock<Inner>,
}

impl SequencerSet {
    pub fn new(config: &Config) -> Self {
        let sequencers: Vec<Sequencer> = config
            .sequencers
            .iter()
            .map(|(name, seq)| {
                Sequencer::new(
                    name,
                    &seq.address,
                    seq.alerts.clone(),
                    config.channels_for(&seq.alerts),
                )
            })
            .collect();

        Self {
            names: sequencers.iter().map(|s| s.name.clone()).collect(),
            by_name: sequencers
                .iter()
                .enumerate()
                .map(|(i, s)| (s.name.clone(), SequencerId(i)))
                .collect(),
            addresses: sequencers.iter().map(|s| s.address.clone()).collect(),
            global_channels: config.global_channels(),
            inner: RwLock::new(Inner {
                sequencers,
                monitor: MonitorStatus::default(),
            }),
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = SequencerId> {
        (0..self.names.len()).map(SequencerId)
    }

    pub fn name(&self, id: SequencerId) -> &str {
        &self.names[id.0]
    }

    pub fn address(&self, id: SequencerId) -> &str {
        &self.addresses[id.0]
    }

    pub fn id_by_name(&self, name: &str) -> Option<SequencerId> {
        self.by_name.get(name).copied()
    }

    /// `(id, address)` pairs for the classifier
    pub fn targets(&self) -> Vec<(SequencerId, String)> {
        self.ids().map(|id| (id, self.addresses[id.0].clone())).collect()
    }

    /// Channels an alert for `entity` is routed through. The monitor and
    /// unknown names use the top-level settings.
    pub async fn channels_for(&self, entity: &str) -> ChannelSettings {
        match self.id_by_name(entity) {
            Some(id) => self.inner.read().await.sequencers[id.0].channels.clone(),
            None => self.global_channels.clone(),
        }
    }

    pub async fn with<R>(&self, id: SequencerId, f: impl FnOnce(&Sequencer) -> R) -> R {
        f(&self.inner.read().await.sequencers[id.0])
    }

    pub async fn with_mut<R>(&self, id: SequencerId, f: impl FnOnce(&mut Sequencer) -> R) -> R {
        f(&mut self.inner.write().await.sequencers[id.0])
    }

    /// Applies one finalized height. Returns the warning line for a miss.
    pub async fn apply(&self, fin: &Finalization, alarms: &str, now: DateTime<Utc>) -> Option<String> {
        let mut inner = self.inner.write().await;
        let seq = &mut inner.sequencers[fin.id.0];
        seq.record(fin.status);

        if !fin.status.is_miss() {
            return None;
        }

        let warn = format!(
            "❌ warning      {:>20} ({}) missed block {}",
            seq.name, seq.address, fin.height
        );
        seq.last_error = format!("{} {}{}\n", now.format("%Y-%m-%d %H:%M:%S UTC"), alarms, warn);
        Some(warn)
    }

    pub async fn record_block(&self, height: i64, now: DateTime<Utc>) {
        let mut inner = self.inner.write().await;
        inner.monitor.last_block_height = Some(height);
        inner.monitor.last_block_time = Some(now);
    }

    pub async fn monitor(&self) -> MonitorStatus {
        self.inner.read().await.monitor.clone()
    }

    pub async fn set_last_error(&self, entity: &str, message: &str) {
        let mut inner = self.inner.write().await;
        match self.by_name.get(entity) {
            Some(id) => inner.sequencers[id.0].last_error = message.to_string(),
            None if entity == SENTINEL_ENTITY => inner.monitor.last_error = message.to_string(),
            None => {}
        }
    }

    pub async fn set_active_alerts(&self, entity: &str, count: usize) {
        let mut inner = self.inner.write().await;
        match self.by_name.get(entity) {
            Some(id) => inner.sequencers[id.0].active_alerts = count,
            None if entity == SENTINEL_ENTITY => inner.monitor.active_alerts = count,
            None => {}
        }
    }

    /// Refreshes validator info by case-insensitive signer match.
    pub async fn update_validators(&self, set: &ValidatorSet) {
        let mut inner = self.inner.write().await;
        for seq in inner.sequencers.iter_mut() {
            if let Some(validator) = set.find(&seq.address) {
                seq.validator = Some(validator.clone());
            }
        }
    }

    pub async fn statuses(&self) -> Vec<SequencerStatus> {
        self.inner
            .read()
            .await
            .sequencers
            .iter()
            .map(Sequencer::status)
            .collect()
    }

    pub async fn status(&self, id: SequencerId) -> SequencerStatus {
        self.with(id, Sequencer::status).await
    }

    pub async fn blocks_by_name(&self) -> HashMap<String, Vec<i32>> {
        self.inner
            .read()
            .await
            .sequencers
            .iter()
            .map(|s| (s.name.clone(), s.blocks.clone()))
            .collect()
    }

    pub async fn epochs_by_name(&self) -> HashMap<String, EpochSnapshot> {
        self.inner
            .read()
            .await
            .sequencers
            .iter()
            .map(|s| (s.name.clone(), s.epochs.clone()))
            .collect()
    }

    /// Restores persisted history and epoch snapshots. Names no longer
    /// configured are skipped.
    pub async fn restore(
        &self,
        blocks: HashMap<String, Vec<i32>>,
        epochs: HashMap<String, EpochSnapshot>,
    ) {
        let mut inner = self.inner.write().await;
        for (name, history) in blocks {
            if let Some(id) = self.by_name.get(&name) {
                inner.sequencers[id.0].restore_blocks(history);
            }
        }
        for (name, snapshot) in epochs {
            if let Some(id) = self.by_name.get(&name) {
                inner.sequencers[id.0].epochs = snapshot;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
chain_id = "andromeda"

[[node_infos]]
rpc_url = "http://127.0.0.1:26657"

[sequencers.alpha]
address = "0x81fc9d26d6b234f9cc6a84bcfefc679cb64a227a"

[sequencers.beta]
address = "0x1111111111111111111111111111111111111111"
[sequencers.beta.alerts]
use_parent = false
"#;

    fn set() -> SequencerSet {
        let mut config: Config = toml::from_str(CONFIG).unwrap();
        config.discord.enabled = true;
        SequencerSet::new(&config)
    }

    #[test]
    fn test_record_counters_and_ring() {
        let mut seq = Sequencer::new("a", "0xa", AlertConfig::default(), ChannelSettings::default());
        seq.record(StatusType::Missed);
        seq.record(StatusType::Prevote);
        seq.record(StatusType::Precommit);
        assert_eq!(seq.stats.consecutive_miss, 3);
        assert_eq!(seq.stats.total_miss, 3);

        seq.record(StatusType::Proposed);
        assert_eq!(seq.stats.consecutive_miss, 0);
        assert_eq!(seq.stats.signed, 1);
        assert_eq!(seq.stats.proposed, 1);

        assert_eq!(seq.blocks.len(), SHOW_BLOCKS);
        assert_eq!(&seq.blocks[..5], &[4, 2, 1, 0, NO_DATA]);
    }

    #[test]
    fn test_restore_blocks_resizes() {
        let mut seq = Sequencer::new("a", "0xa", AlertConfig::default(), ChannelSettings::default());
        seq.restore_blocks(vec![3; 10]);
        assert_eq!(seq.blocks.len(), SHOW_BLOCKS);
        assert_eq!(seq.blocks[9], 3);
        assert_eq!(seq.blocks[10], NO_DATA);

        seq.restore_blocks(vec![3; SHOW_BLOCKS + 20]);
        assert_eq!(seq.blocks.len(), SHOW_BLOCKS);
    }

    #[tokio::test]
    async fn test_channel_routing() {
        let set = set();
        assert!(set.channels_for("alpha").await.discord.enabled);
        assert!(!set.channels_for("beta").await.discord.enabled);
        assert!(set.channels_for(SENTINEL_ENTITY).await.discord.enabled);
    }

    #[tokio::test]
    async fn test_apply_sets_last_error_on_miss() {
        let set = set();
        let id = set.id_by_name("alpha").unwrap();
        let fin = Finalization {
            id,
            height: 42,
            status: StatusType::Missed,
        };

        let warn = set.apply(&fin, "", Utc::now()).await.unwrap();
        assert!(warn.contains("missed block 42"));
        assert!(set.status(id).await.last_error.contains("missed block 42"));

        let signed = Finalization {
            status: StatusType::Signed,
            ..fin
        };
        assert!(set.apply(&signed, "", Utc::now()).await.is_none());
    }

    #[tokio::test]
    async fn test_update_validators_sets_jailed() {
        let set = set();
        let validators = ValidatorSet {
            validators: vec![Validator {
                signer: "0x81FC9D26D6B234F9CC6A84BCFEFC679CB64A227A".to_string(),
                jailed: true,
                ..Default::default()
            }],
        };
        set.update_validators(&validators).await;
        let alpha = set.id_by_name("alpha").unwrap();
        let beta = set.id_by_name("beta").unwrap();
        assert!(set.status(alpha).await.jailed);
        assert!(!set.status(beta).await.jailed);
    }
}
