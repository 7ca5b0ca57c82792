pub mod manager;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::SocketAddr;

use crate::constants::{alerts, chains, endpoints, session, SENTINEL_ENTITY};
use crate::errors::ConfigError;

pub use manager::ConfigManager;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub chain_id: String,
    /// How long an endpoint must be down before alerting
    #[serde(default = "default_node_down_minutes")]
    pub node_down_alert_minutes: u64,
    #[serde(default = "default_critical")]
    pub node_down_alert_severity: String,
    #[serde(default)]
    pub stalled_enabled: bool,
    #[serde(default = "default_stalled_minutes")]
    pub stalled_minutes: u64,
    #[serde(default)]
    pub alert_if_no_servers: bool,
    #[serde(default = "default_state_file")]
    pub state_file: String,
    #[serde(default)]
    pub enable_dashboard: bool,
    #[serde(default = "default_listen")]
    pub listen: String,
    #[serde(default)]
    pub hide_logs: bool,
    pub sequencer_set_url: Option<String>,
    pub l2_rpc_url: Option<String>,
    pub flap_window_minutes: Option<i64>,
    pub idle_timeout_seconds: Option<u64>,
    #[serde(default)]
    pub node_infos: Vec<NodeInfo>,
    #[serde(default)]
    pub pagerduty: PagerDutyConfig,
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub slack: SlackConfig,
    #[serde(default)]
    pub sequencers: BTreeMap<String, SequencerConfig>,
}

fn default_node_down_minutes() -> u64 {
    endpoints::MIN_NODE_DOWN_MINUTES
}

fn default_critical() -> String {
    "critical".to_string()
}

fn default_stalled_minutes() -> u64 {
    10
}

fn default_state_file() -> String {
    ".sentinel-state.json".to_string()
}

fn default_listen() -> String {
    "127.0.0.1:8888".to_string()
}

fn default_true() -> bool {
    true
}

fn default_consecutive_missed() -> u32 {
    5
}

/// One RPC endpoint. `ws_url` is derived from `rpc_url` when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeInfo {
    pub rpc_url: String,
    pub ws_url: Option<String>,
    #[serde(default = "default_true")]
    pub alert_if_down: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PagerDutyConfig {
    pub enabled: bool,
    pub api_key: String,
    pub default_severity: String,
    /// Events API override, used by tests and proxies
    pub api_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    pub enabled: bool,
    pub webhook: String,
    pub mentions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub enabled: bool,
    pub api_key: String,
    pub channel: String,
    pub mentions: Vec<String>,
    pub api_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackConfig {
    pub enabled: bool,
    pub webhook: String,
    pub mentions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequencerConfig {
    /// e.g. 0x81fc9d26d6b234f9cc6a84bcfefc679cb64a227a
    pub address: String,
    #[serde(default)]
    pub alerts: AlertConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    pub consecutive_enabled: bool,
    pub consecutive_missed: u32,
    pub consecutive_priority: String,
    /// Send an info alert whenever a new mining epoch is assigned
    pub notify_mining: bool,
    /// Use the top-level channel settings instead of the overrides below
    pub use_parent: bool,
    pub pagerduty: PagerDutyConfig,
    pub discord: DiscordConfig,
    pub telegram: TelegramConfig,
    pub slack: SlackConfig,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            consecutive_enabled: false,
            consecutive_missed: default_consecutive_missed(),
            consecutive_priority: default_critical(),
            notify_mining: false,
            use_parent: true,
            pagerduty: PagerDutyConfig::default(),
            discord: DiscordConfig::default(),
            telegram: TelegramConfig::default(),
            slack: SlackConfig::default(),
        }
    }
}

/// Channel settings an alert is routed through
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelSettings {
    pub pagerduty: PagerDutyConfig,
    pub discord: DiscordConfig,
    pub telegram: TelegramConfig,
    pub slack: SlackConfig,
}

impl Config {
    pub fn global_channels(&self) -> ChannelSettings {
        ChannelSettings {
            pagerduty: self.pagerduty.clone(),
            discord: self.discord.clone(),
            telegram: self.telegram.clone(),
            slack: self.slack.clone(),
        }
    }

    pub fn channels_for(&self, alerts: &AlertConfig) -> ChannelSettings {
        if alerts.use_parent {
            return self.global_channels();
        }
        ChannelSettings {
            pagerduty: alerts.pagerduty.clone(),
            discord: alerts.discord.clone(),
            telegram: alerts.telegram.clone(),
            slack: alerts.slack.clone(),
        }
    }

    pub fn sequencer_set_url(&self) -> Result<String, ConfigError> {
        if let Some(url) = &self.sequencer_set_url {
            return Ok(url.clone());
        }
        match self.chain_id.as_str() {
            chains::MAINNET_CHAIN_ID => Ok(chains::MAINNET_SEQUENCER_SET_URL.to_string()),
            chains::SEPOLIA_CHAIN_ID => Ok(chains::SEPOLIA_SEQUENCER_SET_URL.to_string()),
            _ => Err(unknown_chain(&self.chain_id)),
        }
    }

    pub fn l2_rpc_url(&self) -> Result<String, ConfigError> {
        if let Some(url) = &self.l2_rpc_url {
            return Ok(url.clone());
        }
        match self.chain_id.as_str() {
            chains::MAINNET_CHAIN_ID => Ok(chains::MAINNET_L2_RPC_URL.to_string()),
            chains::SEPOLIA_CHAIN_ID => Ok(chains::SEPOLIA_L2_RPC_URL.to_string()),
            _ => Err(unknown_chain(&self.chain_id)),
        }
    }

    pub fn flap_window(&self) -> chrono::Duration {
        chrono::Duration::minutes(
            self.flap_window_minutes
                .unwrap_or(alerts::DEFAULT_FLAP_WINDOW_MINUTES),
        )
    }

    pub fn idle_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(
            self.idle_timeout_seconds
                .unwrap_or(session::DEFAULT_IDLE_TIMEOUT_SECONDS),
        )
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.listen
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue {
                field: "listen".to_string(),
                reason: format!("'{}' does not appear to be valid: {}", self.listen, e),
            })
    }

    /// Rejects settings that cannot produce a working monitor.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chain_id.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "chain_id".to_string(),
            });
        }
        self.sequencer_set_url()?;
        self.l2_rpc_url()?;

        if self.enable_dashboard {
            self.listen_addr()?;
        }

        if self.node_down_alert_minutes < endpoints::MIN_NODE_DOWN_MINUTES {
            return Err(ConfigError::InvalidValue {
                field: "node_down_alert_minutes".to_string(),
                reason: format!(
                    "less than {} minutes might result in false alarms",
                    endpoints::MIN_NODE_DOWN_MINUTES
                ),
            });
        }

        let windows = [
            ("node_down_alert_minutes", self.node_down_alert_minutes),
            ("stalled_minutes", self.stalled_minutes),
            (
                "flap_window_minutes",
                self.flap_window_minutes.map_or(0, |m| m.unsigned_abs()),
            ),
        ];
        for (field, minutes) in windows {
            if minutes > alerts::MAX_WINDOW_MINUTES {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    reason: format!("must not exceed {} minutes", alerts::MAX_WINDOW_MINUTES),
                });
            }
        }

        if self.stalled_enabled && self.stalled_minutes == 0 {
            return Err(ConfigError::InvalidValue {
                field: "stalled_minutes".to_string(),
                reason: "must be at least 1 when stalled alerts are enabled".to_string(),
            });
        }

        if matches!(self.flap_window_minutes, Some(m) if m < 0) {
            return Err(ConfigError::InvalidValue {
                field: "flap_window_minutes".to_string(),
                reason: "must not be negative".to_string(),
            });
        }

        if self.idle_timeout_seconds == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "idle_timeout_seconds".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if matches!(self.idle_timeout_seconds, Some(s) if s > session::MAX_IDLE_TIMEOUT_SECONDS) {
            return Err(ConfigError::InvalidValue {
                field: "idle_timeout_seconds".to_string(),
                reason: format!("must not exceed {}", session::MAX_IDLE_TIMEOUT_SECONDS),
            });
        }

        if self.node_infos.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "node_infos".to_string(),
            });
        }

        if self.sequencers.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "sequencers".to_string(),
            });
        }

        for (name, seq) in &self.sequencers {
            if name == SENTINEL_ENTITY {
                return Err(ConfigError::InvalidValue {
                    field: format!("sequencers.{}", name),
                    reason: format!("'{}' is reserved for monitor-wide alerts", SENTINEL_ENTITY),
                });
            }
            if seq.address.is_empty() {
                return Err(ConfigError::MissingRequired {
                    field: format!("sequencers.{}.address", name),
                });
            }
            if seq.alerts.consecutive_enabled && seq.alerts.consecutive_missed == 0 {
                return Err(ConfigError::InvalidValue {
                    field: format!("sequencers.{}.alerts.consecutive_missed", name),
                    reason: "must be at least 1".to_string(),
                });
            }
        }

        Ok(())
    }
}

fn unknown_chain(chain_id: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: "chain_id".to_string(),
        reason: format!(
            "'{}' is unknown; use {} or {}, or set both sequencer_set_url and l2_rpc_url",
            chain_id,
            chains::MAINNET_CHAIN_ID,
            chains::SEPOLIA_CHAIN_ID
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
chain_id = "andromeda"

[[node_infos]]
rpc_url = "http://127.0.0.1:26657"

[sequencers.alpha]
address = "0x81fc9d26d6b234f9cc6a84bcfefc679cb64a227a"
"#;

    fn minimal() -> Config {
        toml::from_str(MINIMAL).unwrap()
    }

    #[test]
    fn test_defaults_applied() {
        let config = minimal();
        assert_eq!(config.node_down_alert_minutes, 3);
        assert_eq!(config.flap_window(), chrono::Duration::minutes(5));
        assert_eq!(config.idle_timeout(), std::time::Duration::from_secs(60));
        assert!(config.node_infos[0].alert_if_down);
        assert!(config.sequencers["alpha"].alerts.use_parent);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_chain_requires_overrides() {
        let mut config = minimal();
        config.chain_id = "devnet-7".to_string();
        assert!(config.validate().is_err());

        config.sequencer_set_url = Some("http://indexer".to_string());
        config.l2_rpc_url = Some("http://l2".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_node_down_minutes_floor() {
        let mut config = minimal();
        config.node_down_alert_minutes = 2;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("node_down_alert_minutes"));
    }

    #[test]
    fn test_oversized_windows_rejected() {
        let mut config = minimal();
        config.stalled_minutes = u64::MAX;
        assert!(config.validate().unwrap_err().to_string().contains("stalled_minutes"));

        let mut config = minimal();
        config.node_down_alert_minutes = u64::MAX / 2;
        assert!(config.validate().unwrap_err().to_string().contains("node_down_alert_minutes"));

        let mut config = minimal();
        config.flap_window_minutes = Some(i64::MAX);
        assert!(config.validate().unwrap_err().to_string().contains("flap_window_minutes"));

        let mut config = minimal();
        config.idle_timeout_seconds = Some(u64::MAX);
        assert!(config.validate().unwrap_err().to_string().contains("idle_timeout_seconds"));

        let mut config = minimal();
        config.stalled_minutes = alerts::MAX_WINDOW_MINUTES;
        config.flap_window_minutes = Some(alerts::MAX_WINDOW_MINUTES as i64);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_sentinel_name_reserved() {
        let mut config = minimal();
        let alpha = config.sequencers["alpha"].clone();
        config.sequencers.insert(SENTINEL_ENTITY.to_string(), alpha);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("reserved"));
    }

    #[test]
    fn test_invalid_listen_only_checked_with_dashboard() {
        let mut config = minimal();
        config.listen = "not an address".to_string();
        assert!(config.validate().is_ok());

        config.enable_dashboard = true;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_channels_for_respects_use_parent() {
        let mut config = minimal();
        config.discord.enabled = true;
        config.discord.webhook = "http://global".to_string();

        let mut alerts = AlertConfig::default();
        assert_eq!(config.channels_for(&alerts).discord.webhook, "http://global");

        alerts.use_parent = false;
        alerts.slack.enabled = true;
        let own = config.channels_for(&alerts);
        assert!(!own.discord.enabled);
        assert!(own.slack.enabled);
    }
}
