//! Notification channels
//!
//! Each channel turns the same `AlertPayload` into its own wire message.
//! Delivery is a single attempt; callers log failures.

mod discord;
mod pagerduty;
mod slack;
mod telegram;

use anyhow::Result;
use reqwest::Client as HttpClient;
use serde::Serialize;

use crate::alarm_cache::Channel;
use crate::config::{ChannelSettings, DiscordConfig, PagerDutyConfig, SlackConfig, TelegramConfig};

pub const RESOLVED_PREFIX: &str = "💜 Resolved: ";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertPayload {
    pub severity: String,
    pub resolved: bool,
    /// Sequencer name, or the monitor itself
    pub entity: String,
    pub message: String,
    /// Stable id used by PagerDuty to pair trigger and resolve
    pub dedup_id: String,
}

#[derive(Debug, Clone)]
pub enum Notifier {
    PagerDuty(PagerDutyConfig),
    Discord(DiscordConfig),
    Telegram(TelegramConfig),
    Slack(SlackConfig),
}

impl Notifier {
    /// Enabled channels from a routing configuration
    pub fn from_settings(settings: &ChannelSettings) -> Vec<Notifier> {
        let mut notifiers = Vec::new();
        if settings.pagerduty.enabled {
            notifiers.push(Notifier::PagerDuty(settings.pagerduty.clone()));
        }
        if settings.discord.enabled {
            notifiers.push(Notifier::Discord(settings.discord.clone()));
        }
        if settings.telegram.enabled {
            notifiers.push(Notifier::Telegram(settings.telegram.clone()));
        }
        if settings.slack.enabled {
            notifiers.push(Notifier::Slack(settings.slack.clone()));
        }
        notifiers
    }

    pub fn channel(&self) -> Channel {
        match self {
            Notifier::PagerDuty(_) => Channel::PagerDuty,
            Notifier::Discord(_) => Channel::Discord,
            Notifier::Telegram(_) => Channel::Telegram,
            Notifier::Slack(_) => Channel::Slack,
        }
    }

    pub async fn deliver(&self, client: &HttpClient, payload: &AlertPayload) -> Result<()> {
        match self {
            Notifier::PagerDuty(config) => pagerduty::send(client, config, payload).await,
            Notifier::Discord(config) => discord::send(client, config, payload).await,
            Notifier::Telegram(config) => telegram::send(client, config, payload).await,
            Notifier::Slack(config) => slack::send(client, config, payload).await,
        }
    }
}
