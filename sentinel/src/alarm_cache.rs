//! Alarm deduplication and flap control
//!
//! Every notification decision goes through `should_notify`, evaluated under
//! one write lock. A per-channel entry exists exactly while a fired alarm is
//! unresolved on that channel.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

/// entity -> message -> time first sent
pub type AlarmMap = HashMap<String, HashMap<String, DateTime<Utc>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    PagerDuty,
    Discord,
    Telegram,
    Slack,
}

impl Channel {
    pub const ALL: [Channel; 4] = [
        Channel::PagerDuty,
        Channel::Discord,
        Channel::Telegram,
        Channel::Slack,
    ];
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Channel::PagerDuty => "PagerDuty",
            Channel::Discord => "Discord",
            Channel::Telegram => "Telegram",
            Channel::Slack => "Slack",
        };
        f.write_str(name)
    }
}

/// Persisted part of the cache
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlarmState {
    #[serde(rename = "sent_pd_alarms", default)]
    pub pagerduty: AlarmMap,
    #[serde(rename = "sent_tg_alarms", default)]
    pub telegram: AlarmMap,
    #[serde(rename = "sent_di_alarms", default)]
    pub discord: AlarmMap,
    #[serde(rename = "sent_slk_alarms", default)]
    pub slack: AlarmMap,
    #[serde(rename = "sent_all_alarms", default)]
    pub all: AlarmMap,
}

impl AlarmState {
    fn channel_mut(&mut self, channel: Channel) -> &mut AlarmMap {
        match channel {
            Channel::PagerDuty => &mut self.pagerduty,
            Channel::Discord => &mut self.discord,
            Channel::Telegram => &mut self.telegram,
            Channel::Slack => &mut self.slack,
        }
    }
}

#[derive(Default)]
struct Inner {
    state: AlarmState,
    /// Last PagerDuty fire per entity/message, not persisted
    flapping: AlarmMap,
}

pub struct AlarmCache {
    inner: RwLock<Inner>,
    flap_window: Duration,
}

fn contains(map: &AlarmMap, entity: &str, message: &str) -> bool {
    map.get(entity).is_some_and(|m| m.contains_key(message))
}

fn remove(map: &mut AlarmMap, entity: &str, message: &str) -> bool {
    map.get_mut(entity)
        .map(|m| m.remove(message).is_some())
        .unwrap_or(false)
}

impl AlarmCache {
    pub fn new(flap_window: Duration) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            flap_window,
        }
    }

    pub async fn should_notify(
        &self,
        channel: Channel,
        entity: &str,
        message: &str,
        resolved: bool,
    ) -> bool {
        self.should_notify_at(channel, entity, message, resolved, Utc::now())
            .await
    }

    /// Decides whether one channel should deliver this transition, updating
    /// the channel's record accordingly.
    pub async fn should_notify_at(
        &self,
        channel: Channel,
        entity: &str,
        message: &str,
        resolved: bool,
        now: DateTime<Utc>,
    ) -> bool {
        let mut inner = self.inner.write().await;
        let sent = inner.state.channel_mut(channel);
        let already_sent = contains(sent, entity, message);

        match (already_sent, resolved) {
            (true, false) => return false,
            (true, true) => {
                remove(sent, entity, message);
                info!(
                    "💜 Resolved     alarm on {:>20} ({}) - notifying {}",
                    entity, message, channel
                );
                return true;
            }
            (false, true) => {
                error!(
                    "😕 Not clearing alarm on {:>20} ({}) - no corresponding alert {}",
                    entity, message, channel
                );
                return false;
            }
            (false, false) => {}
        }

        if channel == Channel::PagerDuty {
            let window_start = now - self.flap_window;
            let last_fire = inner
                .flapping
                .get(entity)
                .and_then(|m| m.get(message))
                .copied();
            if last_fire.is_some_and(|t| t > window_start) {
                warn!(
                    "🛑 flapping detected - suppressing pagerduty notification: {} {}",
                    entity, message
                );
                return false;
            }
            inner
                .flapping
                .entry(entity.to_string())
                .or_default()
                .insert(message.to_string(), now);
        }

        info!(
            "new alarm on {:>20} ({}) - notifying {}",
            entity, message, channel
        );
        inner
            .state
            .channel_mut(channel)
            .entry(entity.to_string())
            .or_default()
            .insert(message.to_string(), now);
        true
    }

    /// Tracks the alarm as open (or closed) regardless of channel.
    pub async fn record(&self, entity: &str, message: &str, resolved: bool, now: DateTime<Utc>) {
        let mut inner = self.inner.write().await;
        if resolved {
            remove(&mut inner.state.all, entity, message);
        } else {
            inner
                .state
                .all
                .entry(entity.to_string())
                .or_default()
                .insert(message.to_string(), now);
        }
    }

    /// Drops every trace of an alarm without delivering anything.
    pub async fn clear_silently(&self, entity: &str, message: &str) {
        let mut inner = self.inner.write().await;
        for channel in Channel::ALL {
            remove(inner.state.channel_mut(channel), entity, message);
        }
        remove(&mut inner.state.all, entity, message);
    }

    pub async fn is_active(&self, entity: &str, message: &str) -> bool {
        contains(&self.inner.read().await.state.all, entity, message)
    }

    pub async fn active_count(&self, entity: &str) -> usize {
        self.inner
            .read()
            .await
            .state
            .all
            .get(entity)
            .map(HashMap::len)
            .unwrap_or(0)
    }

    /// Open alarm messages of an entity, sorted
    pub async fn active_messages(&self, entity: &str) -> Vec<String> {
        let inner = self.inner.read().await;
        let mut messages: Vec<String> = inner
            .state
            .all
            .get(entity)
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default();
        messages.sort();
        messages
    }

    /// Forgets every open alarm of an entity
    pub async fn clear_entity(&self, entity: &str) {
        if let Some(open) = self.inner.write().await.state.all.get_mut(entity) {
            open.clear();
        }
    }

    /// Forgets open alarms of an entity whose message starts with `prefix`.
    pub async fn clear_prefix(&self, entity: &str, prefix: &str) {
        if let Some(open) = self.inner.write().await.state.all.get_mut(entity) {
            open.retain(|message, _| !message.starts_with(prefix));
        }
    }

    pub async fn snapshot(&self) -> AlarmState {
        self.inner.read().await.state.clone()
    }

    pub async fn restore(&self, state: AlarmState) {
        self.inner.write().await.state = state;
    }
}
