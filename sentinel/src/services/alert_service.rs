use chrono::Utc;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::alarm_cache::AlarmCache;
use crate::config::ChannelSettings;
use crate::notifiers::AlertPayload;
use crate::sequencer::SequencerSet;

/// One queued notification decision
#[derive(Debug, Clone)]
pub struct AlertEvent {
    pub payload: AlertPayload,
    pub channels: ChannelSettings,
    /// Clears per-channel records without delivering
    pub silent: bool,
}

/// Front door for raising and resolving alarms.
///
/// Keeps the all-alarms map and the entity's active count current, and
/// queues the event for the dispatcher, which makes the per-channel call.
#[derive(Clone)]
pub struct AlertService {
    queue: mpsc::Sender<AlertEvent>,
    cache: Arc<AlarmCache>,
    sequencers: Arc<SequencerSet>,
}

impl AlertService {
    pub fn new(
        queue: mpsc::Sender<AlertEvent>,
        cache: Arc<AlarmCache>,
        sequencers: Arc<SequencerSet>,
    ) -> Self {
        Self {
            queue,
            cache,
            sequencers,
        }
    }

    pub fn cache(&self) -> &Arc<AlarmCache> {
        &self.cache
    }

    pub async fn raise(&self, entity: &str, message: &str, severity: &str, dedup_id: &str) {
        self.transition(entity, message, severity, false, dedup_id)
            .await;
    }

    pub async fn resolve(&self, entity: &str, message: &str, dedup_id: &str) {
        self.transition(entity, message, "info", true, dedup_id).await;
    }

    /// Resolves only if the alarm is currently open. Used where the detector
    /// cannot know whether the matching alarm was raised before a restart.
    pub async fn resolve_if_active(&self, entity: &str, message: &str, dedup_id: &str) {
        if self.cache.is_active(entity, message).await {
            self.resolve(entity, message, dedup_id).await;
        } else {
            debug!("no open alarm on {} ({}), nothing to resolve", entity, message);
        }
    }

    /// Fires once and immediately forgets it, so the same message can fire
    /// again the next time it happens.
    pub async fn raise_transient(&self, entity: &str, message: &str, severity: &str, dedup_id: &str) {
        let channels = self.sequencers.channels_for(entity).await;
        let fire = AlertEvent {
            payload: payload(entity, message, severity, false, dedup_id),
            channels: channels.clone(),
            silent: false,
        };
        let forget = AlertEvent {
            payload: payload(entity, message, severity, true, dedup_id),
            channels,
            silent: true,
        };

        self.enqueue(fire).await;
        self.enqueue(forget).await;
    }

    async fn transition(&self, entity: &str, message: &str, severity: &str, resolved: bool, dedup_id: &str) {
        let channels = self.sequencers.channels_for(entity).await;
        self.enqueue(AlertEvent {
            payload: payload(entity, message, severity, resolved, dedup_id),
            channels,
            silent: false,
        })
        .await;

        self.cache.record(entity, message, resolved, Utc::now()).await;
        self.refresh_count(entity).await;
    }

    /// Active alert count of an entity, as shown on the dashboard
    pub async fn refresh_count(&self, entity: &str) {
        let count = self.cache.active_count(entity).await;
        self.sequencers.set_active_alerts(entity, count).await;
    }

    async fn enqueue(&self, event: AlertEvent) {
        if let Err(e) = self.queue.send(event).await {
            error!("alert queue closed, dropping alert: {}", e.0.payload.message);
        }
    }
}

fn payload(entity: &str, message: &str, severity: &str, resolved: bool, dedup_id: &str) -> AlertPayload {
    AlertPayload {
        severity: severity.to_string(),
        resolved,
        entity: entity.to_string(),
        message: message.to_string(),
        dedup_id: dedup_id.to_string(),
    }
}
