use futures::future::join_all;
use reqwest::Client as HttpClient;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::alert_service::AlertEvent;
use crate::alarm_cache::AlarmCache;
use crate::errors::SentinelError;
use crate::notifiers::{AlertPayload, Notifier};

/// Drains the alert queue. Every enabled channel is asked independently and
/// delivers concurrently; one channel's failure is only logged.
pub struct AlertDispatcher {
    queue: mpsc::Receiver<AlertEvent>,
    cache: Arc<AlarmCache>,
    http_client: HttpClient,
}

impl AlertDispatcher {
    pub fn new(queue: mpsc::Receiver<AlertEvent>, cache: Arc<AlarmCache>, http_client: HttpClient) -> Self {
        Self {
            queue,
            cache,
            http_client,
        }
    }

    /// Decisions are taken in queue order; deliveries run in the background
    /// so a slow channel never holds up the next event.
    pub async fn run(mut self, cancel: CancellationToken) {
        let mut in_flight = JoinSet::new();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                event = self.queue.recv() => match event {
                    Some(event) => {
                        if let Some(delivery) = self.select(event).await {
                            in_flight.spawn(delivery.send(self.http_client.clone()));
                        }
                    }
                    None => break,
                },
            }
            while in_flight.try_join_next().is_some() {}
        }

        // in-flight deliveries finish before returning
        while in_flight.join_next().await.is_some() {}
        info!("alert dispatcher stopped");
    }

    /// Selects and delivers one event in place. Returns how many channels
    /// delivered successfully.
    pub async fn dispatch(&self, event: AlertEvent) -> usize {
        match self.select(event).await {
            Some(delivery) => delivery.send(self.http_client.clone()).await,
            None => 0,
        }
    }

    /// Runs the dedup decision for every routed channel. `None` when nothing
    /// is left to send.
    async fn select(&self, event: AlertEvent) -> Option<Delivery> {
        let payload = event.payload;

        if event.silent {
            self.cache
                .clear_silently(&payload.entity, &payload.message)
                .await;
            return None;
        }

        let mut notifiers = Vec::new();
        for notifier in Notifier::from_settings(&event.channels) {
            if self
                .cache
                .should_notify(notifier.channel(), &payload.entity, &payload.message, payload.resolved)
                .await
            {
                notifiers.push(notifier);
            }
        }

        (!notifiers.is_empty()).then_some(Delivery { notifiers, payload })
    }
}

struct Delivery {
    notifiers: Vec<Notifier>,
    payload: AlertPayload,
}

impl Delivery {
    async fn send(self, http_client: HttpClient) -> usize {
        let payload = &self.payload;
        let client = &http_client;
        let deliveries = self.notifiers.iter().map(|notifier| async move {
            (notifier.channel(), notifier.deliver(client, payload).await)
        });

        let mut delivered = 0;
        for (channel, result) in join_all(deliveries).await {
            match result {
                Ok(()) => delivered += 1,
                Err(e) => {
                    let err = SentinelError::Delivery {
                        channel: channel.to_string(),
                        reason: e.to_string(),
                    };
                    error!("❌ {} ({})", err, payload.entity);
                }
            }
        }
        delivered
    }
}
