//! One websocket subscription session
//!
//! Lives until the stream dies, goes idle or the process shuts down. The
//! caller reconnects on any `SessionError`.

use chrono::Utc;
use futures::{SinkExt, StreamExt};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::classifier::Classifier;
use super::types::{parse_frame, FinalizedBlock, StreamEvent};
use crate::alarm_cache::AlarmCache;
use crate::constants::session::{
    EVENT_QUEUE_SIZE, HEARTBEAT_EVERY_BLOCKS, IDLE_CHECK_INTERVAL, QUERY_NEW_BLOCK, QUERY_VOTE,
};
use crate::errors::SessionError;
use crate::rpc::Connection;
use crate::sequencer::SequencerSet;
use crate::web::Dashboard;

/// Shared state a session writes into
#[derive(Clone)]
pub struct SessionContext {
    pub sequencers: Arc<SequencerSet>,
    pub alarms: Arc<AlarmCache>,
    pub dashboard: Arc<Dashboard>,
    pub idle_timeout: Duration,
}

/// Subscribes to blocks and votes and classifies until the session ends.
/// Returns `Ok(())` only when cancelled.
pub async fn run_session(
    connection: Connection,
    ctx: &SessionContext,
    cancel: &CancellationToken,
) -> Result<(), SessionError> {
    let (mut write, mut read) = connection.stream.split();

    for (id, query) in [QUERY_NEW_BLOCK, QUERY_VOTE].into_iter().enumerate() {
        let request = json!({
            "jsonrpc": "2.0",
            "method": "subscribe",
            "id": id + 1,
            "params": { "query": query }
        });
        write
            .send(Message::Text(request.to_string()))
            .await
            .map_err(|e| SessionError::Subscribe {
                reason: e.to_string(),
            })?;
    }
    info!(
        "⚙️ watching for NewBlock and Vote events via {}",
        connection.rpc_url
    );

    let (tx, mut rx) = mpsc::channel::<Result<StreamEvent, SessionError>>(EVENT_QUEUE_SIZE);

    let reader = tokio::spawn(async move {
        while let Some(frame) = read.next().await {
            let text = match frame {
                Ok(Message::Text(text)) => text,
                Ok(Message::Close(_)) => {
                    let _ = tx.send(Err(SessionError::Closed)).await;
                    return;
                }
                Ok(_) => continue,
                Err(e) => {
                    let _ = tx
                        .send(Err(SessionError::Read {
                            reason: e.to_string(),
                        }))
                        .await;
                    return;
                }
            };

            match parse_frame(&text) {
                Ok(Some(event)) => {
                    if tx.send(Ok(event)).await.is_err() {
                        return;
                    }
                }
                Ok(None) => {}
                Err(e) => warn!("skipping frame: {}", e),
            }
        }
        let _ = tx.send(Err(SessionError::Closed)).await;
    });

    let mut classifier = Classifier::new(ctx.sequencers.targets());
    let mut last_block = Instant::now();
    let mut idle_check = tokio::time::interval(IDLE_CHECK_INTERVAL);

    let outcome = loop {
        tokio::select! {
            _ = cancel.cancelled() => break Ok(()),
            _ = idle_check.tick() => {
                if last_block.elapsed() >= ctx.idle_timeout {
                    break Err(SessionError::Idle { seconds: ctx.idle_timeout.as_secs() });
                }
            }
            event = rx.recv() => match event {
                Some(Ok(StreamEvent::Vote(vote))) => classifier.observe_vote(&vote),
                Some(Ok(StreamEvent::Block(block))) => {
                    last_block = Instant::now();
                    finalize_block(&mut classifier, &block, ctx).await;
                }
                Some(Err(e)) => break Err(e),
                None => break Err(SessionError::Closed),
            },
        }
    };

    reader.abort();
    if let Err(e) = &outcome {
        error!("🛑 {}", e);
    }
    outcome
}

async fn finalize_block(classifier: &mut Classifier, block: &FinalizedBlock, ctx: &SessionContext) {
    let now = Utc::now();
    if block.height % HEARTBEAT_EVERY_BLOCKS == 0 {
        info!("🧊 block {}", block.height);
        ctx.dashboard.log(&format!("🧊 block {}", block.height)).await;
    }

    for fin in classifier.finalize(block) {
        let name = ctx.sequencers.name(fin.id);
        let open: String = ctx
            .alarms
            .active_messages(name)
            .await
            .iter()
            .map(|m| format!("🚨 {}\n", m))
            .collect();

        if let Some(warn_line) = ctx.sequencers.apply(&fin, &open, now).await {
            warn!("{}", warn_line);
            ctx.dashboard.log(&warn_line).await;
        } else {
            debug!("{} {:?} at {}", name, fin.status, fin.height);
        }
    }

    ctx.sequencers.record_block(block.height, now).await;
}
