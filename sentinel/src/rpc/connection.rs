use anyhow::{anyhow, Result};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::RwLock;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{info, warn};

use super::client::{websocket_url, NodeClient};
use super::types::{StatusResult, ValidatorSet};
use crate::constants::endpoints::CONNECT_TIMEOUT;
use crate::errors::EndpointError;
use crate::health::{probe, EndpointId, EndpointState, EndpointTracker};

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A freshly established connection. The stream is handed to the event session.
pub struct Connection {
    pub endpoint: EndpointId,
    pub rpc_url: String,
    pub stream: WsStream,
}

/// Owns the single active RPC connection and fails over between endpoints.
pub struct ConnectionManager {
    tracker: Arc<EndpointTracker>,
    active: RwLock<Option<NodeClient>>,
    connect_timeout: Duration,
}

impl ConnectionManager {
    pub fn new(tracker: Arc<EndpointTracker>) -> Self {
        Self {
            tracker,
            active: RwLock::new(None),
            connect_timeout: CONNECT_TIMEOUT,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn tracker(&self) -> &Arc<EndpointTracker> {
        &self.tracker
    }

    /// Tries candidates in order until one probes clean and accepts a websocket.
    ///
    /// On success the previous connection is replaced. When every candidate
    /// fails the no-endpoints flag is raised and the active client dropped.
    pub async fn connect(&self) -> Result<Connection, EndpointError> {
        for id in self.tracker.candidates().await {
            let Some(state) = self.tracker.get(id).await else {
                continue;
            };

            match self.try_endpoint(&state).await {
                Ok((client, stream)) => {
                    info!("⚙️ connected to {}", state.rpc_url);
                    self.tracker.mark_healthy(id).await;
                    *self.active.write().await = Some(client);
                    return Ok(Connection {
                        endpoint: id,
                        rpc_url: state.rpc_url,
                        stream,
                    });
                }
                Err(e) => {
                    warn!("❌ {}", e);
                    self.tracker.mark_down(id, &e, Utc::now()).await;
                }
            }
        }

        self.tracker.set_no_endpoints(true);
        *self.active.write().await = None;
        Err(EndpointError::NoUsableEndpoints)
    }

    async fn try_endpoint(&self, state: &EndpointState) -> Result<(NodeClient, WsStream), EndpointError> {
        let client = NodeClient::new(self.tracker.http_client().clone(), &state.rpc_url);
        probe(&client, self.tracker.chain_id()).await?;

        let ws = websocket_url(&state.rpc_url, state.ws_url.as_deref())?;
        let (stream, _) = tokio::time::timeout(self.connect_timeout, connect_async(ws.as_str()))
            .await
            .map_err(|_| EndpointError::Unreachable {
                url: ws.to_string(),
                reason: format!("websocket handshake timed out after {:?}", self.connect_timeout),
            })?
            .map_err(|e| EndpointError::Unreachable {
                url: ws.to_string(),
                reason: e.to_string(),
            })?;

        Ok((client, stream))
    }

    pub async fn active_url(&self) -> Option<String> {
        self.active
            .read()
            .await
            .as_ref()
            .map(|c| c.rpc_url().to_string())
    }

    async fn active_client(&self) -> Result<NodeClient> {
        self.active
            .read()
            .await
            .clone()
            .ok_or_else(|| anyhow!("no active RPC connection"))
    }

    pub async fn status(&self) -> Result<StatusResult> {
        self.active_client().await?.status().await
    }

    pub async fn raw_status(&self) -> Result<StatusResult> {
        self.active_client().await?.raw_status().await
    }

    pub async fn validator_set(&self) -> Result<ValidatorSet> {
        self.active_client().await?.validator_set().await
    }
}
