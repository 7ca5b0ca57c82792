use chrono::{DateTime, Utc};
use futures::future::join_all;
use reqwest::Client as HttpClient;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::probe::probe;
use super::types::{EndpointId, EndpointState};
use crate::config::NodeInfo;
use crate::errors::EndpointError;
use crate::rpc::NodeClient;

/// Up/down/syncing bookkeeping for every configured RPC endpoint
pub struct EndpointTracker {
    endpoints: RwLock<Vec<EndpointState>>,
    chain_id: String,
    http_client: HttpClient,
    no_endpoints: AtomicBool,
    /// Set by the first connect outcome or successful probe
    reported: AtomicBool,
}

impl EndpointTracker {
    pub fn new(nodes: &[NodeInfo], chain_id: &str, http_client: HttpClient) -> Self {
        let endpoints = nodes
            .iter()
            .map(|n| EndpointState::new(&n.rpc_url, n.ws_url.clone(), n.alert_if_down))
            .collect();

        Self {
            endpoints: RwLock::new(endpoints),
            chain_id: chain_id.to_string(),
            http_client,
            no_endpoints: AtomicBool::new(false),
            reported: AtomicBool::new(false),
        }
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    pub fn http_client(&self) -> &HttpClient {
        &self.http_client
    }

    pub async fn snapshot(&self) -> Vec<(EndpointId, EndpointState)> {
        self.endpoints
            .read()
            .await
            .iter()
            .enumerate()
            .map(|(i, e)| (EndpointId(i), e.clone()))
            .collect()
    }

    pub async fn get(&self, id: EndpointId) -> Option<EndpointState> {
        self.endpoints.read().await.get(id.0).cloned()
    }

    /// First endpoint not marked down, in configured order
    pub async fn select_endpoint(&self) -> Option<EndpointId> {
        self.endpoints
            .read()
            .await
            .iter()
            .position(|e| !e.down)
            .map(EndpointId)
    }

    /// Endpoints to try when connecting: the healthy ones in order, or all of
    /// them once every endpoint is down.
    pub async fn candidates(&self) -> Vec<EndpointId> {
        let endpoints = self.endpoints.read().await;
        let healthy: Vec<EndpointId> = endpoints
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.down)
            .map(|(i, _)| EndpointId(i))
            .collect();

        if healthy.is_empty() {
            (0..endpoints.len()).map(EndpointId).collect()
        } else {
            healthy
        }
    }

    pub async fn any_healthy(&self) -> bool {
        self.endpoints.read().await.iter().any(|e| !e.down)
    }

    pub async fn mark_down(&self, id: EndpointId, reason: &EndpointError, now: DateTime<Utc>) {
        let mut endpoints = self.endpoints.write().await;
        if let Some(endpoint) = endpoints.get_mut(id.0) {
            if !endpoint.down {
                endpoint.down = true;
                endpoint.down_since = Some(now);
            }
            endpoint.syncing = matches!(reason, EndpointError::CatchingUp { .. });
            endpoint.last_msg = reason.to_string();
        }
    }

    pub async fn mark_healthy(&self, id: EndpointId) {
        let mut endpoints = self.endpoints.write().await;
        if let Some(endpoint) = endpoints.get_mut(id.0) {
            if endpoint.down {
                info!("🟢 {} is healthy", endpoint.rpc_url);
                endpoint.was_down = true;
            }
            endpoint.down = false;
            endpoint.syncing = false;
            endpoint.down_since = None;
            endpoint.last_msg.clear();
        }
        self.no_endpoints.store(false, Ordering::SeqCst);
        self.reported.store(true, Ordering::SeqCst);
    }

    /// Acknowledges a recovery once the downtime detector has handled it
    pub async fn clear_was_down(&self, id: EndpointId) {
        if let Some(endpoint) = self.endpoints.write().await.get_mut(id.0) {
            endpoint.was_down = false;
        }
    }

    pub fn set_no_endpoints(&self, value: bool) {
        self.no_endpoints.store(value, Ordering::SeqCst);
        self.reported.store(true, Ordering::SeqCst);
    }

    pub fn no_endpoints(&self) -> bool {
        self.no_endpoints.load(Ordering::SeqCst)
    }

    /// `None` until something has actually been learned about connectivity.
    pub fn no_endpoints_reported(&self) -> Option<bool> {
        self.reported
            .load(Ordering::SeqCst)
            .then(|| self.no_endpoints())
    }

    /// Probes every endpoint in parallel and applies the results.
    pub async fn health_pass(&self) {
        let targets: Vec<(EndpointId, String)> = self
            .endpoints
            .read()
            .await
            .iter()
            .enumerate()
            .map(|(i, e)| (EndpointId(i), e.rpc_url.clone()))
            .collect();

        let probes = targets.into_iter().map(|(id, url)| {
            let client = NodeClient::new(self.http_client.clone(), &url);
            async move { (id, probe(&client, &self.chain_id).await) }
        });

        let now = Utc::now();
        for (id, result) in join_all(probes).await {
            match result {
                Ok(_) => self.mark_healthy(id).await,
                Err(e) => {
                    warn!("❌ {}", e);
                    self.mark_down(id, &e, now).await;
                }
            }
        }
    }

    /// Down timestamps keyed by rpc url, for the state file
    pub async fn down_since_by_url(&self) -> HashMap<String, DateTime<Utc>> {
        self.endpoints
            .read()
            .await
            .iter()
            .filter_map(|e| e.down_since.map(|t| (e.rpc_url.clone(), t)))
            .collect()
    }

    /// Marks endpoints down since a persisted timestamp. Unknown urls are ignored.
    pub async fn restore_down_since(&self, nodes_down: &HashMap<String, DateTime<Utc>>) {
        let mut endpoints = self.endpoints.write().await;
        for endpoint in endpoints.iter_mut() {
            if let Some(since) = nodes_down.get(&endpoint.rpc_url) {
                endpoint.down = true;
                endpoint.down_since = Some(*since);
                endpoint.last_msg = "down before restart".to_string();
            }
        }
    }
}
