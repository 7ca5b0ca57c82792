//! Endpoint health types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Position of an endpoint in the configured `node_infos` list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EndpointId(pub usize);

/// Runtime state of one configured RPC endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointState {
    pub rpc_url: String,
    pub ws_url: Option<String>,
    pub alert_if_down: bool,
    pub down: bool,
    /// Set on recovery until the downtime resolution has been handled
    pub was_down: bool,
    pub syncing: bool,
    pub last_msg: String,
    pub down_since: Option<DateTime<Utc>>,
}

impl EndpointState {
    pub fn new(rpc_url: &str, ws_url: Option<String>, alert_if_down: bool) -> Self {
        Self {
            rpc_url: rpc_url.to_string(),
            ws_url,
            alert_if_down,
            down: false,
            was_down: false,
            syncing: false,
            last_msg: String::new(),
            down_since: None,
        }
    }
}

/// What a successful probe learned about a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeSummary {
    pub network: String,
    pub latest_height: Option<i64>,
}
