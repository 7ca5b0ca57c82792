//! Tendermint JSON-RPC response structures, trimmed to what the sentinel reads

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse<T> {
    #[serde(default)]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: serde_json::Value, // string or number depending on the node
    pub result: Option<T>,
    pub error: Option<RpcError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResult {
    pub node_info: NodeInfo,
    pub sync_info: SyncInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeInfo {
    pub network: String,
    #[serde(default)]
    pub moniker: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncInfo {
    #[serde(default)]
    pub latest_block_height: String,
    pub catching_up: bool,
}

impl StatusResult {
    pub fn latest_height(&self) -> Option<i64> {
        self.sync_info.latest_block_height.parse().ok()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbciQueryResult {
    pub response: AbciResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbciResponse {
    #[serde(default)]
    pub code: u32,
    #[serde(default)]
    pub log: String,
    /// base64 encoded JSON
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidatorSet {
    #[serde(default)]
    pub validators: Vec<Validator>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Validator {
    #[serde(rename = "ID", default)]
    pub id: u64,
    #[serde(default)]
    pub signer: String,
    #[serde(default)]
    pub jailed: bool,
    #[serde(default)]
    pub power: i64,
}

impl ValidatorSet {
    pub fn find(&self, address: &str) -> Option<&Validator> {
        self.validators
            .iter()
            .find(|v| v.signer.eq_ignore_ascii_case(address))
    }
}
