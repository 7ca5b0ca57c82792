//! Mock Tendermint RPC node
//!
//! Answers JSON-RPC `status` and `abci_query` POSTs and the raw `GET /status`.

use base64::Engine;
use serde_json::{json, Value};
use wiremock::{
    matchers::{body_partial_json, method, path},
    Mock, MockServer, ResponseTemplate,
};

pub struct MockRpcServer {
    pub server: MockServer,
    pub base_url: String,
}

fn status_body(network: &str, latest_block: u64, catching_up: bool) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": "1",
        "result": {
            "node_info": {
                "network": network,
                "moniker": "test-node"
            },
            "sync_info": {
                "latest_block_height": latest_block.to_string(),
                "catching_up": catching_up
            }
        }
    })
}

impl MockRpcServer {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let base_url = server.uri();
        Self { server, base_url }
    }

    /// Synced node answering the JSON-RPC `status` call
    pub async fn mock_healthy_synced(&self, network: &str, latest_block: u64) {
        self.mock_status(network, latest_block, false).await;
    }

    pub async fn mock_catching_up(&self, network: &str, latest_block: u64) {
        self.mock_status(network, latest_block, true).await;
    }

    pub async fn mock_status(&self, network: &str, latest_block: u64, catching_up: bool) {
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "status" })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(status_body(network, latest_block, catching_up)),
            )
            .mount(&self.server)
            .await;
    }

    /// JSON-RPC broken, plain `GET /status` still works
    pub async fn mock_raw_status_only(&self, network: &str, latest_block: u64) {
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&self.server)
            .await;
        Mock::given(method("GET"))
            .and(path("/status"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(status_body(network, latest_block, false)),
            )
            .mount(&self.server)
            .await;
    }

    /// Every request fails
    pub async fn mock_unhealthy(&self) {
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&self.server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&self.server)
            .await;
    }

    /// `abci_query` for the current validator set
    pub async fn mock_validator_set(&self, validators: Value) {
        let raw = json!({ "validators": validators }).to_string();
        let encoded = base64::engine::general_purpose::STANDARD.encode(raw.as_bytes());

        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "abci_query" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": "1",
                "result": {
                    "response": {
                        "code": 0,
                        "log": "",
                        "value": encoded
                    }
                }
            })))
            .mount(&self.server)
            .await;
    }

    /// Forget every mounted response
    pub async fn reset(&self) {
        self.server.reset().await;
    }
}
