//! Mock sequencer-set indexer and L2 JSON-RPC on one server
//!
//! The indexer answers on `/subgraph`, the L2 node on `/l2`.

use serde_json::{json, Value};
use wiremock::{
    matchers::{body_partial_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

pub struct MockIndexerServer {
    pub server: MockServer,
    pub base_url: String,
}

impl MockIndexerServer {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let base_url = server.uri();
        Self { server, base_url }
    }

    pub fn indexer_url(&self) -> String {
        format!("{}/subgraph", self.base_url)
    }

    pub fn l2_url(&self) -> String {
        format!("{}/l2", self.base_url)
    }

    /// GraphQL `epoches` result for one signer
    pub async fn mock_epochs(&self, address: &str, epochs: Vec<Value>) {
        Mock::given(method("POST"))
            .and(path("/subgraph"))
            .and(header("Cache-Control", "no-cache"))
            .and(body_partial_json(json!({ "variables": { "address": address } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "epoches": epochs }
            })))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_indexer_failure(&self, status_code: u16) {
        Mock::given(method("POST"))
            .and(path("/subgraph"))
            .respond_with(ResponseTemplate::new(status_code))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_block_number(&self, height: u64) {
        Mock::given(method("POST"))
            .and(path("/l2"))
            .and(body_partial_json(json!({ "method": "eth_blockNumber" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": format!("{:#x}", height)
            })))
            .mount(&self.server)
            .await;
    }

    pub async fn reset(&self) {
        self.server.reset().await;
    }
}
