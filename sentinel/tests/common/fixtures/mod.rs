//! Reusable test utilities:
//! - Mock HTTP servers (RPC node, indexer + L2, webhook)
//! - Test configuration builder
//! - Common test data

// Shared across test binaries, each of which only uses part of it
#![allow(dead_code)]
#![allow(unused_imports)]

pub mod mock_indexer;
pub mod mock_rpc;
pub mod mock_webhook;
pub mod test_config;
pub mod test_data;

pub use mock_indexer::MockIndexerServer;
pub use mock_rpc::MockRpcServer;
pub use mock_webhook::MockWebhookServer;
pub use test_config::TestConfigBuilder;
pub use test_data::*;
