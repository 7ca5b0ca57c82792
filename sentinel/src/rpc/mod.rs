//! Tendermint RPC access
//!
//! `NodeClient` talks to one endpoint over HTTP; `ConnectionManager` owns the
//! active endpoint and its websocket and fails over when it dies.

pub mod client;
mod connection;
pub mod l2;
pub mod types;

pub use client::{websocket_url, NodeClient};
pub use connection::{Connection, ConnectionManager, WsStream};
pub use types::{StatusResult, Validator, ValidatorSet};
