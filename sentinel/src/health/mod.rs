//! Endpoint health tracking
//!
//! Keeps up/down/syncing state for every configured RPC endpoint and
//! re-probes all of them on a fixed interval.

mod probe;
mod tracker;
pub mod types;

pub use probe::probe;
pub use tracker::EndpointTracker;
pub use types::{EndpointId, EndpointState, ProbeSummary};
