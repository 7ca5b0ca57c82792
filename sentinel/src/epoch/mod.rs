//! Committee (epoch) membership tracking

pub mod indexer;
pub mod tracker;
pub mod types;

pub use indexer::IndexerClient;
pub use tracker::{diff_snapshots, EpochTracker, EpochTransition};
pub use types::{Epoch, EpochSnapshot};
