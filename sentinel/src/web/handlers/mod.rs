pub mod common;
pub mod health;
pub mod sequencers;

pub use common::{ApiResponse, ApiResult};
pub use health::get_health;
pub use sequencers::{get_all_sequencers, get_logs, get_sequencer};
