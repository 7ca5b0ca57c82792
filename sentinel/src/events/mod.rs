//! Vote and block event stream processing

pub mod classifier;
pub mod session;
pub mod types;

pub use classifier::{wire_address, Classifier, Finalization};
pub use session::{run_session, SessionContext};
pub use types::{parse_frame, FinalizedBlock, StatusType, StreamEvent, VoteObservation};
