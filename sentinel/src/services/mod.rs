pub mod alert_service;
pub mod dispatcher;

pub use alert_service::{AlertEvent, AlertService};
pub use dispatcher::AlertDispatcher;
