pub mod dashboard;
pub mod handlers;
pub mod server;

pub use dashboard::{Dashboard, LogLine};
pub use server::{create_router, start_web_server};

use serde::Serialize;
use std::sync::Arc;

use crate::health::{EndpointState, EndpointTracker};
use crate::sequencer::{MonitorStatus, SequencerSet};

// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub dashboard: Arc<Dashboard>,
    pub sequencers: Arc<SequencerSet>,
    pub endpoints: Arc<EndpointTracker>,
}

impl AppState {
    pub fn new(
        dashboard: Arc<Dashboard>,
        sequencers: Arc<SequencerSet>,
        endpoints: Arc<EndpointTracker>,
    ) -> Self {
        Self {
            dashboard,
            sequencers,
            endpoints,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthSummary {
    pub monitor: MonitorStatus,
    pub no_endpoints: bool,
    pub endpoints: Vec<EndpointState>,
}
