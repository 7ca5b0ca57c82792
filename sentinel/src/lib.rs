pub mod alarm_cache;
pub mod app;
pub mod config;
pub mod constants;
pub mod epoch;
pub mod errors;
pub mod events;
pub mod health;
pub mod notifiers;
pub mod persistence;
pub mod rpc;
pub mod sequencer;
pub mod services;
pub mod watch;
pub mod web;

// Re-export commonly used types
pub use alarm_cache::AlarmCache;
pub use config::{Config, ConfigManager};
pub use health::EndpointTracker;
pub use rpc::ConnectionManager;
pub use sequencer::{SequencerId, SequencerSet};
pub use services::{AlertDispatcher, AlertService};
