//! Central repository for intervals, windows and chain presets
//!
//! Constants are grouped by the component that consumes them.

use std::time::Duration;

/// Endpoint health tracking and connection management
pub mod endpoints {
    use super::Duration;

    /// Interval between full health passes over every configured endpoint
    pub const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(60);

    /// Timeout for a single status probe
    pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

    /// Websocket handshake limit per candidate
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Pause before the next connection attempt after a failed selection or a dead session
    pub const RECONNECT_BACKOFF: Duration = Duration::from_secs(5);

    /// Shortest accepted `node_down_alert_minutes`; anything lower produces false alarms
    pub const MIN_NODE_DOWN_MINUTES: u64 = 3;
}

/// Event stream session
pub mod session {
    use super::Duration;

    /// Session aborts when no finalized block arrives for this long
    pub const DEFAULT_IDLE_TIMEOUT_SECONDS: u64 = 60;

    pub const MAX_IDLE_TIMEOUT_SECONDS: u64 = 24 * 60 * 60;

    /// How often the idle timer is checked
    pub const IDLE_CHECK_INTERVAL: Duration = Duration::from_secs(5);

    /// Heartbeat log every N finalized heights
    pub const HEARTBEAT_EVERY_BLOCKS: i64 = 20;

    /// Buffer between the websocket reader and the classifier loop
    pub const EVENT_QUEUE_SIZE: usize = 1024;

    pub const QUERY_NEW_BLOCK: &str = "tm.event='NewBlock'";
    pub const QUERY_VOTE: &str = "tm.event='Vote'";
}

/// Sequencer block history
pub mod history {
    /// Length of the per-sequencer block result ring
    pub const SHOW_BLOCKS: usize = 512;

    /// Ring entry for a height with no data
    pub const NO_DATA: i32 = -1;
}

/// Epoch tracking against the sequencer-set indexer
pub mod epochs {
    use super::Duration;

    pub const POLL_INTERVAL: Duration = Duration::from_secs(30);

    /// Number of most recent epochs fetched per sequencer
    pub const FETCH_COUNT: u32 = 10;

    pub const INDEXER_TIMEOUT: Duration = Duration::from_secs(10);
}

/// Alerting and alarm bookkeeping
pub mod alerts {
    use super::Duration;

    /// Default window during which a repeated PagerDuty alert is treated as flapping
    pub const DEFAULT_FLAP_WINDOW_MINUTES: i64 = 5;

    /// Detector loop tick
    pub const WATCH_INTERVAL: Duration = Duration::from_secs(2);

    /// No-endpoints alarm grace, multiplied by `node_down_alert_minutes`
    pub const NO_ENDPOINTS_GRACE_SECONDS_PER_DOWN_MINUTE: u64 = 30;

    /// Upper bound for minute-based windows (flap, stall, node down): one week
    pub const MAX_WINDOW_MINUTES: u64 = 7 * 24 * 60;

    /// Webhook request timeout
    pub const DELIVERY_TIMEOUT: Duration = Duration::from_secs(30);

    /// Pending alert events between the detectors and the dispatcher
    pub const QUEUE_SIZE: usize = 256;

    /// Prefix shared by every stalled-chain alarm message
    pub const STALLED_PREFIX: &str = "stalled: have not seen a new block";

    /// Routing key shipped in the example config; never sent to PagerDuty
    pub const EXAMPLE_PAGERDUTY_KEY: &str = "aaaaaaaaaaaabbbbbbbbbbbbbcccccccccccc";

    pub const PAGERDUTY_EVENTS_URL: &str = "https://events.pagerduty.com/v2/enqueue";
    pub const TELEGRAM_API_URL: &str = "https://api.telegram.org";
}

/// Dashboard
pub mod dashboard {
    /// Log lines retained for the dashboard stream
    pub const LOG_CAPACITY: usize = 256;
}

/// Known chains and their companion services
pub mod chains {
    pub const MAINNET_CHAIN_ID: &str = "andromeda";
    pub const SEPOLIA_CHAIN_ID: &str = "sepolia-1";

    pub const MAINNET_SEQUENCER_SET_URL: &str =
        "https://andromeda-subgraph.metisdevops.link/subgraphs/name/metisio/sequencer-set";
    pub const MAINNET_L2_RPC_URL: &str = "https://andromeda.metis.io";

    pub const SEPOLIA_SEQUENCER_SET_URL: &str =
        "https://sepolia-subgraph.metisdevops.link/subgraphs/name/metisio/sequencer-set";
    pub const SEPOLIA_L2_RPC_URL: &str = "https://sepolia.metisdevops.link";
}

/// Name of the pseudo-entity that owns global alerts
pub const SENTINEL_ENTITY: &str = "Sentinel";
