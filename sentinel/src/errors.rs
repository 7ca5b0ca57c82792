//! Custom error types for the sequencer sentinel
//!
//! Most operational code returns `anyhow::Result`; these types exist where a
//! caller has to decide what to do based on the kind of failure.

use std::fmt;

/// Main error type for the sentinel
#[derive(Debug)]
pub enum SentinelError {
    /// Configuration-related errors, fatal at startup
    Config(ConfigError),

    /// RPC endpoint selection or probing errors
    Endpoint(EndpointError),

    /// Event stream session ended
    Session(SessionError),

    /// Sequencer-set indexer errors
    Indexer(String),

    /// State file errors
    Persistence(String),

    /// Notification channel errors
    Delivery { channel: String, reason: String },

    /// Other errors with context
    Other(String),
}

/// Configuration error variants
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to load configuration file
    LoadFailed { path: String, reason: String },

    /// Invalid configuration value
    InvalidValue { field: String, reason: String },

    /// Missing required configuration
    MissingRequired { field: String },

    /// Configuration parsing error
    ParseError { reason: String },
}

/// Endpoint error variants
#[derive(Debug)]
pub enum EndpointError {
    /// URL could not be parsed or has an unsupported scheme
    InvalidUrl { url: String, reason: String },

    /// Status call or websocket dial failed
    Unreachable { url: String, reason: String },

    /// Node reports another chain
    WrongNetwork {
        url: String,
        expected: String,
        actual: String,
    },

    /// Node is still catching up
    CatchingUp { url: String },

    /// Every configured endpoint failed
    NoUsableEndpoints,
}

/// Reasons an event stream session terminates
#[derive(Debug)]
pub enum SessionError {
    /// No finalized block within the idle window
    Idle { seconds: u64 },

    /// Websocket read failed
    Read { reason: String },

    /// Remote closed the stream
    Closed,

    /// Subscribe request could not be written
    Subscribe { reason: String },
}

impl fmt::Display for SentinelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SentinelError::Config(e) => write!(f, "Configuration error: {}", e),
            SentinelError::Endpoint(e) => write!(f, "Endpoint error: {}", e),
            SentinelError::Session(e) => write!(f, "Session error: {}", e),
            SentinelError::Indexer(msg) => write!(f, "Indexer error: {}", msg),
            SentinelError::Persistence(msg) => write!(f, "State file error: {}", msg),
            SentinelError::Delivery { channel, reason } => {
                write!(f, "Delivery to {} failed: {}", channel, reason)
            }
            SentinelError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::LoadFailed { path, reason } => {
                write!(f, "Failed to load config from '{}': {}", path, reason)
            }
            ConfigError::InvalidValue { field, reason } => {
                write!(f, "Invalid value for '{}': {}", field, reason)
            }
            ConfigError::MissingRequired { field } => {
                write!(f, "Missing required field: {}", field)
            }
            ConfigError::ParseError { reason } => {
                write!(f, "Failed to parse config: {}", reason)
            }
        }
    }
}

impl fmt::Display for EndpointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointError::InvalidUrl { url, reason } => {
                write!(f, "could not parse url: ({}) {}", url, reason)
            }
            EndpointError::Unreachable { url, reason } => {
                write!(f, "could not get status: ({}) {}", url, reason)
            }
            EndpointError::WrongNetwork {
                url,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "networkId {} on {} does not match, expected {}",
                    actual, url, expected
                )
            }
            EndpointError::CatchingUp { url } => write!(f, "node is not synced: {}", url),
            EndpointError::NoUsableEndpoints => write!(f, "no usable endpoints available"),
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Idle { seconds } => {
                write!(f, "websocket idle for {} seconds, exiting", seconds)
            }
            SessionError::Read { reason } => write!(f, "websocket read failed: {}", reason),
            SessionError::Closed => write!(f, "websocket closed by remote"),
            SessionError::Subscribe { reason } => write!(f, "subscribe failed: {}", reason),
        }
    }
}

impl std::error::Error for SentinelError {}
impl std::error::Error for ConfigError {}
impl std::error::Error for EndpointError {}
impl std::error::Error for SessionError {}

impl From<anyhow::Error> for SentinelError {
    fn from(err: anyhow::Error) -> Self {
        SentinelError::Other(err.to_string())
    }
}

impl From<ConfigError> for SentinelError {
    fn from(err: ConfigError) -> Self {
        SentinelError::Config(err)
    }
}

impl From<EndpointError> for SentinelError {
    fn from(err: EndpointError) -> Self {
        SentinelError::Endpoint(err)
    }
}

impl From<SessionError> for SentinelError {
    fn from(err: SessionError) -> Self {
        SentinelError::Session(err)
    }
}
