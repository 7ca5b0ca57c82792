//! Raise/clear state machines behind the watch loop
//!
//! Each detector remembers whether its alarm is open and only reports edges,
//! so the watch loop can call them on every tick.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;

use crate::constants::alerts::{NO_ENDPOINTS_GRACE_SECONDS_PER_DOWN_MINUTE, STALLED_PREFIX};
use crate::health::EndpointState;

pub const NO_ENDPOINTS_MESSAGE: &str = "no RPC endpoints are working";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Raise,
    Clear,
}

/// No finalized block for longer than `stalled_minutes`.
#[derive(Debug, Clone)]
pub struct StallDetector {
    enabled: bool,
    threshold: Duration,
    message: String,
    /// Baseline until the first block arrives
    started: DateTime<Utc>,
    alarmed: bool,
}

impl StallDetector {
    pub fn new(enabled: bool, minutes: u64, chain_id: &str, started: DateTime<Utc>) -> Self {
        Self {
            enabled,
            threshold: Duration::minutes(minutes as i64),
            message: format!("{} on {} in {} minutes", STALLED_PREFIX, chain_id, minutes),
            started,
            alarmed: false,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn set_alarmed(&mut self, alarmed: bool) {
        self.alarmed = alarmed;
    }

    pub fn check(&mut self, last_block: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<Transition> {
        if !self.enabled {
            return None;
        }

        // a restored alarm stays open until a block is actually seen
        if self.alarmed && last_block.is_none() {
            return None;
        }

        let stalled = now - last_block.unwrap_or(self.started) > self.threshold;
        match (stalled, self.alarmed) {
            (true, false) => {
                self.alarmed = true;
                Some(Transition::Raise)
            }
            (false, true) => {
                self.alarmed = false;
                Some(Transition::Clear)
            }
            _ => None,
        }
    }
}

/// Every endpoint unusable for longer than the grace window.
#[derive(Debug, Clone)]
pub struct NoEndpointsDetector {
    enabled: bool,
    grace: Duration,
    since: Option<DateTime<Utc>>,
    alarmed: bool,
}

impl NoEndpointsDetector {
    pub fn new(enabled: bool, node_down_minutes: u64) -> Self {
        Self {
            enabled,
            grace: Duration::seconds((NO_ENDPOINTS_GRACE_SECONDS_PER_DOWN_MINUTE * node_down_minutes) as i64),
            since: None,
            alarmed: false,
        }
    }

    pub fn set_alarmed(&mut self, alarmed: bool) {
        self.alarmed = alarmed;
    }

    /// `None` means connectivity is not known yet; nothing changes until it is.
    pub fn check(&mut self, no_endpoints: Option<bool>, now: DateTime<Utc>) -> Option<Transition> {
        let no_endpoints = no_endpoints?;
        if !no_endpoints {
            self.since = None;
            if self.alarmed {
                self.alarmed = false;
                return Some(Transition::Clear);
            }
            return None;
        }

        let since = *self.since.get_or_insert(now);
        if self.enabled && !self.alarmed && now - since >= self.grace {
            self.alarmed = true;
            return Some(Transition::Raise);
        }
        None
    }
}

/// Consecutive misses of one sequencer at or above its threshold.
#[derive(Debug, Clone)]
pub struct MissDetector {
    enabled: bool,
    threshold: u64,
    alarmed: bool,
}

impl MissDetector {
    pub fn new(enabled: bool, threshold: u64) -> Self {
        Self {
            enabled,
            threshold,
            alarmed: false,
        }
    }

    pub fn message(&self) -> String {
        format!("🚨 sequencer has missed {} blocks", self.threshold)
    }

    pub fn set_alarmed(&mut self, alarmed: bool) {
        self.alarmed = alarmed;
    }

    pub fn check(&mut self, consecutive_miss: u64) -> Option<Transition> {
        if !self.enabled {
            return None;
        }

        let over = consecutive_miss >= self.threshold;
        match (over, self.alarmed) {
            (true, false) => {
                self.alarmed = true;
                Some(Transition::Raise)
            }
            (false, true) => {
                self.alarmed = false;
                Some(Transition::Clear)
            }
            _ => None,
        }
    }
}

/// Per-endpoint downtime, keyed by rpc url.
#[derive(Debug, Clone)]
pub struct EndpointDownDetector {
    minutes: u64,
    severity: String,
    alarmed: HashSet<String>,
}

impl EndpointDownDetector {
    pub fn new(minutes: u64, severity: &str) -> Self {
        Self {
            minutes,
            severity: severity.to_string(),
            alarmed: HashSet::new(),
        }
    }

    pub fn message(&self, rpc_url: &str) -> String {
        format!(
            "Severity: {}\nRPC node {} has been down for > {} minutes",
            self.severity, rpc_url, self.minutes
        )
    }

    pub fn severity(&self) -> &str {
        &self.severity
    }

    pub fn set_alarmed(&mut self, rpc_url: &str) {
        self.alarmed.insert(rpc_url.to_string());
    }

    pub fn check(&mut self, endpoint: &EndpointState, now: DateTime<Utc>) -> Option<Transition> {
        let alarmed = self.alarmed.contains(&endpoint.rpc_url);

        if !endpoint.down {
            if alarmed {
                self.alarmed.remove(&endpoint.rpc_url);
                return Some(Transition::Clear);
            }
            return None;
        }

        let long_enough = endpoint
            .down_since
            .is_some_and(|since| now - since >= Duration::minutes(self.minutes as i64));
        if endpoint.alert_if_down && long_enough && !alarmed {
            self.alarmed.insert(endpoint.rpc_url.clone());
            return Some(Transition::Raise);
        }
        None
    }
}
