use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tokio::sync::RwLock;

use crate::constants::dashboard::LOG_CAPACITY;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogLine {
    pub ts: i64,
    pub msg: String,
}

/// Bounded log stream for the dashboard. Statuses are read live from the
/// sequencer set.
pub struct Dashboard {
    logs: RwLock<VecDeque<LogLine>>,
    hide_logs: bool,
}

impl Dashboard {
    pub fn new(hide_logs: bool) -> Self {
        Self {
            logs: RwLock::new(VecDeque::with_capacity(LOG_CAPACITY)),
            hide_logs,
        }
    }

    pub async fn log(&self, msg: &str) {
        if self.hide_logs {
            return;
        }
        let mut logs = self.logs.write().await;
        if logs.len() == LOG_CAPACITY {
            logs.pop_front();
        }
        logs.push_back(LogLine {
            ts: Utc::now().timestamp(),
            msg: msg.to_string(),
        });
    }

    /// Oldest first
    pub async fn logs(&self) -> Vec<LogLine> {
        self.logs.read().await.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_ring_is_bounded() {
        let dashboard = Dashboard::new(false);
        for i in 0..LOG_CAPACITY + 10 {
            dashboard.log(&format!("line {}", i)).await;
        }
        let logs = dashboard.logs().await;
        assert_eq!(logs.len(), LOG_CAPACITY);
        assert_eq!(logs[0].msg, "line 10");
    }

    #[tokio::test]
    async fn test_hidden_logs_are_dropped() {
        let dashboard = Dashboard::new(true);
        dashboard.log("secret").await;
        assert!(dashboard.logs().await.is_empty());
    }
}
