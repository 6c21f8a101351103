//! Bounded fixed-interval polling.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How often and how many times to look at a remote record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Wait before each poll (ms)
    pub interval_ms: u64,
    /// Poll cap; reaching it ends the wait with a timeout
    pub max_polls: u32,
}

impl PollConfig {
    pub fn new(interval: Duration, max_polls: u32) -> Self {
        Self {
            interval_ms: interval.as_millis() as u64,
            max_polls,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Sleep one interval.
    pub async fn tick(&self) {
        tokio::time::sleep(self.interval()).await;
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: 2_000,
            max_polls: 20,
        }
    }
}
