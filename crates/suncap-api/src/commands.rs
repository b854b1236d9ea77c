//! Manual control requests and their outcomes

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Options for a manually started session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualStartOptions {
    /// Seconds between captures; absent or 0 uses the configured interval
    #[serde(default)]
    pub interval_seconds: Option<u64>,

    /// Stop after this many successful captures; absent or 0 means unlimited
    #[serde(default)]
    pub max_captures: Option<u32>,
}

impl ManualStartOptions {
    pub fn interval(&self, configured: Duration) -> Duration {
        self.interval_seconds
            .filter(|&s| s > 0)
            .map(Duration::from_secs)
            .unwrap_or(configured)
    }

    pub fn capture_limit(&self) -> Option<u32> {
        self.max_captures.filter(|&n| n > 0)
    }
}

/// Result of an accepted manual start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ManualStartOutcome {
    /// Session is running
    Started,
    /// The capture limit was reached on the immediate capture
    Completed { captures: u32 },
}
