use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timeout / retry / backoff profile of one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Additional attempts after the first one.
    #[serde(default)]
    pub max_retries: u32,
    /// Per-attempt budget. `None` means the attempt is never raced against a timer.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// Base of the exponential backoff.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

fn default_backoff_ms() -> u64 {
    1_000
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            timeout_ms: Some(60_000),
            backoff_ms: default_backoff_ms(),
        }
    }
}

impl RetryPolicy {
    pub const fn new(max_retries: u32, timeout_ms: Option<u64>, backoff_ms: u64) -> Self {
        Self {
            max_retries,
            timeout_ms,
            backoff_ms,
        }
    }

    /// A single attempt with no timer.
    pub const fn single_shot() -> Self {
        Self::new(0, None, 0)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

/// Options for the windowed batch aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// Items dispatched together; the next window starts once this one settles.
    pub window_size: usize,
}

pub const DEFAULT_WINDOW_SIZE: usize = 3;

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
        }
    }
}

impl BatchOptions {
    pub fn with_window(window_size: usize) -> Self {
        Self {
            window_size: window_size.max(1),
        }
    }
}
