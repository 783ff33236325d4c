//! Retry policy: retry budget and the delay between runs.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How many times a failed task may run again, and how long to wait.
///
/// `max_retries` counts re-runs, not executions: a policy with
/// `max_retries = 3` allows four executions in total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_retries: u32,

    /// Wait before each re-run when the failed attempt asked for none.
    pub delay: Duration,
}

impl RetryPolicy {
    /// Never retry.
    pub fn none() -> Self {
        Self::fixed(0, Duration::ZERO)
    }

    pub fn fixed(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}
