//! Outcome model: what a unit of work reports back to the dispatcher.
//!
//! Tasks never schedule their own retries. They describe what happened and,
//! for transient failures, how long they would like to wait; the dispatcher
//! owns the retry budget and applies it through a [`Decider`](super::Decider).

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeKind {
    Success,
    RetryableFailure,
    PermanentFailure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// The work is done. `summary` is the human-readable task result.
    Success { summary: String },

    /// Transient failure; the task asks to be retried after `delay`.
    /// `attempt` is the attempt number that failed (1-indexed).
    RetryableFailure {
        reason: String,
        #[serde(with = "duration_secs")]
        delay: Duration,
        attempt: u32,
    },

    /// Retrying would not help.
    PermanentFailure { reason: String },
}

impl Outcome {
    pub fn success(summary: impl Into<String>) -> Self {
        Self::Success {
            summary: summary.into(),
        }
    }

    pub fn retry_after(reason: impl Into<String>, delay: Duration, attempt: u32) -> Self {
        Self::RetryableFailure {
            reason: reason.into(),
            delay,
            attempt,
        }
    }

    pub fn permanent(reason: impl Into<String>) -> Self {
        Self::PermanentFailure {
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> OutcomeKind {
        match self {
            Outcome::Success { .. } => OutcomeKind::Success,
            Outcome::RetryableFailure { .. } => OutcomeKind::RetryableFailure,
            Outcome::PermanentFailure { .. } => OutcomeKind::PermanentFailure,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    /// Summary on success, reason on failure.
    pub fn message(&self) -> &str {
        match self {
            Outcome::Success { summary } => summary,
            Outcome::RetryableFailure { reason, .. } | Outcome::PermanentFailure { reason } => {
                reason
            }
        }
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
