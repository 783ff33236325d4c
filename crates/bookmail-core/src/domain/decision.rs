//! Decision model: what the dispatcher does after an attempt.
//!
//! The Decider is a pure function of the task record and the outcome of its
//! latest attempt. Applying the decision (state change, scheduling) is the
//! queue's job.

use std::time::Duration;

use super::Outcome;
use crate::queue::TaskRecord;

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// The task finished; nothing more to do.
    Complete,

    /// Run the task again after `delay`.
    Retry { delay: Duration, reason: String },

    /// Give up on the task.
    MarkDead { reason: String },
}

impl Decision {
    /// Short name stored in decision history.
    pub fn name(&self) -> &'static str {
        match self {
            Decision::Complete => "complete",
            Decision::Retry { .. } => "schedule_retry",
            Decision::MarkDead { .. } => "mark_dead",
        }
    }
}

pub trait Decider: Send + Sync {
    fn decide(&self, task: &TaskRecord, outcome: &Outcome) -> Decision;
}

/// Retry budget enforcement based on the task's own [`RetryPolicy`].
///
/// - `Success` completes the task.
/// - `PermanentFailure` marks it dead immediately.
/// - `RetryableFailure` is retried while `retries < max_retries`. The delay
///   requested by the task wins over the policy delay.
///
/// [`RetryPolicy`]: crate::queue::RetryPolicy
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultDecider;

impl Decider for DefaultDecider {
    fn decide(&self, task: &TaskRecord, outcome: &Outcome) -> Decision {
        match outcome {
            Outcome::Success { .. } => Decision::Complete,
            Outcome::PermanentFailure { reason } => Decision::MarkDead {
                reason: reason.clone(),
            },
            Outcome::RetryableFailure { reason, delay, .. } => {
                let policy = &task.retry_policy;
                let retries = task.retries();
                if retries >= policy.max_retries {
                    Decision::MarkDead {
                        reason: format!(
                            "max retries reached ({}/{}): {reason}",
                            retries, policy.max_retries
                        ),
                    }
                } else {
                    let next = retries + 1;
                    let delay = if delay.is_zero() {
                        policy.delay
                    } else {
                        *delay
                    };
                    Decision::Retry {
                        delay,
                        reason: format!(
                            "retry {next}/{} after {delay:?}: {reason}",
                            policy.max_retries
                        ),
                    }
                }
            }
        }
    }
}
