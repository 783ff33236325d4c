//! Attempt and decision history.
//!
//! Every completed attempt leaves an `AttemptRecord`, and every decision the
//! dispatcher takes on it leaves a `DecisionRecord`. Together they answer
//! "why was this email sent twice" or "why did this task die".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{AttemptId, TaskId};
use super::outcome::Outcome;
use super::task::TaskType;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub attempt_id: AttemptId,
    pub task_id: TaskId,
    pub task_type: TaskType,

    /// 1-indexed attempt number for this task.
    pub attempt: u32,

    /// Payload the handler ran with.
    pub payload: serde_json::Value,

    pub outcome: Outcome,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub task_id: TaskId,

    /// What triggered the decision (outcome kind, attempt counts, ...).
    pub trigger: serde_json::Value,

    /// Policy that was applied, e.g. "retry_policy".
    pub policy: String,

    /// "complete", "schedule_retry" or "mark_dead".
    pub decision: String,

    pub context: Option<serde_json::Value>,
    pub decided_at: DateTime<Utc>,
}

impl DecisionRecord {
    pub fn new(
        task_id: TaskId,
        trigger: serde_json::Value,
        policy: impl Into<String>,
        decision: impl Into<String>,
        context: Option<serde_json::Value>,
        decided_at: DateTime<Utc>,
    ) -> Self {
        Self {
            task_id,
            trigger,
            policy: policy.into(),
            decision: decision.into(),
            context,
            decided_at,
        }
    }
}
