//! Task state machine for the queue.

use serde::{Deserialize, Serialize};

/// State transitions:
/// - Queued -> Running -> Succeeded
/// - Queued -> Running -> RetryScheduled -> Queued (until the retry budget is spent)
/// - Queued -> Running -> Dead
/// - Scheduled -> Queued (delayed submission becomes due)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Submitted for later execution, not due yet.
    Scheduled,

    /// Ready to run.
    Queued,

    /// Leased by a worker.
    Running,

    Succeeded,

    /// Waiting out a retry delay.
    RetryScheduled,

    /// Failed permanently or ran out of retries.
    Dead,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Succeeded | TaskState::Dead)
    }

    pub fn is_waiting(self) -> bool {
        matches!(self, TaskState::Scheduled | TaskState::RetryScheduled)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    pub scheduled: usize,
    pub queued: usize,
    pub running: usize,
    pub succeeded: usize,
    pub retry_scheduled: usize,
    pub dead: usize,
}

impl QueueCounts {
    pub fn add(&mut self, state: TaskState) {
        match state {
            TaskState::Scheduled => self.scheduled += 1,
            TaskState::Queued => self.queued += 1,
            TaskState::Running => self.running += 1,
            TaskState::Succeeded => self.succeeded += 1,
            TaskState::RetryScheduled => self.retry_scheduled += 1,
            TaskState::Dead => self.dead += 1,
        }
    }

    /// Tasks that have not reached a terminal state.
    pub fn in_flight(&self) -> usize {
        self.scheduled + self.queued + self.running + self.retry_scheduled
    }
}
