//! Task record: metadata + envelope.

use tokio::time::Instant;

use super::{RetryPolicy, TaskState};
use crate::domain::TaskEnvelope;

/// The queue's source of truth for one task.
///
/// Ready/scheduled structures only hold `TaskId`s; every state transition
/// goes through the methods below.
#[derive(Debug, Clone)]
pub struct TaskRecord {
    pub envelope: TaskEnvelope,
    pub state: TaskState,

    /// Executions so far, including the current one while Running.
    pub attempts: u32,

    pub retry_policy: RetryPolicy,

    pub last_error: Option<String>,

    /// Result summary of the successful attempt.
    pub result: Option<String>,

    /// When a Scheduled / RetryScheduled task becomes due.
    pub next_run_at: Option<Instant>,

    pub created_at: Instant,
    pub updated_at: Instant,
}

impl TaskRecord {
    pub fn new(envelope: TaskEnvelope, retry_policy: RetryPolicy) -> Self {
        let now = Instant::now();
        Self {
            envelope,
            state: TaskState::Queued,
            attempts: 0,
            retry_policy,
            last_error: None,
            result: None,
            next_run_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// A record that only becomes runnable at `run_at`.
    pub fn new_scheduled(
        envelope: TaskEnvelope,
        retry_policy: RetryPolicy,
        run_at: Instant,
    ) -> Self {
        let mut record = Self::new(envelope, retry_policy);
        record.state = TaskState::Scheduled;
        record.next_run_at = Some(run_at);
        record
    }

    /// Retries already consumed (executions beyond the first).
    pub fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }

    pub fn start_attempt(&mut self) {
        self.state = TaskState::Running;
        self.attempts += 1;
        self.updated_at = Instant::now();
    }

    pub fn mark_succeeded(&mut self, summary: String) {
        self.state = TaskState::Succeeded;
        self.result = Some(summary);
        self.updated_at = Instant::now();
    }

    pub fn mark_dead(&mut self, error: String) {
        self.state = TaskState::Dead;
        self.last_error = Some(error);
        self.updated_at = Instant::now();
    }

    pub fn schedule_retry(&mut self, next_run_at: Instant, error: String) {
        self.state = TaskState::RetryScheduled;
        self.next_run_at = Some(next_run_at);
        self.last_error = Some(error);
        self.updated_at = Instant::now();
    }

    /// Scheduled / RetryScheduled -> Queued.
    pub fn requeue(&mut self) {
        self.state = TaskState::Queued;
        self.next_run_at = None;
        self.updated_at = Instant::now();
    }
}
