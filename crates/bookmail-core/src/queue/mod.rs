//! Queue module: task records, retry policy and the in-memory dispatcher.

mod memory;
mod record;
mod retry;
mod state;

pub use memory::InMemoryQueue;
pub use record::TaskRecord;
pub use retry::RetryPolicy;
pub use state::{QueueCounts, TaskState};

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Decision, Outcome, TaskEnvelope, TaskId, TaskType};

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue is closed")]
    Closed,

    #[error("unknown task {0}")]
    UnknownTask(TaskId),

    #[error("failed to encode payload for task_type={task_type}: {source}")]
    Encode {
        task_type: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A task submission: what to run and under which retry policy.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub task_type: TaskType,
    pub payload: serde_json::Value,
    pub retry_policy: RetryPolicy,
}

impl NewTask {
    pub fn new(task_type: TaskType, payload: serde_json::Value) -> Self {
        Self {
            task_type,
            payload,
            retry_policy: RetryPolicy::none(),
        }
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }
}

/// A leased task. The worker owns the lease and must `complete` it.
///
/// The queue owns state transitions; the worker only reports the outcome.
#[async_trait]
pub trait TaskLease: Send {
    fn envelope(&self) -> &TaskEnvelope;

    /// 1-indexed execution number of this lease.
    fn attempt(&self) -> u32;

    /// Record the outcome and apply the decider's decision.
    async fn complete(self: Box<Self>, outcome: Outcome) -> Result<Decision, QueueError>;
}

/// Dispatcher surface used by workers, sweeps and the scheduler.
#[async_trait]
pub trait Queue: Send + Sync {
    /// Submit for immediate execution.
    async fn enqueue(&self, task: NewTask) -> Result<TaskId, QueueError>;

    /// Submit for execution once `delay` has elapsed.
    async fn enqueue_after(&self, task: NewTask, delay: Duration) -> Result<TaskId, QueueError>;

    /// Wait for a ready task. `None` once the queue is closed.
    async fn lease(&self) -> Option<Box<dyn TaskLease>>;

    async fn counts_by_state(&self) -> Result<QueueCounts, QueueError>;
}
