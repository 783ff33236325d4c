//! In-memory queue implementation.

use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;
use tracing::{debug, warn};

use super::{NewTask, Queue, QueueCounts, QueueError, TaskLease, TaskRecord};
use crate::domain::{
    AttemptRecord, Decider, Decision, DecisionRecord, DefaultDecider, Outcome, TaskEnvelope, TaskId,
};
use crate::ports::{Clock, IdGenerator, SystemClock, UlidGenerator};

/// Min-heap entry (earliest `next_run_at` first).
#[derive(Debug, Clone, PartialEq, Eq)]
struct ScheduledTask {
    next_run_at: Instant,
    task_id: TaskId,
}

impl PartialOrd for ScheduledTask {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledTask {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other
            .next_run_at
            .cmp(&self.next_run_at)
            .then_with(|| other.task_id.cmp(&self.task_id))
    }
}

#[derive(Default)]
struct QueueState {
    records: HashMap<TaskId, TaskRecord>,

    /// Submission order, for stable listings.
    order: Vec<TaskId>,

    ready: VecDeque<TaskId>,
    scheduled: BinaryHeap<ScheduledTask>,
    attempts: Vec<AttemptRecord>,
    decisions: Vec<DecisionRecord>,

    /// Succeeded / Dead tasks, oldest first.
    finished: VecDeque<TaskId>,

    /// How many finished tasks to keep. `None` keeps them all.
    retain_finished: Option<usize>,
    closed: bool,
}

impl QueueState {
    fn insert(&mut self, task_id: TaskId, record: TaskRecord) {
        match record.next_run_at {
            Some(next_run_at) => self.scheduled.push(ScheduledTask {
                next_run_at,
                task_id,
            }),
            None => self.ready.push_back(task_id),
        }
        self.records.insert(task_id, record);
        self.order.push(task_id);
    }

    /// Move due Scheduled / RetryScheduled tasks to the ready queue.
    fn promote_due(&mut self, now: Instant) {
        while let Some(entry) = self.scheduled.peek() {
            if entry.next_run_at > now {
                break;
            }
            let Some(entry) = self.scheduled.pop() else {
                break;
            };
            if let Some(record) = self.records.get_mut(&entry.task_id)
                && record.state.is_waiting()
            {
                record.requeue();
                self.ready.push_back(entry.task_id);
            }
        }
    }

    /// Note that `task_id` reached a final state and drop the oldest finished
    /// tasks, with their history, once there are more than `retain_finished`.
    fn finish(&mut self, task_id: TaskId) {
        self.finished.push_back(task_id);
        let Some(limit) = self.retain_finished else {
            return;
        };
        let excess = self.finished.len().saturating_sub(limit);
        if excess == 0 {
            return;
        }

        let evicted: HashSet<TaskId> = self.finished.drain(..excess).collect();
        for task_id in &evicted {
            self.records.remove(task_id);
        }
        self.order.retain(|id| !evicted.contains(id));
        self.attempts.retain(|a| !evicted.contains(&a.task_id));
        self.decisions.retain(|d| !evicted.contains(&d.task_id));
        debug!(evicted = evicted.len(), "finished tasks dropped");
    }

    fn counts(&self) -> QueueCounts {
        let mut counts = QueueCounts::default();
        for record in self.records.values() {
            counts.add(record.state);
        }
        counts
    }
}

struct Shared {
    state: Mutex<QueueState>,
    notify: Notify,
    clock: Arc<dyn Clock>,
    ids: Box<dyn IdGenerator>,
    decider: Arc<dyn Decider>,
}

/// In-memory dispatcher.
///
/// Holds task records plus their attempt and decision history, so tests
/// and the CLI can explain what happened to each unit of work. Unfinished
/// tasks are always kept; finished ones are kept up to `retain_finished`.
#[derive(Clone)]
pub struct InMemoryQueue {
    shared: Arc<Shared>,
}

impl InMemoryQueue {
    /// Keeps every finished task.
    pub fn new() -> Self {
        Self::with_parts(Arc::new(SystemClock), Arc::new(DefaultDecider), None)
    }

    /// Keeps the `retain_finished` most recently finished tasks.
    pub fn bounded(retain_finished: usize) -> Self {
        Self::with_parts(
            Arc::new(SystemClock),
            Arc::new(DefaultDecider),
            Some(retain_finished),
        )
    }

    pub fn with_parts(
        clock: Arc<dyn Clock>,
        decider: Arc<dyn Decider>,
        retain_finished: Option<usize>,
    ) -> Self {
        let ids = Box::new(UlidGenerator::new(Arc::clone(&clock)));
        let state = QueueState {
            retain_finished,
            ..QueueState::default()
        };
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                notify: Notify::new(),
                clock,
                ids,
                decider,
            }),
        }
    }

    /// Stop handing out leases. Waiting `lease()` calls return `None`.
    pub async fn close(&self) {
        self.shared.state.lock().await.closed = true;
        self.shared.notify.notify_waiters();
    }

    pub async fn task(&self, task_id: TaskId) -> Option<TaskRecord> {
        self.shared.state.lock().await.records.get(&task_id).cloned()
    }

    /// All tasks of one type, in submission order.
    pub async fn tasks_of_type(&self, task_type: &str) -> Vec<TaskRecord> {
        let state = self.shared.state.lock().await;
        state
            .order
            .iter()
            .filter_map(|id| state.records.get(id))
            .filter(|r| r.envelope.task_type().as_str() == task_type)
            .cloned()
            .collect()
    }

    pub async fn attempts(&self) -> Vec<AttemptRecord> {
        self.shared.state.lock().await.attempts.clone()
    }

    pub async fn decisions(&self) -> Vec<DecisionRecord> {
        self.shared.state.lock().await.decisions.clone()
    }

    async fn submit(&self, task: NewTask, run_at: Option<Instant>) -> Result<TaskId, QueueError> {
        let task_id = self.shared.ids.generate_task_id();
        let submitted_at = self.shared.clock.now();
        let envelope = TaskEnvelope::new(task_id, task.task_type, task.payload, submitted_at);
        let record = match run_at {
            Some(at) => TaskRecord::new_scheduled(envelope, task.retry_policy, at),
            None => TaskRecord::new(envelope, task.retry_policy),
        };

        {
            let mut state = self.shared.state.lock().await;
            if state.closed {
                return Err(QueueError::Closed);
            }
            debug!(%task_id, task_type = %record.envelope.task_type(), "task submitted");
            state.insert(task_id, record);
        }

        self.shared.notify.notify_one();
        Ok(task_id)
    }
}

impl Default for InMemoryQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Queue for InMemoryQueue {
    async fn enqueue(&self, task: NewTask) -> Result<TaskId, QueueError> {
        self.submit(task, None).await
    }

    async fn enqueue_after(&self, task: NewTask, delay: Duration) -> Result<TaskId, QueueError> {
        self.submit(task, Some(Instant::now() + delay)).await
    }

    async fn lease(&self) -> Option<Box<dyn TaskLease>> {
        loop {
            // Register interest before inspecting state so a notify between
            // the check and the await is not lost.
            let notified = self.shared.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let next_wake = {
                let mut state = self.shared.state.lock().await;
                if state.closed {
                    return None;
                }
                state.promote_due(Instant::now());

                while let Some(task_id) = state.ready.pop_front() {
                    let Some(record) = state.records.get_mut(&task_id) else {
                        continue;
                    };
                    record.start_attempt();
                    let lease = InMemoryLease {
                        task_id,
                        attempt: record.attempts,
                        envelope: record.envelope.clone(),
                        shared: Arc::clone(&self.shared),
                    };
                    return Some(Box::new(lease));
                }

                state.scheduled.peek().map(|entry| entry.next_run_at)
            };

            match next_wake {
                Some(wake_at) => {
                    tokio::select! {
                        _ = &mut notified => {},
                        _ = tokio::time::sleep_until(wake_at) => {},
                    }
                }
                None => notified.await,
            }
        }
    }

    async fn counts_by_state(&self) -> Result<QueueCounts, QueueError> {
        Ok(self.shared.state.lock().await.counts())
    }
}

struct InMemoryLease {
    task_id: TaskId,
    attempt: u32,
    envelope: TaskEnvelope,
    shared: Arc<Shared>,
}

#[async_trait]
impl TaskLease for InMemoryLease {
    fn envelope(&self) -> &TaskEnvelope {
        &self.envelope
    }

    fn attempt(&self) -> u32 {
        self.attempt
    }

    async fn complete(self: Box<Self>, outcome: Outcome) -> Result<Decision, QueueError> {
        let now = self.shared.clock.now();
        let attempt_id = self.shared.ids.generate_attempt_id();

        let decision = {
            let mut guard = self.shared.state.lock().await;
            let state = &mut *guard;

            let Some(record) = state.records.get_mut(&self.task_id) else {
                return Err(QueueError::UnknownTask(self.task_id));
            };

            let decision = self.shared.decider.decide(record, &outcome);
            let trigger = serde_json::json!({
                "outcome": outcome.kind(),
                "message": outcome.message(),
                "attempts": record.attempts,
                "max_retries": record.retry_policy.max_retries,
            });

            let finished = !matches!(decision, Decision::Retry { .. });
            let context = match &decision {
                Decision::Complete => {
                    record.mark_succeeded(outcome.message().to_string());
                    None
                }
                Decision::Retry { delay, reason } => {
                    let next_run_at = Instant::now() + *delay;
                    record.schedule_retry(next_run_at, reason.clone());
                    state.scheduled.push(ScheduledTask {
                        next_run_at,
                        task_id: self.task_id,
                    });
                    Some(serde_json::json!({ "delay_secs": delay.as_secs_f64() }))
                }
                Decision::MarkDead { reason } => {
                    warn!(
                        task_id = %self.task_id,
                        task_type = %self.envelope.task_type(),
                        attempts = record.attempts,
                        %reason,
                        "task marked dead"
                    );
                    record.mark_dead(reason.clone());
                    None
                }
            };

            state.attempts.push(AttemptRecord {
                attempt_id,
                task_id: self.task_id,
                task_type: self.envelope.task_type().clone(),
                attempt: self.attempt,
                payload: self.envelope.payload().clone(),
                outcome,
                completed_at: now,
            });
            state.decisions.push(DecisionRecord::new(
                self.task_id,
                trigger,
                "retry_policy",
                decision.name(),
                context,
                now,
            ));
            if finished {
                state.finish(self.task_id);
            }

            decision
        };

        // A waiting worker may need to shorten its sleep.
        if matches!(decision, Decision::Retry { .. }) {
            self.shared.notify.notify_one();
        }

        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OutcomeKind, TaskType};
    use crate::queue::{RetryPolicy, TaskState};

    fn new_task(name: &str) -> NewTask {
        NewTask::new(TaskType::new(name), serde_json::json!({"key": "value"}))
    }

    #[tokio::test]
    async fn enqueue_and_counts() {
        let queue = InMemoryQueue::new();
        queue.enqueue(new_task("test")).await.unwrap();

        let counts = queue.counts_by_state().await.unwrap();
        assert_eq!(counts.queued, 1);
        assert_eq!(counts.running, 0);
    }

    #[tokio::test]
    async fn lease_transitions_to_running() {
        let queue = InMemoryQueue::new();
        let id = queue.enqueue(new_task("test")).await.unwrap();

        let lease = tokio::time::timeout(Duration::from_millis(100), queue.lease())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(lease.envelope().task_id(), id);
        assert_eq!(lease.envelope().task_type().as_str(), "test");
        assert_eq!(lease.attempt(), 1);

        let counts = queue.counts_by_state().await.unwrap();
        assert_eq!(counts.queued, 0);
        assert_eq!(counts.running, 1);
    }

    #[tokio::test]
    async fn success_marks_succeeded_and_records_history() {
        let queue = InMemoryQueue::new();
        let id = queue.enqueue(new_task("test")).await.unwrap();

        let lease = queue.lease().await.unwrap();
        let decision = lease.complete(Outcome::success("done")).await.unwrap();
        assert_eq!(decision, Decision::Complete);

        let record = queue.task(id).await.unwrap();
        assert_eq!(record.state, TaskState::Succeeded);
        assert_eq!(record.result.as_deref(), Some("done"));

        let attempts = queue.attempts().await;
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].outcome.kind(), OutcomeKind::Success);
        assert_eq!(attempts[0].payload, serde_json::json!({"key": "value"}));

        let decisions = queue.decisions().await;
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].decision, "complete");
    }

    #[tokio::test]
    async fn retryable_failure_schedules_retry() {
        let queue = InMemoryQueue::new();
        let task =
            new_task("test").with_retry_policy(RetryPolicy::fixed(3, Duration::from_secs(60)));
        let id = queue.enqueue(task).await.unwrap();

        let lease = queue.lease().await.unwrap();
        let decision = lease
            .complete(Outcome::retry_after("smtp down", Duration::from_secs(60), 1))
            .await
            .unwrap();
        assert!(matches!(
            decision,
            Decision::Retry { delay, .. } if delay == Duration::from_secs(60)
        ));

        let record = queue.task(id).await.unwrap();
        assert_eq!(record.state, TaskState::RetryScheduled);

        let decisions = queue.decisions().await;
        assert_eq!(decisions[0].decision, "schedule_retry");
        assert_eq!(decisions[0].policy, "retry_policy");
        assert_eq!(decisions[0].trigger["message"], "smtp down");
        assert_eq!(decisions[0].context.as_ref().unwrap()["delay_secs"], 60.0);
    }

    #[tokio::test(start_paused = true)]
    async fn retried_task_is_leased_again_after_delay() {
        let queue = InMemoryQueue::new();
        let task =
            new_task("test").with_retry_policy(RetryPolicy::fixed(3, Duration::from_secs(60)));
        let id = queue.enqueue(task).await.unwrap();

        let lease = queue.lease().await.unwrap();
        lease
            .complete(Outcome::retry_after("smtp down", Duration::from_secs(60), 1))
            .await
            .unwrap();

        let started = Instant::now();
        let lease = queue.lease().await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(60));
        assert_eq!(lease.envelope().task_id(), id);
        assert_eq!(lease.attempt(), 2);
    }

    #[tokio::test]
    async fn permanent_failure_marks_dead() {
        let queue = InMemoryQueue::new();
        let id = queue.enqueue(new_task("test")).await.unwrap();

        let lease = queue.lease().await.unwrap();
        lease.complete(Outcome::permanent("boom")).await.unwrap();

        let record = queue.task(id).await.unwrap();
        assert_eq!(record.state, TaskState::Dead);
        assert_eq!(record.last_error.as_deref(), Some("boom"));
        assert_eq!(queue.decisions().await[0].decision, "mark_dead");
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_submission_waits_until_due() {
        let queue = InMemoryQueue::new();
        queue
            .enqueue_after(new_task("later"), Duration::from_secs(30))
            .await
            .unwrap();
        assert_eq!(queue.counts_by_state().await.unwrap().scheduled, 1);

        let started = Instant::now();
        let lease = queue.lease().await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(30));
        assert_eq!(lease.envelope().task_type().as_str(), "later");
    }

    #[tokio::test]
    async fn close_releases_waiting_workers() {
        let queue = InMemoryQueue::new();
        let waiter = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.lease().await.is_none() })
        };
        tokio::task::yield_now().await;
        queue.close().await;

        assert!(waiter.await.unwrap());
        assert!(matches!(
            queue.enqueue(new_task("late")).await,
            Err(QueueError::Closed)
        ));
    }

    #[tokio::test]
    async fn tasks_of_type_keeps_submission_order() {
        let queue = InMemoryQueue::new();
        let a = queue.enqueue(new_task("a")).await.unwrap();
        queue.enqueue(new_task("b")).await.unwrap();
        let c = queue.enqueue(new_task("a")).await.unwrap();

        let ids: Vec<TaskId> = queue
            .tasks_of_type("a")
            .await
            .iter()
            .map(|r| r.envelope.task_id())
            .collect();
        assert_eq!(ids, vec![a, c]);
    }

    async fn finish_one(queue: &InMemoryQueue, outcome: Outcome) -> TaskId {
        let id = queue.enqueue(new_task("test")).await.unwrap();
        let lease = queue.lease().await.unwrap();
        lease.complete(outcome).await.unwrap();
        id
    }

    #[tokio::test]
    async fn bounded_queue_drops_oldest_finished_tasks() {
        let queue = InMemoryQueue::bounded(2);
        let mut ids = Vec::new();
        for n in 0..5 {
            let outcome = if n % 2 == 0 {
                Outcome::success("done")
            } else {
                Outcome::permanent("boom")
            };
            ids.push(finish_one(&queue, outcome).await);
        }

        let counts = queue.counts_by_state().await.unwrap();
        assert_eq!(counts.succeeded + counts.dead, 2);
        assert_eq!(queue.attempts().await.len(), 2);
        assert_eq!(queue.decisions().await.len(), 2);
        assert_eq!(queue.tasks_of_type("test").await.len(), 2);
        assert!(queue.task(ids[0]).await.is_none());
        assert!(queue.task(ids[2]).await.is_none());
        assert_eq!(queue.task(ids[3]).await.unwrap().state, TaskState::Dead);
        assert_eq!(queue.task(ids[4]).await.unwrap().state, TaskState::Succeeded);
    }

    #[tokio::test]
    async fn bounded_queue_keeps_unfinished_tasks() {
        let queue = InMemoryQueue::bounded(1);
        let task =
            new_task("test").with_retry_policy(RetryPolicy::fixed(3, Duration::from_secs(60)));
        let waiting = queue.enqueue(task).await.unwrap();
        let lease = queue.lease().await.unwrap();
        lease
            .complete(Outcome::retry_after("smtp down", Duration::from_secs(60), 1))
            .await
            .unwrap();

        for _ in 0..3 {
            finish_one(&queue, Outcome::success("done")).await;
        }

        let record = queue.task(waiting).await.unwrap();
        assert_eq!(record.state, TaskState::RetryScheduled);
        // Its attempt and decision stay with it.
        assert!(queue.attempts().await.iter().any(|a| a.task_id == waiting));
        assert_eq!(queue.counts_by_state().await.unwrap().succeeded, 1);
    }

    #[tokio::test]
    async fn unbounded_queue_keeps_everything() {
        let queue = InMemoryQueue::new();
        for _ in 0..5 {
            finish_one(&queue, Outcome::success("done")).await;
        }
        assert_eq!(queue.counts_by_state().await.unwrap().succeeded, 5);
        assert_eq!(queue.attempts().await.len(), 5);
    }
}
