//! Periodic scheduler: submits input-less tasks (sweeps) on a fixed period.
//!
//! Runs are not coordinated with each other. If a sweep takes longer than
//! its period, or two schedulers share a queue, runs overlap.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::queue::{NewTask, Queue, QueueError};
use crate::typed::{Task, new_task};

#[derive(Debug, Clone)]
struct PeriodicEntry {
    task: NewTask,
    every: Duration,
}

pub struct Scheduler {
    queue: Arc<dyn Queue>,
    entries: Vec<PeriodicEntry>,
}

impl Scheduler {
    pub fn new(queue: Arc<dyn Queue>) -> Self {
        Self {
            queue,
            entries: Vec::new(),
        }
    }

    /// Submit `task` every `every`, first run one period after start.
    pub fn every<T: Task>(mut self, task: &T, every: Duration) -> Result<Self, QueueError> {
        self.entries.push(PeriodicEntry {
            task: new_task(task)?,
            every,
        });
        Ok(self)
    }

    pub fn spawn(self) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let joins = self
            .entries
            .into_iter()
            .map(|entry| {
                let queue = Arc::clone(&self.queue);
                tokio::spawn(tick_loop(entry, queue, shutdown_rx.clone()))
            })
            .collect();
        SchedulerHandle { shutdown_tx, joins }
    }
}

pub struct SchedulerHandle {
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    pub async fn shutdown_and_join(self) {
        let _ = self.shutdown_tx.send(true);
        for join in self.joins {
            if let Err(e) = join.await {
                error!(error = %e, "scheduler task panicked");
            }
        }
    }
}

async fn tick_loop(
    entry: PeriodicEntry,
    queue: Arc<dyn Queue>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let task_type = entry.task.task_type.clone();
    if entry.every.is_zero() {
        error!(%task_type, "periodic entry with zero period ignored");
        return;
    }

    let mut ticker = tokio::time::interval_at(Instant::now() + entry.every, entry.every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(%task_type, every = ?entry.every, "periodic task scheduled");

    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                match queue.enqueue(entry.task.clone()).await {
                    Ok(task_id) => debug!(%task_type, %task_id, "periodic task submitted"),
                    Err(QueueError::Closed) => break,
                    Err(e) => error!(%task_type, error = %e, "failed to submit periodic task"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::InMemoryQueue;
    use crate::typed::task::fixtures::TestTask;

    #[tokio::test(start_paused = true)]
    async fn submits_once_per_period() {
        let queue = Arc::new(InMemoryQueue::new());
        let handle = Scheduler::new(queue.clone())
            .every(&TestTask { value: 1 }, Duration::from_secs(3600))
            .unwrap()
            .spawn();

        // Nothing at start.
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(queue.tasks_of_type(TestTask::TYPE).await.is_empty());

        tokio::time::sleep(Duration::from_secs(3 * 3600)).await;
        handle.shutdown_and_join().await;

        assert_eq!(queue.tasks_of_type(TestTask::TYPE).await.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_when_queue_closes() {
        let queue = Arc::new(InMemoryQueue::new());
        let handle = Scheduler::new(queue.clone())
            .every(&TestTask { value: 1 }, Duration::from_secs(10))
            .unwrap()
            .spawn();

        queue.close().await;
        tokio::time::sleep(Duration::from_secs(11)).await;
        tokio::time::timeout(Duration::from_secs(1), handle.shutdown_and_join())
            .await
            .unwrap();
    }
}
