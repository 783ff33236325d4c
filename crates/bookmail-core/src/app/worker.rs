use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info_span};

use crate::domain::{Decision, Outcome, TaskEnvelope};
use crate::error::NotifyError;
use crate::queue::{Queue, QueueError, TaskLease};
use crate::typed::{TaskContext, TypedRegistry};

/// Worker group handle.
/// - `request_shutdown` stops every worker from taking new leases
/// - `shutdown_and_join` also waits for in-flight tasks
pub struct WorkerGroup {
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
}

impl WorkerGroup {
    /// Spawn `n` workers.
    pub fn spawn(n: usize, queue: Arc<dyn Queue>, registry: Arc<TypedRegistry>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let joins = (0..n)
            .map(|worker_id| {
                let queue = Arc::clone(&queue);
                let registry = Arc::clone(&registry);
                let rx = shutdown_rx.clone();
                tokio::spawn(worker_loop(worker_id, queue, registry, rx))
            })
            .collect();

        Self { shutdown_tx, joins }
    }

    pub fn len(&self) -> usize {
        self.joins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joins.is_empty()
    }

    /// In-flight handler calls are not cancelled; workers just stop leasing.
    pub fn request_shutdown(&self) {
        // receivers may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        for join in self.joins {
            if let Err(e) = join.await {
                error!(error = %e, "worker task panicked");
            }
        }
    }
}

async fn worker_loop(
    worker_id: usize,
    queue: Arc<dyn Queue>,
    registry: Arc<TypedRegistry>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    debug!(worker_id, "worker started");
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        let lease = tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                continue;
            }
            lease = queue.lease() => lease,
        };

        let Some(lease) = lease else {
            // queue closed
            break;
        };

        if let Err(e) = process(&registry, lease).await {
            error!(worker_id, error = %e, "failed to record task outcome");
        }
    }
    debug!(worker_id, "worker stopped");
}

/// Run one leased task and report its outcome back to the queue.
pub async fn process(
    registry: &TypedRegistry,
    lease: Box<dyn TaskLease>,
) -> Result<Decision, QueueError> {
    let envelope = lease.envelope().clone();
    let attempt = lease.attempt();
    let span = info_span!(
        "task",
        task_id = %envelope.task_id(),
        task_type = %envelope.task_type(),
        family = envelope.task_type().family(),
        attempt,
    );

    async move {
        let outcome = execute(registry, &envelope, attempt).await;
        debug!(outcome = ?outcome.kind(), message = outcome.message(), "attempt finished");
        lease.complete(outcome).await
    }
    .instrument(span)
    .await
}

/// Dispatch an envelope to its handler and turn the result into an Outcome.
///
/// Handler errors are classified by kind: transient and infrastructure
/// errors become retryable (the policy picks the delay), the rest are
/// permanent.
pub async fn execute(registry: &TypedRegistry, envelope: &TaskEnvelope, attempt: u32) -> Outcome {
    let task_type = envelope.task_type();
    let Some(handler) = registry.get(task_type.as_str()) else {
        return Outcome::permanent(NotifyError::HandlerNotFound(task_type.clone()).to_string());
    };

    let ctx = TaskContext {
        task_id: envelope.task_id(),
        attempt,
    };
    match handler.handle_dyn(envelope.payload().clone(), ctx).await {
        Ok(outcome) => outcome,
        Err(err) if err.is_retryable() => {
            Outcome::retry_after(err.to_string(), Duration::ZERO, attempt)
        }
        Err(err) => Outcome::permanent(err.to_string()),
    }
}

/// Process tasks on the current task until nothing is left in flight.
///
/// Tasks waiting on a retry delay are waited for, so under a paused tokio
/// clock this drives a whole retry sequence to its end.
pub async fn run_until_idle(
    queue: &dyn Queue,
    registry: &TypedRegistry,
) -> Result<(), QueueError> {
    loop {
        if queue.counts_by_state().await?.in_flight() == 0 {
            return Ok(());
        }
        let Some(lease) = queue.lease().await else {
            return Err(QueueError::Closed);
        };
        process(registry, lease).await?;
    }
}
