//! Task trait: ties a payload type to its task_type name and retry policy.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::domain::{TaskId, TaskType};
use crate::queue::{NewTask, Queue, QueueError, RetryPolicy};

/// A typed unit of work.
///
/// # Naming
/// `{domain}.{subject}.{action}.v{major}`, e.g. `bookings.confirmation.send.v1`.
///
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct SendWelcome { user_id: i64 }
///
/// impl Task for SendWelcome {
///     const TYPE: &'static str = "users.welcome.send.v1";
/// }
/// ```
pub trait Task: Serialize + DeserializeOwned + Send + Sync + 'static {
    const TYPE: &'static str;

    /// Retry budget the dispatcher applies to this task. Defaults to none.
    fn retry_policy() -> RetryPolicy {
        RetryPolicy::none()
    }

    fn task_type() -> TaskType {
        TaskType::new(Self::TYPE)
    }
}

/// Serialize `task` and submit it for immediate execution.
pub async fn enqueue_task<T: Task>(queue: &dyn Queue, task: &T) -> Result<TaskId, QueueError> {
    queue.enqueue(new_task(task)?).await
}

/// Build the queue submission for a typed task.
pub fn new_task<T: Task>(task: &T) -> Result<NewTask, QueueError> {
    let payload = serde_json::to_value(task).map_err(|source| QueueError::Encode {
        task_type: T::TYPE.to_string(),
        source,
    })?;
    Ok(NewTask::new(T::task_type(), payload).with_retry_policy(T::retry_policy()))
}
