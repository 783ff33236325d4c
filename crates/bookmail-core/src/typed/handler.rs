//! Handler trait: executes a typed task and reports an [`Outcome`].
//!
//! `Handler<T>` is the typed surface; `DynHandler` is its object-safe form so
//! handlers for different task types can share one registry.

use std::marker::PhantomData;

use async_trait::async_trait;

use super::task::Task;
use crate::domain::{Outcome, TaskId};
use crate::error::NotifyError;

/// Execution context handed to every handler call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskContext {
    pub task_id: TaskId,

    /// 1-indexed execution number.
    pub attempt: u32,
}

/// ```ignore
/// struct SendWelcomeHandler;
///
/// #[async_trait]
/// impl Handler<SendWelcome> for SendWelcomeHandler {
///     async fn handle(
///         &self,
///         task: SendWelcome,
///         ctx: TaskContext,
///     ) -> Result<Outcome, NotifyError> {
///         Ok(Outcome::success(format!("welcomed {}", task.user_id)))
///     }
/// }
/// ```
///
/// Returning `Err` lets the worker classify the failure by
/// [`NotifyError::kind`]; returning an `Outcome` states it explicitly.
#[async_trait]
pub trait Handler<T: Task>: Send + Sync {
    async fn handle(&self, task: T, ctx: TaskContext) -> Result<Outcome, NotifyError>;
}

#[async_trait]
pub trait DynHandler: Send + Sync {
    async fn handle_dyn(
        &self,
        payload: serde_json::Value,
        ctx: TaskContext,
    ) -> Result<Outcome, NotifyError>;

    fn task_type(&self) -> &'static str;
}

pub struct TypedHandler<T: Task, H: Handler<T>> {
    handler: H,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Task, H: Handler<T>> TypedHandler<T, H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<T: Task, H: Handler<T>> DynHandler for TypedHandler<T, H> {
    async fn handle_dyn(
        &self,
        payload: serde_json::Value,
        ctx: TaskContext,
    ) -> Result<Outcome, NotifyError> {
        let task: T = serde_json::from_value(payload).map_err(|source| NotifyError::Codec {
            task_type: T::TYPE.to_string(),
            source,
        })?;
        self.handler.handle(task, ctx).await
    }

    fn task_type(&self) -> &'static str {
        T::TYPE
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::TestTaskHandler;
    use super::*;
    use crate::domain::OutcomeKind;
    use crate::typed::task::fixtures::TestTask;
    use serde_json::json;
    use ulid::Ulid;

    fn ctx() -> TaskContext {
        TaskContext {
            task_id: TaskId::from_ulid(Ulid::new()),
            attempt: 1,
        }
    }

    #[tokio::test]
    async fn typed_handler_decodes_payload() {
        let typed_handler = TypedHandler::<TestTask, _>::new(TestTaskHandler);

        let outcome = typed_handler.handle_dyn(json!({ "value": 100 }), ctx()).await.unwrap();
        assert_eq!(outcome.kind(), OutcomeKind::Success);
        assert_eq!(outcome.message(), "value=100");
        assert_eq!(typed_handler.task_type(), TestTask::TYPE);
    }

    #[tokio::test]
    async fn bad_payload_is_a_codec_error() {
        let typed_handler = TypedHandler::<TestTask, _>::new(TestTaskHandler);

        let err = typed_handler
            .handle_dyn(json!({ "value": "not a number" }), ctx())
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::Codec { .. }));
        assert!(!err.is_retryable());
    }
}
