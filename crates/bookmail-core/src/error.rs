use thiserror::Error;

use crate::domain::TaskType;
use crate::ports::{MailError, RenderError, StoreError};
use crate::queue::QueueError;

/// Operational classification of an error.
///
/// - Transient: worth retrying (mail relay hiccup, timeouts).
/// - Permanent: retrying cannot help (bad payload, broken template).
/// - Infrastructure: a backing service is unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transient,
    Permanent,
    Infrastructure,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("mail error: {0}")]
    Mail(#[from] MailError),

    #[error("render error: {0}")]
    Render(#[from] RenderError),

    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("payload decode for task_type={task_type}: {source}")]
    Codec {
        task_type: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("handler not found for task_type={0}")]
    HandlerNotFound(TaskType),
}

impl NotifyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            NotifyError::Mail(_) => ErrorKind::Transient,
            NotifyError::Store(_) | NotifyError::Queue(_) => ErrorKind::Infrastructure,
            NotifyError::Render(_)
            | NotifyError::Codec { .. }
            | NotifyError::HandlerNotFound(_) => ErrorKind::Permanent,
        }
    }

    pub fn is_retryable(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Permanent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mail_errors_are_transient() {
        let err = NotifyError::from(MailError::Transport("connection refused".into()));
        assert_eq!(err.kind(), ErrorKind::Transient);
        assert!(err.is_retryable());
    }

    #[test]
    fn missing_handler_is_permanent() {
        let err = NotifyError::HandlerNotFound(TaskType::new("nope"));
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("task_type=nope"));
    }
}
