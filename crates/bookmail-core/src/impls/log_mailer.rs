//! Mailer that logs messages and, unless built with `log_only`, keeps them
//! in memory.
//!
//! Used when no SMTP relay is configured, and by tests that need to look at
//! what was sent or make the next few deliveries fail.

use std::sync::Mutex;

use async_trait::async_trait;
use tracing::info;

use crate::ports::{Email, MailError, Mailer};

pub struct LogMailer {
    inner: Mutex<Inner>,
    keep_sent: bool,
}

#[derive(Default)]
struct Inner {
    sent: Vec<Email>,
    failures_left: u32,
}

impl LogMailer {
    /// Logs and records every message.
    pub fn new() -> Self {
        Self {
            inner: Mutex::default(),
            keep_sent: true,
        }
    }

    /// Logs messages without keeping them; `sent()` stays empty.
    pub fn log_only() -> Self {
        Self {
            keep_sent: false,
            ..Self::new()
        }
    }

    /// Make the next `n` sends fail with a transport error.
    pub fn fail_next(&self, n: u32) {
        self.lock().failures_left = n;
    }

    pub fn sent(&self) -> Vec<Email> {
        self.lock().sent.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock only means a test panicked mid-send; the data is fine.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        if email.to.is_empty() {
            return Err(MailError::NoRecipients);
        }

        let mut inner = self.lock();
        if inner.failures_left > 0 {
            inner.failures_left -= 1;
            return Err(MailError::Transport("scripted failure".into()));
        }

        info!(
            from = %email.from,
            to = ?email.to,
            subject = %email.subject,
            html = email.html.is_some(),
            "email delivered to log"
        );
        if self.keep_sent {
            inner.sent.push(email.clone());
        }
        Ok(())
    }
}

impl Default for LogMailer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email() -> Email {
        Email::new("noreply@example.com", "Hello", "body").to("guest@example.com")
    }

    #[tokio::test]
    async fn records_sent_messages() {
        let mailer = LogMailer::new();
        mailer.send(&email()).await.unwrap();
        assert_eq!(mailer.sent(), vec![email()]);
    }

    #[tokio::test]
    async fn scripted_failures_run_out() {
        let mailer = LogMailer::new();
        mailer.fail_next(2);

        assert!(matches!(mailer.send(&email()).await, Err(MailError::Transport(_))));
        assert!(matches!(mailer.send(&email()).await, Err(MailError::Transport(_))));
        mailer.send(&email()).await.unwrap();
        assert_eq!(mailer.sent().len(), 1);
    }

    #[tokio::test]
    async fn rejects_message_without_recipients() {
        let mailer = LogMailer::new();
        let err = mailer
            .send(&Email::new("noreply@example.com", "Hello", "body"))
            .await
            .unwrap_err();
        assert!(matches!(err, MailError::NoRecipients));
    }

    #[tokio::test]
    async fn log_only_mailer_keeps_nothing() {
        let mailer = LogMailer::log_only();
        for _ in 0..3 {
            mailer.send(&email()).await.unwrap();
        }
        assert!(mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn log_only_mailer_still_fails_on_request() {
        let mailer = LogMailer::log_only();
        mailer.fail_next(1);
        assert!(matches!(mailer.send(&email()).await, Err(MailError::Transport(_))));
        mailer.send(&email()).await.unwrap();
    }
}
