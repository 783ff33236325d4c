//! Mailer port: hands a fully composed message to a transport.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("message has no recipients")]
    NoRecipients,

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("transport failure: {0}")]
    Transport(String),
}

/// A composed message: subject, plain-text body, optional HTML alternative,
/// sender and recipients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub subject: String,
    pub text: String,
    pub html: Option<String>,
    pub from: String,
    pub to: Vec<String>,
}

impl Email {
    pub fn new(
        from: impl Into<String>,
        subject: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            text: text.into(),
            html: None,
            from: from.into(),
            to: Vec::new(),
        }
    }

    pub fn to(mut self, recipient: impl Into<String>) -> Self {
        self.to.push(recipient.into());
        self
    }

    pub fn html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }
}

/// Delivery always reports failures; there is no fail-silently mode.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &Email) -> Result<(), MailError>;
}
