//! Payment confirmation: a plain-text note that a transaction went through.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::config::NotificationConfig;
use crate::domain::Outcome;
use crate::error::NotifyError;
use crate::ports::{Email, Mailer};
use crate::typed::{Handler, Task, TaskContext};

/// Caller-supplied and unvalidated; a bad address fails at send time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendPaymentConfirmation {
    pub user_email: String,
    pub tx_ref: String,
}

impl Task for SendPaymentConfirmation {
    const TYPE: &'static str = "payments.confirmation.send.v1";
}

pub fn payment_email(from: &str, task: &SendPaymentConfirmation) -> Email {
    Email::new(
        from,
        format!("Booking Confirmed - Ref: {}", task.tx_ref),
        format!(
            "Your payment for transaction {} was successful. Thank you!",
            task.tx_ref
        ),
    )
    .to(task.user_email.clone())
}

pub struct SendPaymentConfirmationHandler {
    mailer: Arc<dyn Mailer>,
    config: NotificationConfig,
}

impl SendPaymentConfirmationHandler {
    pub fn new(mailer: Arc<dyn Mailer>, config: NotificationConfig) -> Self {
        Self { mailer, config }
    }
}

#[async_trait]
impl Handler<SendPaymentConfirmation> for SendPaymentConfirmationHandler {
    async fn handle(
        &self,
        task: SendPaymentConfirmation,
        _ctx: TaskContext,
    ) -> Result<Outcome, NotifyError> {
        let email = payment_email(&self.config.default_from_address, &task);
        match self.mailer.send(&email).await {
            Ok(()) => {
                info!(tx_ref = %task.tx_ref, to = %task.user_email, "payment confirmation sent");
                Ok(Outcome::success(format!(
                    "payment confirmation sent for {}",
                    task.tx_ref
                )))
            }
            // Not retried: the failure only shows up in logs and queue history.
            Err(err) => {
                error!(tx_ref = %task.tx_ref, error = %err, "payment confirmation failed");
                Ok(Outcome::permanent(NotifyError::from(err).to_string()))
            }
        }
    }
}
