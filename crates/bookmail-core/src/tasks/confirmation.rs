//! Booking confirmation: renders the confirmation template, sends it and
//! flips `confirmation_sent`.
//!
//! Every failure after the task starts is reported as retryable with a
//! fixed delay. The dispatcher allows three retries, so a booking gets at
//! most four delivery attempts.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{error, info};

use crate::config::NotificationConfig;
use crate::domain::{BookingDetails, BookingId, Outcome};
use crate::error::NotifyError;
use crate::ports::{BookingStore, Email, Mailer, TemplateRenderer, strip_tags};
use crate::queue::RetryPolicy;
use crate::typed::{Handler, Task, TaskContext};

pub const CONFIRMATION_TEMPLATE: &str = "listings/emails/booking_confirmation.html";
pub const RETRY_DELAY: Duration = Duration::from_secs(60);
pub const MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendBookingConfirmation {
    pub booking_id: BookingId,
}

impl Task for SendBookingConfirmation {
    const TYPE: &'static str = "bookings.confirmation.send.v1";

    fn retry_policy() -> RetryPolicy {
        RetryPolicy::fixed(MAX_RETRIES, RETRY_DELAY)
    }
}

/// Template context: the three records plus pre-formatted display fields.
pub fn render_context(details: &BookingDetails) -> Result<Value, serde_json::Error> {
    let booking = &details.booking;
    let mut ctx = Map::new();
    ctx.insert("booking".into(), serde_json::to_value(booking)?);
    ctx.insert("listing".into(), serde_json::to_value(&details.listing)?);
    ctx.insert("user".into(), serde_json::to_value(&details.user)?);
    ctx.insert("check_in".into(), booking.check_in_date.to_string().into());
    ctx.insert("check_out".into(), booking.check_out_date.to_string().into());
    ctx.insert("total_price".into(), booking.total_price.to_string().into());
    ctx.insert("guests".into(), booking.number_of_guests.into());
    ctx.insert("booking_number".into(), booking.booking_number.clone().into());
    Ok(Value::Object(ctx))
}

pub struct SendBookingConfirmationHandler {
    store: Arc<dyn BookingStore>,
    mailer: Arc<dyn Mailer>,
    renderer: Arc<dyn TemplateRenderer>,
    config: NotificationConfig,
}

impl SendBookingConfirmationHandler {
    pub fn new(
        store: Arc<dyn BookingStore>,
        mailer: Arc<dyn Mailer>,
        renderer: Arc<dyn TemplateRenderer>,
        config: NotificationConfig,
    ) -> Self {
        Self {
            store,
            mailer,
            renderer,
            config,
        }
    }

    async fn send(&self, booking_id: BookingId) -> Result<Outcome, NotifyError> {
        let Some(details) = self.store.find_details(booking_id).await? else {
            error!(%booking_id, "booking not found");
            return Ok(Outcome::success(format!(
                "Booking with id {booking_id} not found"
            )));
        };

        let context = render_context(&details).map_err(|source| NotifyError::Codec {
            task_type: SendBookingConfirmation::TYPE.to_string(),
            source,
        })?;
        let html = self.renderer.render(CONFIRMATION_TEMPLATE, &context)?;

        let booking_number = &details.booking.booking_number;
        let email = Email::new(
            self.config.default_from_address.clone(),
            format!("Booking Confirmation #{booking_number}"),
            strip_tags(&html),
        )
        .html(html)
        .to(details.user.email.clone());
        self.mailer.send(&email).await?;

        if !details.booking.confirmation_sent {
            self.store.mark_confirmation_sent(booking_id).await?;
        }

        info!(%booking_id, %booking_number, to = %details.user.email, "booking confirmation sent");
        Ok(Outcome::success(format!(
            "Email sent successfully for booking #{booking_number}"
        )))
    }
}

#[async_trait]
impl Handler<SendBookingConfirmation> for SendBookingConfirmationHandler {
    async fn handle(
        &self,
        task: SendBookingConfirmation,
        ctx: TaskContext,
    ) -> Result<Outcome, NotifyError> {
        match self.send(task.booking_id).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                error!(
                    booking_id = %task.booking_id,
                    attempt = ctx.attempt,
                    error = %err,
                    "booking confirmation failed, asking for retry"
                );
                Ok(Outcome::retry_after(err.to_string(), RETRY_DELAY, ctx.attempt))
            }
        }
    }
}
