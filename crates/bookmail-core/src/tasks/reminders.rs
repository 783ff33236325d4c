//! Reminder senders fed by the sweeps.
//!
//! Both are registered so sweep output never dies as "handler not found",
//! but neither sends anything yet: they log and succeed.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{BookingId, Outcome};
use crate::error::NotifyError;
use crate::typed::{Handler, Task, TaskContext};

/// Reminder for a booking left pending for more than a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendBookingReminderEmail {
    pub booking_id: BookingId,
}

impl Task for SendBookingReminderEmail {
    const TYPE: &'static str = "bookings.reminder_email.send.v1";
}

/// Reminder for a confirmed booking checking in within two days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendUpcomingBookingReminder {
    pub booking_id: BookingId,
}

impl Task for SendUpcomingBookingReminder {
    const TYPE: &'static str = "bookings.upcoming_reminder.send.v1";
}

fn not_implemented(kind: &'static str, booking_id: BookingId) -> Outcome {
    debug!(%booking_id, kind, "reminder skipped, sender not implemented");
    Outcome::success(format!("reminder for booking {booking_id} not implemented"))
}

pub struct SendBookingReminderEmailHandler;

#[async_trait]
impl Handler<SendBookingReminderEmail> for SendBookingReminderEmailHandler {
    async fn handle(
        &self,
        task: SendBookingReminderEmail,
        _ctx: TaskContext,
    ) -> Result<Outcome, NotifyError> {
        Ok(not_implemented("pending", task.booking_id))
    }
}

pub struct SendUpcomingBookingReminderHandler;

#[async_trait]
impl Handler<SendUpcomingBookingReminder> for SendUpcomingBookingReminderHandler {
    async fn handle(
        &self,
        task: SendUpcomingBookingReminder,
        _ctx: TaskContext,
    ) -> Result<Outcome, NotifyError> {
        Ok(not_implemented("upcoming", task.booking_id))
    }
}
