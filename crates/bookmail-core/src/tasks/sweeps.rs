//! Periodic sweeps that fan out one reminder task per matching booking.
//!
//! Runs are not idempotent. A booking that still matches on the next run
//! gets another reminder task.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use super::reminders::{SendBookingReminderEmail, SendUpcomingBookingReminder};
use crate::domain::{Booking, Outcome};
use crate::error::NotifyError;
use crate::ports::{BookingStore, Clock};
use crate::queue::Queue;
use crate::typed::{Handler, Task, TaskContext, enqueue_task};

/// Pending bookings older than this get a reminder.
pub fn pending_age() -> TimeDelta {
    TimeDelta::hours(24)
}

/// Confirmed bookings checking in within this horizon get a reminder.
pub fn upcoming_horizon() -> TimeDelta {
    TimeDelta::hours(48)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckPendingBookings;

impl Task for CheckPendingBookings {
    const TYPE: &'static str = "bookings.pending.check.v1";
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendBookingReminders;

impl Task for SendBookingReminders {
    const TYPE: &'static str = "bookings.upcoming_reminders.send.v1";
}

/// What both sweeps need: the store to scan, a clock for "now", and the
/// queue to fan out into.
#[derive(Clone)]
pub struct SweepDeps {
    pub store: Arc<dyn BookingStore>,
    pub clock: Arc<dyn Clock>,
    pub queue: Arc<dyn Queue>,
}

// Sweep failures are not retried here; the next scheduled run starts over.
fn finish(sweep: &'static str, result: Result<String, NotifyError>) -> Outcome {
    match result {
        Ok(summary) => {
            info!(sweep, %summary, "sweep finished");
            Outcome::success(summary)
        }
        Err(err) => {
            error!(sweep, error = %err, "sweep failed");
            Outcome::permanent(err.to_string())
        }
    }
}

pub struct CheckPendingBookingsHandler {
    deps: SweepDeps,
}

impl CheckPendingBookingsHandler {
    pub fn new(deps: SweepDeps) -> Self {
        Self { deps }
    }

    async fn sweep(&self) -> Result<String, NotifyError> {
        let threshold = self.deps.clock.now() - pending_age();
        let bookings = self.deps.store.pending_created_before(threshold).await?;
        fan_out(self.deps.queue.as_ref(), &bookings, |b| SendBookingReminderEmail {
            booking_id: b.id,
        })
        .await?;
        Ok(format!("Checked {} pending bookings", bookings.len()))
    }
}

#[async_trait]
impl Handler<CheckPendingBookings> for CheckPendingBookingsHandler {
    async fn handle(
        &self,
        _task: CheckPendingBookings,
        _ctx: TaskContext,
    ) -> Result<Outcome, NotifyError> {
        Ok(finish("pending", self.sweep().await))
    }
}

pub struct SendBookingRemindersHandler {
    deps: SweepDeps,
}

impl SendBookingRemindersHandler {
    pub fn new(deps: SweepDeps) -> Self {
        Self { deps }
    }

    async fn sweep(&self) -> Result<String, NotifyError> {
        let now = self.deps.clock.now();
        let today = now.date_naive();
        let until = (now + upcoming_horizon()).date_naive();
        let bookings = self.deps.store.confirmed_checking_in(today, until).await?;
        fan_out(self.deps.queue.as_ref(), &bookings, |b| SendUpcomingBookingReminder {
            booking_id: b.id,
        })
        .await?;
        Ok(format!("Sent reminders for {} upcoming bookings", bookings.len()))
    }
}

#[async_trait]
impl Handler<SendBookingReminders> for SendBookingRemindersHandler {
    async fn handle(
        &self,
        _task: SendBookingReminders,
        _ctx: TaskContext,
    ) -> Result<Outcome, NotifyError> {
        Ok(finish("upcoming", self.sweep().await))
    }
}

/// Enqueue one task per booking without waiting for any of them to run.
async fn fan_out<T: Task>(
    queue: &dyn Queue,
    bookings: &[Booking],
    to_task: impl Fn(&Booking) -> T,
) -> Result<(), NotifyError> {
    for booking in bookings {
        let task_id = enqueue_task(queue, &to_task(booking)).await?;
        debug!(booking_id = %booking.id, %task_id, task_type = T::TYPE, "reminder enqueued");
    }
    Ok(())
}
