//! The booking notification tasks and their wiring.

pub mod confirmation;
pub mod payment;
pub mod reminders;
pub mod sweeps;

use std::sync::Arc;

pub use self::confirmation::{SendBookingConfirmation, SendBookingConfirmationHandler};
pub use self::payment::{SendPaymentConfirmation, SendPaymentConfirmationHandler};
pub use self::reminders::{
    SendBookingReminderEmail, SendBookingReminderEmailHandler, SendUpcomingBookingReminder,
    SendUpcomingBookingReminderHandler,
};
pub use self::sweeps::{
    CheckPendingBookings, CheckPendingBookingsHandler, SendBookingReminders,
    SendBookingRemindersHandler, SweepDeps,
};

use crate::app::{App, AppBuilder, BuildError};
use crate::config::NotificationConfig;
use crate::ports::{BookingStore, Clock, Mailer, TemplateRenderer};
use crate::queue::Queue;
use crate::typed::Task;

/// Every collaborator a notification task may touch.
#[derive(Clone)]
pub struct NotificationDeps {
    pub store: Arc<dyn BookingStore>,
    pub mailer: Arc<dyn Mailer>,
    pub renderer: Arc<dyn TemplateRenderer>,
    pub clock: Arc<dyn Clock>,
    pub queue: Arc<dyn Queue>,
    pub config: NotificationConfig,
}

pub const ALL_TASK_TYPES: [&str; 6] = [
    SendPaymentConfirmation::TYPE,
    SendBookingConfirmation::TYPE,
    CheckPendingBookings::TYPE,
    SendBookingReminders::TYPE,
    SendBookingReminderEmail::TYPE,
    SendUpcomingBookingReminder::TYPE,
];

/// Register all six notification handlers.
pub fn notification_app(deps: NotificationDeps) -> Result<App, BuildError> {
    let sweeps = SweepDeps {
        store: Arc::clone(&deps.store),
        clock: Arc::clone(&deps.clock),
        queue: Arc::clone(&deps.queue),
    };

    let app = AppBuilder::new()
        .register::<SendPaymentConfirmation, _>(SendPaymentConfirmationHandler::new(
            Arc::clone(&deps.mailer),
            deps.config.clone(),
        ))?
        .register::<SendBookingConfirmation, _>(SendBookingConfirmationHandler::new(
            deps.store,
            deps.mailer,
            deps.renderer,
            deps.config,
        ))?
        .register::<CheckPendingBookings, _>(CheckPendingBookingsHandler::new(sweeps.clone()))?
        .register::<SendBookingReminders, _>(SendBookingRemindersHandler::new(sweeps))?
        .register::<SendBookingReminderEmail, _>(SendBookingReminderEmailHandler)?
        .register::<SendUpcomingBookingReminder, _>(SendUpcomingBookingReminderHandler)?
        .expect_tasks(&ALL_TASK_TYPES)
        .build()?;
    Ok(app)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{NaiveDate, TimeZone, Utc};

    use crate::domain::{Booking, BookingId, BookingStatus, Listing, ListingId, Money, User, UserId};
    use crate::impls::InMemoryBookingStore;
    use crate::ports::{RenderError, TemplateRenderer};

    /// Returns the same markup for every template, or always fails.
    pub struct StaticRenderer(Option<String>);

    impl StaticRenderer {
        pub fn ok(html: &str) -> Self {
            Self(Some(html.to_string()))
        }

        pub fn failing() -> Self {
            Self(None)
        }
    }

    impl TemplateRenderer for StaticRenderer {
        fn render(
            &self,
            template: &str,
            _context: &serde_json::Value,
        ) -> Result<String, RenderError> {
            self.0
                .clone()
                .ok_or_else(|| RenderError::NotFound(template.to_string()))
        }
    }

    pub fn sample_listing() -> Listing {
        Listing {
            id: ListingId(1),
            title: "Harbour Loft".into(),
            location: "Lisbon".into(),
        }
    }

    pub fn sample_user(n: i64) -> User {
        User {
            id: UserId(n),
            name: format!("Guest {n}"),
            email: format!("guest{n}@example.com"),
        }
    }

    /// Confirmed, unconfirmed-email booking for user `n`, checking in 2025-03-10.
    pub fn sample_booking(n: i64) -> Booking {
        Booking {
            id: BookingId(n),
            booking_number: format!("BK-{n:04}"),
            status: BookingStatus::Confirmed,
            check_in_date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            check_out_date: NaiveDate::from_ymd_opt(2025, 3, 12).unwrap(),
            number_of_guests: 2,
            total_price: Money::new(25_000, "USD"),
            confirmation_sent: false,
            created_at: Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap(),
            listing_id: ListingId(1),
            user_id: UserId(n),
        }
    }

    /// Insert a booking together with its listing and user.
    pub async fn seed_booking(store: &InMemoryBookingStore, booking: Booking) {
        store.insert_listing(sample_listing()).await;
        store.insert_user(sample_user(booking.user_id.get())).await;
        store.insert_booking(booking).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::{InMemoryBookingStore, LogMailer};
    use crate::ports::SystemClock;
    use crate::queue::InMemoryQueue;
    use fixtures::StaticRenderer;

    #[test]
    fn app_registers_every_notification_task() {
        let deps = NotificationDeps {
            store: Arc::new(InMemoryBookingStore::new()),
            mailer: Arc::new(LogMailer::new()),
            renderer: Arc::new(StaticRenderer::ok("<p>hi</p>")),
            clock: Arc::new(SystemClock),
            queue: Arc::new(InMemoryQueue::new()),
            config: NotificationConfig::default(),
        };

        let app = notification_app(deps).unwrap();

        let mut expected: Vec<String> = ALL_TASK_TYPES.iter().map(|t| t.to_string()).collect();
        expected.sort();
        assert_eq!(app.registry.registered_types(), expected);
    }
}
