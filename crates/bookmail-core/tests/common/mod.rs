#![allow(dead_code)]

use std::sync::Arc;

use bookmail_core::app::App;
use bookmail_core::config::NotificationConfig;
use bookmail_core::domain::{
    Booking, BookingId, BookingStatus, DefaultDecider, Listing, ListingId, Money, User, UserId,
};
use bookmail_core::impls::{InMemoryBookingStore, LogMailer, TeraRenderer};
use bookmail_core::ports::FixedClock;
use bookmail_core::queue::InMemoryQueue;
use bookmail_core::tasks::{NotificationDeps, notification_app};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};

pub struct World {
    pub store: Arc<InMemoryBookingStore>,
    pub mailer: Arc<LogMailer>,
    pub queue: Arc<InMemoryQueue>,
    pub clock: FixedClock,
    pub app: App,
}

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap()
}

pub fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, month, day).unwrap()
}

pub fn template_root() -> String {
    format!("{}/../../templates", env!("CARGO_MANIFEST_DIR"))
}

/// In-memory store, recording mailer, the bundled templates and a clock
/// pinned to 2025-03-10 12:00 UTC, shared by the tasks and the queue.
pub fn world() -> World {
    world_with_retention(None)
}

/// Like [`world`], but the queue only keeps `retain_finished` finished tasks.
pub fn bounded_world(retain_finished: usize) -> World {
    world_with_retention(Some(retain_finished))
}

fn world_with_retention(retain_finished: Option<usize>) -> World {
    let store = Arc::new(InMemoryBookingStore::new());
    let mailer = Arc::new(LogMailer::new());
    let clock = FixedClock::new(now());
    let queue = Arc::new(InMemoryQueue::with_parts(
        Arc::new(clock.clone()),
        Arc::new(DefaultDecider),
        retain_finished,
    ));
    let renderer = TeraRenderer::from_dir(&template_root()).unwrap();

    let app = notification_app(NotificationDeps {
        store: store.clone(),
        mailer: mailer.clone(),
        renderer: Arc::new(renderer),
        clock: Arc::new(clock.clone()),
        queue: queue.clone(),
        config: NotificationConfig::default(),
    })
    .unwrap();

    World {
        store,
        mailer,
        queue,
        clock,
        app,
    }
}

pub fn booking(id: i64, status: BookingStatus) -> Booking {
    Booking {
        id: BookingId(id),
        booking_number: format!("BK-{id:04}"),
        status,
        check_in_date: date(3, 20),
        check_out_date: date(3, 23),
        number_of_guests: 3,
        total_price: Money::new(42_050, "EUR"),
        confirmation_sent: false,
        created_at: now() - chrono::TimeDelta::days(3),
        listing_id: ListingId(10),
        user_id: UserId(id),
    }
}

impl World {
    /// Insert a booking with its listing and user.
    pub async fn seed(&self, booking: Booking) {
        self.store
            .insert_listing(Listing {
                id: booking.listing_id,
                title: "Cliffside Cabin".into(),
                location: "Madeira".into(),
            })
            .await;
        self.store
            .insert_user(User {
                id: booking.user_id,
                name: format!("Guest {}", booking.user_id),
                email: format!("guest{}@example.com", booking.user_id),
            })
            .await;
        self.store.insert_booking(booking).await;
    }

    pub async fn payload_ids(&self, task_type: &str) -> Vec<i64> {
        self.queue
            .tasks_of_type(task_type)
            .await
            .iter()
            .filter_map(|r| r.envelope.payload()["booking_id"].as_i64())
            .collect()
    }
}
