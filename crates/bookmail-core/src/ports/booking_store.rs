//! BookingStore port: the record store the notification tasks read from.
//!
//! The booking application owns the data. The tasks need one eager-loaded
//! fetch, one single-field write and two filtered scans.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::domain::{Booking, BookingDetails, BookingId};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("booking {0} does not exist")]
    NotFound(BookingId),

    #[error("related record missing for booking {booking}: {what}")]
    BrokenRelation { booking: BookingId, what: &'static str },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Booking plus its listing and user, or `None` if no such booking.
    async fn find_details(&self, id: BookingId) -> Result<Option<BookingDetails>, StoreError>;

    /// Set `confirmation_sent = true`, touching no other field.
    ///
    /// No locking: concurrent calls for the same booking race harmlessly.
    async fn mark_confirmation_sent(&self, id: BookingId) -> Result<(), StoreError>;

    /// Bookings with status `pending` and `created_at < threshold`.
    async fn pending_created_before(
        &self,
        threshold: DateTime<Utc>,
    ) -> Result<Vec<Booking>, StoreError>;

    /// Bookings with status `confirmed` and `after < check_in_date <= through`.
    async fn confirmed_checking_in(
        &self,
        after: NaiveDate,
        through: NaiveDate,
    ) -> Result<Vec<Booking>, StoreError>;
}
