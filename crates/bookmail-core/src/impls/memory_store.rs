//! In-memory BookingStore, used by tests and by the CLI's seeded mode.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::domain::{
    Booking, BookingDetails, BookingId, BookingStatus, Listing, ListingId, User, UserId,
};
use crate::ports::{BookingStore, StoreError};

/// JSON seed: `{ "listings": [...], "users": [...], "bookings": [...] }`.
#[derive(Debug, Default, Deserialize)]
pub struct StoreSeed {
    #[serde(default)]
    pub listings: Vec<Listing>,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub bookings: Vec<Booking>,
}

#[derive(Default)]
struct Tables {
    bookings: HashMap<BookingId, Booking>,
    listings: HashMap<ListingId, Listing>,
    users: HashMap<UserId, User>,
}

#[derive(Default)]
pub struct InMemoryBookingStore {
    tables: RwLock<Tables>,
    confirmation_writes: AtomicUsize,
    unavailable: AtomicBool,
}

impl InMemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: StoreSeed) -> Self {
        let tables = Tables {
            bookings: seed.bookings.into_iter().map(|b| (b.id, b)).collect(),
            listings: seed.listings.into_iter().map(|l| (l.id, l)).collect(),
            users: seed.users.into_iter().map(|u| (u.id, u)).collect(),
        };
        Self {
            tables: RwLock::new(tables),
            ..Self::default()
        }
    }

    pub async fn insert_listing(&self, listing: Listing) {
        self.tables.write().await.listings.insert(listing.id, listing);
    }

    pub async fn insert_user(&self, user: User) {
        self.tables.write().await.users.insert(user.id, user);
    }

    pub async fn insert_booking(&self, booking: Booking) {
        self.tables.write().await.bookings.insert(booking.id, booking);
    }

    pub async fn booking(&self, id: BookingId) -> Option<Booking> {
        self.tables.read().await.bookings.get(&id).cloned()
    }

    /// How many times `mark_confirmation_sent` wrote the flag.
    pub fn confirmation_writes(&self) -> usize {
        self.confirmation_writes.load(Ordering::SeqCst)
    }

    /// Make every call fail with `StoreError::Unavailable` until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory store switched off".into()));
        }
        Ok(())
    }

    async fn select(&self, pred: impl Fn(&Booking) -> bool) -> Vec<Booking> {
        let tables = self.tables.read().await;
        let mut rows: Vec<Booking> =
            tables.bookings.values().filter(|b| pred(b)).cloned().collect();
        rows.sort_by_key(|b| b.id);
        rows
    }
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn find_details(&self, id: BookingId) -> Result<Option<BookingDetails>, StoreError> {
        self.check_available()?;
        let tables = self.tables.read().await;
        let Some(booking) = tables.bookings.get(&id) else {
            return Ok(None);
        };
        let listing = tables
            .listings
            .get(&booking.listing_id)
            .ok_or(StoreError::BrokenRelation {
                booking: id,
                what: "listing",
            })?;
        let user = tables
            .users
            .get(&booking.user_id)
            .ok_or(StoreError::BrokenRelation {
                booking: id,
                what: "user",
            })?;
        Ok(Some(BookingDetails {
            booking: booking.clone(),
            listing: listing.clone(),
            user: user.clone(),
        }))
    }

    async fn mark_confirmation_sent(&self, id: BookingId) -> Result<(), StoreError> {
        self.check_available()?;
        let mut tables = self.tables.write().await;
        let booking = tables.bookings.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        booking.confirmation_sent = true;
        self.confirmation_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn pending_created_before(
        &self,
        threshold: DateTime<Utc>,
    ) -> Result<Vec<Booking>, StoreError> {
        self.check_available()?;
        Ok(self
            .select(|b| b.status == BookingStatus::Pending && b.created_at < threshold)
            .await)
    }

    async fn confirmed_checking_in(
        &self,
        after: NaiveDate,
        through: NaiveDate,
    ) -> Result<Vec<Booking>, StoreError> {
        self.check_available()?;
        Ok(self
            .select(|b| {
                b.status == BookingStatus::Confirmed
                    && b.check_in_date > after
                    && b.check_in_date <= through
            })
            .await)
    }
}
