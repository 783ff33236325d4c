//! Booking records as seen by the notification tasks.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{BookingId, ListingId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

/// An amount in minor units (cents) with its ISO currency code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub amount_minor: i64,
    pub currency: String,
}

impl Money {
    pub fn new(amount_minor: i64, currency: impl Into<String>) -> Self {
        Self {
            amount_minor,
            currency: currency.into(),
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.amount_minor < 0 { "-" } else { "" };
        let abs = self.amount_minor.unsigned_abs();
        write!(f, "{sign}{}.{:02} {}", abs / 100, abs % 100, self.currency)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub booking_number: String,
    pub status: BookingStatus,
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
    pub number_of_guests: u32,
    pub total_price: Money,
    #[serde(default)]
    pub confirmation_sent: bool,
    pub created_at: DateTime<Utc>,
    pub listing_id: ListingId,
    pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub title: String,
    #[serde(default)]
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

/// A booking loaded together with its listing and user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingDetails {
    pub booking: Booking,
    pub listing: Listing,
    pub user: User,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::whole(25000, "250.00 USD")]
    #[case::cents(1999, "19.99 USD")]
    #[case::small(5, "0.05 USD")]
    #[case::negative(-150, "-1.50 USD")]
    fn money_displays_major_and_minor_units(#[case] minor: i64, #[case] expected: &str) {
        assert_eq!(Money::new(minor, "USD").to_string(), expected);
    }

    #[test]
    fn status_uses_lowercase_names() {
        let s = serde_json::to_string(&BookingStatus::Pending).unwrap();
        assert_eq!(s, "\"pending\"");
        let back: BookingStatus = serde_json::from_str("\"confirmed\"").unwrap();
        assert_eq!(back, BookingStatus::Confirmed);
    }
}
