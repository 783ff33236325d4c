//! Domain model (bookings, IDs, task envelopes, outcomes, decisions).

pub mod attempt;
pub mod booking;
pub mod decision;
pub mod ids;
pub mod outcome;
pub mod task;

pub use attempt::{AttemptRecord, DecisionRecord};
pub use booking::{Booking, BookingDetails, BookingStatus, Listing, Money, User};
pub use decision::{Decider, Decision, DefaultDecider};
pub use ids::{AttemptId, BookingId, ListingId, TaskId, UserId};
pub use outcome::{Outcome, OutcomeKind};
pub use task::{TaskEnvelope, TaskType};
