//! Ports: the traits the notification tasks depend on.
//!
//! Each external collaborator (record store, mail transport, template
//! renderer, clock) sits behind a trait so a unit of work can be exercised
//! with in-memory doubles. Adapters live in [`crate::impls`].

pub mod booking_store;
pub mod clock;
pub mod id_generator;
pub mod mailer;
pub mod renderer;

pub use self::booking_store::{BookingStore, StoreError};
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::mailer::{Email, MailError, Mailer};
pub use self::renderer::{RenderError, TemplateRenderer, strip_tags};
