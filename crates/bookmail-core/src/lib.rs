//! bookmail-core
//!
//! Background email notifications for a booking application.
//!
//! # Modules
//! - **domain**: bookings, ids, task envelopes, outcomes and retry decisions
//! - **ports**: BookingStore, Mailer, TemplateRenderer, Clock, IdGenerator
//! - **queue**: Queue trait, retry policy and the in-memory queue
//! - **typed**: Task trait, Handler trait, TypedRegistry
//! - **app**: AppBuilder, worker group, periodic scheduler
//! - **impls**: in-memory store, log/SMTP mailers, tera renderer
//! - **tasks**: the notification tasks themselves
//! - **config**: layered settings

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod impls;
pub mod ports;
pub mod queue;
pub mod tasks;
pub mod typed;

pub use error::{ErrorKind, NotifyError};
