//! Concrete adapters for the ports.

pub mod log_mailer;
pub mod memory_store;
pub mod smtp;
pub mod tera_renderer;

pub use self::log_mailer::LogMailer;
pub use self::memory_store::{InMemoryBookingStore, StoreSeed};
pub use self::smtp::SmtpMailer;
pub use self::tera_renderer::TeraRenderer;
