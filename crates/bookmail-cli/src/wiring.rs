//! Builds the adapters and the notification app from settings.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use bookmail_core::app::App;
use bookmail_core::config::Settings;
use bookmail_core::impls::{InMemoryBookingStore, LogMailer, SmtpMailer, StoreSeed, TeraRenderer};
use bookmail_core::ports::{Mailer, SystemClock};
use bookmail_core::queue::InMemoryQueue;
use bookmail_core::tasks::{NotificationDeps, notification_app};
use tracing::{info, warn};

pub struct Wiring {
    pub queue: Arc<InMemoryQueue>,
    pub app: App,
}

pub fn load_store(seed: Option<&Path>) -> anyhow::Result<InMemoryBookingStore> {
    let Some(path) = seed else {
        warn!("no seed file given, booking store starts empty");
        return Ok(InMemoryBookingStore::new());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading seed file {}", path.display()))?;
    let seed: StoreSeed = serde_json::from_str(&raw)
        .with_context(|| format!("parsing seed file {}", path.display()))?;
    info!(
        bookings = seed.bookings.len(),
        listings = seed.listings.len(),
        users = seed.users.len(),
        "booking store seeded"
    );
    Ok(InMemoryBookingStore::from_seed(seed))
}

fn mailer(settings: &Settings) -> anyhow::Result<Arc<dyn Mailer>> {
    match &settings.mail.smtp {
        Some(smtp) => {
            info!(host = %smtp.host, port = smtp.port, "using smtp relay");
            Ok(Arc::new(SmtpMailer::new(smtp).context("configuring smtp relay")?))
        }
        None => {
            info!("no smtp relay configured, emails go to the log");
            Ok(Arc::new(LogMailer::log_only()))
        }
    }
}

/// `retain_finished` bounds how many finished tasks the queue keeps; `None`
/// keeps them all.
pub fn wire(
    settings: &Settings,
    seed: Option<&Path>,
    retain_finished: Option<usize>,
) -> anyhow::Result<Wiring> {
    let queue = Arc::new(match retain_finished {
        Some(keep) => InMemoryQueue::bounded(keep),
        None => InMemoryQueue::new(),
    });
    let renderer = TeraRenderer::from_dir(&settings.mail.template_root)
        .context("loading email templates")?;

    let app = notification_app(NotificationDeps {
        store: Arc::new(load_store(seed)?),
        mailer: mailer(settings)?,
        renderer: Arc::new(renderer),
        clock: Arc::new(SystemClock),
        queue: queue.clone(),
        config: settings.notification(),
    })?;

    Ok(Wiring { queue, app })
}
