mod telemetry;
mod wiring;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use bookmail_core::app::{Scheduler, run_until_idle};
use bookmail_core::config::Settings;
use bookmail_core::domain::{BookingId, TaskId};
use bookmail_core::queue::{InMemoryQueue, Queue, QueueCounts, TaskState};
use bookmail_core::tasks::{
    CheckPendingBookings, SendBookingConfirmation, SendBookingReminders, SendPaymentConfirmation,
};
use bookmail_core::typed::{Task, enqueue_task};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::info;

use crate::wiring::{Wiring, wire};

#[derive(Debug, Parser)]
#[command(name = "bookmail", version, about = "Booking email notifications")]
struct Cli {
    /// Directory holding default/<RUN_MODE>/local settings files.
    #[arg(long, global = true, default_value = "config")]
    config_dir: String,

    /// JSON file with listings, users and bookings for the in-memory store.
    #[arg(long, global = true)]
    seed: Option<PathBuf>,

    /// Log as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run workers and the sweep schedule until Ctrl-C.
    Run {
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Send the confirmation email for one booking.
    SendConfirmation {
        #[arg(long)]
        booking_id: i64,
    },
    /// Send a payment confirmation.
    SendPayment {
        #[arg(long)]
        email: String,
        #[arg(long)]
        tx_ref: String,
    },
    /// Run one sweep now.
    Sweep {
        #[arg(value_enum)]
        which: SweepKind,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SweepKind {
    Pending,
    Upcoming,
}

/// What a one-shot command prints when it is done.
#[derive(Debug, Serialize)]
struct Report {
    task_id: String,
    task_type: String,
    state: TaskState,
    attempts: u32,
    result: Option<String>,
    last_error: Option<String>,
    counts: QueueCounts,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    telemetry::init(cli.json_logs);

    let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
    let settings = Settings::load_from(&cli.config_dir, &run_mode)
        .with_context(|| format!("loading settings from {}", cli.config_dir))?;
    let retain_finished = matches!(cli.command, Command::Run { .. })
        .then_some(settings.queue.retain_finished);
    let wiring = wire(&settings, cli.seed.as_deref(), retain_finished)?;

    match cli.command {
        Command::Run { workers } => {
            let workers = workers.unwrap_or(settings.worker.concurrency);
            serve(wiring, &settings, workers).await
        }
        Command::SendConfirmation { booking_id } => {
            let task = SendBookingConfirmation {
                booking_id: BookingId(booking_id),
            };
            one_shot(wiring, &task).await
        }
        Command::SendPayment { email, tx_ref } => {
            let task = SendPaymentConfirmation {
                user_email: email,
                tx_ref,
            };
            one_shot(wiring, &task).await
        }
        Command::Sweep { which } => match which {
            SweepKind::Pending => one_shot(wiring, &CheckPendingBookings).await,
            SweepKind::Upcoming => one_shot(wiring, &SendBookingReminders).await,
        },
    }
}

async fn serve(wiring: Wiring, settings: &Settings, workers: usize) -> anyhow::Result<()> {
    if workers == 0 {
        bail!("at least one worker is required");
    }
    let Wiring { queue, app } = wiring;
    let dyn_queue: Arc<dyn Queue> = queue.clone();

    let scheduler = Scheduler::new(dyn_queue.clone())
        .every(&CheckPendingBookings, settings.schedule.pending_sweep_every())?
        .every(&SendBookingReminders, settings.schedule.upcoming_sweep_every())?
        .spawn();
    let group = app.spawn_workers(workers, dyn_queue);
    info!(workers, "bookmail running, press Ctrl-C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl-C")?;
    info!("shutting down");

    scheduler.shutdown_and_join().await;
    group.shutdown_and_join().await;
    queue.close().await;

    info!(counts = ?queue.counts_by_state().await?, "stopped");
    Ok(())
}

/// Submit one task, drain the queue on the current task and print a report.
async fn one_shot<T: Task>(wiring: Wiring, task: &T) -> anyhow::Result<()> {
    let Wiring { queue, app } = wiring;
    let task_id = enqueue_task(queue.as_ref(), task).await?;
    run_until_idle(queue.as_ref(), &app.registry).await?;

    let report = report(&queue, task_id).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    if report.state == TaskState::Dead {
        bail!("task {task_id} failed: {}", report.last_error.unwrap_or_default());
    }
    Ok(())
}

async fn report(queue: &InMemoryQueue, task_id: TaskId) -> anyhow::Result<Report> {
    let record = queue
        .task(task_id)
        .await
        .with_context(|| format!("task {task_id} vanished from the queue"))?;
    Ok(Report {
        task_id: task_id.to_string(),
        task_type: record.envelope.task_type().to_string(),
        state: record.state,
        attempts: record.attempts,
        result: record.result,
        last_error: record.last_error,
        counts: queue.counts_by_state().await?,
    })
}
