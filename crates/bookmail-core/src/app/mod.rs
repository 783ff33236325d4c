//! App layer: wiring, workers and the periodic scheduler.

pub mod builder;
pub mod scheduler;
pub mod worker;

pub use self::builder::{App, AppBuilder, BuildError};
pub use self::scheduler::{Scheduler, SchedulerHandle};
pub use self::worker::{WorkerGroup, execute, process, run_until_idle};
