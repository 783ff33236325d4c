//! Typed task API.
//!
//! Task types are named once, as an associated constant, so a typo in a
//! task_type string cannot split a task from its handler.
//!
//! - Surface: `Task`, `Handler<T>` (type-safe)
//! - Inside: `DynHandler` (object-safe, type-erased)

pub mod handler;
pub mod registry;
pub mod task;

pub use self::handler::{DynHandler, Handler, TaskContext, TypedHandler};
pub use self::registry::{RegistryError, TypedRegistry};
pub use self::task::{Task, enqueue_task, new_task};
