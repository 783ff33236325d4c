//! AppBuilder: registers handlers and checks at startup that every expected
//! task type has one.

use std::sync::Arc;

use crate::queue::Queue;
use crate::typed::{Handler, RegistryError, Task, TypedRegistry};

use super::worker::WorkerGroup;

/// ```ignore
/// let app = AppBuilder::new()
///     .register::<SendWelcome, _>(SendWelcomeHandler)?
///     .expect_tasks(&[SendWelcome::TYPE])
///     .build()?;
/// ```
///
/// `build()` fails with `BuildError::MissingTaskTypes` if an expected type
/// was never registered, instead of letting those tasks die at runtime.
pub struct AppBuilder {
    registry: TypedRegistry,
    expected_tasks: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("missing task types: {0:?}. These tasks were expected but not registered.")]
    MissingTaskTypes(Vec<String>),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl AppBuilder {
    pub fn new() -> Self {
        Self {
            registry: TypedRegistry::new(),
            expected_tasks: Vec::new(),
        }
    }

    pub fn register<T: Task, H: Handler<T> + 'static>(
        mut self,
        handler: H,
    ) -> Result<Self, RegistryError> {
        self.registry.register::<T, H>(handler)?;
        Ok(self)
    }

    pub fn expect_tasks(mut self, task_types: &[&str]) -> Self {
        self.expected_tasks
            .extend(task_types.iter().map(|t| t.to_string()));
        self
    }

    pub fn build(self) -> Result<App, BuildError> {
        let registered = self.registry.registered_types();
        let missing: Vec<String> = self
            .expected_tasks
            .into_iter()
            .filter(|t| !registered.contains(t))
            .collect();
        if !missing.is_empty() {
            return Err(BuildError::MissingTaskTypes(missing));
        }
        Ok(App {
            registry: Arc::new(self.registry),
        })
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Validated handler set, ready to be served by workers.
pub struct App {
    pub registry: Arc<TypedRegistry>,
}

impl App {
    pub fn spawn_workers(&self, n: usize, queue: Arc<dyn Queue>) -> WorkerGroup {
        WorkerGroup::spawn(n, queue, Arc::clone(&self.registry))
    }
}
