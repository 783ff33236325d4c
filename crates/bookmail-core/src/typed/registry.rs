//! TypedRegistry: task_type -> type-erased handler.
//!
//! Built once at startup, then shared read-only between workers.

use std::collections::HashMap;
use std::sync::Arc;

use super::handler::{DynHandler, Handler, TypedHandler};
use super::task::Task;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("handler for task type '{0}' is already registered")]
    AlreadyRegistered(String),
}

#[derive(Default)]
pub struct TypedRegistry {
    handlers: HashMap<String, Arc<dyn DynHandler>>,
}

impl TypedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: Task, H: Handler<T> + 'static>(
        &mut self,
        handler: H,
    ) -> Result<(), RegistryError> {
        let task_type = T::TYPE.to_string();
        if self.handlers.contains_key(&task_type) {
            return Err(RegistryError::AlreadyRegistered(task_type));
        }
        self.handlers
            .insert(task_type, Arc::new(TypedHandler::<T, H>::new(handler)));
        Ok(())
    }

    pub fn get(&self, task_type: &str) -> Option<Arc<dyn DynHandler>> {
        self.handlers.get(task_type).cloned()
    }

    /// Registered task types, sorted.
    pub fn registered_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.handlers.keys().cloned().collect();
        types.sort();
        types
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typed::handler::fixtures::{AnotherTestTaskHandler, TestTaskHandler};
    use crate::typed::task::fixtures::{AnotherTestTask, TestTask};

    #[test]
    fn register_and_get() {
        let mut registry = TypedRegistry::new();
        registry.register::<TestTask, _>(TestTaskHandler).unwrap();

        let retrieved = registry.get(TestTask::TYPE).unwrap();
        assert_eq!(retrieved.task_type(), TestTask::TYPE);
        assert!(registry.get(AnotherTestTask::TYPE).is_none());
    }

    #[test]
    fn double_registration_is_rejected() {
        let mut registry = TypedRegistry::new();
        registry.register::<TestTask, _>(TestTaskHandler).unwrap();
        let result = registry.register::<TestTask, _>(TestTaskHandler);
        assert!(matches!(result, Err(RegistryError::AlreadyRegistered(_))));
    }

    #[test]
    fn registered_types_are_sorted() {
        let mut registry = TypedRegistry::new();
        registry.register::<TestTask, _>(TestTaskHandler).unwrap();
        registry
            .register::<AnotherTestTask, _>(AnotherTestTaskHandler)
            .unwrap();

        assert_eq!(
            registry.registered_types(),
            vec![AnotherTestTask::TYPE.to_string(), TestTask::TYPE.to_string()]
        );
        assert_eq!(registry.len(), 2);
    }
}
