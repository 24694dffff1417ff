use crate::handlers::TaskHandler;
use crate::orchestration::error::RouteNotFound;
use crate::tasks::{HandlerMap, TaskRegistry};
use std::sync::Arc;

/// Task id to handler lookup. Read-only after construction.
#[derive(Clone)]
pub struct TaskRouter {
    handlers: HandlerMap,
}

impl std::fmt::Debug for TaskRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRouter")
            .field("handlers", &self.list_ids())
            .finish()
    }
}

impl TaskRouter {
    pub fn new(handlers: HandlerMap) -> Self {
        Self { handlers }
    }

    pub fn from_registry(registry: &TaskRegistry) -> Self {
        Self::new(registry.handler_map())
    }

    pub fn route(&self, task_id: &str) -> Result<Arc<dyn TaskHandler>, RouteNotFound> {
        self.handlers
            .get(task_id)
            .cloned()
            .ok_or_else(|| RouteNotFound {
                task_id: task_id.to_string(),
                known: self.list_ids().join(", "),
            })
    }

    pub fn list_ids(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }
}
