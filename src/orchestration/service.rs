use crate::config::{load_settings, Settings};
use crate::handlers::HandlerDeps;
use crate::llm::LlmHandle;
use crate::orchestration::engine::Orchestrator;
use crate::orchestration::error::{ErrorCode, ServiceError};
use crate::orchestration::response::TaskResponse;
use crate::orchestration::routing::TaskRouter;
use crate::tasks::{Payload, TaskRegistry};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::info;

/// Application-facing entry point: registry, router and orchestrator built
/// once and shared read-only by every invocation.
pub struct AgentService {
    registry: Arc<TaskRegistry>,
    router: Arc<TaskRouter>,
    orchestrator: Orchestrator,
}

impl AgentService {
    pub fn load() -> Result<Self, ServiceError> {
        let settings = load_settings()?;
        Self::from_settings(&settings)
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, ServiceError> {
        let llm = LlmHandle::bootstrap(settings);
        let deps = HandlerDeps::with_llm(llm.clone());
        let registry = TaskRegistry::load(&settings.task_config_dir, &deps)?;
        let router = TaskRouter::from_registry(&registry);
        Self::from_parts(registry, router, llm)
    }

    /// Fails when the registry and router do not cover the same task ids.
    pub fn from_parts(
        registry: TaskRegistry,
        router: TaskRouter,
        llm: LlmHandle,
    ) -> Result<Self, ServiceError> {
        ensure_routes_cover_registry(&registry, &router)?;
        let registry = Arc::new(registry);
        let router = Arc::new(router);
        info!(
            tasks = registry.list_ids().len(),
            llm_enabled = llm.is_enabled(),
            "agent service ready"
        );
        Ok(Self {
            orchestrator: Orchestrator::new(registry.clone(), router.clone(), llm),
            registry,
            router,
        })
    }

    pub fn run_task(&self, task_id: &str, payload: Payload) -> TaskResponse {
        self.orchestrator
            .invoke(task_id, payload)
            .response
            .unwrap_or_else(|| {
                TaskResponse::failed(
                    task_id,
                    ErrorCode::InternalError,
                    "Agent did not produce a response",
                )
            })
    }

    pub fn list_tasks(&self) -> Vec<String> {
        let routed: BTreeSet<String> = self.router.list_ids().into_iter().collect();
        self.registry
            .list_ids()
            .into_iter()
            .filter(|task_id| routed.contains(task_id))
            .collect()
    }
}

fn ensure_routes_cover_registry(
    registry: &TaskRegistry,
    router: &TaskRouter,
) -> Result<(), ServiceError> {
    let registry_ids: BTreeSet<String> = registry.list_ids().into_iter().collect();
    let routed_ids: BTreeSet<String> = router.list_ids().into_iter().collect();
    let missing_routes: Vec<String> = registry_ids.difference(&routed_ids).cloned().collect();
    let missing_specs: Vec<String> = routed_ids.difference(&registry_ids).cloned().collect();
    if missing_routes.is_empty() && missing_specs.is_empty() {
        return Ok(());
    }
    Err(ServiceError::RouteMismatch {
        missing_routes,
        missing_specs,
    })
}
