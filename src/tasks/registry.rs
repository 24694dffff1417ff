use crate::handlers::{build_handler, HandlerDeps, TaskHandler};
use crate::tasks::error::RegistryError;
use crate::tasks::spec::TaskSpec;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

pub type TaskCatalog = BTreeMap<String, Arc<TaskSpec>>;
pub type HandlerMap = BTreeMap<String, Arc<dyn TaskHandler>>;

/// Validated task definitions and the handler bound to each of them.
/// Read-only once constructed.
pub struct TaskRegistry {
    tasks: TaskCatalog,
    handlers: HandlerMap,
}

impl std::fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRegistry")
            .field("tasks", &self.tasks.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl TaskRegistry {
    pub fn load(task_dir: &Path, deps: &HandlerDeps) -> Result<Self, RegistryError> {
        let entries = load_task_files(task_dir)?;
        let registry = Self::build(entries, deps)?;
        info!(
            task_dir = %task_dir.display(),
            tasks = registry.tasks.len(),
            "task registry loaded"
        );
        Ok(registry)
    }

    pub fn from_specs(specs: Vec<TaskSpec>, deps: &HandlerDeps) -> Result<Self, RegistryError> {
        Self::build(inline_entries(specs), deps)
    }

    /// Binds caller-supplied handlers instead of the built-in table. Every
    /// spec needs a handler whose `task_id` matches; handlers without a spec
    /// are ignored.
    pub fn with_handlers(
        specs: Vec<TaskSpec>,
        handlers: HandlerMap,
    ) -> Result<Self, RegistryError> {
        let tasks = collect_specs(inline_entries(specs))?;
        let mut bound = HandlerMap::new();
        for (task_id, spec) in &tasks {
            let handler = handlers
                .get(task_id)
                .cloned()
                .ok_or_else(|| RegistryError::UnknownHandler {
                    task_id: task_id.clone(),
                    handler: spec.handler.to_string(),
                    known: handlers.keys().cloned().collect::<Vec<_>>().join(", "),
                })?;
            bind(&mut bound, spec, handler)?;
        }
        Ok(Self {
            tasks,
            handlers: bound,
        })
    }

    fn build(entries: Vec<(String, TaskSpec)>, deps: &HandlerDeps) -> Result<Self, RegistryError> {
        let tasks = collect_specs(entries)?;
        let mut handlers = HandlerMap::new();
        for spec in tasks.values() {
            let handler = build_handler(spec, &tasks, deps)?;
            bind(&mut handlers, spec, handler)?;
        }
        Ok(Self { tasks, handlers })
    }

    pub fn get(&self, task_id: &str) -> Result<Arc<TaskSpec>, RegistryError> {
        self.tasks
            .get(task_id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound {
                task_id: task_id.to_string(),
                known: self.list_ids().join(", "),
            })
    }

    pub fn list_ids(&self) -> Vec<String> {
        self.tasks.keys().cloned().collect()
    }

    pub fn get_handler(&self, task_id: &str) -> Option<Arc<dyn TaskHandler>> {
        self.handlers.get(task_id).cloned()
    }

    pub fn handler_map(&self) -> HandlerMap {
        self.handlers.clone()
    }
}

fn inline_entries(specs: Vec<TaskSpec>) -> Vec<(String, TaskSpec)> {
    specs
        .into_iter()
        .enumerate()
        .map(|(index, spec)| (format!("<inline #{index}>"), spec))
        .collect()
}

/// Validates each spec and rejects duplicate ids, naming both sources.
fn collect_specs(entries: Vec<(String, TaskSpec)>) -> Result<TaskCatalog, RegistryError> {
    let mut sources: BTreeMap<String, String> = BTreeMap::new();
    let mut tasks = TaskCatalog::new();
    for (source, spec) in entries {
        spec.validate()
            .map_err(|reason| RegistryError::InvalidSpec {
                path: source.clone(),
                reason,
            })?;
        let task_id = spec.id.to_string();
        if let Some(first) = sources.get(&task_id) {
            return Err(RegistryError::DuplicateTaskId {
                task_id,
                first: first.clone(),
                second: source,
            });
        }
        sources.insert(task_id.clone(), source);
        tasks.insert(task_id, Arc::new(spec));
    }
    Ok(tasks)
}

fn bind(
    handlers: &mut HandlerMap,
    spec: &TaskSpec,
    handler: Arc<dyn TaskHandler>,
) -> Result<(), RegistryError> {
    if handler.task_id() != spec.id.as_str() {
        return Err(RegistryError::HandlerTaskMismatch {
            handler: spec.handler.to_string(),
            resolved: handler.task_id().to_string(),
            expected: spec.id.to_string(),
        });
    }
    debug!(task_id = %spec.id, handler = %spec.handler, "handler bound");
    handlers.insert(spec.id.to_string(), handler);
    Ok(())
}

fn load_task_files(task_dir: &Path) -> Result<Vec<(String, TaskSpec)>, RegistryError> {
    let read_dir_error = |source| RegistryError::ReadDir {
        path: task_dir.display().to_string(),
        source,
    };
    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(task_dir).map_err(read_dir_error)? {
        let path = entry.map_err(read_dir_error)?.path();
        if path.is_file() && path.extension().and_then(|ext| ext.to_str()) == Some("yaml") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut entries = Vec::with_capacity(paths.len());
    for path in paths {
        let raw = fs::read_to_string(&path).map_err(|source| RegistryError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let spec: TaskSpec = serde_yaml::from_str(&raw).map_err(|source| RegistryError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        entries.push((path.display().to_string(), spec));
    }
    Ok(entries)
}
