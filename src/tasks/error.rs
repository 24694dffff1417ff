#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("failed to read task directory {path}: {source}")]
    ReadDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read task definition {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid task definition {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid task definition {path}: {reason}")]
    InvalidSpec { path: String, reason: String },
    #[error("duplicate task_id '{task_id}' in {first} and {second}")]
    DuplicateTaskId {
        task_id: String,
        first: String,
        second: String,
    },
    #[error("Unknown handler '{handler}' for task_id '{task_id}'. Known handlers: {known}")]
    UnknownHandler {
        task_id: String,
        handler: String,
        known: String,
    },
    #[error("Handler '{handler}' has task_id '{resolved}', expected '{expected}'.")]
    HandlerTaskMismatch {
        handler: String,
        resolved: String,
        expected: String,
    },
    #[error("task_id '{task_id}' depends on task '{dependency}' which is not registered")]
    MissingDependency { task_id: String, dependency: String },
    #[error("Unknown task_id '{task_id}'. Known tasks: {known}")]
    NotFound { task_id: String, known: String },
}
