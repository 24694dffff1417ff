use crate::config::ConfigError;
use crate::tasks::RegistryError;
use serde::{Deserialize, Serialize};

/// Failure codes carried by failed task responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    TaskNotFound,
    TaskNotRouted,
    InvalidPayload,
    LlmPreprocessFailed,
    ExecutionError,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::TaskNotFound => "TASK_NOT_FOUND",
            ErrorCode::TaskNotRouted => "TASK_NOT_ROUTED",
            ErrorCode::InvalidPayload => "INVALID_PAYLOAD",
            ErrorCode::LlmPreprocessFailed => "LLM_PREPROCESS_FAILED",
            ErrorCode::ExecutionError => "EXECUTION_ERROR",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFailure {
    pub code: ErrorCode,
    pub message: String,
}

impl TaskFailure {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("No handler for task_id '{task_id}'. Known handlers: {known}")]
pub struct RouteNotFound {
    pub task_id: String,
    pub known: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(
        "Router and registry mismatch. missing_routes={missing_routes:?}, missing_specs={missing_specs:?}"
    )]
    RouteMismatch {
        missing_routes: Vec<String>,
        missing_specs: Vec<String>,
    },
}
