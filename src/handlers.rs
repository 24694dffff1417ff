//! Task handlers and the static table that binds handler keys to them.
//!
//! Every task definition names a `handler` key; [`build_handler`] turns that
//! key into a concrete [`TaskHandler`]. The orchestrator drives handlers
//! through [`TaskHandler`] only.

use crate::llm::{LlmAdapter, LlmError, LlmHandle};
use crate::news::{CardFetcher, HttpCardFetcher, ScrapeError};
use crate::orchestration::response::TaskResponse;
use crate::shared::files::FileToolError;
use crate::tasks::{
    validate_task_payload, Payload, PayloadValidationError, RegistryError, TaskCatalog, TaskSpec,
};
use serde_json::Value;
use std::sync::Arc;

pub mod append_comment;
pub mod batching;
pub mod daily_report;
pub mod extract_top_news;
pub mod fetch_homepage;
pub mod translate_news;

pub use append_comment::AppendCommentHandler;
pub use batching::{
    is_retryable_message, run_batched_with_retry, Ranked, RetryPolicy, RetryableError,
};
pub use daily_report::{DailyReportHandler, PipelineStep, StepRecord, StepStatus};
pub use extract_top_news::{dedupe_and_rank, ExtractTopNewsHandler};
pub use fetch_homepage::FetchHomepageHandler;
pub use translate_news::{render_markdown, TranslateNewsHandler};

pub const APPEND_COMMENT_KEY: &str = "append_comment";
pub const FETCH_HOMEPAGE_KEY: &str = "fetch_homepage";
pub const EXTRACT_TOP_NEWS_KEY: &str = "extract_top_news";
pub const TRANSLATE_NEWS_KEY: &str = "translate_news";
pub const DAILY_REPORT_KEY: &str = "daily_report";

pub const HANDLER_KEYS: &[&str] = &[
    APPEND_COMMENT_KEY,
    FETCH_HOMEPAGE_KEY,
    EXTRACT_TOP_NEWS_KEY,
    TRANSLATE_NEWS_KEY,
    DAILY_REPORT_KEY,
];

#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("LLM is required for {task_id}")]
    LlmRequired { task_id: &'static str },
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error(transparent)]
    Scrape(#[from] ScrapeError),
    #[error(transparent)]
    Files(#[from] FileToolError),
    #[error(transparent)]
    Validation(#[from] PayloadValidationError),
    #[error("Step '{step}' failed: {reason}")]
    StepFailed {
        step: String,
        reason: String,
        steps: Vec<StepRecord>,
    },
    #[error("step `{step}` produced no `{field}`")]
    MissingStepOutput { step: String, field: &'static str },
    #[error("{0}")]
    Failed(String),
}

/// What the orchestrator knows about LLM availability for one invocation.
#[derive(Clone, Copy)]
pub struct LlmContext<'a> {
    pub enabled: bool,
    pub fallback_to_rules: bool,
    pub adapter: Option<&'a dyn LlmAdapter>,
    pub bootstrap_error: Option<&'a str>,
}

impl<'a> LlmContext<'a> {
    pub fn from_handle(handle: &'a LlmHandle) -> Self {
        Self {
            enabled: handle.is_enabled(),
            fallback_to_rules: handle.fallback_to_rules(),
            adapter: handle.adapter(),
            bootstrap_error: handle.bootstrap_error(),
        }
    }
}

/// Result of the LLM preprocessing stage.
///
/// `llm_error` is advisory; `fatal_error` fails the invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmPreprocessOutcome {
    pub payload: Payload,
    pub llm_error: Option<String>,
    pub fatal_error: Option<String>,
}

impl LlmPreprocessOutcome {
    pub fn unchanged(payload: Payload) -> Self {
        Self {
            payload,
            llm_error: None,
            fatal_error: None,
        }
    }

    /// Keeps the payload and records `message`; fatal unless rules may take over.
    pub fn degraded(payload: Payload, message: String, fallback_to_rules: bool) -> Self {
        let fatal_error = (!fallback_to_rules).then(|| message.clone());
        Self {
            payload,
            llm_error: Some(message),
            fatal_error,
        }
    }
}

pub trait TaskHandler: Send + Sync {
    fn task_id(&self) -> &'static str;

    fn requires_llm(&self) -> bool {
        false
    }

    fn plan(&self, _payload: &Payload, spec: &TaskSpec) -> String {
        spec.goal.clone()
    }

    fn validate_payload(
        &self,
        payload: &Payload,
        spec: &TaskSpec,
    ) -> Result<Payload, PayloadValidationError> {
        validate_task_payload(spec, payload)
    }

    fn preprocess_with_llm(
        &self,
        payload: Payload,
        _spec: &TaskSpec,
        _llm: LlmContext<'_>,
    ) -> LlmPreprocessOutcome {
        LlmPreprocessOutcome::unchanged(payload)
    }

    /// Performs the task's side effect.
    fn execute(&self, payload: &Payload, spec: &TaskSpec) -> Result<Payload, HandlerError>;

    fn format_response(
        &self,
        spec: &TaskSpec,
        result: Payload,
        llm_error: Option<String>,
    ) -> TaskResponse {
        TaskResponse::ok(spec.id.to_string(), result, llm_error)
    }
}

/// Collaborators shared by every handler built for one registry.
#[derive(Clone)]
pub struct HandlerDeps {
    pub llm: LlmHandle,
    pub fetcher: Arc<dyn CardFetcher>,
}

impl HandlerDeps {
    pub fn new(llm: LlmHandle, fetcher: Arc<dyn CardFetcher>) -> Self {
        Self { llm, fetcher }
    }

    pub fn with_llm(llm: LlmHandle) -> Self {
        Self::new(llm, Arc::new(HttpCardFetcher::new()))
    }
}

impl Default for HandlerDeps {
    fn default() -> Self {
        Self::with_llm(LlmHandle::disabled())
    }
}

fn dependency(
    catalog: &TaskCatalog,
    task_id: &str,
    dependency: &str,
) -> Result<Arc<TaskSpec>, RegistryError> {
    catalog
        .get(dependency)
        .cloned()
        .ok_or_else(|| RegistryError::MissingDependency {
            task_id: task_id.to_string(),
            dependency: dependency.to_string(),
        })
}

/// Resolves the handler named by `spec.handler`.
pub fn build_handler(
    spec: &TaskSpec,
    catalog: &TaskCatalog,
    deps: &HandlerDeps,
) -> Result<Arc<dyn TaskHandler>, RegistryError> {
    let handler: Arc<dyn TaskHandler> = match spec.handler.as_str() {
        APPEND_COMMENT_KEY => Arc::new(AppendCommentHandler::new()),
        FETCH_HOMEPAGE_KEY => Arc::new(FetchHomepageHandler::new(deps.fetcher.clone())),
        EXTRACT_TOP_NEWS_KEY => Arc::new(ExtractTopNewsHandler::new(deps.llm.clone())),
        TRANSLATE_NEWS_KEY => Arc::new(TranslateNewsHandler::new(deps.llm.clone())),
        DAILY_REPORT_KEY => {
            let id = spec.id.as_str();
            let fetch_spec = dependency(catalog, id, fetch_homepage::TASK_ID)?;
            let extract_spec = dependency(catalog, id, extract_top_news::TASK_ID)?;
            let translate_spec = dependency(catalog, id, translate_news::TASK_ID)?;
            Arc::new(DailyReportHandler::new(
                PipelineStep::new(
                    Arc::new(FetchHomepageHandler::new(deps.fetcher.clone())),
                    fetch_spec,
                ),
                PipelineStep::new(
                    Arc::new(ExtractTopNewsHandler::new(deps.llm.clone())),
                    extract_spec,
                ),
                PipelineStep::new(
                    Arc::new(TranslateNewsHandler::new(deps.llm.clone())),
                    translate_spec,
                ),
            ))
        }
        other => {
            return Err(RegistryError::UnknownHandler {
                task_id: spec.id.to_string(),
                handler: other.to_string(),
                known: HANDLER_KEYS.join(", "),
            })
        }
    };
    Ok(handler)
}

pub(crate) fn optional_str<'a>(payload: &'a Payload, key: &str) -> Option<&'a str> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Reads an optional integer; absent, null or `0` yields `default`, and a
/// negative value is rejected.
pub(crate) fn positive_or_default(
    payload: &Payload,
    key: &str,
    default: u64,
) -> Result<u64, HandlerError> {
    let value = match payload.get(key) {
        None | Some(Value::Null) => return Ok(default),
        Some(value) => value,
    };
    match value.as_i64() {
        Some(0) => Ok(default),
        Some(number) if number > 0 => Ok(number.unsigned_abs()),
        Some(_) => Err(HandlerError::InvalidInput(format!("{key} must be > 0"))),
        None => Err(HandlerError::InvalidInput(format!("{key} must be an integer"))),
    }
}

/// String form of a loosely-typed JSON value; null becomes empty.
pub(crate) fn value_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
pub(crate) fn bare_spec(task_id: &str, handler: &str) -> TaskSpec {
    serde_yaml::from_str(&format!(
        "id: {task_id}\nhandler: {handler}\ngoal: Test goal\ninputs:\n  type: object\noutputs:\n  type: object\n"
    ))
    .expect("bare spec")
}
