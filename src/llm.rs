//! Structured-output language model access.
//!
//! Handlers only see [`LlmAdapter::invoke_structured`]; provider specifics
//! (authentication, endpoints, response envelopes) stay inside the adapters.

use crate::config::Settings;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

pub mod anthropic;
pub mod chains;
pub mod factory;
pub mod openai;
pub mod prompt_render;
pub mod schema;

pub use chains::{CommentNormChain, NewsExtractChain, NewsTranslateChain};
pub use factory::build_llm_adapter;
pub use schema::{
    CommentNormOutput, ExtractedNewsItem, NewsExtractOutput, NewsItemEn, NewsTranslateOutput,
    TranslatedNewsItem,
};

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("{var} is required when llm_provider={provider}")]
    MissingCredential {
        provider: &'static str,
        var: &'static str,
    },
    #[error("Unsupported llm_provider '{0}'")]
    UnsupportedProvider(String),
    #[error("LLM adapter is unavailable: {0}")]
    Unavailable(String),
    #[error("llm request to {endpoint} failed with status {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },
    #[error("llm request to {endpoint} failed: {reason}")]
    Transport { endpoint: String, reason: String },
    #[error("llm response could not be parsed: {0}")]
    Response(String),
    #[error("llm output does not match `{schema}`: {reason}")]
    OutputValidation { schema: String, reason: String },
    #[error("prompt render failed: {0}")]
    Prompt(String),
}

/// JSON schema handed to the provider alongside the prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSchema {
    pub name: &'static str,
    pub description: &'static str,
    pub json_schema: Value,
}

pub trait LlmAdapter: Send + Sync {
    fn invoke_structured(&self, prompt: &str, schema: &OutputSchema) -> Result<Value, LlmError>;
}

/// A typed structured output with its schema and post-parse checks.
pub trait StructuredOutput: DeserializeOwned {
    fn output_schema() -> OutputSchema;

    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

pub fn invoke_typed<T: StructuredOutput>(
    adapter: &dyn LlmAdapter,
    prompt: &str,
) -> Result<T, LlmError> {
    let schema = T::output_schema();
    let raw = adapter.invoke_structured(prompt, &schema)?;
    let parsed: T = serde_json::from_value(raw).map_err(|err| LlmError::OutputValidation {
        schema: schema.name.to_string(),
        reason: err.to_string(),
    })?;
    parsed
        .validate()
        .map_err(|reason| LlmError::OutputValidation {
            schema: schema.name.to_string(),
            reason,
        })?;
    Ok(parsed)
}

/// LLM availability for one service instance, resolved once at startup.
#[derive(Clone)]
pub struct LlmHandle {
    enabled: bool,
    fallback_to_rules: bool,
    adapter: Option<Arc<dyn LlmAdapter>>,
    bootstrap_error: Option<String>,
}

impl std::fmt::Debug for LlmHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmHandle")
            .field("enabled", &self.enabled)
            .field("fallback_to_rules", &self.fallback_to_rules)
            .field("adapter", &self.adapter.is_some())
            .field("bootstrap_error", &self.bootstrap_error)
            .finish()
    }
}

impl LlmHandle {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            fallback_to_rules: true,
            adapter: None,
            bootstrap_error: None,
        }
    }

    pub fn with_adapter(adapter: Arc<dyn LlmAdapter>, fallback_to_rules: bool) -> Self {
        Self {
            enabled: true,
            fallback_to_rules,
            adapter: Some(adapter),
            bootstrap_error: None,
        }
    }

    pub fn failed_bootstrap(error: impl Into<String>, fallback_to_rules: bool) -> Self {
        Self {
            enabled: true,
            fallback_to_rules,
            adapter: None,
            bootstrap_error: Some(error.into()),
        }
    }

    pub fn bootstrap(settings: &Settings) -> Self {
        if !settings.llm_enabled {
            return Self {
                fallback_to_rules: settings.llm_fallback_to_rules,
                ..Self::disabled()
            };
        }
        match build_llm_adapter(settings) {
            Ok(adapter) => Self::with_adapter(adapter, settings.llm_fallback_to_rules),
            Err(err) => {
                warn!(
                    provider = %settings.llm_provider,
                    error = %err,
                    "llm adapter bootstrap failed"
                );
                Self::failed_bootstrap(err.to_string(), settings.llm_fallback_to_rules)
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn fallback_to_rules(&self) -> bool {
        self.fallback_to_rules
    }

    pub fn adapter(&self) -> Option<&dyn LlmAdapter> {
        self.adapter.as_deref()
    }

    pub fn bootstrap_error(&self) -> Option<&str> {
        self.bootstrap_error.as_deref()
    }

    /// The adapter, or the reason it could not be built.
    pub fn require_adapter(&self) -> Result<&dyn LlmAdapter, LlmError> {
        self.adapter().ok_or_else(|| {
            LlmError::Unavailable(
                self.bootstrap_error
                    .clone()
                    .unwrap_or_else(|| "LLM is disabled".to_string()),
            )
        })
    }
}

pub(crate) fn post_json(
    agent: &ureq::Agent,
    endpoint: &str,
    headers: &[(&str, &str)],
    body: &Value,
) -> Result<Value, LlmError> {
    let mut request = agent.post(endpoint).set("content-type", "application/json");
    for (name, value) in headers {
        request = request.set(name, value);
    }
    let response = request.send_json(body.clone()).map_err(|err| match err {
        ureq::Error::Status(status, response) => LlmError::Status {
            endpoint: endpoint.to_string(),
            status,
            body: response.into_string().unwrap_or_default(),
        },
        ureq::Error::Transport(transport) => LlmError::Transport {
            endpoint: endpoint.to_string(),
            reason: transport.to_string(),
        },
    })?;
    response
        .into_json::<Value>()
        .map_err(|err| LlmError::Response(err.to_string()))
}

/// Parses model text as JSON, tolerating a surrounding markdown fence.
pub(crate) fn parse_json_text(text: &str) -> Result<Value, LlmError> {
    let trimmed = text.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed);
    serde_json::from_str(unfenced.trim()).map_err(|err| LlmError::Response(err.to_string()))
}
