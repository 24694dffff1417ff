use crate::orchestration::error::{ErrorCode, TaskFailure};
use crate::tasks::Payload;
use serde::{Serialize, Serializer};
use serde_json::Value;

pub const STATUS_OK: &str = "ok";
pub const STATUS_FAILED: &str = "failed";

/// Final value of one invocation.
///
/// Serializes flat: `{"status": "ok", "task_id", ...result, "llm_error"?}` or
/// `{"status": "failed", "task_id", "error": {"code", "message"}}`.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskResponse {
    Ok {
        task_id: String,
        result: Payload,
        llm_error: Option<String>,
    },
    Failed {
        task_id: String,
        error: TaskFailure,
    },
}

impl TaskResponse {
    pub fn ok(task_id: impl Into<String>, result: Payload, llm_error: Option<String>) -> Self {
        Self::Ok {
            task_id: task_id.into(),
            result,
            llm_error,
        }
    }

    pub fn failed(task_id: impl Into<String>, code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Failed {
            task_id: task_id.into(),
            error: TaskFailure::new(code, message),
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            Self::Ok { .. } => STATUS_OK,
            Self::Failed { .. } => STATUS_FAILED,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }

    pub fn task_id(&self) -> &str {
        match self {
            Self::Ok { task_id, .. } | Self::Failed { task_id, .. } => task_id,
        }
    }

    pub fn result(&self) -> Option<&Payload> {
        match self {
            Self::Ok { result, .. } => Some(result),
            Self::Failed { .. } => None,
        }
    }

    pub fn llm_error(&self) -> Option<&str> {
        match self {
            Self::Ok { llm_error, .. } => llm_error.as_deref(),
            Self::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&TaskFailure> {
        match self {
            Self::Failed { error, .. } => Some(error),
            Self::Ok { .. } => None,
        }
    }

    pub fn error_code(&self) -> Option<ErrorCode> {
        self.error().map(|error| error.code)
    }

    pub fn to_json(&self) -> Value {
        let mut body = Payload::new();
        body.insert("status".to_string(), Value::from(self.status()));
        body.insert("task_id".to_string(), Value::from(self.task_id()));
        match self {
            Self::Ok {
                result, llm_error, ..
            } => {
                body.extend(result.iter().map(|(key, value)| (key.clone(), value.clone())));
                if let Some(llm_error) = llm_error {
                    body.insert("llm_error".to_string(), Value::from(llm_error.as_str()));
                }
            }
            Self::Failed { error, .. } => {
                let mut failure = Payload::new();
                failure.insert("code".to_string(), Value::from(error.code.as_str()));
                failure.insert("message".to_string(), Value::from(error.message.as_str()));
                body.insert("error".to_string(), Value::Object(failure));
            }
        }
        Value::Object(body)
    }
}

impl Serialize for TaskResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}
