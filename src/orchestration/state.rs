use crate::handlers::TaskHandler;
use crate::orchestration::error::{ErrorCode, TaskFailure};
use crate::orchestration::response::TaskResponse;
use crate::tasks::{Payload, TaskSpec};
use std::sync::Arc;

/// Orchestrator stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Planning,
    Validation,
    LlmGenerate,
    Execute,
    Response,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Planning,
        Stage::Validation,
        Stage::LlmGenerate,
        Stage::Execute,
        Stage::Response,
    ];
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Planning => write!(f, "planning"),
            Stage::Validation => write!(f, "validation"),
            Stage::LlmGenerate => write!(f, "llm_generate"),
            Stage::Execute => write!(f, "execute"),
            Stage::Response => write!(f, "response"),
        }
    }
}

/// Working record of one invocation, handed from stage to stage by value.
#[derive(Clone)]
pub struct AgentState {
    pub task_id: String,
    pub input_payload: Payload,
    pub task_spec: Option<Arc<TaskSpec>>,
    pub handler: Option<Arc<dyn TaskHandler>>,
    pub validated_payload: Option<Payload>,
    pub plan: Option<String>,
    pub llm_error: Option<String>,
    pub execution_result: Option<Payload>,
    pub response: Option<TaskResponse>,
    pub failure: Option<TaskFailure>,
}

impl std::fmt::Debug for AgentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentState")
            .field("task_id", &self.task_id)
            .field("plan", &self.plan)
            .field("handler", &self.handler.as_ref().map(|handler| handler.task_id()))
            .field("llm_error", &self.llm_error)
            .field("failure", &self.failure)
            .field("response", &self.response)
            .finish()
    }
}

impl AgentState {
    pub fn new(task_id: impl Into<String>, input_payload: Payload) -> Self {
        Self {
            task_id: task_id.into(),
            input_payload,
            task_spec: None,
            handler: None,
            validated_payload: None,
            plan: None,
            llm_error: None,
            execution_result: None,
            response: None,
            failure: None,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }

    pub fn error_code(&self) -> Option<ErrorCode> {
        self.failure.as_ref().map(|failure| failure.code)
    }

    /// Records a failure; the first one recorded wins.
    pub fn fail(mut self, code: ErrorCode, message: impl Into<String>) -> Self {
        if self.failure.is_none() {
            self.failure = Some(TaskFailure::new(code, message));
        }
        self
    }
}
