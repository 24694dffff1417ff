use crate::handlers::LlmContext;
use crate::llm::LlmHandle;
use crate::orchestration::error::ErrorCode;
use crate::orchestration::response::TaskResponse;
use crate::orchestration::routing::TaskRouter;
use crate::orchestration::state::{AgentState, Stage};
use crate::tasks::{Payload, TaskRegistry};
use std::sync::Arc;
use tracing::{debug, info, info_span, warn};

const UNKNOWN_ERROR: &str = "Unknown error";

/// Drives one invocation through the five stages in fixed order.
///
/// Every stage after planning returns the state untouched once a failure has
/// been recorded; the response stage always runs.
pub struct Orchestrator {
    registry: Arc<TaskRegistry>,
    router: Arc<TaskRouter>,
    llm: LlmHandle,
}

impl Orchestrator {
    pub fn new(registry: Arc<TaskRegistry>, router: Arc<TaskRouter>, llm: LlmHandle) -> Self {
        Self {
            registry,
            router,
            llm,
        }
    }

    pub fn invoke(&self, task_id: &str, payload: Payload) -> AgentState {
        let span = info_span!("task", task_id = %task_id);
        let _entered = span.enter();

        let state = Stage::ALL
            .iter()
            .fold(AgentState::new(task_id, payload), |state, stage| {
                debug!(stage = %stage, "stage started");
                self.run_stage(*stage, state)
            });

        match state.error_code() {
            Some(code) => warn!(code = %code, "task failed"),
            None if state.llm_error.is_some() => info!("task completed with llm fallback"),
            None => info!("task completed"),
        }
        state
    }

    fn run_stage(&self, stage: Stage, state: AgentState) -> AgentState {
        match stage {
            Stage::Planning => self.planning(state),
            Stage::Validation => self.validation(state),
            Stage::LlmGenerate => self.llm_generate(state),
            Stage::Execute => self.execute(state),
            Stage::Response => self.response(state),
        }
    }

    fn planning(&self, mut state: AgentState) -> AgentState {
        let spec = match self.registry.get(&state.task_id) {
            Ok(spec) => spec,
            Err(err) => return state.fail(ErrorCode::TaskNotFound, err.to_string()),
        };
        let handler = match self.router.route(&state.task_id) {
            Ok(handler) => handler,
            Err(err) => return state.fail(ErrorCode::TaskNotRouted, err.to_string()),
        };
        state.plan = Some(handler.plan(&state.input_payload, &spec));
        state.task_spec = Some(spec);
        state.handler = Some(handler);
        state
    }

    fn validation(&self, mut state: AgentState) -> AgentState {
        if state.is_failed() {
            return state;
        }
        let (Some(spec), Some(handler)) = (state.task_spec.clone(), state.handler.clone()) else {
            return state.fail(
                ErrorCode::InternalError,
                "validation ran without a resolved task spec and handler",
            );
        };
        match handler.validate_payload(&state.input_payload, &spec) {
            Ok(validated) => {
                state.validated_payload = Some(validated);
                state
            }
            Err(err) => state.fail(ErrorCode::InvalidPayload, err.to_string()),
        }
    }

    fn llm_generate(&self, mut state: AgentState) -> AgentState {
        if state.is_failed() {
            return state;
        }
        let (Some(spec), Some(handler)) = (state.task_spec.clone(), state.handler.clone()) else {
            return state.fail(
                ErrorCode::InternalError,
                "llm_generate ran without a resolved task spec and handler",
            );
        };
        if !handler.requires_llm() {
            return state;
        }
        let Some(payload) = state.validated_payload.take() else {
            return state.fail(
                ErrorCode::InternalError,
                "llm_generate ran without a validated payload",
            );
        };

        let context = LlmContext::from_handle(&self.llm);
        if context.enabled {
            if let Some(bootstrap_error) = context.bootstrap_error {
                state.llm_error = Some(bootstrap_error.to_string());
            }
        }

        let outcome = handler.preprocess_with_llm(payload, &spec, context);
        state.validated_payload = Some(outcome.payload);
        if let Some(llm_error) = outcome.llm_error {
            warn!(error = %llm_error, "llm preprocessing degraded");
            state.llm_error = Some(llm_error);
        }
        match outcome.fatal_error {
            Some(fatal) => state.fail(ErrorCode::LlmPreprocessFailed, fatal),
            None => state,
        }
    }

    fn execute(&self, mut state: AgentState) -> AgentState {
        if state.is_failed() {
            return state;
        }
        let (Some(spec), Some(handler), Some(payload)) = (
            state.task_spec.clone(),
            state.handler.clone(),
            state.validated_payload.take(),
        ) else {
            return state.fail(
                ErrorCode::InternalError,
                "execute ran without a validated payload",
            );
        };
        let outcome = handler.execute(&payload, &spec);
        state.validated_payload = Some(payload);
        match outcome {
            Ok(result) => {
                state.execution_result = Some(result);
                state
            }
            Err(err) => state.fail(ErrorCode::ExecutionError, err.to_string()),
        }
    }

    fn response(&self, mut state: AgentState) -> AgentState {
        if state.failure.is_none() {
            if let (Some(spec), Some(handler), Some(result)) = (
                state.task_spec.clone(),
                state.handler.clone(),
                state.execution_result.clone(),
            ) {
                state.response =
                    Some(handler.format_response(&spec, result, state.llm_error.clone()));
                return state;
            }
            state = state.fail(
                ErrorCode::InternalError,
                "response ran without an execution result",
            );
        }

        if let Some(failure) = &state.failure {
            let message = if failure.message.trim().is_empty() {
                UNKNOWN_ERROR
            } else {
                failure.message.as_str()
            };
            state.response = Some(TaskResponse::failed(
                state.task_id.clone(),
                failure.code,
                message,
            ));
        }
        state
    }
}
