use p4agent::handlers::{HandlerDeps, HandlerError, TaskHandler};
use p4agent::llm::{LlmAdapter, LlmError, LlmHandle, OutputSchema};
use p4agent::orchestration::{ErrorCode, Orchestrator, TaskRouter};
use p4agent::tasks::{HandlerMap, Payload, TaskRegistry, TaskSpec};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

const RECORDING_SPEC: &str = r#"
id: recording_task
handler: recording
goal: Echo the caller's name
inputs:
  type: object
  properties:
    name: { type: string }
    count: { type: integer, default: 2 }
  required: [name]
outputs:
  type: object
  properties:
    echo: { type: string }
  required: [echo]
"#;

struct RecordingHandler {
    executed: Arc<AtomicBool>,
    fail_with: Option<&'static str>,
}

impl TaskHandler for RecordingHandler {
    fn task_id(&self) -> &'static str {
        "recording_task"
    }

    fn execute(&self, payload: &Payload, _spec: &TaskSpec) -> Result<Payload, HandlerError> {
        self.executed.store(true, Ordering::SeqCst);
        if let Some(message) = self.fail_with {
            return Err(HandlerError::Failed(message.to_string()));
        }
        let mut result = Payload::new();
        result.insert("echo".to_string(), payload.get("name").cloned().unwrap_or(Value::Null));
        result.insert("count".to_string(), payload.get("count").cloned().unwrap_or(Value::Null));
        Ok(result)
    }
}

fn payload(value: Value) -> Payload {
    value.as_object().cloned().expect("object payload")
}

fn recording_orchestrator(fail_with: Option<&'static str>) -> (Orchestrator, Arc<AtomicBool>) {
    let executed = Arc::new(AtomicBool::new(false));
    let handler: Arc<dyn TaskHandler> = Arc::new(RecordingHandler {
        executed: executed.clone(),
        fail_with,
    });
    let spec: TaskSpec = serde_yaml::from_str(RECORDING_SPEC).expect("spec");
    let handlers = HandlerMap::from([("recording_task".to_string(), handler)]);
    let registry = TaskRegistry::with_handlers(vec![spec], handlers).expect("registry");
    let router = TaskRouter::from_registry(&registry);
    (
        Orchestrator::new(Arc::new(registry), Arc::new(router), LlmHandle::disabled()),
        executed,
    )
}

fn append_spec() -> TaskSpec {
    let path =
        Path::new(env!("CARGO_MANIFEST_DIR")).join("configs/tasks/append_hello_agent_comment.yaml");
    serde_yaml::from_str(&fs::read_to_string(path).expect("read spec")).expect("parse spec")
}

fn append_orchestrator(llm: LlmHandle) -> Orchestrator {
    let registry =
        TaskRegistry::from_specs(vec![append_spec()], &HandlerDeps::with_llm(llm.clone()))
            .expect("registry");
    let router = TaskRouter::from_registry(&registry);
    Orchestrator::new(Arc::new(registry), Arc::new(router), llm)
}

struct CannedAdapter(Result<Value, &'static str>);

impl LlmAdapter for CannedAdapter {
    fn invoke_structured(&self, _prompt: &str, _schema: &OutputSchema) -> Result<Value, LlmError> {
        self.0.clone().map_err(|reason| LlmError::Transport {
            endpoint: "https://llm.invalid".to_string(),
            reason: reason.to_string(),
        })
    }
}

#[test]
fn unknown_task_fails_with_task_not_found() {
    let (orchestrator, executed) = recording_orchestrator(None);

    let state = orchestrator.invoke("nope", Payload::new());
    let response = state.response.expect("response");

    assert_eq!(response.status(), "failed");
    assert_eq!(response.error_code(), Some(ErrorCode::TaskNotFound));
    assert!(response
        .error()
        .expect("error")
        .message
        .contains("Unknown task_id 'nope'. Known tasks: recording_task"));
    assert!(!executed.load(Ordering::SeqCst));
}

#[test]
fn missing_required_field_never_reaches_execute() {
    let (orchestrator, executed) = recording_orchestrator(None);

    let response = orchestrator
        .invoke("recording_task", payload(json!({"count": 1})))
        .response
        .expect("response");

    assert_eq!(response.error_code(), Some(ErrorCode::InvalidPayload));
    assert!(response.error().expect("error").message.contains("name"));
    assert!(!executed.load(Ordering::SeqCst));
}

#[test]
fn undeclared_field_never_reaches_execute() {
    let (orchestrator, executed) = recording_orchestrator(None);

    let response = orchestrator
        .invoke("recording_task", payload(json!({"name": "ada", "extra": true})))
        .response
        .expect("response");

    assert_eq!(response.error_code(), Some(ErrorCode::InvalidPayload));
    assert!(response
        .error()
        .expect("error")
        .message
        .contains("extra fields not permitted"));
    assert!(!executed.load(Ordering::SeqCst));
}

#[test]
fn valid_payload_runs_all_stages_and_flattens_result() {
    let (orchestrator, executed) = recording_orchestrator(None);

    let state = orchestrator.invoke("recording_task", payload(json!({"name": "ada"})));

    assert_eq!(state.plan.as_deref(), Some("Echo the caller's name"));
    assert!(executed.load(Ordering::SeqCst));
    let response = state.response.expect("response");
    assert_eq!(
        response.to_json(),
        json!({"status": "ok", "task_id": "recording_task", "echo": "ada", "count": 2})
    );
}

#[test]
fn handler_error_becomes_execution_error() {
    let (orchestrator, _) = recording_orchestrator(Some("disk full"));

    let response = orchestrator
        .invoke("recording_task", payload(json!({"name": "ada"})))
        .response
        .expect("response");

    assert_eq!(response.error_code(), Some(ErrorCode::ExecutionError));
    assert_eq!(response.error().expect("error").message, "disk full");
}

#[test]
fn registered_task_without_route_is_not_routed() {
    let executed = Arc::new(AtomicBool::new(false));
    let handler: Arc<dyn TaskHandler> = Arc::new(RecordingHandler {
        executed: executed.clone(),
        fail_with: None,
    });
    let spec: TaskSpec = serde_yaml::from_str(RECORDING_SPEC).expect("spec");
    let registry = TaskRegistry::with_handlers(
        vec![spec],
        HandlerMap::from([("recording_task".to_string(), handler)]),
    )
    .expect("registry");
    let orchestrator = Orchestrator::new(
        Arc::new(registry),
        Arc::new(TaskRouter::new(HandlerMap::new())),
        LlmHandle::disabled(),
    );

    let response = orchestrator
        .invoke("recording_task", payload(json!({"name": "ada"})))
        .response
        .expect("response");

    assert_eq!(response.error_code(), Some(ErrorCode::TaskNotRouted));
    assert!(response
        .error()
        .expect("error")
        .message
        .starts_with("No handler for task_id 'recording_task'"));
    assert!(!executed.load(Ordering::SeqCst));
}

#[test]
fn supplied_comment_is_normalized_and_appended_on_its_own_line() {
    let temp = tempfile::tempdir().expect("tempdir");
    let target = temp.path().join("demo.py");
    fs::write(&target, "print('hi')").expect("seed");
    let orchestrator = append_orchestrator(LlmHandle::disabled());

    let response = orchestrator
        .invoke(
            "append_hello_agent_comment",
            payload(json!({
                "target_file": target.display().to_string(),
                "comment_text": "  hello    agent\n  from tests "
            })),
        )
        .response
        .expect("response");

    assert!(response.is_ok());
    let content = fs::read_to_string(&target).expect("read");
    assert_eq!(content, "print('hi')\n# hello agent from tests\n");
    assert_eq!(content.lines().last(), Some("# hello agent from tests"));
    assert_eq!(
        response.result().expect("result").get("appended_text"),
        Some(&json!("# hello agent from tests"))
    );
}

#[test]
fn bootstrap_failure_with_fallback_succeeds_and_reports_llm_error() {
    let temp = tempfile::tempdir().expect("tempdir");
    let target = temp.path().join("demo.py");
    let orchestrator = append_orchestrator(LlmHandle::failed_bootstrap(
        "OPENAI_API_KEY is required when llm_provider=openai",
        true,
    ));

    let response = orchestrator
        .invoke(
            "append_hello_agent_comment",
            payload(json!({"target_file": target.display().to_string()})),
        )
        .response
        .expect("response");

    assert_eq!(response.status(), "ok");
    assert_eq!(
        response.llm_error(),
        Some("OPENAI_API_KEY is required when llm_provider=openai")
    );
    let content = fs::read_to_string(&target).expect("read");
    assert!(content.starts_with("# p4agent fallback: "));
    assert!(content.trim_end().ends_with("(demo.py)"));
}

#[test]
fn bootstrap_failure_without_fallback_fails_before_side_effect() {
    let temp = tempfile::tempdir().expect("tempdir");
    let target = temp.path().join("demo.py");
    let orchestrator = append_orchestrator(LlmHandle::failed_bootstrap(
        "OPENAI_API_KEY is required when llm_provider=openai",
        false,
    ));

    let response = orchestrator
        .invoke(
            "append_hello_agent_comment",
            payload(json!({"target_file": target.display().to_string()})),
        )
        .response
        .expect("response");

    assert_eq!(response.status(), "failed");
    assert_eq!(response.error_code(), Some(ErrorCode::LlmPreprocessFailed));
    assert!(!target.exists());
}

#[test]
fn generated_comment_replaces_fallback() {
    let temp = tempfile::tempdir().expect("tempdir");
    let target = temp.path().join("demo.py");
    let llm = LlmHandle::with_adapter(
        Arc::new(CannedAdapter(Ok(json!({"comment_text": "hello from the model"})))),
        true,
    );

    let response = append_orchestrator(llm)
        .invoke(
            "append_hello_agent_comment",
            payload(json!({"target_file": target.display().to_string()})),
        )
        .response
        .expect("response");

    assert!(response.llm_error().is_none());
    assert_eq!(
        fs::read_to_string(&target).expect("read"),
        "# hello from the model\n"
    );
}

#[test]
fn generation_error_with_fallback_is_advisory() {
    let temp = tempfile::tempdir().expect("tempdir");
    let target = temp.path().join("demo.py");
    let llm = LlmHandle::with_adapter(Arc::new(CannedAdapter(Err("connection refused"))), true);

    let response = append_orchestrator(llm)
        .invoke(
            "append_hello_agent_comment",
            payload(json!({"target_file": target.display().to_string()})),
        )
        .response
        .expect("response");

    assert!(response.is_ok());
    let llm_error = response.llm_error().expect("llm_error");
    assert!(llm_error.starts_with("LLM generation failed: "));
    assert!(llm_error.contains("connection refused"));
    assert!(fs::read_to_string(&target)
        .expect("read")
        .starts_with("# p4agent fallback: "));
}
