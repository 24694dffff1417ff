use p4agent::handlers::{HandlerDeps, HandlerError, TaskHandler};
use p4agent::tasks::{HandlerMap, Payload, RegistryError, TaskRegistry, TaskSpec};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn bundled_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("configs/tasks")
}

fn spec_yaml(task_id: &str, handler: &str) -> String {
    format!(
        r#"id: {task_id}
handler: {handler}
goal: Do the thing
inputs:
  type: object
  properties:
    target_file: {{ type: string }}
  required: [target_file]
outputs:
  type: object
  properties:
    changed_file: {{ type: string }}
  required: [changed_file]
"#
    )
}

fn write(dir: &Path, name: &str, body: &str) {
    fs::write(dir.join(name), body).expect("write task file");
}

struct NamedHandler(&'static str);

impl TaskHandler for NamedHandler {
    fn task_id(&self) -> &'static str {
        self.0
    }

    fn execute(&self, _payload: &Payload, _spec: &TaskSpec) -> Result<Payload, HandlerError> {
        Ok(Payload::new())
    }
}

#[test]
fn bundled_definitions_load_with_bound_handlers() {
    let registry = TaskRegistry::load(&bundled_dir(), &HandlerDeps::default()).expect("load");

    assert_eq!(registry.list_ids().len(), 5);
    for task_id in registry.list_ids() {
        let handler = registry.get_handler(&task_id).expect("handler");
        assert_eq!(handler.task_id(), task_id);
    }
    let spec = registry.get("translate_news_and_render_markdown").expect("spec");
    assert_eq!(spec.handler.as_str(), "translate_news");
    assert_eq!(spec.constraints.max_attempts, 1);
}

#[test]
fn non_yaml_files_are_ignored() {
    let temp = tempfile::tempdir().expect("tempdir");
    write(temp.path(), "a.yaml", &spec_yaml("append_hello_agent_comment", "append_comment"));
    write(temp.path(), "README.md", "not a task");

    let registry = TaskRegistry::load(temp.path(), &HandlerDeps::default()).expect("load");

    assert_eq!(registry.list_ids(), vec!["append_hello_agent_comment"]);
}

#[test]
fn duplicate_ids_name_both_files() {
    let temp = tempfile::tempdir().expect("tempdir");
    let body = spec_yaml("append_hello_agent_comment", "append_comment");
    write(temp.path(), "a.yaml", &body);
    write(temp.path(), "b.yaml", &body);

    let err = TaskRegistry::load(temp.path(), &HandlerDeps::default()).expect_err("duplicate");

    match err {
        RegistryError::DuplicateTaskId {
            task_id,
            first,
            second,
        } => {
            assert_eq!(task_id, "append_hello_agent_comment");
            assert!(first.ends_with("a.yaml"));
            assert!(second.ends_with("b.yaml"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn unknown_handler_key_lists_known_keys() {
    let temp = tempfile::tempdir().expect("tempdir");
    write(temp.path(), "a.yaml", &spec_yaml("custom_task", "shell_exec"));

    let err = TaskRegistry::load(temp.path(), &HandlerDeps::default()).expect_err("unknown");

    assert_eq!(
        err.to_string(),
        "Unknown handler 'shell_exec' for task_id 'custom_task'. Known handlers: \
         append_comment, fetch_homepage, extract_top_news, translate_news, daily_report"
    );
}

#[test]
fn handler_bound_to_wrong_task_is_rejected() {
    let temp = tempfile::tempdir().expect("tempdir");
    write(temp.path(), "a.yaml", &spec_yaml("renamed_task", "append_comment"));

    let err = TaskRegistry::load(temp.path(), &HandlerDeps::default()).expect_err("mismatch");

    assert_eq!(
        err.to_string(),
        "Handler 'append_comment' has task_id 'append_hello_agent_comment', expected 'renamed_task'."
    );
}

#[test]
fn pipeline_without_its_steps_is_rejected() {
    let temp = tempfile::tempdir().expect("tempdir");
    let pipeline = fs::read_to_string(bundled_dir().join("daily_google_news_report_pipeline.yaml"))
        .expect("read pipeline");
    write(temp.path(), "pipeline.yaml", &pipeline);

    let err = TaskRegistry::load(temp.path(), &HandlerDeps::default()).expect_err("missing");

    assert!(matches!(
        err,
        RegistryError::MissingDependency { ref dependency, .. }
            if dependency == "fetch_google_news_homepage"
    ));
}

#[test]
fn malformed_yaml_reports_file() {
    let temp = tempfile::tempdir().expect("tempdir");
    write(temp.path(), "broken.yaml", "id: [unterminated");

    let err = TaskRegistry::load(temp.path(), &HandlerDeps::default()).expect_err("parse");

    assert!(matches!(err, RegistryError::Parse { ref path, .. } if path.ends_with("broken.yaml")));
}

#[test]
fn semantically_invalid_spec_is_rejected() {
    let temp = tempfile::tempdir().expect("tempdir");
    let body = spec_yaml("append_hello_agent_comment", "append_comment")
        .replace("goal: Do the thing", "goal: \"  \"");
    write(temp.path(), "a.yaml", &body);

    let err = TaskRegistry::load(temp.path(), &HandlerDeps::default()).expect_err("invalid");

    assert!(err.to_string().contains("`goal` must be non-empty"));
}

#[test]
fn missing_directory_is_a_read_error() {
    let temp = tempfile::tempdir().expect("tempdir");

    let err = TaskRegistry::load(&temp.path().join("absent"), &HandlerDeps::default())
        .expect_err("missing dir");

    assert!(matches!(err, RegistryError::ReadDir { .. }));
}

#[test]
fn lookup_of_unknown_id_lists_known_tasks() {
    let registry = TaskRegistry::load(&bundled_dir(), &HandlerDeps::default()).expect("load");

    let err = registry.get("nope").expect_err("unknown");

    assert!(err.to_string().starts_with(
        "Unknown task_id 'nope'. Known tasks: append_hello_agent_comment, daily_google_news_report_pipeline"
    ));
}

#[test]
fn injected_handlers_must_cover_and_match_specs() {
    let spec: TaskSpec = serde_yaml::from_str(&spec_yaml("custom_task", "custom")).expect("spec");

    let err = TaskRegistry::with_handlers(vec![spec.clone()], HandlerMap::new())
        .expect_err("no handler");
    assert!(matches!(err, RegistryError::UnknownHandler { .. }));

    let wrong: Arc<dyn TaskHandler> = Arc::new(NamedHandler("other_task"));
    let err = TaskRegistry::with_handlers(
        vec![spec.clone()],
        HandlerMap::from([("custom_task".to_string(), wrong)]),
    )
    .expect_err("mismatch");
    assert!(matches!(err, RegistryError::HandlerTaskMismatch { .. }));

    let right: Arc<dyn TaskHandler> = Arc::new(NamedHandler("custom_task"));
    let registry = TaskRegistry::with_handlers(
        vec![spec],
        HandlerMap::from([("custom_task".to_string(), right)]),
    )
    .expect("registry");
    assert_eq!(registry.list_ids(), vec!["custom_task"]);
}
