use p4agent::handlers::translate_news::Sleeper;
use p4agent::handlers::{HandlerError, TaskHandler, TranslateNewsHandler};
use p4agent::llm::{LlmAdapter, LlmError, LlmHandle, OutputSchema};
use p4agent::tasks::{Payload, TaskSpec};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Replays queued provider results and counts calls.
struct ScriptedAdapter {
    script: Mutex<VecDeque<Result<Value, LlmError>>>,
    calls: Mutex<usize>,
}

impl ScriptedAdapter {
    fn new(script: Vec<Result<Value, LlmError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(0),
        })
    }

    fn calls(&self) -> usize {
        *self.calls.lock().expect("calls lock")
    }
}

impl LlmAdapter for ScriptedAdapter {
    fn invoke_structured(&self, _prompt: &str, _schema: &OutputSchema) -> Result<Value, LlmError> {
        *self.calls.lock().expect("calls lock") += 1;
        self.script
            .lock()
            .expect("script lock")
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::Response("script exhausted".to_string())))
    }
}

fn spec() -> TaskSpec {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("configs/tasks/translate_news_and_render_markdown.yaml");
    serde_yaml::from_str(&fs::read_to_string(path).expect("read spec")).expect("parse spec")
}

fn translated(rank: u32) -> Value {
    json!({
        "rank": rank,
        "title_en": format!("Story {rank}"),
        "summary_en": "English summary",
        "title_zh": "标题",
        "summary_zh": "摘要",
        "title_ja": "タイトル",
        "summary_ja": "要約",
        "source": "Hacker News",
        "url": format!("https://example.com/{rank}")
    })
}

fn payload(output_path: &Path) -> Payload {
    json!({
        "items_en": [
            {"rank": 1, "title_en": "Story 1", "summary_en": "s", "source": "Hacker News", "url": "https://example.com/1"},
            {"rank": 2, "title_en": "Story 2", "summary_en": "s", "source": "Hacker News", "url": "https://example.com/2"}
        ],
        "date": "2026-02-18",
        "timezone": "UTC",
        "output_path": output_path.display().to_string(),
        "translate_batch_size": 3,
        "translate_max_retries": 3,
        "translate_retry_seconds": 1
    })
    .as_object()
    .cloned()
    .expect("object")
}

fn recording_sleeper() -> (Sleeper, Arc<Mutex<Vec<Duration>>>) {
    let sleeps = Arc::new(Mutex::new(Vec::new()));
    let recorded = sleeps.clone();
    let sleeper: Sleeper = Arc::new(move |delay: Duration| {
        recorded.lock().expect("sleeps lock").push(delay);
    });
    (sleeper, sleeps)
}

#[test]
fn timeout_is_retried_and_digest_is_written_in_rank_order() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = temp.path().join("reports/news.md");
    let adapter = ScriptedAdapter::new(vec![
        Err(LlmError::Transport {
            endpoint: "https://llm.invalid".to_string(),
            reason: "request timed out".to_string(),
        }),
        Ok(json!({"items": [translated(2), translated(1)]})),
    ]);
    let (sleeper, sleeps) = recording_sleeper();
    let handler =
        TranslateNewsHandler::with_sleeper(LlmHandle::with_adapter(adapter.clone(), true), sleeper);

    let result = handler
        .execute(&payload(&output), &spec())
        .expect("translate");

    assert_eq!(adapter.calls(), 2);
    assert_eq!(*sleeps.lock().expect("sleeps"), vec![Duration::from_secs(1)]);
    assert_eq!(result.get("item_count"), Some(&json!(2)));
    assert_eq!(result.get("report_date"), Some(&json!("2026-02-18")));
    assert_eq!(
        result.get("output_path"),
        Some(&json!(output.display().to_string()))
    );

    let markdown = fs::read_to_string(&output).expect("read digest");
    let first = markdown.find("## 1. Story 1").expect("rank 1 heading");
    let second = markdown.find("## 2. Story 2").expect("rank 2 heading");
    assert!(first < second);
    assert!(markdown.starts_with("# Daily Hacker News Digest (2026-02-18)\n"));
    let preview = result
        .get("markdown_preview")
        .and_then(Value::as_str)
        .expect("preview");
    assert!(preview.lines().count() <= 12);
    assert!(markdown.starts_with(preview));
}

#[test]
fn non_retryable_status_aborts_whatever_the_endpoint() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = temp.path().join("news.md");
    let adapter = ScriptedAdapter::new(vec![Err(LlmError::Status {
        endpoint: "https://timeout-429.llm.invalid/v1".to_string(),
        status: 401,
        body: "invalid api key".to_string(),
    })]);
    let (sleeper, sleeps) = recording_sleeper();
    let handler =
        TranslateNewsHandler::with_sleeper(LlmHandle::with_adapter(adapter.clone(), true), sleeper);

    let err = handler
        .execute(&payload(&output), &spec())
        .expect_err("must fail");

    assert!(matches!(err, HandlerError::Llm(LlmError::Status { status: 401, .. })));
    assert_eq!(adapter.calls(), 1);
    assert!(sleeps.lock().expect("sleeps").is_empty());
    assert!(!output.exists());
}

#[test]
fn retries_stop_at_configured_attempts() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = temp.path().join("news.md");
    let rate_limited = || -> Result<Value, LlmError> {
        Err(LlmError::Status {
            endpoint: "https://llm.invalid".to_string(),
            status: 429,
            body: "rate limit".to_string(),
        })
    };
    let adapter = ScriptedAdapter::new(vec![rate_limited(), rate_limited(), rate_limited()]);
    let (sleeper, sleeps) = recording_sleeper();
    let handler =
        TranslateNewsHandler::with_sleeper(LlmHandle::with_adapter(adapter.clone(), true), sleeper);

    handler
        .execute(&payload(&output), &spec())
        .expect_err("exhausted retries");

    assert_eq!(adapter.calls(), 3);
    assert_eq!(
        *sleeps.lock().expect("sleeps"),
        vec![Duration::from_secs(1), Duration::from_secs(2)]
    );
}

#[test]
fn disabled_llm_is_required() {
    let temp = tempfile::tempdir().expect("tempdir");
    let handler = TranslateNewsHandler::new(LlmHandle::disabled());

    let err = handler
        .execute(&payload(&temp.path().join("news.md")), &spec())
        .expect_err("must fail");

    assert_eq!(
        err.to_string(),
        "LLM is required for translate_news_and_render_markdown"
    );
}

#[test]
fn zero_batch_size_uses_default_batching() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = temp.path().join("news.md");
    let mut payload = payload(&output);
    payload.insert("translate_batch_size".to_string(), json!(0));
    let adapter = ScriptedAdapter::new(vec![Ok(json!({"items": [translated(1), translated(2)]}))]);
    let handler = TranslateNewsHandler::new(LlmHandle::with_adapter(adapter.clone(), true));

    let result = handler.execute(&payload, &spec()).expect("translate");

    assert_eq!(adapter.calls(), 1);
    assert_eq!(result.get("item_count"), Some(&json!(2)));
}

#[test]
fn negative_batch_size_is_rejected() {
    let temp = tempfile::tempdir().expect("tempdir");
    let mut payload = payload(&temp.path().join("news.md"));
    payload.insert("translate_batch_size".to_string(), json!(-2));
    let handler = TranslateNewsHandler::new(LlmHandle::disabled());

    let err = handler.execute(&payload, &spec()).expect_err("must fail");

    assert_eq!(err.to_string(), "translate_batch_size must be > 0");
}

#[test]
fn two_attempts_recover_from_one_timeout() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = temp.path().join("news.md");
    let mut payload = payload(&output);
    payload.insert("translate_max_retries".to_string(), json!(2));
    let adapter = ScriptedAdapter::new(vec![
        Err(LlmError::Transport {
            endpoint: "https://llm.invalid".to_string(),
            reason: "operation timed out".to_string(),
        }),
        Ok(json!({"items": [translated(1), translated(2)]})),
    ]);
    let (sleeper, sleeps) = recording_sleeper();
    let handler =
        TranslateNewsHandler::with_sleeper(LlmHandle::with_adapter(adapter.clone(), true), sleeper);

    let result = handler.execute(&payload, &spec()).expect("translate");

    assert_eq!(adapter.calls(), 2);
    assert_eq!(*sleeps.lock().expect("sleeps"), vec![Duration::from_secs(1)]);
    assert_eq!(result.get("item_count"), Some(&json!(2)));
    let markdown = fs::read_to_string(&output).expect("read digest");
    assert!(markdown.contains("## 1. Story 1"));
    assert!(markdown.contains("## 2. Story 2"));
}
