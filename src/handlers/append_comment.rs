use crate::handlers::{optional_str, HandlerError, LlmContext, LlmPreprocessOutcome, TaskHandler};
use crate::llm::CommentNormChain;
use crate::shared::files::append_text;
use crate::tasks::{Payload, TaskSpec};
use serde_json::Value;
use std::path::Path;
use tracing::debug;

pub const TASK_ID: &str = "append_hello_agent_comment";

/// Appends a one-line `#` comment to `target_file`, generated by the LLM
/// when available and built from the task goal otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppendCommentHandler;

impl AppendCommentHandler {
    pub fn new() -> Self {
        Self
    }
}

/// Collapses whitespace and forces a single `# ` prefix.
pub fn normalize_comment_line(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if !collapsed.starts_with('#') {
        format!("# {collapsed}")
    } else if !collapsed.starts_with("# ") {
        format!("# {}", collapsed.trim_start_matches('#').trim())
    } else {
        collapsed
    }
}

pub fn fallback_comment(task_goal: &str, target_file: &str) -> String {
    let filename = Path::new(target_file)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let goal = task_goal.split_whitespace().collect::<Vec<_>>().join(" ");
    normalize_comment_line(&format!("# p4agent fallback: {goal} ({filename})"))
}

fn target_file(payload: &Payload) -> Result<&str, HandlerError> {
    optional_str(payload, "target_file").ok_or_else(|| {
        HandlerError::InvalidInput("target_file must be a non-empty string".to_string())
    })
}

impl TaskHandler for AppendCommentHandler {
    fn task_id(&self) -> &'static str {
        TASK_ID
    }

    fn requires_llm(&self) -> bool {
        true
    }

    fn preprocess_with_llm(
        &self,
        payload: Payload,
        spec: &TaskSpec,
        llm: LlmContext<'_>,
    ) -> LlmPreprocessOutcome {
        if !llm.enabled {
            return LlmPreprocessOutcome::unchanged(payload);
        }
        let Some(adapter) = llm.adapter else {
            let message = llm
                .bootstrap_error
                .unwrap_or("LLM chain was not initialized")
                .to_string();
            return LlmPreprocessOutcome::degraded(payload, message, llm.fallback_to_rules);
        };

        let generated = target_file(&payload)
            .map_err(|err| err.to_string())
            .and_then(|file| {
                CommentNormChain::new(adapter)
                    .run(&spec.goal, file)
                    .map_err(|err| err.to_string())
            });
        match generated {
            Ok(output) => {
                debug!(task_id = TASK_ID, "comment generated by llm");
                let mut next = payload;
                next.insert("comment_text".to_string(), Value::String(output.comment_text));
                LlmPreprocessOutcome::unchanged(next)
            }
            Err(err) => LlmPreprocessOutcome::degraded(
                payload,
                format!("LLM generation failed: {err}"),
                llm.fallback_to_rules,
            ),
        }
    }

    fn execute(&self, payload: &Payload, spec: &TaskSpec) -> Result<Payload, HandlerError> {
        let file = target_file(payload)?;
        let comment = match optional_str(payload, "comment_text") {
            Some(text) => normalize_comment_line(text),
            None => fallback_comment(&spec.goal, file),
        };
        let outcome = append_text(Path::new(file), &comment)?;

        let mut result = Payload::new();
        result.insert(
            "changed_file".to_string(),
            Value::String(outcome.changed_file),
        );
        result.insert(
            "appended_text".to_string(),
            Value::String(outcome.appended_text),
        );
        Ok(result)
    }
}
