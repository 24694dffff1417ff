use crate::handlers::{HandlerError, TaskHandler};
use crate::tasks::{Payload, TaskSpec};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

pub const TASK_ID: &str = "daily_google_news_report_pipeline";
const DEFAULT_TOP_K: u64 = 10;

const FETCH_KEYS: &[&str] = &["url", "max_items", "timeout_ms", "snapshot_dir"];
const TRANSLATE_KEYS: &[&str] = &[
    "date",
    "timezone",
    "output_path",
    "translate_batch_size",
    "translate_max_retries",
    "translate_retry_seconds",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Ok,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub name: String,
    pub status: StepStatus,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One sub-task of the pipeline: its handler and the spec its payload is
/// validated against.
#[derive(Clone)]
pub struct PipelineStep {
    handler: Arc<dyn TaskHandler>,
    spec: Arc<TaskSpec>,
}

impl PipelineStep {
    pub fn new(handler: Arc<dyn TaskHandler>, spec: Arc<TaskSpec>) -> Self {
        Self { handler, spec }
    }

    pub fn name(&self) -> &str {
        self.spec.id.as_str()
    }

    fn run(&self, payload: &Payload) -> Result<Payload, HandlerError> {
        let validated = self.handler.validate_payload(payload, &self.spec)?;
        self.handler.execute(&validated, &self.spec)
    }
}

/// Fetch, extract and translate chained into one report.
pub struct DailyReportHandler {
    fetch: PipelineStep,
    extract: PipelineStep,
    translate: PipelineStep,
}

impl DailyReportHandler {
    pub fn new(fetch: PipelineStep, extract: PipelineStep, translate: PipelineStep) -> Self {
        Self {
            fetch,
            extract,
            translate,
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Times `step`, records the outcome, and wraps a failure with the step name
/// and the records gathered so far.
fn run_step(
    step: &PipelineStep,
    payload: &Payload,
    steps: &mut Vec<StepRecord>,
) -> Result<Payload, HandlerError> {
    let started = Instant::now();
    match step.run(payload) {
        Ok(result) => {
            steps.push(StepRecord {
                name: step.name().to_string(),
                status: StepStatus::Ok,
                duration_ms: elapsed_ms(started),
                error: None,
            });
            Ok(result)
        }
        Err(err) => {
            let reason = err.to_string();
            warn!(step = step.name(), error = %reason, "pipeline step failed");
            steps.push(StepRecord {
                name: step.name().to_string(),
                status: StepStatus::Failed,
                duration_ms: elapsed_ms(started),
                error: Some(reason.clone()),
            });
            Err(HandlerError::StepFailed {
                step: step.name().to_string(),
                reason,
                steps: steps.clone(),
            })
        }
    }
}

/// Copies `keys` from `source`, leaving out absent and null values.
fn pass_through(source: &Payload, keys: &[&str]) -> Payload {
    keys.iter()
        .filter_map(|key| match source.get(*key) {
            None | Some(Value::Null) => None,
            Some(value) => Some((key.to_string(), value.clone())),
        })
        .collect()
}

fn take_field(
    result: &mut Payload,
    step: &PipelineStep,
    field: &'static str,
) -> Result<Value, HandlerError> {
    result
        .remove(field)
        .ok_or_else(|| HandlerError::MissingStepOutput {
            step: step.name().to_string(),
            field,
        })
}

impl TaskHandler for DailyReportHandler {
    fn task_id(&self) -> &'static str {
        TASK_ID
    }

    fn execute(&self, payload: &Payload, _spec: &TaskSpec) -> Result<Payload, HandlerError> {
        let mut steps = Vec::with_capacity(3);

        let mut fetched = run_step(&self.fetch, &pass_through(payload, FETCH_KEYS), &mut steps)?;

        let mut extract_payload = Payload::new();
        extract_payload.insert(
            "raw_cards".to_string(),
            take_field(&mut fetched, &self.fetch, "raw_cards")?,
        );
        let top_k = match payload.get("max_items") {
            None | Some(Value::Null) => Value::from(DEFAULT_TOP_K),
            Some(value) => value.clone(),
        };
        extract_payload.insert("top_k".to_string(), top_k);
        let mut extracted = run_step(&self.extract, &extract_payload, &mut steps)?;

        let mut translate_payload = pass_through(payload, TRANSLATE_KEYS);
        translate_payload.insert(
            "items_en".to_string(),
            take_field(&mut extracted, &self.extract, "items_en")?,
        );
        let mut translated = run_step(&self.translate, &translate_payload, &mut steps)?;

        info!(
            task_id = TASK_ID,
            steps = steps.len(),
            "daily report pipeline finished"
        );

        let mut result = Payload::new();
        result.insert(
            "report_markdown_path".to_string(),
            take_field(&mut translated, &self.translate, "output_path")?,
        );
        result.insert(
            "report_date".to_string(),
            take_field(&mut translated, &self.translate, "report_date")?,
        );
        result.insert(
            "item_count".to_string(),
            take_field(&mut translated, &self.translate, "item_count")?,
        );
        result.insert(
            "steps".to_string(),
            serde_json::to_value(&steps).map_err(|err| HandlerError::Failed(err.to_string()))?,
        );
        result.insert(
            "source_url".to_string(),
            take_field(&mut fetched, &self.fetch, "source_url")?,
        );
        result.insert(
            "selection_notes".to_string(),
            extracted.remove("selection_notes").unwrap_or(Value::Null),
        );
        result.insert(
            "markdown_preview".to_string(),
            take_field(&mut translated, &self.translate, "markdown_preview")?,
        );
        Ok(result)
    }
}
