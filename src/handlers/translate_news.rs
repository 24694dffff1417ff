use crate::handlers::batching::{run_batched_with_retry, Ranked, RetryPolicy};
use crate::handlers::{optional_str, positive_or_default, value_text, HandlerError, TaskHandler};
use crate::llm::{LlmHandle, NewsItemEn, NewsTranslateChain, TranslatedNewsItem};
use crate::shared::files::write_text;
use crate::tasks::{Payload, TaskSpec};
use chrono::Utc;
use chrono_tz::Tz;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub const TASK_ID: &str = "translate_news_and_render_markdown";
pub const DEFAULT_TIMEZONE: &str = "Asia/Shanghai";
pub const DEFAULT_BATCH_SIZE: u64 = 3;
pub const DEFAULT_MAX_RETRIES: u64 = 3;
pub const DEFAULT_RETRY_SECONDS: u64 = 2;
const PREVIEW_LINES: usize = 12;
const EXPECTED_ITEMS: usize = 10;

pub type Sleeper = Arc<dyn Fn(Duration) + Send + Sync>;

impl Ranked for TranslatedNewsItem {
    fn rank(&self) -> u32 {
        self.rank
    }
}

/// Translates English items into Chinese and Japanese in retried batches and
/// writes the daily markdown digest.
pub struct TranslateNewsHandler {
    llm: LlmHandle,
    sleeper: Sleeper,
}

impl TranslateNewsHandler {
    pub fn new(llm: LlmHandle) -> Self {
        Self::with_sleeper(llm, Arc::new(std::thread::sleep))
    }

    pub fn with_sleeper(llm: LlmHandle, sleeper: Sleeper) -> Self {
        Self { llm, sleeper }
    }
}

/// Today's date in `timezone`, falling back to UTC for unknown zone names.
pub fn today_in_timezone(timezone: &str) -> String {
    let now = Utc::now();
    match timezone.parse::<Tz>() {
        Ok(zone) => now.with_timezone(&zone).format("%Y-%m-%d").to_string(),
        Err(_) => now.format("%Y-%m-%d").to_string(),
    }
}

fn item_rank(value: Option<&Value>, position: usize) -> u32 {
    let parsed = match value {
        Some(Value::Number(number)) => number.as_u64(),
        Some(Value::String(text)) => text.trim().parse::<u64>().ok(),
        _ => None,
    };
    parsed
        .filter(|rank| *rank > 0)
        .and_then(|rank| u32::try_from(rank).ok())
        .unwrap_or_else(|| u32::try_from(position).unwrap_or(u32::MAX))
}

fn coerce_items_en(raw: &[Value]) -> Vec<NewsItemEn> {
    raw.iter()
        .enumerate()
        .filter_map(|(index, value)| value.as_object().map(|item| (index + 1, item)))
        .map(|(position, item)| NewsItemEn {
            rank: item_rank(item.get("rank"), position),
            title_en: value_text(item.get("title_en")),
            summary_en: value_text(item.get("summary_en")),
            source: value_text(item.get("source")),
            url: value_text(item.get("url")),
        })
        .collect()
}

pub fn render_markdown(report_date: &str, timezone: &str, items: &[TranslatedNewsItem]) -> String {
    let mut lines = vec![
        format!("# Daily Hacker News Digest ({report_date})"),
        String::new(),
        format!("- Timezone: `{timezone}`"),
        format!("- Total items: `{}`", items.len()),
        String::new(),
    ];
    if items.len() < EXPECTED_ITEMS {
        lines.push(format!(
            "> Note: only `{}` items were available (< {EXPECTED_ITEMS}).",
            items.len()
        ));
        lines.push(String::new());
    }
    for item in items {
        lines.extend([
            format!("## {}. {}", item.rank, item.title_en),
            String::new(),
            "**English**".to_string(),
            format!("- Title: {}", item.title_en),
            format!("- Summary: {}", item.summary_en),
            String::new(),
            "**Chinese (zh-CN)**".to_string(),
            format!("- Title: {}", item.title_zh),
            format!("- Summary: {}", item.summary_zh),
            String::new(),
            "**Japanese (ja-JP)**".to_string(),
            format!("- Title: {}", item.title_ja),
            format!("- Summary: {}", item.summary_ja),
            String::new(),
            format!("- Source: {}", item.source),
            format!("- URL: {}", item.url),
            String::new(),
        ]);
    }
    let mut markdown = lines.join("\n").trim_end().to_string();
    markdown.push('\n');
    markdown
}

impl TaskHandler for TranslateNewsHandler {
    fn task_id(&self) -> &'static str {
        TASK_ID
    }

    fn execute(&self, payload: &Payload, _spec: &TaskSpec) -> Result<Payload, HandlerError> {
        let raw_items = payload
            .get("items_en")
            .and_then(Value::as_array)
            .ok_or_else(|| HandlerError::InvalidInput("items_en must be an array".to_string()))?;
        let items_en = coerce_items_en(raw_items);
        if items_en.is_empty() {
            return Err(HandlerError::InvalidInput(
                "items_en cannot be empty".to_string(),
            ));
        }

        let timezone = optional_str(payload, "timezone").unwrap_or(DEFAULT_TIMEZONE);
        let report_date = optional_str(payload, "date")
            .map(str::to_string)
            .unwrap_or_else(|| today_in_timezone(timezone));
        let output_path = optional_str(payload, "output_path")
            .map(str::to_string)
            .unwrap_or_else(|| format!("artifacts/news_{report_date}.md"));
        let batch_size = positive_or_default(payload, "translate_batch_size", DEFAULT_BATCH_SIZE)?;
        let max_retries =
            positive_or_default(payload, "translate_max_retries", DEFAULT_MAX_RETRIES)?;
        let retry_seconds =
            positive_or_default(payload, "translate_retry_seconds", DEFAULT_RETRY_SECONDS)?;
        if !self.llm.is_enabled() {
            return Err(HandlerError::LlmRequired { task_id: TASK_ID });
        }
        let adapter = self.llm.require_adapter()?;

        let policy = RetryPolicy {
            batch_size: usize::try_from(batch_size).unwrap_or(usize::MAX),
            max_retries: u32::try_from(max_retries).unwrap_or(u32::MAX),
            retry_delay: Duration::from_secs(retry_seconds),
        };
        let chain = NewsTranslateChain::new(adapter);
        let translated = run_batched_with_retry(
            &items_en,
            &policy,
            |batch| chain.run(batch, &report_date).map(|output| output.items),
            |delay| (self.sleeper)(delay),
        )?;

        let markdown = render_markdown(&report_date, timezone, &translated);
        write_text(Path::new(&output_path), &markdown)?;
        info!(
            task_id = TASK_ID,
            items = translated.len(),
            output_path = %output_path,
            "daily digest written"
        );

        let preview = markdown
            .lines()
            .take(PREVIEW_LINES)
            .collect::<Vec<_>>()
            .join("\n");
        let mut result = Payload::new();
        result.insert("output_path".to_string(), Value::String(output_path));
        result.insert("item_count".to_string(), Value::from(translated.len()));
        result.insert("markdown_preview".to_string(), Value::String(preview));
        result.insert("report_date".to_string(), Value::String(report_date));
        Ok(result)
    }
}
