use crate::handlers::{positive_or_default, value_text, HandlerError, TaskHandler};
use crate::llm::{ExtractedNewsItem, LlmHandle, NewsExtractChain, NewsItemEn};
use crate::news::RawCard;
use crate::tasks::{Payload, TaskSpec};
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::info;

pub const TASK_ID: &str = "extract_top10_en_news";
pub const DEFAULT_TOP_K: u64 = 10;

/// Asks the LLM for the top English stories among the raw cards.
pub struct ExtractTopNewsHandler {
    llm: LlmHandle,
}

impl ExtractTopNewsHandler {
    pub fn new(llm: LlmHandle) -> Self {
        Self { llm }
    }
}

/// Non-object entries are skipped; missing fields become empty strings.
fn coerce_raw_cards(raw_cards: &[Value]) -> Vec<RawCard> {
    raw_cards
        .iter()
        .filter_map(Value::as_object)
        .map(|card| RawCard {
            title: value_text(card.get("title")),
            url: value_text(card.get("url")),
            snippet: value_text(card.get("snippet")),
            source: value_text(card.get("source")),
        })
        .collect()
}

/// Drops repeated `(url, title)` pairs (case-insensitive, first wins) and
/// renumbers ranks from 1, keeping at most `top_k` items.
pub fn dedupe_and_rank(items: Vec<ExtractedNewsItem>, top_k: usize) -> Vec<NewsItemEn> {
    let mut seen = BTreeSet::new();
    let mut deduped = Vec::new();
    for item in items {
        if deduped.len() >= top_k {
            break;
        }
        let url = item.url.trim().to_string();
        let title = item.title_en.trim().to_string();
        if url.is_empty() && title.is_empty() {
            continue;
        }
        let key = format!("{}::{}", url.to_lowercase(), title.to_lowercase());
        if !seen.insert(key) {
            continue;
        }
        deduped.push(NewsItemEn {
            rank: u32::try_from(deduped.len() + 1).unwrap_or(u32::MAX),
            title_en: title,
            summary_en: item.summary_en.trim().to_string(),
            source: item.source.trim().to_string(),
            url,
        });
    }
    deduped
}

impl TaskHandler for ExtractTopNewsHandler {
    fn task_id(&self) -> &'static str {
        TASK_ID
    }

    fn execute(&self, payload: &Payload, _spec: &TaskSpec) -> Result<Payload, HandlerError> {
        let raw_cards = payload
            .get("raw_cards")
            .and_then(Value::as_array)
            .ok_or_else(|| HandlerError::InvalidInput("raw_cards must be an array".to_string()))?;
        let top_k = positive_or_default(payload, "top_k", DEFAULT_TOP_K)?;
        let top_k = usize::try_from(top_k)
            .map_err(|_| HandlerError::InvalidInput("top_k is too large".to_string()))?;
        if !self.llm.is_enabled() {
            return Err(HandlerError::LlmRequired { task_id: TASK_ID });
        }
        let adapter = self.llm.require_adapter()?;

        let cards = coerce_raw_cards(raw_cards);
        let output = NewsExtractChain::new(adapter).run(&cards, top_k)?;
        let items_en = dedupe_and_rank(output.items_en, top_k);
        info!(
            task_id = TASK_ID,
            cards = cards.len(),
            selected = items_en.len(),
            "top news extracted"
        );

        let mut result = Payload::new();
        result.insert(
            "items_en".to_string(),
            serde_json::to_value(&items_en).map_err(|err| HandlerError::Failed(err.to_string()))?,
        );
        result.insert(
            "selection_notes".to_string(),
            output
                .selection_notes
                .map(Value::String)
                .unwrap_or(Value::Null),
        );
        Ok(result)
    }
}
