use crate::llm::prompt_render::render_prompt;
use crate::llm::schema::{CommentNormOutput, NewsExtractOutput, NewsItemEn, NewsTranslateOutput};
use crate::llm::{invoke_typed, LlmAdapter, LlmError};
use crate::news::RawCard;
use std::collections::BTreeMap;

const COMMENT_NORM_TEMPLATE: &str = include_str!("prompts/comment_norm.prompt.md");
const NEWS_EXTRACT_TEMPLATE: &str = include_str!("prompts/news_extract.prompt.md");
const NEWS_TRANSLATE_TEMPLATE: &str = include_str!("prompts/news_translate.prompt.md");

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, LlmError> {
    serde_json::to_string(value).map_err(|err| LlmError::Prompt(err.to_string()))
}

pub struct CommentNormChain<'a> {
    adapter: &'a dyn LlmAdapter,
}

impl<'a> CommentNormChain<'a> {
    pub fn new(adapter: &'a dyn LlmAdapter) -> Self {
        Self { adapter }
    }

    pub fn run(&self, task_goal: &str, target_file: &str) -> Result<CommentNormOutput, LlmError> {
        let vars = BTreeMap::from([
            ("task_goal", task_goal.to_string()),
            ("target_file", target_file.to_string()),
        ]);
        let prompt = render_prompt(COMMENT_NORM_TEMPLATE, &vars)?;
        invoke_typed(self.adapter, &prompt)
    }
}

pub struct NewsExtractChain<'a> {
    adapter: &'a dyn LlmAdapter,
}

impl<'a> NewsExtractChain<'a> {
    pub fn new(adapter: &'a dyn LlmAdapter) -> Self {
        Self { adapter }
    }

    pub fn run(&self, raw_cards: &[RawCard], top_k: usize) -> Result<NewsExtractOutput, LlmError> {
        let vars = BTreeMap::from([
            ("raw_cards_json", to_json(raw_cards)?),
            ("top_k", top_k.to_string()),
        ]);
        let prompt = render_prompt(NEWS_EXTRACT_TEMPLATE, &vars)?;
        invoke_typed(self.adapter, &prompt)
    }
}

pub struct NewsTranslateChain<'a> {
    adapter: &'a dyn LlmAdapter,
}

impl<'a> NewsTranslateChain<'a> {
    pub fn new(adapter: &'a dyn LlmAdapter) -> Self {
        Self { adapter }
    }

    pub fn run(
        &self,
        items_en: &[NewsItemEn],
        date: &str,
    ) -> Result<NewsTranslateOutput, LlmError> {
        let vars = BTreeMap::from([
            ("items_en_json", to_json(items_en)?),
            ("date", date.to_string()),
        ]);
        let prompt = render_prompt(NEWS_TRANSLATE_TEMPLATE, &vars)?;
        invoke_typed(self.adapter, &prompt)
    }
}
