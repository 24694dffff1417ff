use crate::llm::{OutputSchema, StructuredOutput};
use serde::{Deserialize, Serialize};
use serde_json::json;

const MAX_COMMENT_CHARS: usize = 200;

fn require_non_empty(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("`{field}` must be non-empty"));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentNormOutput {
    pub comment_text: String,
}

impl StructuredOutput for CommentNormOutput {
    fn output_schema() -> OutputSchema {
        OutputSchema {
            name: "comment_norm_output",
            description: "A single source-code comment line",
            json_schema: json!({
                "type": "object",
                "properties": {
                    "comment_text": {"type": "string", "minLength": 1, "maxLength": MAX_COMMENT_CHARS}
                },
                "required": ["comment_text"],
                "additionalProperties": false
            }),
        }
    }

    fn validate(&self) -> Result<(), String> {
        require_non_empty("comment_text", &self.comment_text)?;
        if self.comment_text.chars().count() > MAX_COMMENT_CHARS {
            return Err(format!(
                "`comment_text` must be at most {MAX_COMMENT_CHARS} characters"
            ));
        }
        Ok(())
    }
}

/// English news item as handed to translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItemEn {
    pub rank: u32,
    pub title_en: String,
    pub summary_en: String,
    #[serde(default)]
    pub source: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedNewsItem {
    pub rank: u32,
    pub title_en: String,
    pub summary_en: String,
    #[serde(default)]
    pub source: String,
    pub url: String,
}

impl ExtractedNewsItem {
    fn validate(&self) -> Result<(), String> {
        if self.rank < 1 {
            return Err("`rank` must be >= 1".to_string());
        }
        require_non_empty("title_en", &self.title_en)?;
        require_non_empty("summary_en", &self.summary_en)?;
        require_non_empty("url", &self.url)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsExtractOutput {
    pub items_en: Vec<ExtractedNewsItem>,
    #[serde(default)]
    pub selection_notes: Option<String>,
}

impl StructuredOutput for NewsExtractOutput {
    fn output_schema() -> OutputSchema {
        OutputSchema {
            name: "news_extract_output",
            description: "Top English news items selected from raw homepage cards",
            json_schema: json!({
                "type": "object",
                "properties": {
                    "items_en": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "rank": {"type": "integer", "minimum": 1},
                                "title_en": {"type": "string", "minLength": 1},
                                "summary_en": {"type": "string", "minLength": 1},
                                "source": {"type": "string"},
                                "url": {"type": "string", "minLength": 1}
                            },
                            "required": ["rank", "title_en", "summary_en", "url"]
                        }
                    },
                    "selection_notes": {"type": ["string", "null"]}
                },
                "required": ["items_en"]
            }),
        }
    }

    fn validate(&self) -> Result<(), String> {
        for (index, item) in self.items_en.iter().enumerate() {
            item.validate()
                .map_err(|reason| format!("items_en[{index}]: {reason}"))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslatedNewsItem {
    pub rank: u32,
    pub title_en: String,
    pub summary_en: String,
    pub title_zh: String,
    pub summary_zh: String,
    pub title_ja: String,
    pub summary_ja: String,
    #[serde(default)]
    pub source: String,
    pub url: String,
}

impl TranslatedNewsItem {
    fn validate(&self) -> Result<(), String> {
        if self.rank < 1 {
            return Err("`rank` must be >= 1".to_string());
        }
        for (field, value) in [
            ("title_en", &self.title_en),
            ("summary_en", &self.summary_en),
            ("title_zh", &self.title_zh),
            ("summary_zh", &self.summary_zh),
            ("title_ja", &self.title_ja),
            ("summary_ja", &self.summary_ja),
            ("url", &self.url),
        ] {
            require_non_empty(field, value)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsTranslateOutput {
    pub items: Vec<TranslatedNewsItem>,
}

impl StructuredOutput for NewsTranslateOutput {
    fn output_schema() -> OutputSchema {
        let text = json!({"type": "string", "minLength": 1});
        OutputSchema {
            name: "news_translate_output",
            description: "News items with Chinese and Japanese translations",
            json_schema: json!({
                "type": "object",
                "properties": {
                    "items": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "rank": {"type": "integer", "minimum": 1},
                                "title_en": text,
                                "summary_en": text,
                                "title_zh": text,
                                "summary_zh": text,
                                "title_ja": text,
                                "summary_ja": text,
                                "source": {"type": "string"},
                                "url": text
                            },
                            "required": [
                                "rank", "title_en", "summary_en", "title_zh",
                                "summary_zh", "title_ja", "summary_ja", "url"
                            ]
                        }
                    }
                },
                "required": ["items"]
            }),
        }
    }

    fn validate(&self) -> Result<(), String> {
        for (index, item) in self.items.iter().enumerate() {
            item.validate()
                .map_err(|reason| format!("items[{index}]: {reason}"))?;
        }
        Ok(())
    }
}
