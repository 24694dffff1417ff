use crate::handlers::{optional_str, positive_or_default, HandlerError, TaskHandler};
use crate::news::{CardFetcher, FetchRequest, DEFAULT_NEWS_URL};
use crate::tasks::{Payload, TaskSpec};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub const TASK_ID: &str = "fetch_google_news_homepage";
pub const DEFAULT_MAX_ITEMS: u64 = 10;
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_SNAPSHOT_DIR: &str = "artifacts/news_raw";

pub struct FetchHomepageHandler {
    fetcher: Arc<dyn CardFetcher>,
}

impl FetchHomepageHandler {
    pub fn new(fetcher: Arc<dyn CardFetcher>) -> Self {
        Self { fetcher }
    }

    fn request(payload: &Payload) -> Result<FetchRequest, HandlerError> {
        let max_items = positive_or_default(payload, "max_items", DEFAULT_MAX_ITEMS)?;
        let timeout_ms = positive_or_default(payload, "timeout_ms", DEFAULT_TIMEOUT_MS)?;
        Ok(FetchRequest {
            url: optional_str(payload, "url")
                .unwrap_or(DEFAULT_NEWS_URL)
                .to_string(),
            max_items: usize::try_from(max_items)
                .map_err(|_| HandlerError::InvalidInput("max_items is too large".to_string()))?,
            timeout: Duration::from_millis(timeout_ms),
            snapshot_dir: PathBuf::from(
                optional_str(payload, "snapshot_dir").unwrap_or(DEFAULT_SNAPSHOT_DIR),
            ),
        })
    }
}

impl TaskHandler for FetchHomepageHandler {
    fn task_id(&self) -> &'static str {
        TASK_ID
    }

    fn execute(&self, payload: &Payload, _spec: &TaskSpec) -> Result<Payload, HandlerError> {
        let request = Self::request(payload)?;
        let fetched = self.fetcher.fetch(&request)?;
        match serde_json::to_value(fetched) {
            Ok(Value::Object(result)) => Ok(result),
            Ok(_) => Err(HandlerError::Failed(
                "fetch result did not serialize to an object".to_string(),
            )),
            Err(err) => Err(HandlerError::Failed(err.to_string())),
        }
    }
}
