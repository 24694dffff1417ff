//! Homepage card scraping for the news pipeline.

use crate::shared::files::FileToolError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub mod html;
pub mod http;

pub use html::extract_cards_from_html;
pub use http::HttpCardFetcher;

pub const DEFAULT_NEWS_URL: &str = "https://news.ycombinator.com/";
pub const HACKER_NEWS_SOURCE: &str = "Hacker News";

/// One story card scraped from a homepage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCard {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub max_items: usize,
    pub timeout: Duration,
    pub snapshot_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchedCards {
    pub fetched_at: String,
    pub source_url: String,
    pub raw_cards: Vec<RawCard>,
    pub raw_html_path: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("failed to fetch {url}: {reason}")]
    Http { url: String, reason: String },
    #[error("fetching {url} returned status {status}")]
    Status { url: String, status: u16 },
    #[error("invalid page url `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error(transparent)]
    Snapshot(#[from] FileToolError),
}

/// Loads a page and turns it into cards plus an on-disk HTML snapshot.
pub trait CardFetcher: Send + Sync {
    fn fetch(&self, request: &FetchRequest) -> Result<FetchedCards, ScrapeError>;
}
