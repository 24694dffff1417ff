use crate::news::{
    extract_cards_from_html, CardFetcher, FetchRequest, FetchedCards, ScrapeError,
};
use crate::shared::files::write_text;
use chrono::{SecondsFormat, Utc};
use std::path::Path;
use tracing::{debug, info};

const USER_AGENT: &str = concat!("p4agent/", env!("CARGO_PKG_VERSION"));

/// Blocking HTTP fetcher that parses the returned HTML with
/// [`extract_cards_from_html`].
#[derive(Debug, Clone, Default)]
pub struct HttpCardFetcher;

impl HttpCardFetcher {
    pub fn new() -> Self {
        Self
    }

    fn load_page(&self, request: &FetchRequest) -> Result<String, ScrapeError> {
        let agent = ureq::AgentBuilder::new().timeout(request.timeout).build();
        let response = agent
            .get(&request.url)
            .set("user-agent", USER_AGENT)
            .set("accept", "text/html")
            .call()
            .map_err(|err| match err {
                ureq::Error::Status(status, _) => ScrapeError::Status {
                    url: request.url.clone(),
                    status,
                },
                ureq::Error::Transport(transport) => ScrapeError::Http {
                    url: request.url.clone(),
                    reason: transport.to_string(),
                },
            })?;
        response.into_string().map_err(|err| ScrapeError::Http {
            url: request.url.clone(),
            reason: err.to_string(),
        })
    }
}

/// Writes the page to `<dir>/hacker_news_home_<UTC timestamp>.html`.
pub fn write_html_snapshot(snapshot_dir: &Path, html: &str) -> Result<String, ScrapeError> {
    let timestamp = Utc::now().format("%Y%m%dT%H%M%SZ");
    let path = snapshot_dir.join(format!("hacker_news_home_{timestamp}.html"));
    write_text(&path, html)?;
    Ok(path.display().to_string())
}

impl CardFetcher for HttpCardFetcher {
    fn fetch(&self, request: &FetchRequest) -> Result<FetchedCards, ScrapeError> {
        url::Url::parse(&request.url).map_err(|err| ScrapeError::InvalidUrl {
            url: request.url.clone(),
            reason: err.to_string(),
        })?;
        let html = self.load_page(request)?;
        debug!(url = %request.url, bytes = html.len(), "homepage loaded");

        let raw_cards = extract_cards_from_html(&html, &request.url, request.max_items);
        let raw_html_path = write_html_snapshot(&request.snapshot_dir, &html)?;
        info!(
            url = %request.url,
            cards = raw_cards.len(),
            snapshot = %raw_html_path,
            "homepage cards extracted"
        );

        Ok(FetchedCards {
            fetched_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            source_url: request.url.clone(),
            raw_cards,
            raw_html_path,
        })
    }
}
