use crate::news::{RawCard, HACKER_NEWS_SOURCE};
use regex::Regex;
use std::sync::OnceLock;
use url::Url;

fn titleline_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)<span\s+class="titleline"[^>]*>\s*<a\s[^>]*?href="([^"]*)"[^>]*>(.*?)</a>"#)
            .expect("valid titleline regex")
    })
}

fn score_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)<span\s+class="score"[^>]*>(.*?)</span>"#)
            .expect("valid score regex")
    })
}

fn anchor_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?is)<a\s[^>]*?href\s*=\s*["']([^"']*)["'][^>]*>(.*?)</a>"#)
            .expect("valid anchor regex")
    })
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<[^>]*>").expect("valid tag regex"))
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

fn inner_text(fragment: &str) -> String {
    let stripped = tag_re().replace_all(fragment, " ");
    decode_entities(&stripped)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn resolve_href(base: Option<&Url>, href: &str) -> String {
    let href = decode_entities(href.trim());
    base.and_then(|base| base.join(&href).ok())
        .map(|url| url.to_string())
        .unwrap_or(href)
}

/// Extracts story cards from homepage HTML.
///
/// Hacker News rows (`span.titleline > a` with the following `.score`) are
/// preferred; pages without them fall back to every non-empty anchor.
pub fn extract_cards_from_html(html: &str, source_url: &str, max_items: usize) -> Vec<RawCard> {
    if max_items == 0 {
        return Vec::new();
    }
    let base = Url::parse(source_url).ok();
    let cards = extract_titleline_cards(html, base.as_ref(), max_items);
    if !cards.is_empty() {
        return cards;
    }
    extract_anchor_cards(html, base.as_ref(), max_items)
}

fn extract_titleline_cards(html: &str, base: Option<&Url>, max_items: usize) -> Vec<RawCard> {
    let matches: Vec<_> = titleline_re().captures_iter(html).collect();
    let mut cards = Vec::new();
    for (index, captures) in matches.iter().enumerate() {
        let (Some(whole), Some(href), Some(title)) =
            (captures.get(0), captures.get(1), captures.get(2))
        else {
            continue;
        };
        let title = inner_text(title.as_str());
        if title.is_empty() || href.as_str().trim().is_empty() {
            continue;
        }
        let row_end = matches
            .get(index + 1)
            .and_then(|next| next.get(0))
            .map(|next| next.start())
            .unwrap_or(html.len());
        let snippet = score_re()
            .captures(&html[whole.end()..row_end])
            .and_then(|score| score.get(1))
            .map(|score| inner_text(score.as_str()))
            .unwrap_or_default();

        cards.push(RawCard {
            title,
            url: resolve_href(base, href.as_str()),
            snippet,
            source: HACKER_NEWS_SOURCE.to_string(),
        });
        if cards.len() >= max_items {
            break;
        }
    }
    cards
}

fn extract_anchor_cards(html: &str, base: Option<&Url>, max_items: usize) -> Vec<RawCard> {
    let mut cards = Vec::new();
    for captures in anchor_re().captures_iter(html) {
        let (Some(href), Some(title)) = (captures.get(1), captures.get(2)) else {
            continue;
        };
        let title = inner_text(title.as_str());
        if title.is_empty() || href.as_str().trim().is_empty() {
            continue;
        }
        cards.push(RawCard {
            title,
            url: resolve_href(base, href.as_str()),
            snippet: String::new(),
            source: HACKER_NEWS_SOURCE.to_string(),
        });
        if cards.len() >= max_items {
            break;
        }
    }
    cards
}
