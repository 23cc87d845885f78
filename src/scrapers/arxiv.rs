//! arXiv cs.AI announcements via the RSS feed.
//!
//! Descriptions in the arXiv feed carry a header
//! (`arXiv:2510.00001v1 Announce Type: new Abstract: ...`); only the abstract
//! is kept as the summary.

use crate::error::FetchError;
use crate::feeds::{entries_to_items, parse_feed};
use crate::http::HttpClient;
use crate::models::{Item, SourceId};
use crate::utils::SUMMARY_MAX_CHARS;
use chrono::{DateTime, Utc};
use tracing::{info, instrument};

pub const FEED_URL: &str = "http://export.arxiv.org/rss/cs.AI";
pub const ITEM_CAP: usize = 20;

#[instrument(level = "info", skip_all)]
pub async fn fetch(http: &HttpClient, now: DateTime<Utc>) -> Result<Vec<Item>, FetchError> {
    let body = http.get_text(FEED_URL).await?;
    let items = parse(&body, now)?;
    info!(count = items.len(), source = FEED_URL, "Parsed arXiv papers");
    Ok(items)
}

/// Parse an arXiv feed body into items.
pub fn parse(body: &str, now: DateTime<Utc>) -> Result<Vec<Item>, FetchError> {
    let mut entries = parse_feed(body)?;
    for entry in &mut entries {
        if let Some((_, abstract_text)) = entry.summary.split_once("Abstract:") {
            entry.summary = abstract_text.to_string();
        }
    }

    let items = entries_to_items(entries, SourceId::Arxiv, ITEM_CAP, now, "", SUMMARY_MAX_CHARS);
    if items.is_empty() {
        return Err(FetchError::Parse("no entries in arXiv feed".to_string()));
    }
    Ok(items)
}
