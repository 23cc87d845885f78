//! Reddit AI subreddits via their Atom feeds.
//!
//! Two subreddits are merged under the single `reddit` source. Each title is
//! prefixed with `[r/<name>] ` so readers can tell them apart. One feed failing
//! is logged and tolerated; the adapter only fails when every feed fails.

use crate::error::FetchError;
use crate::feeds::{entries_to_items, parse_feed};
use crate::http::HttpClient;
use crate::models::{Item, SourceId};
use crate::utils::SUMMARY_MAX_CHARS;
use chrono::{DateTime, Utc};
use tracing::{error, info, instrument};

/// `(name, feed url)` pairs, in the order their items appear in the snapshot.
pub const SUBREDDITS: [(&str, &str); 2] = [
    ("machinelearning", "https://www.reddit.com/r/MachineLearning/.rss"),
    ("claudeai", "https://www.reddit.com/r/ClaudeAI/.rss"),
];
pub const ITEM_CAP_PER_FEED: usize = 10;

#[instrument(level = "info", skip_all)]
pub async fn fetch(http: &HttpClient, now: DateTime<Utc>) -> Result<Vec<Item>, FetchError> {
    let mut bodies = Vec::with_capacity(SUBREDDITS.len());
    for (name, url) in SUBREDDITS {
        bodies.push((name, http.get_text(url).await));
    }
    let items = merge(bodies, now)?;
    info!(count = items.len(), "Parsed Reddit posts");
    Ok(items)
}

/// Merge per-subreddit fetch results.
///
/// When no subreddit produced items, the first transient error (if any) is
/// returned so the retry executor gets a chance; otherwise the last error.
pub fn merge(
    bodies: Vec<(&str, Result<String, FetchError>)>,
    now: DateTime<Utc>,
) -> Result<Vec<Item>, FetchError> {
    let mut items = Vec::new();
    let mut errors = Vec::new();

    for (name, body) in bodies {
        let parsed = body.and_then(|b| parse_subreddit(name, &b, now));
        match parsed {
            Ok(mut subreddit_items) => items.append(&mut subreddit_items),
            Err(e) => {
                error!(subreddit = name, error = %e, "Failed to fetch subreddit");
                errors.push(e);
            }
        }
    }

    if !items.is_empty() {
        return Ok(items);
    }
    match errors.iter().position(FetchError::is_transient) {
        Some(idx) => Err(errors.swap_remove(idx)),
        None => Err(errors
            .pop()
            .unwrap_or_else(|| FetchError::Parse("no subreddit feeds configured".to_string()))),
    }
}

/// Parse one subreddit feed.
pub fn parse_subreddit(name: &str, body: &str, now: DateTime<Utc>) -> Result<Vec<Item>, FetchError> {
    let entries = parse_feed(body)?;
    let prefix = format!("[r/{}] ", name);
    let items = entries_to_items(
        entries,
        SourceId::Reddit,
        ITEM_CAP_PER_FEED,
        now,
        &prefix,
        SUMMARY_MAX_CHARS,
    );
    if items.is_empty() {
        return Err(FetchError::Parse(format!("no entries in r/{} feed", name)));
    }
    Ok(items)
}
