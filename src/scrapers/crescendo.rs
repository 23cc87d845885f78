//! Crescendo AI news roundup page.

use crate::error::FetchError;
use crate::http::HttpClient;
use crate::models::{Item, SourceId};
use crate::scrape::{ListingRecipe, SummaryFallback, parse_listing};
use crate::utils::SUMMARY_MAX_CHARS;
use chrono::{DateTime, Utc};
use tracing::{info, instrument};

pub const NEWS_URL: &str = "https://crescendo.ai/news";

pub const RECIPE: ListingRecipe = ListingRecipe {
    base_url: NEWS_URL,
    containers: &[
        "article[class*='news'], article[class*='post'], article[class*='item'], article[class*='card'], \
         div[class*='news'], div[class*='post'], div[class*='item'], div[class*='card']",
        "article",
    ],
    title: &["h1, h2, h3, h4"],
    link: &["a[href]"],
    link_in_title: false,
    summary: &[
        "p[class*='description'], p[class*='summary'], p[class*='excerpt'], \
         div[class*='description'], div[class*='summary'], div[class*='excerpt']",
        "p",
    ],
    summary_fallback: SummaryFallback::Title,
    summary_max: SUMMARY_MAX_CHARS,
    require_ai_keywords: false,
    cap: 15,
};

#[instrument(level = "info", skip_all)]
pub async fn fetch(http: &HttpClient, now: DateTime<Utc>) -> Result<Vec<Item>, FetchError> {
    let html = http.get_text(NEWS_URL).await?;
    let items = parse_listing(&html, &RECIPE, SourceId::Crescendo, now)?;
    info!(count = items.len(), source = NEWS_URL, "Parsed Crescendo news");
    Ok(items)
}
