//! ArtificialIntelligence-News.com front page.

use crate::error::FetchError;
use crate::http::HttpClient;
use crate::models::{Item, SourceId};
use crate::scrape::{ListingRecipe, SummaryFallback, parse_listing};
use crate::utils::SUMMARY_MAX_CHARS;
use chrono::{DateTime, Utc};
use tracing::{info, instrument};

pub const BASE_URL: &str = "https://www.artificialintelligence-news.com";

pub const RECIPE: ListingRecipe = ListingRecipe {
    base_url: BASE_URL,
    containers: &[
        "article[class*='post'], article[class*='article'], article[class*='entry'], \
         div[class*='post'], div[class*='article'], div[class*='entry']",
        "article",
    ],
    title: &[
        "h1[class*='title'], h1[class*='headline'], h2[class*='title'], h2[class*='headline'], \
         h3[class*='title'], h3[class*='headline']",
        "h1, h2, h3",
    ],
    link: &["a[href]"],
    link_in_title: true,
    summary: &[
        "p[class*='excerpt'], p[class*='summary'], p[class*='description'], \
         div[class*='excerpt'], div[class*='summary'], div[class*='description']",
        "p",
    ],
    summary_fallback: SummaryFallback::Title,
    summary_max: SUMMARY_MAX_CHARS,
    require_ai_keywords: false,
    cap: 15,
};

#[instrument(level = "info", skip_all)]
pub async fn fetch(http: &HttpClient, now: DateTime<Utc>) -> Result<Vec<Item>, FetchError> {
    let html = http.get_text(BASE_URL).await?;
    let items = parse_listing(&html, &RECIPE, SourceId::AiNews, now)?;
    info!(count = items.len(), source = BASE_URL, "Parsed AI News articles");
    Ok(items)
}
