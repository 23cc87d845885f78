//! Product Hunt "artificial intelligence" topic listing.
//!
//! The topic page also surfaces general products, so cards are kept only if
//! their title or tagline mentions an AI keyword.

use crate::error::FetchError;
use crate::http::HttpClient;
use crate::models::{Item, SourceId};
use crate::scrape::{ListingRecipe, SummaryFallback, parse_listing};
use chrono::{DateTime, Utc};
use tracing::{info, instrument};

pub const CATEGORY_URL: &str = "https://www.producthunt.com/topics/artificial-intelligence";

pub const RECIPE: ListingRecipe = ListingRecipe {
    base_url: "https://www.producthunt.com",
    containers: &[
        "article[data-test*='post'], article[data-test*='product'], \
         div[data-test*='post'], div[data-test*='product']",
        "div[class*='post'], div[class*='product'], div[class*='item'], \
         article[class*='post'], article[class*='product'], article[class*='item']",
    ],
    title: &[
        "h2[class*='name'], h2[class*='title'], h3[class*='name'], h3[class*='title'], \
         a[class*='name'], a[class*='title']",
        "h2, h3",
    ],
    link: &["a[href*='/posts/'], a[href*='/products/']", "a[href]"],
    link_in_title: false,
    summary: &[
        "p[class*='tagline'], p[class*='description'], div[class*='tagline'], div[class*='description']",
    ],
    summary_fallback: SummaryFallback::Prefixed("New AI product on Product Hunt: "),
    summary_max: 200,
    require_ai_keywords: true,
    cap: 15,
};

#[instrument(level = "info", skip_all)]
pub async fn fetch(http: &HttpClient, now: DateTime<Utc>) -> Result<Vec<Item>, FetchError> {
    let html = http.get_text(CATEGORY_URL).await?;
    let items = parse_listing(&html, &RECIPE, SourceId::ProductHunt, now)?;
    info!(count = items.len(), source = CATEGORY_URL, "Parsed Product Hunt products");
    Ok(items)
}
