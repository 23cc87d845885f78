//! Hugging Face blog index.
//!
//! The blog index has no feed with summaries, so cards are scraped. The page
//! has moved between `<article>` cards, class-named `div`s and bare anchor
//! cards over time; all three layouts are tried in that order.

use crate::error::FetchError;
use crate::http::HttpClient;
use crate::models::{Item, SourceId};
use crate::scrape::{ListingRecipe, SummaryFallback, parse_listing};
use crate::utils::SUMMARY_MAX_CHARS;
use chrono::{DateTime, Utc};
use tracing::{info, instrument};

pub const BLOG_URL: &str = "https://huggingface.co/blog";

pub const RECIPE: ListingRecipe = ListingRecipe {
    base_url: BLOG_URL,
    containers: &[
        "article",
        "div[class*='blog'], div[class*='post'], div[class*='article']",
        "a[href^='/blog/']",
    ],
    title: &["h2, h3, h4"],
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
    let html = http.get_text(BLOG_URL).await?;
    let items = parse_listing(&html, &RECIPE, SourceId::HuggingFace, now)?;
    info!(count = items.len(), source = BLOG_URL, "Parsed Hugging Face posts");
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchor_cards() {
        let html = r#"
            <main>
              <a href="/blog/smolvlm" class="flex">
                <h4 class="text-xl">SmolVLM grows up</h4>
                <p class="text-sm">Small vision models, bigger context.</p>
              </a>
              <a href="/blog/trl-release">
                <h4>TRL 1.0</h4>
              </a>
              <a href="/docs">Docs</a>
            </main>"#;
        let items = parse_listing(html, &RECIPE, SourceId::HuggingFace, Utc::now()).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].link(), "https://huggingface.co/blog/smolvlm");
        assert_eq!(items[0].summary(), "Small vision models, bigger context.");
        assert_eq!(items[1].summary(), "TRL 1.0");
    }
}
