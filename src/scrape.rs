//! Structural HTML traversal for listing pages.
//!
//! Scraped sources describe their page layout as a [`ListingRecipe`]: an
//! ordered list of container selectors (the first one that matches anything
//! wins, the rest are fallbacks for when the site changes its markup), plus
//! per-field selector lists tried in order inside each container.

use crate::error::FetchError;
use crate::models::{Item, SourceId};
use crate::utils::{collapse_whitespace, is_ai_related, truncate_summary};
use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use tracing::{debug, warn};
use url::Url;

/// What to use as the summary when a card has no description element.
#[derive(Debug, Clone, Copy)]
pub enum SummaryFallback {
    /// Repeat the title.
    Title,
    /// `"<prefix><title>"`.
    Prefixed(&'static str),
}

/// Selector layout of one listing page.
#[derive(Debug, Clone, Copy)]
pub struct ListingRecipe {
    /// Base URL used to resolve relative hrefs.
    pub base_url: &'static str,
    /// Container selectors, primary first.
    pub containers: &'static [&'static str],
    pub title: &'static [&'static str],
    pub link: &'static [&'static str],
    /// Prefer an anchor inside (or being) the title element over `link`.
    pub link_in_title: bool,
    pub summary: &'static [&'static str],
    pub summary_fallback: SummaryFallback,
    pub summary_max: usize,
    /// Keep only cards mentioning an AI keyword.
    pub require_ai_keywords: bool,
    pub cap: usize,
}

fn selector(css: &str) -> Result<Selector, FetchError> {
    Selector::parse(css).map_err(|e| FetchError::Parse(format!("invalid selector {:?}: {}", css, e)))
}

fn selectors(list: &[&str]) -> Result<Vec<Selector>, FetchError> {
    list.iter().map(|css| selector(css)).collect()
}

fn element_text(el: ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<String>())
}

/// First descendant of `scope` matching any selector, trying selectors in order.
fn first_match<'a>(scope: ElementRef<'a>, sels: &[Selector]) -> Option<ElementRef<'a>> {
    sels.iter().find_map(|sel| scope.select(sel).next())
}

fn href_of(el: ElementRef<'_>) -> Option<&str> {
    if el.value().name() == "a" {
        el.value().attr("href")
    } else {
        None
    }
}

/// Resolve `href` against `base`, keeping only http(s) results.
pub fn resolve_link(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let resolved = base.join(href).ok()?;
    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}

/// Extract items from a listing page.
///
/// # Errors
///
/// [`FetchError::Parse`] if no container selector matches, or if the
/// containers that matched produced no usable items.
pub fn parse_listing(
    html: &str,
    recipe: &ListingRecipe,
    source: SourceId,
    now: DateTime<Utc>,
) -> Result<Vec<Item>, FetchError> {
    let base = Url::parse(recipe.base_url)
        .map_err(|e| FetchError::Parse(format!("invalid base url {}: {}", recipe.base_url, e)))?;
    let document = Html::parse_document(html);

    let title_sels = selectors(recipe.title)?;
    let link_sels = selectors(recipe.link)?;
    let summary_sels = selectors(recipe.summary)?;
    let anchor = selector("a[href]")?;

    let mut containers = Vec::new();
    for css in recipe.containers {
        let sel = selector(css)?;
        containers = document.select(&sel).collect::<Vec<_>>();
        if !containers.is_empty() {
            debug!(%source, selector = %css, count = containers.len(), "Matched containers");
            break;
        }
    }
    if containers.is_empty() {
        return Err(FetchError::Parse(format!(
            "no listing containers found on {}",
            recipe.base_url
        )));
    }

    let mut seen_links = HashSet::new();
    let mut items = Vec::new();

    for container in containers {
        if items.len() >= recipe.cap {
            break;
        }

        let Some(title_el) = first_match(container, &title_sels) else {
            continue;
        };
        let title = element_text(title_el);
        if title.is_empty() {
            continue;
        }

        let in_title = if recipe.link_in_title {
            href_of(title_el).or_else(|| {
                title_el
                    .select(&anchor)
                    .next()
                    .and_then(|a| a.value().attr("href"))
            })
        } else {
            None
        };
        let href = in_title
            .or_else(|| first_match(container, &link_sels).and_then(|a| a.value().attr("href")))
            .or_else(|| href_of(container));
        let Some(link) = href.and_then(|h| resolve_link(&base, h)) else {
            continue;
        };
        if !seen_links.insert(link.clone()) {
            continue;
        }

        let description = first_match(container, &summary_sels)
            .map(element_text)
            .filter(|s| !s.is_empty() && *s != title);
        let summary = match (description, recipe.summary_fallback) {
            (Some(text), _) => text,
            (None, SummaryFallback::Title) => title.clone(),
            (None, SummaryFallback::Prefixed(prefix)) => format!("{}{}", prefix, title),
        };
        let summary = truncate_summary(&summary, recipe.summary_max);

        if recipe.require_ai_keywords && !is_ai_related(&format!("{} {}", title, summary)) {
            debug!(%source, %title, "Skipping non-AI listing");
            continue;
        }

        match Item::new(title, summary, link, now, source) {
            Ok(item) => items.push(item),
            Err(e) => warn!(%source, error = %e, "Dropping invalid listing card"),
        }
    }

    if items.is_empty() {
        return Err(FetchError::Parse(format!(
            "containers matched on {} but yielded no items",
            recipe.base_url
        )));
    }
    Ok(items)
}
