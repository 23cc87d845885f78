//! RSS 2.0, RSS 1.0 (RDF) and Atom parsing.
//!
//! Feeds are deserialized with `quick-xml`'s serde support into minimal
//! structs; every element the adapters do not need is ignored. The root
//! element decides which shape to deserialize into.
//!
//! The output is a flat list of [`FeedEntry`] values with raw (uncleaned)
//! text. [`entries_to_items`] turns them into validated [`Item`]s.

use crate::error::FetchError;
use crate::models::{Item, SourceId};
use crate::utils::{clean_text, collapse_whitespace, truncate_for_log, truncate_summary};
use chrono::{DateTime, NaiveDateTime, Utc};
use quick_xml::Reader;
use quick_xml::events::Event;
use serde::Deserialize;
use tracing::{debug, warn};

/// One entry as read from a feed, before cleanup.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
    pub title: String,
    pub link: String,
    pub summary: String,
    pub published: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct Rss {
    channel: RssChannel,
}

#[derive(Debug, Deserialize)]
struct RssChannel {
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct Rdf {
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    /// `<dc:date>`; the deserializer reports the element by its local name.
    #[serde(rename = "date", alias = "dc:date")]
    dc_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<AtomText>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    content: Option<AtomText>,
    summary: Option<AtomText>,
    published: Option<String>,
    updated: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomText {
    #[serde(rename = "$text", default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

impl AtomEntry {
    fn alternate_link(&self) -> Option<String> {
        self.links
            .iter()
            .find(|l| l.rel.as_deref().is_none_or(|r| r == "alternate"))
            .or_else(|| self.links.first())
            .and_then(|l| l.href.clone())
    }
}

impl From<RssItem> for FeedEntry {
    fn from(item: RssItem) -> Self {
        FeedEntry {
            title: item.title.unwrap_or_default(),
            link: item.link.unwrap_or_default().trim().to_string(),
            summary: item.description.unwrap_or_default(),
            published: item
                .pub_date
                .as_deref()
                .or(item.dc_date.as_deref())
                .and_then(parse_feed_date),
        }
    }
}

impl From<AtomEntry> for FeedEntry {
    fn from(entry: AtomEntry) -> Self {
        let link = entry.alternate_link().unwrap_or_default();
        let published = entry
            .published
            .as_deref()
            .or(entry.updated.as_deref())
            .and_then(parse_feed_date);
        let summary = entry
            .content
            .or(entry.summary)
            .map(|t| t.value)
            .unwrap_or_default();
        FeedEntry {
            title: entry.title.map(|t| t.value).unwrap_or_default(),
            link,
            summary,
            published,
        }
    }
}

/// Parse a feed document into entries, whatever its dialect.
///
/// # Errors
///
/// [`FetchError::Parse`] if the document is not XML, has an unknown root
/// element, or does not match the expected shape.
pub fn parse_feed(content: &str) -> Result<Vec<FeedEntry>, FetchError> {
    let xml = scrub_html_entities(content);
    let root = root_element(&xml).ok_or_else(|| {
        FetchError::Parse(format!(
            "no XML root element in feed body: {}",
            truncate_for_log(content.trim(), 120)
        ))
    })?;

    let entries: Vec<FeedEntry> = match root.as_str() {
        "rss" => quick_xml::de::from_str::<Rss>(&xml)
            .map_err(|e| FetchError::Parse(format!("malformed RSS: {}", e)))?
            .channel
            .items
            .into_iter()
            .map(FeedEntry::from)
            .collect(),
        "rdf" => quick_xml::de::from_str::<Rdf>(&xml)
            .map_err(|e| FetchError::Parse(format!("malformed RDF: {}", e)))?
            .items
            .into_iter()
            .map(FeedEntry::from)
            .collect(),
        "feed" => quick_xml::de::from_str::<AtomFeed>(&xml)
            .map_err(|e| FetchError::Parse(format!("malformed Atom: {}", e)))?
            .entries
            .into_iter()
            .map(FeedEntry::from)
            .collect(),
        other => {
            return Err(FetchError::Parse(format!(
                "unexpected root element <{}>",
                other
            )));
        }
    };

    debug!(root = %root, count = entries.len(), "Parsed feed");
    Ok(entries)
}

/// Convert feed entries into validated items.
///
/// Entries are ordered newest-first (entries without a date keep their feed
/// position relative to each other and sort as if published `now`), capped
/// at `cap`, cleaned, and stamped with `source`. Entries that fail
/// validation are dropped individually.
pub fn entries_to_items(
    mut entries: Vec<FeedEntry>,
    source: SourceId,
    cap: usize,
    now: DateTime<Utc>,
    title_prefix: &str,
    summary_max: usize,
) -> Vec<Item> {
    entries.sort_by_key(|e| std::cmp::Reverse(e.published.unwrap_or(now)));

    entries
        .into_iter()
        .filter_map(|entry| {
            let title = collapse_whitespace(&entry.title);
            if title.is_empty() {
                debug!(%source, link = %entry.link, "Dropping feed entry without title");
                return None;
            }
            let summary = match truncate_summary(&clean_text(&entry.summary), summary_max) {
                s if s.is_empty() => title.clone(),
                s => s,
            };
            let published = entry.published.unwrap_or(now);
            match Item::new(
                format!("{}{}", title_prefix, title),
                summary,
                entry.link,
                published,
                source,
            ) {
                Ok(item) => Some(item),
                Err(e) => {
                    warn!(%source, error = %e, "Dropping invalid feed entry");
                    None
                }
            }
        })
        .take(cap)
        .collect()
}

/// Parse the date formats seen in the wild in RSS and Atom feeds.
pub fn parse_feed_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%SZ")
                .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
                .ok()
                .map(|naive| naive.and_utc())
        })
}

/// Local name of the first element in the document, lowercased.
fn root_element(xml: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return Some(String::from_utf8_lossy(e.local_name().as_ref()).to_lowercase());
            }
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => {}
        }
    }
}

/// Replace HTML-only named entities that are not valid in XML.
fn scrub_html_entities(s: &str) -> String {
    s.replace("&nbsp;", "&#160;")
        .replace("&ndash;", "&#8211;")
        .replace("&mdash;", "&#8212;")
        .replace("&ldquo;", "&#8220;")
        .replace("&rdquo;", "&#8221;")
        .replace("&lsquo;", "&#8216;")
        .replace("&rsquo;", "&#8217;")
        .replace("&hellip;", "&#8230;")
}
