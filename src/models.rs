//! Data models for collected items and the persisted store.
//!
//! - [`SourceId`]: the closed, ordered set of registered sources
//! - [`Item`]: one normalized record, validated at construction
//! - [`Snapshot`]: the result of one collection run for one date
//! - [`CollectionStatus`]: per-run bookkeeping embedded in a snapshot
//! - [`Manifest`]: the store-wide index of retained dates
//!
//! An item's `source` is positional: it is the key of the snapshot's
//! `sources` map and is not repeated inside each serialized record. When a
//! snapshot is read back, every item is re-stamped with its map key.

use crate::error::InvalidItem;
use crate::utils::normalize_title;
use chrono::{DateTime, NaiveDate, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifier of a registered source.
///
/// Declaration order is registration order: the derived `Ord` is what makes
/// a `BTreeMap<SourceId, _>` iterate sources the way the orchestrator ran them,
/// and what breaks ties during deduplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SourceId {
    #[serde(rename = "arxiv")]
    Arxiv,
    #[serde(rename = "huggingface")]
    HuggingFace,
    #[serde(rename = "producthunt")]
    ProductHunt,
    #[serde(rename = "reddit")]
    Reddit,
    #[serde(rename = "ai_news")]
    AiNews,
    #[serde(rename = "crescendo")]
    Crescendo,
}

impl SourceId {
    /// Every source, in registration order.
    pub const ALL: [SourceId; 6] = [
        SourceId::Arxiv,
        SourceId::HuggingFace,
        SourceId::ProductHunt,
        SourceId::Reddit,
        SourceId::AiNews,
        SourceId::Crescendo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceId::Arxiv => "arxiv",
            SourceId::HuggingFace => "huggingface",
            SourceId::ProductHunt => "producthunt",
            SourceId::Reddit => "reddit",
            SourceId::AiNews => "ai_news",
            SourceId::Crescendo => "crescendo",
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One collected piece of content.
///
/// Construction goes through [`Item::new`], so a value of this type always has
/// a non-empty title and an absolute `http(s)` link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Item {
    title: String,
    summary: String,
    link: String,
    published: DateTime<Utc>,
    #[serde(skip)]
    source: SourceId,
}

impl Item {
    /// Build a validated item.
    ///
    /// # Errors
    ///
    /// [`InvalidItem`] when the title is blank after trimming, or when `link`
    /// is not an absolute `http`/`https` URL.
    pub fn new(
        title: impl Into<String>,
        summary: impl Into<String>,
        link: impl Into<String>,
        published: DateTime<Utc>,
        source: SourceId,
    ) -> Result<Self, InvalidItem> {
        let title = title.into().trim().to_string();
        if title.is_empty() {
            return Err(InvalidItem("empty title".to_string()));
        }

        let link = link.into().trim().to_string();
        match url::Url::parse(&link) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
            Ok(parsed) => {
                return Err(InvalidItem(format!(
                    "unsupported link scheme {:?} for {:?}",
                    parsed.scheme(),
                    title
                )));
            }
            Err(e) => {
                return Err(InvalidItem(format!("link {:?} is not absolute: {}", link, e)));
            }
        }

        Ok(Self {
            title,
            summary: summary.into().trim().to_string(),
            link,
            published,
            source,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn link(&self) -> &str {
        &self.link
    }

    pub fn published(&self) -> DateTime<Utc> {
        self.published
    }

    pub fn source(&self) -> SourceId {
        self.source
    }

    /// Key used for in-run deduplication. See [`normalize_title`].
    pub fn identity_key(&self) -> String {
        normalize_title(&self.title)
    }
}

/// Serialized shape of an [`Item`]; the source comes from the enclosing map key.
#[derive(Deserialize)]
struct ItemRecord {
    title: String,
    #[serde(default)]
    summary: String,
    link: String,
    published: DateTime<Utc>,
}

fn deserialize_sources<'de, D>(deserializer: D) -> Result<BTreeMap<SourceId, Vec<Item>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: BTreeMap<SourceId, Vec<ItemRecord>> = BTreeMap::deserialize(deserializer)?;
    raw.into_iter()
        .map(|(source, records)| {
            let items = records
                .into_iter()
                .map(|r| Item::new(r.title, r.summary, r.link, r.published, source))
                .collect::<Result<Vec<_>, _>>()
                .map_err(D::Error::custom)?;
            Ok((source, items))
        })
        .collect()
}

/// Bookkeeping about how the adapters fared in one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionStatus {
    pub total_sources: usize,
    pub successful: usize,
    pub failed: Vec<SourceId>,
    pub total_items: usize,
}

/// The persisted result of one collection run for one calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Calendar date this snapshot is filed under (`YYYY-MM-DD`).
    pub date: NaiveDate,
    /// Run completion time.
    pub last_updated: DateTime<Utc>,
    pub collection_status: CollectionStatus,
    /// Items per source, each list in adapter-internal order.
    #[serde(deserialize_with = "deserialize_sources")]
    pub sources: BTreeMap<SourceId, Vec<Item>>,
}

impl Snapshot {
    pub fn total_items(&self) -> usize {
        self.sources.values().map(Vec::len).sum()
    }

    /// Check the invariants tying `collection_status` to `sources`.
    pub fn is_consistent(&self) -> bool {
        let status = &self.collection_status;
        status.total_items == self.total_items()
            && status.successful + status.failed.len() == status.total_sources
            && status
                .failed
                .iter()
                .all(|id| self.sources.get(id).is_none_or(Vec::is_empty))
    }

    /// Item count per source, in registration order.
    pub fn counts(&self) -> Vec<(SourceId, usize)> {
        self.sources.iter().map(|(id, items)| (*id, items.len())).collect()
    }
}

/// Store-wide index of the dates currently on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub last_updated: DateTime<Utc>,
    /// Retained dates, newest first.
    pub available_dates: Vec<NaiveDate>,
    pub total_days: usize,
}

impl Manifest {
    pub fn new(last_updated: DateTime<Utc>, mut available_dates: Vec<NaiveDate>) -> Self {
        available_dates.sort_unstable_by(|a, b| b.cmp(a));
        available_dates.dedup();
        let total_days = available_dates.len();
        Self {
            last_updated,
            available_dates,
            total_days,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 19, 6, 0, 0).unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_item_rejects_blank_title() {
        let err = Item::new("   ", "summary", "https://example.com", ts(), SourceId::Arxiv);
        assert!(err.is_err());
    }

    #[test]
    fn test_item_rejects_relative_link() {
        let err = Item::new("Title", "", "/blog/post", ts(), SourceId::HuggingFace);
        assert!(err.is_err());
        let err = Item::new("Title", "", "ftp://example.com/x", ts(), SourceId::HuggingFace);
        assert!(err.is_err());
    }

    #[test]
    fn test_item_trims_fields() {
        let item = Item::new("  Title  ", " text ", "https://example.com/a", ts(), SourceId::Reddit).unwrap();
        assert_eq!(item.title(), "Title");
        assert_eq!(item.summary(), "text");
        assert_eq!(item.source(), SourceId::Reddit);
    }

    #[test]
    fn test_item_serialization_omits_source() {
        let item = Item::new("Title", "Summary", "https://example.com/a", ts(), SourceId::Arxiv).unwrap();
        let value = serde_json::to_value(&item).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 4);
        assert!(obj.contains_key("title"));
        assert!(obj.contains_key("summary"));
        assert!(obj.contains_key("link"));
        assert!(obj.contains_key("published"));
        assert!(!obj.contains_key("source"));
        assert_eq!(obj["published"], "2025-10-19T06:00:00Z");
    }

    #[test]
    fn test_source_id_serializes_as_key() {
        assert_eq!(serde_json::to_string(&SourceId::AiNews).unwrap(), "\"ai_news\"");
        assert_eq!(SourceId::ProductHunt.to_string(), "producthunt");
        let mut sorted = SourceId::ALL.to_vec();
        sorted.sort();
        assert_eq!(sorted, SourceId::ALL.to_vec());
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut sources = BTreeMap::new();
        sources.insert(
            SourceId::Arxiv,
            vec![
                Item::new("Paper A", "Abstract", "https://arxiv.org/abs/1", ts(), SourceId::Arxiv).unwrap(),
                Item::new("Paper B", "", "https://arxiv.org/abs/2", ts(), SourceId::Arxiv).unwrap(),
            ],
        );
        sources.insert(
            SourceId::Reddit,
            vec![Item::new("[r/claudeai] Post", "Body", "https://reddit.com/r/x", ts(), SourceId::Reddit).unwrap()],
        );
        sources.insert(SourceId::Crescendo, vec![]);

        let snapshot = Snapshot {
            date: date("2025-10-19"),
            last_updated: ts(),
            collection_status: CollectionStatus {
                total_sources: 3,
                successful: 2,
                failed: vec![SourceId::Crescendo],
                total_items: 3,
            },
            sources,
        };
        assert!(snapshot.is_consistent());

        let json = serde_json::to_string_pretty(&snapshot).unwrap();
        let back: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
        assert_eq!(back.sources[&SourceId::Reddit][0].source(), SourceId::Reddit);
    }

    #[test]
    fn test_snapshot_deserialization_from_presentation_format() {
        let json = r#"{
            "date": "2025-10-18",
            "last_updated": "2025-10-18T18:00:00+00:00",
            "collection_status": {
                "total_sources": 2,
                "successful": 1,
                "failed": ["producthunt"],
                "total_items": 1
            },
            "sources": {
                "huggingface": [
                    {
                        "title": "Blog post",
                        "summary": "Intro",
                        "link": "https://huggingface.co/blog/post",
                        "published": "2025-10-18T17:59:00+00:00"
                    }
                ],
                "producthunt": []
            }
        }"#;
        let snapshot: Snapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.date, date("2025-10-18"));
        assert!(snapshot.is_consistent());
        assert_eq!(snapshot.sources[&SourceId::HuggingFace][0].source(), SourceId::HuggingFace);
    }

    #[test]
    fn test_inconsistent_snapshot_detected() {
        let mut sources = BTreeMap::new();
        sources.insert(
            SourceId::Arxiv,
            vec![Item::new("Paper", "", "https://arxiv.org/abs/1", ts(), SourceId::Arxiv).unwrap()],
        );
        let snapshot = Snapshot {
            date: date("2025-10-19"),
            last_updated: ts(),
            collection_status: CollectionStatus {
                total_sources: 1,
                successful: 0,
                failed: vec![SourceId::Arxiv],
                total_items: 1,
            },
            sources,
        };
        assert!(!snapshot.is_consistent());
    }

    #[test]
    fn test_manifest_sorts_descending() {
        let manifest = Manifest::new(
            ts(),
            vec![date("2025-10-17"), date("2025-10-19"), date("2025-10-18")],
        );
        assert_eq!(
            manifest.available_dates,
            vec![date("2025-10-19"), date("2025-10-18"), date("2025-10-17")]
        );
        assert_eq!(manifest.total_days, 3);

        let json = serde_json::to_value(&manifest).unwrap();
        assert_eq!(json["available_dates"][0], "2025-10-19");
    }
}
