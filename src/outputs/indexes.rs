//! Date discovery, retention and the manifest.
//!
//! Only files named exactly `YYYY-MM-DD.json` count as snapshots; the alias,
//! the manifest, temp files and anything else in the directory are ignored.
//!
//! # Rebuild Order
//!
//! The manifest is written before any file is deleted, so it never lists a
//! date whose file is already gone, and a failed delete leaves at worst an
//! unlisted file behind for the next rebuild to prune.

use super::Store;
use crate::error::StoreError;
use crate::models::Manifest;
use chrono::{NaiveDate, Utc};
use std::io::ErrorKind;
use tokio::fs;
use tracing::{debug, info, instrument, warn};

/// Kept and pruned dates for one retention pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionPlan {
    /// Newest first.
    pub keep: Vec<NaiveDate>,
    pub prune: Vec<NaiveDate>,
    /// In-window date pushed out to make room for an older pinned date.
    pub displaced: Option<NaiveDate>,
}

/// Parse a snapshot file name, accepting only the canonical `YYYY-MM-DD.json`.
pub fn parse_dated_name(name: &str) -> Option<NaiveDate> {
    let stem = name.strip_suffix(".json")?;
    if stem.len() != 10 {
        return None;
    }
    let date = NaiveDate::parse_from_str(stem, "%Y-%m-%d").ok()?;
    (date.format("%Y-%m-%d").to_string() == stem).then_some(date)
}

/// Split `dates` into the most recent `retention` and the rest.
///
/// When `pinned` is present in `dates` but falls outside the window, it
/// displaces the oldest kept date. A `retention` of 0 is treated as 1.
pub fn plan_retention(
    dates: &[NaiveDate],
    retention: usize,
    pinned: Option<NaiveDate>,
) -> RetentionPlan {
    let mut sorted = dates.to_vec();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    sorted.dedup();

    let window = retention.max(1).min(sorted.len());
    let mut keep: Vec<NaiveDate> = sorted[..window].to_vec();

    let mut displaced = None;
    if let Some(pin) = pinned.filter(|p| sorted.contains(p) && !keep.contains(p)) {
        displaced = keep.pop();
        keep.push(pin);
        keep.sort_unstable_by(|a, b| b.cmp(a));
    }

    let prune = sorted.into_iter().filter(|d| !keep.contains(d)).collect();
    RetentionPlan {
        keep,
        prune,
        displaced,
    }
}

impl Store {
    /// Dates with a snapshot file on disk, newest first.
    ///
    /// A missing data directory yields an empty list.
    pub async fn available_dates(&self) -> Result<Vec<NaiveDate>, StoreError> {
        let mut entries = match fs::read_dir(&self.data_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.data_dir, e)),
        };

        let mut dates = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::io(&self.data_dir, e))?
        {
            let name = entry.file_name();
            match name.to_str().and_then(parse_dated_name) {
                Some(date) => dates.push(date),
                None => debug!(file = ?name, "Ignoring non-snapshot file"),
            }
        }
        dates.sort_unstable_by(|a, b| b.cmp(a));
        Ok(dates)
    }

    /// Rewrite `index.json` to the retained dates and delete the rest.
    ///
    /// Returns the written manifest and the dates whose files were pruned.
    #[instrument(level = "info", skip(self), fields(data_dir = %self.data_dir.display()))]
    pub async fn rebuild_manifest(
        &self,
        retention_days: usize,
        pinned: Option<NaiveDate>,
    ) -> Result<(Manifest, Vec<NaiveDate>), StoreError> {
        let present = self.available_dates().await?;
        let plan = plan_retention(&present, retention_days, pinned);
        if let (Some(pin), Some(displaced)) = (pinned, plan.displaced) {
            warn!(
                pinned = %pin,
                displaced = %displaced,
                "Backfilled date is older than the retention window; pruning a newer snapshot to keep it"
            );
        }

        let manifest = Manifest::new(Utc::now(), plan.keep);
        self.write_manifest(&manifest).await?;

        for date in &plan.prune {
            let path = self.dated_path(*date);
            match fs::remove_file(&path).await {
                Ok(()) => info!(path = %path.display(), "Pruned snapshot"),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    warn!(path = %path.display(), "Snapshot already gone")
                }
                Err(e) => return Err(StoreError::io(&path, e)),
            }
        }

        info!(
            kept = manifest.total_days,
            pruned = plan.prune.len(),
            "Rebuilt manifest"
        );
        Ok((manifest, plan.prune))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Days;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn ten_days() -> Vec<NaiveDate> {
        let start = date("2025-10-10");
        (0..10).map(|i| start + Days::new(i)).collect()
    }

    #[test]
    fn test_parse_dated_name() {
        assert_eq!(parse_dated_name("2025-10-19.json"), Some(date("2025-10-19")));
        assert_eq!(parse_dated_name("today.json"), None);
        assert_eq!(parse_dated_name("index.json"), None);
        assert_eq!(parse_dated_name("2025-10-19.json.tmp"), None);
        assert_eq!(parse_dated_name("2025-1-9.json"), None);
        assert_eq!(parse_dated_name("2025-02-30.json"), None);
    }

    #[test]
    fn test_plan_keeps_most_recent() {
        let plan = plan_retention(&ten_days(), 7, None);
        assert_eq!(plan.keep.len(), 7);
        assert_eq!(plan.keep[0], date("2025-10-19"));
        assert_eq!(plan.keep[6], date("2025-10-13"));
        assert_eq!(plan.prune.len(), 3);
    }

    #[test]
    fn test_plan_pinned_displaces_oldest() {
        let plan = plan_retention(&ten_days(), 3, Some(date("2025-10-10")));
        assert_eq!(
            plan.keep,
            vec![date("2025-10-19"), date("2025-10-18"), date("2025-10-10")]
        );
        assert!(plan.prune.contains(&date("2025-10-17")));
        assert!(!plan.prune.contains(&date("2025-10-10")));
        assert_eq!(plan.displaced, Some(date("2025-10-17")));
    }

    #[test]
    fn test_plan_pinned_inside_window_displaces_nothing() {
        let plan = plan_retention(&ten_days(), 7, Some(date("2025-10-19")));
        assert_eq!(plan.displaced, None);
        assert_eq!(plan, plan_retention(&ten_days(), 7, None));
    }

    #[test]
    fn test_plan_zero_retention_keeps_one() {
        let plan = plan_retention(&ten_days(), 0, None);
        assert_eq!(plan.keep, vec![date("2025-10-19")]);
    }

    #[tokio::test]
    async fn test_rebuild_prunes_to_retention() {
        let dir = tempfile::tempdir().unwrap();
        for d in ten_days() {
            std::fs::write(dir.path().join(format!("{d}.json")), "{}").unwrap();
        }
        std::fs::write(dir.path().join("today.json"), "{}").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "keep me").unwrap();

        let store = Store::new(dir.path());
        let (manifest, pruned) = store.rebuild_manifest(7, None).await.unwrap();

        let expected: Vec<NaiveDate> = ten_days().into_iter().rev().take(7).collect();
        assert_eq!(manifest.available_dates, expected);
        assert_eq!(manifest.total_days, 7);
        assert_eq!(pruned.len(), 3);
        assert_eq!(store.available_dates().await.unwrap(), expected);
        assert!(dir.path().join("today.json").exists());
        assert!(dir.path().join("notes.txt").exists());
        assert_eq!(store.load_manifest().await.unwrap(), manifest);
    }

    #[tokio::test]
    async fn test_rebuild_keeps_pinned_backfill() {
        let dir = tempfile::tempdir().unwrap();
        for d in ten_days() {
            std::fs::write(dir.path().join(format!("{d}.json")), "{}").unwrap();
        }
        let store = Store::new(dir.path());
        let pinned = date("2025-10-10");
        let (manifest, _) = store.rebuild_manifest(7, Some(pinned)).await.unwrap();
        assert_eq!(manifest.total_days, 7);
        assert!(manifest.available_dates.contains(&pinned));
        assert!(dir.path().join("2025-10-10.json").exists());
        assert!(!dir.path().join("2025-10-13.json").exists());
    }

    #[tokio::test]
    async fn test_available_dates_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().join("absent"));
        assert!(store.available_dates().await.unwrap().is_empty());
    }
}
