//! JSON persistence for snapshots and the manifest.
//!
//! All writes are atomic: the payload goes to `<name>.json.tmp` next to the
//! target and is renamed over it. Files are pretty-printed UTF-8.

use super::Store;
use crate::error::StoreError;
use crate::models::{Manifest, Snapshot};
use chrono::NaiveDate;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, error, info, instrument};

impl Store {
    /// Path of the snapshot file for `date`.
    pub fn dated_path(&self, date: NaiveDate) -> PathBuf {
        self.data_dir
            .join(format!("{}.json", date.format("%Y-%m-%d")))
    }

    /// Write `snapshot` to `<date>.json`, replacing any previous run for that date.
    #[instrument(level = "info", skip_all, fields(date = %snapshot.date))]
    pub async fn persist(&self, snapshot: &Snapshot) -> Result<PathBuf, StoreError> {
        let path = self.dated_path(snapshot.date);
        let body = to_pretty_json(snapshot, "snapshot")?;
        write_atomic(&path, body.as_bytes()).await?;
        info!(
            path = %path.display(),
            total_items = snapshot.collection_status.total_items,
            "Wrote snapshot"
        );
        Ok(path)
    }

    /// Write `snapshot` to `today.json`.
    ///
    /// Serialization is deterministic, so the result is byte-identical to the
    /// dated file written by [`Store::persist`] for the same snapshot.
    #[instrument(level = "info", skip_all, fields(date = %snapshot.date))]
    pub async fn refresh_latest(&self, snapshot: &Snapshot) -> Result<PathBuf, StoreError> {
        let path = self.latest_path();
        let body = to_pretty_json(snapshot, "snapshot")?;
        write_atomic(&path, body.as_bytes()).await?;
        info!(path = %path.display(), "Refreshed latest snapshot");
        Ok(path)
    }

    pub(crate) async fn write_manifest(&self, manifest: &Manifest) -> Result<PathBuf, StoreError> {
        let path = self.manifest_path();
        let body = to_pretty_json(manifest, "manifest")?;
        write_atomic(&path, body.as_bytes()).await?;
        info!(
            path = %path.display(),
            total_days = manifest.total_days,
            "Wrote manifest"
        );
        Ok(path)
    }

    pub async fn load_snapshot(&self, date: NaiveDate) -> Result<Snapshot, StoreError> {
        read_json(&self.dated_path(date)).await
    }

    pub async fn load_latest(&self) -> Result<Snapshot, StoreError> {
        read_json(&self.latest_path()).await
    }

    pub async fn load_manifest(&self) -> Result<Manifest, StoreError> {
        read_json(&self.manifest_path()).await
    }
}

fn to_pretty_json<T: Serialize>(value: &T, what: &'static str) -> Result<String, StoreError> {
    serde_json::to_string_pretty(value).map_err(|source| StoreError::Serialize { what, source })
}

/// Write `bytes` to a sibling temp file, then rename it over `path`.
pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| StoreError::io(parent, e))?;
    }

    let tmp = path.with_extension("json.tmp");
    debug!(tmp = %tmp.display(), "Writing temp file");
    if let Err(e) = fs::write(&tmp, bytes).await {
        error!(path = %tmp.display(), error = %e, "Failed to write temp file");
        let _ = fs::remove_file(&tmp).await;
        return Err(StoreError::io(&tmp, e));
    }
    if let Err(e) = fs::rename(&tmp, path).await {
        error!(path = %path.display(), error = %e, "Failed to move temp file into place");
        let _ = fs::remove_file(&tmp).await;
        return Err(StoreError::io(path, e));
    }
    Ok(())
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    let body = fs::read_to_string(path)
        .await
        .map_err(|e| StoreError::io(path, e))?;
    serde_json::from_str(&body).map_err(|source| StoreError::Deserialize {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CollectionStatus, Item, SourceId};
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;

    fn snapshot(date: &str) -> Snapshot {
        let ts = Utc.with_ymd_and_hms(2025, 10, 19, 6, 0, 0).unwrap();
        let mut sources = BTreeMap::new();
        sources.insert(
            SourceId::Arxiv,
            vec![Item::new("Paper", "Abstract", "https://arxiv.org/abs/1", ts, SourceId::Arxiv).unwrap()],
        );
        sources.insert(SourceId::Reddit, vec![]);
        Snapshot {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            last_updated: ts,
            collection_status: CollectionStatus {
                total_sources: 2,
                successful: 1,
                failed: vec![SourceId::Reddit],
                total_items: 1,
            },
            sources,
        }
    }

    #[tokio::test]
    async fn test_persist_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path());
        let snap = snapshot("2025-10-19");

        let path = store.persist(&snap).await.unwrap();
        assert_eq!(path, dir.path().join("2025-10-19.json"));
        assert!(!dir.path().join("2025-10-19.json.tmp").exists());

        let back = store.load_snapshot(snap.date).await.unwrap();
        assert_eq!(back, snap);
    }

    #[tokio::test]
    async fn test_latest_matches_dated_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path());
        let snap = snapshot("2025-10-19");

        let dated = store.persist(&snap).await.unwrap();
        let latest = store.refresh_latest(&snap).await.unwrap();
        assert_eq!(
            std::fs::read(dated).unwrap(),
            std::fs::read(latest).unwrap()
        );
        assert_eq!(store.load_latest().await.unwrap(), snap);
    }

    #[tokio::test]
    async fn test_persist_overwrites_same_date() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path());
        let mut snap = snapshot("2025-10-19");
        store.persist(&snap).await.unwrap();

        snap.sources.insert(SourceId::Arxiv, vec![]);
        snap.collection_status.total_items = 0;
        store.persist(&snap).await.unwrap();

        let back = store.load_snapshot(snap.date).await.unwrap();
        assert_eq!(back.total_items(), 0);
    }

    #[tokio::test]
    async fn test_load_missing_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path());
        let err = store.load_latest().await.unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
    }

    #[tokio::test]
    async fn test_load_corrupt_is_deserialize_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.json"), "{ not json").unwrap();
        let store = Store::new(dir.path());
        let err = store.load_manifest().await.unwrap_err();
        assert!(matches!(err, StoreError::Deserialize { .. }));
    }
}
