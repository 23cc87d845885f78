//! Run every registered source once and assemble the day's [`Snapshot`].
//!
//! Sources are fetched concurrently, each behind its own [`RetryFetch`], so a
//! slow or failing source never blocks or aborts the others. Outcomes are
//! gathered in registration order, deduplicated across sources, and folded
//! into a snapshot together with its [`CollectionStatus`].

use crate::error::SourceError;
use crate::models::{CollectionStatus, Item, Snapshot, SourceId};
use crate::retry::{CancelFlag, RetryFetch, RetryPolicy};
use crate::scrapers::SourceFetch;
use chrono::{DateTime, NaiveDate, Utc};
use futures::future::join_all;
use itertools::Itertools;
use std::collections::{BTreeMap, HashSet};
use std::time::Instant;
use tracing::{error, info, instrument};

/// Final result for one source after retries.
#[derive(Debug)]
pub struct SourceOutcome {
    pub id: SourceId,
    pub result: Result<Vec<Item>, SourceError>,
}

/// Orchestrator over a fixed, ordered set of sources.
#[derive(Debug)]
pub struct Collector<S> {
    sources: Vec<S>,
    policy: RetryPolicy,
    cancel: CancelFlag,
}

impl<S> Collector<S>
where
    S: SourceFetch,
{
    pub fn new(sources: Vec<S>, policy: RetryPolicy, cancel: CancelFlag) -> Self {
        Self {
            sources,
            policy,
            cancel,
        }
    }

    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    /// Fetch every source concurrently and return their outcomes in
    /// registration order.
    #[instrument(level = "info", skip_all, fields(sources = self.sources.len()))]
    pub async fn fetch_all(&self) -> Vec<SourceOutcome> {
        let tasks = self.sources.iter().map(|source| {
            let retry = RetryFetch::new(source, self.policy.clone(), self.cancel.clone());
            async move {
                let id = source.id();
                let result = retry.fetch().await;
                match &result {
                    Ok(items) => info!(source = %id, count = items.len(), "Source collected"),
                    Err(e) => error!(source = %id, error = %e, "Source failed"),
                }
                SourceOutcome { id, result }
            }
        });
        join_all(tasks).await
    }

    /// Run every source once and build the snapshot for `date`.
    ///
    /// Never fails: a source that yields nothing is recorded in
    /// `collection_status.failed` and contributes an empty list.
    #[instrument(level = "info", skip_all, fields(date = %date))]
    pub async fn collect_all_sources(&self, date: NaiveDate) -> Snapshot {
        let t0 = Instant::now();
        let outcomes = self.fetch_all().await;
        let snapshot = build_snapshot(date, outcomes, Utc::now());

        let status = &snapshot.collection_status;
        info!(
            total_sources = status.total_sources,
            successful = status.successful,
            failed = status.failed.len(),
            total_items = status.total_items,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Collection finished"
        );
        snapshot
    }
}

/// Fold per-source outcomes into a snapshot.
///
/// Every source appears as a key in `sources`; failed ones map to an empty
/// list. Duplicates across sources are removed with [`dedupe_groups`], and
/// `total_items` counts what survives.
pub fn build_snapshot(
    date: NaiveDate,
    outcomes: Vec<SourceOutcome>,
    completed_at: DateTime<Utc>,
) -> Snapshot {
    let total_sources = outcomes.len();
    let mut failed = Vec::new();
    let mut groups = Vec::with_capacity(total_sources);

    for outcome in outcomes {
        match outcome.result {
            Ok(items) => groups.push((outcome.id, items)),
            Err(_) => {
                failed.push(outcome.id);
                groups.push((outcome.id, Vec::new()));
            }
        }
    }

    let sources: BTreeMap<SourceId, Vec<Item>> = dedupe_groups(groups).into_iter().collect();
    let total_items = sources.values().map(Vec::len).sum();

    Snapshot {
        date,
        last_updated: completed_at,
        collection_status: CollectionStatus {
            total_sources,
            successful: total_sources - failed.len(),
            failed,
            total_items,
        },
        sources,
    }
}

/// Remove items whose identity key was already seen, keeping the first.
pub fn dedupe(items: Vec<Item>) -> Vec<Item> {
    items.into_iter().unique_by(Item::identity_key).collect()
}

/// Deduplicate across per-source groups.
///
/// Groups are scanned in order and the first occurrence of each identity key
/// wins. Items are only ever dropped, never moved between groups.
pub fn dedupe_groups(groups: Vec<(SourceId, Vec<Item>)>) -> Vec<(SourceId, Vec<Item>)> {
    let mut seen = HashSet::new();
    groups
        .into_iter()
        .map(|(id, items)| {
            let kept = items
                .into_iter()
                .filter(|item| seen.insert(item.identity_key()))
                .collect();
            (id, kept)
        })
        .collect()
}
