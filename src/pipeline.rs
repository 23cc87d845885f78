//! One end-to-end collection run.
//!
//! ```text
//! collect (concurrent, retried) -> dedupe -> persist <date>.json
//!     -> refresh today.json -> rebuild index.json -> prune
//! ```
//!
//! A dry run stops after collection. A run where no source succeeded writes
//! nothing, so the previous snapshot, alias and manifest stay valid.

use crate::collector::Collector;
use crate::error::PipelineError;
use crate::models::{Snapshot, SourceId};
use crate::outputs::Store;
use crate::retry::CancelFlag;
use crate::scrapers::SourceFetch;
use crate::utils::ensure_writable_dir;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{error, info, instrument, warn};

#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Calendar date the snapshot is filed under.
    pub date: NaiveDate,
    pub retention_days: usize,
    /// Collect and log, but never touch the store.
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every source produced items.
    Complete,
    /// At least one source succeeded and at least one failed.
    Partial,
    /// No source succeeded.
    TotalFailure,
}

/// What a run did, printed by the binary as one JSON line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub date: NaiveDate,
    pub outcome: RunOutcome,
    pub total_sources: usize,
    pub successful: usize,
    pub failed: Vec<SourceId>,
    pub total_items: usize,
    pub per_source: BTreeMap<SourceId, usize>,
    /// Whether the store was written.
    pub written: bool,
    /// Manifest contents after the run; empty when nothing was written.
    pub available_dates: Vec<NaiveDate>,
    pub pruned: Vec<NaiveDate>,
}

impl RunSummary {
    fn from_snapshot(snapshot: &Snapshot) -> Self {
        let status = &snapshot.collection_status;
        let outcome = if status.successful == 0 {
            RunOutcome::TotalFailure
        } else if status.failed.is_empty() {
            RunOutcome::Complete
        } else {
            RunOutcome::Partial
        };
        Self {
            date: snapshot.date,
            outcome,
            total_sources: status.total_sources,
            successful: status.successful,
            failed: status.failed.clone(),
            total_items: status.total_items,
            per_source: snapshot.counts().into_iter().collect(),
            written: false,
            available_dates: Vec::new(),
            pruned: Vec::new(),
        }
    }

    pub fn outcome(&self) -> RunOutcome {
        self.outcome
    }
}

/// Collector plus store, wired for a single run.
#[derive(Debug)]
pub struct Pipeline<S> {
    collector: Collector<S>,
    store: Store,
}

impl<S> Pipeline<S>
where
    S: SourceFetch,
{
    pub fn new(collector: Collector<S>, store: Store) -> Self {
        Self { collector, store }
    }

    fn cancel(&self) -> &CancelFlag {
        self.collector.cancel_flag()
    }

    /// Run one collection for `opts.date`.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::Store`] if the data directory is not writable or a
    ///   store write fails.
    /// - [`PipelineError::Cancelled`] if cancellation was observed before
    ///   anything was written.
    #[instrument(level = "info", skip_all, fields(date = %opts.date, dry_run = opts.dry_run))]
    pub async fn run(&self, opts: &RunOptions) -> Result<RunSummary, PipelineError> {
        let t0 = Instant::now();

        if !opts.dry_run {
            if let Err(e) = ensure_writable_dir(self.store.data_dir()).await {
                error!(
                    path = %self.store.data_dir().display(),
                    error = %e,
                    "Data directory is not writable (fix perms or choose a different path)"
                );
                return Err(e.into());
            }
        }

        let snapshot = self.collector.collect_all_sources(opts.date).await;

        if self.cancel().is_cancelled() {
            warn!("Run cancelled; store left untouched");
            return Err(PipelineError::Cancelled);
        }

        let mut summary = RunSummary::from_snapshot(&snapshot);

        if opts.dry_run {
            for (id, count) in &summary.per_source {
                info!(source = %id, count, "Dry run: would write items");
            }
            info!(total_items = summary.total_items, "Dry run complete; store not touched");
            return Ok(summary);
        }

        if summary.outcome == RunOutcome::TotalFailure {
            error!(
                failed = summary.failed.len(),
                "Every source failed; keeping previous store contents"
            );
            return Ok(summary);
        }

        self.store.persist(&snapshot).await?;
        self.store.refresh_latest(&snapshot).await?;
        let (manifest, pruned) = self
            .store
            .rebuild_manifest(opts.retention_days, Some(opts.date))
            .await?;

        summary.written = true;
        summary.available_dates = manifest.available_dates;
        summary.pruned = pruned;

        let elapsed = t0.elapsed();
        info!(
            ?elapsed,
            outcome = ?summary.outcome,
            total_items = summary.total_items,
            retained = summary.available_dates.len(),
            pruned = summary.pruned.len(),
            "Run complete"
        );
        Ok(summary)
    }
}
