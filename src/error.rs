//! Error types for every stage of a collection run.
//!
//! Errors are layered the same way the pipeline is:
//!
//! - [`FetchError`]: what a single adapter attempt can fail with. The retry
//!   executor inspects [`FetchError::is_transient`] to decide whether another
//!   attempt is worthwhile.
//! - [`SourceError`]: the per-source verdict the orchestrator records once the
//!   executor gives up. It never aborts the run.
//! - [`InvalidItem`]: a single malformed record; the parser drops it and
//!   keeps going.
//! - [`StoreError`]: filesystem or serialization failure while touching the
//!   store. Fatal for the run.
//! - [`PipelineError`]: what [`crate::pipeline::Pipeline::run`] surfaces to
//!   its caller.

use crate::models::SourceId;
use std::path::PathBuf;

/// Failure of one adapter attempt.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("could not connect to {url}: {reason}")]
    Connect { url: String, reason: String },

    #[error("transport error for {url}: {reason}")]
    Transport { url: String, reason: String },

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("unexpected content: {0}")]
    Parse(String),
}

impl FetchError {
    /// Whether retrying the same request could plausibly succeed.
    ///
    /// Timeouts, connection/transport errors, `5xx` and `429` are transient.
    /// Other HTTP statuses and parse failures are not: the content already
    /// received will not change on a second read.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Timeout { .. }
            | FetchError::Connect { .. }
            | FetchError::Transport { .. } => true,
            FetchError::Status { status, .. } => *status >= 500 || *status == 429,
            FetchError::Parse(_) => false,
        }
    }

    pub fn from_reqwest(url: &str, e: reqwest::Error) -> Self {
        let url = url.to_string();
        if e.is_timeout() {
            FetchError::Timeout { url }
        } else if e.is_connect() {
            FetchError::Connect {
                url,
                reason: e.to_string(),
            }
        } else if let Some(status) = e.status() {
            FetchError::Status {
                status: status.as_u16(),
                url,
            }
        } else {
            FetchError::Transport {
                url,
                reason: e.to_string(),
            }
        }
    }
}

/// Per-source outcome recorded by the orchestrator when a source yields nothing.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("{source_id} unavailable after {attempts} attempt(s): {reason}")]
    Unavailable {
        source_id: SourceId,
        attempts: usize,
        reason: String,
    },

    #[error("{source_id} returned unparseable content: {reason}")]
    Parse { source_id: SourceId, reason: String },

    #[error("{source_id} skipped: run cancelled")]
    Cancelled { source_id: SourceId },
}

impl SourceError {
    pub fn source_id(&self) -> SourceId {
        match self {
            SourceError::Unavailable { source_id, .. }
            | SourceError::Parse { source_id, .. }
            | SourceError::Cancelled { source_id } => *source_id,
        }
    }
}

/// A record rejected at construction time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid item: {0}")]
pub struct InvalidItem(pub String);

/// Filesystem or serialization failure while reading or writing the store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not serialize {what}: {source}")]
    Serialize {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not parse {path}: {source}")]
    Deserialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Settings file could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid setting: {0}")]
    Invalid(String),
}

/// Run-level failure surfaced to the scheduler.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("run cancelled before the store was written")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        let url = "https://example.com".to_string();
        assert!(FetchError::Timeout { url: url.clone() }.is_transient());
        assert!(
            FetchError::Connect {
                url: url.clone(),
                reason: "refused".into()
            }
            .is_transient()
        );
        assert!(
            FetchError::Status {
                status: 503,
                url: url.clone()
            }
            .is_transient()
        );
        assert!(
            FetchError::Status {
                status: 429,
                url: url.clone()
            }
            .is_transient()
        );
        assert!(
            !FetchError::Status {
                status: 404,
                url: url.clone()
            }
            .is_transient()
        );
        assert!(!FetchError::Parse("no items".into()).is_transient());
    }

    #[test]
    fn test_source_error_carries_source_id() {
        let err = SourceError::Parse {
            source_id: SourceId::Crescendo,
            reason: "no items".into(),
        };
        assert_eq!(err.source_id(), SourceId::Crescendo);
        assert!(err.to_string().contains("crescendo"));
    }
}
