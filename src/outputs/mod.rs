//! The on-disk store of dated snapshots.
//!
//! # Submodules
//!
//! - [`json`]: Atomic JSON writes and reads of snapshots and the manifest
//! - [`indexes`]: Date discovery, retention planning and the manifest rebuild
//!
//! # Store Layout
//!
//! ```text
//! data_dir/
//! ├── 2025-10-19.json   # one snapshot per retained date
//! ├── 2025-10-18.json
//! ├── today.json        # byte-identical copy of the latest run's snapshot
//! └── index.json        # manifest of retained dates, newest first
//! ```
//!
//! Every file is written to a sibling `*.json.tmp` first and renamed into
//! place, so readers never observe a half-written file and a failed run
//! leaves the previous files intact.

use std::path::{Path, PathBuf};

pub mod indexes;
pub mod json;

pub const LATEST_FILE: &str = "today.json";
pub const MANIFEST_FILE: &str = "index.json";

/// Handle to a store directory.
#[derive(Debug, Clone)]
pub struct Store {
    data_dir: PathBuf,
}

impl Store {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn latest_path(&self) -> PathBuf {
        self.data_dir.join(LATEST_FILE)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.data_dir.join(MANIFEST_FILE)
    }
}
