//! Runtime settings.
//!
//! Settings come from an optional YAML file; every field has a default, so
//! an empty file (or no file) is valid. Command-line flags are applied on top
//! with [`Settings::with_overrides`].
//!
//! ```yaml
//! data_dir: /var/lib/eternal-news
//! retention_days: 14
//! timeout_secs: 20
//! ```

use crate::error::ConfigError;
use crate::retry::RetryPolicy;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

pub const DEFAULT_USER_AGENT: &str = "Eternal-AI-News-Bot/1.0 (+https://github.com/eternal)";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub retention_days: usize,
    pub user_agent: String,
    /// Per-request timeout, enforced by the HTTP client.
    pub timeout_secs: u64,
    pub max_attempts: usize,
    pub base_delay_secs: u64,
    pub max_jitter_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            retention_days: 7,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 30,
            max_attempts: 3,
            base_delay_secs: 2,
            max_jitter_ms: 250,
        }
    }
}

impl Settings {
    /// Load settings from `path`, or defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let settings = match path {
            None => Self::default(),
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                let settings = Self::from_yaml(&raw).map_err(|source| ConfigError::Parse {
                    path: path.to_path_buf(),
                    source,
                })?;
                info!(path = %path.display(), "Loaded settings");
                settings
            }
        };
        settings.validate()?;
        Ok(settings)
    }

    fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw)
    }

    /// Apply command-line overrides.
    pub fn with_overrides(mut self, data_dir: Option<PathBuf>, retention_days: Option<usize>) -> Self {
        if let Some(dir) = data_dir {
            self.data_dir = dir;
        }
        if let Some(days) = retention_days {
            self.retention_days = days;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retention_days < 1 {
            return Err(ConfigError::Invalid("retention_days must be at least 1".into()));
        }
        if self.max_attempts < 1 {
            return Err(ConfigError::Invalid("max_attempts must be at least 1".into()));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeout_secs must be positive".into()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_secs(self.base_delay_secs),
            max_jitter: Duration::from_millis(self.max_jitter_ms),
        }
    }
}
