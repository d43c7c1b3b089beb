//! Sync-related domain models and configuration.
//!
//! Contains the application configuration and the state tracked across
//! synchronization cycles.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default remote endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://jsonplaceholder.typicode.com/posts";

/// Configuration for remote synchronization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Interval between sync operations in seconds.
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Upper bound for a single remote call in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Whether sync is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Whether newly added quotes are posted to the remote endpoint.
    #[serde(default = "default_true")]
    pub push_on_add: bool,

    /// How many remote items make up a snapshot.
    #[serde(default = "default_max_remote_items")]
    pub max_remote_items: usize,

    /// Remote endpoint URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            timeout_secs: default_timeout(),
            enabled: default_true(),
            push_on_add: default_true(),
            max_remote_items: default_max_remote_items(),
            endpoint: default_endpoint(),
        }
    }
}

impl SyncConfig {
    /// Poll interval as a `Duration`, never zero.
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    /// Per-call timeout as a `Duration`, never zero.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

const fn default_interval() -> u64 {
    30
}

const fn default_timeout() -> u64 {
    10
}

const fn default_true() -> bool {
    true
}

const fn default_max_remote_items() -> usize {
    5
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

/// Configuration for persistent storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Database file name inside the data directory.
    #[serde(default = "default_db_file")]
    pub db_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_file: default_db_file(),
        }
    }
}

fn default_db_file() -> String {
    "quotes.db".to_string()
}

/// Path configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PathConfig {
    /// Base data directory.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

/// Complete application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Remote sync configuration.
    #[serde(default)]
    pub sync: SyncConfig,

    /// Storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Path configuration.
    #[serde(default)]
    pub paths: PathConfig,
}

impl AppConfig {
    /// Get the data directory, using default if not configured.
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.paths
            .data_dir
            .clone()
            .unwrap_or_else(Self::default_data_dir)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".quote-sync")
    }

    /// Get the storage database path.
    #[must_use]
    pub fn storage_db_path(&self) -> PathBuf {
        self.data_dir().join(&self.storage.db_file)
    }

    /// Get the config file path.
    #[must_use]
    pub fn config_file_path(&self) -> PathBuf {
        self.data_dir().join("config.toml")
    }
}

/// Current state of synchronization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncState {
    /// Last successful fetch timestamp.
    pub last_sync: Option<DateTime<Utc>>,

    /// Number of completed sync attempts (successful or not).
    pub attempts: u64,

    /// Number of times the remote snapshot replaced local quotes.
    pub replacements: u64,

    /// Whether a sync is currently in progress.
    pub is_syncing: bool,

    /// Last error message if any.
    pub last_error: Option<String>,
}

impl SyncState {
    /// Mark sync as in progress.
    #[must_use]
    pub const fn syncing(mut self) -> Self {
        self.is_syncing = true;
        self
    }

    /// Mark sync as completed successfully.
    #[must_use]
    pub fn completed(mut self, replaced: bool) -> Self {
        self.is_syncing = false;
        self.attempts += 1;
        self.last_sync = Some(Utc::now());
        self.last_error = None;
        if replaced {
            self.replacements += 1;
        }
        self
    }

    /// Set error state.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.is_syncing = false;
        self.attempts += 1;
        self.last_error = Some(error.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.sync.interval_secs, 30);
        assert_eq!(config.sync.max_remote_items, 5);
        assert!(config.sync.enabled);
        assert!(config.sync.push_on_add);
        assert_eq!(config.sync.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.storage.db_file, "quotes.db");
    }

    #[test]
    fn test_zero_durations_are_clamped() {
        let config = SyncConfig {
            interval_secs: 0,
            timeout_secs: 0,
            ..SyncConfig::default()
        };
        assert_eq!(config.interval(), Duration::from_secs(1));
        assert_eq!(config.timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_sync_state_transitions() {
        let state = SyncState::default().syncing().completed(true);
        assert!(!state.is_syncing);
        assert!(state.last_sync.is_some());
        assert_eq!(state.replacements, 1);

        let state = state.syncing().with_error("timed out");
        assert_eq!(state.attempts, 2);
        assert_eq!(state.last_error.as_deref(), Some("timed out"));

        let state = state.completed(false);
        assert!(state.last_error.is_none());
        assert_eq!(state.replacements, 1);
    }

    #[test]
    fn test_paths_follow_data_dir() {
        let config = AppConfig {
            paths: PathConfig {
                data_dir: Some(PathBuf::from("/tmp/qs")),
            },
            ..AppConfig::default()
        };
        assert_eq!(config.storage_db_path(), PathBuf::from("/tmp/qs/quotes.db"));
        assert_eq!(config.config_file_path(), PathBuf::from("/tmp/qs/config.toml"));
    }
}
