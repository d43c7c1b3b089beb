//! Configuration file management.
//!
//! Handles loading and saving TOML configuration files.

use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::{AppConfig, AppError, Result};

/// Default configuration file content.
const DEFAULT_CONFIG: &str = r#"# Quote Sync Configuration
# Auto-generated - edit as needed

[sync]
# Interval between syncs in seconds (default: 30)
interval_secs = 30

# Upper bound for a single remote call in seconds
timeout_secs = 10

# Whether sync is enabled
enabled = true

# Post newly added quotes to the server
push_on_add = true

# Number of server items that make up a snapshot
max_remote_items = 5

# Remote endpoint
endpoint = "https://jsonplaceholder.typicode.com/posts"

[storage]
# Database file inside the data directory
db_file = "quotes.db"

[paths]
# Custom data directory (optional, defaults to ~/.quote-sync)
# data_dir = "/custom/path"
"#;

/// Load configuration from the data directory or fall back to defaults.
///
/// An explicit `data_dir` overrides both the default location and any
/// `paths.data_dir` found in the file.
///
/// # Errors
/// Returns error if file exists but cannot be read or parsed.
pub fn load_config(data_dir: Option<&Path>) -> Result<AppConfig> {
    let config_path = config_file_path(data_dir);

    let mut config = if config_path.exists() {
        load_config_from_file(&config_path)?
    } else {
        AppConfig::default()
    };

    if let Some(dir) = data_dir {
        config.paths.data_dir = Some(dir.to_path_buf());
    }

    Ok(config)
}

/// Load configuration from a specific file.
///
/// # Errors
/// Returns error if file cannot be read or parsed.
pub fn load_config_from_file(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .map_err(|e| AppError::io(format!("Failed to read config file: {}", path.display()), e))?;

    toml::from_str(&content).map_err(|e| AppError::Config {
        message: format!("Failed to parse config file: {e}"),
    })
}

/// Save configuration to file.
///
/// # Errors
/// Returns error if file cannot be written.
pub fn save_config(config: &AppConfig) -> Result<()> {
    let config_path = config.config_file_path();

    // Ensure parent directory exists
    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| AppError::io("Failed to create config directory", e))?;
    }

    let content = toml::to_string_pretty(config).map_err(|e| AppError::Config {
        message: format!("Failed to serialize config: {e}"),
    })?;

    fs::write(&config_path, content).map_err(|e| {
        AppError::io(
            format!("Failed to write config file: {}", config_path.display()),
            e,
        )
    })?;

    tracing::info!(path = %config_path.display(), "Configuration saved");

    Ok(())
}

/// Create default configuration file if it doesn't exist.
///
/// Returns the path of the configuration file.
///
/// # Errors
/// Returns error if file cannot be created.
pub fn ensure_config_exists(data_dir: Option<&Path>) -> Result<PathBuf> {
    let config_path = config_file_path(data_dir);

    if !config_path.exists() {
        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::io("Failed to create config directory", e))?;
        }

        fs::write(&config_path, DEFAULT_CONFIG)
            .map_err(|e| AppError::io("Failed to create default config", e))?;

        tracing::info!(path = %config_path.display(), "Created default configuration");
    }

    Ok(config_path)
}

/// Get the path to the configuration file.
#[must_use]
pub fn config_file_path(data_dir: Option<&Path>) -> PathBuf {
    data_dir
        .map_or_else(AppConfig::default_data_dir, Path::to_path_buf)
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_parses() {
        let config: AppConfig = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.sync.interval_secs, 30);
        assert_eq!(config.sync.timeout_secs, 10);
        assert_eq!(config.sync.max_remote_items, 5);
        assert_eq!(config.storage.db_file, "quotes.db");
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: AppConfig = toml::from_str("[sync]\ninterval_secs = 5\n").unwrap();
        assert_eq!(config.sync.interval_secs, 5);
        assert!(config.sync.push_on_add);
        assert_eq!(config.sync.max_remote_items, 5);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();

        let mut config = AppConfig::default();
        config.paths.data_dir = Some(dir.path().to_path_buf());
        config.sync.interval_secs = 90;

        save_config(&config).unwrap();

        let loaded = load_config(Some(dir.path())).unwrap();
        assert_eq!(loaded.sync.interval_secs, 90);
        assert_eq!(loaded.data_dir(), dir.path());
    }

    #[test]
    fn test_ensure_config_exists_writes_once() {
        let dir = tempdir().unwrap();

        let path = ensure_config_exists(Some(dir.path())).unwrap();
        assert!(path.exists());

        fs::write(&path, "[sync]\ninterval_secs = 7\n").unwrap();
        ensure_config_exists(Some(dir.path())).unwrap();

        let loaded = load_config(Some(dir.path())).unwrap();
        assert_eq!(loaded.sync.interval_secs, 7);
    }

    #[test]
    fn test_invalid_config_is_reported() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("config.toml"), "not = [valid").unwrap();

        assert!(matches!(
            load_config(Some(dir.path())),
            Err(AppError::Config { .. })
        ));
    }
}
