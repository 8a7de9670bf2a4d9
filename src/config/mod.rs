//! Configuration file loading and parsing.
//!
//! This module handles loading the configuration file from disk and parsing
//! it into validated, type-safe structures.
//!
//! # Configuration File Locations
//!
//! The configuration file is searched in the following order:
//!
//! 1. Path given as the `CONFIG_FILE` CLI argument
//! 2. Default location:
//!    - **Linux/macOS:** `~/.table-query-mcp/config.json`
//!    - **Windows:** `%USERPROFILE%\.table-query-mcp\config.json`
//!
//! # Example Configuration
//!
//! See `config/example-config.json` for a complete example.

mod settings;

pub use settings::{Config, LoggingConfig, ServerConfig, TableConfig};

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Returns the default configuration directory.
///
/// - **Linux/macOS:** `~/.table-query-mcp/`
/// - **Windows:** `%USERPROFILE%\.table-query-mcp\`
#[must_use]
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|p| p.join(".table-query-mcp"))
}

/// Returns the platform-specific default configuration file path.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    default_config_dir().map(|p| p.join("config.json"))
}

/// Loads and parses the configuration file.
///
/// If `path` is `None`, uses the platform-specific default location. A
/// relative `table.data_path` is resolved against the directory holding the
/// configuration file, not the working directory.
///
/// # Errors
///
/// Returns an error if:
/// - The configuration file cannot be found
/// - The file cannot be read
/// - The JSON is malformed
/// - Required fields are missing or invalid
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let config_path = match path {
        Some(p) => p.to_path_buf(),
        None => default_config_path().ok_or_else(|| ConfigError::NotFound {
            path: PathBuf::from("<default config path>"),
        })?,
    };

    if !config_path.exists() {
        return Err(ConfigError::NotFound { path: config_path });
    }

    let contents = std::fs::read_to_string(&config_path).map_err(|e| ConfigError::ReadError {
        path: config_path.clone(),
        source: e,
    })?;

    let mut config: Config =
        serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: config_path.clone(),
            source: e,
        })?;

    config.validate()?;

    if let Some(dir) = config_path.parent() {
        config.table.resolve_data_path(dir);
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_dir_exists() {
        assert!(default_config_dir().is_some());
    }

    #[test]
    fn default_config_path_exists() {
        let path = default_config_path();
        assert!(path.is_some());
        assert!(path.unwrap().to_string_lossy().contains("config.json"));
    }

    fn write_config(dir: &Path, contents: &str) -> PathBuf {
        let path = dir.join("config.json");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn load_valid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"{ "table": { "data_path": "rows.json", "facets": ["level"] } }"#,
        );

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.table.facets, ["level"]);
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.table.data_path, dir.path().join("rows.json"));
    }

    #[test]
    fn load_keeps_absolute_data_path() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("elsewhere").join("rows.csv");
        let json = serde_json::json!({ "table": { "data_path": data } }).to_string();
        let path = write_config(dir.path(), &json);

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.table.data_path, data);
    }

    #[test]
    fn load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(Some(&dir.path().join("absent.json"))).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn load_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(dir.path(), "{ not json");
        let err = load_config(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn load_runs_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"{ "server": { "path": "mcp" }, "table": { "data_path": "rows.json" } }"#,
        );
        let err = load_config(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));
    }
}
