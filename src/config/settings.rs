//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;
use crate::mcp::http::DEFAULT_PATH;
use crate::schema::Schema;

/// Root configuration structure.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// HTTP endpoint settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// The table being served.
    pub table: TableConfig,

    /// Filter schema advertised to agents.
    #[serde(default)]
    pub schema: Schema,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.socket_addr()?;

        if !self.server.path.starts_with('/') {
            return Err(ConfigError::ValidationError {
                message: format!("server.path '{}' must start with '/'", self.server.path),
            });
        }

        if self.table.data_path.as_os_str().is_empty() {
            return Err(validation("table.data_path cannot be empty"));
        }

        if self.table.facets.iter().any(String::is_empty) {
            return Err(validation("table.facets cannot contain empty column names"));
        }

        self.schema.check().map_err(|message| ConfigError::ValidationError { message })
    }
}

fn validation(message: &str) -> ConfigError {
    ConfigError::ValidationError {
        message: message.to_string(),
    }
}

/// HTTP endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to listen on, e.g. `127.0.0.1:8080`.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Route of the JSON-RPC endpoint.
    #[serde(default = "default_path")]
    pub path: String,
}

impl ServerConfig {
    /// Parses `bind` as a socket address.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `bind` is not `host:port`.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .parse()
            .map_err(|_| ConfigError::ValidationError {
                message: format!("server.bind '{}' is not a valid socket address", self.bind),
            })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            path: default_path(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_path() -> String {
    DEFAULT_PATH.to_string()
}

/// Table configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableConfig {
    /// Short name of the table, used in logs.
    #[serde(default)]
    pub name: Option<String>,

    /// What the rows are; appended to the `query_table` description.
    #[serde(default)]
    pub description: Option<String>,

    /// JSON (array of objects) or `.csv` file holding the rows. Relative
    /// paths are resolved against the configuration file's directory.
    pub data_path: PathBuf,

    /// Columns to compute facets for.
    #[serde(default)]
    pub facets: Vec<String>,
}

impl TableConfig {
    /// Makes a relative `data_path` relative to `base`, the directory holding
    /// the configuration file. Absolute paths are left alone.
    pub fn resolve_data_path(&mut self, base: &Path) {
        if self.data_path.is_relative() {
            self.data_path = base.join(&self.data_path);
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldDescriptor;

    #[test]
    fn parse_minimal_config() {
        let json = r#"{ "table": { "data_path": "rows.json" } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert_eq!(config.server.path, "/mcp");
        assert!(config.schema.is_empty());
    }

    #[test]
    fn parse_full_config() {
        let json = r#"{
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "_comment": "Test config",
            "server": { "bind": "0.0.0.0:9000", "path": "/rpc" },
            "table": {
                "name": "logs",
                "description": "Application log lines",
                "data_path": "/var/data/logs.csv",
                "facets": ["level", "latency"]
            },
            "schema": {
                "level": { "type": "array", "item": { "type": "stringLiteral", "values": ["info", "error"] } },
                "createdAt": { "type": "array", "item": { "type": "timestamp" } },
                "sorting": { "type": "array", "item": { "type": "sort" } }
            },
            "logging": { "level": "debug" }
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.socket_addr().unwrap().port(), 9000);
        assert_eq!(config.server.path, "/rpc");
        assert_eq!(config.table.name.as_deref(), Some("logs"));
        assert_eq!(config.table.data_path, PathBuf::from("/var/data/logs.csv"));
        assert_eq!(config.table.facets, ["level", "latency"]);
        assert_eq!(
            config.schema.get("createdAt"),
            Some(&FieldDescriptor::array(FieldDescriptor::Timestamp))
        );
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn resolve_relative_data_path() {
        let mut table: TableConfig =
            serde_json::from_str(r#"{ "data_path": "data/rows.csv" }"#).unwrap();
        table.resolve_data_path(Path::new("/etc/table-query-mcp"));
        assert_eq!(
            table.data_path,
            PathBuf::from("/etc/table-query-mcp/data/rows.csv")
        );
    }

    #[test]
    fn keep_absolute_data_path() {
        let mut table: TableConfig =
            serde_json::from_str(r#"{ "data_path": "/srv/rows.json" }"#).unwrap();
        table.resolve_data_path(Path::new("/etc/table-query-mcp"));
        assert_eq!(table.data_path, PathBuf::from("/srv/rows.json"));
    }

    #[test]
    fn logging_config_defaults() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "warn");
    }

    #[test]
    fn reject_missing_table() {
        let result: Result<Config, _> = serde_json::from_str("{}");
        assert!(result.is_err());
    }

    #[test]
    fn reject_bad_bind() {
        let json = r#"{ "server": { "bind": "localhost" }, "table": { "data_path": "a.json" } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn reject_relative_path() {
        let json = r#"{ "server": { "path": "mcp" }, "table": { "data_path": "a.json" } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn reject_empty_literal_set() {
        let json = r#"{
            "table": { "data_path": "a.json" },
            "schema": { "level": { "type": "stringLiteral", "values": [] } }
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("level"));
    }

    #[test]
    fn reject_unknown_descriptor_kind() {
        let json = r#"{
            "table": { "data_path": "a.json" },
            "schema": { "where": { "type": "geopoint" } }
        }"#;
        let result: Result<Config, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn reject_unknown_fields() {
        let json = r#"{
            "table": { "data_path": "a.json" },
            "unknown_field": "value"
        }"#;

        let result: Result<Config, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }
}
