//! Error types for table-query-mcp.
//!
//! Configuration errors stop the binary at startup. Tool errors are converted
//! into JSON-RPC error objects by the dispatcher and never crash the server.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration file: {path}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// Path where the configuration file was expected.
        path: PathBuf,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation failure.
        message: String,
    },
}

/// Errors raised by a table source while fetching a page.
#[derive(Error, Debug)]
pub enum SourceError {
    /// Table data could not be read from disk.
    #[error("failed to read table data: {path}")]
    Io {
        /// Path to the data file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Table data was not valid JSON.
    #[error("invalid JSON table data")]
    Json(#[from] serde_json::Error),

    /// Table data was not valid CSV.
    #[error("invalid CSV table data")]
    Csv(#[from] csv::Error),

    /// Table data parsed but had the wrong shape.
    #[error("invalid table data: {0}")]
    InvalidData(String),

    /// The backing store failed to answer the query.
    #[error("table source unavailable: {0}")]
    Unavailable(String),
}

/// Errors produced while handling a `tools/call` request.
#[derive(Error, Debug)]
pub enum ToolError {
    /// Tool arguments were missing, malformed, or out of range.
    #[error("{0}")]
    InvalidParams(String),

    /// No tool with this name exists.
    #[error("Unknown tool: {0}")]
    ToolNotFound(String),

    /// The table source returned an error.
    #[error("Table fetch failed: {0}")]
    Upstream(#[from] SourceError),

    /// The result could not be encoded.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors that stop the server after configuration has loaded.
#[derive(Error, Debug)]
pub enum ServeError {
    /// The table could not be loaded.
    #[error("failed to load table: {0}")]
    Load(#[from] SourceError),

    /// The listener could not be bound or the server failed.
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

impl ToolError {
    /// Shorthand for an invalid-params error.
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::InvalidParams(message.into())
    }
}
