//! table-query-mcp: MCP server exposing a tabular data source to AI agents
//!
//! An agent discovers the filters a table accepts, then pages through the
//! rows matching them in the output format it prefers.
//!
//! # Architecture
//!
//! - **Schema**: a declarative field-type schema, rendered as JSON Schema for
//!   tool discovery and used to turn raw filter JSON into typed values
//! - **Source**: the [`source::TableSource`] seam that fetches one page of
//!   rows plus the total count and optional facets
//! - **Format**: json, stats, markdown and csv renderings of a page
//! - **MCP**: JSON-RPC 2.0 dispatch over a single HTTP endpoint
//!
//! # Modules
//!
//! - [`config`]: Configuration loading and validation
//! - [`error`]: Error types
//! - [`format`]: Result formatting
//! - [`mcp`]: MCP protocol implementation
//! - [`schema`]: Field-type model, JSON Schema bridge, filter deserialization
//! - [`source`]: Table sources

pub mod config;
pub mod error;
pub mod format;
pub mod mcp;
pub mod schema;
pub mod source;
