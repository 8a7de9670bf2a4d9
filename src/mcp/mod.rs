//! Model Context Protocol (MCP) server for a queryable table.
//!
//! Exposes two tools, `query_table` and `describe_schema`, over JSON-RPC 2.0
//! on a single HTTP endpoint.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        MCP Server                        │
//! │                                                          │
//! │   ┌─────────────┐    ┌──────────────┐    ┌────────────┐  │
//! │   │    HTTP     │───▶│  Dispatcher  │───▶│   Tools    │  │
//! │   │   (axum)    │    │ (method tbl) │    │ (tool tbl) │  │
//! │   └─────────────┘    └──────────────┘    └────────────┘  │
//! │                                                │         │
//! │                 ┌──────────────┬───────────────┤         │
//! │                 ▼              ▼               ▼         │
//! │          ┌────────────┐ ┌─────────────┐ ┌────────────┐   │
//! │          │   Schema   │ │ TableSource │ │ Formatter  │   │
//! │          │  bridge /  │ │ (host fetch)│ │            │   │
//! │          │ deserialize│ └─────────────┘ └────────────┘   │
//! │          └────────────┘                                  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Protocol Version
//!
//! This implementation reports MCP protocol version 2025-06-18.

pub mod http;
pub mod protocol;
pub mod server;
pub mod tools;

pub use protocol::{
    JsonRpcError, JsonRpcRequest, JsonRpcResponse, OutgoingMessage, MCP_PROTOCOL_VERSION,
};
pub use server::McpServer;
