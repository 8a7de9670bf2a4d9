//! HTTP transport for the MCP server.
//!
//! One `POST` route carries one JSON-RPC message per request:
//!
//! - `notifications/initialized` gets `204 No Content` with an empty body
//! - everything else gets `200 OK` with a JSON body, including JSON-RPC
//!   errors and messages sent without an `id`
//!
//! The body is read as raw bytes so malformed payloads still receive a
//! JSON-RPC parse error instead of a framework rejection.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};

use crate::mcp::protocol::JsonRpcError;
use crate::mcp::server::McpServer;

/// Default route for the JSON-RPC endpoint.
pub const DEFAULT_PATH: &str = "/mcp";

/// Builds the router serving `server` at `path`.
#[must_use]
pub fn router(server: Arc<McpServer>, path: &str) -> Router {
    Router::new()
        .route(path, post(handle_rpc))
        .with_state(server)
}

async fn handle_rpc(State(server): State<Arc<McpServer>>, body: Bytes) -> Response {
    let Ok(text) = std::str::from_utf8(&body) else {
        tracing::debug!("Rejected non-UTF-8 request body");
        return Json(JsonRpcError::parse_error()).into_response();
    };

    match server.handle_text(text).await {
        Some(reply) => Json(reply).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

/// Binds `addr` and serves until SIGINT/SIGTERM (Ctrl+C on Windows).
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(server: Arc<McpServer>, addr: SocketAddr, path: &str) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;
    tracing::info!(address = %local, path, "Listening for MCP requests");

    axum::serve(listener, router(server, path))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let (Ok(mut sigint), Ok(mut sigterm)) = (
        signal(SignalKind::interrupt()),
        signal(SignalKind::terminate()),
    ) else {
        tracing::warn!("Could not install signal handlers; shutdown requires killing the process");
        return std::future::pending().await;
    };

    tokio::select! {
        _ = sigint.recv() => tracing::info!("Received SIGINT, initiating graceful shutdown"),
        _ = sigterm.recv() => tracing::info!("Received SIGTERM, initiating graceful shutdown"),
    }
}

#[cfg(windows)]
async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("Received Ctrl+C, initiating graceful shutdown");
    } else {
        tracing::warn!("Could not listen for Ctrl+C; shutdown requires killing the process");
        std::future::pending::<()>().await;
    }
}
