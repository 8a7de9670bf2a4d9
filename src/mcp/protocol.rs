//! JSON-RPC 2.0 envelope types.
//!
//! Every HTTP request body carries exactly one message of the form
//! `{ jsonrpc?, id?, method, params? }`. Messages without an `id` are still
//! dispatched and answered with `"id": null`; only
//! `notifications/initialized` produces no reply body.
//!
//! Request IDs are strings or integers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ToolError;

/// The MCP protocol version reported by `initialize`.
pub const MCP_PROTOCOL_VERSION: &str = "2025-06-18";

/// Server name reported by `initialize`.
pub const SERVER_NAME: &str = "table-query-mcp";

/// The only `jsonrpc` value accepted when the field is present.
pub const JSONRPC_VERSION: &str = "2.0";

/// A JSON-RPC 2.0 request ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric request ID.
    Number(i64),
    /// String request ID.
    String(String),
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

/// An incoming JSON-RPC message.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol marker. May be omitted; must be "2.0" when present.
    #[serde(default)]
    pub jsonrpc: Option<String>,

    /// Request identifier, echoed in the reply. Absent or `null` replies with `null`.
    #[serde(default)]
    pub id: Option<RequestId>,

    /// The method to invoke.
    pub method: String,

    /// Optional method parameters.
    #[serde(default)]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Creates a 2.0 request.
    #[must_use]
    pub fn new(id: Option<RequestId>, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: Some(JSONRPC_VERSION.to_string()),
            id,
            method: method.into(),
            params,
        }
    }
}

/// A successful JSON-RPC 2.0 response.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    /// Always "2.0".
    pub jsonrpc: &'static str,

    /// The request ID this response corresponds to; `null` when the request had none.
    pub id: Option<RequestId>,

    /// The method result.
    pub result: Value,
}

impl JsonRpcResponse {
    /// Creates a new success response.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Value is not const-compatible
    pub fn success(id: Option<RequestId>, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result,
        }
    }
}

/// JSON-RPC error codes used by this server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Invalid JSON was received.
    ParseError,
    /// The JSON is not a valid request object.
    InvalidRequest,
    /// The method does not exist.
    MethodNotFound,
    /// Invalid method or tool parameters.
    InvalidParams,
    /// Internal error while building the reply.
    InternalError,
    /// The table source failed.
    UpstreamFailure,
    /// `tools/call` named an unknown tool.
    ToolNotFound,
}

impl ErrorCode {
    /// Returns the numeric code.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
            Self::UpstreamFailure => -32000,
            Self::ToolNotFound => -32001,
        }
    }

    /// Returns the default message for this code.
    #[must_use]
    pub const fn default_message(self) -> &'static str {
        match self {
            Self::ParseError => "Parse error",
            Self::InvalidRequest => "Invalid Request",
            Self::MethodNotFound => "Method not found",
            Self::InvalidParams => "Invalid params",
            Self::InternalError => "Internal error",
            Self::UpstreamFailure => "Upstream failure",
            Self::ToolNotFound => "Tool not found",
        }
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcErrorData {
    /// The error code.
    pub code: i32,

    /// A short description of the error.
    pub message: String,
}

impl JsonRpcErrorData {
    /// Creates an error carrying the code's default message.
    #[must_use]
    pub fn from_code(code: ErrorCode) -> Self {
        Self::with_message(code, code.default_message())
    }

    /// Creates an error with a custom message.
    #[must_use]
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            message: message.into(),
        }
    }
}

/// A JSON-RPC 2.0 error response.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcError {
    /// Always "2.0".
    pub jsonrpc: &'static str,

    /// The request ID; serialised as `null` when it is unknown or was absent.
    pub id: Option<RequestId>,

    /// The error details.
    pub error: JsonRpcErrorData,
}

impl JsonRpcError {
    /// Creates a new error response.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // JsonRpcErrorData contains String
    pub fn new(id: Option<RequestId>, error: JsonRpcErrorData) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            error,
        }
    }

    /// Parse error; the ID cannot be known.
    #[must_use]
    pub fn parse_error() -> Self {
        Self::new(None, JsonRpcErrorData::from_code(ErrorCode::ParseError))
    }

    /// Invalid request error.
    #[must_use]
    pub fn invalid_request(id: Option<RequestId>) -> Self {
        Self::new(id, JsonRpcErrorData::from_code(ErrorCode::InvalidRequest))
    }

    /// Method not found error.
    #[must_use]
    pub fn method_not_found(id: Option<RequestId>, method: &str) -> Self {
        Self::new(
            id,
            JsonRpcErrorData::with_message(
                ErrorCode::MethodNotFound,
                format!("Method not found: {method}"),
            ),
        )
    }

    /// Converts a tool failure into the matching error response.
    #[must_use]
    pub fn from_tool_error(id: Option<RequestId>, error: &ToolError) -> Self {
        let code = match error {
            ToolError::InvalidParams(_) => ErrorCode::InvalidParams,
            ToolError::ToolNotFound(_) => ErrorCode::ToolNotFound,
            ToolError::Upstream(_) => ErrorCode::UpstreamFailure,
            ToolError::Internal(_) => ErrorCode::InternalError,
        };
        Self::new(id, JsonRpcErrorData::with_message(code, error.to_string()))
    }
}

/// A reply body: either a result or an error.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum OutgoingMessage {
    /// Successful reply.
    Response(JsonRpcResponse),
    /// Error reply.
    Error(JsonRpcError),
}

impl OutgoingMessage {
    /// Returns the error object, if this is an error reply.
    #[must_use]
    pub const fn error(&self) -> Option<&JsonRpcErrorData> {
        match self {
            Self::Response(_) => None,
            Self::Error(err) => Some(&err.error),
        }
    }

    /// Returns the result, if this is a success reply.
    #[must_use]
    pub const fn result(&self) -> Option<&Value> {
        match self {
            Self::Response(resp) => Some(&resp.result),
            Self::Error(_) => None,
        }
    }
}

impl From<JsonRpcResponse> for OutgoingMessage {
    fn from(response: JsonRpcResponse) -> Self {
        Self::Response(response)
    }
}

impl From<JsonRpcError> for OutgoingMessage {
    fn from(error: JsonRpcError) -> Self {
        Self::Error(error)
    }
}

/// Parses one JSON-RPC message.
///
/// # Errors
///
/// Returns a parse error for malformed JSON and an invalid-request error for
/// JSON that is not a request object.
pub fn parse_message(json: &str) -> Result<JsonRpcRequest, JsonRpcError> {
    let value: Value = serde_json::from_str(json).map_err(|_| JsonRpcError::parse_error())?;
    parse_value(value)
}

/// Parses an already-decoded JSON value into a request.
///
/// # Errors
///
/// Returns an invalid-request error if the value is not an object, lacks a
/// string `method`, has an `id` that is neither string nor integer, or carries
/// a `jsonrpc` other than "2.0". The `id` is kept in the error when known.
pub fn parse_value(value: Value) -> Result<JsonRpcRequest, JsonRpcError> {
    if !value.is_object() {
        return Err(JsonRpcError::invalid_request(None));
    }

    let request: JsonRpcRequest =
        serde_json::from_value(value).map_err(|_| JsonRpcError::invalid_request(None))?;

    let wrong_version = matches!(request.jsonrpc.as_deref(), Some(v) if v != JSONRPC_VERSION);

    if wrong_version || request.method.is_empty() {
        return Err(JsonRpcError::invalid_request(request.id));
    }

    Ok(request)
}
