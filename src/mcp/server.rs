//! Stateless MCP dispatcher for a queryable table.
//!
//! The server is built once with its [`Schema`] and [`TableSource`] and then
//! answers every message independently: there is no session, no lifecycle
//! state, and nothing is retained between calls. The only side effect is the
//! single `fetch_page` call made by `query_table`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::ToolError;
use crate::mcp::protocol::{
    parse_message, JsonRpcError, JsonRpcRequest, JsonRpcResponse, OutgoingMessage,
    MCP_PROTOCOL_VERSION, SERVER_NAME,
};
use crate::mcp::tools::{self, QueryArgs, Tool, ToolCallParams, ToolCallResult, ToolDefinition};
use crate::schema::{deserialize_filters, input_schema, Schema};
use crate::source::{PageRequest, TableSource};

/// Protocol methods understood by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// `initialize`
    Initialize,
    /// `notifications/initialized`
    Initialized,
    /// `tools/list`
    ToolsList,
    /// `tools/call`
    ToolsCall,
}

/// Method name to method. Anything not listed is method-not-found.
const METHOD_TABLE: [(&str, Method); 4] = [
    ("initialize", Method::Initialize),
    ("notifications/initialized", Method::Initialized),
    ("tools/list", Method::ToolsList),
    ("tools/call", Method::ToolsCall),
];

impl Method {
    /// Looks up a method by its wire name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        METHOD_TABLE
            .iter()
            .find(|(candidate, _)| *candidate == name)
            .map(|(_, method)| *method)
    }
}

/// Server capabilities advertised during initialisation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ServerCapabilities {
    /// Tool-related capabilities.
    pub tools: ToolCapabilities,
}

/// Tool-specific capabilities.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ToolCapabilities {
    /// Whether the tool list can change. Always false: the schema is fixed.
    #[serde(rename = "listChanged", skip_serializing_if = "is_false")]
    pub list_changed: bool,
}

#[allow(clippy::trivially_copy_pass_by_ref)] // serde skip_serializing_if predicate
const fn is_false(b: &bool) -> bool {
    !*b
}

/// Server information for the initialisation response.
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Client information received during initialisation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientInfo {
    /// Client name.
    #[serde(default)]
    pub name: Option<String>,
    /// Client version.
    #[serde(default)]
    pub version: Option<String>,
}

/// Parameters for the initialize request. Every field is optional and the
/// requested version is never checked.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Protocol version requested by the client.
    #[serde(default)]
    pub protocol_version: Option<String>,
    /// Client capabilities.
    #[serde(default)]
    pub capabilities: Value,
    /// Client information.
    #[serde(default)]
    pub client_info: Option<ClientInfo>,
}

/// The MCP dispatcher.
pub struct McpServer {
    /// Filter schema.
    schema: Schema,
    /// Schema bridge output, computed once.
    filters_schema: Value,
    /// Host fetch operation.
    source: Arc<dyn TableSource>,
    /// What the rows are, for the `query_table` description.
    description: Option<String>,
}

impl McpServer {
    /// Creates a server over `source`, advertising `schema`.
    #[must_use]
    pub fn new(schema: Schema, source: Arc<dyn TableSource>) -> Self {
        let filters_schema = input_schema(&schema);
        Self {
            schema,
            filters_schema,
            source,
            description: None,
        }
    }

    /// Sets a human-readable description of the table.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The `describe_schema` output.
    #[must_use]
    pub const fn describe_schema(&self) -> &Value {
        &self.filters_schema
    }

    /// The `tools/list` entries.
    #[must_use]
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        tools::tool_definitions(&self.filters_schema, self.description.as_deref())
    }

    /// Parses and handles one raw message.
    ///
    /// Returns `None` when no reply body should be sent.
    pub async fn handle_text(&self, text: &str) -> Option<OutgoingMessage> {
        match parse_message(text) {
            Ok(req) => self.handle_request(req).await,
            Err(error) => {
                tracing::debug!(code = error.error.code, "Rejected malformed message");
                Some(error.into())
            }
        }
    }

    /// Handles a parsed message, with or without an `id`.
    ///
    /// Returns `None` only for `notifications/initialized`; every other
    /// method gets a result or an error, echoing `id` (or `null`).
    pub async fn handle_request(&self, req: JsonRpcRequest) -> Option<OutgoingMessage> {
        let Some(method) = Method::from_name(&req.method) else {
            tracing::debug!(method = %req.method, id = ?req.id, "Unknown method");
            return Some(JsonRpcError::method_not_found(req.id, &req.method).into());
        };

        tracing::debug!(method = %req.method, id = ?req.id, "Handling request");

        let result = match method {
            Method::Initialize => Ok(Self::handle_initialize(req.params.as_ref())),
            Method::Initialized => {
                tracing::info!("Client initialised");
                return None;
            }
            Method::ToolsList => Ok(self.handle_tools_list()),
            Method::ToolsCall => self.handle_tools_call(req.params.as_ref()).await,
        };

        Some(match result {
            Ok(value) => JsonRpcResponse::success(req.id, value).into(),
            Err(error) => {
                tracing::debug!(id = ?req.id, error = %error, "Request failed");
                JsonRpcError::from_tool_error(req.id, &error).into()
            }
        })
    }

    /// Handles the initialize request.
    fn handle_initialize(params: Option<&Value>) -> Value {
        let params: InitializeParams = params
            .and_then(|p| serde_json::from_value(p.clone()).ok())
            .unwrap_or_default();

        tracing::info!(
            requested_version = params.protocol_version.as_deref().unwrap_or("<none>"),
            client = params
                .client_info
                .as_ref()
                .and_then(|c| c.name.as_deref())
                .unwrap_or("<unknown>"),
            "Initialize"
        );

        json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": ServerCapabilities::default(),
            "serverInfo": ServerInfo::default(),
        })
    }

    /// Handles the tools/list request.
    fn handle_tools_list(&self) -> Value {
        json!({
            "tools": self.tool_definitions(),
        })
    }

    /// Handles the tools/call request.
    async fn handle_tools_call(&self, params: Option<&Value>) -> Result<Value, ToolError> {
        let params: ToolCallParams = params
            .filter(|p| !p.is_null())
            .map(|p| serde_json::from_value(p.clone()))
            .transpose()
            .map_err(|e| ToolError::invalid_params(format!("Invalid tool call params: {e}")))?
            .ok_or_else(|| ToolError::invalid_params("Missing tool call params"))?;

        let tool =
            Tool::from_name(&params.name).ok_or_else(|| ToolError::ToolNotFound(params.name))?;

        let output = match tool {
            Tool::QueryTable => self.call_query_table(&params.arguments).await?,
            Tool::DescribeSchema => self.filters_schema.clone(),
        };

        let result = ToolCallResult::structured(output).map_err(|e| {
            tracing::error!(error = %e, "Failed to render tool output");
            ToolError::Internal("failed to render tool output".to_string())
        })?;

        serde_json::to_value(&result).map_err(|e| {
            tracing::error!(error = %e, "Failed to serialise tool call result");
            ToolError::Internal("failed to serialise result".to_string())
        })
    }

    /// Runs `query_table`: validate, deserialize, fetch, format.
    async fn call_query_table(&self, arguments: &Value) -> Result<Value, ToolError> {
        let args = QueryArgs::from_arguments(arguments)?;
        let filters = deserialize_filters(&self.schema, &args.filters)?;

        tracing::debug!(
            page = args.page,
            page_size = args.page_size,
            format = %args.format,
            filters = filters.len(),
            "query_table"
        );

        let request = PageRequest {
            filters,
            page: args.page,
            page_size: args.page_size,
        };

        let result = self.source.fetch_page(request).await.map_err(|e| {
            tracing::error!(error = %e, "Table source fetch failed");
            ToolError::Upstream(e)
        })?;

        args.format.apply(result).map_err(|e| {
            tracing::error!(error = %e, format = %args.format, "Failed to format result");
            ToolError::Internal(e.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use crate::mcp::protocol::{ErrorCode, RequestId};
    use crate::schema::FieldDescriptor;
    use crate::source::QueryResult;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records the last request and returns a fixed result.
    #[derive(Default)]
    struct RecordingSource {
        last: Mutex<Option<PageRequest>>,
        fail: bool,
    }

    #[async_trait]
    impl TableSource for RecordingSource {
        async fn fetch_page(&self, request: PageRequest) -> Result<QueryResult, SourceError> {
            *self.last.lock().unwrap() = Some(request);
            if self.fail {
                return Err(SourceError::Unavailable("connection refused".to_string()));
            }
            Ok(QueryResult {
                rows: vec![json!({ "id": 1 }).as_object().cloned().unwrap()],
                total: 1,
                facets: None,
            })
        }
    }

    fn schema() -> Schema {
        [
            ("createdAt", FieldDescriptor::Timestamp),
            ("level", FieldDescriptor::array(FieldDescriptor::literal(["info", "error"]))),
        ]
        .into_iter()
        .collect()
    }

    fn server(source: Arc<RecordingSource>) -> McpServer {
        McpServer::new(schema(), source)
    }

    fn call(id: i64, name: &str, arguments: Value) -> JsonRpcRequest {
        JsonRpcRequest::new(
            Some(RequestId::Number(id)),
            "tools/call",
            Some(json!({ "name": name, "arguments": arguments })),
        )
    }

    #[test]
    fn method_table_lookup() {
        assert_eq!(Method::from_name("initialize"), Some(Method::Initialize));
        assert_eq!(
            Method::from_name("notifications/initialized"),
            Some(Method::Initialized)
        );
        assert_eq!(Method::from_name("tools/list"), Some(Method::ToolsList));
        assert_eq!(Method::from_name("tools/call"), Some(Method::ToolsCall));
        assert_eq!(Method::from_name("ping"), None);
        assert_eq!(Method::from_name("resources/list"), None);
    }

    #[test]
    fn capabilities_serialise_empty_tools() {
        let value = serde_json::to_value(ServerCapabilities::default()).unwrap();
        assert_eq!(value, json!({ "tools": {} }));
    }

    #[test]
    fn describe_schema_is_bridge_output() {
        let server = server(Arc::default());
        assert_eq!(server.describe_schema(), &input_schema(&schema()));
    }

    #[tokio::test]
    async fn query_table_forwards_typed_request() {
        let source = Arc::new(RecordingSource::default());
        let server = server(Arc::clone(&source));

        let reply = server
            .handle_request(call(
                1,
                "query_table",
                json!({ "filters": { "createdAt": 1000, "level": ["error"] }, "page": 2 }),
            ))
            .await
            .unwrap();
        assert!(reply.error().is_none());

        let request = source.last.lock().unwrap().clone().unwrap();
        assert_eq!(request.page, 2);
        assert_eq!(request.page_size, 50);
        assert_eq!(
            request.filters["createdAt"]
                .as_timestamp()
                .unwrap()
                .timestamp_millis(),
            1000
        );
        assert_eq!(request.filters["level"].as_json(), Some(&json!(["error"])));
    }

    #[tokio::test]
    async fn invalid_params_never_reach_source() {
        let source = Arc::new(RecordingSource::default());
        let server = server(Arc::clone(&source));

        for arguments in [
            json!({ "page": 0 }),
            json!({ "format": "xml" }),
            json!({ "filters": { "createdAt": "yesterday" } }),
        ] {
            let reply = server
                .handle_request(call(1, "query_table", arguments))
                .await
                .unwrap();
            assert_eq!(reply.error().unwrap().code, ErrorCode::InvalidParams.code());
        }
        assert!(source.last.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn source_failure_is_upstream_error() {
        let source = Arc::new(RecordingSource {
            fail: true,
            ..RecordingSource::default()
        });
        let reply = server(source)
            .handle_request(call(5, "query_table", json!({})))
            .await
            .unwrap();

        let error = reply.error().unwrap();
        assert_eq!(error.code, ErrorCode::UpstreamFailure.code());
        assert!(error.message.contains("connection refused"));
    }

    #[tokio::test]
    async fn unknown_tool_is_tool_not_found() {
        let reply = server(Arc::default())
            .handle_request(call(2, "drop_table", json!({})))
            .await
            .unwrap();
        assert_eq!(reply.error().unwrap().code, ErrorCode::ToolNotFound.code());
    }

    #[tokio::test]
    async fn missing_call_params_is_invalid() {
        let req = JsonRpcRequest::new(Some(RequestId::Number(3)), "tools/call", None);
        let reply = server(Arc::default()).handle_request(req).await.unwrap();
        assert_eq!(reply.error().unwrap().code, ErrorCode::InvalidParams.code());
    }

    #[tokio::test]
    async fn describe_schema_ignores_arguments() {
        let server = server(Arc::default());
        let reply = server
            .handle_request(call(4, "describe_schema", json!({ "anything": true })))
            .await
            .unwrap();
        assert_eq!(
            reply.result().unwrap()["structuredContent"],
            *server.describe_schema()
        );
    }

    #[tokio::test]
    async fn initialized_request_has_no_body() {
        let server = server(Arc::default());
        let with_id =
            JsonRpcRequest::new(Some(RequestId::Number(9)), "notifications/initialized", None);
        assert!(server.handle_request(with_id).await.is_none());
        assert!(server
            .handle_text(r#"{"method":"notifications/initialized"}"#)
            .await
            .is_none());
    }

    #[tokio::test]
    async fn unknown_method_without_id_is_answered() {
        let server = server(Arc::default());
        for text in [r#"{"method":"ping"}"#, r#"{"jsonrpc":"2.0","method":"ping"}"#] {
            let reply = server.handle_text(text).await.unwrap();
            assert_eq!(reply.error().unwrap().code, ErrorCode::MethodNotFound.code());
            assert!(serde_json::to_value(&reply).unwrap()["id"].is_null());
        }
    }

    #[tokio::test]
    async fn other_notifications_are_answered() {
        let reply = server(Arc::default())
            .handle_text(r#"{"jsonrpc":"2.0","method":"notifications/cancelled"}"#)
            .await
            .unwrap();
        assert_eq!(reply.error().unwrap().code, ErrorCode::MethodNotFound.code());
    }

    #[tokio::test]
    async fn tools_list_without_id_is_answered() {
        let reply = server(Arc::default())
            .handle_text(r#"{"method":"tools/list"}"#)
            .await
            .unwrap();
        let value = serde_json::to_value(&reply).unwrap();
        assert!(value["id"].is_null());
        assert_eq!(value["result"]["tools"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn initialize_accepts_missing_params() {
        let req = JsonRpcRequest::new(
            Some(RequestId::Number(1)),
            "initialize",
            Some(json!("not an object")),
        );
        let reply = server(Arc::default()).handle_request(req).await.unwrap();
        let result = reply.result().unwrap();
        assert_eq!(result["protocolVersion"], MCP_PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], SERVER_NAME);
    }
}
