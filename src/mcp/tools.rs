//! Tool table, tool definitions, and `query_table` argument validation.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::ToolError;
use crate::format::OutputFormat;

/// Default `page` when the caller omits it.
pub const DEFAULT_PAGE: u64 = 1;

/// Default `pageSize` when the caller omits it.
pub const DEFAULT_PAGE_SIZE: u64 = 50;

/// Largest `pageSize` honoured; larger requests are clamped.
pub const MAX_PAGE_SIZE: u64 = 500;

/// The tools this server advertises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    /// Filtered, paginated, formatted row query.
    QueryTable,
    /// Returns the filter schema.
    DescribeSchema,
}

/// Tool name to tool, in advertised order.
const TOOL_TABLE: [(&str, Tool); 2] = [
    ("query_table", Tool::QueryTable),
    ("describe_schema", Tool::DescribeSchema),
];

impl Tool {
    /// Looks up a tool by its wire name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        TOOL_TABLE
            .iter()
            .find(|(candidate, _)| *candidate == name)
            .map(|(_, tool)| *tool)
    }

    /// Returns the wire name of this tool.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::QueryTable => "query_table",
            Self::DescribeSchema => "describe_schema",
        }
    }

    /// Every tool, in advertised order.
    pub fn all() -> impl Iterator<Item = Self> {
        TOOL_TABLE.into_iter().map(|(_, tool)| tool)
    }
}

/// A tool definition for the `tools/list` response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON Schema for the tool's arguments.
    pub input_schema: Value,
}

/// Parameters for a `tools/call` request.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallParams {
    /// Name of the tool to call.
    pub name: String,
    /// Tool arguments.
    #[serde(default)]
    pub arguments: Value,
}

/// Content item in a tool call response.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
}

/// Result of a successful tool call: the output as text and as structured JSON.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    /// Pretty-printed rendering of `structured_content`.
    pub content: Vec<ToolContent>,
    /// The tool output object.
    pub structured_content: Value,
}

impl ToolCallResult {
    /// Wraps a tool output object.
    ///
    /// # Errors
    ///
    /// Returns an error if the output cannot be rendered as text.
    pub fn structured(output: Value) -> Result<Self, serde_json::Error> {
        let text = serde_json::to_string_pretty(&output)?;
        Ok(Self {
            content: vec![ToolContent::Text { text }],
            structured_content: output,
        })
    }
}

/// Input schema for `query_table`: the filter schema plus paging and format.
#[must_use]
pub fn query_input_schema(filters: &Value) -> Value {
    json!({
        "type": "object",
        "properties": {
            "filters": filters,
            "page": {
                "type": "integer",
                "minimum": 1,
                "default": DEFAULT_PAGE,
                "description": "1-based page number"
            },
            "pageSize": {
                "type": "integer",
                "minimum": 1,
                "maximum": MAX_PAGE_SIZE,
                "default": DEFAULT_PAGE_SIZE,
                "description": format!("Rows per page (values above {MAX_PAGE_SIZE} are clamped)")
            },
            "format": {
                "type": "string",
                "enum": OutputFormat::names(),
                "default": OutputFormat::default().as_str(),
                "description": "json: rows and total. stats: rows, total and facet summaries. \
                                markdown: a table. csv: comma-separated values."
            }
        }
    })
}

/// Builds the `tools/list` entries.
///
/// `table_description`, when given, is appended to the `query_table`
/// description so agents know what the rows are.
#[must_use]
pub fn tool_definitions(filters: &Value, table_description: Option<&str>) -> Vec<ToolDefinition> {
    Tool::all()
        .map(|tool| match tool {
            Tool::QueryTable => {
                let mut description = String::from(
                    "Query the table with structured filters. Returns one page of rows and the \
                     total number of matching rows; the stats format adds facet summaries \
                     (value counts, min/max). Call describe_schema first to discover filters. \
                     Timestamps are Unix milliseconds.",
                );
                if let Some(extra) = table_description {
                    description.push_str("\n\n");
                    description.push_str(extra);
                }
                ToolDefinition {
                    name: tool.name().to_string(),
                    description,
                    input_schema: query_input_schema(filters),
                }
            }
            Tool::DescribeSchema => ToolDefinition {
                name: tool.name().to_string(),
                description: "Describe the filters accepted by query_table as a JSON Schema."
                    .to_string(),
                input_schema: json!({ "type": "object", "properties": {} }),
            },
        })
        .collect()
}

/// Validated `query_table` arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryArgs {
    /// Raw filters, not yet deserialized.
    pub filters: Map<String, Value>,
    /// 1-based page.
    pub page: u64,
    /// Rows per page, clamped to [`MAX_PAGE_SIZE`].
    pub page_size: u64,
    /// Requested output format.
    pub format: OutputFormat,
}

impl QueryArgs {
    /// Validates raw tool arguments. `null` fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::InvalidParams`] for a non-object argument set, a
    /// `page` or `pageSize` below 1 or not an integer, an unknown `format`,
    /// or `filters` that is not an object.
    pub fn from_arguments(arguments: &Value) -> Result<Self, ToolError> {
        let empty = Map::new();
        let args = match arguments {
            Value::Null => &empty,
            Value::Object(map) => map,
            _ => return Err(ToolError::invalid_params("Tool arguments must be an object")),
        };

        let page = positive_integer(args, "page")?.unwrap_or(DEFAULT_PAGE);
        let page_size = positive_integer(args, "pageSize")?
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(MAX_PAGE_SIZE);

        let format = match args.get("format") {
            None | Some(Value::Null) => OutputFormat::default(),
            Some(Value::String(name)) => name.parse().map_err(ToolError::InvalidParams)?,
            Some(_) => return Err(ToolError::invalid_params("format must be a string")),
        };

        let filters = match args.get("filters") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(_) => return Err(ToolError::invalid_params("filters must be an object")),
        };

        Ok(Self {
            filters,
            page,
            page_size,
            format,
        })
    }
}

/// Reads an optional integer ≥ 1. Integral floats are accepted.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // saturating, sign checked
fn positive_integer(args: &Map<String, Value>, key: &str) -> Result<Option<u64>, ToolError> {
    let Some(value) = args.get(key).filter(|v| !v.is_null()) else {
        return Ok(None);
    };

    let n = value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && *f >= 0.0)
            .map(|f| f as u64)
    });

    match n {
        Some(n) if n >= 1 => Ok(Some(n)),
        _ => Err(ToolError::invalid_params(format!(
            "{key} must be an integer >= 1"
        ))),
    }
}
