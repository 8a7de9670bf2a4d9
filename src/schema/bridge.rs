//! Schema bridge: field descriptors to JSON Schema.
//!
//! The output is advertised as the `filters` property of the `query_table`
//! tool and returned verbatim by `describe_schema`.

use serde_json::{json, Map, Value};

use super::{FieldDescriptor, Schema};

/// Description attached to every timestamp field.
pub const TIMESTAMP_DESCRIPTION: &str = "Unix timestamp in milliseconds";

/// Converts a whole schema into an object schema, one property per field.
#[must_use]
pub fn input_schema(schema: &Schema) -> Value {
    let properties: Map<String, Value> = schema
        .iter()
        .map(|(name, descriptor)| (name.to_string(), field_schema(descriptor)))
        .collect();

    json!({
        "type": "object",
        "properties": properties,
    })
}

/// Converts a single descriptor into its JSON Schema shape.
#[must_use]
pub fn field_schema(descriptor: &FieldDescriptor) -> Value {
    match descriptor {
        FieldDescriptor::String => json!({ "type": "string" }),
        FieldDescriptor::Number => json!({ "type": "number" }),
        FieldDescriptor::Boolean => json!({ "type": "boolean" }),
        FieldDescriptor::Timestamp => json!({
            "type": "number",
            "description": TIMESTAMP_DESCRIPTION,
        }),
        FieldDescriptor::StringLiteral { values } => json!({
            "type": "string",
            "enum": values,
        }),
        FieldDescriptor::Array { item } => json!({
            "type": "array",
            "items": field_schema(item),
        }),
        FieldDescriptor::Sort => json!({
            "type": "object",
            "properties": {
                "id": { "type": "string" },
                "desc": { "type": "boolean" },
            },
            "required": ["id", "desc"],
        }),
    }
}
