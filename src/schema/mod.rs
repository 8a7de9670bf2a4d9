//! Field-type model for queryable tables.
//!
//! A [`Schema`] is an ordered map of filter name to [`FieldDescriptor`]. It is
//! built once (normally from the configuration file) and shared read-only by
//! the schema bridge, the filter deserializer, and the dispatcher.
//!
//! # Descriptor Kinds
//!
//! | Kind            | Wire value                     |
//! |-----------------|--------------------------------|
//! | `string`        | JSON string                    |
//! | `number`        | JSON number                    |
//! | `boolean`       | JSON boolean                   |
//! | `timestamp`     | Unix milliseconds (number)     |
//! | `stringLiteral` | one of a fixed set of strings  |
//! | `array`         | JSON array of the item kind    |
//! | `sort`          | `{ "id": string, "desc": bool }` |

pub mod bridge;
pub mod deserialize;

pub use bridge::{field_schema, input_schema};
pub use deserialize::{deserialize_filters, FilterValue, TypedFilterMap};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Declarative description of one filter's value type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FieldDescriptor {
    /// Free-form string.
    String,
    /// Any JSON number.
    Number,
    /// `true` or `false`.
    Boolean,
    /// Unix timestamp in milliseconds on the wire, a UTC date/time once typed.
    Timestamp,
    /// A string restricted to an enumerated set.
    StringLiteral {
        /// Allowed values, in advertised order.
        values: Vec<String>,
    },
    /// A list of values of the item kind.
    Array {
        /// Descriptor applied to every element.
        item: Box<FieldDescriptor>,
    },
    /// A sort specification: a column id and a descending flag.
    Sort,
}

impl FieldDescriptor {
    /// Creates a `stringLiteral` descriptor.
    #[must_use]
    pub fn literal<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::StringLiteral {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Creates an `array` descriptor around `item`.
    #[must_use]
    pub fn array(item: Self) -> Self {
        Self::Array {
            item: Box::new(item),
        }
    }

    /// Checks structural constraints that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns a description of the first problem found.
    pub fn check(&self) -> Result<(), String> {
        match self {
            Self::StringLiteral { values } => {
                if values.is_empty() {
                    return Err("stringLiteral must list at least one value".to_string());
                }
                for (i, value) in values.iter().enumerate() {
                    if values[..i].contains(value) {
                        return Err(format!("stringLiteral lists '{value}' more than once"));
                    }
                }
                Ok(())
            }
            Self::Array { item } => item.check(),
            Self::String | Self::Number | Self::Boolean | Self::Timestamp | Self::Sort => Ok(()),
        }
    }
}

/// Ordered mapping of filter name to descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    fields: IndexMap<String, FieldDescriptor>,
}

impl Schema {
    /// Looks up the descriptor for a filter name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.get(name)
    }

    /// Iterates fields in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldDescriptor)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of declared filters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if no filters are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Checks every descriptor.
    ///
    /// # Errors
    ///
    /// Returns a description naming the offending field.
    pub fn check(&self) -> Result<(), String> {
        for (name, descriptor) in &self.fields {
            if name.is_empty() {
                return Err("schema field names cannot be empty".to_string());
            }
            descriptor
                .check()
                .map_err(|e| format!("schema field '{name}': {e}"))?;
        }
        Ok(())
    }
}

impl<S: Into<String>> FromIterator<(S, FieldDescriptor)> for Schema {
    fn from_iter<I: IntoIterator<Item = (S, FieldDescriptor)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_every_kind() {
        let json = r#"{
            "message": { "type": "string" },
            "latency": { "type": "number" },
            "resolved": { "type": "boolean" },
            "createdAt": { "type": "timestamp" },
            "level": { "type": "stringLiteral", "values": ["info", "warn", "error"] },
            "tags": { "type": "array", "item": { "type": "string" } },
            "sort": { "type": "sort" }
        }"#;

        let schema: Schema = serde_json::from_str(json).unwrap();
        assert_eq!(schema.len(), 7);
        assert_eq!(schema.get("createdAt"), Some(&FieldDescriptor::Timestamp));
        assert_eq!(
            schema.get("level"),
            Some(&FieldDescriptor::literal(["info", "warn", "error"]))
        );
        assert_eq!(
            schema.get("tags"),
            Some(&FieldDescriptor::array(FieldDescriptor::String))
        );
        assert!(schema.check().is_ok());
    }

    #[test]
    fn preserves_declaration_order() {
        let json = r#"{
            "zeta": { "type": "string" },
            "alpha": { "type": "number" },
            "mid": { "type": "sort" }
        }"#;

        let schema: Schema = serde_json::from_str(json).unwrap();
        let names: Vec<&str> = schema.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn reject_unknown_kind() {
        let json = r#"{ "geo": { "type": "geopoint" } }"#;
        let result: Result<Schema, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn reject_array_without_item() {
        let json = r#"{ "tags": { "type": "array" } }"#;
        let result: Result<Schema, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn check_rejects_empty_literal_set() {
        let schema: Schema = [("level", FieldDescriptor::literal(Vec::<String>::new()))]
            .into_iter()
            .collect();
        let err = schema.check().unwrap_err();
        assert!(err.contains("level"));
    }

    #[test]
    fn check_rejects_duplicate_literal_inside_array() {
        let schema: Schema = [(
            "levels",
            FieldDescriptor::array(FieldDescriptor::literal(["info", "info"])),
        )]
        .into_iter()
        .collect();
        let err = schema.check().unwrap_err();
        assert!(err.contains("more than once"));
    }
}
