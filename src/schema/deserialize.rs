//! Filter deserializer: raw JSON filter values to typed values.
//!
//! Only timestamp-shaped fields are converted. Every other value, including
//! values under keys the schema does not declare, passes through untouched so
//! the table source stays the authority on which filters mean something.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

use super::{FieldDescriptor, Schema};
use crate::error::ToolError;

/// A filter value after deserialization.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// A single `timestamp` field.
    Timestamp(DateTime<Utc>),
    /// An `array` of `timestamp` field.
    TimestampList(Vec<DateTime<Utc>>),
    /// Any other value, exactly as received.
    Json(Value),
}

impl FilterValue {
    /// Returns the raw JSON value, if this is a pass-through value.
    #[must_use]
    pub const fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Timestamp(_) | Self::TimestampList(_) => None,
        }
    }

    /// Returns the timestamp, if this is a single timestamp.
    #[must_use]
    pub const fn as_timestamp(&self) -> Option<&DateTime<Utc>> {
        match self {
            Self::Timestamp(ts) => Some(ts),
            Self::TimestampList(_) | Self::Json(_) => None,
        }
    }

    /// Returns the timestamps, if this is a timestamp list.
    #[must_use]
    pub fn as_timestamp_list(&self) -> Option<&[DateTime<Utc>]> {
        match self {
            Self::TimestampList(list) => Some(list),
            Self::Timestamp(_) | Self::Json(_) => None,
        }
    }
}

/// Filter name to typed value, in the order the caller sent them.
pub type TypedFilterMap = IndexMap<String, FilterValue>;

/// Converts raw filters into typed filters using `schema`.
///
/// # Errors
///
/// Returns [`ToolError::InvalidParams`] if a timestamp field (or array of
/// timestamps) holds anything other than integral millisecond numbers.
pub fn deserialize_filters(
    schema: &Schema,
    raw: &Map<String, Value>,
) -> Result<TypedFilterMap, ToolError> {
    raw.iter()
        .map(|(name, value)| {
            let typed = match schema.get(name) {
                Some(descriptor) => deserialize_value(name, descriptor, value)?,
                None => FilterValue::Json(value.clone()),
            };
            Ok((name.clone(), typed))
        })
        .collect()
}

fn deserialize_value(
    name: &str,
    descriptor: &FieldDescriptor,
    value: &Value,
) -> Result<FilterValue, ToolError> {
    match descriptor {
        FieldDescriptor::Timestamp => parse_millis(value)
            .map(FilterValue::Timestamp)
            .ok_or_else(|| {
                ToolError::invalid_params(format!(
                    "Filter '{name}' must be a Unix timestamp in milliseconds"
                ))
            }),
        FieldDescriptor::Array { item } if **item == FieldDescriptor::Timestamp => {
            let Some(elements) = value.as_array() else {
                return Err(ToolError::invalid_params(format!(
                    "Filter '{name}' must be an array of Unix timestamps in milliseconds"
                )));
            };
            elements
                .iter()
                .enumerate()
                .map(|(i, element)| {
                    parse_millis(element).ok_or_else(|| {
                        ToolError::invalid_params(format!(
                            "Filter '{name}' element {i} must be a Unix timestamp in milliseconds"
                        ))
                    })
                })
                .collect::<Result<Vec<_>, _>>()
                .map(FilterValue::TimestampList)
        }
        FieldDescriptor::String
        | FieldDescriptor::Number
        | FieldDescriptor::Boolean
        | FieldDescriptor::StringLiteral { .. }
        | FieldDescriptor::Array { .. }
        | FieldDescriptor::Sort => Ok(FilterValue::Json(value.clone())),
    }
}

/// Parses an integral millisecond number into a UTC date/time.
///
/// Floats are accepted only when they carry no fractional part, so the
/// conversion always round-trips.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)] // bounds checked before the cast
fn parse_millis(value: &Value) -> Option<DateTime<Utc>> {
    if let Some(millis) = value.as_i64() {
        return DateTime::from_timestamp_millis(millis);
    }

    let f = value.as_f64()?;
    if f.fract() != 0.0 || f < i64::MIN as f64 || f >= i64::MAX as f64 {
        return None;
    }
    DateTime::from_timestamp_millis(f as i64)
}
