//! In-memory table source.
//!
//! Loads rows from a JSON array of objects or a CSV file and answers page
//! queries by scanning them. Suitable for small tables and for tests; larger
//! deployments implement [`TableSource`] over their own store.
//!
//! # Filter Semantics
//!
//! - A filter applies to the column with the same name. Keys naming no known
//!   column are ignored.
//! - String: case-insensitive substring match on the cell text.
//! - Number / boolean: equality.
//! - Array of scalars: the cell (or any element of an array cell) equals one of
//!   them. An empty array places no constraint.
//! - Timestamp: the cell (milliseconds or RFC 3339 string) equals it.
//! - Timestamp list: inclusive range from the earliest to the latest element.
//! - `{ "id", "desc" }` objects, alone or in arrays, sort instead of filter.

use std::cmp::Ordering;
use std::io::Read;
use std::path::Path;

use async_trait::async_trait;
use chrono::DateTime;
use indexmap::{IndexMap, IndexSet};
use serde_json::{Number, Value};

use super::{Facet, FacetRow, PageRequest, QueryResult, Row, TableSource};
use crate::error::SourceError;
use crate::schema::{FilterValue, TypedFilterMap};

/// A table held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryTable {
    rows: Vec<Row>,
    columns: IndexSet<String>,
    facet_columns: Vec<String>,
}

impl MemoryTable {
    /// Creates a table from rows. Columns are the union of all row keys.
    #[must_use]
    pub fn new(rows: Vec<Row>) -> Self {
        let columns = rows.iter().flat_map(|row| row.keys().cloned()).collect();
        Self {
            rows,
            columns,
            facet_columns: Vec::new(),
        }
    }

    /// Sets the columns to compute facets for on every query.
    #[must_use]
    pub fn with_facets<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.facet_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Number of rows in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column names in first-seen order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }

    /// Parses a JSON array of row objects.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not JSON or not an array of objects.
    pub fn from_json_str(json: &str) -> Result<Self, SourceError> {
        let value: Value = serde_json::from_str(json)?;
        let Value::Array(items) = value else {
            return Err(SourceError::InvalidData(
                "expected a JSON array of row objects".to_string(),
            ));
        };

        let rows = items
            .into_iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::Object(row) => Ok(row),
                _ => Err(SourceError::InvalidData(format!("row {i} is not an object"))),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(rows))
    }

    /// Parses CSV with a header line. Cell types are inferred.
    ///
    /// # Errors
    ///
    /// Returns an error if the CSV is malformed.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, SourceError> {
        let mut reader = csv::ReaderBuilder::new().from_reader(reader);
        let headers = reader.headers()?.clone();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let row: Row = headers
                .iter()
                .zip(record.iter())
                .map(|(header, cell)| (header.to_string(), infer_cell(cell)))
                .collect();
            rows.push(row);
        }

        Ok(Self::new(rows))
    }

    /// Loads a `.csv` file, or a JSON file for any other extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub async fn load(path: &Path) -> Result<Self, SourceError> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SourceError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"));

        if is_csv {
            Self::from_csv_reader(contents.as_bytes())
        } else {
            Self::from_json_str(&contents)
        }
    }

    fn matches(&self, row: &Row, filters: &TypedFilterMap) -> bool {
        filters.iter().all(|(name, filter)| {
            if !self.columns.contains(name) {
                return true;
            }
            let cell = row.get(name).unwrap_or(&Value::Null);
            filter_matches(filter, cell)
        })
    }

    fn facets(&self, rows: &[&Row]) -> IndexMap<String, Facet> {
        self.facet_columns
            .iter()
            .map(|column| (column.clone(), facet(rows, column)))
            .collect()
    }
}

#[async_trait]
impl TableSource for MemoryTable {
    async fn fetch_page(&self, request: PageRequest) -> Result<QueryResult, SourceError> {
        let mut matched: Vec<&Row> = self
            .rows
            .iter()
            .filter(|row| self.matches(row, &request.filters))
            .collect();

        let sorts = sort_specs(&request.filters);
        if !sorts.is_empty() {
            matched.sort_by(|a, b| {
                sorts
                    .iter()
                    .map(|spec| spec.compare(a, b))
                    .find(|ord| ord.is_ne())
                    .unwrap_or(Ordering::Equal)
            });
        }

        let total = u64::try_from(matched.len()).unwrap_or(u64::MAX);
        let facets = (!self.facet_columns.is_empty()).then(|| self.facets(&matched));

        let offset = usize::try_from(request.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(request.page_size).unwrap_or(usize::MAX);
        let rows = matched
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();

        tracing::debug!(total, page = request.page, "Memory table query");

        Ok(QueryResult {
            rows,
            total,
            facets,
        })
    }
}

/// Infers a JSON value from CSV cell text.
fn infer_cell(cell: &str) -> Value {
    if cell.is_empty() {
        return Value::Null;
    }
    if let Ok(n) = cell.parse::<i64>() {
        return Value::from(n);
    }
    if let Some(n) = cell.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(n);
    }
    match cell {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(cell.to_string()),
    }
}

/// Elements of an array cell, or the cell itself.
fn cell_values(cell: &Value) -> &[Value] {
    match cell {
        Value::Array(items) => items,
        other => std::slice::from_ref(other),
    }
}

fn cell_text(cell: &Value) -> Option<String> {
    match cell {
        Value::String(s) => Some(s.to_lowercase()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn cell_millis(cell: &Value) -> Option<i64> {
    match cell {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.timestamp_millis()),
        _ => None,
    }
}

fn scalar_eq(filter: &Value, cell: &Value) -> bool {
    match (filter, cell) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => filter == cell,
    }
}

fn is_sort_spec(value: &Value) -> bool {
    value.get("id").is_some_and(Value::is_string)
}

fn filter_matches(filter: &FilterValue, cell: &Value) -> bool {
    match filter {
        FilterValue::Timestamp(ts) => cell_millis(cell) == Some(ts.timestamp_millis()),
        FilterValue::TimestampList(list) => {
            let (Some(lo), Some(hi)) = (list.iter().min(), list.iter().max()) else {
                return true;
            };
            cell_millis(cell)
                .is_some_and(|ms| lo.timestamp_millis() <= ms && ms <= hi.timestamp_millis())
        }
        FilterValue::Json(value) => json_matches(value, cell),
    }
}

fn json_matches(filter: &Value, cell: &Value) -> bool {
    match filter {
        Value::Null | Value::Object(_) => true,
        Value::Array(items) => {
            if items.is_empty() || items.iter().all(is_sort_spec) {
                return true;
            }
            cell_values(cell)
                .iter()
                .any(|c| items.iter().any(|item| scalar_eq(item, c)))
        }
        Value::String(needle) => {
            let needle = needle.to_lowercase();
            cell_values(cell)
                .iter()
                .filter_map(cell_text)
                .any(|text| text.contains(&needle))
        }
        Value::Number(_) | Value::Bool(_) => {
            cell_values(cell).iter().any(|c| scalar_eq(filter, c))
        }
    }
}

#[derive(Debug)]
struct SortSpec {
    column: String,
    desc: bool,
}

impl SortSpec {
    fn from_value(value: &Value) -> Option<Self> {
        let column = value.get("id")?.as_str()?.to_string();
        let desc = value.get("desc").and_then(Value::as_bool).unwrap_or(false);
        Some(Self { column, desc })
    }

    fn compare(&self, a: &Row, b: &Row) -> Ordering {
        let a = a.get(&self.column).unwrap_or(&Value::Null);
        let b = b.get(&self.column).unwrap_or(&Value::Null);

        // nulls last in both directions
        match (a.is_null(), b.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => {
                let ord = compare_values(a, b);
                if self.desc {
                    ord.reverse()
                } else {
                    ord
                }
            }
        }
    }
}

fn sort_specs(filters: &TypedFilterMap) -> Vec<SortSpec> {
    filters
        .values()
        .filter_map(FilterValue::as_json)
        .flat_map(|value| match value {
            Value::Array(items) => items.iter().filter_map(SortSpec::from_value).collect(),
            Value::Object(_) => SortSpec::from_value(value).into_iter().collect(),
            _ => Vec::new(),
        })
        .collect()
}

const fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or_default();
            let y = y.as_f64().unwrap_or_default();
            x.total_cmp(&y)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => type_rank(a)
            .cmp(&type_rank(b))
            .then_with(|| a.to_string().cmp(&b.to_string())),
    }
}

fn facet(rows: &[&Row], column: &str) -> Facet {
    let mut counts: IndexMap<String, FacetRow> = IndexMap::new();
    let mut bounds: Option<(f64, f64)> = None;
    let mut numeric = true;

    for value in rows
        .iter()
        .filter_map(|row| row.get(column))
        .flat_map(cell_values)
        .filter(|value| !value.is_null())
    {
        match value.as_f64() {
            Some(n) => {
                bounds = Some(bounds.map_or((n, n), |(lo, hi)| (lo.min(n), hi.max(n))));
            }
            None => numeric = false,
        }

        counts
            .entry(value.to_string())
            .or_insert_with(|| FacetRow {
                value: value.clone(),
                count: 0,
            })
            .count += 1;
    }

    let total = u64::try_from(counts.len()).unwrap_or(u64::MAX);
    let mut facet_rows: Vec<FacetRow> = counts.into_values().collect();
    facet_rows.sort_by(|a, b| b.count.cmp(&a.count));

    let (min, max) = match bounds {
        Some((lo, hi)) if numeric => (Some(lo), Some(hi)),
        _ => (None, None),
    };

    Facet {
        rows: facet_rows,
        total,
        min,
        max,
    }
}
