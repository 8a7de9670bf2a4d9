//! Result formatting for `query_table`.
//!
//! | Format     | Output                       |
//! |------------|------------------------------|
//! | `json`     | `{ rows, total }`            |
//! | `stats`    | `{ rows, total, facets? }`   |
//! | `markdown` | `{ markdown, total }`        |
//! | `csv`      | `{ csv, total }`             |
//!
//! Markdown and CSV omit `rows` because the encoded string already carries
//! them.

use std::fmt;
use std::str::FromStr;

use serde_json::{json, Value};
use thiserror::Error;

use crate::source::{QueryResult, Row};

/// Body used by the markdown format when there are no rows.
pub const EMPTY_MARKDOWN: &str = "No rows found.";

/// Errors raised while encoding a result.
#[derive(Error, Debug)]
pub enum FormatError {
    /// The CSV writer failed.
    #[error("failed to encode CSV")]
    Csv(#[from] csv::Error),

    /// The CSV writer produced invalid UTF-8.
    #[error("CSV output is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Output encodings accepted by `query_table`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Rows and total.
    #[default]
    Json,
    /// Rows, total, and facets.
    Stats,
    /// GitHub-flavoured markdown table.
    Markdown,
    /// Comma-separated values.
    Csv,
}

impl OutputFormat {
    /// Every format, in advertised order.
    pub const ALL: [Self; 4] = [Self::Json, Self::Stats, Self::Markdown, Self::Csv];

    /// Returns the wire name of this format.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Stats => "stats",
            Self::Markdown => "markdown",
            Self::Csv => "csv",
        }
    }

    /// Returns the wire names of every format.
    #[must_use]
    pub fn names() -> Vec<&'static str> {
        Self::ALL.into_iter().map(Self::as_str).collect()
    }

    /// Encodes `result` in this format.
    ///
    /// # Errors
    ///
    /// Returns an error only if CSV encoding fails.
    pub fn apply(self, result: QueryResult) -> Result<Value, FormatError> {
        match self {
            Self::Json => Ok(format_json(result)),
            Self::Stats => Ok(format_stats(result)),
            Self::Markdown => Ok(format_markdown(result)),
            Self::Csv => format_csv(result),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "Invalid format '{s}'. Expected one of: {}",
                    Self::names().join(", ")
                )
            })
    }
}

/// `{ rows, total }`. Facets are always dropped.
#[must_use]
pub fn format_json(result: QueryResult) -> Value {
    json!({
        "rows": result.rows,
        "total": result.total,
    })
}

/// `{ rows, total, facets }`, with `facets` only when the source supplied it.
#[must_use]
pub fn format_stats(result: QueryResult) -> Value {
    let mut out = json!({
        "rows": result.rows,
        "total": result.total,
    });
    if let Some(facets) = result.facets {
        out["facets"] = json!(facets);
    }
    out
}

/// `{ markdown, total }`.
#[must_use]
pub fn format_markdown(result: QueryResult) -> Value {
    json!({
        "markdown": markdown_table(&result.rows),
        "total": result.total,
    })
}

/// `{ csv, total }`.
///
/// # Errors
///
/// Returns an error if the CSV writer fails.
pub fn format_csv(result: QueryResult) -> Result<Value, FormatError> {
    Ok(json!({
        "csv": csv_table(&result.rows)?,
        "total": result.total,
    }))
}

/// Columns of the first row, in order.
fn header(rows: &[Row]) -> Vec<&str> {
    rows.first()
        .map(|row| row.keys().map(String::as_str).collect())
        .unwrap_or_default()
}

/// Cell text: strings verbatim, null or missing empty, anything else as JSON.
fn cell_string(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn markdown_cell(value: Option<&Value>) -> String {
    cell_string(value)
        .replace('|', "\\|")
        .replace("\r\n", " ")
        .replace(['\n', '\r'], " ")
}

fn markdown_table(rows: &[Row]) -> String {
    if rows.is_empty() {
        return EMPTY_MARKDOWN.to_string();
    }

    let columns = header(rows);
    let mut lines = Vec::with_capacity(rows.len() + 2);

    let names: Vec<String> = columns
        .iter()
        .map(|c| markdown_cell(Some(&Value::String((*c).to_string()))))
        .collect();
    lines.push(format!("| {} |", names.join(" | ")));
    lines.push(format!("|{}|", vec![" --- "; columns.len()].join("|")));

    for row in rows {
        let cells: Vec<String> = columns.iter().map(|c| markdown_cell(row.get(*c))).collect();
        lines.push(format!("| {} |", cells.join(" | ")));
    }

    lines.join("\n")
}

fn csv_table(rows: &[Row]) -> Result<String, FormatError> {
    let columns = header(rows);
    if columns.is_empty() {
        return Ok(String::new());
    }

    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(&columns)?;
    for row in rows {
        writer.write_record(columns.iter().map(|c| cell_string(row.get(*c))))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| FormatError::Csv(e.into_error().into()))?;
    let mut text = String::from_utf8(bytes)?;
    if text.ends_with('\n') {
        text.pop();
    }
    Ok(text)
}
