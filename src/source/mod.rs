//! Table sources: the host side of a query.
//!
//! The dispatcher never touches rows directly. It hands a [`PageRequest`] to a
//! [`TableSource`] and formats whatever [`QueryResult`] comes back. Filtering,
//! sorting, facet aggregation, and pagination all belong to the source.

pub mod memory;

pub use memory::MemoryTable;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::SourceError;
use crate::schema::TypedFilterMap;

/// One record: column name to value, in column order.
pub type Row = Map<String, Value>;

/// A single page query handed to the source.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    /// Typed filters, in the order the caller sent them.
    pub filters: TypedFilterMap,
    /// 1-based page number.
    pub page: u64,
    /// Rows per page, already clamped.
    pub page_size: u64,
}

impl PageRequest {
    /// Number of rows to skip before this page starts.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }
}

/// One `{ value, count }` entry of a facet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetRow {
    /// The distinct value.
    pub value: Value,
    /// Matching rows carrying it.
    pub count: u64,
}

/// Aggregate summary of one column over the full filtered set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facet {
    /// Value counts.
    pub rows: Vec<FacetRow>,
    /// Distinct-value count or category total.
    pub total: u64,
    /// Smallest value, for numeric columns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Largest value, for numeric columns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

/// A page of rows plus the pre-pagination total and optional facets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Rows of the requested page.
    pub rows: Vec<Row>,
    /// Rows matching the filters before pagination.
    pub total: u64,
    /// Facets keyed by column name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facets: Option<IndexMap<String, Facet>>,
}

/// Host-supplied page fetch.
///
/// Implementations must be shareable across concurrent requests. They may
/// suspend; the dispatcher awaits the call and surfaces any error as an
/// upstream failure without retrying.
#[async_trait]
pub trait TableSource: Send + Sync {
    /// Fetches one page of rows matching `request.filters`.
    async fn fetch_page(&self, request: PageRequest) -> Result<QueryResult, SourceError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(page: u64, page_size: u64) -> PageRequest {
        PageRequest {
            filters: TypedFilterMap::new(),
            page,
            page_size,
        }
    }

    #[test]
    fn offset_from_page() {
        assert_eq!(request(1, 50).offset(), 0);
        assert_eq!(request(3, 20).offset(), 40);
        assert_eq!(request(u64::MAX, u64::MAX).offset(), u64::MAX);
    }

    #[test]
    fn facet_omits_missing_bounds() {
        let facet = Facet {
            rows: vec![FacetRow {
                value: json!("error"),
                count: 3,
            }],
            total: 1,
            min: None,
            max: None,
        };
        let value = serde_json::to_value(&facet).unwrap();
        assert_eq!(
            value,
            json!({ "rows": [{ "value": "error", "count": 3 }], "total": 1 })
        );
    }

    #[test]
    fn query_result_parses_without_facets() {
        let result: QueryResult =
            serde_json::from_value(json!({ "rows": [{ "a": 1 }], "total": 9 })).unwrap();
        assert_eq!(result.total, 9);
        assert!(result.facets.is_none());
    }
}
