//! Request and result types shared by the server and the client
//!
//! These types describe what a table view asks for and what it gets back.
//! Everything that crosses the HTTP boundary is serialized in camelCase.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single result row, column name to scalar value, in backend column order
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Sort direction for a table view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// Parse a direction from a query parameter
    ///
    /// Only an explicit "desc" (any case) sorts descending; every other value,
    /// including garbage, falls back to ascending.
    pub fn parse_lenient(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("desc") {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        }
    }

    /// The opposite direction
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }

    /// SQL keyword for this direction
    pub fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }

    /// Value used for the `sortDirection` query parameter
    pub fn as_param(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// Column and direction a view is sorted by
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub column: String,
    pub direction: SortDirection,
}

/// Declarative description of one page of a table view
///
/// Identifiers are carried as raw strings; they are validated when the
/// request is turned into statements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewRequest {
    /// Target database; `None` means the backend's configured default
    pub database: Option<String>,

    /// Table to read from
    pub table: String,

    /// 1-based page number
    pub page: u64,

    /// Rows per page
    pub page_size: u64,

    /// Optional sort column and direction
    pub sort: Option<SortSpec>,

    /// Column substring filters, never containing blank values
    pub filters: BTreeMap<String, String>,
}

impl ViewRequest {
    /// Create a request for one page of a table with no sorting or filtering
    pub fn new(table: impl Into<String>, page: u64, page_size: u64) -> Self {
        Self {
            database: None,
            table: table.into(),
            page,
            page_size,
            sort: None,
            filters: BTreeMap::new(),
        }
    }

    /// Target a specific database
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Sort by a column
    pub fn with_sort(mut self, column: impl Into<String>, direction: SortDirection) -> Self {
        self.sort = Some(SortSpec {
            column: column.into(),
            direction,
        });
        self
    }

    /// Add a column filter; blank values are dropped
    pub fn with_filter(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        if !value.trim().is_empty() {
            self.filters.insert(column.into(), value);
        }
        self
    }

    /// Add every non-blank filter from a map
    pub fn with_filters<I, K, V>(self, filters: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        filters
            .into_iter()
            .fold(self, |request, (column, value)| request.with_filter(column, value))
    }
}

/// One page of rows together with pagination metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewResult {
    /// Rows on this page, at most `pageSize` of them
    pub rows: Vec<Record>,

    /// Rows matching the filters across all pages
    pub total_count: u64,

    /// 1-based page this result belongs to
    pub current_page: u64,

    /// `ceil(totalCount / pageSize)`
    pub total_pages: u64,
}

impl ViewResult {
    /// Assemble a result, deriving the page count from the total
    pub fn new(rows: Vec<Record>, total_count: u64, current_page: u64, page_size: u64) -> Self {
        Self {
            rows,
            total_count,
            current_page,
            total_pages: total_pages(total_count, page_size),
        }
    }

    /// A result with no rows for the given page
    pub fn empty(current_page: u64) -> Self {
        Self {
            rows: Vec::new(),
            total_count: 0,
            current_page,
            total_pages: 0,
        }
    }
}

/// Number of pages needed to show `total_count` rows
pub fn total_pages(total_count: u64, page_size: u64) -> u64 {
    if page_size == 0 {
        return 0;
    }
    total_count.div_ceil(page_size)
}

/// Query parameters accepted by the rows endpoint
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowsQuery {
    /// Column name to sort by
    pub sort_by: Option<String>,

    /// "asc" or "desc"; anything else sorts ascending
    pub sort_direction: Option<String>,

    /// JSON object of column name to substring
    pub filters: Option<String>,

    /// Database the table lives in
    pub database: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_pages_rounds_up() {
        assert_eq!(total_pages(0, 20), 0);
        assert_eq!(total_pages(1, 20), 1);
        assert_eq!(total_pages(20, 20), 1);
        assert_eq!(total_pages(21, 20), 2);
        assert_eq!(total_pages(5, 0), 0);
    }

    #[test]
    fn test_parse_lenient_direction() {
        assert_eq!(SortDirection::parse_lenient("desc"), SortDirection::Desc);
        assert_eq!(SortDirection::parse_lenient("DESC"), SortDirection::Desc);
        assert_eq!(SortDirection::parse_lenient("asc"), SortDirection::Asc);
        assert_eq!(SortDirection::parse_lenient("descending"), SortDirection::Asc);
        assert_eq!(SortDirection::parse_lenient(""), SortDirection::Asc);
    }

    #[test]
    fn test_with_filter_drops_blank_values() {
        let request = ViewRequest::new("users", 1, 20)
            .with_filter("name", "al")
            .with_filter("email", "   ")
            .with_filter("city", "");

        assert_eq!(request.filters.len(), 1);
        assert_eq!(request.filters.get("name").map(String::as_str), Some("al"));
    }

    #[test]
    fn test_view_result_serializes_camel_case() {
        let result = ViewResult::new(Vec::new(), 41, 2, 20);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["totalCount"], 41);
        assert_eq!(json["currentPage"], 2);
        assert_eq!(json["totalPages"], 3);
        assert!(json["rows"].as_array().unwrap().is_empty());
    }
}
