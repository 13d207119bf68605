//! Row fetching endpoint with pagination, sorting and filtering

use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::api::error::ApiError;
use crate::database::Gateway;
use crate::schema::{RowsQuery, SortDirection, ViewRequest, ViewResult};

/// Maximum allowed page size to prevent excessive memory usage
pub const MAX_PAGE_SIZE: u64 = 500;

/// Handler for GET /api/rows/{table}/{page}/{pageSize}
///
/// Fetches one page of a table.
///
/// Query parameters:
/// - sortBy: Column name to sort by (optional)
/// - sortDirection: "asc" or "desc" (optional, anything but "desc" sorts ascending)
/// - filters: URL-encoded JSON object of column name to substring (optional)
/// - database: Database holding the table (optional, defaults to the backend's default)
///
/// Response:
/// ```json
/// {
///   "rows": [{ "id": 1, "name": "Alice" }],
///   "totalCount": 41,
///   "currentPage": 1,
///   "totalPages": 3
/// }
/// ```
///
/// An empty result is answered with 404 and the same fields next to `error`.
pub async fn list_rows_handler(
    State(gateway): State<Arc<Gateway>>,
    Path((table, page, page_size)): Path<(String, String, String)>,
    Query(query): Query<RowsQuery>,
) -> Result<Json<ViewResult>, ApiError> {
    let request = parse_view_request(table, &page, &page_size, query)?;

    debug!(
        table = %request.table,
        page = request.page,
        page_size = request.page_size,
        filters = request.filters.len(),
        "Listing rows"
    );

    let result = gateway.list_rows(&request).await?;
    Ok(Json(result))
}

/// Handler for the rows endpoint when path segments are missing
pub async fn missing_rows_params_handler() -> ApiError {
    ApiError::InvalidRequest("Expected /rows/{table}/{page}/{pageSize}".to_string())
}

/// Turn raw path and query parameters into a view request
///
/// Identifier validation is left to the statement builder; this only checks
/// structure.
pub fn parse_view_request(
    table: String,
    page: &str,
    page_size: &str,
    query: RowsQuery,
) -> Result<ViewRequest, ApiError> {
    if table.trim().is_empty() {
        return Err(ApiError::InvalidRequest("Missing table name".to_string()));
    }

    let page = parse_positive(page, "page")?;
    let page_size = parse_positive(page_size, "pageSize")?.min(MAX_PAGE_SIZE);

    let mut request = ViewRequest::new(table, page, page_size);

    if let Some(database) = query.database.filter(|name| !name.trim().is_empty()) {
        request = request.with_database(database);
    }

    if let Some(column) = query.sort_by.filter(|column| !column.trim().is_empty()) {
        let direction = query
            .sort_direction
            .as_deref()
            .map(SortDirection::parse_lenient)
            .unwrap_or_default();
        request = request.with_sort(column, direction);
    }

    if let Some(raw) = query.filters.filter(|raw| !raw.trim().is_empty()) {
        request = request.with_filters(parse_filters(&raw)?);
    }

    Ok(request)
}

fn parse_positive(raw: &str, name: &str) -> Result<u64, ApiError> {
    match raw.trim().parse::<u64>() {
        Ok(value) if value >= 1 => Ok(value),
        _ => Err(ApiError::InvalidRequest(format!(
            "{name} must be a positive integer, got {raw:?}"
        ))),
    }
}

/// Decode the `filters` parameter, a JSON object of column to string
fn parse_filters(raw: &str) -> Result<BTreeMap<String, String>, ApiError> {
    serde_json::from_str(raw)
        .map_err(|error| ApiError::InvalidRequest(format!("Malformed filters: {error}")))
}
