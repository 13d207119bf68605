//! Table listing endpoint

use axum::{
    extract::{Path, State},
    response::Json,
};
use std::sync::Arc;

use crate::api::error::ApiError;
use crate::database::Gateway;
use crate::schema::Record;

/// Handler for GET /api/tableNames/{db}
///
/// Returns one object per table of the given database, keyed by a
/// backend-specific column (`Tables_in_<db>` for the direct backends).
///
/// # Arguments
///
/// * `gateway` - Gateway from state
/// * `database` - Database whose tables are listed
///
/// # Returns
///
/// 400 for an invalid name, 404 when the database is missing or has no tables
pub async fn list_table_names_handler(
    State(gateway): State<Arc<Gateway>>,
    Path(database): Path<String>,
) -> Result<Json<Vec<Record>>, ApiError> {
    if database.trim().is_empty() {
        return Err(missing_database());
    }

    let tables = gateway.list_tables(&database).await?;
    Ok(Json(tables))
}

/// Handler for GET /api/tableNames without a database segment
pub async fn missing_database_handler() -> ApiError {
    missing_database()
}

fn missing_database() -> ApiError {
    ApiError::InvalidRequest("Missing database name".to_string())
}
