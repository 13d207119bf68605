//! Database listing endpoint

use axum::{extract::State, response::Json};
use std::sync::Arc;

use crate::api::error::ApiError;
use crate::database::Gateway;
use crate::schema::Record;

/// Handler for GET /api/databases
///
/// Returns one object per database. The key is whatever the backend calls
/// its name column (`Database` for the direct backends).
pub async fn list_databases_handler(
    State(gateway): State<Arc<Gateway>>,
) -> Result<Json<Vec<Record>>, ApiError> {
    let databases = gateway.list_databases().await?;
    Ok(Json(databases))
}
