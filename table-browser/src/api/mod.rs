//! REST API endpoints
//!
//! This module contains the read-only endpoint handlers of the table browser.

use axum::{routing::get, Router};
use std::sync::Arc;

use crate::database::Gateway;

pub mod databases;
pub mod error;
pub mod rows;
pub mod tables;

// Re-export handlers for convenience
pub use databases::list_databases_handler;
pub use error::ApiError;
pub use rows::list_rows_handler;
pub use tables::list_table_names_handler;

/// Create the API router with all endpoints
///
/// Routes are relative; the caller decides where they are nested.
///
/// # Arguments
///
/// * `gateway` - Shared gateway over the configured backend
///
/// # Returns
///
/// An Axum Router with the three read endpoints and their
/// missing-parameter fallbacks
pub fn create_api_router(gateway: Arc<Gateway>) -> Router {
    // Note: Axum 0.8 uses {param} syntax instead of :param
    Router::new()
        .route("/databases", get(databases::list_databases_handler))
        .route("/tableNames", get(tables::missing_database_handler))
        .route("/tableNames/", get(tables::missing_database_handler))
        .route("/tableNames/{database}", get(tables::list_table_names_handler))
        .route("/rows", get(rows::missing_rows_params_handler))
        .route("/rows/{table}", get(rows::missing_rows_params_handler))
        .route("/rows/{table}/{page}", get(rows::missing_rows_params_handler))
        .route("/rows/{table}/{page}/{page_size}", get(rows::list_rows_handler))
        .with_state(gateway)
}
