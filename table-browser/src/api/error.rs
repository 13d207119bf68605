//! Translation of failures into HTTP responses
//!
//! This is the only place in the crate that picks status codes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use tracing::{error, warn};

use crate::database::GatewayError;
use crate::schema::ViewResult;

/// Message returned for backend failures; details stay in the logs
const BACKEND_FAILURE_MESSAGE: &str = "The database backend failed to answer the request";

/// API error type
#[derive(Debug)]
pub enum ApiError {
    /// Missing or malformed request parameters (400)
    InvalidRequest(String),

    /// An identifier failed validation (400)
    InvalidIdentifier(String),

    /// The query succeeded but returned nothing (404)
    NoData(ViewResult),

    /// The named database does not exist (404)
    UnknownDatabase(String),

    /// The backend could not be reached or failed (500)
    Backend(String),
}

impl From<GatewayError> for ApiError {
    fn from(error: GatewayError) -> Self {
        match error {
            GatewayError::InvalidIdentifier(raw) => ApiError::InvalidIdentifier(raw),
            GatewayError::InvalidRequest(message) => ApiError::InvalidRequest(message),
            GatewayError::NoData(result) => ApiError::NoData(result),
            GatewayError::UnknownDatabase(name) => ApiError::UnknownDatabase(name),
            unavailable @ GatewayError::BackendUnavailable(_) => ApiError::Backend(unavailable.to_string()),
            failure @ GatewayError::BackendFailure(_) => ApiError::Backend(failure.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::InvalidRequest(message) => {
                warn!(%message, "Rejected invalid request");
                (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
            }
            ApiError::InvalidIdentifier(raw) => {
                warn!(identifier = %raw, "Rejected invalid identifier");
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": format!("Invalid identifier: {raw:?}") })),
                )
                    .into_response()
            }
            ApiError::NoData(result) => (
                StatusCode::NOT_FOUND,
                Json(json!({
                    "error": "No data found",
                    "rows": result.rows,
                    "totalCount": result.total_count,
                    "currentPage": result.current_page,
                    "totalPages": result.total_pages,
                })),
            )
                .into_response(),
            ApiError::UnknownDatabase(name) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": format!("Database not found: {name}") })),
            )
                .into_response(),
            ApiError::Backend(detail) => {
                error!(%detail, "Backend failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": BACKEND_FAILURE_MESSAGE })),
                )
                    .into_response()
            }
        }
    }
}
