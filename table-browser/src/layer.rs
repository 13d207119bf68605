//! BrowserLayer - Main Axum integration layer
//!
//! This module provides the main entry point for mounting the table browser
//! API into an Axum application.

use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::create_api_router;
use crate::database::{Gateway, QueryBackend};

#[cfg(feature = "sqlite")]
use crate::database::sqlite::SqliteBackend;

/// Mountable table browser API
///
/// # Example
///
/// ```rust,no_run
/// use axum::Router;
/// use table_browser::BrowserLayer;
///
/// # async fn example() {
/// let browser = BrowserLayer::sqlite("/browser", "./data", Some("demo".to_string()));
/// let app = Router::new().merge(browser.into_router());
/// # }
/// ```
pub struct BrowserLayer {
    base_path: String,
    gateway: Arc<Gateway>,
}

impl BrowserLayer {
    /// Create a new table browser at the given base path
    ///
    /// # Arguments
    ///
    /// * `base_path` - The URL path the API is mounted under (e.g., "/browser"); empty for the root
    /// * `backend` - The backend every request goes through
    pub fn new(base_path: impl Into<String>, backend: Arc<dyn QueryBackend>) -> Self {
        let base_path = base_path.into().trim_end_matches('/').to_string();
        Self {
            base_path,
            gateway: Arc::new(Gateway::new(backend)),
        }
    }

    /// Convert into an Axum Router that can be merged
    ///
    /// The returned router includes:
    /// - API endpoints at `{base_path}/api/*`
    /// - Permissive CORS middleware for development
    /// - Request tracing
    pub fn into_router(self) -> Router {
        info!(
            backend = self.gateway.backend_kind(),
            path = %format!("{}/api", self.base_path),
            "Mounting table browser"
        );
        let api_router = create_api_router(self.gateway);

        Router::new()
            .nest(&format!("{}/api", self.base_path), api_router)
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
    }
}

#[cfg(feature = "sqlite")]
impl BrowserLayer {
    /// Create a new table browser over a directory of SQLite databases
    ///
    /// # Arguments
    ///
    /// * `base_path` - The URL path where the API will be mounted
    /// * `directory` - Directory holding `<name>.db` files
    /// * `default_database` - Database used when a rows request names none
    pub fn sqlite(
        base_path: impl Into<String>,
        directory: impl Into<std::path::PathBuf>,
        default_database: Option<String>,
    ) -> Self {
        Self::new(
            base_path,
            Arc::new(SqliteBackend::new(directory, default_database)),
        )
    }
}
