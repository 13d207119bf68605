//! # table-browser
//!
//! Browse any relational database over HTTP: list databases, list tables,
//! and page through a table's rows with sorting and per-column filtering.
//!
//! ## Features
//!
//! - Server-driven pagination with total counts
//! - Column sorting and case-insensitive substring filters
//! - Interchangeable backends: direct SQLite or MySQL connections, or a
//!   remote query proxy
//! - A client-side view state machine with debounced filtering and a
//!   guard against out-of-order responses
//!
//! ## Safety
//!
//! Filter values are always bound as parameters. Table and column names
//! cannot be bound, so they are checked against `[A-Za-z0-9_]+` and
//! rejected otherwise. There is no authentication: do not expose this on a
//! public network.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use axum::{Router, routing::get};
//! use table_browser::BrowserLayer;
//!
//! #[tokio::main]
//! async fn main() {
//!     let app = Router::new()
//!         .route("/", get(|| async { "Hello, World!" }))
//!         .merge(BrowserLayer::sqlite("", "./data", Some("demo".to_string())).into_router());
//!
//!     // Serve the application...
//! }
//! ```

// Public modules
pub mod api;
pub mod client;
pub mod database;
pub mod layer;
pub mod schema;

// Public exports
pub use layer::BrowserLayer;
pub use schema::{Record, SortDirection, SortSpec, ViewRequest, ViewResult};

// Re-export backends
pub use database::proxy::{ProxyBackend, ProxySettings, StaticToken, TokenProvider};
pub use database::{Gateway, GatewayError, QueryBackend};

#[cfg(feature = "sqlite")]
pub use database::sqlite::SqliteBackend;

#[cfg(feature = "mysql")]
pub use database::mysql::{MySqlBackend, MySqlSettings};
