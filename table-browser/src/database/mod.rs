//! Data-access layer
//!
//! Statement building, the backend strategies that execute statements, and
//! the gateway that ties them together for the HTTP handlers.

pub mod gateway;
pub mod identifier;
pub mod proxy;
pub mod statement;
pub mod traits;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "mysql")]
pub mod mysql;

// Re-export the main types
pub use gateway::{Gateway, GatewayError};
pub use identifier::Identifier;
pub use statement::{build_view_statements, BoundValue, BuiltStatement, StatementError, ViewStatements};
pub use traits::{BackendError, QueryBackend};
