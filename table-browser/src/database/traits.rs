//! Query backend trait
//!
//! A backend is the execution path a built statement takes: a direct
//! database connection or a remote query proxy. Exactly one backend is
//! chosen at startup and shared by every request.

use async_trait::async_trait;
use thiserror::Error;

use crate::database::statement::BuiltStatement;
use crate::schema::Record;

/// Execution strategy for built statements
///
/// Implementations must not keep per-request state: the target database is
/// passed into every call and must be applied before the statement runs.
#[async_trait]
pub trait QueryBackend: Send + Sync + 'static {
    /// Short name for logs ("sqlite", "mysql", "proxy")
    fn kind(&self) -> &'static str;

    /// List the databases this backend can reach
    ///
    /// # Returns
    ///
    /// One record per database, keyed by a backend-specific column name
    async fn list_databases(&self) -> Result<Vec<Record>, BackendError>;

    /// List the tables of a database
    ///
    /// # Arguments
    ///
    /// * `database` - Database to inspect, already validated as an identifier
    ///
    /// # Returns
    ///
    /// One record per table, keyed by a backend-specific column name
    async fn list_tables(&self, database: &str) -> Result<Vec<Record>, BackendError>;

    /// Run a statement and collect its rows
    ///
    /// # Arguments
    ///
    /// * `database` - Database the statement targets; `None` uses the configured default
    /// * `statement` - Statement text and bound parameters
    async fn execute(
        &self,
        database: Option<&str>,
        statement: &BuiltStatement,
    ) -> Result<Vec<Record>, BackendError>;
}

/// Backend error type
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend could not be reached (connect, I/O, transport)
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// The backend was reached but the statement failed
    #[error("Query failed: {0}")]
    Query(String),

    /// The requested database does not exist
    #[error("Database not found: {0}")]
    UnknownDatabase(String),

    /// No database was given and no default is configured
    #[error("No database selected")]
    NoDatabaseSelected,

    /// A result could not be converted into records
    #[error("Failed to decode result: {0}")]
    Decode(String),
}

impl From<sqlx::Error> for BackendError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Configuration(_) => BackendError::Unavailable(error.to_string()),
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                BackendError::Decode(error.to_string())
            }
            other => BackendError::Query(other.to_string()),
        }
    }
}
