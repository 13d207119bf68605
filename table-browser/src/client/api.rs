//! What the view state machine needs from the server

use async_trait::async_trait;
use thiserror::Error;

use crate::schema::{ViewRequest, ViewResult};

/// Client error type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The request never got an HTTP answer
    #[error("Request failed: {0}")]
    Transport(String),

    /// The server answered with a non-success status
    #[error("Server answered {status}: {message}")]
    Status { status: u16, message: String },

    /// The answer could not be decoded
    #[error("Malformed response: {0}")]
    Decode(String),
}

/// Read operations of the table browser API, as seen by a client
///
/// An empty table page is not an error: implementations return an empty
/// [`ViewResult`] for it.
#[async_trait]
pub trait ViewApi: Send + Sync + 'static {
    /// Names of all databases
    async fn list_databases(&self) -> Result<Vec<String>, FetchError>;

    /// Names of the tables in `database`; empty when it has none
    async fn list_tables(&self, database: &str) -> Result<Vec<String>, FetchError>;

    /// One page of a table view
    async fn fetch_rows(&self, request: &ViewRequest) -> Result<ViewResult, FetchError>;
}
