//! Remote query proxy backend
//!
//! Forwards statements to an HTTP query service instead of opening a
//! database connection. The service takes
//! `{fun, projectId, datasetId, query, params}` and answers with the result
//! rows, either as a bare JSON array or wrapped in `{"rows": [...]}`.
//!
//! How the bearer credential is obtained is up to the [`TokenProvider`].

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, instrument};

use crate::database::statement::{BoundValue, BuiltStatement};
use crate::database::traits::{BackendError, QueryBackend};
use crate::schema::Record;

/// Default time allowed for one proxy round trip
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Source of the bearer credential sent with every proxy request
#[async_trait]
pub trait TokenProvider: Send + Sync + 'static {
    async fn bearer_token(&self) -> Result<String, BackendError>;
}

/// A token fixed at startup
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str("StaticToken(***)")
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn bearer_token(&self) -> Result<String, BackendError> {
        Ok(self.0.clone())
    }
}

/// Where the proxy lives and which project it queries
#[derive(Debug, Clone)]
pub struct ProxySettings {
    /// Full URL of the query endpoint
    pub endpoint: String,

    pub project_id: String,

    /// Dataset used when a request names no database
    pub dataset_id: Option<String>,

    pub timeout: Duration,
}

/// Operation requested from the proxy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ProxyFunction {
    Query,
    ListDatasets,
    ListTables,
}

/// Request body sent to the proxy
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyRequest<'a> {
    pub fun: ProxyFunction,
    pub project_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<&'a str>,
    #[serde(skip_serializing_if = "no_params")]
    pub params: &'a [BoundValue],
}

fn no_params(params: &&[BoundValue]) -> bool {
    params.is_empty()
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ProxyResponse {
    Rows(Vec<Record>),
    Wrapped { rows: Vec<Record> },
}

impl ProxyResponse {
    fn into_rows(self) -> Vec<Record> {
        match self {
            ProxyResponse::Rows(rows) | ProxyResponse::Wrapped { rows } => rows,
        }
    }
}

/// Backend that sends statements to a remote query proxy
#[derive(Clone)]
pub struct ProxyBackend {
    client: Client,
    settings: ProxySettings,
    tokens: Arc<dyn TokenProvider>,
}

impl std::fmt::Debug for ProxyBackend {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ProxyBackend")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl ProxyBackend {
    /// Create a proxy backend
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(settings: ProxySettings, tokens: Arc<dyn TokenProvider>) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|error| BackendError::Unavailable(error.to_string()))?;

        debug!(endpoint = %settings.endpoint, project = %settings.project_id, "Created proxy backend");

        Ok(Self {
            client,
            settings,
            tokens,
        })
    }

    #[instrument(skip(self, body), fields(endpoint = %self.settings.endpoint, fun = ?body.fun))]
    async fn send(&self, body: &ProxyRequest<'_>) -> Result<Vec<Record>, BackendError> {
        let token = self.tokens.bearer_token().await?;

        let response = self
            .client
            .post(&self.settings.endpoint)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .map_err(|error| {
                error!(error = ?error, "Proxy request failed");
                BackendError::Unavailable(format!("Proxy request failed: {error}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            error!(status = %status, error = %message, "Proxy returned an error");
            return Err(BackendError::Query(format!("Proxy returned {status}: {message}")));
        }

        let decoded: ProxyResponse = response.json().await.map_err(|error| {
            error!(error = ?error, "Failed to parse proxy response");
            BackendError::Decode(format!("Failed to parse proxy response: {error}"))
        })?;

        let rows = decoded.into_rows();
        debug!(rows = rows.len(), "Received proxy response");
        Ok(rows)
    }
}

#[async_trait]
impl QueryBackend for ProxyBackend {
    fn kind(&self) -> &'static str {
        "proxy"
    }

    async fn list_databases(&self) -> Result<Vec<Record>, BackendError> {
        self.send(&ProxyRequest {
            fun: ProxyFunction::ListDatasets,
            project_id: &self.settings.project_id,
            dataset_id: None,
            query: None,
            params: &[],
        })
        .await
    }

    async fn list_tables(&self, database: &str) -> Result<Vec<Record>, BackendError> {
        self.send(&ProxyRequest {
            fun: ProxyFunction::ListTables,
            project_id: &self.settings.project_id,
            dataset_id: Some(database),
            query: None,
            params: &[],
        })
        .await
    }

    async fn execute(
        &self,
        database: Option<&str>,
        statement: &BuiltStatement,
    ) -> Result<Vec<Record>, BackendError> {
        let dataset = database
            .or(self.settings.dataset_id.as_deref())
            .ok_or(BackendError::NoDatabaseSelected)?;

        self.send(&ProxyRequest {
            fun: ProxyFunction::Query,
            project_id: &self.settings.project_id,
            dataset_id: Some(dataset),
            query: Some(&statement.text),
            params: &statement.params,
        })
        .await
    }
}
