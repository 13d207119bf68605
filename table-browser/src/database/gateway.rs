//! Data-access gateway
//!
//! Sits between the HTTP handlers and the configured [`QueryBackend`]. It
//! builds statements, runs them in order, assembles the page result and
//! folds backend failures into [`GatewayError`]. HTTP status codes are not
//! decided here.

use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::database::identifier::Identifier;
use crate::database::statement::{build_view_statements, StatementError, COUNT_COLUMN};
use crate::database::traits::{BackendError, QueryBackend};
use crate::schema::{Record, ViewRequest, ViewResult};

/// Gateway error type
#[derive(Debug, Error)]
pub enum GatewayError {
    /// A table, column or database name failed validation
    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    /// The request cannot be turned into statements
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The query succeeded but matched nothing on the requested page
    ///
    /// Carries the empty page so callers can still render counts.
    #[error("No data found")]
    NoData(ViewResult),

    /// The database named by the request does not exist
    #[error("Database not found: {0}")]
    UnknownDatabase(String),

    /// The backend could not be reached
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The backend was reached but the statement failed or returned garbage
    #[error("Backend failure: {0}")]
    BackendFailure(String),
}

impl From<StatementError> for GatewayError {
    fn from(error: StatementError) -> Self {
        match error {
            StatementError::InvalidIdentifier(raw) => GatewayError::InvalidIdentifier(raw),
            pagination @ StatementError::InvalidPagination { .. } => {
                GatewayError::InvalidRequest(pagination.to_string())
            }
        }
    }
}

impl From<BackendError> for GatewayError {
    fn from(error: BackendError) -> Self {
        match error {
            BackendError::Unavailable(message) => GatewayError::BackendUnavailable(message),
            BackendError::UnknownDatabase(name) => GatewayError::UnknownDatabase(name),
            BackendError::NoDatabaseSelected => {
                GatewayError::InvalidRequest("no database selected".to_string())
            }
            other => GatewayError::BackendFailure(other.to_string()),
        }
    }
}

/// Executes table views and introspection through one backend
#[derive(Clone)]
pub struct Gateway {
    backend: Arc<dyn QueryBackend>,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Gateway")
            .field("backend", &self.backend.kind())
            .finish()
    }
}

impl Gateway {
    /// Create a gateway over the backend chosen at startup
    pub fn new(backend: Arc<dyn QueryBackend>) -> Self {
        Self { backend }
    }

    /// Name of the backend in use
    pub fn backend_kind(&self) -> &'static str {
        self.backend.kind()
    }

    /// List every database the backend can see
    #[instrument(skip(self), fields(backend = self.backend.kind()))]
    pub async fn list_databases(&self) -> Result<Vec<Record>, GatewayError> {
        let databases = self.backend.list_databases().await?;
        debug!(count = databases.len(), "Listed databases");
        Ok(databases)
    }

    /// List the tables of one database
    ///
    /// Fails with [`GatewayError::NoData`] when the database has no tables.
    #[instrument(skip(self), fields(backend = self.backend.kind()))]
    pub async fn list_tables(&self, database: &str) -> Result<Vec<Record>, GatewayError> {
        let database = Identifier::parse(database)?;
        let tables = self.backend.list_tables(database.as_str()).await?;

        if tables.is_empty() {
            return Err(GatewayError::NoData(ViewResult::empty(1)));
        }

        debug!(count = tables.len(), "Listed tables");
        Ok(tables)
    }

    /// Fetch one page of a table view
    ///
    /// Runs the count statement first. A zero count, or a page past the end,
    /// is reported as [`GatewayError::NoData`] and the data statement is
    /// skipped when the count is already zero.
    #[instrument(skip(self, request), fields(
        backend = self.backend.kind(),
        table = %request.table,
        page = request.page,
        page_size = request.page_size,
    ))]
    pub async fn list_rows(&self, request: &ViewRequest) -> Result<ViewResult, GatewayError> {
        let database = request
            .database
            .as_deref()
            .map(Identifier::parse)
            .transpose()?;
        let database = database.as_ref().map(Identifier::as_str);
        let statements = build_view_statements(request)?;
        let started = Instant::now();

        let count_rows = self.backend.execute(database, &statements.count).await?;
        let total_count = extract_count(&count_rows)?;

        if total_count == 0 {
            debug!("Table view matched no rows");
            return Err(GatewayError::NoData(ViewResult::new(
                Vec::new(),
                0,
                request.page,
                request.page_size,
            )));
        }

        let mut rows = self.backend.execute(database, &statements.data).await?;
        // A misbehaving backend must not break the page size contract
        rows.truncate(usize::try_from(request.page_size).unwrap_or(usize::MAX));

        let result = ViewResult::new(rows, total_count, request.page, request.page_size);

        debug!(
            rows = result.rows.len(),
            total_count,
            elapsed_milliseconds = started.elapsed().as_millis() as u64,
            "Fetched table view"
        );

        if result.rows.is_empty() {
            return Err(GatewayError::NoData(result));
        }

        Ok(result)
    }
}

/// Read the single count value returned by a count statement
///
/// Numbers are accepted as JSON numbers or numeric strings, since some
/// remote services return every scalar as text.
fn extract_count(rows: &[Record]) -> Result<u64, GatewayError> {
    let malformed = || GatewayError::BackendFailure("count statement returned no usable total".to_string());

    let record = rows.first().ok_or_else(malformed)?;
    let value = record
        .get(COUNT_COLUMN)
        .or_else(|| record.values().next())
        .ok_or_else(malformed)?;

    match value {
        Value::Number(number) => number.as_u64().ok_or_else(malformed),
        Value::String(text) => text.trim().parse().map_err(|_| malformed()),
        _ => Err(malformed()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::statement::{BoundValue, BuiltStatement};
    use crate::schema::SortDirection;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Backend that answers from a fixed list of rows and records every call
    #[derive(Default)]
    struct RecordingBackend {
        rows: Vec<Record>,
        count_as_text: bool,
        unavailable: bool,
        calls: Mutex<Vec<(Option<String>, BuiltStatement)>>,
    }

    impl RecordingBackend {
        fn with_rows(count: usize) -> Self {
            let rows = (1..=count)
                .map(|id| {
                    let mut record = Record::new();
                    record.insert("id".to_string(), json!(id));
                    record.insert("name".to_string(), json!(format!("user {id}")));
                    record
                })
                .collect();
            Self {
                rows,
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<(Option<String>, BuiltStatement)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl QueryBackend for RecordingBackend {
        fn kind(&self) -> &'static str {
            "recording"
        }

        async fn list_databases(&self) -> Result<Vec<Record>, BackendError> {
            Ok(vec![json!({ "Database": "shop" }).as_object().unwrap().clone()])
        }

        async fn list_tables(&self, database: &str) -> Result<Vec<Record>, BackendError> {
            if database == "empty" {
                return Ok(Vec::new());
            }
            Ok(vec![json!({ "Tables_in_shop": "users" }).as_object().unwrap().clone()])
        }

        async fn execute(
            &self,
            database: Option<&str>,
            statement: &BuiltStatement,
        ) -> Result<Vec<Record>, BackendError> {
            self.calls
                .lock()
                .unwrap()
                .push((database.map(str::to_string), statement.clone()));

            if self.unavailable {
                return Err(BackendError::Unavailable("connection refused".to_string()));
            }

            if statement.text.starts_with("SELECT COUNT(*)") {
                let total = if self.count_as_text {
                    json!(self.rows.len().to_string())
                } else {
                    json!(self.rows.len())
                };
                return Ok(vec![json!({ "total": total }).as_object().unwrap().clone()]);
            }

            let (limit, offset) = match statement.params[..] {
                [.., BoundValue::Integer(limit), BoundValue::Integer(offset)] => {
                    (limit as usize, offset as usize)
                }
                _ => panic!("data statement without paging"),
            };
            Ok(self.rows.iter().skip(offset).take(limit).cloned().collect())
        }
    }

    #[tokio::test]
    async fn test_list_rows_assembles_page() {
        let backend = Arc::new(RecordingBackend::with_rows(45));
        let gateway = Gateway::new(backend.clone());

        let request = ViewRequest::new("users", 3, 20)
            .with_database("shop")
            .with_sort("name", SortDirection::Desc);
        let result = gateway.list_rows(&request).await.unwrap();

        assert_eq!(result.total_count, 45);
        assert_eq!(result.total_pages, 3);
        assert_eq!(result.current_page, 3);
        assert_eq!(result.rows.len(), 5);
        assert_eq!(result.rows[0]["id"], 41);

        let calls = backend.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].1.text.starts_with("SELECT COUNT(*)"));
        assert!(calls[1].1.text.contains("ORDER BY `name` DESC"));
        assert!(calls.iter().all(|(database, _)| database.as_deref() == Some("shop")));
    }

    #[tokio::test]
    async fn test_empty_table_is_no_data_and_skips_data_statement() {
        let backend = Arc::new(RecordingBackend::default());
        let gateway = Gateway::new(backend.clone());

        let error = gateway
            .list_rows(&ViewRequest::new("users", 1, 20))
            .await
            .unwrap_err();

        match error {
            GatewayError::NoData(result) => {
                assert_eq!(result.total_count, 0);
                assert_eq!(result.total_pages, 0);
                assert!(result.rows.is_empty());
            }
            other => panic!("expected NoData, got {other:?}"),
        }
        assert_eq!(backend.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_page_past_the_end_is_no_data() {
        let gateway = Gateway::new(Arc::new(RecordingBackend::with_rows(10)));

        let error = gateway
            .list_rows(&ViewRequest::new("users", 5, 20))
            .await
            .unwrap_err();
        assert!(matches!(error, GatewayError::NoData(result) if result.total_count == 10));
    }

    #[tokio::test]
    async fn test_invalid_identifier_issues_no_statement() {
        let backend = Arc::new(RecordingBackend::with_rows(3));
        let gateway = Gateway::new(backend.clone());

        let error = gateway
            .list_rows(&ViewRequest::new("users", 1, 20).with_filter("name'--", "x"))
            .await
            .unwrap_err();
        assert!(matches!(error, GatewayError::InvalidIdentifier(_)));

        let error = gateway
            .list_rows(&ViewRequest::new("users", 1, 20).with_database("../etc/passwd"))
            .await
            .unwrap_err();
        assert!(matches!(error, GatewayError::InvalidIdentifier(_)));

        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_backend_unavailable_is_propagated() {
        let backend = RecordingBackend {
            unavailable: true,
            ..RecordingBackend::default()
        };
        let gateway = Gateway::new(Arc::new(backend));

        let error = gateway
            .list_rows(&ViewRequest::new("users", 1, 20))
            .await
            .unwrap_err();
        assert!(matches!(error, GatewayError::BackendUnavailable(_)));
    }

    #[tokio::test]
    async fn test_count_returned_as_text() {
        let backend = RecordingBackend {
            count_as_text: true,
            ..RecordingBackend::with_rows(7)
        };
        let gateway = Gateway::new(Arc::new(backend));

        let result = gateway
            .list_rows(&ViewRequest::new("users", 1, 5))
            .await
            .unwrap();
        assert_eq!(result.total_count, 7);
        assert_eq!(result.total_pages, 2);
    }

    #[tokio::test]
    async fn test_list_tables() {
        let gateway = Gateway::new(Arc::new(RecordingBackend::default()));

        let tables = gateway.list_tables("shop").await.unwrap();
        assert_eq!(tables[0]["Tables_in_shop"], "users");

        assert!(matches!(
            gateway.list_tables("empty").await,
            Err(GatewayError::NoData(_))
        ));
        assert!(matches!(
            gateway.list_tables("shop; DROP").await,
            Err(GatewayError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn test_extract_count() {
        let record = |value: Value| vec![json!({ "total": value }).as_object().unwrap().clone()];

        assert_eq!(extract_count(&record(json!(12))).unwrap(), 12);
        assert_eq!(extract_count(&record(json!("12"))).unwrap(), 12);
        assert!(extract_count(&record(json!(-1))).is_err());
        assert!(extract_count(&record(json!(null))).is_err());
        assert!(extract_count(&[]).is_err());
    }
}
