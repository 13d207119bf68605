//! Direct SQLite backend
//!
//! Each database is a `<name>.db` file inside one directory. Every call opens
//! a read-only connection to the named file, runs one statement and closes
//! the connection again, whatever the outcome.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqliteRow};
use sqlx::{Column, ConnectOptions, Connection, Row, SqliteConnection, TypeInfo, ValueRef};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::database::statement::{BoundValue, BuiltStatement};
use crate::database::traits::{BackendError, QueryBackend};
use crate::schema::Record;

/// File extension of database files
const DATABASE_EXTENSION: &str = "db";

/// Column name used when listing databases
pub const DATABASE_COLUMN: &str = "Database";

/// SQLite backend over a directory of database files
#[derive(Debug, Clone)]
pub struct SqliteBackend {
    directory: PathBuf,
    default_database: Option<String>,
}

impl SqliteBackend {
    /// Create a new SQLite backend
    ///
    /// # Arguments
    ///
    /// * `directory` - Directory holding `<name>.db` files
    /// * `default_database` - Database used when a request names none
    pub fn new(directory: impl Into<PathBuf>, default_database: Option<String>) -> Self {
        Self {
            directory: directory.into(),
            default_database,
        }
    }

    /// Path of the file backing a database
    pub fn database_path(&self, database: &str) -> PathBuf {
        self.directory
            .join(format!("{database}.{DATABASE_EXTENSION}"))
    }

    fn resolve_database<'a>(&'a self, database: Option<&'a str>) -> Result<&'a str, BackendError> {
        database
            .or(self.default_database.as_deref())
            .ok_or(BackendError::NoDatabaseSelected)
    }

    /// Open a read-only connection to a database file
    async fn connect(&self, database: &str) -> Result<SqliteConnection, BackendError> {
        let path = self.database_path(database);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(BackendError::UnknownDatabase(database.to_string()));
        }

        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(false)
            .read_only(true);

        debug!(database, path = %path.display(), "Opening SQLite connection");
        Ok(options.connect().await?)
    }

    /// Run a statement on a fresh connection and close it afterwards
    async fn run(&self, database: &str, statement: &BuiltStatement) -> Result<Vec<Record>, BackendError> {
        let mut connection = self.connect(database).await?;

        let result = fetch_records(&mut connection, statement).await;

        if let Err(error) = connection.close().await {
            warn!(database, %error, "Failed to close SQLite connection");
        }

        result
    }
}

#[async_trait]
impl QueryBackend for SqliteBackend {
    fn kind(&self) -> &'static str {
        "sqlite"
    }

    async fn list_databases(&self) -> Result<Vec<Record>, BackendError> {
        let mut entries = tokio::fs::read_dir(&self.directory)
            .await
            .map_err(|error| BackendError::Unavailable(error.to_string()))?;

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|error| BackendError::Unavailable(error.to_string()))?
        {
            if let Some(name) = database_name(&entry.path()) {
                names.push(name);
            }
        }
        names.sort();

        Ok(names
            .into_iter()
            .map(|name| {
                let mut record = Record::new();
                record.insert(DATABASE_COLUMN.to_string(), Value::String(name));
                record
            })
            .collect())
    }

    async fn list_tables(&self, database: &str) -> Result<Vec<Record>, BackendError> {
        let statement = BuiltStatement::fixed(format!(
            "SELECT name AS `Tables_in_{database}` FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name"
        ));
        self.run(database, &statement).await
    }

    async fn execute(
        &self,
        database: Option<&str>,
        statement: &BuiltStatement,
    ) -> Result<Vec<Record>, BackendError> {
        let database = self.resolve_database(database)?;
        self.run(database, statement).await
    }
}

/// Database name for a `<name>.db` path, if it is one
fn database_name(path: &Path) -> Option<String> {
    if path.extension()?.to_str()? != DATABASE_EXTENSION {
        return None;
    }
    path.file_stem()?.to_str().map(str::to_string)
}

async fn fetch_records(
    connection: &mut SqliteConnection,
    statement: &BuiltStatement,
) -> Result<Vec<Record>, BackendError> {
    let mut arguments = SqliteArguments::default();
    for value in &statement.params {
        bind_value(&mut arguments, value)?;
    }

    let rows = sqlx::query_with(&statement.text, arguments)
        .fetch_all(&mut *connection)
        .await?;

    rows.iter().map(row_to_record).collect()
}

fn bind_value(arguments: &mut SqliteArguments<'_>, value: &BoundValue) -> Result<(), BackendError> {
    use sqlx::Arguments;

    let result = match value {
        BoundValue::Text(text) => arguments.add(text.clone()),
        BoundValue::Integer(number) => arguments.add(*number),
    };
    result.map_err(|error| BackendError::Query(error.to_string()))
}

/// Convert a SQLite row to a record
fn row_to_record(row: &SqliteRow) -> Result<Record, BackendError> {
    let mut record = Record::new();

    for column in row.columns() {
        let value = extract_column_value(row, column)?;
        record.insert(column.name().to_string(), value);
    }

    Ok(record)
}

/// Extract a column value from a SQLite row and convert it to JSON
///
/// SQLite is dynamically typed, so the declared type is only a hint. Values
/// that do not decode as the hinted type fall through to the generic attempts.
fn extract_column_value(row: &SqliteRow, column: &sqlx::sqlite::SqliteColumn) -> Result<Value, BackendError> {
    let index = column.ordinal();

    if row.try_get_raw(index)?.is_null() {
        return Ok(Value::Null);
    }

    match column.type_info().name() {
        "INTEGER" | "BIGINT" | "INT" => {
            if let Ok(value) = row.try_get::<i64, _>(index) {
                return Ok(Value::Number(value.into()));
            }
        }
        "REAL" | "FLOAT" | "DOUBLE" => {
            if let Ok(value) = row.try_get::<f64, _>(index) {
                if let Some(number) = serde_json::Number::from_f64(value) {
                    return Ok(Value::Number(number));
                }
            }
        }
        "BOOLEAN" | "BOOL" => {
            if let Ok(value) = row.try_get::<bool, _>(index) {
                return Ok(Value::Bool(value));
            }
        }
        "BLOB" => {
            if let Ok(value) = row.try_get::<Vec<u8>, _>(index) {
                return Ok(Value::String(format!("[BLOB: {} bytes]", value.len())));
            }
        }
        _ => {}
    }

    if let Ok(value) = row.try_get::<String, _>(index) {
        return Ok(Value::String(value));
    }
    if let Ok(value) = row.try_get::<i64, _>(index) {
        return Ok(Value::Number(value.into()));
    }
    if let Ok(value) = row.try_get::<f64, _>(index) {
        if let Some(number) = serde_json::Number::from_f64(value) {
            return Ok(Value::Number(number));
        }
    }
    if let Ok(value) = row.try_get::<Vec<u8>, _>(index) {
        return Ok(Value::String(format!("[BLOB: {} bytes]", value.len())));
    }

    Ok(Value::Null)
}
