//! Direct MySQL backend
//!
//! Opens one connection per call with the target database set in the connect
//! options, so the database is selected before any statement runs on that
//! connection. The connection is closed on every exit path.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::mysql::{MySqlArguments, MySqlConnectOptions, MySqlRow};
use sqlx::types::chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::{Arguments, Column, ConnectOptions, Connection, MySqlConnection, Row, TypeInfo, ValueRef};
use tracing::{debug, warn};

use crate::database::statement::{BoundValue, BuiltStatement};
use crate::database::traits::{BackendError, QueryBackend};
use crate::schema::Record;

/// Connection settings for a MySQL server
#[derive(Debug, Clone)]
pub struct MySqlSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,

    /// Database used when a request names none
    pub database: Option<String>,
}

/// MySQL backend
#[derive(Debug, Clone)]
pub struct MySqlBackend {
    options: MySqlConnectOptions,
    default_database: Option<String>,
}

impl MySqlBackend {
    /// Create a new MySQL backend
    ///
    /// No connection is opened until the first call.
    pub fn new(settings: MySqlSettings) -> Self {
        let options = MySqlConnectOptions::new()
            .host(&settings.host)
            .port(settings.port)
            .username(&settings.user)
            .password(&settings.password);

        Self {
            options,
            default_database: settings.database.filter(|name| !name.is_empty()),
        }
    }

    /// Open a connection with `database` selected, if given
    async fn connect(&self, database: Option<&str>) -> Result<MySqlConnection, BackendError> {
        let options = match database {
            Some(database) => self.options.clone().database(database),
            None => self.options.clone(),
        };

        debug!(database = ?database, "Opening MySQL connection");
        options.connect().await.map_err(|error| match error {
            sqlx::Error::Database(ref database_error)
                if database_error.code().as_deref() == Some("42000") =>
            {
                BackendError::UnknownDatabase(database.unwrap_or_default().to_string())
            }
            other => BackendError::Unavailable(other.to_string()),
        })
    }

    /// Run a statement on a fresh connection and close it afterwards
    async fn run(
        &self,
        database: Option<&str>,
        statement: &BuiltStatement,
    ) -> Result<Vec<Record>, BackendError> {
        let mut connection = self.connect(database).await?;

        let result = fetch_records(&mut connection, statement).await;

        if let Err(error) = connection.close().await {
            warn!(database = ?database, %error, "Failed to close MySQL connection");
        }

        result
    }
}

#[async_trait]
impl QueryBackend for MySqlBackend {
    fn kind(&self) -> &'static str {
        "mysql"
    }

    async fn list_databases(&self) -> Result<Vec<Record>, BackendError> {
        self.run(None, &BuiltStatement::fixed("SHOW DATABASES")).await
    }

    async fn list_tables(&self, database: &str) -> Result<Vec<Record>, BackendError> {
        self.run(Some(database), &BuiltStatement::fixed("SHOW TABLES"))
            .await
    }

    async fn execute(
        &self,
        database: Option<&str>,
        statement: &BuiltStatement,
    ) -> Result<Vec<Record>, BackendError> {
        let database = database
            .or(self.default_database.as_deref())
            .ok_or(BackendError::NoDatabaseSelected)?;
        self.run(Some(database), statement).await
    }
}

async fn fetch_records(
    connection: &mut MySqlConnection,
    statement: &BuiltStatement,
) -> Result<Vec<Record>, BackendError> {
    let mut arguments = MySqlArguments::default();
    for value in &statement.params {
        let result = match value {
            BoundValue::Text(text) => arguments.add(text.clone()),
            BoundValue::Integer(number) => arguments.add(*number),
        };
        result.map_err(|error| BackendError::Query(error.to_string()))?;
    }

    let rows = sqlx::query_with(&statement.text, arguments)
        .fetch_all(&mut *connection)
        .await?;

    rows.iter().map(row_to_record).collect()
}

/// Convert a MySQL row to a record
fn row_to_record(row: &MySqlRow) -> Result<Record, BackendError> {
    let mut record = Record::new();

    for column in row.columns() {
        let index = column.ordinal();
        let value = if row.try_get_raw(index)?.is_null() {
            Value::Null
        } else {
            extract_column_value(row, index, column.type_info().name())?
        };
        record.insert(column.name().to_string(), value);
    }

    Ok(record)
}

fn extract_column_value(row: &MySqlRow, index: usize, type_name: &str) -> Result<Value, BackendError> {
    let value = match type_name {
        "BOOLEAN" => Value::Bool(row.try_get::<bool, _>(index)?),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
            Value::Number(row.try_get::<i64, _>(index)?.into())
        }
        "YEAR" => Value::Number(row.try_get_unchecked::<u16, _>(index)?.into()),
        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "BIGINT UNSIGNED" => Value::Number(row.try_get::<u64, _>(index)?.into()),
        "FLOAT" | "DOUBLE" => serde_json::Number::from_f64(row.try_get::<f64, _>(index)?)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        // Kept as text to preserve precision
        "DECIMAL" => Value::String(row.try_get_unchecked::<String, _>(index)?),
        "DATETIME" => Value::String(row.try_get::<NaiveDateTime, _>(index)?.to_string()),
        "TIMESTAMP" => Value::String(row.try_get::<DateTime<Utc>, _>(index)?.to_rfc3339()),
        "DATE" => Value::String(row.try_get::<NaiveDate, _>(index)?.to_string()),
        "TIME" => Value::String(row.try_get::<NaiveTime, _>(index)?.to_string()),
        "JSON" => {
            let text = row.try_get_unchecked::<String, _>(index)?;
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        }
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" => {
            // SHOW statements report names as binary strings on some servers
            binary_value(row.try_get::<Vec<u8>, _>(index)?)
        }
        _ => match row.try_get::<String, _>(index) {
            Ok(text) => Value::String(text),
            Err(_) => Value::String(row.try_get_unchecked::<String, _>(index)?),
        },
    };

    Ok(value)
}

/// Text for UTF-8 binary values, a size placeholder for anything else
fn binary_value(bytes: Vec<u8>) -> Value {
    match String::from_utf8(bytes) {
        Ok(text) => Value::String(text),
        Err(error) => Value::String(format!("[BLOB: {} bytes]", error.as_bytes().len())),
    }
}
