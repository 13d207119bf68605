//! Statement building for table views
//!
//! Turns a [`ViewRequest`] into a count statement and a data statement. This
//! is pure string assembly; nothing here touches a connection.
//!
//! Identifiers go into the text validated and quoted, every filter value goes
//! into the parameter list. Placeholders use `?`, which both MySQL and SQLite
//! understand, and the proxy forwards positionally.
//!
//! When sorting, rows with equal sort keys come back in whatever order the
//! storage engine yields them. No tie-breaking column is added, so paging
//! through such rows is not guaranteed to be stable.

use serde::Serialize;
use thiserror::Error;

use crate::database::identifier::Identifier;
use crate::schema::ViewRequest;

/// A value bound to a `?` placeholder
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum BoundValue {
    Text(String),
    Integer(i64),
}

/// Statement text plus its ordered bound parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltStatement {
    pub text: String,
    pub params: Vec<BoundValue>,
}

impl BuiltStatement {
    /// A statement without parameters
    pub fn fixed(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            params: Vec::new(),
        }
    }
}

/// The pair of statements needed to render one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewStatements {
    /// `SELECT COUNT(*) AS total ...` over the filtered, unpaginated set
    pub count: BuiltStatement,

    /// `SELECT * ...` with ordering and `LIMIT ? OFFSET ?`
    pub data: BuiltStatement,
}

/// Column alias of the count statement's single value
pub const COUNT_COLUMN: &str = "total";

/// Errors raised while building statements
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatementError {
    /// A table, column or database name failed validation
    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    /// Page or page size is zero, or the offset does not fit
    #[error("Invalid pagination: page {page}, page size {page_size}")]
    InvalidPagination { page: u64, page_size: u64 },
}

/// Build the count and data statements for a view request
///
/// Fails without producing anything if the table, the sort column or any
/// filter column is not a safe identifier.
pub fn build_view_statements(request: &ViewRequest) -> Result<ViewStatements, StatementError> {
    let table = Identifier::parse(&request.table)?.quoted();
    let (limit, offset) = pagination(request.page, request.page_size)?;
    let (where_clause, filter_values) = build_where_clause(request)?;
    let order_clause = build_order_clause(request)?;

    let count = BuiltStatement {
        text: format!("SELECT COUNT(*) AS {COUNT_COLUMN} FROM {table}{where_clause}"),
        params: filter_values.clone(),
    };

    let mut data_params = filter_values;
    data_params.push(BoundValue::Integer(limit));
    data_params.push(BoundValue::Integer(offset));

    let data = BuiltStatement {
        text: format!("SELECT * FROM {table}{where_clause}{order_clause} LIMIT ? OFFSET ?"),
        params: data_params,
    };

    Ok(ViewStatements { count, data })
}

/// Limit and offset for a 1-based page
fn pagination(page: u64, page_size: u64) -> Result<(i64, i64), StatementError> {
    let invalid = || StatementError::InvalidPagination { page, page_size };

    if page == 0 || page_size == 0 {
        return Err(invalid());
    }

    let limit = i64::try_from(page_size).map_err(|_| invalid())?;
    let offset = (page - 1)
        .checked_mul(page_size)
        .and_then(|offset| i64::try_from(offset).ok())
        .ok_or_else(invalid)?;

    Ok((limit, offset))
}

/// Build `` WHERE `a` LIKE ? AND `b` LIKE ?``, or an empty string when no filter applies
fn build_where_clause(request: &ViewRequest) -> Result<(String, Vec<BoundValue>), StatementError> {
    let mut conditions = Vec::new();
    let mut values = Vec::new();

    for (column, value) in &request.filters {
        if value.trim().is_empty() {
            continue;
        }

        let column = Identifier::parse(column)?.quoted();
        conditions.push(format!("{column} LIKE ?"));
        values.push(BoundValue::Text(format!("%{value}%")));
    }

    if conditions.is_empty() {
        return Ok((String::new(), values));
    }

    Ok((format!(" WHERE {}", conditions.join(" AND ")), values))
}

fn build_order_clause(request: &ViewRequest) -> Result<String, StatementError> {
    match &request.sort {
        Some(sort) => {
            let column = Identifier::parse(&sort.column)?.quoted();
            Ok(format!(" ORDER BY {column} {}", sort.direction.as_sql()))
        }
        None => Ok(String::new()),
    }
}
