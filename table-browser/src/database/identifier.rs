//! Safe SQL identifiers
//!
//! Table, column and database names cannot be bound as statement parameters,
//! so they end up in statement text. This is the only path by which request
//! input becomes executable SQL, and the only characters allowed through are
//! ASCII letters, digits and underscores. Anything else is rejected, never
//! stripped. Names that pass are still emitted backtick-quoted, so reserved
//! words such as `order` or `group` stay usable as table and column names.

use std::fmt;

use crate::database::statement::StatementError;

/// A table, column or database name that is safe to interpolate
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identifier(String);

impl Identifier {
    /// Validate a raw name against `[A-Za-z0-9_]+`
    pub fn parse(raw: &str) -> Result<Self, StatementError> {
        if is_safe_identifier(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(StatementError::InvalidIdentifier(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The name as it goes into statement text
    ///
    /// Backticks quote identifiers in MySQL and SQLite alike. Validation
    /// already rules out a backtick inside the name.
    pub fn quoted(&self) -> String {
        format!("`{}`", self.0)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Whether `raw` is non-empty and consists only of ASCII letters, digits and `_`
pub fn is_safe_identifier(raw: &str) -> bool {
    !raw.is_empty()
        && raw
            .bytes()
            .all(|byte| byte.is_ascii_alphanumeric() || byte == b'_')
}
