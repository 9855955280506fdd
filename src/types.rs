use chrono::NaiveDateTime;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::SqlDataSyncError;

/// Values that can be stored in a database row or used as query parameters.
///
/// The same enum is used across backends so the sync engine and helper
/// functions never branch on driver types:
/// ```rust
/// use sql_datasync::prelude::*;
///
/// let params = vec![
///     RowValues::Int(1),
///     RowValues::Text("alice".into()),
///     RowValues::Bool(true),
/// ];
/// # let _ = params;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RowValues {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// JSON value
    JSON(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
}

impl RowValues {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let RowValues::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let RowValues::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<&bool> {
        if let RowValues::Bool(value) = self {
            return Some(value);
        } else if let Some(i) = self.as_int() {
            if *i == 1 {
                return Some(&true);
            } else if *i == 0 {
                return Some(&false);
            }
        }
        None
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        if let RowValues::Timestamp(value) = self {
            return Some(*value);
        } else if let Some(s) = self.as_text() {
            // Try "YYYY-MM-DD HH:MM:SS"
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Some(dt);
            }
            // Try "YYYY-MM-DD HH:MM:SS.SSS"
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
                return Some(dt);
            }
        }
        None
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        if let RowValues::Float(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let RowValues::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }
}

/// The backend technology behind a [`crate::pool::DbHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    /// `PostgreSQL` database
    #[cfg(feature = "postgres")]
    Postgres,
    /// `SQLite` database
    #[cfg(feature = "sqlite")]
    Sqlite,
}

/// What to do when the target table (or view) already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IfExists {
    /// Drop the existing object, then create it from scratch.
    Replace,
    /// Keep the existing table and insert additional rows into it. Creating
    /// the table if it does not exist yet, so chunked writers can use this
    /// uniformly for every batch after the first.
    Append,
    /// Create only if absent; succeed silently otherwise.
    Ignore,
    /// Raise [`SqlDataSyncError::TableExists`] if the object is present.
    Fail,
}

/// Boundary relation for [`crate::sync::update_table`], decomposed into
/// direction and strictness.
///
/// `>` / `>=` advance an ascending key; `<` / `<=` a descending one. The
/// non-strict forms re-verify rows exactly at the watermark (see
/// `update_table` for why).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyDir {
    Gt,
    Ge,
    Lt,
    Le,
}

impl KeyDir {
    /// Parse one of `>`, `>=`, `<`, `<=`.
    ///
    /// # Errors
    /// Returns [`SqlDataSyncError::InvalidArgument`] for any other symbol.
    pub fn parse(s: &str) -> Result<Self, SqlDataSyncError> {
        match s {
            ">" => Ok(KeyDir::Gt),
            ">=" => Ok(KeyDir::Ge),
            "<" => Ok(KeyDir::Lt),
            "<=" => Ok(KeyDir::Le),
            other => Err(SqlDataSyncError::InvalidArgument(format!(
                "invalid key_dir value {other:?}; expected one of >, >=, <, <="
            ))),
        }
    }

    /// Whether the key advances towards larger values.
    #[must_use]
    pub fn ascending(self) -> bool {
        matches!(self, KeyDir::Gt | KeyDir::Ge)
    }

    /// Whether rows exactly at the watermark are considered already synced.
    #[must_use]
    pub fn strict(self) -> bool {
        matches!(self, KeyDir::Gt | KeyDir::Lt)
    }

    /// The SQL comparison operator this direction renders to.
    #[must_use]
    pub fn sql_op(self) -> &'static str {
        match self {
            KeyDir::Gt => ">",
            KeyDir::Ge => ">=",
            KeyDir::Lt => "<",
            KeyDir::Le => "<=",
        }
    }
}

impl std::str::FromStr for KeyDir {
    type Err = SqlDataSyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KeyDir::parse(s)
    }
}

impl std::fmt::Display for KeyDir {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.sql_op())
    }
}

/// Where the contents of a new table come from.
///
/// Either a literal query run on the destination backend, or an in-memory
/// batch of rows produced elsewhere (typically one chunk of a streaming read
/// from a different backend).
#[derive(Debug, Clone, Copy)]
pub enum TableSource<'a> {
    /// `CREATE TABLE .. AS <sql>` / `INSERT INTO .. <sql>` on the same backend.
    Query {
        sql: &'a str,
        params: &'a [RowValues],
    },
    /// An in-memory row batch; schema is inferred from the values.
    Rows(&'a crate::results::ResultSet),
}

/// Quote an identifier for interpolation into generated SQL.
///
/// Both supported backends accept double-quoted identifiers with embedded
/// quotes doubled.
#[must_use]
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}
