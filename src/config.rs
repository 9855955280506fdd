use serde::{Deserialize, Serialize};

use crate::types::DatabaseType;

/// Rows fetched per chunk by the streaming readers unless a
/// [`DbInstanceConfig`] overrides it.
pub const DEFAULT_CHUNK_SIZE: usize = 5000;

/// Connection parameters for one logical database instance.
///
/// This is the shape the registry consumes; loading and merging configuration
/// files is the caller's concern. Deserializes from the obvious JSON:
/// ```rust
/// use sql_datasync::config::DbInstanceConfig;
///
/// let cfg: DbInstanceConfig = serde_json::from_str(
///     r#"{ "driver": "sqlite", "dbname": "work.db" }"#,
/// ).unwrap();
/// # let _ = cfg;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbInstanceConfig {
    /// Backend technology; defaults to `SQLite` like the original system.
    #[serde(default = "default_driver")]
    pub driver: DatabaseType,
    /// Database name (Postgres) or file path (`SQLite`).
    pub dbname: String,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Rows per chunk for streaming reads against this instance.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

impl DbInstanceConfig {
    /// Shorthand for a `SQLite` instance backed by `path`.
    #[cfg(feature = "sqlite")]
    #[must_use]
    pub fn sqlite(path: impl Into<String>) -> Self {
        DbInstanceConfig {
            driver: DatabaseType::Sqlite,
            dbname: path.into(),
            host: None,
            port: None,
            user: None,
            password: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Shorthand for a Postgres instance.
    #[cfg(feature = "postgres")]
    #[must_use]
    pub fn postgres(
        dbname: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        DbInstanceConfig {
            driver: DatabaseType::Postgres,
            dbname: dbname.into(),
            host: Some(host.into()),
            port: Some(port),
            user: Some(user.into()),
            password: Some(password.into()),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Override the chunk size for streaming reads.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

#[allow(unreachable_code)]
fn default_driver() -> DatabaseType {
    #[cfg(feature = "sqlite")]
    return DatabaseType::Sqlite;
    #[cfg(feature = "postgres")]
    return DatabaseType::Postgres;
}
