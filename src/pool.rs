#[cfg(feature = "postgres")]
use deadpool_postgres::Pool as DeadpoolPostgresPool;
#[cfg(feature = "sqlite")]
use deadpool_sqlite::Pool as DeadpoolSqlitePool;

use crate::config::DbInstanceConfig;
use crate::error::SqlDataSyncError;
use crate::transaction::Transaction;
use crate::types::DatabaseType;

/// Connection pool for one backend technology.
#[derive(Clone)]
pub enum BackendPool {
    /// `PostgreSQL` connection pool
    #[cfg(feature = "postgres")]
    Postgres(DeadpoolPostgresPool),
    /// `SQLite` connection pool
    #[cfg(feature = "sqlite")]
    Sqlite(DeadpoolSqlitePool),
}

impl std::fmt::Debug for BackendPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            #[cfg(feature = "postgres")]
            Self::Postgres(_) => f.debug_tuple("Postgres").field(&"<PostgresPool>").finish(),
            #[cfg(feature = "sqlite")]
            Self::Sqlite(_) => f.debug_tuple("Sqlite").field(&"<SqlitePool>").finish(),
        }
    }
}

/// One configured connection target: a logical database name bound to a
/// connection pool.
///
/// Handles are created once per name (usually through [`crate::registry`])
/// and live for the life of the process; cloning shares the pool. All data
/// operations go through [`DbHandle::begin`].
#[derive(Clone, Debug)]
pub struct DbHandle {
    name: String,
    db_type: DatabaseType,
    pool: BackendPool,
    chunk_size: usize,
}

impl DbHandle {
    /// Build a handle from an instance configuration.
    ///
    /// # Errors
    /// Returns `ConfigError` for missing parameters and `ConnectionError`
    /// when the pool cannot be created.
    pub async fn from_config(
        name: &str,
        config: &DbInstanceConfig,
    ) -> Result<Self, SqlDataSyncError> {
        match config.driver {
            #[cfg(feature = "postgres")]
            DatabaseType::Postgres => crate::postgres::new_handle(name, config).await,
            #[cfg(feature = "sqlite")]
            DatabaseType::Sqlite => crate::sqlite::new_handle(name, config).await,
        }
    }

    /// Build a Postgres-backed handle.
    ///
    /// # Errors
    /// Same as [`DbHandle::from_config`].
    #[cfg(feature = "postgres")]
    pub async fn new_postgres(
        name: &str,
        config: &DbInstanceConfig,
    ) -> Result<Self, SqlDataSyncError> {
        crate::postgres::new_handle(name, config).await
    }

    /// Build a `SQLite`-backed handle.
    ///
    /// # Errors
    /// Same as [`DbHandle::from_config`].
    #[cfg(feature = "sqlite")]
    pub async fn new_sqlite(
        name: &str,
        config: &DbInstanceConfig,
    ) -> Result<Self, SqlDataSyncError> {
        crate::sqlite::new_handle(name, config).await
    }

    pub(crate) fn from_parts(
        name: String,
        db_type: DatabaseType,
        pool: BackendPool,
        chunk_size: usize,
    ) -> Self {
        DbHandle {
            name,
            db_type,
            pool,
            chunk_size,
        }
    }

    /// The logical name this handle was registered under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The backend technology behind this handle.
    #[must_use]
    pub fn db_type(&self) -> DatabaseType {
        self.db_type
    }

    /// Rows per chunk for streaming reads through this handle.
    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    #[must_use]
    pub fn pool(&self) -> &BackendPool {
        &self.pool
    }

    /// Check out a connection and open a transaction on it.
    ///
    /// The transaction owns the pooled connection until it is committed or
    /// rolled back, so at most one live transaction exists per connection.
    ///
    /// # Errors
    /// Returns pool errors when no connection can be acquired and backend
    /// errors when `BEGIN` fails.
    pub async fn begin(&self) -> Result<Transaction, SqlDataSyncError> {
        Transaction::begin(self).await
    }
}
