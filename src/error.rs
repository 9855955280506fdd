use thiserror::Error;

#[cfg(feature = "sqlite")]
use deadpool_sqlite::rusqlite;

/// Unified error type for every backend and for the sync engine itself.
///
/// Backend and pool errors are wrapped transparently; engine-level failures
/// carry a message. `InvalidArgument`, `TableExists`, `EmptyResult` and
/// `ShapeError` are raised by the engine before or instead of touching a
/// backend, so callers can match on them without parsing strings.
#[derive(Debug, Error)]
pub enum SqlDataSyncError {
    #[cfg(feature = "postgres")]
    #[error(transparent)]
    PostgresError(#[from] tokio_postgres::Error),

    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    #[cfg(feature = "postgres")]
    #[error(transparent)]
    PoolErrorPostgres(#[from] deadpool::managed::PoolError<tokio_postgres::Error>),

    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    PoolErrorSqlite(#[from] deadpool::managed::PoolError<rusqlite::Error>),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Table already exists: {0}")]
    TableExists(String),

    #[error("Query returned no rows: {0}")]
    EmptyResult(String),

    #[error("Unexpected result shape: {0}")]
    ShapeError(String),

    #[error("Unimplemented feature: {0}")]
    Unimplemented(String),

    #[error("Other database error: {0}")]
    Other(String),
}

#[cfg(feature = "sqlite")]
impl From<deadpool_sqlite::InteractError> for SqlDataSyncError {
    fn from(err: deadpool_sqlite::InteractError) -> Self {
        SqlDataSyncError::Other(format!("SQLite interact error: {err}"))
    }
}
