use deadpool_sqlite::{Config as DeadpoolSqliteConfig, Runtime};

use crate::config::DbInstanceConfig;
use crate::error::SqlDataSyncError;
use crate::pool::{BackendPool, DbHandle};
use crate::types::DatabaseType;

/// Build a [`DbHandle`] backed by a deadpool-sqlite pool.
///
/// The pool's first connection sets WAL journaling and a busy timeout so
/// concurrent transactions from independent calls queue instead of failing.
///
/// # Errors
/// Returns `ConfigError` for a zero chunk size, `ConnectionError` if the
/// pool cannot be created or the pragmas cannot be applied.
pub async fn new_handle(
    name: &str,
    config: &DbInstanceConfig,
) -> Result<DbHandle, SqlDataSyncError> {
    if config.chunk_size == 0 {
        return Err(SqlDataSyncError::ConfigError(
            "chunk_size must be at least 1".to_string(),
        ));
    }

    let cfg = DeadpoolSqliteConfig::new(config.dbname.clone());

    let pool = cfg.create_pool(Runtime::Tokio1).map_err(|e| {
        SqlDataSyncError::ConnectionError(format!("failed to create SQLite pool: {e}"))
    })?;

    {
        let conn = pool.get().await.map_err(|e| {
            SqlDataSyncError::ConnectionError(format!("failed to open SQLite database: {e}"))
        })?;
        conn.interact(|conn| {
            conn.execute_batch(
                "
                PRAGMA journal_mode = WAL;
                PRAGMA busy_timeout = 5000;
            ",
            )
            .map_err(SqlDataSyncError::SqliteError)
        })
        .await??;
    }

    Ok(DbHandle::from_parts(
        name.to_string(),
        DatabaseType::Sqlite,
        BackendPool::Sqlite(pool),
        config.chunk_size,
    ))
}
