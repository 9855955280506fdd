use deadpool_postgres::Config as PgConfig;
use tokio_postgres::NoTls;

use crate::config::DbInstanceConfig;
use crate::error::SqlDataSyncError;
use crate::pool::{BackendPool, DbHandle};
use crate::types::DatabaseType;

/// Build a [`DbHandle`] backed by a deadpool-postgres pool.
///
/// # Errors
/// Returns `SqlDataSyncError::ConfigError` if a required connection
/// parameter is missing or the chunk size is zero,
/// `SqlDataSyncError::ConnectionError` if pool creation fails.
pub async fn new_handle(
    name: &str,
    config: &DbInstanceConfig,
) -> Result<DbHandle, SqlDataSyncError> {
    if config.chunk_size == 0 {
        return Err(SqlDataSyncError::ConfigError(
            "chunk_size must be at least 1".to_string(),
        ));
    }

    let host = config
        .host
        .clone()
        .ok_or_else(|| SqlDataSyncError::ConfigError("host is required".to_string()))?;
    let port = config
        .port
        .ok_or_else(|| SqlDataSyncError::ConfigError("port is required".to_string()))?;
    let user = config
        .user
        .clone()
        .ok_or_else(|| SqlDataSyncError::ConfigError("user is required".to_string()))?;
    let password = config
        .password
        .clone()
        .ok_or_else(|| SqlDataSyncError::ConfigError("password is required".to_string()))?;

    let mut pg_config = PgConfig::new();
    pg_config.dbname = Some(config.dbname.clone());
    pg_config.host = Some(host);
    pg_config.port = Some(port);
    pg_config.user = Some(user);
    pg_config.password = Some(password);

    let pool = pg_config
        .create_pool(Some(deadpool_postgres::Runtime::Tokio1), NoTls)
        .map_err(|e| {
            SqlDataSyncError::ConnectionError(format!("failed to create Postgres pool: {e}"))
        })?;

    Ok(DbHandle::from_parts(
        name.to_string(),
        DatabaseType::Postgres,
        BackendPool::Postgres(pool),
        config.chunk_size,
    ))
}
