//! Process-wide registry of named database instances.
//!
//! Configurations are registered up front; handles (and their pools) are
//! built lazily on first lookup and then shared for the life of the
//! process. The module-level functions are one-shot conveniences that open
//! a transaction, run a single operation and commit, for callers that do
//! not need to group statements:
//! ```rust,no_run
//! use sql_datasync::config::DbInstanceConfig;
//! use sql_datasync::registry;
//! use sql_datasync::types::IfExists;
//!
//! # async fn demo() -> Result<(), sql_datasync::SqlDataSyncError> {
//! registry::register_config("work", DbInstanceConfig::sqlite("work.db"));
//! registry::register_config("output", DbInstanceConfig::sqlite("output.db"));
//!
//! registry::execute("work", "UPDATE jobs SET state = 'done'", &[]).await?;
//! registry::copy_table("work", "jobs", "output", None, IfExists::Replace).await?;
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::sync::{LazyLock, Mutex};

use crate::config::DbInstanceConfig;
use crate::error::SqlDataSyncError;
use crate::pool::DbHandle;
use crate::results::{DbRow, ResultSet};
use crate::transaction::Transaction;
use crate::types::{IfExists, KeyDir, RowValues, TableSource};

static CONFIGS: LazyLock<Mutex<HashMap<String, DbInstanceConfig>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

static HANDLES: LazyLock<Mutex<HashMap<String, DbHandle>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Register the configuration for a named instance. Replaces any previous
/// configuration of that name, but an already built handle keeps running
/// with its old settings.
pub fn register_config(name: &str, config: DbInstanceConfig) {
    let mut configs = CONFIGS.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    configs.insert(name.to_string(), config);
}

/// Register an externally built handle under its own name, bypassing lazy
/// construction.
pub fn register_handle(handle: DbHandle) {
    let mut handles = HANDLES.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    handles.insert(handle.name().to_string(), handle);
}

/// Look up a handle by name, building it from its registered configuration
/// on first use.
///
/// # Errors
/// [`SqlDataSyncError::ConfigError`] for a name with no registered
/// configuration; connection errors when the pool cannot be built.
pub async fn lookup(name: &str) -> Result<DbHandle, SqlDataSyncError> {
    let config = {
        let handles = HANDLES.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(handle) = handles.get(name) {
            return Ok(handle.clone());
        }
        let configs = CONFIGS.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        configs.get(name).cloned().ok_or_else(|| {
            SqlDataSyncError::ConfigError(format!("no database instance named {name:?}"))
        })?
    };

    // The pool is built outside the lock; if two tasks race here, the first
    // insert wins and the loser's pool is dropped.
    let handle = DbHandle::from_config(name, &config).await?;
    let mut handles = HANDLES.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    Ok(handles
        .entry(name.to_string())
        .or_insert(handle)
        .clone())
}

/// Open a transaction on the named instance.
///
/// # Errors
/// Lookup errors, pool errors, or backend errors from `BEGIN`.
pub async fn begin(name: &str) -> Result<Transaction, SqlDataSyncError> {
    lookup(name).await?.begin().await
}

async fn one_shot<T, F>(name: &str, op: F) -> Result<T, SqlDataSyncError>
where
    F: AsyncFnOnce(&Transaction) -> Result<T, SqlDataSyncError>,
{
    let tx = begin(name).await?;
    match op(&tx).await {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(e) => {
            let _ = tx.rollback().await;
            Err(e)
        }
    }
}

/// Run a read query on the named instance and return every row.
///
/// # Errors
/// Lookup or backend errors.
pub async fn query(
    name: &str,
    sql: &str,
    params: &[RowValues],
) -> Result<ResultSet, SqlDataSyncError> {
    one_shot(name, async |tx| tx.query(sql, params).await).await
}

/// Run a read query on the named instance and return its first row.
///
/// # Errors
/// [`SqlDataSyncError::EmptyResult`] on zero rows; lookup or backend errors.
pub async fn query_first(
    name: &str,
    sql: &str,
    params: &[RowValues],
) -> Result<DbRow, SqlDataSyncError> {
    one_shot(name, async |tx| tx.query_first(sql, params).await).await
}

/// Run a read query on the named instance and return the first column of
/// its first row.
///
/// # Errors
/// [`SqlDataSyncError::EmptyResult`] on zero rows; lookup or backend errors.
pub async fn query_first_value(
    name: &str,
    sql: &str,
    params: &[RowValues],
) -> Result<RowValues, SqlDataSyncError> {
    one_shot(name, async |tx| tx.query_first_value(sql, params).await).await
}

/// Run a statement on the named instance; returns the affected row count.
///
/// # Errors
/// Lookup or backend errors.
pub async fn execute(
    name: &str,
    sql: &str,
    params: &[RowValues],
) -> Result<usize, SqlDataSyncError> {
    one_shot(name, async |tx| tx.execute(sql, params).await).await
}

/// Run a multi-statement script on the named instance.
///
/// # Errors
/// Lookup or backend errors.
pub async fn execute_script(name: &str, script: &str) -> Result<(), SqlDataSyncError> {
    one_shot(name, async |tx| tx.execute_script(script).await).await
}

/// Create a table on the named instance from a query run there.
///
/// # Errors
/// [`SqlDataSyncError::TableExists`] for [`IfExists::Fail`] on a present
/// table; lookup or backend errors.
pub async fn create_table(
    name: &str,
    table: &str,
    sql: &str,
    params: &[RowValues],
    if_exists: IfExists,
) -> Result<(), SqlDataSyncError> {
    one_shot(name, async |tx| {
        tx.create_table(table, TableSource::Query { sql, params }, if_exists)
            .await
    })
    .await
}

/// Create a view on the named instance.
///
/// # Errors
/// Same as [`crate::transaction::Transaction::create_view`], plus lookup
/// errors.
pub async fn create_view(
    name: &str,
    view: &str,
    sql: &str,
    params: &[RowValues],
    if_exists: IfExists,
) -> Result<(), SqlDataSyncError> {
    one_shot(name, async |tx| {
        tx.create_view(view, sql, params, if_exists).await
    })
    .await
}

/// Read a whole table from the named instance.
///
/// # Errors
/// Lookup or backend errors.
pub async fn read_table(name: &str, table: &str) -> Result<ResultSet, SqlDataSyncError> {
    one_shot(name, async |tx| tx.read_table(table).await).await
}

/// Copy a table between two named instances. `to_table` defaults to the
/// source table name.
///
/// # Errors
/// Same as [`crate::sync::copy_table`], plus lookup errors.
pub async fn copy_table(
    from_db: &str,
    from_table: &str,
    to_db: &str,
    to_table: Option<&str>,
    if_exists: IfExists,
) -> Result<(), SqlDataSyncError> {
    let src = lookup(from_db).await?;
    let dest = lookup(to_db).await?;
    crate::sync::copy_table(
        &src,
        &dest,
        from_table,
        to_table.unwrap_or(from_table),
        if_exists,
    )
    .await
}

/// Incrementally update a table between two named instances along `key`.
/// `to_table` defaults to the source table name; `key_dir` is one of `>`,
/// `>=`, `<`, `<=`.
///
/// # Errors
/// [`SqlDataSyncError::InvalidArgument`] for an unrecognized `key_dir`,
/// raised before either instance is looked up; otherwise same as
/// [`crate::sync::update_table`], plus lookup errors.
pub async fn update_table(
    from_db: &str,
    from_table: &str,
    to_db: &str,
    to_table: Option<&str>,
    key: &str,
    key_dir: &str,
) -> Result<(), SqlDataSyncError> {
    let key_dir = KeyDir::parse(key_dir)?;
    let src = lookup(from_db).await?;
    let dest = lookup(to_db).await?;
    crate::sync::update_table(
        &src,
        &dest,
        from_table,
        to_table.unwrap_or(from_table),
        key,
        key_dir,
    )
    .await
}
