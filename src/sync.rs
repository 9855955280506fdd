//! Table-level synchronization between database handles.
//!
//! Two operations: [`copy_table`] moves a full table, [`update_table`] moves
//! only the rows past a monotonic key watermark. Both detect whether source
//! and destination are the same handle; in that case everything happens
//! server-side in one transaction, otherwise rows stream through this
//! process in bounded chunks under two independent transactions.
//!
//! Cross-handle runs are not atomic as a pair. The destination commits
//! first, then the source; a crash between the two leaves committed
//! destination rows behind, which a rerun with a non-strict key direction
//! repairs (at-least-once, not exactly-once).

use tracing::debug;

use crate::error::SqlDataSyncError;
use crate::pool::DbHandle;
use crate::transaction::Transaction;
use crate::types::{IfExists, KeyDir, RowValues, TableSource, quote_ident};

/// What the destination table looks like before an incremental update.
enum DestProbe {
    /// No table of that name.
    Absent,
    /// Table exists but holds no rows.
    Empty,
    /// Table exists and holds at least one row.
    NonEmpty,
}

async fn probe_dest(
    tx: &Transaction,
    table: &str,
    key: &str,
) -> Result<DestProbe, SqlDataSyncError> {
    if !tx.table_exists(table).await? {
        return Ok(DestProbe::Absent);
    }
    // Also proves the key column exists before any data moves.
    let sql = format!(
        "SELECT COUNT(*) FROM (SELECT {} FROM {} LIMIT 1) AS probe",
        quote_ident(key),
        quote_ident(table)
    );
    let count = tx.query_first_value(&sql, &[]).await?;
    if count.as_int() == Some(&0) {
        Ok(DestProbe::Empty)
    } else {
        Ok(DestProbe::NonEmpty)
    }
}

async fn watermark(
    tx: &Transaction,
    table: &str,
    key: &str,
    key_dir: KeyDir,
) -> Result<RowValues, SqlDataSyncError> {
    let agg = if key_dir.ascending() { "MAX" } else { "MIN" };
    let sql = format!(
        "SELECT {agg}({}) FROM {}",
        quote_ident(key),
        quote_ident(table)
    );
    tx.query_first_value(&sql, &[]).await
}

/// Copy `src_table` on `src` into `dest_table` on `dest`.
///
/// Same handle on both sides turns into a single `CREATE TABLE .. AS` (or
/// `INSERT INTO .. SELECT`) without moving rows through this process.
/// Different handles stream the table in chunks of the source handle's
/// `chunk_size`; the first chunk creates the destination table with a schema
/// inferred from the values.
///
/// # Errors
/// [`SqlDataSyncError::TableExists`] for [`IfExists::Fail`] on a present
/// destination; backend errors otherwise. On error both transactions are
/// rolled back.
pub async fn copy_table(
    src: &DbHandle,
    dest: &DbHandle,
    src_table: &str,
    dest_table: &str,
    if_exists: IfExists,
) -> Result<(), SqlDataSyncError> {
    debug!(
        src = %src.name(),
        dest = %dest.name(),
        src_table,
        dest_table,
        ?if_exists,
        "copy table"
    );

    if src.name() == dest.name() {
        let tx = src.begin().await?;
        let sql = format!("SELECT * FROM {}", quote_ident(src_table));
        let source = TableSource::Query {
            sql: &sql,
            params: &[],
        };
        match tx.create_table(dest_table, source, if_exists).await {
            Ok(()) => tx.commit().await,
            Err(e) => {
                let _ = tx.rollback().await;
                Err(e)
            }
        }
    } else {
        let src_tx = src.begin().await?;
        let dest_tx = dest.begin().await?;
        match copy_table_stream(&src_tx, &dest_tx, src_table, dest_table, if_exists).await {
            Ok(()) => {
                dest_tx.commit().await?;
                src_tx.commit().await
            }
            Err(e) => {
                let _ = dest_tx.rollback().await;
                let _ = src_tx.rollback().await;
                Err(e)
            }
        }
    }
}

async fn copy_table_stream(
    src_tx: &Transaction,
    dest_tx: &Transaction,
    src_table: &str,
    dest_table: &str,
    if_exists: IfExists,
) -> Result<(), SqlDataSyncError> {
    // Settle the if_exists policy against the destination once, up front,
    // so an existing table is handled before any source rows are read.
    match if_exists {
        IfExists::Fail => {
            if dest_tx.table_exists(dest_table).await? {
                return Err(SqlDataSyncError::TableExists(dest_table.to_string()));
            }
        }
        IfExists::Ignore => {
            if dest_tx.table_exists(dest_table).await? {
                return Ok(());
            }
        }
        IfExists::Replace => {
            dest_tx.drop_table(dest_table, true).await?;
        }
        IfExists::Append => {}
    }

    let mut chunks = src_tx.read_table_chunked(src_table).await?;
    while let Some(chunk) = chunks.next_chunk().await? {
        dest_tx
            .create_table(dest_table, TableSource::Rows(&chunk), IfExists::Append)
            .await?;
    }
    Ok(())
}

/// Bring `dest_table` up to date with `src_table` along a monotonic `key`.
///
/// An absent or empty destination is bootstrapped with a full copy. A
/// populated destination yields a watermark (`MAX` of the key for ascending
/// directions, `MIN` for descending); only source rows past the watermark
/// move. Non-strict directions (`>=`, `<=`) first delete destination rows
/// exactly at the watermark and re-copy them, so reruns after a partial
/// batch at the boundary converge instead of duplicating.
///
/// # Errors
/// Backend errors from either side. On error both transactions are rolled
/// back.
pub async fn update_table(
    src: &DbHandle,
    dest: &DbHandle,
    src_table: &str,
    dest_table: &str,
    key: &str,
    key_dir: KeyDir,
) -> Result<(), SqlDataSyncError> {
    debug!(
        src = %src.name(),
        dest = %dest.name(),
        src_table,
        dest_table,
        key,
        %key_dir,
        "update table"
    );

    if src.name() == dest.name() {
        let tx = src.begin().await?;
        match update_table_local(&tx, src_table, dest_table, key, key_dir).await {
            Ok(()) => tx.commit().await,
            Err(e) => {
                let _ = tx.rollback().await;
                Err(e)
            }
        }
    } else {
        let src_tx = src.begin().await?;
        let dest_tx = dest.begin().await?;
        match update_table_stream(&src_tx, &dest_tx, src_table, dest_table, key, key_dir).await {
            Ok(()) => {
                dest_tx.commit().await?;
                src_tx.commit().await
            }
            Err(e) => {
                let _ = dest_tx.rollback().await;
                let _ = src_tx.rollback().await;
                Err(e)
            }
        }
    }
}

async fn update_table_local(
    tx: &Transaction,
    src_table: &str,
    dest_table: &str,
    key: &str,
    key_dir: KeyDir,
) -> Result<(), SqlDataSyncError> {
    match probe_dest(tx, dest_table, key).await? {
        DestProbe::Absent | DestProbe::Empty => {
            debug!(dest_table, "destination has no rows; full copy");
            let sql = format!("SELECT * FROM {}", quote_ident(src_table));
            let source = TableSource::Query {
                sql: &sql,
                params: &[],
            };
            tx.create_table(dest_table, source, IfExists::Append).await
        }
        DestProbe::NonEmpty => {
            let top = watermark(tx, dest_table, key, key_dir).await?;
            debug!(dest_table, key, watermark = ?top, "incremental update");
            if !key_dir.strict() {
                let delete = format!(
                    "DELETE FROM {} WHERE {} = {}",
                    quote_ident(dest_table),
                    quote_ident(key),
                    tx.placeholder(1)
                );
                tx.execute(&delete, std::slice::from_ref(&top)).await?;
            }
            let insert = format!(
                "INSERT INTO {} SELECT * FROM {} WHERE {} {} {}",
                quote_ident(dest_table),
                quote_ident(src_table),
                quote_ident(key),
                key_dir.sql_op(),
                tx.placeholder(1)
            );
            tx.execute(&insert, std::slice::from_ref(&top)).await?;
            Ok(())
        }
    }
}

async fn update_table_stream(
    src_tx: &Transaction,
    dest_tx: &Transaction,
    src_table: &str,
    dest_table: &str,
    key: &str,
    key_dir: KeyDir,
) -> Result<(), SqlDataSyncError> {
    match probe_dest(dest_tx, dest_table, key).await? {
        DestProbe::Absent | DestProbe::Empty => {
            debug!(dest_table, "destination has no rows; full copy");
            let mut chunks = src_tx.read_table_chunked(src_table).await?;
            while let Some(chunk) = chunks.next_chunk().await? {
                dest_tx
                    .create_table(dest_table, TableSource::Rows(&chunk), IfExists::Append)
                    .await?;
            }
            Ok(())
        }
        DestProbe::NonEmpty => {
            let top = watermark(dest_tx, dest_table, key, key_dir).await?;
            debug!(dest_table, key, watermark = ?top, "incremental update");
            if !key_dir.strict() {
                let delete = format!(
                    "DELETE FROM {} WHERE {} = {}",
                    quote_ident(dest_table),
                    quote_ident(key),
                    dest_tx.placeholder(1)
                );
                dest_tx.execute(&delete, std::slice::from_ref(&top)).await?;
            }

            // Ordering by the key keeps chunk boundaries stable on the
            // source side, so an interrupted run stops at a clean prefix.
            let order = if key_dir.ascending() { "" } else { " DESC" };
            let select = format!(
                "SELECT * FROM {} WHERE {} {} {} ORDER BY {}{order}",
                quote_ident(src_table),
                quote_ident(key),
                key_dir.sql_op(),
                src_tx.placeholder(1),
                quote_ident(key)
            );
            let mut chunks = src_tx
                .query_chunked(&select, std::slice::from_ref(&top))
                .await?;
            while let Some(chunk) = chunks.next_chunk().await? {
                dest_tx
                    .create_table(dest_table, TableSource::Rows(&chunk), IfExists::Append)
                    .await?;
            }
            Ok(())
        }
    }
}
