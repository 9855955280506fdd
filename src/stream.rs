//! Lazy, bounded-memory row streams.
//!
//! A [`RowChunks`] is finite, forward-only and not restartable. It borrows
//! the [`crate::transaction::Transaction`] that produced it, so it cannot
//! outlive the transaction's scope; committing or rolling back first requires
//! the stream to be dropped, and dropping the transaction closes whatever
//! server-side cursor the stream was draining.

#[cfg(feature = "postgres")]
use std::pin::Pin;
#[cfg(feature = "postgres")]
use std::sync::Arc;

#[cfg(feature = "postgres")]
use futures_util::StreamExt;
#[cfg(feature = "postgres")]
use tokio_postgres::RowStream;

use crate::error::SqlDataSyncError;
use crate::results::ResultSet;
#[cfg(feature = "sqlite")]
use crate::types::RowValues;

/// A chunked, lazy sequence of rows tied to its producing transaction.
///
/// Each call to [`RowChunks::next_chunk`] yields at most `chunk_size` rows in
/// source order; `None` marks exhaustion. Consuming the stream fully drains
/// the underlying cursor exactly once.
pub struct RowChunks<'tx> {
    pub(crate) inner: ChunksInner<'tx>,
}

pub(crate) enum ChunksInner<'tx> {
    /// Wraps a `tokio_postgres` row stream running inside the borrowed
    /// transaction's connection.
    #[cfg(feature = "postgres")]
    Postgres {
        stream: Pin<Box<RowStream>>,
        columns: Arc<Vec<String>>,
        chunk_size: usize,
        done: bool,
        _tx: std::marker::PhantomData<&'tx ()>,
    },
    /// Re-issues the wrapped query with a sliding LIMIT/OFFSET window inside
    /// the borrowed transaction, which pins one snapshot of the database.
    #[cfg(feature = "sqlite")]
    Sqlite {
        conn: &'tx deadpool_sqlite::Object,
        sql: String,
        params: Vec<RowValues>,
        chunk_size: usize,
        offset: usize,
        done: bool,
    },
}

impl RowChunks<'_> {
    /// Fetch the next batch of rows, or `None` once the sequence is
    /// exhausted.
    ///
    /// # Errors
    /// Returns backend errors from the underlying fetch; the stream should
    /// be considered dead afterwards.
    pub async fn next_chunk(&mut self) -> Result<Option<ResultSet>, SqlDataSyncError> {
        match &mut self.inner {
            #[cfg(feature = "postgres")]
            ChunksInner::Postgres {
                stream,
                columns,
                chunk_size,
                done,
                ..
            } => {
                if *done {
                    return Ok(None);
                }

                let mut result_set = ResultSet::with_capacity(*chunk_size);
                result_set.set_column_names(columns.clone());

                while result_set.len() < *chunk_size {
                    match stream.next().await {
                        Some(row) => {
                            let row = row?;
                            let col_count = columns.len();
                            let mut row_values = Vec::with_capacity(col_count);
                            for idx in 0..col_count {
                                row_values
                                    .push(crate::postgres::query::postgres_extract_value(
                                        &row, idx,
                                    )?);
                            }
                            result_set.add_row_values(row_values);
                        }
                        None => {
                            *done = true;
                            break;
                        }
                    }
                }

                if result_set.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(result_set))
                }
            }
            #[cfg(feature = "sqlite")]
            ChunksInner::Sqlite {
                conn,
                sql,
                params,
                chunk_size,
                offset,
                done,
            } => {
                if *done {
                    return Ok(None);
                }

                let chunk =
                    crate::sqlite::query_chunk(conn, sql, params, *chunk_size, *offset).await?;
                if chunk.len() < *chunk_size {
                    *done = true;
                }
                if chunk.is_empty() {
                    Ok(None)
                } else {
                    *offset += chunk.len();
                    Ok(Some(chunk))
                }
            }
        }
    }

    /// Drain the remaining chunks into one result set. Intended for small
    /// tables and tests; defeats the bounded-memory purpose otherwise.
    ///
    /// # Errors
    /// Returns errors from the underlying fetches.
    pub async fn collect_all(mut self) -> Result<ResultSet, SqlDataSyncError> {
        let mut all = ResultSet::default();
        while let Some(chunk) = self.next_chunk().await? {
            if all.get_column_names().is_none() {
                if let Some(cols) = chunk.get_column_names() {
                    all.set_column_names(cols.clone());
                }
            }
            for row in chunk.results {
                all.add_row(row);
            }
        }
        Ok(all)
    }
}
