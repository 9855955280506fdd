//! Scoped transactions over any backend.
//!
//! A [`Transaction`] owns its pooled connection, so it is the only unit of
//! work on that connection until it finishes. Commit and rollback are
//! explicit and consume the transaction; a transaction dropped without
//! either is rolled back best-effort and the connection returned to the
//! pool.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::SqlDataSyncError;
use crate::pool::{BackendPool, DbHandle};
use crate::results::{DbRow, ResultSet};
use crate::stream::{ChunksInner, RowChunks};
use crate::types::{DatabaseType, IfExists, RowValues, TableSource, quote_ident};

enum TxnConn {
    #[cfg(feature = "postgres")]
    Postgres(deadpool_postgres::Object),
    #[cfg(feature = "sqlite")]
    Sqlite(deadpool_sqlite::Object),
}

/// One open unit of work against a single [`DbHandle`].
///
/// All driver operations happen through a transaction; writes become visible
/// to other transactions only after [`Transaction::commit`], while reads
/// inside the transaction observe its own uncommitted writes.
pub struct Transaction {
    conn: Option<TxnConn>,
    db_name: String,
    db_type: DatabaseType,
    chunk_size: usize,
}

impl Transaction {
    pub(crate) async fn begin(handle: &DbHandle) -> Result<Self, SqlDataSyncError> {
        let conn = match handle.pool() {
            #[cfg(feature = "postgres")]
            BackendPool::Postgres(pool) => {
                let conn = pool
                    .get()
                    .await
                    .map_err(SqlDataSyncError::PoolErrorPostgres)?;
                conn.batch_execute("BEGIN").await?;
                TxnConn::Postgres(conn)
            }
            #[cfg(feature = "sqlite")]
            BackendPool::Sqlite(pool) => {
                let conn = pool
                    .get()
                    .await
                    .map_err(SqlDataSyncError::PoolErrorSqlite)?;
                conn.interact(|conn| {
                    conn.execute_batch("BEGIN IMMEDIATE")
                        .map_err(SqlDataSyncError::SqliteError)
                })
                .await??;
                TxnConn::Sqlite(conn)
            }
        };

        Ok(Transaction {
            conn: Some(conn),
            db_name: handle.name().to_string(),
            db_type: handle.db_type(),
            chunk_size: handle.chunk_size(),
        })
    }

    /// The logical database name this transaction runs against.
    #[must_use]
    pub fn database(&self) -> &str {
        &self.db_name
    }

    /// The backend technology behind this transaction.
    #[must_use]
    pub fn db_type(&self) -> DatabaseType {
        self.db_type
    }

    /// The positional placeholder syntax of this transaction's backend.
    #[must_use]
    pub fn placeholder(&self, idx: usize) -> String {
        match self.db_type {
            #[cfg(feature = "postgres")]
            DatabaseType::Postgres => crate::postgres::placeholder(idx),
            #[cfg(feature = "sqlite")]
            DatabaseType::Sqlite => crate::sqlite::placeholder(idx),
        }
    }

    fn conn(&self) -> Result<&TxnConn, SqlDataSyncError> {
        self.conn.as_ref().ok_or_else(|| {
            SqlDataSyncError::ConnectionError("transaction already finished".to_string())
        })
    }

    /// Commit the transaction and release its connection.
    ///
    /// # Errors
    /// Returns backend errors from `COMMIT`.
    pub async fn commit(mut self) -> Result<(), SqlDataSyncError> {
        if let Some(conn) = self.conn.take() {
            match conn {
                #[cfg(feature = "postgres")]
                TxnConn::Postgres(conn) => {
                    conn.batch_execute("COMMIT").await?;
                }
                #[cfg(feature = "sqlite")]
                TxnConn::Sqlite(conn) => {
                    conn.interact(|conn| {
                        conn.execute_batch("COMMIT")
                            .map_err(SqlDataSyncError::SqliteError)
                    })
                    .await??;
                }
            }
        }
        Ok(())
    }

    /// Roll the transaction back and release its connection.
    ///
    /// # Errors
    /// Returns backend errors from `ROLLBACK`.
    pub async fn rollback(mut self) -> Result<(), SqlDataSyncError> {
        if let Some(conn) = self.conn.take() {
            match conn {
                #[cfg(feature = "postgres")]
                TxnConn::Postgres(conn) => {
                    conn.batch_execute("ROLLBACK").await?;
                }
                #[cfg(feature = "sqlite")]
                TxnConn::Sqlite(conn) => {
                    conn.interact(|conn| {
                        conn.execute_batch("ROLLBACK")
                            .map_err(SqlDataSyncError::SqliteError)
                    })
                    .await??;
                }
            }
        }
        Ok(())
    }

    /// Run a statement with no result rows; returns the affected row count.
    ///
    /// # Errors
    /// Returns `SqlDataSyncError` when the backend rejects the statement.
    pub async fn execute(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<usize, SqlDataSyncError> {
        match self.conn()? {
            #[cfg(feature = "postgres")]
            TxnConn::Postgres(conn) => crate::postgres::execute(conn, sql, params).await,
            #[cfg(feature = "sqlite")]
            TxnConn::Sqlite(conn) => crate::sqlite::execute(conn, sql, params).await,
        }
    }

    /// Run several statements as one unit.
    ///
    /// # Errors
    /// Returns `SqlDataSyncError` when the backend rejects any statement.
    pub async fn execute_script(&self, script: &str) -> Result<(), SqlDataSyncError> {
        match self.conn()? {
            #[cfg(feature = "postgres")]
            TxnConn::Postgres(conn) => crate::postgres::execute_script(conn, script).await,
            #[cfg(feature = "sqlite")]
            TxnConn::Sqlite(conn) => crate::sqlite::execute_script(conn, script).await,
        }
    }

    /// Run a read query and return every row.
    ///
    /// # Errors
    /// Returns `SqlDataSyncError` when the backend rejects the query.
    pub async fn query(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<ResultSet, SqlDataSyncError> {
        match self.conn()? {
            #[cfg(feature = "postgres")]
            TxnConn::Postgres(conn) => crate::postgres::query(conn, sql, params).await,
            #[cfg(feature = "sqlite")]
            TxnConn::Sqlite(conn) => crate::sqlite::query(conn, sql, params).await,
        }
    }

    /// Run a read query and return its first row.
    ///
    /// # Errors
    /// [`SqlDataSyncError::EmptyResult`] when the query returns no rows.
    pub async fn query_first(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<DbRow, SqlDataSyncError> {
        let mut rs = self.query(sql, params).await?;
        if rs.results.is_empty() {
            return Err(SqlDataSyncError::EmptyResult(sql.to_string()));
        }
        Ok(rs.results.swap_remove(0))
    }

    /// Run a read query and return the first column of its first row.
    ///
    /// # Errors
    /// [`SqlDataSyncError::EmptyResult`] when the query returns no rows.
    pub async fn query_first_value(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<RowValues, SqlDataSyncError> {
        let row = self.query_first(sql, params).await?;
        row.get_by_index(0).cloned().ok_or_else(|| {
            SqlDataSyncError::ShapeError(format!("query returned a zero-column row: {sql}"))
        })
    }

    /// Like [`Transaction::query_first_value`], but also rejects rows wider
    /// than one column.
    ///
    /// # Errors
    /// [`SqlDataSyncError::EmptyResult`] on zero rows,
    /// [`SqlDataSyncError::ShapeError`] when the row has more than one
    /// column.
    pub async fn query_first_value_strict(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<RowValues, SqlDataSyncError> {
        let row = self.query_first(sql, params).await?;
        if row.values.len() != 1 {
            return Err(SqlDataSyncError::ShapeError(format!(
                "expected a single column, got {}: {sql}",
                row.values.len()
            )));
        }
        Ok(row.values.into_iter().next().unwrap_or(RowValues::Null))
    }

    /// Run a read query as a lazy chunk stream tied to this transaction.
    ///
    /// # Errors
    /// Returns `SqlDataSyncError` when the backend rejects the query.
    pub async fn query_chunked<'tx>(
        &'tx self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<RowChunks<'tx>, SqlDataSyncError> {
        let inner = match self.conn()? {
            #[cfg(feature = "postgres")]
            TxnConn::Postgres(conn) => {
                let (stream, columns) = crate::postgres::open_row_stream(conn, sql, params).await?;
                ChunksInner::Postgres {
                    stream,
                    columns,
                    chunk_size: self.chunk_size,
                    done: false,
                    _tx: std::marker::PhantomData,
                }
            }
            #[cfg(feature = "sqlite")]
            TxnConn::Sqlite(conn) => ChunksInner::Sqlite {
                conn,
                sql: sql.to_string(),
                params: params.to_vec(),
                chunk_size: self.chunk_size,
                offset: 0,
                done: false,
            },
        };
        Ok(RowChunks { inner })
    }

    /// Read a whole table.
    ///
    /// # Errors
    /// Returns `SqlDataSyncError` when the table cannot be read.
    pub async fn read_table(&self, table: &str) -> Result<ResultSet, SqlDataSyncError> {
        self.query(&format!("SELECT * FROM {}", quote_ident(table)), &[])
            .await
    }

    /// Read a projection of a table.
    ///
    /// # Errors
    /// Returns `SqlDataSyncError` when the table cannot be read.
    pub async fn read_table_columns(
        &self,
        table: &str,
        columns: &[&str],
    ) -> Result<ResultSet, SqlDataSyncError> {
        let cols = columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        self.query(&format!("SELECT {cols} FROM {}", quote_ident(table)), &[])
            .await
    }

    /// Read a whole table as a lazy chunk stream.
    ///
    /// # Errors
    /// Returns `SqlDataSyncError` when the table cannot be read.
    pub async fn read_table_chunked<'tx>(
        &'tx self,
        table: &str,
    ) -> Result<RowChunks<'tx>, SqlDataSyncError> {
        // The SQLite chunker re-executes the statement per window, and bare
        // SELECTs carry no ordering guarantee across executions; rowid order
        // makes the windows deterministic. Postgres drains a single cursor,
        // which needs no explicit order.
        let sql = match self.db_type {
            #[cfg(feature = "postgres")]
            DatabaseType::Postgres => format!("SELECT * FROM {}", quote_ident(table)),
            #[cfg(feature = "sqlite")]
            DatabaseType::Sqlite => {
                format!("SELECT * FROM {} ORDER BY rowid", quote_ident(table))
            }
        };
        self.query_chunked(&sql, &[]).await
    }

    /// Check whether a physical table (or view) of this name exists.
    ///
    /// # Errors
    /// Never errors for a missing table; only genuine backend failures
    /// (connectivity, permissions) surface.
    pub async fn table_exists(&self, table: &str) -> Result<bool, SqlDataSyncError> {
        match self.conn()? {
            #[cfg(feature = "postgres")]
            TxnConn::Postgres(conn) => crate::postgres::table_exists(conn, table).await,
            #[cfg(feature = "sqlite")]
            TxnConn::Sqlite(conn) => crate::sqlite::table_exists(conn, table).await,
        }
    }

    /// Create `table` from a query or an in-memory row batch, honoring
    /// `if_exists`.
    ///
    /// # Errors
    /// [`SqlDataSyncError::TableExists`] for [`IfExists::Fail`] on a present
    /// table; backend errors otherwise.
    pub async fn create_table(
        &self,
        table: &str,
        source: TableSource<'_>,
        if_exists: IfExists,
    ) -> Result<(), SqlDataSyncError> {
        debug!(db = %self.db_name, table, ?if_exists, "create table");
        match if_exists {
            IfExists::Replace => {
                self.drop_table(table, true).await?;
                self.create_table_object(table, source).await
            }
            IfExists::Ignore => {
                if self.table_exists(table).await? {
                    Ok(())
                } else {
                    self.create_table_object(table, source).await
                }
            }
            IfExists::Fail => {
                if self.table_exists(table).await? {
                    Err(SqlDataSyncError::TableExists(table.to_string()))
                } else {
                    self.create_table_object(table, source).await
                }
            }
            IfExists::Append => {
                if self.table_exists(table).await? {
                    self.append_to_table(table, source).await
                } else {
                    self.create_table_object(table, source).await
                }
            }
        }
    }

    async fn create_table_object(
        &self,
        table: &str,
        source: TableSource<'_>,
    ) -> Result<(), SqlDataSyncError> {
        match source {
            TableSource::Query { sql, params } => {
                let ctas = format!("CREATE TABLE {} AS {sql}", quote_ident(table));
                self.execute(&ctas, params).await?;
                Ok(())
            }
            TableSource::Rows(rows) => {
                match self.conn()? {
                    #[cfg(feature = "postgres")]
                    TxnConn::Postgres(conn) => {
                        crate::postgres::create_table_from_rows(conn, table, rows).await?;
                        crate::postgres::insert_rows(conn, table, rows).await?;
                    }
                    #[cfg(feature = "sqlite")]
                    TxnConn::Sqlite(conn) => {
                        crate::sqlite::create_table_from_rows(conn, table, rows).await?;
                        crate::sqlite::insert_rows(conn, table, rows).await?;
                    }
                }
                Ok(())
            }
        }
    }

    async fn append_to_table(
        &self,
        table: &str,
        source: TableSource<'_>,
    ) -> Result<(), SqlDataSyncError> {
        match source {
            TableSource::Query { sql, params } => {
                let insert = format!("INSERT INTO {} {sql}", quote_ident(table));
                self.execute(&insert, params).await?;
                Ok(())
            }
            TableSource::Rows(rows) => {
                match self.conn()? {
                    #[cfg(feature = "postgres")]
                    TxnConn::Postgres(conn) => {
                        crate::postgres::insert_rows(conn, table, rows).await?;
                    }
                    #[cfg(feature = "sqlite")]
                    TxnConn::Sqlite(conn) => {
                        crate::sqlite::insert_rows(conn, table, rows).await?;
                    }
                }
                Ok(())
            }
        }
    }

    /// Create a view over `sql`, honoring `if_exists` (`Append` is not
    /// meaningful for views).
    ///
    /// # Errors
    /// [`SqlDataSyncError::TableExists`] for [`IfExists::Fail`] on a present
    /// view; [`SqlDataSyncError::InvalidArgument`] for [`IfExists::Append`];
    /// backend errors otherwise.
    pub async fn create_view(
        &self,
        view: &str,
        sql: &str,
        params: &[RowValues],
        if_exists: IfExists,
    ) -> Result<(), SqlDataSyncError> {
        debug!(db = %self.db_name, view, ?if_exists, "create view");
        let create = format!("CREATE VIEW {} AS {sql}", quote_ident(view));
        match if_exists {
            IfExists::Replace => {
                self.drop_view(view, true).await?;
                self.execute(&create, params).await?;
                Ok(())
            }
            IfExists::Ignore => {
                if self.table_exists(view).await? {
                    Ok(())
                } else {
                    self.execute(&create, params).await?;
                    Ok(())
                }
            }
            IfExists::Fail => {
                if self.table_exists(view).await? {
                    Err(SqlDataSyncError::TableExists(view.to_string()))
                } else {
                    self.execute(&create, params).await?;
                    Ok(())
                }
            }
            IfExists::Append => Err(SqlDataSyncError::InvalidArgument(
                "if_exists=append is not valid for views".to_string(),
            )),
        }
    }

    /// Drop a table; with `missing_ok` a missing table is a no-op.
    ///
    /// # Errors
    /// Returns backend errors, including the missing-table error when
    /// `missing_ok` is false.
    pub async fn drop_table(&self, table: &str, missing_ok: bool) -> Result<(), SqlDataSyncError> {
        let sql = if missing_ok {
            format!("DROP TABLE IF EXISTS {}", quote_ident(table))
        } else {
            format!("DROP TABLE {}", quote_ident(table))
        };
        self.execute(&sql, &[]).await?;
        Ok(())
    }

    /// Drop a view; with `missing_ok` a missing view is a no-op.
    ///
    /// # Errors
    /// Returns backend errors, including the missing-view error when
    /// `missing_ok` is false.
    pub async fn drop_view(&self, view: &str, missing_ok: bool) -> Result<(), SqlDataSyncError> {
        let sql = if missing_ok {
            format!("DROP VIEW IF EXISTS {}", quote_ident(view))
        } else {
            format!("DROP VIEW {}", quote_ident(view))
        };
        self.execute(&sql, &[]).await?;
        Ok(())
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            warn!(
                db = %self.db_name,
                "transaction dropped without commit or rollback; rolling back"
            );
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    match conn {
                        #[cfg(feature = "postgres")]
                        TxnConn::Postgres(conn) => {
                            let _ = conn.batch_execute("ROLLBACK").await;
                        }
                        #[cfg(feature = "sqlite")]
                        TxnConn::Sqlite(conn) => {
                            let _ = conn
                                .interact(|conn| conn.execute_batch("ROLLBACK"))
                                .await;
                        }
                    }
                });
            } else {
                // No runtime to roll back on. Detach the connection from the
                // pool and close it; returning it with an open transaction
                // would break the next BEGIN on that connection.
                match conn {
                    #[cfg(feature = "postgres")]
                    TxnConn::Postgres(conn) => drop(deadpool::managed::Object::take(conn)),
                    #[cfg(feature = "sqlite")]
                    TxnConn::Sqlite(conn) => drop(deadpool::managed::Object::take(conn)),
                }
            }
        }
    }
}

/// The backend-independent execution surface, for code that wants to stay
/// generic over how it got its transaction.
#[async_trait]
pub trait SqlExecutor {
    /// Run a statement with no result rows; returns the affected row count.
    async fn execute(&self, sql: &str, params: &[RowValues]) -> Result<usize, SqlDataSyncError>;

    /// Run several statements as one unit.
    async fn execute_script(&self, script: &str) -> Result<(), SqlDataSyncError>;

    /// Run a read query and return every row.
    async fn query(&self, sql: &str, params: &[RowValues])
    -> Result<ResultSet, SqlDataSyncError>;
}

#[async_trait]
impl SqlExecutor for Transaction {
    async fn execute(&self, sql: &str, params: &[RowValues]) -> Result<usize, SqlDataSyncError> {
        Transaction::execute(self, sql, params).await
    }

    async fn execute_script(&self, script: &str) -> Result<(), SqlDataSyncError> {
        Transaction::execute_script(self, script).await
    }

    async fn query(
        &self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<ResultSet, SqlDataSyncError> {
        Transaction::query(self, sql, params).await
    }
}
