use std::pin::Pin;
use std::sync::Arc;

use deadpool_postgres::Object;
use tokio_postgres::RowStream;

use crate::dialect;
use crate::error::SqlDataSyncError;
use crate::results::ResultSet;
use crate::types::{RowValues, quote_ident};

use super::params::Params;
use super::query::{build_result_set_from_rows, statement_column_names};
use super::{column_type_name, placeholder};

/// Execute a single statement (DDL or DML) and return the affected row count.
///
/// # Errors
/// Returns errors from parameter conversion or statement execution.
pub async fn execute(
    conn: &Object,
    sql: &str,
    params: &[RowValues],
) -> Result<usize, SqlDataSyncError> {
    let converted = Params::convert(params)?;
    let rows = conn.execute(sql, converted.as_refs()).await?;
    usize::try_from(rows).map_err(|e| {
        SqlDataSyncError::ExecutionError(format!("invalid rows affected count: {e}"))
    })
}

/// Execute a multi-statement script as one unit.
///
/// # Errors
/// Returns errors from batch execution.
pub async fn execute_script(conn: &Object, script: &str) -> Result<(), SqlDataSyncError> {
    conn.batch_execute(script).await?;
    Ok(())
}

/// Run a SELECT and return all rows.
///
/// # Errors
/// Returns errors from parameter conversion or query execution.
pub async fn query(
    conn: &Object,
    sql: &str,
    params: &[RowValues],
) -> Result<ResultSet, SqlDataSyncError> {
    let converted = Params::convert(params)?;
    let rows = conn.query(sql, converted.as_refs()).await?;
    build_result_set_from_rows(&rows)
}

/// Prepare `sql` and open a row stream over it inside the current
/// transaction. The stream pulls rows from the server as they are consumed,
/// so the table is never materialized on this side.
///
/// # Errors
/// Returns errors from preparation or execution.
pub async fn open_row_stream(
    conn: &Object,
    sql: &str,
    params: &[RowValues],
) -> Result<(Pin<Box<RowStream>>, Arc<Vec<String>>), SqlDataSyncError> {
    let stmt = conn.prepare(sql).await?;
    let columns = Arc::new(statement_column_names(&stmt));
    let stream = conn.query_raw(&stmt, params.to_vec()).await?;
    Ok((Box::pin(stream), columns))
}

/// Check whether a table or view of this name exists in the current schema.
///
/// # Errors
/// Never errors for a missing table; only genuine backend failures surface.
pub async fn table_exists(conn: &Object, table: &str) -> Result<bool, SqlDataSyncError> {
    let rs = query(
        conn,
        "SELECT 1 FROM information_schema.tables \
         WHERE table_schema = current_schema() AND table_name = $1",
        &[RowValues::Text(table.to_string())],
    )
    .await?;
    Ok(!rs.is_empty())
}

/// Create an empty table shaped like `rows` (types inferred per column).
///
/// # Errors
/// Returns errors from schema inference or DDL execution.
pub async fn create_table_from_rows(
    conn: &Object,
    table: &str,
    rows: &ResultSet,
) -> Result<(), SqlDataSyncError> {
    let ddl = dialect::create_table_ddl(table, rows, column_type_name)?;
    conn.batch_execute(&ddl).await?;
    Ok(())
}

/// Insert every row of the batch with one prepared statement.
///
/// # Errors
/// Returns errors from preparation or insertion.
pub async fn insert_rows(
    conn: &Object,
    table: &str,
    rows: &ResultSet,
) -> Result<usize, SqlDataSyncError> {
    let Some(column_names) = rows.get_column_names() else {
        return Err(SqlDataSyncError::ShapeError(
            "row batch has no column names".to_string(),
        ));
    };
    if rows.is_empty() {
        return Ok(0);
    }

    let cols = column_names
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = (1..=column_names.len())
        .map(placeholder)
        .collect::<Vec<_>>()
        .join(", ");
    let insert_sql = format!(
        "INSERT INTO {} ({cols}) VALUES ({placeholders})",
        quote_ident(table)
    );

    let stmt = conn.prepare(&insert_sql).await?;
    let mut inserted: u64 = 0;
    for row in &rows.results {
        let converted = Params::convert(&row.values)?;
        inserted += conn.execute(&stmt, converted.as_refs()).await?;
    }

    usize::try_from(inserted).map_err(|e| {
        SqlDataSyncError::ExecutionError(format!("invalid rows affected count: {e}"))
    })
}
