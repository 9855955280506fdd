use deadpool_sqlite::Object;
use deadpool_sqlite::rusqlite;
use deadpool_sqlite::rusqlite::ToSql;

use crate::dialect;
use crate::error::SqlDataSyncError;
use crate::results::ResultSet;
use crate::types::{RowValues, quote_ident};

use super::params::convert_params;
use super::query::build_result_set;
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
    let sql_owned = sql.to_owned();
    let params_owned = convert_params(params)?;

    conn.interact(move |conn| -> Result<usize, SqlDataSyncError> {
        let param_refs: Vec<&dyn ToSql> = params_owned.iter().map(|v| v as &dyn ToSql).collect();
        let mut stmt = conn.prepare(&sql_owned)?;
        let rows = stmt.execute(&param_refs[..])?;
        Ok(rows)
    })
    .await?
}

/// Execute a multi-statement script as one unit.
///
/// # Errors
/// Returns errors from batch execution.
pub async fn execute_script(conn: &Object, script: &str) -> Result<(), SqlDataSyncError> {
    let script_owned = script.to_owned();

    conn.interact(move |conn| -> Result<(), SqlDataSyncError> {
        conn.execute_batch(&script_owned)?;
        Ok(())
    })
    .await?
}

/// Run a SELECT and return all rows.
///
/// # Errors
/// Returns errors from parameter conversion, preparation, or execution.
pub async fn query(
    conn: &Object,
    sql: &str,
    params: &[RowValues],
) -> Result<ResultSet, SqlDataSyncError> {
    let sql_owned = sql.to_owned();
    let params_owned = convert_params(params)?;

    conn.interact(move |conn| -> Result<ResultSet, SqlDataSyncError> {
        let mut stmt = conn.prepare(&sql_owned)?;
        build_result_set(&mut stmt, &params_owned)
    })
    .await?
}

/// Fetch one bounded window of a wrapped query: `LIMIT ?n OFFSET ?n+1` is
/// appended after the caller's placeholders. Inside the open transaction the
/// windows observe one snapshot of the database.
///
/// # Errors
/// Returns errors from parameter conversion, preparation, or execution.
pub async fn query_chunk(
    conn: &Object,
    sql: &str,
    params: &[RowValues],
    limit: usize,
    offset: usize,
) -> Result<ResultSet, SqlDataSyncError> {
    let base = sql.trim_end().trim_end_matches(';');
    let chunked_sql = format!(
        "{base} LIMIT {} OFFSET {}",
        placeholder(params.len() + 1),
        placeholder(params.len() + 2),
    );

    let mut chunk_params = params.to_vec();
    chunk_params.push(RowValues::Int(limit as i64));
    chunk_params.push(RowValues::Int(offset as i64));

    query(conn, &chunked_sql, &chunk_params).await
}

/// Check whether a table or view of this name exists.
///
/// # Errors
/// Never errors for a missing table; only genuine backend failures surface.
pub async fn table_exists(conn: &Object, table: &str) -> Result<bool, SqlDataSyncError> {
    let rs = query(
        conn,
        "SELECT name FROM sqlite_master WHERE type IN ('table', 'view') AND name = ?1",
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
    execute(conn, &ddl, &[]).await?;
    Ok(())
}

/// Insert every row of the batch with one prepared statement.
///
/// # Errors
/// Returns errors from parameter conversion or insertion.
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

    let mut converted: Vec<Vec<rusqlite::types::Value>> = Vec::with_capacity(rows.len());
    for row in &rows.results {
        converted.push(convert_params(&row.values)?);
    }

    conn.interact(move |conn| -> Result<usize, SqlDataSyncError> {
        let mut stmt = conn.prepare(&insert_sql)?;
        let mut inserted = 0;
        for row in &converted {
            let param_refs: Vec<&dyn ToSql> = row.iter().map(|v| v as &dyn ToSql).collect();
            inserted += stmt.execute(&param_refs[..])?;
        }
        Ok(inserted)
    })
    .await?
}
