use deadpool_sqlite::rusqlite;
use deadpool_sqlite::rusqlite::types::Value;
use deadpool_sqlite::rusqlite::{Statement, ToSql};

use crate::error::SqlDataSyncError;
use crate::results::ResultSet;
use crate::types::RowValues;

/// Extract a [`RowValues`] from a `SQLite` row.
///
/// # Errors
/// Returns `SqlDataSyncError` if the value cannot be read.
pub fn sqlite_extract_value_sync(
    row: &rusqlite::Row,
    idx: usize,
) -> Result<RowValues, SqlDataSyncError> {
    let value: Value = row.get(idx).map_err(SqlDataSyncError::SqliteError)?;
    match value {
        Value::Null => Ok(RowValues::Null),
        Value::Integer(i) => Ok(RowValues::Int(i)),
        Value::Real(f) => Ok(RowValues::Float(f)),
        Value::Text(s) => Ok(RowValues::Text(s)),
        Value::Blob(b) => Ok(RowValues::Blob(b)),
    }
}

/// Run a prepared SELECT and collect the rows into a [`ResultSet`].
///
/// # Errors
/// Returns `SqlDataSyncError` if query execution or value extraction fails.
pub fn build_result_set(
    stmt: &mut Statement,
    params: &[Value],
) -> Result<ResultSet, SqlDataSyncError> {
    let param_refs: Vec<&dyn ToSql> = params.iter().map(|v| v as &dyn ToSql).collect();
    let column_names: Vec<String> = stmt
        .column_names()
        .iter()
        .map(std::string::ToString::to_string)
        .collect();
    let col_count = column_names.len();

    // Store column names once in the result set
    let column_names_rc = std::sync::Arc::new(column_names);

    let mut rows_iter = stmt.query(&param_refs[..])?;
    let mut result_set = ResultSet::with_capacity(16);
    result_set.set_column_names(column_names_rc);

    while let Some(row) = rows_iter.next()? {
        let mut row_values = Vec::with_capacity(col_count);
        for i in 0..col_count {
            row_values.push(sqlite_extract_value_sync(row, i)?);
        }
        result_set.add_row_values(row_values);
    }

    Ok(result_set)
}
