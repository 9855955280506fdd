//! Schema inference for row-batch table creation.
//!
//! When a table is created from an in-memory row batch (the cross-backend
//! streaming path), its column types are inferred from the first non-null
//! value seen per column. The backend modules map each [`ColumnKind`] to a
//! concrete type name.

use crate::error::SqlDataSyncError;
use crate::results::ResultSet;
use crate::types::{RowValues, quote_ident};

/// Backend-independent column classification used for inferred DDL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Int,
    Float,
    Text,
    Bool,
    Timestamp,
    Json,
    Blob,
    /// Every value in the column was NULL; backends fall back to text.
    Unknown,
}

fn kind_of(value: &RowValues) -> Option<ColumnKind> {
    match value {
        RowValues::Int(_) => Some(ColumnKind::Int),
        RowValues::Float(_) => Some(ColumnKind::Float),
        RowValues::Text(_) => Some(ColumnKind::Text),
        RowValues::Bool(_) => Some(ColumnKind::Bool),
        RowValues::Timestamp(_) => Some(ColumnKind::Timestamp),
        RowValues::JSON(_) => Some(ColumnKind::Json),
        RowValues::Blob(_) => Some(ColumnKind::Blob),
        RowValues::Null => None,
    }
}

/// Infer one [`ColumnKind`] per column of `rows`.
///
/// # Errors
/// Returns [`SqlDataSyncError::ShapeError`] if the batch carries no column
/// names (a batch built by the streaming readers always carries them).
pub fn infer_column_kinds(rows: &ResultSet) -> Result<Vec<ColumnKind>, SqlDataSyncError> {
    let column_names = rows.get_column_names().ok_or_else(|| {
        SqlDataSyncError::ShapeError("row batch has no column names".to_string())
    })?;

    let mut kinds = vec![None; column_names.len()];
    for row in &rows.results {
        for (idx, value) in row.values.iter().enumerate() {
            if idx >= kinds.len() {
                break;
            }
            if kinds[idx].is_none() {
                kinds[idx] = kind_of(value);
            }
        }
        if kinds.iter().all(Option::is_some) {
            break;
        }
    }

    Ok(kinds
        .into_iter()
        .map(|k| k.unwrap_or(ColumnKind::Unknown))
        .collect())
}

/// Render a `CREATE TABLE` statement for `rows`, naming column types through
/// the backend-supplied `type_name` mapper.
///
/// # Errors
/// Propagates [`infer_column_kinds`] failures.
pub fn create_table_ddl(
    table: &str,
    rows: &ResultSet,
    type_name: fn(ColumnKind) -> &'static str,
) -> Result<String, SqlDataSyncError> {
    let column_names = rows.get_column_names().ok_or_else(|| {
        SqlDataSyncError::ShapeError("row batch has no column names".to_string())
    })?;
    let kinds = infer_column_kinds(rows)?;

    let cols = column_names
        .iter()
        .zip(kinds)
        .map(|(name, kind)| format!("{} {}", quote_ident(name), type_name(kind)))
        .collect::<Vec<_>>()
        .join(", ");

    Ok(format!("CREATE TABLE {} ({})", quote_ident(table), cols))
}
