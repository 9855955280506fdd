use deadpool_sqlite::rusqlite;

use crate::error::SqlDataSyncError;
use crate::types::RowValues;

/// Bind query params to `SQLite` types.
///
/// Timestamps become text in `%F %T%.f` form so they sort and compare the
/// same way on both backends; JSON is serialized to its text form.
///
/// # Errors
/// Currently infallible, kept fallible for parity with the other backends.
pub fn convert_params(
    params: &[RowValues],
) -> Result<Vec<rusqlite::types::Value>, SqlDataSyncError> {
    let mut vec_values = Vec::with_capacity(params.len());
    for p in params {
        let v = match p {
            RowValues::Int(i) => rusqlite::types::Value::Integer(*i),
            RowValues::Float(f) => rusqlite::types::Value::Real(*f),
            RowValues::Text(s) => rusqlite::types::Value::Text(s.clone()),
            RowValues::Bool(b) => rusqlite::types::Value::Integer(i64::from(*b)),
            RowValues::Timestamp(dt) => {
                let formatted = dt.format("%F %T%.f").to_string();
                rusqlite::types::Value::Text(formatted)
            }
            RowValues::Null => rusqlite::types::Value::Null,
            RowValues::JSON(jsval) => rusqlite::types::Value::Text(jsval.to_string()),
            RowValues::Blob(bytes) => rusqlite::types::Value::Blob(bytes.clone()),
        };
        vec_values.push(v);
    }
    Ok(vec_values)
}
