// PostgreSQL backend, built on tokio-postgres and deadpool-postgres.
//
// - config: pool setup and required-field validation
// - params: RowValues as ToSql parameters
// - query: row value extraction and result building
// - executor: the operations the transaction layer dispatches to

pub mod config;
pub mod executor;
pub mod params;
pub mod query;

pub use config::new_handle;
pub use executor::{
    create_table_from_rows, execute, execute_script, insert_rows, open_row_stream, query,
    table_exists,
};
pub use params::Params;
pub use query::build_result_set_from_rows;

use crate::dialect::ColumnKind;

/// Postgres type name for an inferred column kind.
#[must_use]
pub fn column_type_name(kind: ColumnKind) -> &'static str {
    match kind {
        ColumnKind::Int => "BIGINT",
        ColumnKind::Float => "DOUBLE PRECISION",
        ColumnKind::Bool => "BOOLEAN",
        ColumnKind::Timestamp => "TIMESTAMP",
        ColumnKind::Json => "JSONB",
        ColumnKind::Blob => "BYTEA",
        ColumnKind::Text | ColumnKind::Unknown => "TEXT",
    }
}

/// Postgres positional placeholder (1-based).
#[must_use]
pub fn placeholder(idx: usize) -> String {
    format!("${idx}")
}
