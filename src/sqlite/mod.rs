// SQLite backend, built on deadpool-sqlite.
//
// Split into sub-modules mirroring the concerns:
// - config: pool setup from an instance configuration
// - params: parameter conversion between RowValues and rusqlite types
// - query: result extraction and building
// - executor: the operations the transaction layer dispatches to

pub mod config;
pub mod executor;
pub mod params;
pub mod query;

pub use config::new_handle;
pub use executor::{
    create_table_from_rows, execute, execute_script, insert_rows, query, query_chunk,
    table_exists,
};
pub use params::convert_params;
pub use query::build_result_set;

use crate::dialect::ColumnKind;

/// `SQLite` type name for an inferred column kind.
#[must_use]
pub fn column_type_name(kind: ColumnKind) -> &'static str {
    match kind {
        ColumnKind::Int | ColumnKind::Bool => "INTEGER",
        ColumnKind::Float => "REAL",
        ColumnKind::Blob => "BLOB",
        ColumnKind::Text | ColumnKind::Timestamp | ColumnKind::Json | ColumnKind::Unknown => {
            "TEXT"
        }
    }
}

/// `SQLite` positional placeholder (1-based).
#[must_use]
pub fn placeholder(idx: usize) -> String {
    format!("?{idx}")
}
