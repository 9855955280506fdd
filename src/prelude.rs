//! Convenience re-exports for the common case.
//!
//! ```rust
//! use sql_datasync::prelude::*;
//! ```

pub use crate::config::{DEFAULT_CHUNK_SIZE, DbInstanceConfig};
pub use crate::error::SqlDataSyncError;
pub use crate::pool::{BackendPool, DbHandle};
pub use crate::results::{DbRow, ResultSet};
pub use crate::stream::RowChunks;
pub use crate::sync::{copy_table, update_table};
pub use crate::transaction::{SqlExecutor, Transaction};
pub use crate::types::{DatabaseType, IfExists, KeyDir, RowValues, TableSource};
