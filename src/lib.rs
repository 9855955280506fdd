//! Uniform async access to `PostgreSQL` and `SQLite`, plus a small engine
//! for copying and incrementally updating tables between them.
//!
//! The crate has three layers:
//! - [`pool::DbHandle`] and [`transaction::Transaction`]: one API for
//!   queries, statements, scripts and table DDL, regardless of backend.
//! - [`stream::RowChunks`]: lazy chunked reads for tables that should not
//!   be materialized in memory.
//! - [`sync`]: `copy_table` and `update_table` between any two handles,
//!   server-side when both sides are the same handle and streamed
//!   otherwise.
//!
//! Named instances can be managed through [`registry`], which builds
//! handles lazily from registered configurations.
//!
//! ```rust,no_run
//! use sql_datasync::prelude::*;
//!
//! # async fn demo() -> Result<(), SqlDataSyncError> {
//! let work = DbHandle::from_config("work", &DbInstanceConfig::sqlite("work.db")).await?;
//!
//! let tx = work.begin().await?;
//! tx.execute(
//!     "INSERT INTO events (id, kind) VALUES (?1, ?2)",
//!     &[RowValues::Int(1), RowValues::Text("created".into())],
//! )
//! .await?;
//! tx.commit().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dialect;
pub mod error;
pub mod pool;
pub mod prelude;
pub mod registry;
pub mod results;
pub mod stream;
pub mod sync;
pub mod transaction;
pub mod types;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use config::{DEFAULT_CHUNK_SIZE, DbInstanceConfig};
pub use error::SqlDataSyncError;
pub use pool::{BackendPool, DbHandle};
pub use results::{DbRow, ResultSet};
pub use stream::RowChunks;
pub use sync::{copy_table, update_table};
pub use transaction::{SqlExecutor, Transaction};
pub use types::{DatabaseType, IfExists, KeyDir, RowValues, TableSource, quote_ident};
