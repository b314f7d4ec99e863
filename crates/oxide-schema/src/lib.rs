//! Savepoint-safe schema editing for SQLite databases.
//!
//! `oxide-schema` edits the structure of tables in an existing database
//! while keeping every change revertible:
//! - Each change runs in its own savepoint and is rolled back on failure
//! - Changes stay pending under a restore point until committed or reverted
//! - Column changes SQLite cannot do in place rebuild the table and then
//!   recreate its indices and triggers
//!
//! # Architecture
//!
//! - **Database** - One connection with its savepoint ledger and catalog
//! - **Ledger** - Stack of active savepoints and the dirty flag
//! - **Catalog** - Snapshot of tables, views, indices and triggers
//! - **Mutator** - Create tables, add/rename/modify/move/drop columns,
//!   rename tables
//! - **CSV** - Import into and export from tables and queries
//!
//! Parsing and generating `CREATE TABLE` statements lives in
//! `oxide-schema-core`.
//!
//! # Example
//!
//! ```rust,no_run
//! use oxide_schema::prelude::*;
//!
//! # async fn run() -> oxide_schema::Result<()> {
//! let mut db = Database::open("app.db", DatabaseOptions::default()).await?;
//! let cancel = CancellationToken::new();
//!
//! let report = db.rename_column("hero", "name", "title", &cancel).await?;
//! for failure in &report.failed_dependents {
//!     eprintln!("lost {} {}: {}", failure.object_type, failure.name, failure.error);
//! }
//!
//! db.commit_all().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # List tables, views, indices and triggers
//! oxide-schema --database app.db tables
//!
//! # Rename a column, keeping its data
//! oxide-schema --database app.db rename-column hero name title
//!
//! # Try a change without keeping it
//! oxide-schema --database app.db --dry-run drop-column hero power
//! ```

pub mod catalog;
pub mod connection;
pub mod csv_io;
pub mod database;
pub mod error;
pub mod ledger;
pub mod mutator;
pub mod settings;

pub use catalog::{Catalog, DatabaseObject, ObjectType};
pub use connection::SqlConnection;
pub use database::{CloseAction, Database, DatabaseOptions};
pub use error::{EngineError, Result, SchemaError, TransformStep};
pub use ledger::{SavepointLedger, DEFAULT_RESTORE_POINT};
pub use mutator::{DependentFailure, TransformReport};
pub use settings::Settings;

/// Prelude for common imports.
pub mod prelude {
    pub use crate::catalog::{Catalog, DatabaseObject, ObjectType};
    pub use crate::database::{CloseAction, Database, DatabaseOptions};
    pub use crate::error::{Result, SchemaError};
    pub use crate::mutator::TransformReport;
    pub use oxide_schema_core::csv::CsvOptions;
    pub use oxide_schema_core::{Field, Table};
    pub use tokio_util::sync::CancellationToken;
}
