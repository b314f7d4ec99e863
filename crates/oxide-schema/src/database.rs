//! The per-connection context: connection, savepoint ledger and catalog.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use sqlx::sqlite::SqliteConnectOptions;
use sqlx::Row;
use tokio::io::AsyncReadExt;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::catalog::Catalog;
use crate::connection::SqlConnection;
use crate::error::{Result, SchemaError};
use crate::ledger::{SavepointLedger, DEFAULT_RESTORE_POINT};

const SQLITE_HEADER: &[u8; 16] = b"SQLite format 3\0";

/// Connection settings applied when opening a database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DatabaseOptions {
    /// Enforce foreign key constraints.
    pub foreign_keys: bool,
    /// Create the file if it does not exist.
    pub create_if_missing: bool,
}

impl DatabaseOptions {
    /// Enables or disables foreign key enforcement.
    #[must_use]
    pub const fn foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self
    }

    /// Creates the database file if it is missing.
    #[must_use]
    pub const fn create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }
}

/// What to do with pending changes when closing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseAction {
    /// Keep all changes.
    Commit,
    /// Discard all changes.
    Rollback,
}

/// An open database.
///
/// Owns the single connection every statement runs on, the savepoints open
/// on it and the latest catalog snapshot.
#[derive(Debug)]
pub struct Database {
    pub(crate) conn: SqlConnection,
    pub(crate) ledger: SavepointLedger,
    catalog: Arc<Catalog>,
    location: Option<PathBuf>,
    foreign_keys_suspended: bool,
}

impl Database {
    /// Opens an existing database file.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::NotADatabase` if the file does not start with the
    /// SQLite header, or the error of connecting and reading the schema.
    pub async fn open(path: impl AsRef<Path>, options: DatabaseOptions) -> Result<Self> {
        let path = path.as_ref();
        let exists = tokio::fs::try_exists(path).await?;
        if exists && !has_sqlite_header(path).await? {
            return Err(SchemaError::NotADatabase(path.to_path_buf()));
        }

        let connect = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(options.create_if_missing)
            .foreign_keys(options.foreign_keys);
        let db = Self::connect(&connect, Some(path.to_path_buf())).await?;
        info!(path = %path.display(), "Opened database");
        Ok(db)
    }

    /// Creates a database file, or opens it if it already exists.
    pub async fn create(path: impl AsRef<Path>, options: DatabaseOptions) -> Result<Self> {
        Self::open(path, options.create_if_missing(true)).await
    }

    /// Opens a private in-memory database.
    pub async fn open_in_memory(options: DatabaseOptions) -> Result<Self> {
        let connect = SqliteConnectOptions::from_str("sqlite::memory:")?
            .foreign_keys(options.foreign_keys);
        Self::connect(&connect, None).await
    }

    async fn connect(options: &SqliteConnectOptions, location: Option<PathBuf>) -> Result<Self> {
        let conn = SqlConnection::connect(options).await?;
        let mut db = Self {
            conn,
            ledger: SavepointLedger::new(),
            catalog: Arc::new(Catalog::default()),
            location,
            foreign_keys_suspended: false,
        };
        db.refresh_catalog(&CancellationToken::new()).await?;
        Ok(db)
    }

    /// Returns the database file, or `None` for in-memory databases.
    #[must_use]
    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    /// Returns the current catalog snapshot.
    #[must_use]
    pub fn catalog(&self) -> Arc<Catalog> {
        Arc::clone(&self.catalog)
    }

    /// Returns the savepoint ledger.
    #[must_use]
    pub const fn ledger(&self) -> &SavepointLedger {
        &self.ledger
    }

    /// Returns true while uncommitted changes exist.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.ledger.is_dirty()
    }

    /// Subscribes to dirty-state changes.
    #[must_use]
    pub fn subscribe_dirty(&self) -> watch::Receiver<bool> {
        self.ledger.subscribe()
    }

    /// Returns the connection, for running queries directly.
    pub fn connection(&mut self) -> &mut SqlConnection {
        &mut self.conn
    }

    /// Rebuilds the catalog and replaces the current snapshot.
    pub async fn refresh_catalog(&mut self, cancel: &CancellationToken) -> Result<Arc<Catalog>> {
        let catalog = Arc::new(Catalog::load(&mut self.conn, cancel).await?);
        self.catalog = Arc::clone(&catalog);
        Ok(catalog)
    }

    /// Opens savepoint `name`.
    pub async fn set_savepoint(&mut self, name: &str) -> Result<()> {
        self.ledger.begin(&mut self.conn, name).await
    }

    /// Opens the default restore point.
    pub async fn set_restore_point(&mut self) -> Result<()> {
        self.set_savepoint(DEFAULT_RESTORE_POINT).await
    }

    /// Releases savepoint `name`, keeping its changes.
    pub async fn commit(&mut self, name: &str) -> Result<()> {
        self.ledger.commit(&mut self.conn, name).await?;
        self.resume_foreign_keys().await
    }

    /// Reverts to savepoint `name` and refreshes the catalog.
    pub async fn rollback(&mut self, name: &str) -> Result<()> {
        self.ledger.rollback(&mut self.conn, name).await?;
        self.resume_foreign_keys().await?;
        self.refresh_catalog(&CancellationToken::new()).await?;
        Ok(())
    }

    /// Commits every pending change.
    pub async fn commit_all(&mut self) -> Result<()> {
        self.ledger.commit_all(&mut self.conn).await?;
        self.resume_foreign_keys().await?;
        info!("Committed all changes");
        Ok(())
    }

    /// Reverts every pending change and refreshes the catalog.
    pub async fn rollback_all(&mut self) -> Result<()> {
        self.ledger.rollback_all(&mut self.conn).await?;
        self.resume_foreign_keys().await?;
        self.refresh_catalog(&CancellationToken::new()).await?;
        info!("Reverted all changes");
        Ok(())
    }

    /// Returns true while foreign key enforcement is switched off for a
    /// table rebuild whose changes are still pending.
    #[must_use]
    pub const fn foreign_keys_suspended(&self) -> bool {
        self.foreign_keys_suspended
    }

    /// Switches foreign key enforcement off until pending changes are
    /// settled. Dropping a table with enforcement on deletes its rows first,
    /// which fires `ON DELETE` actions in child tables.
    ///
    /// The engine ignores this pragma inside a transaction, so it must run
    /// before any savepoint is open.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::Conflict` if enforcement is on and changes are
    /// pending.
    pub(crate) async fn suspend_foreign_keys(&mut self) -> Result<()> {
        if self.pragma("foreign_keys").await? != "1" {
            return Ok(());
        }
        if self.ledger.is_dirty() {
            return Err(SchemaError::Conflict(String::from(
                "foreign key enforcement cannot be suspended while changes are pending; \
                 commit or revert them first",
            )));
        }
        self.conn.execute("PRAGMA foreign_keys = 0").await?;
        self.foreign_keys_suspended = true;
        debug!("Foreign key enforcement suspended");
        Ok(())
    }

    /// Switches suspended foreign key enforcement back on once no savepoint
    /// is open.
    pub(crate) async fn resume_foreign_keys(&mut self) -> Result<()> {
        if !self.foreign_keys_suspended || self.ledger.is_dirty() {
            return Ok(());
        }
        self.conn.execute("PRAGMA foreign_keys = 1").await?;
        self.foreign_keys_suspended = false;
        debug!("Foreign key enforcement resumed");
        Ok(())
    }

    /// Executes one statement and returns the number of affected rows.
    ///
    /// With `dirty` set the default restore point is opened first, so the
    /// change can be reverted.
    pub async fn execute_sql(&mut self, sql: &str, dirty: bool) -> Result<u64> {
        if dirty {
            self.set_restore_point().await?;
        }
        Ok(self.conn.execute(sql).await?)
    }

    /// Executes a script under the default restore point and refreshes the
    /// catalog. Returns the number of statements executed.
    ///
    /// # Errors
    ///
    /// Returns the first failing statement's error, carrying its 1-based
    /// ordinal. Statements before it stay applied under the restore point.
    pub async fn execute_script(&mut self, sql: &str, cancel: &CancellationToken) -> Result<usize> {
        self.set_restore_point().await?;
        let result = self.conn.execute_script(sql, cancel).await;
        self.refresh_catalog(&CancellationToken::new()).await?;
        let executed = result?;
        info!(statements = executed, "Executed script");
        Ok(executed)
    }

    /// Reads a pragma value.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::InvalidArgument` for names that are not plain
    /// identifiers.
    pub async fn pragma(&mut self, name: &str) -> Result<String> {
        check_pragma_name(name)?;
        let sql = format!("PRAGMA {name}");
        debug!(sql = %sql, "Reading pragma");
        let row = sqlx::query(&sql).fetch_optional(self.conn.inner()).await?;
        let value = match row {
            Some(row) => row
                .try_get_unchecked::<Option<String>, _>(0)?
                .unwrap_or_default(),
            None => String::new(),
        };
        Ok(value)
    }

    /// Sets a pragma. Pending changes are committed first because pragmas
    /// do not take part in savepoints.
    pub async fn set_pragma(&mut self, name: &str, value: &str) -> Result<()> {
        check_pragma_name(name)?;
        let plain = |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-';
        if value.is_empty() || !value.chars().all(plain) {
            return Err(SchemaError::InvalidArgument(format!(
                "invalid value '{value}' for pragma {name}"
            )));
        }
        self.commit_all().await?;
        self.conn.execute(&format!("PRAGMA {name} = {value}")).await?;
        info!(pragma = %name, value = %value, "Pragma set");
        Ok(())
    }

    /// Settles pending changes and closes the connection.
    pub async fn close(mut self, action: CloseAction) -> Result<()> {
        match action {
            CloseAction::Commit => self.ledger.commit_all(&mut self.conn).await?,
            CloseAction::Rollback => self.ledger.rollback_all(&mut self.conn).await?,
        }
        self.ledger.clear();
        self.conn.close().await?;
        debug!("Database closed");
        Ok(())
    }
}

async fn has_sqlite_header(path: &Path) -> Result<bool> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut header = [0u8; 16];
    let mut read = 0;
    while read < header.len() {
        let n = file.read(&mut header[read..]).await?;
        if n == 0 {
            break;
        }
        read += n;
    }
    // a zero-length file is a fresh database
    Ok(read == 0 || &header == SQLITE_HEADER)
}

fn check_pragma_name(name: &str) -> Result<()> {
    if !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(SchemaError::InvalidArgument(format!(
            "invalid pragma name '{name}'"
        )))
    }
}
