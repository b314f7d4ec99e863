//! Savepoint bookkeeping.
//!
//! The ledger tracks which savepoints are open on the connection, innermost
//! last. A connection is *dirty* while any savepoint is open: changes exist
//! that have not been committed or reverted.

use tokio::sync::watch;
use tracing::debug;

use crate::connection::SqlConnection;
use crate::error::{Result, SchemaError};

/// Savepoint opened by every mutation and held until the caller commits or
/// reverts all changes.
pub const DEFAULT_RESTORE_POINT: &str = "oxide_restore_point";

fn quote_savepoint(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Ordered list of active savepoints.
#[derive(Debug)]
pub struct SavepointLedger {
    active: Vec<String>,
    dirty: watch::Sender<bool>,
}

impl Default for SavepointLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl SavepointLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        let (dirty, _) = watch::channel(false);
        Self {
            active: Vec::new(),
            dirty,
        }
    }

    /// Returns true while any savepoint is active.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        !self.active.is_empty()
    }

    /// Returns true if `name` is active.
    #[must_use]
    pub fn is_active(&self, name: &str) -> bool {
        self.active.iter().any(|n| n == name)
    }

    /// Returns the active savepoints, outermost first.
    #[must_use]
    pub fn active(&self) -> &[String] {
        &self.active
    }

    /// Subscribes to dirty-state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.dirty.subscribe()
    }

    /// Returns `prefix`, or `prefix` with a numeric suffix if that name is
    /// already active.
    #[must_use]
    pub fn unique_name(&self, prefix: &str) -> String {
        if !self.is_active(prefix) {
            return prefix.to_string();
        }
        (1..)
            .map(|n| format!("{prefix}_{n}"))
            .find(|name| !self.is_active(name))
            .unwrap_or_else(|| prefix.to_string())
    }

    fn notify(&self) {
        self.dirty.send_replace(self.is_dirty());
    }

    fn position(&self, name: &str) -> Result<usize> {
        self.active
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| SchemaError::SavepointNotFound(name.to_string()))
    }

    /// Opens savepoint `name`. Opening an active savepoint does nothing.
    pub async fn begin(&mut self, conn: &mut SqlConnection, name: &str) -> Result<()> {
        if self.is_active(name) {
            return Ok(());
        }
        conn.execute(&format!("SAVEPOINT {}", quote_savepoint(name)))
            .await?;
        self.active.push(name.to_string());
        debug!(savepoint = %name, depth = self.active.len(), "Savepoint opened");
        self.notify();
        Ok(())
    }

    /// Releases savepoint `name`, keeping its changes. Savepoints nested
    /// inside it are released with it.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::SavepointNotFound` if `name` is not active.
    pub async fn commit(&mut self, conn: &mut SqlConnection, name: &str) -> Result<()> {
        let index = self.position(name)?;
        conn.execute(&format!("RELEASE SAVEPOINT {}", quote_savepoint(name)))
            .await?;
        self.active.truncate(index);
        debug!(savepoint = %name, "Savepoint released");
        self.notify();
        Ok(())
    }

    /// Discards the changes made since savepoint `name` and releases it,
    /// together with any savepoints nested inside it.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::SavepointNotFound` if `name` is not active.
    pub async fn rollback(&mut self, conn: &mut SqlConnection, name: &str) -> Result<()> {
        let index = self.position(name)?;
        let quoted = quote_savepoint(name);
        conn.execute(&format!("ROLLBACK TO SAVEPOINT {quoted}"))
            .await?;
        conn.execute(&format!("RELEASE SAVEPOINT {quoted}")).await?;
        self.active.truncate(index);
        debug!(savepoint = %name, "Savepoint rolled back");
        self.notify();
        Ok(())
    }

    /// Commits every active savepoint, innermost first. Stops at the first
    /// failure, leaving the remaining savepoints active.
    pub async fn commit_all(&mut self, conn: &mut SqlConnection) -> Result<()> {
        while let Some(name) = self.active.last().cloned() {
            self.commit(conn, &name).await?;
        }
        Ok(())
    }

    /// Rolls back every active savepoint, innermost first. Stops at the
    /// first failure, leaving the remaining savepoints active.
    pub async fn rollback_all(&mut self, conn: &mut SqlConnection) -> Result<()> {
        while let Some(name) = self.active.last().cloned() {
            self.rollback(conn, &name).await?;
        }
        Ok(())
    }

    /// Forgets every savepoint without touching the connection.
    pub fn clear(&mut self) {
        self.active.clear();
        self.notify();
    }
}
