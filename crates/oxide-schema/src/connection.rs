//! Statement execution on a single SQLite connection.

use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::Connection;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use oxide_schema_core::split_statements;

use crate::error::{EngineError, Result, SchemaError};

const LOGGED_SQL_LIMIT: usize = 2048;

/// One open connection. Every statement of a [`Database`](crate::Database)
/// runs here, so savepoints always apply to the same session.
#[derive(Debug)]
pub struct SqlConnection {
    inner: SqliteConnection,
}

impl SqlConnection {
    /// Opens a connection.
    pub async fn connect(options: &SqliteConnectOptions) -> Result<Self> {
        let inner = SqliteConnection::connect_with(options).await?;
        Ok(Self { inner })
    }

    /// Executes a single statement and returns the number of affected rows.
    pub async fn execute(&mut self, sql: &str) -> std::result::Result<u64, EngineError> {
        debug!(sql = %loggable_sql(sql), "Executing SQL");
        let result = sqlx::raw_sql(sql).execute(&mut self.inner).await?;
        Ok(result.rows_affected())
    }

    /// Executes a script statement by statement, stopping at the first
    /// failure. Returns the number of statements executed.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::Engine` carrying the 1-based ordinal of the
    /// failing statement, or `SchemaError::Cancelled` if `cancel` fired
    /// between two statements.
    pub async fn execute_script(&mut self, sql: &str, cancel: &CancellationToken) -> Result<usize> {
        let statements = split_statements(sql);
        for (i, statement) in statements.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(SchemaError::Cancelled);
            }
            self.execute(statement)
                .await
                .map_err(|err| err.in_statement(i + 1))?;
        }
        Ok(statements.len())
    }

    /// Returns the underlying connection, for queries that fetch rows.
    pub fn inner(&mut self) -> &mut SqliteConnection {
        &mut self.inner
    }

    /// Closes the connection.
    pub async fn close(self) -> Result<()> {
        self.inner.close().await?;
        Ok(())
    }
}

/// Renders SQL for the log: control characters other than whitespace are
/// replaced and very long statements are cut.
pub(crate) fn loggable_sql(sql: &str) -> String {
    let mut out: String = sql
        .chars()
        .take(LOGGED_SQL_LIMIT)
        .map(|c| {
            if c.is_control() && !c.is_whitespace() {
                '\u{fffd}'
            } else {
                c
            }
        })
        .collect();
    if sql.chars().nth(LOGGED_SQL_LIMIT).is_some() {
        out.push_str(" [...]");
    }
    out
}
