//! Error types for schema operations.

use std::fmt;
use std::path::PathBuf;

use oxide_schema_core::csv::CsvError;
use oxide_schema_core::ModelError;

/// An error reported by the database engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineError {
    /// The engine's message.
    pub message: String,
    /// 1-based ordinal of the failing statement when running a script.
    pub statement: Option<usize>,
}

impl EngineError {
    /// Creates an engine error with no statement ordinal.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            statement: None,
        }
    }

    /// Attaches the ordinal of the failing statement.
    #[must_use]
    pub const fn in_statement(mut self, ordinal: usize) -> Self {
        self.statement = Some(ordinal);
        self
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.statement {
            Some(n) => write!(f, "Error in statement #{n}: {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db) => Self::new(db.message()),
            other => Self::new(other.to_string()),
        }
    }
}

/// The step of a table rebuild that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformStep {
    /// Creating the table under its temporary name.
    CreateTable,
    /// Copying rows into the new table.
    CopyData,
    /// Dropping the original table.
    DropTable,
    /// Checking foreign keys after rebuilding with enforcement suspended.
    ForeignKeyCheck,
}

impl fmt::Display for TransformStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CreateTable => "creating new table",
            Self::CopyData => "copying data",
            Self::DropTable => "deleting old table",
            Self::ForeignKeyCheck => "checking foreign keys",
        })
    }
}

/// Errors that can occur while inspecting or changing a database.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// The stored definition of a table could not be parsed.
    #[error("Could not parse the definition of table '{table}': {message}")]
    Parse {
        /// The table whose SQL was parsed.
        table: String,
        /// Parser message.
        message: String,
    },

    /// No table with this name exists.
    #[error("Table '{0}' not found")]
    TableNotFound(String),

    /// The table has no column with this name.
    #[error("Column '{column}' not found in table '{table}'")]
    ColumnNotFound {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// No savepoint with this name is active.
    #[error("Savepoint '{0}' is not active")]
    SavepointNotFound(String),

    /// The engine rejected a statement.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// A step of a table rebuild failed; the rebuild was rolled back.
    #[error("{step} failed: {source}")]
    Transform {
        /// The failed step.
        step: TransformStep,
        /// Engine error.
        source: EngineError,
    },

    /// Renaming a table failed.
    #[error("Error renaming table '{from}' to '{to}'. Message from database engine: {source}")]
    RenameTable {
        /// Original name.
        from: String,
        /// Requested name.
        to: String,
        /// Engine error.
        source: EngineError,
    },

    /// An earlier operation on this connection has not finished.
    #[error("Conflicting operation in progress: {0}")]
    Conflict(String),

    /// The operation was cancelled and rolled back.
    #[error("Operation cancelled")]
    Cancelled,

    /// The requested table structure is invalid.
    #[error("Invalid table definition: {0}")]
    InvalidSchema(#[from] ModelError),

    /// An argument is out of range.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The file is not a SQLite database.
    #[error("Not a SQLite database: {0}")]
    NotADatabase(PathBuf),

    /// CSV records do not match the target table.
    #[error("Table '{table}' has {expected} columns but the file has {found}")]
    CsvColumnMismatch {
        /// Target table.
        table: String,
        /// Columns in the table.
        expected: usize,
        /// Fields per record in the file.
        found: usize,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<sqlx::Error> for SchemaError {
    fn from(err: sqlx::Error) -> Self {
        Self::Engine(err.into())
    }
}

impl From<CsvError> for SchemaError {
    fn from(err: CsvError) -> Self {
        match err {
            CsvError::Io(err) => Self::Io(err),
            CsvError::Cancelled => Self::Cancelled,
        }
    }
}

/// Result type for schema operations.
pub type Result<T> = std::result::Result<T, SchemaError>;
