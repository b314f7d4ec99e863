//! In-memory model of a table's structure.
//!
//! A [`Table`] is an ordered list of [`Field`]s plus the rowid policy. Field
//! order is significant: it is the column order of the generated DDL and of
//! data copied between tables.

mod field;
mod table;

pub use field::Field;
pub use table::{Table, DEFAULT_ROWID_COLUMN};

/// A violated model invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// The table has no name.
    EmptyTableName,
    /// A field has no name.
    EmptyFieldName,
    /// Two fields share a name (compared case-insensitively).
    DuplicateField(String),
    /// AUTOINCREMENT on a field that is not the sole integer primary key.
    InvalidAutoIncrement(String),
    /// A WITHOUT ROWID table without a primary key.
    WithoutRowidWithoutPrimaryKey,
    /// The rowid column of a WITHOUT ROWID table is not a primary-key field.
    InvalidRowidColumn(String),
}

impl core::fmt::Display for ModelError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::EmptyTableName => write!(f, "table name must not be empty"),
            Self::EmptyFieldName => write!(f, "field name must not be empty"),
            Self::DuplicateField(name) => write!(f, "duplicate field name '{name}'"),
            Self::InvalidAutoIncrement(name) => write!(
                f,
                "AUTOINCREMENT on '{name}' requires it to be the only primary key and of type integer"
            ),
            Self::WithoutRowidWithoutPrimaryKey => {
                write!(f, "a WITHOUT ROWID table needs a PRIMARY KEY")
            }
            Self::InvalidRowidColumn(name) => {
                write!(f, "rowid column '{name}' is not a primary key field")
            }
        }
    }
}

impl std::error::Error for ModelError {}
