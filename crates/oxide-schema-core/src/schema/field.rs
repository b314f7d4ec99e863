//! Column definitions.

use serde::{Deserialize, Serialize};

/// A single column of a table.
///
/// Every attribute is plain data. Empty `default_value` and `check` mean the
/// constraint is absent. Both hold SQL text that is emitted verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Field {
    /// Column name.
    pub name: String,
    /// Declared type, free-form and possibly empty (e.g. `VARCHAR(255)`).
    pub sql_type: String,
    /// Whether the column has a NOT NULL constraint.
    pub not_null: bool,
    /// Whether this column is part of the primary key.
    pub primary_key: bool,
    /// Whether this column auto-increments.
    pub auto_increment: bool,
    /// Whether this column has a UNIQUE constraint.
    pub unique: bool,
    /// DEFAULT literal or parenthesized expression.
    pub default_value: String,
    /// CHECK expression, without the surrounding parentheses.
    pub check: String,
}

impl Field {
    /// Creates a new field with no constraints.
    #[must_use]
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            ..Self::default()
        }
    }

    /// Sets the column as NOT NULL.
    #[must_use]
    pub const fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Marks the column as a primary key member.
    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Sets the column to auto-increment. Implies primary key membership.
    #[must_use]
    pub const fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self.primary_key = true;
        self
    }

    /// Sets the column as unique.
    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Sets the default value text.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = value.into();
        self
    }

    /// Sets a check constraint.
    #[must_use]
    pub fn check(mut self, expr: impl Into<String>) -> Self {
        self.check = expr.into();
        self
    }

    /// Returns a copy of this field under another name.
    #[must_use]
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }

    /// Returns true if the declared type is `integer`, ignoring case.
    ///
    /// Only such a column can alias the rowid, which is what allows an inline
    /// `PRIMARY KEY` and `AUTOINCREMENT`.
    #[must_use]
    pub fn is_integer(&self) -> bool {
        self.sql_type.trim().eq_ignore_ascii_case("integer")
    }

    /// Returns true if `name` refers to this field. SQLite compares
    /// identifiers case-insensitively for ASCII letters.
    #[must_use]
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}
