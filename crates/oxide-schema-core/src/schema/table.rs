//! Table definitions.

use serde::{Deserialize, Serialize};

use super::{Field, ModelError};

/// Name of the implicit row identifier of ordinary tables.
pub const DEFAULT_ROWID_COLUMN: &str = "rowid";

/// The structure of one table: its name, ordered fields and rowid policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    name: String,
    fields: Vec<Field>,
    rowid_column: String,
    without_rowid: bool,
    /// Declared order of a `PRIMARY KEY(...)` clause. Empty when it matches
    /// column order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    key_order: Vec<String>,
}

impl Default for Table {
    fn default() -> Self {
        Self {
            name: String::new(),
            fields: Vec::new(),
            rowid_column: String::from(DEFAULT_ROWID_COLUMN),
            without_rowid: false,
            key_order: Vec::new(),
        }
    }
}

impl Table {
    /// Creates an empty table with the default rowid policy.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Adds a field and returns the table, for building tables inline.
    #[must_use]
    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Returns the table name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renames the table.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Returns the fields in column order.
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Returns the field names in column order.
    #[must_use]
    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    /// Appends a field.
    pub fn add_field(&mut self, field: Field) {
        self.fields.push(field);
    }

    /// Returns the position of the field called `name`.
    #[must_use]
    pub fn find_field(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.is_named(name))
    }

    /// Returns the field called `name`.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.is_named(name))
    }

    /// Returns a mutable reference to the field called `name`.
    pub fn field_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.fields.iter_mut().find(|f| f.is_named(name))
    }

    /// Replaces the field at `index`, returning the previous one.
    ///
    /// When the replaced field is the rowid column of a WITHOUT ROWID table,
    /// the rowid column follows it to its new name.
    pub fn set_field(&mut self, index: usize, field: Field) -> Option<Field> {
        let slot = self.fields.get_mut(index)?;
        let previous = std::mem::replace(slot, field);
        let name = self.fields[index].name.clone();
        if self.without_rowid && previous.is_named(&self.rowid_column) {
            self.rowid_column.clone_from(&name);
        }
        if let Some(key) = self.key_order.iter_mut().find(|k| previous.is_named(k)) {
            *key = name;
        }
        Some(previous)
    }

    /// Removes the field called `name`.
    ///
    /// Removing the rowid column of a WITHOUT ROWID table moves the rowid to
    /// the next primary key field, if there is one.
    pub fn remove_field(&mut self, name: &str) -> Option<Field> {
        let index = self.find_field(name)?;
        let removed = self.fields.remove(index);
        self.key_order.retain(|k| !removed.is_named(k));
        if self.without_rowid && removed.is_named(&self.rowid_column) {
            if let Some(pk) = self.fields.iter().find(|f| f.primary_key) {
                self.rowid_column.clone_from(&pk.name);
            }
        }
        Some(removed)
    }

    /// Swaps two fields.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of bounds.
    pub fn swap_fields(&mut self, a: usize, b: usize) {
        self.fields.swap(a, b);
    }

    /// Returns the primary key fields in column order.
    pub fn primary_key(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.primary_key)
    }

    /// Returns the primary key fields in declared key order. Fields without a
    /// recorded position follow in column order.
    #[must_use]
    pub fn primary_key_order(&self) -> Vec<&Field> {
        let mut keys: Vec<&Field> = Vec::new();
        let listed = self.key_order.iter().filter_map(|name| self.field(name));
        for field in listed.chain(self.primary_key()) {
            if field.primary_key && !keys.iter().any(|k| k.is_named(&field.name)) {
                keys.push(field);
            }
        }
        keys
    }

    /// Records the declared order of the primary key columns.
    pub fn set_primary_key_order<S: Into<String>>(&mut self, names: impl IntoIterator<Item = S>) {
        self.key_order = names.into_iter().map(Into::into).collect();
        let column_order = self.primary_key().map(|f| f.name.as_str());
        let declared = self.key_order.iter().map(String::as_str);
        if column_order.eq(declared) {
            self.key_order.clear();
        }
    }

    /// Returns the rowid column: `rowid`, or a primary key field for WITHOUT
    /// ROWID tables.
    #[must_use]
    pub fn rowid_column(&self) -> &str {
        &self.rowid_column
    }

    /// Returns true if the table is declared WITHOUT ROWID.
    #[must_use]
    pub const fn without_rowid(&self) -> bool {
        self.without_rowid
    }

    /// Sets the rowid column. Any name other than `rowid` makes the table a
    /// WITHOUT ROWID table.
    pub fn set_rowid_column(&mut self, name: impl Into<String>) {
        self.rowid_column = name.into();
        self.without_rowid = self.rowid_column != DEFAULT_ROWID_COLUMN;
    }

    /// Turns WITHOUT ROWID on or off. When turned on, the first primary key
    /// field becomes the rowid column.
    pub fn set_without_rowid(&mut self, without_rowid: bool) {
        self.without_rowid = without_rowid;
        let rowid_column = match self.primary_key().next() {
            Some(pk) if without_rowid => pk.name.clone(),
            _ => String::from(DEFAULT_ROWID_COLUMN),
        };
        self.rowid_column = rowid_column;
    }

    /// Checks the model invariants.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.name.is_empty() {
            return Err(ModelError::EmptyTableName);
        }

        for (i, field) in self.fields.iter().enumerate() {
            if field.name.is_empty() {
                return Err(ModelError::EmptyFieldName);
            }
            if self.fields[..i].iter().any(|f| f.is_named(&field.name)) {
                return Err(ModelError::DuplicateField(field.name.clone()));
            }
        }

        let pk_count = self.primary_key().count();
        for field in &self.fields {
            let rowid_alias = pk_count == 1 && field.primary_key && field.is_integer();
            if field.auto_increment && (!rowid_alias || self.without_rowid) {
                return Err(ModelError::InvalidAutoIncrement(field.name.clone()));
            }
        }

        if self.without_rowid {
            if pk_count == 0 {
                return Err(ModelError::WithoutRowidWithoutPrimaryKey);
            }
            if !self.field(&self.rowid_column).is_some_and(|f| f.primary_key) {
                return Err(ModelError::InvalidRowidColumn(self.rowid_column.clone()));
            }
        }

        Ok(())
    }
}
