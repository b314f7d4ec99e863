//! Canonical DDL generation.
//!
//! The output layout is fixed so that generating, parsing and generating
//! again produces identical text:
//!
//! ```text
//! CREATE TABLE `testtable` (
//! 	`id`	integer PRIMARY KEY AUTOINCREMENT,
//! 	`car`	text NOT NULL
//! );
//! ```

use crate::schema::{Field, Table};

/// Quotes an identifier with backticks, doubling embedded backticks.
#[must_use]
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Quotes each name and joins them with commas.
#[must_use]
pub fn quote_identifier_list<S: AsRef<str>>(names: &[S]) -> String {
    names
        .iter()
        .map(|name| quote_identifier(name.as_ref()))
        .collect::<Vec<_>>()
        .join(",")
}

impl Field {
    /// Returns the column definition used by `ALTER TABLE ... ADD COLUMN`:
    /// quoted name, type and constraints.
    #[must_use]
    pub fn definition(&self) -> String {
        self.render(" ", self.primary_key && self.is_integer())
    }

    fn render(&self, separator: &str, inline_primary_key: bool) -> String {
        let mut sql = format!("{}{separator}{}", quote_identifier(&self.name), self.sql_type);
        if inline_primary_key {
            sql.push_str(" PRIMARY KEY");
            if self.auto_increment {
                sql.push_str(" AUTOINCREMENT");
            }
        }
        if self.not_null {
            sql.push_str(" NOT NULL");
        }
        if self.unique {
            sql.push_str(" UNIQUE");
        }
        if !self.default_value.is_empty() {
            sql.push_str(" DEFAULT ");
            sql.push_str(&self.default_value);
        }
        if !self.check.is_empty() {
            sql.push_str(" CHECK(");
            sql.push_str(&self.check);
            sql.push(')');
        }
        sql
    }
}

impl Table {
    /// Returns the index of the field declared inline as `PRIMARY KEY`: the
    /// sole primary key field, when its type is `integer`.
    fn inline_primary_key(&self) -> Option<usize> {
        let mut keys = self.fields().iter().enumerate().filter(|(_, f)| f.primary_key);
        match (keys.next(), keys.next()) {
            (Some((index, field)), None) if field.is_integer() => Some(index),
            _ => None,
        }
    }

    /// Generates the canonical `CREATE TABLE` statement for this table.
    ///
    /// A primary key that cannot be declared inline is emitted as a
    /// `PRIMARY KEY(...)` clause after the columns.
    #[must_use]
    pub fn sql(&self) -> String {
        let inline = self.inline_primary_key();
        let mut lines: Vec<String> = self
            .fields()
            .iter()
            .enumerate()
            .map(|(i, field)| field.render("\t", inline == Some(i)))
            .collect();

        let keys: Vec<&str> = self
            .primary_key_order()
            .into_iter()
            .map(|f| f.name.as_str())
            .collect();
        if inline.is_none() && !keys.is_empty() {
            lines.push(format!("PRIMARY KEY({})", quote_identifier_list(&keys)));
        }

        let mut sql = format!("CREATE TABLE {} (\n\t", quote_identifier(self.name()));
        sql.push_str(&lines.join(",\n\t"));
        sql.push_str("\n)");
        if self.without_rowid() {
            sql.push_str(" WITHOUT ROWID");
        }
        sql.push(';');
        sql
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("id"), "`id`");
        assert_eq!(quote_identifier("a`b"), "`a``b`");
        assert_eq!(quote_identifier_list(&["a", "b c"]), "`a`,`b c`");
    }

    #[test]
    fn test_field_definition() {
        let field = Field::new("email", "text")
            .not_null()
            .default_value("''")
            .check("length(email)>3");
        assert_eq!(
            field.definition(),
            "`email` text NOT NULL DEFAULT '' CHECK(length(email)>3)"
        );
    }

    #[test]
    fn test_unique_follows_not_null() {
        let table = Table::new("t").with_field(Field::new("a", "text").not_null().unique());
        assert_eq!(table.sql(), "CREATE TABLE `t` (\n\t`a`\ttext NOT NULL UNIQUE\n);");
    }

    #[test]
    fn test_sole_text_primary_key_uses_clause() {
        let table = Table::new("t").with_field(Field::new("code", "text").primary_key());
        assert_eq!(
            table.sql(),
            "CREATE TABLE `t` (\n\t`code`\ttext,\n\tPRIMARY KEY(`code`)\n);"
        );
    }

    #[test]
    fn test_key_clause_keeps_declared_order() {
        let mut table = Table::new("t")
            .with_field(Field::new("b", "text").primary_key())
            .with_field(Field::new("c", "text").primary_key());
        table.set_primary_key_order(["c", "b"]);
        table.set_without_rowid(true);
        assert_eq!(
            table.sql(),
            "CREATE TABLE `t` (\n\t`b`\ttext,\n\t`c`\ttext,\n\tPRIMARY KEY(`c`,`b`)\n) WITHOUT ROWID;"
        );
    }

    #[test]
    fn test_empty_type() {
        let table = Table::new("t").with_field(Field::new("a", ""));
        assert_eq!(table.sql(), "CREATE TABLE `t` (\n\t`a`\t\n);");
    }
}
