//! Schema changes.
//!
//! SQLite can add columns and rename tables in place, but any other change
//! to a column means rebuilding the table: create a copy with the new
//! structure, move the rows over, drop the original and give the copy its
//! name. Indices and triggers disappear with the original table and are
//! recreated from their stored SQL afterwards.
//!
//! Every change runs inside its own savepoint, nested in the default
//! restore point. A failed step rolls back the savepoint; the restore point
//! stays open so the caller decides when to commit or revert.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use oxide_schema_core::{
    quote_identifier, quote_identifier_list, Field, ModelError, Parser, Table,
};

use crate::catalog::ObjectType;
use crate::database::Database;
use crate::error::{EngineError, Result, SchemaError, TransformStep};
use crate::ledger::DEFAULT_RESTORE_POINT;

const CREATE_TABLE_SAVEPOINT: &str = "oxide_create_table";
const ADD_COLUMN_SAVEPOINT: &str = "oxide_add_column";
const TRANSFORM_SAVEPOINT: &str = "oxide_transform";
const RENAME_TABLE_SAVEPOINT: &str = "oxide_rename_table";

const TEMPORARY_TABLE_NAME: &str = "oxide_transform_new_table";

/// An index or trigger that could not be recreated after a rebuild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependentFailure {
    /// Object name.
    pub name: String,
    /// Object kind.
    pub object_type: ObjectType,
    /// The statement that failed.
    pub sql: String,
    /// Engine error.
    pub error: EngineError,
}

/// Outcome of a table rebuild.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformReport {
    /// Dependent objects that were lost.
    pub failed_dependents: Vec<DependentFailure>,
    /// Clauses of the original definition that the rebuilt table lacks, such
    /// as table UNIQUE and FOREIGN KEY constraints or column COLLATE.
    pub dropped_clauses: Vec<String>,
}

impl TransformReport {
    /// Returns true if every dependent object was recreated and no clause of
    /// the definition was lost.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed_dependents.is_empty() && self.dropped_clauses.is_empty()
    }
}

impl Database {
    /// Opens the restore point and the savepoint of one operation.
    pub(crate) async fn begin_operation(&mut self, savepoint: &str) -> Result<()> {
        if self.ledger.is_active(savepoint) {
            return Err(SchemaError::Conflict(format!(
                "savepoint '{savepoint}' from an earlier operation is still active"
            )));
        }
        let opened_restore_point = !self.ledger.is_active(DEFAULT_RESTORE_POINT);
        self.set_restore_point().await?;
        if let Err(err) = self.set_savepoint(savepoint).await {
            return Err(self.release_restore_point(opened_restore_point, err).await);
        }
        Ok(())
    }

    /// Undoes a restore point opened by an operation that failed to start,
    /// and returns `err`.
    async fn release_restore_point(&mut self, opened: bool, err: SchemaError) -> SchemaError {
        if opened {
            if let Err(rollback) = self
                .ledger
                .rollback(&mut self.conn, DEFAULT_RESTORE_POINT)
                .await
            {
                warn!(error = %rollback, "Could not release restore point");
            }
        }
        err
    }

    /// Rolls back the savepoint of a failed operation and returns `err`.
    pub(crate) async fn abort(&mut self, savepoint: &str, err: SchemaError) -> SchemaError {
        if let Err(rollback) = self.ledger.rollback(&mut self.conn, savepoint).await {
            warn!(savepoint = %savepoint, error = %rollback, "Rollback failed");
        }
        err
    }

    /// Finishes an operation: releases its savepoint and refreshes the
    /// catalog.
    pub(crate) async fn finish_operation(&mut self, savepoint: &str) -> Result<()> {
        self.commit(savepoint).await?;
        self.refresh_catalog(&CancellationToken::new()).await?;
        Ok(())
    }

    /// Parses the stored definition of `name`. Also returns the clauses the
    /// model cannot represent.
    fn stored_table(&self, name: &str) -> Result<(Table, Vec<String>)> {
        let catalog = self.catalog();
        let object = catalog
            .table(name)
            .ok_or_else(|| SchemaError::TableNotFound(name.to_string()))?;
        let mut parser = Parser::new(&object.sql);
        let table = parser
            .parse_create_table()
            .map_err(|err| SchemaError::Parse {
                table: object.name.clone(),
                message: err.to_string(),
            })?;
        if table.fields().is_empty() {
            return Err(SchemaError::Parse {
                table: object.name.clone(),
                message: String::from("no columns found"),
            });
        }
        Ok((table, parser.discarded_clauses().to_vec()))
    }

    fn column(&self, table: &str, column: &str) -> Result<Field> {
        self.stored_table(table)?
            .0
            .field(column)
            .cloned()
            .ok_or_else(|| SchemaError::ColumnNotFound {
                table: table.to_string(),
                column: column.to_string(),
            })
    }

    /// Creates a table with the given fields.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::InvalidSchema` if the structure is invalid, or
    /// the engine error if the statement fails.
    pub async fn create_table(&mut self, name: &str, fields: &[Field]) -> Result<()> {
        let table = fields
            .iter()
            .cloned()
            .fold(Table::new(name), Table::with_field);
        self.create_table_from(&table).await
    }

    /// Creates `table`, including its rowid policy.
    pub async fn create_table_from(&mut self, table: &Table) -> Result<()> {
        table.validate()?;
        if table.fields().is_empty() {
            return Err(SchemaError::InvalidArgument(format!(
                "table '{}' has no columns",
                table.name()
            )));
        }

        self.begin_operation(CREATE_TABLE_SAVEPOINT).await?;
        if let Err(err) = self.conn.execute(&table.sql()).await {
            return Err(self.abort(CREATE_TABLE_SAVEPOINT, err.into()).await);
        }
        self.finish_operation(CREATE_TABLE_SAVEPOINT).await?;
        info!(table = %table.name(), "Table created");
        Ok(())
    }

    /// Appends a column to an existing table.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::InvalidArgument` for primary key and UNIQUE
    /// columns, which SQLite cannot add to an existing table.
    pub async fn add_column(&mut self, table: &str, field: &Field) -> Result<()> {
        if self.catalog().table(table).is_none() {
            return Err(SchemaError::TableNotFound(table.to_string()));
        }
        if field.name.is_empty() {
            return Err(ModelError::EmptyFieldName.into());
        }
        if field.primary_key || field.unique {
            return Err(SchemaError::InvalidArgument(format!(
                "cannot add PRIMARY KEY or UNIQUE column '{}' to '{table}'",
                field.name
            )));
        }

        let sql = format!(
            "ALTER TABLE {} ADD COLUMN {}",
            quote_identifier(table),
            field.definition()
        );
        self.begin_operation(ADD_COLUMN_SAVEPOINT).await?;
        if let Err(err) = self.conn.execute(&sql).await {
            return Err(self.abort(ADD_COLUMN_SAVEPOINT, err.into()).await);
        }
        self.finish_operation(ADD_COLUMN_SAVEPOINT).await?;
        info!(table = %table, column = %field.name, "Column added");
        Ok(())
    }

    /// Rebuilds `table` with one column changed.
    ///
    /// With `new_field` set, the column is first swapped with the column
    /// `move_offset` positions away and then replaced by `new_field`; rows
    /// keep their values. With `new_field` unset the column is dropped.
    ///
    /// Indices and triggers of the table are recreated afterwards. Those
    /// that fail, for example because they reference a renamed column, are
    /// listed in the returned report; the rebuild itself stays applied. So
    /// are clauses of the definition the rebuilt table no longer has.
    ///
    /// With foreign key enforcement on, enforcement is suspended for the
    /// rebuild and until pending changes are committed or reverted, and the
    /// rebuilt database is checked for violations instead.
    ///
    /// # Errors
    ///
    /// Fails without changes if the table or column does not exist, the
    /// offset leaves the table, the only column would be dropped, or any
    /// step up to renaming the new table fails, or the foreign key check
    /// finds violations. Returns `SchemaError::Cancelled` if `cancel` fired
    /// before the table was renamed. Returns `SchemaError::Conflict` if
    /// foreign keys are enforced and changes are already pending.
    pub async fn transform_column(
        &mut self,
        table: &str,
        column: &str,
        new_field: Option<Field>,
        move_offset: isize,
        cancel: &CancellationToken,
    ) -> Result<TransformReport> {
        let (original, dropped_clauses) = self.stored_table(table)?;
        let original_name = original.name().to_string();
        let index = original
            .find_field(column)
            .ok_or_else(|| SchemaError::ColumnNotFound {
                table: table.to_string(),
                column: column.to_string(),
            })?;
        let target = index
            .checked_add_signed(move_offset)
            .filter(|&t| t < original.fields().len())
            .ok_or_else(|| {
                SchemaError::InvalidArgument(format!(
                    "cannot move column '{column}' by {move_offset}"
                ))
            })?;
        if new_field.is_none() && original.fields().len() == 1 {
            return Err(SchemaError::InvalidArgument(format!(
                "cannot drop '{column}', the only column of '{original_name}'"
            )));
        }

        let catalog = self.catalog();
        let temporary = std::iter::once(TEMPORARY_TABLE_NAME.to_string())
            .chain((1..).map(|n| format!("{TEMPORARY_TABLE_NAME}_{n}")))
            .find(|name| !catalog.contains(name))
            .unwrap_or_else(|| TEMPORARY_TABLE_NAME.to_string());

        let mut rebuilt = original.clone();
        rebuilt.set_name(temporary.as_str());
        let columns = match new_field {
            None => {
                rebuilt.remove_field(column);
                rebuilt.field_names()
            }
            Some(field) => {
                rebuilt.swap_fields(index, target);
                let names = rebuilt.field_names();
                rebuilt.set_field(target, field);
                names
            }
        };
        rebuilt.validate()?;

        let dependents: Vec<(String, ObjectType, String)> = catalog
            .dependents_of(&original_name)
            .map(|o| (o.name.clone(), o.object_type, o.sql.clone()))
            .collect();

        if cancel.is_cancelled() {
            return Err(SchemaError::Cancelled);
        }
        self.suspend_foreign_keys().await?;
        let result = self
            .rebuild(&original_name, &temporary, &rebuilt, &columns, dependents, cancel)
            .await;
        self.resume_foreign_keys().await?;

        let mut report = result?;
        for clause in &dropped_clauses {
            warn!(table = %original_name, clause = %clause, "Clause not carried over");
        }
        report.dropped_clauses = dropped_clauses;
        info!(
            table = %original_name,
            column = %column,
            failed_dependents = report.failed_dependents.len(),
            dropped_clauses = report.dropped_clauses.len(),
            "Table rebuilt"
        );
        Ok(report)
    }

    /// Runs the rebuild steps under the transform savepoint.
    async fn rebuild(
        &mut self,
        original_name: &str,
        temporary: &str,
        rebuilt: &Table,
        columns: &[String],
        dependents: Vec<(String, ObjectType, String)>,
        cancel: &CancellationToken,
    ) -> Result<TransformReport> {
        self.begin_operation(TRANSFORM_SAVEPOINT).await?;
        debug!(table = %original_name, temporary = %temporary, "Rebuilding table");

        let original_quoted = quote_identifier(original_name);
        let temporary_quoted = quote_identifier(temporary);
        let steps = [
            (TransformStep::CreateTable, rebuilt.sql()),
            (
                TransformStep::CopyData,
                format!(
                    "INSERT INTO {temporary_quoted} SELECT {} FROM {original_quoted}",
                    quote_identifier_list(columns)
                ),
            ),
            (TransformStep::DropTable, format!("DROP TABLE {original_quoted}")),
        ];
        for (step, sql) in &steps {
            if cancel.is_cancelled() {
                return Err(self.abort(TRANSFORM_SAVEPOINT, SchemaError::Cancelled).await);
            }
            if let Err(source) = self.conn.execute(sql).await {
                let err = SchemaError::Transform { step: *step, source };
                return Err(self.abort(TRANSFORM_SAVEPOINT, err).await);
            }
        }

        if cancel.is_cancelled() {
            return Err(self.abort(TRANSFORM_SAVEPOINT, SchemaError::Cancelled).await);
        }
        if let Err(err) = self.rename_rebuilt_table(temporary, original_name).await {
            return Err(self.abort(TRANSFORM_SAVEPOINT, err).await);
        }

        let mut report = TransformReport::default();
        for (name, object_type, sql) in dependents {
            if let Err(error) = self.conn.execute(&sql).await {
                warn!(
                    table = %original_name,
                    object = %name,
                    kind = %object_type,
                    error = %error,
                    "Could not recreate dependent object"
                );
                report.failed_dependents.push(DependentFailure {
                    name,
                    object_type,
                    sql,
                    error,
                });
            }
        }

        if self.foreign_keys_suspended() {
            if let Err(source) = self.check_foreign_keys().await {
                let err = SchemaError::Transform {
                    step: TransformStep::ForeignKeyCheck,
                    source,
                };
                return Err(self.abort(TRANSFORM_SAVEPOINT, err).await);
            }
        }

        self.finish_operation(TRANSFORM_SAVEPOINT).await?;
        Ok(report)
    }

    /// Fails if any row violates a foreign key constraint.
    async fn check_foreign_keys(&mut self) -> std::result::Result<(), EngineError> {
        let violations: Vec<(String, Option<i64>, String, i64)> =
            sqlx::query_as("PRAGMA foreign_key_check")
                .fetch_all(self.conn.inner())
                .await?;
        match violations.first() {
            None => Ok(()),
            Some((child, rowid, parent, _)) => Err(EngineError::new(format!(
                "{} foreign key violation(s), first in '{child}' (rowid {}) referencing '{parent}'",
                violations.len(),
                rowid.map_or_else(|| String::from("-"), |r| r.to_string()),
            ))),
        }
    }

    /// Renames the rebuilt table with legacy rename semantics, so views that
    /// refer to the dropped original do not block the rename.
    async fn rename_rebuilt_table(&mut self, from: &str, to: &str) -> Result<()> {
        let legacy = self.pragma("legacy_alter_table").await?;
        self.conn.execute("PRAGMA legacy_alter_table = 1").await?;
        let renamed = self
            .conn
            .execute(&format!(
                "ALTER TABLE {} RENAME TO {}",
                quote_identifier(from),
                quote_identifier(to)
            ))
            .await;
        let restore = if legacy == "1" { "1" } else { "0" };
        self.conn
            .execute(&format!("PRAGMA legacy_alter_table = {restore}"))
            .await?;
        renamed.map_err(|source| SchemaError::RenameTable {
            from: from.to_string(),
            to: to.to_string(),
            source,
        })?;
        Ok(())
    }

    /// Renames a column, keeping its values.
    pub async fn rename_column(
        &mut self,
        table: &str,
        column: &str,
        new_name: &str,
        cancel: &CancellationToken,
    ) -> Result<TransformReport> {
        let field = self.column(table, column)?.renamed(new_name);
        self.transform_column(table, column, Some(field), 0, cancel)
            .await
    }

    /// Replaces the definition of a column, keeping its values.
    pub async fn modify_column(
        &mut self,
        table: &str,
        column: &str,
        new_field: Field,
        cancel: &CancellationToken,
    ) -> Result<TransformReport> {
        self.transform_column(table, column, Some(new_field), 0, cancel)
            .await
    }

    /// Swaps a column with the one `offset` positions away.
    pub async fn move_column(
        &mut self,
        table: &str,
        column: &str,
        offset: isize,
        cancel: &CancellationToken,
    ) -> Result<TransformReport> {
        let field = self.column(table, column)?;
        self.transform_column(table, column, Some(field), offset, cancel)
            .await
    }

    /// Drops a column and its values.
    pub async fn drop_column(
        &mut self,
        table: &str,
        column: &str,
        cancel: &CancellationToken,
    ) -> Result<TransformReport> {
        self.transform_column(table, column, None, 0, cancel)
            .await
    }

    /// Renames a table.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::RenameTable` with the engine's message if the
    /// rename fails.
    pub async fn rename_table(&mut self, from: &str, to: &str) -> Result<()> {
        if self.catalog().table(from).is_none() {
            return Err(SchemaError::TableNotFound(from.to_string()));
        }

        let sql = format!(
            "ALTER TABLE {} RENAME TO {}",
            quote_identifier(from),
            quote_identifier(to)
        );
        self.begin_operation(RENAME_TABLE_SAVEPOINT).await?;
        if let Err(source) = self.conn.execute(&sql).await {
            let err = SchemaError::RenameTable {
                from: from.to_string(),
                to: to.to_string(),
                source,
            };
            return Err(self.abort(RENAME_TABLE_SAVEPOINT, err).await);
        }
        self.finish_operation(RENAME_TABLE_SAVEPOINT).await?;
        info!(from = %from, to = %to, "Table renamed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::DatabaseOptions;

    async fn hero_db() -> Database {
        let mut db = Database::open_in_memory(DatabaseOptions::default())
            .await
            .unwrap();
        db.execute_script(
            "CREATE TABLE hero (id integer PRIMARY KEY AUTOINCREMENT, name text NOT NULL, power text);
             INSERT INTO hero (name, power) VALUES ('a', 'x'), ('b', 'y'), ('c', NULL);",
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        db.commit_all().await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_create_table() {
        let mut db = Database::open_in_memory(DatabaseOptions::default())
            .await
            .unwrap();
        db.create_table(
            "car",
            &[
                Field::new("id", "integer").auto_increment(),
                Field::new("make", "text").not_null(),
            ],
        )
        .await
        .unwrap();

        let catalog = db.catalog();
        let car = catalog.table("car").unwrap();
        assert_eq!(car.fields.len(), 2);
        assert!(car.fields[0].auto_increment);
        assert!(db.is_dirty());
    }

    #[tokio::test]
    async fn test_create_invalid_table() {
        let mut db = Database::open_in_memory(DatabaseOptions::default())
            .await
            .unwrap();
        let err = db
            .create_table("t", &[Field::new("a", "text"), Field::new("A", "text")])
            .await
            .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidSchema(_)));
        assert!(!db.is_dirty());
    }

    #[tokio::test]
    async fn test_add_column() {
        let mut db = hero_db().await;
        db.add_column("hero", &Field::new("age", "integer").default_value("0"))
            .await
            .unwrap();
        let fields = db.catalog().table("hero").unwrap().fields.clone();
        assert_eq!(fields.len(), 4);
        assert_eq!(fields[3].default_value, "0");
    }

    #[tokio::test]
    async fn test_add_key_column_rejected() {
        let mut db = hero_db().await;
        for field in [
            Field::new("code", "text").primary_key(),
            Field::new("code", "text").unique(),
        ] {
            let err = db.add_column("hero", &field).await.unwrap_err();
            assert!(matches!(err, SchemaError::InvalidArgument(_)));
        }
        assert!(!db.is_dirty());
        assert_eq!(db.catalog().table("hero").unwrap().fields.len(), 3);
    }

    #[tokio::test]
    async fn test_failed_start_releases_own_restore_point() {
        let mut db = hero_db().await;
        db.set_restore_point().await.unwrap();
        let err = db.release_restore_point(true, SchemaError::Cancelled).await;
        assert!(matches!(err, SchemaError::Cancelled));
        assert!(!db.is_dirty());
    }

    #[tokio::test]
    async fn test_failed_start_keeps_earlier_restore_point() {
        let mut db = hero_db().await;
        db.execute_sql("DELETE FROM hero WHERE id = 3", true)
            .await
            .unwrap();
        db.release_restore_point(false, SchemaError::Cancelled).await;
        assert!(db.ledger().is_active(DEFAULT_RESTORE_POINT));
    }

    #[tokio::test]
    async fn test_move_column() {
        let mut db = hero_db().await;
        let report = db
            .move_column("hero", "power", -1, &CancellationToken::new())
            .await
            .unwrap();
        assert!(report.is_clean());

        let names: Vec<String> = db
            .catalog()
            .table("hero")
            .unwrap()
            .fields
            .iter()
            .map(|f| f.name.clone())
            .collect();
        assert_eq!(names, ["id", "power", "name"]);

        let (name, power): (String, String) =
            sqlx::query_as("SELECT name, power FROM hero WHERE id = 1")
                .fetch_one(db.connection().inner())
                .await
                .unwrap();
        assert_eq!((name.as_str(), power.as_str()), ("a", "x"));
    }

    #[tokio::test]
    async fn test_move_out_of_range() {
        let mut db = hero_db().await;
        let err = db
            .move_column("hero", "id", -1, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidArgument(_)));
        assert!(!db.is_dirty());
    }

    #[tokio::test]
    async fn test_unknown_table_and_column() {
        let mut db = hero_db().await;
        let cancel = CancellationToken::new();
        assert!(matches!(
            db.drop_column("villain", "id", &cancel).await,
            Err(SchemaError::TableNotFound(_))
        ));
        assert!(matches!(
            db.drop_column("hero", "nope", &cancel).await,
            Err(SchemaError::ColumnNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_modify_column_failure_rolls_back() {
        let mut db = hero_db().await;
        let err = db
            .modify_column(
                "hero",
                "power",
                Field::new("power", "text").not_null(),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SchemaError::Transform {
                step: TransformStep::CopyData,
                ..
            }
        ));
        assert!(!db.ledger().is_active(TRANSFORM_SAVEPOINT));
        assert!(!db.catalog().contains(TEMPORARY_TABLE_NAME));
        assert!(!db.catalog().table("hero").unwrap().fields[2].not_null);
    }

    #[tokio::test]
    async fn test_conflict_on_stale_savepoint() {
        let mut db = hero_db().await;
        db.set_savepoint(TRANSFORM_SAVEPOINT).await.unwrap();
        let err = db
            .drop_column("hero", "power", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SchemaError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let mut db = hero_db().await;
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = db.drop_column("hero", "power", &cancel).await.unwrap_err();
        assert!(matches!(err, SchemaError::Cancelled));
        assert_eq!(db.catalog().table("hero").unwrap().fields.len(), 3);
    }

    #[tokio::test]
    async fn test_rename_table() {
        let mut db = hero_db().await;
        db.rename_table("hero", "champion").await.unwrap();
        assert!(db.catalog().table("champion").is_some());
        assert!(db.catalog().table("hero").is_none());

        db.create_table("other", &[Field::new("x", "text")])
            .await
            .unwrap();
        let err = db.rename_table("other", "champion").await.unwrap_err();
        assert!(matches!(err, SchemaError::RenameTable { .. }));
        assert!(err.to_string().starts_with(
            "Error renaming table 'other' to 'champion'. Message from database engine:"
        ));
    }
}
