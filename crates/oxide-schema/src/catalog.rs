//! Snapshot of the schema objects of a connection.

use std::fmt;
use std::str::FromStr;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use oxide_schema_core::{Field, Table};

use crate::connection::SqlConnection;
use crate::error::{Result, SchemaError};

const CATALOG_QUERY: &str = "SELECT type, name, sql, tbl_name FROM sqlite_master \
     UNION SELECT type, name, sql, tbl_name FROM sqlite_temp_master";

const VIEW_COLUMNS_QUERY: &str = "SELECT name, type FROM pragma_table_info(?1)";

/// Kind of a schema object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    /// A table.
    Table,
    /// A view.
    View,
    /// An index.
    Index,
    /// A trigger.
    Trigger,
}

impl ObjectType {
    /// Returns the type tag used by `sqlite_master`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::View => "view",
            Self::Index => "index",
            Self::Trigger => "trigger",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ObjectType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "table" => Ok(Self::Table),
            "view" => Ok(Self::View),
            "index" => Ok(Self::Index),
            "trigger" => Ok(Self::Trigger),
            other => Err(format!("unknown object type '{other}'")),
        }
    }
}

/// One table, view, index or trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseObject {
    /// Kind of object.
    pub object_type: ObjectType,
    /// Object name.
    pub name: String,
    /// Owning table. For tables and views this is the object itself.
    pub table_name: String,
    /// Stored SQL. Empty for objects the engine creates itself.
    pub sql: String,
    /// Columns of a table or view; empty for other objects.
    pub fields: Vec<Field>,
}

impl DatabaseObject {
    /// Parses the stored SQL of a table.
    #[must_use]
    pub fn table(&self) -> Option<Table> {
        (self.object_type == ObjectType::Table).then(|| Table::parse_sql(&self.sql))
    }
}

/// Every schema object of a connection, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    objects: Vec<DatabaseObject>,
}

impl Catalog {
    /// Reads the schema of `conn`.
    ///
    /// Unknown object types are skipped. Tables whose SQL cannot be parsed
    /// and views whose columns cannot be read get an empty field list.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::Cancelled` if `cancel` fired, or the engine error
    /// if the schema could not be read.
    pub async fn load(conn: &mut SqlConnection, cancel: &CancellationToken) -> Result<Self> {
        let rows: Vec<(String, String, Option<String>, String)> =
            sqlx::query_as(CATALOG_QUERY).fetch_all(conn.inner()).await?;

        let mut objects = Vec::with_capacity(rows.len());
        for (kind, name, sql, table_name) in rows {
            if cancel.is_cancelled() {
                return Err(SchemaError::Cancelled);
            }

            let Ok(object_type) = kind.parse::<ObjectType>() else {
                warn!(kind = %kind, name = %name, "Skipping schema object of unknown type");
                continue;
            };
            let sql = sql.unwrap_or_default().replace('\r', "");

            let fields = match object_type {
                ObjectType::Table => {
                    let fields = Table::parse_sql(&sql).fields().to_vec();
                    if fields.is_empty() {
                        warn!(table = %name, "Could not parse table definition");
                    }
                    fields
                }
                ObjectType::View => view_fields(conn, &name).await,
                ObjectType::Index | ObjectType::Trigger => Vec::new(),
            };

            objects.push(DatabaseObject {
                object_type,
                name,
                table_name,
                sql,
                fields,
            });
        }

        debug!(objects = objects.len(), "Catalog loaded");
        Ok(Self { objects })
    }

    /// Returns every object.
    #[must_use]
    pub fn objects(&self) -> &[DatabaseObject] {
        &self.objects
    }

    /// Returns the object called `name`, compared case-insensitively.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&DatabaseObject> {
        self.objects
            .iter()
            .find(|o| o.name.eq_ignore_ascii_case(name))
    }

    /// Returns the table called `name`.
    #[must_use]
    pub fn table(&self, name: &str) -> Option<&DatabaseObject> {
        self.get(name)
            .filter(|o| o.object_type == ObjectType::Table)
    }

    /// Returns true if an object called `name` exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Returns the objects of one kind.
    pub fn of_type(&self, object_type: ObjectType) -> impl Iterator<Item = &DatabaseObject> {
        self.objects
            .iter()
            .filter(move |o| o.object_type == object_type)
    }

    /// Returns the indices and triggers owned by `table` that have stored
    /// SQL, in discovery order.
    pub fn dependents_of<'a>(&'a self, table: &'a str) -> impl Iterator<Item = &'a DatabaseObject> {
        self.objects.iter().filter(move |o| {
            o.object_type != ObjectType::Table
                && o.table_name.eq_ignore_ascii_case(table)
                && !o.name.eq_ignore_ascii_case(table)
                && !o.sql.is_empty()
        })
    }
}

async fn view_fields(conn: &mut SqlConnection, view: &str) -> Vec<Field> {
    let columns: std::result::Result<Vec<(String, Option<String>)>, sqlx::Error> =
        sqlx::query_as(VIEW_COLUMNS_QUERY)
            .bind(view)
            .fetch_all(conn.inner())
            .await;
    match columns {
        Ok(columns) => columns
            .into_iter()
            .map(|(name, sql_type)| Field::new(name, sql_type.unwrap_or_default()))
            .collect(),
        Err(err) => {
            warn!(view = %view, error = %err, "Could not read view columns");
            Vec::new()
        }
    }
}
