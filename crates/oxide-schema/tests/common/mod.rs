#![allow(dead_code)]

use oxide_schema::prelude::*;

pub const HERO_SCHEMA: &str = "
    CREATE TABLE hero (id integer PRIMARY KEY AUTOINCREMENT, name text NOT NULL, power text);
    INSERT INTO hero (name, power) VALUES ('Deadpond', 'regeneration'), ('Spider-Boy', 'webs'), ('Rusty-Man', NULL);
";

pub async fn memory() -> Database {
    Database::open_in_memory(DatabaseOptions::default())
        .await
        .unwrap_or_else(|e| panic!("Failed to open in-memory database: {e}"))
}

/// Opens an in-memory database, runs `script` and commits it.
pub async fn with_schema(script: &str) -> Database {
    let mut db = memory().await;
    db.execute_script(script, &CancellationToken::new())
        .await
        .unwrap_or_else(|e| panic!("Failed to run script: {script}\nError: {e}"));
    db.commit_all().await.unwrap();
    db
}

pub async fn hero_db() -> Database {
    with_schema(HERO_SCHEMA).await
}

pub async fn count(db: &mut Database, table: &str) -> i64 {
    let sql = format!("SELECT count(*) FROM {}", oxide_schema_core::quote_identifier(table));
    let (n,): (i64,) = sqlx::query_as(&sql)
        .fetch_one(db.connection().inner())
        .await
        .unwrap();
    n
}

pub fn field_names(db: &Database, table: &str) -> Vec<String> {
    db.catalog()
        .table(table)
        .unwrap_or_else(|| panic!("No table {table}"))
        .fields
        .iter()
        .map(|f| f.name.clone())
        .collect()
}

pub async fn column_values(db: &mut Database, sql: &str) -> Vec<Option<String>> {
    let rows: Vec<(Option<String>,)> = sqlx::query_as(sql)
        .fetch_all(db.connection().inner())
        .await
        .unwrap();
    rows.into_iter().map(|(v,)| v).collect()
}
