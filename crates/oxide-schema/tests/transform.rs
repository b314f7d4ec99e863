mod common;

use common::*;
use oxide_schema::prelude::*;
use oxide_schema::{ObjectType, TransformStep, DEFAULT_RESTORE_POINT};

#[tokio::test]
async fn test_drop_column_keeps_rows() {
    let mut db = hero_db().await;
    let report = db
        .drop_column("hero", "power", &CancellationToken::new())
        .await
        .unwrap();

    assert!(report.is_clean());
    assert_eq!(field_names(&db, "hero"), ["id", "name"]);
    assert_eq!(count(&mut db, "hero").await, 3);
}

#[tokio::test]
async fn test_drop_only_column_rejected() {
    let mut db = with_schema("CREATE TABLE t (a text);").await;
    let err = db
        .drop_column("t", "a", &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, SchemaError::InvalidArgument(_)));
    assert!(!db.is_dirty());
}

#[tokio::test]
async fn test_rename_column_keeps_values() {
    let mut db = hero_db().await;
    db.rename_column("hero", "name", "title", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(field_names(&db, "hero"), ["id", "title", "power"]);
    assert_eq!(
        column_values(&mut db, "SELECT title FROM hero ORDER BY id").await,
        [
            Some("Deadpond".to_string()),
            Some("Spider-Boy".to_string()),
            Some("Rusty-Man".to_string())
        ]
    );
    let hero = db.catalog().table("hero").unwrap().fields.clone();
    assert!(hero[1].not_null);
    assert!(hero[0].auto_increment);
}

#[tokio::test]
async fn test_failed_index_replay_keeps_rename() {
    let mut db = with_schema(&format!(
        "{HERO_SCHEMA} CREATE INDEX hero_name ON hero(name); CREATE INDEX hero_power ON hero(power);"
    ))
    .await;

    let report = db
        .rename_column("hero", "name", "title", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.failed_dependents.len(), 1);
    let failure = &report.failed_dependents[0];
    assert_eq!(failure.name, "hero_name");
    assert_eq!(failure.object_type, ObjectType::Index);
    assert!(failure.error.message.contains("name"));

    let catalog = db.catalog();
    assert!(catalog.contains("hero_power"));
    assert!(!catalog.contains("hero_name"));

    db.commit_all().await.unwrap();
    assert_eq!(field_names(&db, "hero"), ["id", "title", "power"]);
    assert_eq!(count(&mut db, "hero").await, 3);
}

#[tokio::test]
async fn test_trigger_recreated() {
    let mut db = with_schema(&format!(
        "{HERO_SCHEMA}
         CREATE TABLE log (hero text);
         CREATE TRIGGER hero_log AFTER INSERT ON hero BEGIN INSERT INTO log VALUES (new.name); END;"
    ))
    .await;

    let report = db
        .drop_column("hero", "power", &CancellationToken::new())
        .await
        .unwrap();
    assert!(report.is_clean());
    assert!(db.catalog().contains("hero_log"));

    db.execute_sql("INSERT INTO hero (name) VALUES ('Tarantula')", true)
        .await
        .unwrap();
    assert_eq!(count(&mut db, "log").await, 1);
}

#[tokio::test]
async fn test_view_does_not_block_rebuild() {
    let mut db = with_schema(&format!(
        "{HERO_SCHEMA} CREATE VIEW hero_names AS SELECT name FROM hero;"
    ))
    .await;

    db.drop_column("hero", "power", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(count(&mut db, "hero_names").await, 3);
    let catalog = db.catalog();
    let view = catalog.get("hero_names").unwrap();
    assert_eq!(view.fields.len(), 1);
}

#[tokio::test]
async fn test_without_rowid_rename_primary_key() {
    let mut db = with_schema(
        "CREATE TABLE kv (k text PRIMARY KEY, v text) WITHOUT ROWID;
         INSERT INTO kv VALUES ('a', '1'), ('b', '2');",
    )
    .await;

    db.rename_column("kv", "k", "key", &CancellationToken::new())
        .await
        .unwrap();

    let table = db.catalog().table("kv").unwrap().table().unwrap();
    assert!(table.without_rowid());
    assert_eq!(table.rowid_column(), "key");
    assert_eq!(count(&mut db, "kv").await, 2);
}

#[tokio::test]
async fn test_modify_column_type_and_default() {
    let mut db = hero_db().await;
    let field = Field::new("power", "text")
        .not_null()
        .default_value("'none'");

    let err = db
        .modify_column("hero", "power", field.clone(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SchemaError::Transform {
            step: TransformStep::CopyData,
            ..
        }
    ));

    db.execute_sql("UPDATE hero SET power = 'none' WHERE power IS NULL", true)
        .await
        .unwrap();
    db.modify_column("hero", "power", field, &CancellationToken::new())
        .await
        .unwrap();
    let power = db.catalog().table("hero").unwrap().fields[2].clone();
    assert!(power.not_null);
    assert_eq!(power.default_value, "'none'");
}

#[tokio::test]
async fn test_rename_to_existing_column_rejected() {
    let mut db = hero_db().await;
    let err = db
        .rename_column("hero", "power", "NAME", &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, SchemaError::InvalidSchema(_)));
    assert!(!db.is_dirty());
}

#[tokio::test]
async fn test_revert_all_changes() {
    let mut db = hero_db().await;
    let cancel = CancellationToken::new();
    db.drop_column("hero", "power", &cancel).await.unwrap();
    db.rename_table("hero", "champion").await.unwrap();
    assert!(db.is_dirty());

    db.rollback_all().await.unwrap();
    assert!(!db.is_dirty());
    assert_eq!(field_names(&db, "hero"), ["id", "name", "power"]);
    assert!(!db.catalog().contains("champion"));
}

#[tokio::test]
async fn test_dirty_state_broadcast() {
    let mut db = hero_db().await;
    let mut dirty = db.subscribe_dirty();
    assert!(!*dirty.borrow_and_update());

    db.move_column("hero", "name", 1, &CancellationToken::new())
        .await
        .unwrap();
    assert!(dirty.has_changed().unwrap());
    assert!(*dirty.borrow_and_update());

    db.commit_all().await.unwrap();
    assert!(!*dirty.borrow_and_update());
}

const PARENT_CHILD_SCHEMA: &str = "
    CREATE TABLE parent (id integer PRIMARY KEY, extra text);
    CREATE TABLE child (id integer PRIMARY KEY, parent_id integer REFERENCES parent(id) ON DELETE CASCADE);
    INSERT INTO parent VALUES (1, 'a'), (2, 'b');
    INSERT INTO child VALUES (1, 1), (2, 2);
";

async fn enforcing_db() -> Database {
    let mut db = Database::open_in_memory(DatabaseOptions::default().foreign_keys(true))
        .await
        .unwrap();
    db.execute_script(PARENT_CHILD_SCHEMA, &CancellationToken::new())
        .await
        .unwrap();
    db.commit_all().await.unwrap();
    db
}

#[tokio::test]
async fn test_rebuild_keeps_cascading_children() {
    let mut db = enforcing_db().await;
    let report = db
        .drop_column("parent", "extra", &CancellationToken::new())
        .await
        .unwrap();

    assert!(report.is_clean());
    assert_eq!(count(&mut db, "child").await, 2);
    assert!(db.foreign_keys_suspended());

    db.commit_all().await.unwrap();
    assert!(!db.foreign_keys_suspended());
    assert_eq!(db.pragma("foreign_keys").await.unwrap(), "1");
    assert_eq!(count(&mut db, "child").await, 2);
    assert_eq!(field_names(&db, "parent"), ["id"]);
}

#[tokio::test]
async fn test_rebuild_rejects_foreign_key_violations() {
    let mut db = enforcing_db().await;
    let cancel = CancellationToken::new();
    db.drop_column("parent", "extra", &cancel).await.unwrap();

    // enforcement stays off until the pending rebuild is settled
    db.execute_sql("INSERT INTO child VALUES (3, 99)", true)
        .await
        .unwrap();
    db.add_column("parent", &Field::new("note", "text"))
        .await
        .unwrap();
    let err = db
        .drop_column("parent", "note", &cancel)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SchemaError::Transform {
            step: TransformStep::ForeignKeyCheck,
            ..
        }
    ));
    assert!(err.to_string().contains("'child'"));

    db.refresh_catalog(&cancel).await.unwrap();
    assert_eq!(field_names(&db, "parent"), ["id", "note"]);

    db.rollback_all().await.unwrap();
    assert_eq!(db.pragma("foreign_keys").await.unwrap(), "1");
    assert_eq!(field_names(&db, "parent"), ["id", "extra"]);
}

#[tokio::test]
async fn test_enforced_rebuild_needs_settled_changes() {
    let mut db = enforcing_db().await;
    db.execute_sql("DELETE FROM child WHERE id = 2", true)
        .await
        .unwrap();
    let err = db
        .drop_column("parent", "extra", &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, SchemaError::Conflict(_)));
    assert_eq!(field_names(&db, "parent"), ["id", "extra"]);
}

#[tokio::test]
async fn test_lost_clauses_reported() {
    let mut db = with_schema(
        "CREATE TABLE pair (a text COLLATE NOCASE, b text, c text, UNIQUE(a, b));
         INSERT INTO pair VALUES ('x', 'y', 'z');",
    )
    .await;

    let report = db
        .drop_column("pair", "c", &CancellationToken::new())
        .await
        .unwrap();

    assert!(report.failed_dependents.is_empty());
    assert_eq!(report.dropped_clauses, ["a COLLATE NOCASE", "UNIQUE(a, b)"]);
    assert!(!report.is_clean());
    assert_eq!(count(&mut db, "pair").await, 1);
}

#[tokio::test]
async fn test_cancel_during_rebuild_rolls_back() {
    let mut db = hero_db().await;
    let cancel = CancellationToken::new();

    // cancel as soon as the rebuild opens its restore point
    let mut dirty = db.subscribe_dirty();
    let trip = cancel.clone();
    tokio::spawn(async move {
        while dirty.changed().await.is_ok() {
            if *dirty.borrow_and_update() {
                trip.cancel();
                break;
            }
        }
    });

    let err = db.drop_column("hero", "power", &cancel).await.unwrap_err();
    assert!(matches!(err, SchemaError::Cancelled));
    assert_eq!(db.ledger().active(), [DEFAULT_RESTORE_POINT]);

    db.refresh_catalog(&CancellationToken::new()).await.unwrap();
    assert_eq!(field_names(&db, "hero"), ["id", "name", "power"]);
    assert!(!db.catalog().contains("oxide_transform_new_table"));
    assert_eq!(count(&mut db, "hero").await, 3);
}
