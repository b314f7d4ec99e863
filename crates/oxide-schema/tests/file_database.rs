use oxide_schema::prelude::*;

#[tokio::test]
async fn test_rejects_non_database_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "just some text, not a database").unwrap();

    let err = Database::open(&path, DatabaseOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, SchemaError::NotADatabase(p) if p == path));
}

#[tokio::test]
async fn test_commit_on_close_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.db");

    let mut db = Database::create(&path, DatabaseOptions::default())
        .await
        .unwrap();
    assert_eq!(db.location(), Some(path.as_path()));
    db.create_table("hero", &[Field::new("id", "integer").auto_increment(), Field::new("name", "text")])
        .await
        .unwrap();
    db.close(CloseAction::Commit).await.unwrap();

    let db = Database::open(&path, DatabaseOptions::default())
        .await
        .unwrap();
    let catalog = db.catalog();
    let hero = catalog.table("hero").unwrap();
    assert_eq!(hero.fields.len(), 2);
}

#[tokio::test]
async fn test_rollback_on_close_discards() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.db");

    let mut db = Database::create(&path, DatabaseOptions::default())
        .await
        .unwrap();
    db.create_table("kept", &[Field::new("a", "text")])
        .await
        .unwrap();
    db.commit_all().await.unwrap();
    db.create_table("discarded", &[Field::new("b", "text")])
        .await
        .unwrap();
    db.close(CloseAction::Rollback).await.unwrap();

    let db = Database::open(&path, DatabaseOptions::default())
        .await
        .unwrap();
    assert!(db.catalog().contains("kept"));
    assert!(!db.catalog().contains("discarded"));
}

#[tokio::test]
async fn test_open_missing_file_without_create_fails() {
    let dir = tempfile::tempdir().unwrap();
    let result = Database::open(dir.path().join("missing.db"), DatabaseOptions::default()).await;
    assert!(matches!(result, Err(SchemaError::Engine(_))));
}
