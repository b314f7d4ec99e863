mod common;

use common::*;
use oxide_schema::prelude::*;

#[tokio::test]
async fn test_export_then_import_into_new_table() {
    let mut db = hero_db().await;
    let cancel = CancellationToken::new();
    let options = CsvOptions::default().separator(Some(';')).newline("\r\n");

    let mut exported = Vec::new();
    let rows = db
        .export_query(
            "SELECT name, power FROM hero ORDER BY id",
            &mut exported,
            &options,
            &cancel,
        )
        .await
        .unwrap();
    assert_eq!(rows, 3);
    let text = String::from_utf8(exported.clone()).unwrap();
    assert!(text.starts_with("name;power\r\n"));
    assert!(text.contains("Rusty-Man;\r\n"));

    let imported = db
        .import_csv("hero_copy", exported.as_slice(), &options, &cancel)
        .await
        .unwrap();
    assert_eq!(imported, 3);
    assert_eq!(field_names(&db, "hero_copy"), ["name", "power"]);
    assert_eq!(
        column_values(&mut db, "SELECT power FROM hero_copy ORDER BY rowid").await,
        [Some("regeneration".to_string()), Some("webs".to_string()), Some(String::new())]
    );
}

#[tokio::test]
async fn test_import_into_existing_table() {
    let mut db = with_schema("CREATE TABLE city (name text, population integer);").await;
    let input = "name,population\n\"Ghent\",263000\n\"Bruges, old town\",118000\n";

    let imported = db
        .import_csv("city", input.as_bytes(), &CsvOptions::default(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(imported, 2);
    assert!(db.is_dirty());
    assert_eq!(
        column_values(&mut db, "SELECT name FROM city WHERE population > 200000").await,
        [Some("Ghent".to_string())]
    );
    assert_eq!(
        column_values(&mut db, "SELECT name FROM city ORDER BY population").await[0],
        Some("Bruges, old town".to_string())
    );
}

#[tokio::test]
async fn test_failed_import_rolls_back() {
    let mut db = with_schema("CREATE TABLE t (a integer NOT NULL, b text NOT NULL);").await;
    let options = CsvOptions::default().header(false);

    // the short second record binds NULL to b
    let err = db
        .import_csv("t", "1,x\n2".as_bytes(), &options, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, SchemaError::Engine(_)));
    assert_eq!(count(&mut db, "t").await, 0);
    assert!(!db.ledger().is_active("oxide_csv_import"));
}

#[tokio::test]
async fn test_multi_line_field_round_trip() {
    let mut db = with_schema(
        "CREATE TABLE note (body text); INSERT INTO note VALUES ('first line\nsecond line');",
    )
    .await;
    let cancel = CancellationToken::new();
    let options = CsvOptions::default();

    let mut exported = Vec::new();
    db.export_table("note", &mut exported, &options, &cancel)
        .await
        .unwrap();
    assert_eq!(
        String::from_utf8(exported.clone()).unwrap(),
        "body\n\"first line\nsecond line\"\n"
    );

    db.import_csv("note_copy", exported.as_slice(), &options, &cancel)
        .await
        .unwrap();
    assert_eq!(
        column_values(&mut db, "SELECT body FROM note_copy").await,
        [Some("first line\nsecond line".to_string())]
    );
}

#[tokio::test]
async fn test_cancelled_import() {
    let mut db = memory().await;
    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = db
        .import_csv("t", "a,b\n1,2\n".as_bytes(), &CsvOptions::default(), &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, SchemaError::Cancelled));
    assert!(!db.catalog().contains("t"));
}
