//! Generate, re-parse and compare.

mod common;
use common::*;
use oxide_schema_core::{Field, Table};

#[test]
fn round_trip_autoincrement_table() {
    let table = Table::new("hero")
        .with_field(Field::new("id", "integer").auto_increment())
        .with_field(
            Field::new("name", "text")
                .not_null()
                .default_value("'xxxx'"),
        )
        .with_field(Field::new("info", "VARCHAR(255)").check("info=='x'"));
    round_trip(&table);
}

#[test]
fn round_trip_composite_key() {
    let table = Table::new("pairs")
        .with_field(Field::new("left", "integer").primary_key())
        .with_field(Field::new("right", "integer").primary_key())
        .with_field(Field::new("weight", "real").default_value("1.5"));
    round_trip(&table);
}

#[test]
fn round_trip_sole_text_key() {
    let table = Table::new("codes")
        .with_field(Field::new("code", "text").primary_key().unique())
        .with_field(Field::new("label", "").default_value("-1"));
    round_trip(&table);
}

#[test]
fn round_trip_without_rowid() {
    let mut table = Table::new("kv")
        .with_field(Field::new("k", "text").primary_key())
        .with_field(Field::new("v", "blob").default_value("X'00'"));
    table.set_without_rowid(true);
    round_trip(&table);
    assert_eq!(parse(&table.sql()).rowid_column(), "k");
}

#[test]
fn round_trip_non_ascii() {
    let table = Table::new("lösung")
        .with_field(Field::new("Fieldöäüß", "INTEGER").primary_key())
        .with_field(Field::new("größe", "text").check("length(größe)>0 AND größe IS NOT NULL"));
    round_trip(&table);
}

#[test]
fn round_trip_keyword_names() {
    let table = Table::new("deffered")
        .with_field(Field::new("key", "integer").primary_key())
        .with_field(Field::new("if", "text").default_value("(lower('X'))"));
    round_trip(&table);
}

#[test]
fn reparse_of_parsed_statement_is_stable() {
    let original = parse(
        "CREATE TABLE chtest(id integer primary key, dumpytext text default('axa') \
         CHECK(dumpytext == \"aa\"), zoi integer)",
    );
    round_trip(&original);
}
