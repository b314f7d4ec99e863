#![allow(dead_code)]

use oxide_schema_core::{Field, ParseError, Parser, Table};

pub fn parse(sql: &str) -> Table {
    Parser::new(sql)
        .parse_create_table()
        .unwrap_or_else(|e| panic!("Failed to parse: {sql}\nError: {e:?}"))
}

pub fn parse_err(sql: &str) -> ParseError {
    Parser::new(sql)
        .parse_create_table()
        .expect_err(&format!("Expected parse error for: {sql}"))
}

pub fn field<'a>(table: &'a Table, name: &str) -> &'a Field {
    table
        .field(name)
        .unwrap_or_else(|| panic!("No field {name} in {:?}", table.field_names()))
}

/// Verifies that generated DDL is a fixed point: parsing it yields the same
/// model, and generating from that model yields the same text.
pub fn round_trip(table: &Table) {
    let rendered1 = table.sql();
    let reparsed = parse(&rendered1);
    assert_eq!(&reparsed, table, "Model changed after re-parsing:\n{rendered1}");
    let rendered2 = reparsed.sql();
    assert_eq!(
        rendered1, rendered2,
        "Round-trip failed.\n  First:    {rendered1}\n  Second:   {rendered2}"
    );
}
