//! Tests for parser error cases.

mod common;
use common::*;

#[test]
fn error_empty_input() {
    let _ = parse_err("");
}

#[test]
fn error_view() {
    let err = parse_err("CREATE VIEW v AS SELECT 1");
    assert_eq!(err.expected.as_deref(), Some("TABLE"));
}

#[test]
fn error_create_table_as_select() {
    let _ = parse_err("CREATE TABLE t AS SELECT * FROM other");
}

#[test]
fn error_index() {
    let _ = parse_err("CREATE INDEX i ON t(a)");
}

#[test]
fn error_unclosed_paren() {
    let _ = parse_err("CREATE TABLE t (a text CHECK (a > 0)");
}

#[test]
fn error_unterminated_quote() {
    let err = parse_err("CREATE TABLE `t (a)");
    assert!(err.message.contains("Unterminated"));
}

#[test]
fn error_missing_column_list() {
    let _ = parse_err("CREATE TABLE t");
}

#[test]
fn error_without_rowid_needs_primary_key() {
    let err = parse_err("CREATE TABLE t (a integer) WITHOUT ROWID");
    assert!(err.message.contains("PRIMARY KEY"));
}

#[test]
fn error_bad_conflict_resolution() {
    let _ = parse_err("CREATE TABLE t (a integer NOT NULL ON CONFLICT NOTHING)");
}

#[test]
fn error_display_includes_position() {
    let err = parse_err("CREATE TABLE t (a,)");
    assert!(err.to_string().contains("at position"));
}
