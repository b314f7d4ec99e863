//! `CREATE TABLE` parser.
//!
//! A hand-written recursive descent parser that reads the subset of SQLite
//! DDL needed to rebuild a [`Table`](crate::schema::Table): column names,
//! declared types and constraints. Everything else inside the statement
//! (foreign key clauses, generated columns, table-level UNIQUE and CHECK) is
//! recognized and skipped.

mod error;
mod parser;

pub use error::ParseError;
pub use parser::Parser;
