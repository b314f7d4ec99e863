//! # oxide-schema-core
//!
//! Structural model of SQLite tables, with a parser and a canonical
//! generator for their `CREATE TABLE` statements.
//!
//! This crate provides:
//! - A hand-written lexer and recursive descent parser for `CREATE TABLE`
//! - A plain data model of tables and fields with invariant checks
//! - Deterministic DDL generation that round-trips through the parser
//! - A script splitter that respects trigger bodies
//! - A CSV decoder and encoder
//!
//! ## Round trip
//!
//! ```rust
//! use oxide_schema_core::{Field, Table};
//!
//! let table = Table::parse_sql(
//!     "create TABLE hero (id integer PRIMARY KEY AUTOINCREMENT, name text NOT NULL)",
//! );
//! assert_eq!(table.name(), "hero");
//! assert!(table.fields()[0].auto_increment);
//!
//! let sql = table.sql();
//! assert_eq!(
//!     sql,
//!     "CREATE TABLE `hero` (\n\t`id`\tinteger PRIMARY KEY AUTOINCREMENT,\n\t`name`\ttext NOT NULL\n);"
//! );
//! assert_eq!(Table::parse_sql(&sql), table);
//!
//! let extended = table.with_field(Field::new("power", "text"));
//! assert_eq!(extended.fields().len(), 3);
//! ```
//!
//! ## CSV
//!
//! ```rust
//! use oxide_schema_core::csv::{CsvDecoder, CsvEncoder, CsvOptions};
//!
//! let options = CsvOptions::default();
//! let decoded = CsvDecoder::from_options(&options)
//!     .decode("a,\"b,c\",d".as_bytes())
//!     .unwrap();
//! assert_eq!(decoded.fields, vec!["a", "b,c", "d"]);
//! assert_eq!(CsvEncoder::new(&options).encode_record(decoded.fields.as_slice()), "a,\"b,c\",d");
//! ```

pub mod csv;
pub mod generator;
pub mod lexer;
pub mod parser;
pub mod schema;
pub mod script;

pub use generator::{quote_identifier, quote_identifier_list};
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::{ParseError, Parser};
pub use schema::{Field, ModelError, Table, DEFAULT_ROWID_COLUMN};
pub use script::split_statements;
