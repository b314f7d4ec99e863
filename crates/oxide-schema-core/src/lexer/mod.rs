//! SQLite lexer.
//!
//! Produces a stream of tokens with byte spans, so callers can slice the
//! original text of types, defaults and expressions verbatim.

mod span;
mod token;
mod tokenizer;

pub use span::Span;
pub use token::{Keyword, Token, TokenKind};
pub use tokenizer::Lexer;
