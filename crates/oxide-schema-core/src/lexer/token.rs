//! Token types for the SQLite lexer.

use super::Span;

/// Keywords that carry meaning inside `CREATE TABLE` statements and
/// statement scripts.
///
/// SQLite allows most keywords as bare identifiers, so the parser accepts
/// any keyword token where a name is expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    // Statements
    Create,
    Table,
    View,
    Index,
    Trigger,
    Select,
    As,

    // Table prefix
    Temp,
    Temporary,
    If,
    Not,
    Exists,

    // Column and table constraints
    Constraint,
    Primary,
    Key,
    Asc,
    Desc,
    Autoincrement,
    Null,
    Unique,
    Check,
    Default,
    Collate,
    References,
    Foreign,
    Generated,

    // Conflict clause
    On,
    Conflict,
    Rollback,
    Abort,
    Fail,
    Ignore,
    Replace,

    // Table options
    Without,

    // Trigger bodies
    Begin,
    Case,
    End,
}

impl Keyword {
    /// Attempts to parse a keyword from a string (case-insensitive).
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "CREATE" => Some(Self::Create),
            "TABLE" => Some(Self::Table),
            "VIEW" => Some(Self::View),
            "INDEX" => Some(Self::Index),
            "TRIGGER" => Some(Self::Trigger),
            "SELECT" => Some(Self::Select),
            "AS" => Some(Self::As),
            "TEMP" => Some(Self::Temp),
            "TEMPORARY" => Some(Self::Temporary),
            "IF" => Some(Self::If),
            "NOT" => Some(Self::Not),
            "EXISTS" => Some(Self::Exists),
            "CONSTRAINT" => Some(Self::Constraint),
            "PRIMARY" => Some(Self::Primary),
            "KEY" => Some(Self::Key),
            "ASC" => Some(Self::Asc),
            "DESC" => Some(Self::Desc),
            "AUTOINCREMENT" => Some(Self::Autoincrement),
            "NULL" => Some(Self::Null),
            "UNIQUE" => Some(Self::Unique),
            "CHECK" => Some(Self::Check),
            "DEFAULT" => Some(Self::Default),
            "COLLATE" => Some(Self::Collate),
            "REFERENCES" => Some(Self::References),
            "FOREIGN" => Some(Self::Foreign),
            "GENERATED" => Some(Self::Generated),
            "ON" => Some(Self::On),
            "CONFLICT" => Some(Self::Conflict),
            "ROLLBACK" => Some(Self::Rollback),
            "ABORT" => Some(Self::Abort),
            "FAIL" => Some(Self::Fail),
            "IGNORE" => Some(Self::Ignore),
            "REPLACE" => Some(Self::Replace),
            "WITHOUT" => Some(Self::Without),
            "BEGIN" => Some(Self::Begin),
            "CASE" => Some(Self::Case),
            "END" => Some(Self::End),
            _ => None,
        }
    }

    /// Returns the keyword as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Table => "TABLE",
            Self::View => "VIEW",
            Self::Index => "INDEX",
            Self::Trigger => "TRIGGER",
            Self::Select => "SELECT",
            Self::As => "AS",
            Self::Temp => "TEMP",
            Self::Temporary => "TEMPORARY",
            Self::If => "IF",
            Self::Not => "NOT",
            Self::Exists => "EXISTS",
            Self::Constraint => "CONSTRAINT",
            Self::Primary => "PRIMARY",
            Self::Key => "KEY",
            Self::Asc => "ASC",
            Self::Desc => "DESC",
            Self::Autoincrement => "AUTOINCREMENT",
            Self::Null => "NULL",
            Self::Unique => "UNIQUE",
            Self::Check => "CHECK",
            Self::Default => "DEFAULT",
            Self::Collate => "COLLATE",
            Self::References => "REFERENCES",
            Self::Foreign => "FOREIGN",
            Self::Generated => "GENERATED",
            Self::On => "ON",
            Self::Conflict => "CONFLICT",
            Self::Rollback => "ROLLBACK",
            Self::Abort => "ABORT",
            Self::Fail => "FAIL",
            Self::Ignore => "IGNORE",
            Self::Replace => "REPLACE",
            Self::Without => "WITHOUT",
            Self::Begin => "BEGIN",
            Self::Case => "CASE",
            Self::End => "END",
        }
    }
}

/// The kind of token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    // Literals
    /// Numeric literal (e.g., 42, 3.14, 0x1F); the text is taken from the span
    Number,
    /// String literal with quotes removed (e.g., 'hello')
    String(String),
    /// Blob literal (e.g., X'1234')
    Blob(Vec<u8>),

    // Identifiers and keywords
    /// Bare or quoted identifier, unescaped
    Identifier(String),
    /// SQL keyword
    Keyword(Keyword),

    // Operators
    /// +
    Plus,
    /// -
    Minus,
    /// *
    Star,
    /// /
    Slash,
    /// %
    Percent,
    /// = or ==
    Eq,
    /// != or <>
    NotEq,
    /// <
    Lt,
    /// <=
    LtEq,
    /// >
    Gt,
    /// >=
    GtEq,
    /// ||
    Concat,
    /// &
    BitAnd,
    /// |
    BitOr,
    /// ~
    BitNot,
    /// <<
    LeftShift,
    /// >>
    RightShift,

    // Delimiters
    /// (
    LeftParen,
    /// )
    RightParen,
    /// ,
    Comma,
    /// ;
    Semicolon,
    /// .
    Dot,
    /// :
    Colon,
    /// ?
    Question,
    /// @
    At,
    /// $
    Dollar,

    // Special
    /// End of input
    Eof,
    /// Invalid/unknown token
    Error(String),
}

/// A token with its span in the source code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The kind of token.
    pub kind: TokenKind,
    /// The location in the source code.
    pub span: Span,
}

impl Token {
    /// Creates a new token.
    #[must_use]
    pub const fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Returns true if this is an EOF token.
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }

    /// Returns the keyword if this is a keyword token.
    #[must_use]
    pub const fn as_keyword(&self) -> Option<Keyword> {
        match &self.kind {
            TokenKind::Keyword(kw) => Some(*kw),
            _ => None,
        }
    }

    /// Returns true for identifiers, keywords and literals.
    ///
    /// Two adjacent word-like tokens need whitespace between them to stay
    /// separate tokens when re-lexed.
    #[must_use]
    pub const fn is_word_like(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Number
                | TokenKind::String(_)
                | TokenKind::Blob(_)
                | TokenKind::Identifier(_)
                | TokenKind::Keyword(_)
        )
    }
}
