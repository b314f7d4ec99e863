//! `CREATE TABLE` parser implementation.

use super::error::ParseError;
use crate::lexer::{Keyword, Lexer, Span, Token, TokenKind};
use crate::schema::{Field, Table};

/// Returns true for keywords that open a column constraint, and therefore
/// end a column's type name.
const fn is_constraint_start(keyword: Keyword) -> bool {
    matches!(
        keyword,
        Keyword::Constraint
            | Keyword::Primary
            | Keyword::Not
            | Keyword::Null
            | Keyword::Unique
            | Keyword::Check
            | Keyword::Default
            | Keyword::Collate
            | Keyword::References
            | Keyword::Generated
            | Keyword::As
    )
}

/// `CREATE TABLE` parser.
pub struct Parser<'a> {
    input: &'a str,
    lexer: Lexer<'a>,
    current: Token,
    previous: Token,
    discarded: Vec<String>,
}

impl<'a> Parser<'a> {
    /// Creates a new parser for the given input.
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token();
        Self {
            input,
            lexer,
            current,
            previous: Token::new(TokenKind::Eof, Span::new(0, 0)),
            discarded: Vec::new(),
        }
    }

    /// Returns the clauses the model cannot represent, as written in the
    /// input: table UNIQUE, CHECK and FOREIGN KEY constraints, and column
    /// COLLATE, REFERENCES and generated-column clauses. Column clauses are
    /// prefixed with the column name.
    ///
    /// Generating DDL from the parsed table drops these clauses.
    #[must_use]
    pub fn discarded_clauses(&self) -> &[String] {
        &self.discarded
    }

    /// Records the text from `start` to the last consumed token as discarded.
    fn discard_since(&mut self, start: Span, column: Option<&str>) {
        let text = start.to(self.previous.span).slice(self.input);
        let clause = match column {
            Some(column) => format!("{column} {text}"),
            None => String::from(text),
        };
        self.discarded.push(clause);
    }

    /// Parses a single `CREATE TABLE` statement.
    ///
    /// # Errors
    ///
    /// Returns a `ParseError` if the input is not a `CREATE TABLE` statement
    /// with a column list, or if it is malformed.
    pub fn parse_create_table(&mut self) -> Result<Table, ParseError> {
        self.expect_keyword(Keyword::Create)?;
        if self.check_keyword(Keyword::Temp) || self.check_keyword(Keyword::Temporary) {
            self.advance();
        }
        self.expect_keyword(Keyword::Table)?;
        if self.check_keyword(Keyword::If) {
            self.advance();
            self.expect_keyword(Keyword::Not)?;
            self.expect_keyword(Keyword::Exists)?;
        }

        let mut name = self.expect_name()?;
        if self.check(&TokenKind::Dot) {
            self.advance();
            name = self.expect_name()?;
        }
        let mut table = Table::new(name);

        if self.check_keyword(Keyword::As) {
            return Err(ParseError::new(
                "CREATE TABLE ... AS SELECT has no column definitions",
                self.current.span,
            ));
        }

        self.expect(&TokenKind::LeftParen)?;
        loop {
            if self.at_table_constraint() {
                self.parse_table_constraint(&mut table)?;
            } else {
                let field = self.parse_column_definition()?;
                table.add_field(field);
            }

            if !self.check(&TokenKind::Comma) {
                break;
            }
            self.advance();
        }
        self.expect(&TokenKind::RightParen)?;

        let without_rowid = self.parse_table_options()?;
        if self.check(&TokenKind::Semicolon) {
            self.advance();
        }
        if !self.current.is_eof() {
            return Err(ParseError::unexpected(
                "end of statement",
                self.current.kind.clone(),
                self.current.span,
            ));
        }

        if without_rowid {
            if table.primary_key().next().is_none() {
                return Err(ParseError::new(
                    "WITHOUT ROWID table has no PRIMARY KEY",
                    self.previous.span,
                ));
            }
            table.set_without_rowid(true);
        }

        Ok(table)
    }

    /// Parses a column name, declared type and column constraints.
    fn parse_column_definition(&mut self) -> Result<Field, ParseError> {
        let name = self.expect_name()?;
        let sql_type = self.parse_type_name()?;
        let mut field = Field::new(name, sql_type);

        while let Some(keyword) = self.current.as_keyword() {
            match keyword {
                Keyword::Constraint => {
                    self.advance();
                    self.expect_name()?;
                }
                Keyword::Primary => {
                    self.advance();
                    self.expect_keyword(Keyword::Key)?;
                    self.skip_sort_order();
                    self.skip_conflict_clause()?;
                    field.primary_key = true;
                    if self.check_keyword(Keyword::Autoincrement) {
                        self.advance();
                        field.auto_increment = true;
                    }
                }
                Keyword::Not => {
                    self.advance();
                    self.expect_keyword(Keyword::Null)?;
                    self.skip_conflict_clause()?;
                    field.not_null = true;
                }
                Keyword::Null => {
                    self.advance();
                    self.skip_conflict_clause()?;
                }
                Keyword::Unique => {
                    self.advance();
                    self.skip_conflict_clause()?;
                    field.unique = true;
                }
                Keyword::Check => {
                    self.advance();
                    field.check = self.parse_check(&field.name)?;
                }
                Keyword::Default => {
                    self.advance();
                    field.default_value = self.parse_default_value()?;
                }
                Keyword::Collate => {
                    let start = self.current.span;
                    self.advance();
                    self.expect_name()?;
                    self.discard_since(start, Some(field.name.as_str()));
                }
                Keyword::References => {
                    let start = self.current.span;
                    self.skip_foreign_key_clause()?;
                    self.discard_since(start, Some(field.name.as_str()));
                }
                Keyword::Generated | Keyword::As => {
                    let start = self.current.span;
                    self.skip_generated_clause()?;
                    self.discard_since(start, Some(field.name.as_str()));
                }
                _ => break,
            }
        }

        Ok(field)
    }

    /// Parses a declared type: a run of names, optionally followed by a
    /// parenthesized size. The text is kept as written, e.g. `VARCHAR(255)`.
    fn parse_type_name(&mut self) -> Result<String, ParseError> {
        let start = self.current.span;
        let mut last = None;
        while self.at_type_word() {
            last = Some(self.current.span);
            self.advance();
        }
        let Some(mut end) = last else {
            return Ok(String::new());
        };

        if self.check(&TokenKind::LeftParen) {
            self.skip_parenthesized()?;
            end = self.previous.span;
        }

        Ok(String::from(start.to(end).slice(self.input)))
    }

    fn at_type_word(&self) -> bool {
        match &self.current.kind {
            TokenKind::Identifier(_) => true,
            TokenKind::Keyword(keyword) => !is_constraint_start(*keyword),
            _ => false,
        }
    }

    /// Parses `(expr)` after CHECK and returns the expression in compact form.
    ///
    /// `CHECK(name CHECK(expr))`, where `name` is the column itself, is
    /// unwrapped to `expr`.
    fn parse_check(&mut self, field_name: &str) -> Result<String, ParseError> {
        self.expect(&TokenKind::LeftParen)?;

        let self_prefixed = self.name_text().is_some_and(|name| name == field_name)
            && self.peek_token().as_keyword() == Some(Keyword::Check);
        if self_prefixed {
            self.advance();
            self.advance();
            self.expect(&TokenKind::LeftParen)?;
            let expr = self.collect_compact()?;
            self.expect(&TokenKind::RightParen)?;
            self.expect(&TokenKind::RightParen)?;
            return Ok(expr);
        }

        let expr = self.collect_compact()?;
        self.expect(&TokenKind::RightParen)?;
        Ok(expr)
    }

    /// Parses the value after DEFAULT: a literal, a signed number, a name
    /// such as `CURRENT_TIMESTAMP`, or a parenthesized expression.
    fn parse_default_value(&mut self) -> Result<String, ParseError> {
        let start = self.current.span;
        match &self.current.kind {
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.collect_compact()?;
                self.expect(&TokenKind::RightParen)?;
                Ok(format!("({expr})"))
            }
            TokenKind::Plus | TokenKind::Minus => {
                self.advance();
                if !self.check(&TokenKind::Number) {
                    return Err(ParseError::unexpected(
                        "number",
                        self.current.kind.clone(),
                        self.current.span,
                    ));
                }
                self.advance();
                Ok(format!(
                    "{}{}",
                    start.slice(self.input),
                    self.previous.span.slice(self.input)
                ))
            }
            TokenKind::Keyword(keyword)
                if *keyword != Keyword::Null && is_constraint_start(*keyword) =>
            {
                Err(ParseError::unexpected(
                    "default value",
                    self.current.kind.clone(),
                    self.current.span,
                ))
            }
            TokenKind::Number
            | TokenKind::String(_)
            | TokenKind::Blob(_)
            | TokenKind::Identifier(_)
            | TokenKind::Keyword(_) => {
                self.advance();
                Ok(String::from(start.slice(self.input)))
            }
            _ => Err(ParseError::unexpected(
                "default value",
                self.current.kind.clone(),
                self.current.span,
            )),
        }
    }

    /// Collects the tokens up to the closing parenthesis matching the current
    /// nesting level, without consuming it.
    ///
    /// Tokens are joined without whitespace except between two word-like
    /// tokens, and where joining would start a comment.
    fn collect_compact(&mut self) -> Result<String, ParseError> {
        let mut text = String::new();
        let mut depth = 0usize;
        let mut previous_word_like = false;

        loop {
            match &self.current.kind {
                TokenKind::Eof | TokenKind::Error(_) => {
                    return Err(ParseError::unexpected(
                        ")",
                        self.current.kind.clone(),
                        self.current.span,
                    ));
                }
                TokenKind::RightParen if depth == 0 => break,
                TokenKind::RightParen => depth -= 1,
                TokenKind::LeftParen => depth += 1,
                _ => {}
            }

            let piece = self.current.span.slice(self.input);
            let word_like = self.current.is_word_like();
            let separate = (previous_word_like && word_like)
                || (text.ends_with('-') && piece.starts_with('-'))
                || (text.ends_with('/') && piece.starts_with('*'));
            if separate {
                text.push(' ');
            }
            text.push_str(piece);
            previous_word_like = word_like;
            self.advance();
        }

        Ok(text)
    }

    /// Returns true if the current token starts a table constraint rather
    /// than a column definition.
    fn at_table_constraint(&self) -> bool {
        match self.current.as_keyword() {
            Some(Keyword::Constraint) => true,
            Some(Keyword::Primary | Keyword::Foreign) => {
                self.peek_token().as_keyword() == Some(Keyword::Key)
            }
            Some(Keyword::Unique | Keyword::Check) => {
                self.peek_token().kind == TokenKind::LeftParen
            }
            _ => false,
        }
    }

    /// Parses a table constraint. Only PRIMARY KEY affects the model; UNIQUE,
    /// CHECK and FOREIGN KEY constraints are recorded as discarded.
    fn parse_table_constraint(&mut self, table: &mut Table) -> Result<(), ParseError> {
        let start = self.current.span;
        if self.check_keyword(Keyword::Constraint) {
            self.advance();
            self.expect_name()?;
        }

        match self.current.as_keyword() {
            Some(Keyword::Primary) => {
                self.advance();
                self.expect_keyword(Keyword::Key)?;
                self.expect(&TokenKind::LeftParen)?;
                let mut listed = Vec::new();
                loop {
                    let span = self.current.span;
                    let column = self.expect_name()?;
                    if self.check_keyword(Keyword::Collate) {
                        self.advance();
                        self.expect_name()?;
                    }
                    self.skip_sort_order();

                    let Some(field) = table.field_mut(&column) else {
                        return Err(ParseError::new(
                            format!("PRIMARY KEY references unknown column '{column}'"),
                            span,
                        ));
                    };
                    field.primary_key = true;
                    listed.push(field.name.clone());

                    if !self.check(&TokenKind::Comma) {
                        break;
                    }
                    self.advance();
                }
                self.expect(&TokenKind::RightParen)?;
                table.set_primary_key_order(listed);
                self.skip_conflict_clause()
            }
            Some(Keyword::Unique) => {
                self.advance();
                self.skip_parenthesized()?;
                self.skip_conflict_clause()?;
                self.discard_since(start, None);
                Ok(())
            }
            Some(Keyword::Check) => {
                self.advance();
                self.skip_parenthesized()?;
                self.discard_since(start, None);
                Ok(())
            }
            Some(Keyword::Foreign) => {
                self.advance();
                self.expect_keyword(Keyword::Key)?;
                self.skip_parenthesized()?;
                self.skip_to_next_definition()?;
                self.discard_since(start, None);
                Ok(())
            }
            _ => Err(ParseError::unexpected(
                "PRIMARY KEY, UNIQUE, CHECK or FOREIGN KEY",
                self.current.kind.clone(),
                self.current.span,
            )),
        }
    }

    /// Parses `WITHOUT ROWID` and `STRICT` after the column list. Returns
    /// true if WITHOUT ROWID was given.
    fn parse_table_options(&mut self) -> Result<bool, ParseError> {
        let mut without_rowid = false;
        loop {
            if self.check_keyword(Keyword::Without) {
                self.advance();
                self.expect_word("ROWID")?;
                without_rowid = true;
            } else if self.check_word("STRICT") {
                self.advance();
            } else {
                break;
            }

            if !self.check(&TokenKind::Comma) {
                break;
            }
            self.advance();
        }
        Ok(without_rowid)
    }

    /// Skips `REFERENCES table [(columns)]` and the actions and deferral
    /// clauses that follow it inside a column definition.
    fn skip_foreign_key_clause(&mut self) -> Result<(), ParseError> {
        self.expect_keyword(Keyword::References)?;
        self.expect_name()?;
        loop {
            match &self.current.kind {
                TokenKind::Comma | TokenKind::RightParen | TokenKind::Eof => break,
                TokenKind::LeftParen => self.skip_parenthesized()?,
                // ON DELETE SET NULL, ON UPDATE SET DEFAULT
                TokenKind::Keyword(Keyword::Null | Keyword::Default)
                    if self.previous_is_word("SET") =>
                {
                    self.advance();
                }
                // NOT DEFERRABLE
                TokenKind::Keyword(Keyword::Not)
                    if self.peek_token().as_keyword() != Some(Keyword::Null) =>
                {
                    self.advance();
                }
                TokenKind::Keyword(keyword) if is_constraint_start(*keyword) => break,
                _ => self.advance(),
            }
        }
        Ok(())
    }

    /// Skips `[GENERATED ALWAYS] AS (expr) [STORED | VIRTUAL]`.
    fn skip_generated_clause(&mut self) -> Result<(), ParseError> {
        if self.check_keyword(Keyword::Generated) {
            self.advance();
            self.expect_word("ALWAYS")?;
        }
        self.expect_keyword(Keyword::As)?;
        self.skip_parenthesized()?;
        if self.check_word("STORED") || self.check_word("VIRTUAL") {
            self.advance();
        }
        Ok(())
    }

    /// Skips tokens up to the next top-level comma or the closing parenthesis
    /// of the column list.
    fn skip_to_next_definition(&mut self) -> Result<(), ParseError> {
        loop {
            match &self.current.kind {
                TokenKind::Comma | TokenKind::RightParen => return Ok(()),
                TokenKind::Eof | TokenKind::Error(_) => {
                    return Err(ParseError::unexpected(
                        ")",
                        self.current.kind.clone(),
                        self.current.span,
                    ));
                }
                TokenKind::LeftParen => self.skip_parenthesized()?,
                _ => self.advance(),
            }
        }
    }

    /// Skips a balanced parenthesized group, including both parentheses.
    fn skip_parenthesized(&mut self) -> Result<(), ParseError> {
        self.expect(&TokenKind::LeftParen)?;
        let mut depth = 1usize;
        while depth > 0 {
            match &self.current.kind {
                TokenKind::LeftParen => depth += 1,
                TokenKind::RightParen => depth -= 1,
                TokenKind::Eof | TokenKind::Error(_) => {
                    return Err(ParseError::unexpected(
                        ")",
                        self.current.kind.clone(),
                        self.current.span,
                    ));
                }
                _ => {}
            }
            self.advance();
        }
        Ok(())
    }

    /// Skips `ON CONFLICT <resolution>` if present.
    fn skip_conflict_clause(&mut self) -> Result<(), ParseError> {
        if !self.check_keyword(Keyword::On) {
            return Ok(());
        }
        self.advance();
        self.expect_keyword(Keyword::Conflict)?;
        match self.current.as_keyword() {
            Some(
                Keyword::Rollback
                | Keyword::Abort
                | Keyword::Fail
                | Keyword::Ignore
                | Keyword::Replace,
            ) => {
                self.advance();
                Ok(())
            }
            _ => Err(ParseError::unexpected(
                "ROLLBACK, ABORT, FAIL, IGNORE or REPLACE",
                self.current.kind.clone(),
                self.current.span,
            )),
        }
    }

    fn skip_sort_order(&mut self) {
        if self.check_keyword(Keyword::Asc) || self.check_keyword(Keyword::Desc) {
            self.advance();
        }
    }

    // Helper methods

    /// Advances to the next token.
    fn advance(&mut self) {
        self.previous = std::mem::replace(&mut self.current, self.lexer.next_token());
    }

    /// Returns the token after the current one without consuming anything.
    fn peek_token(&self) -> Token {
        self.lexer.clone().next_token()
    }

    /// Checks if the current token matches the given kind.
    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current.kind) == std::mem::discriminant(kind)
    }

    /// Checks if the current token is the given keyword.
    fn check_keyword(&self, keyword: Keyword) -> bool {
        matches!(&self.current.kind, TokenKind::Keyword(kw) if *kw == keyword)
    }

    /// Checks if the current token is the given non-reserved word.
    fn check_word(&self, word: &str) -> bool {
        matches!(&self.current.kind, TokenKind::Identifier(w) if w.eq_ignore_ascii_case(word))
    }

    fn previous_is_word(&self, word: &str) -> bool {
        matches!(&self.previous.kind, TokenKind::Identifier(w) if w.eq_ignore_ascii_case(word))
    }

    /// Expects the current token to be the given kind.
    fn expect(&mut self, kind: &TokenKind) -> Result<(), ParseError> {
        if self.check(kind) {
            self.advance();
            Ok(())
        } else {
            Err(ParseError::unexpected(
                format!("{kind:?}"),
                self.current.kind.clone(),
                self.current.span,
            ))
        }
    }

    /// Expects the current token to be the given keyword.
    fn expect_keyword(&mut self, keyword: Keyword) -> Result<(), ParseError> {
        if self.check_keyword(keyword) {
            self.advance();
            Ok(())
        } else {
            Err(ParseError::unexpected(
                keyword.as_str(),
                self.current.kind.clone(),
                self.current.span,
            ))
        }
    }

    /// Expects the current token to be the given non-reserved word.
    fn expect_word(&mut self, word: &str) -> Result<(), ParseError> {
        if self.check_word(word) {
            self.advance();
            Ok(())
        } else {
            Err(ParseError::unexpected(
                word,
                self.current.kind.clone(),
                self.current.span,
            ))
        }
    }

    /// Returns the name the current token spells, if it can be used as one.
    ///
    /// Quoted identifiers, string literals and keywords are all valid names
    /// in SQLite DDL.
    fn name_text(&self) -> Option<String> {
        match &self.current.kind {
            TokenKind::Identifier(name) | TokenKind::String(name) => Some(name.clone()),
            TokenKind::Keyword(_) => Some(String::from(self.current.span.slice(self.input))),
            _ => None,
        }
    }

    /// Expects and returns a name.
    fn expect_name(&mut self) -> Result<String, ParseError> {
        let Some(name) = self.name_text() else {
            return Err(ParseError::unexpected(
                "name",
                self.current.kind.clone(),
                self.current.span,
            ));
        };
        self.advance();
        Ok(name)
    }
}

impl Table {
    /// Parses a `CREATE TABLE` statement.
    ///
    /// Returns an empty table (no name, no fields) when the text cannot be
    /// parsed. Use [`Parser::parse_create_table`] to get the error instead.
    #[must_use]
    pub fn parse_sql(sql: &str) -> Self {
        Parser::new(sql).parse_create_table().unwrap_or_default()
    }
}
