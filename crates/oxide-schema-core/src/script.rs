//! Splitting SQL scripts into statements.

use crate::lexer::{Keyword, Lexer, TokenKind};

/// Splits a script at top-level semicolons.
///
/// Semicolons inside string literals, quoted identifiers and comments are
/// ignored, as are those inside `CREATE TRIGGER ... BEGIN ... END` bodies.
/// Statements are returned trimmed and without their terminating semicolon;
/// empty statements are dropped.
#[must_use]
pub fn split_statements(sql: &str) -> Vec<&str> {
    let mut lexer = Lexer::new(sql);
    let mut statements = Vec::new();
    let mut start = 0;
    let mut leading = Vec::with_capacity(3);
    let mut depth = 0usize;

    loop {
        let token = lexer.next_token();
        match &token.kind {
            TokenKind::Eof => break,
            TokenKind::Semicolon if depth == 0 => {
                push_statement(&mut statements, &sql[start..token.span.start]);
                start = token.span.end;
                leading.clear();
                continue;
            }
            _ => {}
        }

        if leading.len() < 3 {
            leading.push(token.as_keyword());
        }
        if is_trigger(&leading) {
            match token.as_keyword() {
                Some(Keyword::Begin | Keyword::Case) => depth += 1,
                Some(Keyword::End) => depth = depth.saturating_sub(1),
                _ => {}
            }
        }
    }

    push_statement(&mut statements, &sql[start..]);
    statements
}

/// Returns true if the leading keywords are `CREATE [TEMP] TRIGGER`.
fn is_trigger(leading: &[Option<Keyword>]) -> bool {
    match leading {
        [Some(Keyword::Create), Some(Keyword::Trigger), ..] => true,
        [Some(Keyword::Create), Some(Keyword::Temp | Keyword::Temporary), Some(Keyword::Trigger)] => {
            true
        }
        _ => false,
    }
}

fn push_statement<'a>(statements: &mut Vec<&'a str>, text: &'a str) {
    let text = text.trim();
    if !text.is_empty() {
        statements.push(text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_split() {
        assert_eq!(
            split_statements("CREATE TABLE a(x); INSERT INTO a VALUES (1);\n"),
            vec!["CREATE TABLE a(x)", "INSERT INTO a VALUES (1)"]
        );
    }

    #[test]
    fn test_last_statement_without_semicolon() {
        assert_eq!(split_statements("SELECT 1; SELECT 2"), vec!["SELECT 1", "SELECT 2"]);
    }

    #[test]
    fn test_semicolons_in_literals_and_comments() {
        let sql = "INSERT INTO a VALUES ('x;y'); -- c;d\nSELECT \"a;b\" FROM a /* ; */;";
        assert_eq!(
            split_statements(sql),
            vec![
                "INSERT INTO a VALUES ('x;y')",
                "-- c;d\nSELECT \"a;b\" FROM a /* ; */"
            ]
        );
    }

    #[test]
    fn test_trigger_body_kept_whole() {
        let sql = "CREATE TRIGGER t AFTER INSERT ON a BEGIN \
                   UPDATE a SET x = CASE WHEN x > 0 THEN 1 ELSE 0 END; \
                   DELETE FROM b; \
                   END; SELECT 1;";
        let statements = split_statements(sql);
        assert_eq!(statements.len(), 2);
        assert!(statements[0].starts_with("CREATE TRIGGER"));
        assert!(statements[0].ends_with("END"));
        assert_eq!(statements[1], "SELECT 1");
    }

    #[test]
    fn test_empty_statements_dropped() {
        assert!(split_statements(" ;; \n").is_empty());
    }
}
