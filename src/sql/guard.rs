use crate::error::{Error, Result};
use regex::Regex;
use sqlparser::ast::{SetExpr, Statement};
use sqlparser::dialect::MySqlDialect;
use sqlparser::keywords::Keyword;
use sqlparser::parser::Parser;
use sqlparser::tokenizer::{Token, Tokenizer, Whitespace};
use std::sync::OnceLock;
use tracing::debug;

static SELECT_WORD: OnceLock<Regex> = OnceLock::new();

fn select_word() -> &'static Regex {
    SELECT_WORD.get_or_init(|| Regex::new(r"(?i)\bselect\b").unwrap())
}

fn unsafe_query(reason: impl Into<String>) -> Error {
    Error::UnsafeQuery(reason.into())
}

fn trim_punctuation(text: &str) -> &str {
    text.trim_matches(|c: char| c == ';' || c.is_whitespace())
}

/// Drop one pair of backticks wrapping the whole statement.
/// Quoted identifiers such as `` `order` `` keep their quotes.
fn unwrap_backticks(text: &str) -> &str {
    text.strip_prefix('`')
        .and_then(|rest| rest.strip_suffix('`'))
        .filter(|inner| !inner.contains('`'))
        .unwrap_or(text)
}

/// Remove fences, wrapping punctuation and a leading language tag
fn strip_noise(sql: &str) -> String {
    let text = sql.replace("```", "");
    let text = trim_punctuation(unwrap_backticks(trim_punctuation(&text)));

    let untagged = ["sql", "SQL"]
        .iter()
        .find_map(|tag| {
            text.strip_prefix(tag)
                .filter(|rest| rest.starts_with(char::is_whitespace))
        })
        .unwrap_or(text);

    trim_punctuation(untagged).to_string()
}

fn contains_select_into(body: &SetExpr) -> bool {
    match body {
        SetExpr::Select(select) => select.into.is_some(),
        SetExpr::Query(query) => contains_select_into(&query.body),
        SetExpr::SetOperation { left, right, .. } => {
            contains_select_into(left) || contains_select_into(right)
        }
        _ => false,
    }
}

fn is_keyword(token: &Token, keyword: Keyword) -> bool {
    matches!(token, Token::Word(w) if w.quote_style.is_none() && w.keyword == keyword)
}

/// Token-level check for read-only MySQL the parser cannot build an AST for,
/// e.g. `GROUP_CONCAT(name SEPARATOR ', ')`. Returns whether a top-level
/// `LIMIT` is present.
fn scan_tokens(tokens: &[Token]) -> Result<bool> {
    let significant: Vec<&Token> = tokens
        .iter()
        .filter(|t| !matches!(t, Token::Whitespace(_)))
        .collect();

    if !significant
        .first()
        .is_some_and(|t| is_keyword(t, Keyword::SELECT))
    {
        return Err(unsafe_query("statement must start with SELECT"));
    }

    let mut depth = 0usize;
    let mut has_limit = false;
    for (i, token) in significant.iter().copied().enumerate() {
        let next = significant.get(i + 1).copied();
        match token {
            Token::SemiColon => {
                return Err(unsafe_query("expected exactly one statement"));
            }
            Token::LParen => depth += 1,
            Token::RParen => depth = depth.saturating_sub(1),
            _ if is_keyword(token, Keyword::INTO) => {
                return Err(unsafe_query("SELECT ... INTO is not allowed"));
            }
            _ if is_keyword(token, Keyword::LOCK)
                || (is_keyword(token, Keyword::FOR)
                    && next.is_some_and(|n| {
                        is_keyword(n, Keyword::UPDATE) || is_keyword(n, Keyword::SHARE)
                    })) =>
            {
                return Err(unsafe_query("locking reads are not allowed"));
            }
            _ if depth == 0 && is_keyword(token, Keyword::LIMIT) => has_limit = true,
            _ => {}
        }
    }

    Ok(has_limit)
}

/// Check that `sql` is a single read-only query and report whether it
/// already carries a top-level `LIMIT`
fn inspect_statement(sql: &str) -> Result<bool> {
    let dialect = MySqlDialect {};

    let tokens = Tokenizer::new(&dialect, sql)
        .tokenize()
        .map_err(|e| unsafe_query(format!("could not tokenize: {}", e)))?;
    // MySQL reads `#` as a line comment; the tokenizer emits it as an operator
    let has_comment = tokens.iter().any(|t| {
        matches!(
            t,
            Token::Whitespace(Whitespace::SingleLineComment { .. })
                | Token::Whitespace(Whitespace::MultiLineComment(_))
                | Token::Sharp
                | Token::HashArrow
                | Token::HashLongArrow
                | Token::HashMinus
        )
    });
    if has_comment {
        return Err(unsafe_query("comments are not allowed"));
    }

    let mut statements = match Parser::parse_sql(&dialect, sql) {
        Ok(statements) => statements,
        Err(e) => {
            debug!("Parser rejected statement ({}), checking tokens instead", e);
            return scan_tokens(&tokens);
        }
    };
    if statements.len() != 1 {
        return Err(unsafe_query(format!(
            "expected exactly one statement, found {}",
            statements.len()
        )));
    }

    match statements.remove(0) {
        Statement::Query(query) => {
            if contains_select_into(&query.body) {
                return Err(unsafe_query("SELECT ... INTO is not allowed"));
            }
            if !query.locks.is_empty() {
                return Err(unsafe_query("locking reads are not allowed"));
            }
            Ok(query.limit.is_some())
        }
        other => Err(unsafe_query(format!("not a query: {}", other))),
    }
}

/// Validate a statement and bound its result size
///
/// Accepts a single read-only SELECT. A missing top-level `LIMIT` becomes
/// `LIMIT {row_limit}`; an existing one is kept as written. The output ends
/// with exactly one `;`.
pub fn guard(sql: &str, row_limit: u64) -> Result<String> {
    let cleaned = strip_noise(sql);

    let start = select_word()
        .find(&cleaned)
        .ok_or_else(|| unsafe_query("no SELECT statement found"))?
        .start();
    let body = cleaned[start..].trim();

    if !body
        .get(..6)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("select"))
    {
        return Err(unsafe_query("statement must start with SELECT"));
    }

    let statement = body
        .trim_end_matches(|c: char| c == ';' || c.is_whitespace())
        .to_string();
    if inspect_statement(&statement)? {
        Ok(format!("{};", statement))
    } else {
        Ok(format!("{} LIMIT {};", statement, row_limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_rejected(sql: &str) {
        match guard(sql, 1000) {
            Err(Error::UnsafeQuery(_)) => {}
            other => panic!("expected rejection for {:?}, got {:?}", sql, other),
        }
    }

    #[test]
    fn test_appends_limit() {
        assert_eq!(
            guard("SELECT name FROM employees", 1000).unwrap(),
            "SELECT name FROM employees LIMIT 1000;"
        );
    }

    #[test]
    fn test_keeps_existing_limit() {
        assert_eq!(
            guard("SELECT name FROM employees LIMIT 10;", 1000).unwrap(),
            "SELECT name FROM employees LIMIT 10;"
        );
        assert_eq!(
            guard("SELECT name FROM employees LIMIT 5000", 1000).unwrap(),
            "SELECT name FROM employees LIMIT 5000;"
        );
    }

    #[test]
    fn test_limit_detection_ignores_identifiers_and_subqueries() {
        assert_eq!(
            guard("SELECT credit_limit FROM accounts", 50).unwrap(),
            "SELECT credit_limit FROM accounts LIMIT 50;"
        );
        assert_eq!(
            guard(
                "SELECT * FROM t WHERE id IN (SELECT id FROM u ORDER BY id LIMIT 3)",
                50
            )
            .unwrap(),
            "SELECT * FROM t WHERE id IN (SELECT id FROM u ORDER BY id LIMIT 3) LIMIT 50;"
        );
    }

    #[test]
    fn test_strips_fences_tags_and_leading_prose() {
        assert_eq!(
            guard("```sql\nSELECT id FROM t;\n```", 10).unwrap(),
            "SELECT id FROM t LIMIT 10;"
        );
        assert_eq!(
            guard("sql SELECT id FROM t", 10).unwrap(),
            "SELECT id FROM t LIMIT 10;"
        );
        assert_eq!(
            guard("Answer: select id from t;;", 10).unwrap(),
            "select id from t LIMIT 10;"
        );
        assert_eq!(
            guard("`SELECT id FROM t`", 10).unwrap(),
            "SELECT id FROM t LIMIT 10;"
        );
    }

    #[test]
    fn test_rejects_stacked_statements() {
        assert_rejected("SELECT 1; DROP TABLE x");
        assert_rejected("SELECT * FROM t; DELETE FROM t;");
    }

    #[test]
    fn test_rejects_non_queries() {
        assert_rejected("DELETE FROM employees");
        assert_rejected("UPDATE employees SET name = 'x'");
        assert_rejected("");
        assert_rejected("nothing to see here");
    }

    #[test]
    fn test_rejects_select_into_and_locking_reads() {
        assert_rejected("SELECT * INTO backup FROM employees");
        assert_rejected("SELECT * FROM employees FOR UPDATE");
    }

    #[test]
    fn test_rejects_comments() {
        assert_rejected("SELECT id FROM t -- LIMIT 1");
        assert_rejected("SELECT id /* hidden */ FROM t");
        assert_rejected("SELECT id FROM t # LIMIT 1");
        assert_rejected("SELECT id FROM t #-> x");
        assert_eq!(
            guard("SELECT id FROM t WHERE tag = '#1'", 10).unwrap(),
            "SELECT id FROM t WHERE tag = '#1' LIMIT 10;"
        );
    }

    #[test]
    fn test_keeps_quoted_identifiers() {
        assert_eq!(
            guard("SELECT id FROM `order`;", 1000).unwrap(),
            "SELECT id FROM `order` LIMIT 1000;"
        );
        assert_eq!(
            guard("SELECT `group`.name FROM `group`", 5).unwrap(),
            "SELECT `group`.name FROM `group` LIMIT 5;"
        );
        assert_eq!(
            guard("`SELECT id FROM `order``", 5).unwrap_err().stage(),
            "guard"
        );
    }

    #[test]
    fn test_accepts_mysql_the_parser_does_not_cover() {
        let sql = "SELECT d.name, GROUP_CONCAT(e.name SEPARATOR ', ') \
                   FROM employees e JOIN departments d ON e.department_id = d.id \
                   GROUP BY d.name";
        assert_eq!(guard(sql, 1000).unwrap(), format!("{} LIMIT 1000;", sql));

        let limited = format!("{} LIMIT 20", sql);
        assert_eq!(guard(&limited, 1000).unwrap(), format!("{};", limited));

        let nested = "SELECT GROUP_CONCAT(name SEPARATOR ',') FROM \
                      (SELECT name FROM employees LIMIT 3) AS t";
        assert_eq!(
            guard(nested, 1000).unwrap(),
            format!("{} LIMIT 1000;", nested)
        );
    }

    #[test]
    fn test_token_checks_still_reject_writes_and_locks() {
        let concat = "GROUP_CONCAT(name SEPARATOR ',')";
        assert_rejected(&format!("SELECT {} INTO @names FROM employees", concat));
        assert_rejected(&format!("SELECT {} FROM employees FOR UPDATE", concat));
        assert_rejected(&format!(
            "SELECT {} FROM employees LOCK IN SHARE MODE",
            concat
        ));
        assert_rejected(&format!("SELECT {} FROM employees; DROP TABLE x", concat));
        assert_rejected(&format!("SELECT {} FROM employees -- LIMIT 1", concat));
        assert_rejected(&format!("SELECT {} FROM employees # LIMIT 1", concat));
    }

    #[test]
    fn test_accepted_output_is_bounded_select() {
        let inputs = [
            "SELECT name FROM employees",
            "select COUNT(*) from orders where total_amount > 10;",
            "SELECT a FROM x UNION SELECT a FROM y",
            "SELECT name FROM employees LIMIT 10;",
        ];
        for input in inputs {
            let out = guard(input, 1000).unwrap();
            assert!(out.to_ascii_lowercase().starts_with("select"), "{}", out);
            assert!(out.to_ascii_lowercase().contains(" limit "), "{}", out);
            assert!(out.ends_with(';') && !out.ends_with(";;"), "{}", out);
        }
    }
}
