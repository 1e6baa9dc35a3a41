//! Text-level SQL safety checks.
//!
//! Works on the literal query text only: no schema, no parsing, no database.
//! The normalized form is used for analysis and never for execution.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::Rejection;

/// Substrings that disqualify a query wherever they appear.
pub const DENIED_KEYWORDS: &[&str] = &[
    "drop", "delete", "insert", "update", "alter", "create", "truncate", "exec", "execute", "sp_",
    "xp_", "pragma", "attach", "detach",
];

/// Prefixes a normalized query must start with.
const ALLOWED_PREFIXES: &[&str] = &["select", "with"];

/// A `--` comment runs until any line terminator, `\r` and U+2028/U+2029 included.
static LINE_COMMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"--[^\n\r\x{2028}\x{2029}]*").expect("line comment pattern is valid")
});

static BLOCK_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("block comment pattern is valid"));

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Normalizes query text for safety analysis.
///
/// Line comments are stripped before block comments, so a `--` inside a
/// block comment swallows the rest of its line, closing marker included.
pub fn normalize(query: &str) -> String {
    let without_line_comments = LINE_COMMENT.replace_all(query, "");
    let without_comments = BLOCK_COMMENT.replace_all(&without_line_comments, "");
    WHITESPACE
        .replace_all(&without_comments, " ")
        .trim()
        .to_lowercase()
}

/// Runs every rule against the query, returning the first rejection.
pub fn check_query(query: &str) -> Result<(), Rejection> {
    if query.is_empty() {
        return Err(Rejection::Empty);
    }

    let normalized = normalize(query);

    if let Some(keyword) = DENIED_KEYWORDS
        .iter()
        .find(|keyword| normalized.contains(*keyword))
    {
        return Err(Rejection::DeniedKeyword(*keyword));
    }

    if !ALLOWED_PREFIXES
        .iter()
        .any(|prefix| normalized.starts_with(prefix))
    {
        return Err(Rejection::NotReadOnly);
    }

    check_parentheses(&normalized)
}

/// Returns true if the query may be executed against a read-only connection.
pub fn validate_query(query: &str) -> bool {
    match check_query(query) {
        Ok(()) => true,
        Err(rejection) => {
            debug!("Query rejected ({rejection})");
            false
        }
    }
}

fn check_parentheses(normalized: &str) -> Result<(), Rejection> {
    let mut depth: i64 = 0;
    for ch in normalized.chars() {
        match ch {
            '(' => depth += 1,
            ')' => depth -= 1,
            _ => {}
        }
        if depth < 0 {
            return Err(Rejection::UnbalancedParentheses);
        }
    }

    if depth == 0 {
        Ok(())
    } else {
        Err(Rejection::UnbalancedParentheses)
    }
}
