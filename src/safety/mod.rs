//! Query safety validation.
//!
//! Decides, from the query text alone, whether a SQL string may reach a
//! read-only database connection. The same check backs both the submission
//! path and the validate-only diagnostic.

mod validator;

pub use validator::{check_query, normalize, validate_query, DENIED_KEYWORDS};

use serde::Serialize;
use std::fmt;

/// Message reported when a query passes validation.
pub const VALID_MESSAGE: &str = "Query is valid";

/// Message reported when a query fails validation.
pub const INVALID_MESSAGE: &str = "Query is invalid or unsafe";

/// Why a query was rejected.
///
/// Only used for diagnostics; callers see a plain verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rejection {
    /// The query text was empty.
    Empty,
    /// The normalized text contains a denied keyword.
    DeniedKeyword(&'static str),
    /// The normalized text does not start with `select` or `with`.
    NotReadOnly,
    /// Parentheses are not balanced.
    UnbalancedParentheses,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty query"),
            Self::DeniedKeyword(keyword) => write!(f, "contains denied keyword '{keyword}'"),
            Self::NotReadOnly => write!(f, "does not start with SELECT or WITH"),
            Self::UnbalancedParentheses => write!(f, "unbalanced parentheses"),
        }
    }
}

/// Outcome of the validate-only diagnostic path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// Whether the query passed validation.
    pub valid: bool,
    /// Human-readable verdict.
    pub message: String,
}

/// Validates a query without executing it.
pub fn validation_report(query: &str) -> ValidationReport {
    let valid = validate_query(query);
    ValidationReport {
        valid,
        message: if valid { VALID_MESSAGE } else { INVALID_MESSAGE }.to_string(),
    }
}
