//! Deterministic SQL generator for testing.
//!
//! Returns canned SQL based on input patterns, without network access.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::db::Schema;
use crate::error::{QuillError, Result};
use crate::llm::{LlmSettings, SqlGenerator};

/// Generator that answers from a list of (pattern, SQL) pairs.
///
/// Patterns are matched case-insensitively against the question; the first
/// match wins.
#[derive(Debug, Default)]
pub struct StaticSqlGenerator {
    responses: Vec<(String, String)>,
    calls: AtomicUsize,
}

impl StaticSqlGenerator {
    /// Creates a generator with no responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a response mapping.
    ///
    /// When the question contains `pattern`, the generator returns `sql`.
    pub fn with_response(mut self, pattern: impl Into<String>, sql: impl Into<String>) -> Self {
        self.responses.push((pattern.into().to_lowercase(), sql.into()));
        self
    }

    /// Number of times the generator has been asked for SQL.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SqlGenerator for StaticSqlGenerator {
    async fn generate_sql(
        &self,
        question: &str,
        _schema: &Schema,
        _settings: &LlmSettings,
    ) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let question = question.to_lowercase();
        self.responses
            .iter()
            .find(|(pattern, _)| question.contains(pattern.as_str()))
            .map(|(_, sql)| sql.clone())
            .ok_or_else(|| QuillError::llm("Failed to generate SQL query"))
    }
}
