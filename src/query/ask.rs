//! Natural-language question to query result.

use serde::Serialize;
use tracing::info;

use crate::db::{ConnectionParams, QueryResult};
use crate::error::{QuillError, Result};
use crate::llm::{LlmSettings, SqlGenerator};
use crate::query::QueryExecutor;

/// Shortest accepted question, in characters.
pub const MIN_QUESTION_CHARS: usize = 3;

/// Longest accepted question, in characters.
pub const MAX_QUESTION_CHARS: usize = 1000;

/// Generated SQL together with its result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AskOutcome {
    pub sql: String,
    pub result: QueryResult,
}

/// Answers `question` against the database behind `params`.
///
/// Discovers the schema, asks `generator` for SQL, then submits that SQL
/// through the validator. Generated SQL gets no special trust. Fails with an
/// LLM error before generation when no provider key is configured.
pub async fn ask(
    generator: &dyn SqlGenerator,
    llm: &LlmSettings,
    executor: &QueryExecutor<'_>,
    params: &ConnectionParams,
    question: &str,
) -> Result<AskOutcome> {
    let length = question.chars().count();
    if !(MIN_QUESTION_CHARS..=MAX_QUESTION_CHARS).contains(&length) {
        return Err(QuillError::validation_rejected(format!(
            "Question must be between {MIN_QUESTION_CHARS} and {MAX_QUESTION_CHARS} characters"
        )));
    }

    let schema = executor.discover_schema(params).await?;
    if schema.is_empty() {
        return Err(QuillError::schema_discovery("Database schemas are required"));
    }

    llm.require_api_key()?;
    let sql = generator.generate_sql(question, &schema, llm).await?;
    let sql = sql.trim().to_string();
    info!("Generated SQL using {}: {}", llm.provider(), sql);

    let result = executor.submit(params, &sql).await?;
    Ok(AskOutcome { sql, result })
}
