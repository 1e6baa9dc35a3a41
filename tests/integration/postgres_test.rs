//! PostgreSQL execution and schema discovery tests.
//!
//! Skipped unless DATABASE_URL points at a reachable server.

use db_quill::config::{ConnectionConfig, ExecutorConfig};
use db_quill::db::{ConnectionParams, PostgresParams, Value};
use db_quill::error::QuillError;
use db_quill::query::QueryExecutor;
use std::collections::HashSet;

/// Helper to get test connection parameters from the environment.
fn get_test_params() -> Option<ConnectionParams> {
    let url = std::env::var("DATABASE_URL").ok()?;
    ConnectionConfig::from_connection_string(&url)
        .ok()?
        .to_params()
        .ok()
}

#[tokio::test]
async fn test_empty_result_keeps_columns() {
    let Some(params) = get_test_params() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let settings = ExecutorConfig::default();
    let executor = QueryExecutor::new(&settings);

    let result = executor
        .submit(&params, "SELECT 1 AS id, 'x' AS name WHERE 1 = 0")
        .await
        .unwrap();

    assert_eq!(result.columns, vec!["id", "name"]);
    assert!(result.rows.is_empty());
    assert_eq!(result.row_count, 0);
}

#[tokio::test]
async fn test_value_decoding() {
    let Some(params) = get_test_params() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let settings = ExecutorConfig::default();
    let executor = QueryExecutor::new(&settings);

    let result = executor
        .execute(
            &params,
            "SELECT true AS flag, 42::int8 AS big, 1.5::float8 AS ratio, \
             12.30::numeric AS price, '{\"a\": 1}'::jsonb AS doc, NULL::text AS missing, \
             DATE '2024-01-02' AS day",
        )
        .await
        .unwrap();

    let row = &result.rows[0];
    assert_eq!(row.get("flag"), Some(&Value::Bool(true)));
    assert_eq!(row.get("big"), Some(&Value::Int(42)));
    assert_eq!(row.get("ratio"), Some(&Value::Float(1.5)));
    assert_eq!(row.get("price"), Some(&Value::from("12.30")));
    assert_eq!(row.get("doc"), Some(&Value::Json(serde_json::json!({"a": 1}))));
    assert_eq!(row.get("missing"), Some(&Value::Null));
    assert_eq!(row.get("day"), Some(&Value::from("2024-01-02")));
}

#[tokio::test]
async fn test_statement_timeout() {
    let Some(params) = get_test_params() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let settings = ExecutorConfig {
        statement_timeout_secs: 1,
        ..ExecutorConfig::default()
    };
    let executor = QueryExecutor::new(&settings);

    let error = executor
        .execute(&params, "SELECT pg_sleep(5)")
        .await
        .unwrap_err();

    assert!(matches!(error, QuillError::Execution(_)));
    assert!(error.to_string().contains("statement timeout"));
}

#[tokio::test]
async fn test_writes_fail_even_when_validation_is_bypassed() {
    let Some(params) = get_test_params() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let settings = ExecutorConfig::default();
    let executor = QueryExecutor::new(&settings);

    for sql in [
        "CREATE TABLE quill_write_attempt (id int)",
        "WITH gone AS (DELETE FROM pg_class WHERE false RETURNING 1) SELECT * FROM gone",
    ] {
        let error = executor.execute(&params, sql).await.unwrap_err();
        assert!(matches!(error, QuillError::Execution(_)), "{sql}");
        assert!(error.to_string().contains("read-only transaction"), "{sql}");
    }
}

#[tokio::test]
async fn test_comment_ended_by_carriage_return_is_rejected() {
    let Some(params) = get_test_params() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let settings = ExecutorConfig::default();
    let executor = QueryExecutor::new(&settings);

    let sql = "WITH x AS (SELECT 1) --\r, y AS (DELETE FROM pg_class WHERE false RETURNING 1) \
               SELECT * FROM y";
    let error = executor.submit(&params, sql).await.unwrap_err();

    assert!(matches!(error, QuillError::ValidationRejected(_)));
}

#[tokio::test]
async fn test_schema_discovery_groups_by_table() {
    let Some(params) = get_test_params() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let settings = ExecutorConfig::default();
    let executor = QueryExecutor::new(&settings);

    let schema = executor.discover_schema(&params).await.unwrap();

    let names: Vec<&str> = schema.table_names().collect();
    let unique: HashSet<&str> = names.iter().copied().collect();
    assert_eq!(names.len(), unique.len(), "each table must appear once");
    for table in &schema.tables {
        assert!(!table.columns.is_empty(), "{} has no columns", table.name);
    }
}

#[tokio::test]
async fn test_connection_probe() {
    let Some(params) = get_test_params() else {
        eprintln!("Skipping test: DATABASE_URL not set");
        return;
    };
    let settings = ExecutorConfig::default();
    let executor = QueryExecutor::new(&settings);

    executor.test_connection(&params).await.unwrap();
}

#[tokio::test]
async fn test_refused_connection_is_connection_error() {
    let settings = ExecutorConfig {
        connect_timeout_secs: 3,
        ..ExecutorConfig::default()
    };
    let executor = QueryExecutor::new(&settings);
    let params = ConnectionParams::Postgres(
        PostgresParams::new("127.0.0.1", "quill", "reader", "secret").with_port(1),
    );

    let error = executor.execute(&params, "SELECT 1").await.unwrap_err();

    assert!(matches!(error, QuillError::Connection(_)));
    assert!(!error.to_string().contains("secret"));
}
