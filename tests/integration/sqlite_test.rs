//! SQLite execution and schema discovery tests.

use super::{sqlite_fixture, users_fixture};
use db_quill::config::ExecutorConfig;
use db_quill::db::{ConnectionParams, Value};
use db_quill::error::QuillError;
use db_quill::query::QueryExecutor;
use pretty_assertions::assert_eq;
use serde_json::json;

#[tokio::test]
async fn test_select_users_returns_ann() {
    let (_dir, params) = users_fixture().await;
    let settings = ExecutorConfig::default();
    let executor = QueryExecutor::new(&settings);

    let result = executor.execute(&params, "select * from users").await.unwrap();

    assert_eq!(result.columns, vec!["id", "name"]);
    assert_eq!(result.row_count, 1);
    assert_eq!(result.row_count, result.rows.len());

    let mut json = serde_json::to_value(&result).unwrap();
    json.as_object_mut().unwrap().remove("executionTime");
    assert_eq!(
        json,
        json!({
            "rows": [{"id": 1, "name": "Ann"}],
            "columns": ["id", "name"],
            "rowCount": 1,
        })
    );
}

#[tokio::test]
async fn test_empty_table_has_no_columns() {
    let (_dir, params) = sqlite_fixture(&["CREATE TABLE t (x)"]).await;
    let settings = ExecutorConfig::default();
    let executor = QueryExecutor::new(&settings);

    let result = executor.execute(&params, "select * from t").await.unwrap();

    assert!(result.rows.is_empty());
    assert!(result.columns.is_empty());
    assert_eq!(result.row_count, 0);
}

#[tokio::test]
async fn test_missing_file_is_connection_error() {
    let settings = ExecutorConfig::default();
    let executor = QueryExecutor::new(&settings);
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("nope.db");
    let params = ConnectionParams::sqlite(&path);

    let error = executor.execute(&params, "select 1").await.unwrap_err();

    assert!(matches!(error, QuillError::Connection(_)));
    assert!(error.to_string().contains("nope.db"));
    assert!(!path.exists());
}

#[tokio::test]
async fn test_engine_rejection_is_execution_error() {
    let (_dir, params) = users_fixture().await;
    let settings = ExecutorConfig::default();
    let executor = QueryExecutor::new(&settings);

    let error = executor
        .execute(&params, "select * from no_such_table")
        .await
        .unwrap_err();

    assert!(matches!(error, QuillError::Execution(_)));
    assert!(error.to_string().contains("no_such_table"));
}

#[tokio::test]
async fn test_writes_fail_even_when_validation_is_bypassed() {
    let (_dir, params) = users_fixture().await;
    let settings = ExecutorConfig::default();
    let executor = QueryExecutor::new(&settings);

    let error = executor
        .execute(&params, "DELETE FROM users")
        .await
        .unwrap_err();
    assert!(matches!(error, QuillError::Execution(_)));

    let result = executor.execute(&params, "select count(*) as n from users").await.unwrap();
    assert_eq!(result.rows[0].get("n"), Some(&Value::Int(1)));
}

#[tokio::test]
async fn test_duplicate_column_names_collapse_in_rows() {
    let (_dir, params) = users_fixture().await;
    let settings = ExecutorConfig::default();
    let executor = QueryExecutor::new(&settings);

    let result = executor
        .execute(&params, "select id, name, 2 as id from users")
        .await
        .unwrap();

    assert_eq!(result.columns, vec!["id", "name"]);
    assert_eq!(result.rows[0].get("id"), Some(&Value::Int(2)));
}

#[tokio::test]
async fn test_with_query_and_submit() {
    let (_dir, params) = users_fixture().await;
    let settings = ExecutorConfig::default();
    let executor = QueryExecutor::new(&settings);

    let result = executor
        .submit(
            &params,
            "WITH named AS (SELECT name FROM users WHERE id = 1) SELECT name FROM named",
        )
        .await
        .unwrap();

    assert_eq!(result.rows[0].get("name"), Some(&Value::from("Ann")));
}

#[tokio::test]
async fn test_concurrent_reads_of_same_file() {
    let (_dir, params) = users_fixture().await;
    let settings = ExecutorConfig::default();
    let executor = QueryExecutor::new(&settings);

    let (a, b) = tokio::join!(
        executor.execute(&params, "select name from users"),
        executor.execute(&params, "select id from users"),
    );

    assert_eq!(a.unwrap().row_count, 1);
    assert_eq!(b.unwrap().row_count, 1);
}

#[tokio::test]
async fn test_schema_discovery() {
    let (_dir, params) = sqlite_fixture(&[
        "CREATE TABLE users (id INTEGER PRIMARY KEY AUTOINCREMENT, email TEXT NOT NULL, name TEXT)",
        "CREATE TABLE memberships (user_id INTEGER, group_id INTEGER, PRIMARY KEY (user_id, group_id))",
        "INSERT INTO users (email) VALUES ('ann@example.com')",
    ])
    .await;
    let settings = ExecutorConfig::default();
    let executor = QueryExecutor::new(&settings);

    let schema = executor.discover_schema(&params).await.unwrap();

    // AUTOINCREMENT creates sqlite_sequence, which must not be listed
    let mut names: Vec<&str> = schema.table_names().collect();
    names.sort_unstable();
    assert_eq!(names, vec!["memberships", "users"]);

    let users = schema.table("users").unwrap();
    let columns: Vec<&str> = users.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(columns, vec!["id", "email", "name"]);
    assert!(users.column("id").unwrap().primary_key);
    assert_eq!(users.column("id").unwrap().data_type, "INTEGER");
    assert!(!users.column("email").unwrap().nullable);
    assert!(users.column("name").unwrap().nullable);

    // Only the first key position is flagged
    let memberships = schema.table("memberships").unwrap();
    assert_eq!(memberships.primary_key(), vec!["user_id"]);

    let json = serde_json::to_value(&schema).unwrap();
    assert_eq!(
        json["users"][1],
        json!({"name": "email", "type": "TEXT", "nullable": false, "primaryKey": false})
    );
}

#[tokio::test]
async fn test_schema_discovery_on_empty_database() {
    let (_dir, params) = sqlite_fixture(&[]).await;
    let settings = ExecutorConfig::default();
    let executor = QueryExecutor::new(&settings);

    let schema = executor.discover_schema(&params).await.unwrap();
    assert!(schema.is_empty());
}

#[tokio::test]
async fn test_connection_probe() {
    let (_dir, params) = users_fixture().await;
    let settings = ExecutorConfig::default();
    let executor = QueryExecutor::new(&settings);

    executor.test_connection(&params).await.unwrap();

    let missing = ConnectionParams::sqlite("/nonexistent/quill/probe.db");
    let error = executor.test_connection(&missing).await.unwrap_err();
    assert!(matches!(error, QuillError::Connection(_)));
}
