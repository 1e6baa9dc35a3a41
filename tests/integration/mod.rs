//! Integration tests for Quill.

pub mod postgres_test;
pub mod sqlite_test;
pub mod validator_test;

use db_quill::db::ConnectionParams;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{ConnectOptions, Connection};
use tempfile::TempDir;

/// Creates a SQLite file populated by `statements`.
///
/// Keep the returned directory alive for as long as the file is used.
pub async fn sqlite_fixture(statements: &[&str]) -> (TempDir, ConnectionParams) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fixture.db");

    let mut conn = SqliteConnectOptions::new()
        .filename(&path)
        .create_if_missing(true)
        .connect()
        .await
        .unwrap();
    for statement in statements {
        sqlx::query(statement).execute(&mut conn).await.unwrap();
    }
    conn.close().await.unwrap();

    (dir, ConnectionParams::sqlite(path))
}

/// The `users(id, name)` fixture with a single row for Ann.
pub async fn users_fixture() -> (TempDir, ConnectionParams) {
    sqlite_fixture(&[
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)",
        "INSERT INTO users (id, name) VALUES (1, 'Ann')",
    ])
    .await
}
