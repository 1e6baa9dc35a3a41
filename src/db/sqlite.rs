//! SQLite database client implementation.
//!
//! Provides the `SqliteClient` struct that implements the `DatabaseClient`
//! trait for embedded database files using sqlx. Files are always opened
//! read-only and never created.

use crate::db::{
    Column, DatabaseBackend, DatabaseClient, QueryResult, Row, Schema, SqliteParams, Table, Value,
};
use crate::error::{QuillError, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{Column as SqlxColumn, ConnectOptions, Connection, Row as SqlxRow, TypeInfo, ValueRef};
use std::path::PathBuf;
use std::time::Instant;
use tracing::debug;

/// Lists user tables, skipping SQLite's internal ones.
const TABLES_QUERY: &str =
    "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'";

/// SQLite database client holding a single read-only connection.
pub struct SqliteClient {
    conn: SqliteConnection,
    path: PathBuf,
}

impl SqliteClient {
    /// Opens the database file read-only.
    ///
    /// A missing file is a connection error; it is never created.
    pub async fn connect(params: &SqliteParams) -> Result<Self> {
        let path = &params.file_path;

        match tokio::fs::metadata(path).await {
            Ok(metadata) if metadata.is_file() => {}
            _ => {
                return Err(QuillError::connection(format!(
                    "Database file not found: {}",
                    path.display()
                )))
            }
        }

        let conn = SqliteConnectOptions::new()
            .filename(path)
            .read_only(true)
            .create_if_missing(false)
            .connect()
            .await
            .map_err(|e| QuillError::connection(format!("Failed to open SQLite database: {e}")))?;

        debug!("Opened {} read-only", path.display());

        Ok(Self {
            conn,
            path: path.clone(),
        })
    }

    /// Reads `PRAGMA table_info` for one table.
    async fn fetch_columns(&mut self, table_name: &str) -> sqlx::Result<Vec<Column>> {
        let query = format!("PRAGMA table_info(\"{}\")", table_name.replace('"', "\"\""));
        let rows = sqlx::query(&query).fetch_all(&mut self.conn).await?;

        rows.iter()
            .map(|row| -> sqlx::Result<Column> {
                let name: String = row.try_get("name")?;
                let data_type: String = row.try_get("type")?;
                Ok(Column::new(name, data_type)
                    .nullable(row.try_get::<i64, _>("notnull")? == 0)
                    // Only the first key position counts; composite keys are not modeled.
                    .primary_key(row.try_get::<i64, _>("pk")? == 1))
            })
            .collect()
    }
}

#[async_trait]
impl DatabaseClient for SqliteClient {
    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::Sqlite
    }

    async fn introspect_schema(&mut self) -> Result<Schema> {
        let table_names: Vec<String> = sqlx::query_scalar(TABLES_QUERY)
            .fetch_all(&mut self.conn)
            .await
            .map_err(|e| QuillError::schema_discovery(format!("Failed to get table names: {e}")))?;

        let mut tables = Vec::with_capacity(table_names.len());

        for name in table_names {
            let lookup = self.fetch_columns(&name).await;
            tables.push(Table::from_lookup(name, lookup));
        }

        Ok(Schema { tables })
    }

    async fn execute_query(&mut self, sql: &str) -> Result<QueryResult> {
        let start = Instant::now();

        let rows = sqlx::query(sql)
            .fetch_all(&mut self.conn)
            .await
            .map_err(|e| QuillError::execution(format!("Query execution failed: {e}")))?;

        let rows: Vec<Row> = rows.iter().map(convert_row).collect();

        // Column names come from the first row, so an empty result has none.
        Ok(QueryResult::from_rows(rows).with_execution_time(start.elapsed()))
    }

    async fn ping(&mut self) -> Result<()> {
        let test: i64 = sqlx::query_scalar("SELECT 1 AS test")
            .fetch_one(&mut self.conn)
            .await
            .map_err(|e| QuillError::connection(format!("Connection test failed: {e}")))?;

        if test == 1 {
            Ok(())
        } else {
            Err(QuillError::connection(format!(
                "Connection test returned {test}, expected 1"
            )))
        }
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let Self { conn, path } = *self;
        conn.close().await.map_err(|e| {
            QuillError::connection(format!("Failed to close {}: {e}", path.display()))
        })?;
        debug!("Closed {}", path.display());
        Ok(())
    }
}

/// Converts a sqlx SqliteRow to our Row type.
fn convert_row(row: &SqliteRow) -> Row {
    row.columns()
        .iter()
        .map(|col| (col.name(), convert_value(row, col.ordinal())))
        .collect()
}

/// Converts a single cell using the value's storage class rather than the
/// declared column type.
fn convert_value(row: &SqliteRow, index: usize) -> Value {
    let storage_class = match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(raw) => raw.type_info().name().to_uppercase(),
        Err(_) => return Value::Null,
    };

    let decoded = match storage_class.as_str() {
        "INTEGER" => row.try_get::<i64, _>(index).map(Value::Int),
        "REAL" => row.try_get::<f64, _>(index).map(Value::Float),
        "BLOB" => row.try_get::<Vec<u8>, _>(index).map(Value::Bytes),
        _ => row.try_get::<String, _>(index).map(Value::String),
    };

    decoded.unwrap_or_else(|e| {
        debug!("Could not decode {storage_class} column {index}: {e}");
        Value::Null
    })
}
