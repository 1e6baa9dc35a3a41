//! PostgreSQL database client implementation.
//!
//! Provides the `PostgresClient` struct that implements the `DatabaseClient` trait
//! for PostgreSQL databases using sqlx. Each client owns one dedicated
//! connection carrying a server-side statement timeout.

use crate::config::ExecutorConfig;
use crate::db::{
    Column, DatabaseBackend, DatabaseClient, PostgresParams, QueryResult, Row, Schema, Table,
    Value,
};
use crate::error::{QuillError, Result};
use async_trait::async_trait;
use serde::Serialize;
use sqlx::postgres::types::{Oid, PgInterval, PgMoney, PgTimeTz};
use sqlx::postgres::{PgConnectOptions, PgConnection, PgRow, PgSslMode, Postgres};
use sqlx::types::chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::types::ipnetwork::IpNetwork;
use sqlx::types::{Decimal, JsonValue, Uuid};
use sqlx::{
    Column as SqlxColumn, ConnectOptions, Connection, Decode, Executor, Row as SqlxRow, Statement,
    Type, TypeInfo, ValueRef,
};
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Extra time the client waits past the server-side statement timeout, so
/// the server's cancellation is the error that surfaces.
const CLIENT_TIMEOUT_MARGIN: Duration = Duration::from_secs(1);

/// Every column of every table in the default schema, in catalog order.
const COLUMNS_QUERY: &str = r#"
    SELECT
        table_name::text,
        column_name::text,
        data_type::text,
        is_nullable::text
    FROM information_schema.columns
    WHERE table_schema = 'public'
    ORDER BY table_name, ordinal_position
"#;

/// Primary key members of every table in the default schema.
const PRIMARY_KEYS_QUERY: &str = r#"
    SELECT
        kcu.table_name::text,
        kcu.column_name::text
    FROM information_schema.table_constraints tc
    JOIN information_schema.key_column_usage kcu
        ON tc.constraint_name = kcu.constraint_name
        AND tc.table_schema = kcu.table_schema
        AND tc.table_name = kcu.table_name
    WHERE tc.table_schema = 'public'
        AND tc.constraint_type = 'PRIMARY KEY'
"#;

/// PostgreSQL database client.
pub struct PostgresClient {
    conn: PgConnection,
    statement_timeout: Duration,
}

impl PostgresClient {
    /// Opens a dedicated connection.
    ///
    /// Establishment is bounded by `connect_timeout`; every statement on the
    /// connection is bounded by `statement_timeout`. The session defaults to
    /// read-only transactions, so writes fail even if validation is skipped.
    /// No retries are made.
    pub async fn connect(params: &PostgresParams, settings: &ExecutorConfig) -> Result<Self> {
        let statement_timeout = settings.statement_timeout();
        let connect_timeout = settings.connect_timeout();

        let options = PgConnectOptions::new()
            .host(&params.host)
            .port(params.port)
            .database(&params.database)
            .username(&params.user)
            .password(&params.password)
            .ssl_mode(PgSslMode::Prefer)
            .options([
                (
                    "statement_timeout",
                    statement_timeout.as_millis().to_string(),
                ),
                ("default_transaction_read_only", "on".to_string()),
            ]);

        debug!(
            "Connecting to {}:{}/{}",
            params.host, params.port, params.database
        );

        let conn = tokio::time::timeout(connect_timeout, options.connect())
            .await
            .map_err(|_| {
                QuillError::connection(format!(
                    "Connection to {}:{} timed out after {} seconds",
                    params.host,
                    params.port,
                    connect_timeout.as_secs()
                ))
            })?
            .map_err(|e| map_connection_error(e, params))?;

        Ok(Self {
            conn,
            statement_timeout,
        })
    }

    /// Fetches every (table, column) pair flagged as a primary key member.
    async fn fetch_primary_keys(&mut self) -> sqlx::Result<HashSet<(String, String)>> {
        let rows: Vec<(String, String)> = sqlx::query_as(PRIMARY_KEYS_QUERY)
            .fetch_all(&mut self.conn)
            .await?;
        Ok(rows.into_iter().collect())
    }
}

#[async_trait]
impl DatabaseClient for PostgresClient {
    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::Postgres
    }

    async fn introspect_schema(&mut self) -> Result<Schema> {
        let rows: Vec<(String, String, String, String)> = sqlx::query_as(COLUMNS_QUERY)
            .fetch_all(&mut self.conn)
            .await
            .map_err(|e| {
                QuillError::schema_discovery(format!(
                    "PostgreSQL schema retrieval failed: {}",
                    format_query_error(e)
                ))
            })?;

        let primary_keys = primary_keys_or_empty(self.fetch_primary_keys().await);

        Ok(group_columns(rows, &primary_keys))
    }

    async fn execute_query(&mut self, sql: &str) -> Result<QueryResult> {
        let start = Instant::now();
        let conn = &mut self.conn;

        // Use a client-side timeout as well, in case the server never answers
        let deadline = client_deadline(self.statement_timeout);
        let (columns, rows) = tokio::time::timeout(deadline, async {
            let statement = (&mut *conn).prepare(sql).await?;
            let columns: Vec<String> = statement
                .columns()
                .iter()
                .map(|col| col.name().to_string())
                .collect();
            let rows = statement.query().fetch_all(&mut *conn).await?;
            Ok::<_, sqlx::Error>((columns, rows))
        })
        .await
        .map_err(|_| {
            QuillError::execution(format!(
                "Query timed out after {} seconds",
                self.statement_timeout.as_secs()
            ))
        })?
        .map_err(|e| {
            QuillError::execution(format!(
                "PostgreSQL query execution failed: {}",
                format_query_error(e)
            ))
        })?;

        let rows: Vec<Row> = rows.iter().map(convert_row).collect();

        // Columns come from statement metadata, so they survive an empty result.
        Ok(QueryResult::with_data(columns, rows).with_execution_time(start.elapsed()))
    }

    async fn ping(&mut self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&mut self.conn)
            .await
            .map_err(|e| QuillError::connection(format!("Connection test failed: {e}")))?;
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        let Self { conn, .. } = *self;
        conn.close()
            .await
            .map_err(|e| QuillError::connection(format!("Failed to close connection: {e}")))?;
        debug!("Closed PostgreSQL connection");
        Ok(())
    }
}

/// Client-side backstop for a statement bounded server-side by `statement_timeout`.
fn client_deadline(statement_timeout: Duration) -> Duration {
    statement_timeout + CLIENT_TIMEOUT_MARGIN
}

/// Falls back to no primary keys when the constraint lookup fails.
fn primary_keys_or_empty(
    lookup: sqlx::Result<HashSet<(String, String)>>,
) -> HashSet<(String, String)> {
    lookup.unwrap_or_else(|e| {
        warn!("Could not read primary keys, continuing without them: {e}");
        HashSet::new()
    })
}

/// Groups catalog rows (already sorted by table) into tables.
fn group_columns(
    rows: Vec<(String, String, String, String)>,
    primary_keys: &HashSet<(String, String)>,
) -> Schema {
    let mut tables: Vec<Table> = Vec::new();

    for (table_name, column_name, data_type, is_nullable) in rows {
        let primary_key = primary_keys.contains(&(table_name.clone(), column_name.clone()));
        let column = Column::new(column_name, data_type)
            .nullable(is_nullable == "YES")
            .primary_key(primary_key);

        match tables.last_mut() {
            Some(table) if table.name == table_name => table.columns.push(column),
            _ => tables.push(Table {
                name: table_name,
                columns: vec![column],
            }),
        }
    }

    Schema { tables }
}

/// Converts a sqlx PgRow to our Row type.
fn convert_row(row: &PgRow) -> Row {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| (col.name(), convert_value(row, i, col.type_info().name())))
        .collect()
}

/// Decodes a nullable cell, treating decode failures as NULL.
fn decode<'r, T>(row: &'r PgRow, index: usize) -> Option<T>
where
    T: Decode<'r, Postgres> + Type<Postgres>,
{
    row.try_get::<Option<T>, _>(index).ok().flatten()
}

/// Decodes a one-dimensional array into a JSON list, keeping NULL elements.
fn decode_array<'r, T>(row: &'r PgRow, index: usize) -> Option<Value>
where
    Vec<Option<T>>: Decode<'r, Postgres> + Type<Postgres>,
    T: Serialize,
{
    let elements = decode::<Vec<Option<T>>>(row, index)?;
    serde_json::to_value(elements).ok().map(Value::Json)
}

/// Converts a single column value from a PgRow to our Value type.
fn convert_value(row: &PgRow, index: usize, type_name: &str) -> Value {
    if matches!(row.try_get_raw(index), Ok(raw) if raw.is_null()) {
        return Value::Null;
    }

    let value = match type_name.to_uppercase().as_str() {
        "BOOL" | "BOOLEAN" => decode::<bool>(row, index).map(Value::Bool),
        "INT2" | "SMALLINT" => decode::<i16>(row, index).map(|v| Value::Int(v as i64)),
        "INT4" | "INT" | "INTEGER" => decode::<i32>(row, index).map(|v| Value::Int(v as i64)),
        "INT8" | "BIGINT" => decode::<i64>(row, index).map(Value::Int),
        "FLOAT4" | "REAL" => decode::<f32>(row, index).map(|v| Value::Float(v as f64)),
        "FLOAT8" | "DOUBLE PRECISION" => decode::<f64>(row, index).map(Value::Float),
        // The driver hands NUMERIC back as text to avoid precision loss
        "NUMERIC" => decode::<Decimal>(row, index).map(|v| Value::String(v.to_string())),
        "BYTEA" => decode::<Vec<u8>>(row, index).map(Value::Bytes),
        "JSON" | "JSONB" => decode::<JsonValue>(row, index).map(Value::Json),
        "UUID" => decode::<Uuid>(row, index).map(|v| Value::String(v.to_string())),
        "TIMESTAMPTZ" => {
            decode::<DateTime<Utc>>(row, index).map(|v| Value::String(v.to_rfc3339()))
        }
        "TIMESTAMP" => decode::<NaiveDateTime>(row, index).map(|v| Value::String(v.to_string())),
        "DATE" => decode::<NaiveDate>(row, index).map(|v| Value::String(v.to_string())),
        "TIME" => decode::<NaiveTime>(row, index).map(|v| Value::String(v.to_string())),
        "TIMETZ" => decode::<PgTimeTz<NaiveTime, FixedOffset>>(row, index)
            .map(|v| Value::String(format!("{}{}", v.time, v.offset))),
        "INTERVAL" => decode::<PgInterval>(row, index).map(|v| Value::String(format_interval(&v))),
        "OID" => decode::<Oid>(row, index).map(|v| Value::Int(i64::from(v.0))),
        "MONEY" => decode::<PgMoney>(row, index).map(|v| Value::String(v.to_decimal(2).to_string())),
        "INET" => decode::<IpNetwork>(row, index).map(|v| Value::String(format_network(v, false))),
        "CIDR" => decode::<IpNetwork>(row, index).map(|v| Value::String(format_network(v, true))),
        // The single-byte internal "char" type
        "\"CHAR\"" => decode::<i8>(row, index).map(|v| Value::String((v as u8 as char).to_string())),

        "BOOL[]" => decode_array::<bool>(row, index),
        "INT2[]" => decode_array::<i16>(row, index),
        "INT4[]" => decode_array::<i32>(row, index),
        "INT8[]" => decode_array::<i64>(row, index),
        "FLOAT4[]" => decode_array::<f32>(row, index),
        "FLOAT8[]" => decode_array::<f64>(row, index),
        "TEXT[]" | "VARCHAR[]" | "CHAR[]" | "NAME[]" => decode_array::<String>(row, index),

        // For all other types, try to get as string
        _ => decode::<String>(row, index).map(Value::String),
    };

    value.unwrap_or_else(|| {
        warn!("Could not decode {type_name} column {index}, returning NULL");
        Value::Null
    })
}

/// Renders an interval the way the server's default output style does,
/// e.g. `1 year 2 mons 3 days 04:05:06.5`.
fn format_interval(interval: &PgInterval) -> String {
    let years = i64::from(interval.months / 12);
    let months = i64::from(interval.months % 12);
    let days = i64::from(interval.days);

    let mut parts: Vec<String> = [(years, "year"), (months, "mon"), (days, "day")]
        .into_iter()
        .filter(|(count, _)| *count != 0)
        .map(|(count, unit)| {
            let plural = if count.abs() == 1 { "" } else { "s" };
            format!("{count} {unit}{plural}")
        })
        .collect();

    if interval.microseconds != 0 || parts.is_empty() {
        let sign = if interval.microseconds < 0 { "-" } else { "" };
        let micros = interval.microseconds.unsigned_abs();
        let seconds = micros / 1_000_000;
        let mut time = format!(
            "{sign}{:02}:{:02}:{:02}",
            seconds / 3600,
            seconds / 60 % 60,
            seconds % 60
        );
        let fraction = micros % 1_000_000;
        if fraction != 0 {
            let digits = format!("{fraction:06}");
            time.push('.');
            time.push_str(digits.trim_end_matches('0'));
        }
        parts.push(time);
    }

    parts.join(" ")
}

/// Renders an address. `inet` host addresses drop the full-length prefix.
fn format_network(network: IpNetwork, always_prefix: bool) -> String {
    let full_prefix = match network {
        IpNetwork::V4(_) => 32,
        IpNetwork::V6(_) => 128,
    };
    if !always_prefix && network.prefix() == full_prefix {
        network.ip().to_string()
    } else {
        network.to_string()
    }
}

/// Maps sqlx connection errors to user-friendly messages.
fn map_connection_error(error: sqlx::Error, params: &PostgresParams) -> QuillError {
    let host = &params.host;
    let port = params.port;
    let user = &params.user;
    let database = &params.database;

    let error_str = error.to_string().to_lowercase();

    if error_str.contains("connection refused") || error_str.contains("could not connect") {
        QuillError::connection(format!(
            "Cannot connect to {host}:{port}. Check that the server is running."
        ))
    } else if error_str.contains("password authentication failed")
        || error_str.contains("authentication failed")
    {
        QuillError::connection(format!(
            "Authentication failed for user '{user}'. Check your credentials."
        ))
    } else if error_str.contains("does not exist") && error_str.contains("database") {
        QuillError::connection(format!("Database '{database}' does not exist."))
    } else if error_str.contains("timed out") || error_str.contains("timeout") {
        QuillError::connection(format!(
            "Connection to {host}:{port} timed out. The server may be overloaded or unreachable."
        ))
    } else {
        QuillError::connection(format!("PostgreSQL connection failed: {error}"))
    }
}

/// Formats a query error with detail and hint if available.
fn format_query_error(error: sqlx::Error) -> String {
    let Some(db_error) = error.as_database_error() else {
        return error.to_string();
    };

    let mut result = String::from(db_error.message());

    if let Some(pg_error) = db_error.try_downcast_ref::<sqlx::postgres::PgDatabaseError>() {
        if let Some(detail) = pg_error.detail() {
            result.push_str("\n  DETAIL: ");
            result.push_str(detail);
        }

        if let Some(hint) = pg_error.hint() {
            result.push_str("\n  HINT: ");
            result.push_str(hint);
        }
    }

    result
}
