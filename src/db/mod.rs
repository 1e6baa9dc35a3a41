//! Database abstraction layer for Quill.
//!
//! Provides a trait-based interface over the two supported engines: an
//! embedded SQLite file opened read-only, and a networked PostgreSQL server.
//! Every client is short-lived: opened for one operation, then closed.

mod postgres;
mod schema;
mod sqlite;
mod types;

pub use postgres::PostgresClient;
pub use schema::{Column, Schema, Table};
pub use sqlite::SqliteClient;
pub use types::{QueryResult, Row, Value};

use crate::config::ExecutorConfig;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Supported database backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    /// Embedded file database.
    #[default]
    Sqlite,
    /// Networked relational database.
    Postgres,
}

impl DatabaseBackend {
    /// Returns the backend as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Postgres => "postgres",
        }
    }

    /// Parses a backend from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sqlite" | "sqlite3" => Some(Self::Sqlite),
            "postgres" | "postgresql" => Some(Self::Postgres),
            _ => None,
        }
    }
}

impl fmt::Display for DatabaseBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default PostgreSQL port.
pub const DEFAULT_POSTGRES_PORT: u16 = 5432;

/// Parameters for the embedded backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteParams {
    /// Path to the database file. The file must already exist.
    pub file_path: PathBuf,
}

/// Parameters for the networked backend.
#[derive(Clone, PartialEq, Eq)]
pub struct PostgresParams {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
}

impl PostgresParams {
    /// Creates parameters on the default port.
    pub fn new(
        host: impl Into<String>,
        database: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_POSTGRES_PORT,
            database: database.into(),
            user: user.into(),
            password: password.into(),
        }
    }

    /// Sets the port.
    pub fn with_port(self, port: u16) -> Self {
        Self { port, ..self }
    }
}

impl fmt::Debug for PostgresParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Connection parameters, one variant per backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionParams {
    Sqlite(SqliteParams),
    Postgres(PostgresParams),
}

impl ConnectionParams {
    /// Parameters for an embedded database file.
    pub fn sqlite(file_path: impl Into<PathBuf>) -> Self {
        Self::Sqlite(SqliteParams {
            file_path: file_path.into(),
        })
    }

    /// Returns the backend these parameters target.
    pub fn backend(&self) -> DatabaseBackend {
        match self {
            Self::Sqlite(_) => DatabaseBackend::Sqlite,
            Self::Postgres(_) => DatabaseBackend::Postgres,
        }
    }

    /// Returns a display-safe string (no password) for logs and UI.
    pub fn display_string(&self) -> String {
        match self {
            Self::Sqlite(params) => format!("sqlite:{}", params.file_path.display()),
            Self::Postgres(params) => format!(
                "{} @ {}:{} as {}",
                params.database, params.host, params.port, params.user
            ),
        }
    }
}

/// Opens a client for the given parameters.
///
/// This is the central factory function for database connections. The
/// caller owns the returned client and must [`DatabaseClient::close`] it.
pub async fn connect(
    params: &ConnectionParams,
    settings: &ExecutorConfig,
) -> Result<Box<dyn DatabaseClient>> {
    match params {
        ConnectionParams::Sqlite(params) => {
            let client = SqliteClient::connect(params).await?;
            Ok(Box::new(client))
        }
        ConnectionParams::Postgres(params) => {
            let client = PostgresClient::connect(params, settings).await?;
            Ok(Box::new(client))
        }
    }
}

/// Opens a client with the shorter connection-test timeout.
pub async fn connect_for_probe(
    params: &ConnectionParams,
    settings: &ExecutorConfig,
) -> Result<Box<dyn DatabaseClient>> {
    let probe_settings = ExecutorConfig {
        connect_timeout_secs: settings.probe_timeout_secs,
        ..settings.clone()
    };
    connect(params, &probe_settings).await
}

/// Trait defining the interface for database clients.
///
/// Each client wraps exactly one live connection. Consuming `close`
/// guarantees the handle cannot be used after release.
#[async_trait]
pub trait DatabaseClient: Send {
    /// The backend this client talks to.
    fn backend(&self) -> DatabaseBackend;

    /// Introspects the database schema, returning tables and their columns.
    async fn introspect_schema(&mut self) -> Result<Schema>;

    /// Executes a SQL statement and collects every row.
    async fn execute_query(&mut self, sql: &str) -> Result<QueryResult>;

    /// Runs a trivial statement to prove the connection works.
    async fn ping(&mut self) -> Result<()>;

    /// Closes the underlying connection.
    async fn close(self: Box<Self>) -> Result<()>;
}
