//! Short-lived, read-only query execution.
//!
//! Every operation opens its own connection, runs, and closes the connection
//! on every exit path before the outcome is returned.

use tracing::{debug, warn};

use crate::config::ExecutorConfig;
use crate::db::{self, ConnectionParams, DatabaseClient, QueryResult, Schema};
use crate::error::{QuillError, Result};
use crate::safety::validate_query;

/// Message returned when a submitted query fails validation.
pub const REJECTED_MESSAGE: &str = "Invalid or unsafe SQL query. Only SELECT queries are allowed.";

/// Query executor bound to a set of timeouts.
#[derive(Debug, Clone, Copy)]
pub struct QueryExecutor<'a> {
    settings: &'a ExecutorConfig,
}

impl<'a> QueryExecutor<'a> {
    /// Creates a new query executor.
    pub fn new(settings: &'a ExecutorConfig) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ExecutorConfig {
        self.settings
    }

    /// Runs `sql` as given.
    ///
    /// The statement is not re-validated here; use [`QueryExecutor::submit`]
    /// for untrusted input.
    pub async fn execute(&self, params: &ConnectionParams, sql: &str) -> Result<QueryResult> {
        debug!("Executing query on {}", params.display_string());

        let mut client = db::connect(params, self.settings).await?;
        let outcome = client.execute_query(sql).await;
        let result = release(client, outcome).await?;

        debug!(
            "Query returned {} rows in {:?}",
            result.row_count, result.execution_time
        );
        Ok(result)
    }

    /// Validates `sql` and executes it only if it is safe.
    ///
    /// A rejected query never opens a connection.
    pub async fn submit(&self, params: &ConnectionParams, sql: &str) -> Result<QueryResult> {
        if !validate_query(sql) {
            return Err(QuillError::validation_rejected(REJECTED_MESSAGE));
        }
        self.execute(params, sql).await
    }

    /// Discovers tables and columns.
    pub async fn discover_schema(&self, params: &ConnectionParams) -> Result<Schema> {
        debug!("Discovering schema on {}", params.display_string());

        let mut client = db::connect(params, self.settings).await?;
        let outcome = client.introspect_schema().await;
        release(client, outcome).await
    }

    /// Proves that a connection can be opened and a trivial statement run.
    ///
    /// Uses the probe timeout for connection establishment.
    pub async fn test_connection(&self, params: &ConnectionParams) -> Result<()> {
        let mut client = db::connect_for_probe(params, self.settings).await?;
        let outcome = client.ping().await;
        release(client, outcome).await
    }
}

/// Closes `client`, then hands back `outcome` unchanged.
///
/// A failure to close is logged and never replaces the outcome.
async fn release<T>(client: Box<dyn DatabaseClient>, outcome: Result<T>) -> Result<T> {
    let backend = client.backend();
    if let Err(e) = client.close().await {
        warn!("Failed to close {backend} connection: {e}");
    }
    outcome
}
