//! Error types for Quill.
//!
//! Defines the main error enum used throughout the application.

use thiserror::Error;

/// Main error type for Quill operations.
#[derive(Error, Debug)]
pub enum QuillError {
    /// The query failed the safety check and must not be executed.
    #[error("Query rejected: {0}")]
    ValidationRejected(String),

    /// Database connection errors (missing file, host unreachable, auth failed, etc.)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Statement errors raised by the engine after a connection was established.
    #[error("Execution error: {0}")]
    Execution(String),

    /// Schema discovery failed for the whole database.
    #[error("Schema discovery error: {0}")]
    SchemaDiscovery(String),

    /// LLM collaborator or LLM settings errors.
    #[error("LLM error: {0}")]
    Llm(String),

    /// Configuration errors (invalid config file, missing required fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal application errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl QuillError {
    /// Creates a validation rejection with the given message.
    pub fn validation_rejected(msg: impl Into<String>) -> Self {
        Self::ValidationRejected(msg.into())
    }

    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates an execution error with the given message.
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    /// Creates a schema discovery error with the given message.
    pub fn schema_discovery(msg: impl Into<String>) -> Self {
        Self::SchemaDiscovery(msg.into())
    }

    /// Creates an LLM error with the given message.
    pub fn llm(msg: impl Into<String>) -> Self {
        Self::Llm(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::ValidationRejected(_) => "Validation Error",
            Self::Connection(_) => "Connection Error",
            Self::Execution(_) => "Execution Error",
            Self::SchemaDiscovery(_) => "Schema Discovery Error",
            Self::Llm(_) => "LLM Error",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }
}

/// Result type alias using QuillError.
pub type Result<T> = std::result::Result<T, QuillError>;
