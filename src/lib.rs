//! Quill - read-only SQL validation and execution for SQLite and PostgreSQL.
//!
//! This library exposes the core modules for the `quill` binary and for
//! integration tests.

pub mod config;
pub mod db;
pub mod error;
pub mod llm;
pub mod logging;
pub mod query;
pub mod safety;
