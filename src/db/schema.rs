//! Database schema types for Quill.
//!
//! Represents the discovered structure of a database: tables and their
//! columns. Built fresh on every discovery and never cached.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::fmt;
use tracing::warn;

/// Represents the complete schema of a database.
///
/// Serializes as an object mapping each table name to its column list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    /// All tables in discovery order.
    pub tables: Vec<Table>,
}

impl Schema {
    /// Creates a new empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the table with the given name.
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|table| table.name == name)
    }

    /// Table names in discovery order.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|table| table.name.as_str())
    }

    /// Returns true if no tables were discovered.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Formats the schema as indented text for terminal display.
    pub fn format_for_display(&self) -> String {
        let tables_text = self
            .tables
            .iter()
            .map(Self::format_table)
            .collect::<Vec<_>>()
            .join("");

        format!("Database Schema:\n\n{}", tables_text)
    }

    fn format_table(table: &Table) -> String {
        let column_lines = table
            .columns
            .iter()
            .map(Self::format_column_line)
            .collect::<Vec<_>>()
            .join("");

        format!("Table: {}\n{}\n", table.name, column_lines)
    }

    fn format_column_line(column: &Column) -> String {
        let annotations = [
            column.primary_key.then_some("PK"),
            (!column.nullable).then_some("NOT NULL"),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>();

        if annotations.is_empty() {
            format!("  - {}: {}\n", column.name, column.data_type)
        } else {
            format!(
                "  - {}: {} ({})\n",
                column.name,
                column.data_type,
                annotations.join(", ")
            )
        }
    }
}

impl Serialize for Schema {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.tables.len()))?;
        for table in &self.tables {
            map.serialize_entry(&table.name, &table.columns)?;
        }
        map.end()
    }
}

/// Represents a database table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    /// Table name.
    pub name: String,

    /// Columns in engine order. Empty when introspection of this table failed.
    pub columns: Vec<Column>,
}

impl Table {
    /// Builds a table from the outcome of its column lookup.
    ///
    /// A failed lookup is logged and leaves the table with no columns, so
    /// one unreadable table does not abort discovery of the others.
    pub fn from_lookup<E: fmt::Display>(
        name: impl Into<String>,
        lookup: std::result::Result<Vec<Column>, E>,
    ) -> Self {
        let name = name.into();
        let columns = lookup.unwrap_or_else(|e| {
            warn!("Error getting columns for table {name}: {e}");
            Vec::new()
        });
        Self { name, columns }
    }

    /// Returns the column with the given name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    /// Names of the columns flagged as primary key members.
    pub fn primary_key(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|column| column.primary_key)
            .map(|column| column.name.as_str())
            .collect()
    }
}

/// Represents a column in a table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    /// Column name.
    pub name: String,

    /// Declared data type (e.g., "INTEGER", "character varying").
    #[serde(rename = "type")]
    pub data_type: String,

    /// Whether the column allows NULL values.
    pub nullable: bool,

    /// Whether the column takes part in the primary key.
    pub primary_key: bool,
}

impl Column {
    /// Creates a new nullable, non-key column with the given name and data type.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            primary_key: false,
        }
    }

    /// Sets whether the column is nullable.
    pub fn nullable(self, nullable: bool) -> Self {
        Self { nullable, ..self }
    }

    /// Sets whether the column is part of the primary key.
    pub fn primary_key(self, primary_key: bool) -> Self {
        Self {
            primary_key,
            ..self
        }
    }
}
