//! Starter questions derived from a discovered schema.

use crate::db::Schema;

/// Upper bound on the number of suggestions returned.
pub const MAX_SUGGESTIONS: usize = 5;

/// Column-name fragments and the question each one suggests.
const COLUMN_HINTS: &[(&[&str], &str)] = &[
    (&["name"], "Show all unique names"),
    (&["date", "time"], "Show records from the last 30 days"),
    (&["price", "amount"], "Calculate average price/amount"),
    (&["status"], "Group by status"),
];

/// Suggests up to [`MAX_SUGGESTIONS`] questions a user could ask about `schema`.
///
/// Column-based hints look at every column of every table. An empty schema
/// yields no suggestions.
pub fn query_suggestions(schema: &Schema) -> Vec<String> {
    let mut suggestions = Vec::new();

    let Some(first) = schema.tables.first() else {
        return suggestions;
    };

    suggestions.push(format!("Show all data from {} table", first.name));

    if let Some(second) = schema.tables.get(1) {
        suggestions.push(format!(
            "Find relationships between {} and {}",
            first.name, second.name
        ));
    }

    let column_names: Vec<String> = schema
        .tables
        .iter()
        .flat_map(|table| &table.columns)
        .map(|column| column.name.to_lowercase())
        .collect();

    for (fragments, suggestion) in COLUMN_HINTS {
        let matches = column_names
            .iter()
            .any(|name| fragments.iter().any(|fragment| name.contains(fragment)));
        if matches {
            suggestions.push((*suggestion).to_string());
        }
    }

    suggestions.truncate(MAX_SUGGESTIONS);
    suggestions
}
