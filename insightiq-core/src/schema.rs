//! Schema map and query result types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Mapping from table name to its ordered column names.
///
/// Built fresh from the live database on each request; never cached. A
/// `BTreeMap` keeps iteration order stable so prompts and index documents are
/// deterministic for a given schema.
pub type SchemaMap = BTreeMap<String, Vec<String>>;

/// Tabular result of a successful read query.
///
/// Every cell is rendered to its display string by the store; the caller owns
/// the value once returned and the core never mutates it again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Column names, in select-list order.
    pub columns: Vec<String>,
    /// Row values, one `Vec<String>` per row, aligned with `columns`.
    pub rows: Vec<Vec<String>>,
}

impl QueryResult {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { columns, rows }
    }

    /// Number of rows returned.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Serialize a subset of the schema into prompt-ready lines.
///
/// One line per table: `Table Album: AlbumId, Title, ArtistId`. Tables are
/// emitted in map order; tables named in `selected` but missing from the map
/// are skipped.
pub fn schema_lines(schema: &SchemaMap, selected: &[String]) -> String {
    selected
        .iter()
        .filter_map(|name| {
            schema
                .get(name)
                .map(|cols| format!("Table {}: {}", name, cols.join(", ")))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// =============================================================================
// TESTS
// =============================================================================
