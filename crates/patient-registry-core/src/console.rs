//! Ad-hoc query console results.
//!
//! Statements run unrestricted: DDL, DML and queries are all accepted.
//! Hosts should expose this as an administrative capability only.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Outcome of one console statement.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct QueryResult {
    /// Column names, in select order (empty for non-queries)
    pub fields: Vec<String>,
    /// Row values, aligned with `fields`
    pub rows: Vec<Vec<Value>>,
    /// Rows changed by a DML statement
    pub affected_rows: u64,
}

/// Generic tabular rendering of a query result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl QueryResult {
    pub fn has_rows(&self) -> bool {
        !self.rows.is_empty()
    }

    /// Rows as JSON objects keyed by column name.
    pub fn row_objects(&self) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| {
                let object: Map<String, Value> = self
                    .fields
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect();
                Value::Object(object)
            })
            .collect()
    }

    /// Pretty-printed structured result.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let value = serde_json::json!({
            "fields": self.fields,
            "rows": self.row_objects(),
            "affected_rows": self.affected_rows,
        });
        serde_json::to_string_pretty(&value)
    }

    /// Tabular form, or `None` when there are no rows to show.
    pub fn to_table(&self) -> Option<ResultTable> {
        if !self.has_rows() {
            return None;
        }
        Some(ResultTable {
            columns: self.fields.clone(),
            rows: self
                .rows
                .iter()
                .map(|row| row.iter().map(cell_text).collect())
                .collect(),
        })
    }
}

/// Text shown in a table cell. Null renders empty.
fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
