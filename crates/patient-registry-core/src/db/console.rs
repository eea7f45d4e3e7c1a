//! Raw statement execution for the query console.

use rusqlite::types::ValueRef;
use rusqlite::Batch;
use serde_json::Value;
use tracing::debug;

use super::{Database, DbError, DbResult};
use crate::console::QueryResult;
use crate::models::{is_date_decltype, normalize_date};

impl Database {
    /// Execute one statement exactly as written.
    ///
    /// No parameterization and no allow-list. Values in date-typed columns are
    /// normalized to `YYYY-MM-DD`. Input holding more than one statement is
    /// rejected before anything runs.
    pub fn execute_raw(&self, sql: &str) -> DbResult<QueryResult> {
        if sql.trim().is_empty() {
            return Err(DbError::EmptyStatement);
        }
        debug!(sql, "executing console statement");

        let mut batch = Batch::new(&self.conn, sql);
        let mut stmt = batch.next()?.ok_or(DbError::EmptyStatement)?;
        if batch.next()?.is_some() {
            return Err(DbError::MultipleStatements);
        }
        if !stmt.readonly() {
            self.bump_schema_epoch();
        }

        if stmt.column_count() == 0 {
            let before = self.total_changes()?;
            stmt.execute([])?;
            let affected = self.total_changes()? - before;
            return Ok(QueryResult {
                affected_rows: affected.max(0) as u64,
                ..Default::default()
            });
        }

        let columns: Vec<(String, bool)> = stmt
            .columns()
            .iter()
            .map(|c| {
                let is_date = c.decl_type().map(is_date_decltype).unwrap_or(false);
                (c.name().to_string(), is_date)
            })
            .collect();

        let mut rows = stmt.query([])?;
        let mut values = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Vec::with_capacity(columns.len());
            for (idx, (_, is_date)) in columns.iter().enumerate() {
                record.push(to_json(row.get_ref(idx)?, *is_date));
            }
            values.push(record);
        }

        Ok(QueryResult {
            fields: columns.into_iter().map(|(name, _)| name).collect(),
            rows: values,
            affected_rows: 0,
        })
    }
}

fn to_json(value: ValueRef<'_>, is_date: bool) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(bytes) => {
            let text = String::from_utf8_lossy(bytes);
            if is_date {
                Value::String(normalize_date(&text))
            } else {
                Value::String(text.into_owned())
            }
        }
        ValueRef::Blob(bytes) => Value::String(hex::encode(bytes)),
    }
}
