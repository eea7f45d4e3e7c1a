//! Database layer for the patient registry.

mod console;
mod patients;
mod schema;

pub use schema::*;

use rusqlite::Connection;
use std::path::Path;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::RegistryConfig;

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Empty SQL statement")]
    EmptyStatement,

    #[error("Only one SQL statement may be executed at a time")]
    MultipleStatements,
}

pub type DbResult<T> = Result<T, DbError>;

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
    /// Bumped on schema changes, which `total_changes()` does not count
    schema_epoch: AtomicI64,
    next_fetch: AtomicU64,
}

impl Database {
    /// Open database at path, creating if needed. Existing rows are kept.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let db = Self::wrap(Connection::open(path.as_ref())?);
        db.initialize()?;
        info!(path = %path.as_ref().display(), "opened patient database");
        Ok(db)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        let db = Self::wrap(Connection::open_in_memory()?);
        db.initialize()?;
        Ok(db)
    }

    fn wrap(conn: Connection) -> Self {
        Self {
            conn,
            schema_epoch: AtomicI64::new(0),
            next_fetch: AtomicU64::new(1),
        }
    }

    /// Open according to configuration, resetting first if asked to.
    pub fn open_with_config(config: &RegistryConfig) -> DbResult<Self> {
        let db = match &config.data_path {
            Some(path) => Self::open(path)?,
            None => Self::open_in_memory()?,
        };
        if config.reset_on_open {
            db.reset()?;
        }
        Ok(db)
    }

    /// Initialize schema.
    fn initialize(&self) -> DbResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Drop and recreate the patients table. All stored patients are lost.
    pub fn reset(&self) -> DbResult<()> {
        warn!("resetting patient database; all stored rows will be dropped");
        let tx = self.conn.unchecked_transaction()?;
        tx.execute_batch(DROP_SCHEMA)?;
        tx.execute_batch(SCHEMA)?;
        tx.commit()?;
        self.bump_schema_epoch();
        Ok(())
    }

    /// Change counter; grows whenever a row is written, the table is reset,
    /// or the console runs a non-read-only statement.
    ///
    /// DDL issued directly through [`Database::conn`] is not tracked.
    pub fn revision(&self) -> DbResult<i64> {
        Ok(self.total_changes()? + self.schema_epoch.load(Ordering::SeqCst))
    }

    pub(crate) fn total_changes(&self) -> DbResult<i64> {
        self.conn
            .query_row("SELECT total_changes()", [], |row| row.get(0))
            .map_err(Into::into)
    }

    pub(crate) fn bump_schema_epoch(&self) {
        self.schema_epoch.fetch_add(1, Ordering::SeqCst);
    }

    /// Issue number for the next fetch from this database.
    pub fn next_fetch_seq(&self) -> u64 {
        self.next_fetch.fetch_add(1, Ordering::Relaxed)
    }

    /// Get raw connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn test_schema_initialized() {
        let db = Database::open_in_memory().unwrap();

        let tables: Vec<String> = db
            .conn()
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        assert!(tables.contains(&"patients".to_string()));
    }

    #[test]
    fn test_revision_grows_on_write() {
        let db = Database::open_in_memory().unwrap();
        let before = db.revision().unwrap();

        db.conn()
            .execute_batch("CREATE TABLE scratch (x INTEGER); INSERT INTO scratch VALUES (1);")
            .unwrap();

        assert!(db.revision().unwrap() > before);
    }

    #[test]
    fn test_revision_grows_on_reset() {
        let db = Database::open_in_memory().unwrap();
        let before = db.revision().unwrap();

        db.reset().unwrap();

        assert!(db.revision().unwrap() > before);
    }

    #[test]
    fn test_fetch_seq_per_database() {
        let a = Database::open_in_memory().unwrap();
        let b = Database::open_in_memory().unwrap();

        assert_eq!(a.next_fetch_seq(), 1);
        assert_eq!(a.next_fetch_seq(), 2);
        assert_eq!(b.next_fetch_seq(), 1);
    }

    #[test]
    fn test_open_with_config_in_memory() {
        let db = Database::open_with_config(&RegistryConfig::in_memory()).unwrap();
        assert_eq!(db.count_patients().unwrap(), 0);
    }
}
