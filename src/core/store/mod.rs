//! SQLite-backed part store
//!
//! The database is the source of truth for parts: duplicate checks,
//! max-sequence queries, and cascading attribute deletion all happen
//! here. One store instance wraps one connection; batch work brackets
//! its calls with `begin`/`commit`/`rollback` (`BEGIN IMMEDIATE` takes
//! the writer lock up front, which is what serializes
//! allocate-then-insert across processes).

mod queries;
mod schema;

pub use queries::PartFilter;

use std::path::{Path, PathBuf};

use rusqlite::Connection;
use thiserror::Error;

/// Current schema version. Unlike a rebuildable cache, this database
/// is the inventory itself, so a mismatch refuses to open rather than
/// dropping tables.
const SCHEMA_VERSION: i32 = 3;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open database at {path}: {source}")]
    Open {
        path: PathBuf,
        source: rusqlite::Error,
    },

    #[error("database schema version {found} does not match this build ({expected}); migrate or export with the matching release first")]
    Version { found: i32, expected: i32 },

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("overflow data is corrupt for part {id}: {source}")]
    Blob {
        id: String,
        source: serde_json::Error,
    },
}

/// The part database
#[derive(Debug)]
pub struct PartStore {
    conn: Connection,
}

impl PartStore {
    /// Open or create the database at the given path
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_connection(conn)
    }

    /// In-memory store, used by tests and dry runs
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

        let store = Self { conn };
        match store.current_version() {
            0 => store.init_schema()?,
            v if v == SCHEMA_VERSION => {}
            found => {
                return Err(StoreError::Version {
                    found,
                    expected: SCHEMA_VERSION,
                })
            }
        }
        Ok(store)
    }

    /// Recorded schema version, zero for a fresh database
    fn current_version(&self) -> i32 {
        self.conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .unwrap_or(0)
    }

    /// Begin a batch transaction. `BEGIN IMMEDIATE` so the writer lock
    /// is held for the whole allocate-then-insert span.
    pub fn begin(&self) -> Result<(), StoreError> {
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(())
    }

    pub fn commit(&self) -> Result<(), StoreError> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    pub fn rollback(&self) -> Result<(), StoreError> {
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }
}
