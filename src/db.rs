mod schema;

use std::path::Path;

use anyhow::Result;
use rusqlite::Connection;

pub use schema::{REFERENCE_SEQUENCE_INDEXES, TAXONOMY_NAME_INDEXES};
use schema::{INITIAL_SCHEMA, STATIC_INDEXES};

/// Catalog store wrapper providing connection management and schema
/// initialization.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens an in-memory SQLite database.
    ///
    /// Automatically initializes the schema on connection open.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize_schema()?;
        Ok(db)
    }

    /// Opens a file-based SQLite database at the given path.
    ///
    /// Creates the database file if it does not exist.
    /// Automatically initializes the schema on connection open.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.initialize_schema()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// Executes all schema statements with IF NOT EXISTS for idempotent
    /// execution, then creates every secondary index so a fresh store is
    /// fully indexed before the first load.
    ///
    /// LIKE is switched to case-sensitive so left-anchored prefix queries
    /// against the (all-lowercase) sequence columns can use their B-tree
    /// indexes; with the default case-folding LIKE the planner cannot.
    fn initialize_schema(&self) -> Result<()> {
        self.conn.execute("PRAGMA case_sensitive_like = ON", [])?;
        self.conn.execute_batch(INITIAL_SCHEMA)?;
        self.conn.execute_batch(STATIC_INDEXES)?;
        self.create_indexes(REFERENCE_SEQUENCE_INDEXES)?;
        self.create_indexes(TAXONOMY_NAME_INDEXES)?;
        Ok(())
    }

    /// Creates each index in the set, skipping ones that already exist.
    pub fn create_indexes(&self, indexes: &[(&str, &str)]) -> Result<()> {
        for (_, create_sql) in indexes {
            self.conn.execute(create_sql, [])?;
        }
        Ok(())
    }

    /// Drops each index in the set with DROP INDEX IF EXISTS semantics,
    /// so partially-applied drops are safe to re-run.
    pub fn drop_indexes(&self, indexes: &[(&str, &str)]) -> Result<()> {
        for (name, _) in indexes {
            self.conn
                .execute(&format!("DROP INDEX IF EXISTS {name}"), [])?;
        }
        Ok(())
    }

    /// Returns a reference to the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}
