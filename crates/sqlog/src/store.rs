//! Slot storage.
//!
//! A slot is one file holding one `entries` table. The rotation manager only
//! needs four things from it: open, reset the table, insert a row and learn
//! the row's sequence number, close. [`SlotStore`] and [`StoreOpener`] are
//! that seam; [`SqliteStore`]/[`SqliteOpener`] implement it on `SQLite`.

use std::path::Path;

use rusqlite::Connection;

use crate::errors::{Result, SqlogError};

/// Drops and recreates the `entries` table. Rows are keyed by `rowid`,
/// which restarts at 1 after every reset.
const RESET_SCHEMA_SQL: &str = "
DROP TABLE IF EXISTS entries;

CREATE TABLE IF NOT EXISTS entries (
  epoch_secs INTEGER,
  nanos INTEGER,
  level INTEGER,
  content BLOB
);
";

const INSERT_SQL: &str =
    "INSERT INTO entries (epoch_secs, nanos, level, content) VALUES (?1, ?2, ?3, ?4)";

/// One stored log row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StoredRow<'a> {
    /// Seconds since the Unix epoch.
    pub epoch_secs: i64,
    /// Nanosecond offset within the second.
    pub nanos: u32,
    /// Level code, see [`sqlog_core::Level::code`].
    pub level: i32,
    /// Rendered plain line, newline-terminated.
    pub content: &'a [u8],
}

/// An open slot.
pub trait SlotStore: Send {
    /// Drop and recreate the table, discarding previous rows.
    fn ensure_schema(&mut self) -> Result<()>;

    /// Append a row and return its sequence number (1-based since the last reset).
    fn insert(&mut self, row: &StoredRow<'_>) -> Result<i64>;

    /// Close the underlying file.
    fn close(self: Box<Self>) -> Result<()>;
}

/// Opens slot files.
pub trait StoreOpener: Send + Sync {
    /// Open (creating if absent) the slot file at `path`.
    fn open(&self, path: &Path) -> Result<Box<dyn SlotStore>>;
}

// =============================================================================
// SQLite
// =============================================================================

/// A slot backed by a `SQLite` database file.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open `path` with WAL journaling and a bounded busy wait.
    pub fn open(path: &Path, busy_timeout_ms: u32) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(&format!(
            "PRAGMA journal_mode = WAL;\
             PRAGMA synchronous = NORMAL;\
             PRAGMA busy_timeout = {busy_timeout_ms};"
        ))?;
        Ok(Self { conn })
    }

    /// Rows currently in the table.
    pub fn row_count(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM entries", [], |r| r.get(0))?)
    }

    /// The underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl SlotStore for SqliteStore {
    fn ensure_schema(&mut self) -> Result<()> {
        self.conn.execute_batch(RESET_SCHEMA_SQL)?;
        Ok(())
    }

    fn insert(&mut self, row: &StoredRow<'_>) -> Result<i64> {
        let mut stmt = self
            .conn
            .prepare_cached(INSERT_SQL)
            .map_err(SqlogError::Insert)?;
        let _ = stmt
            .execute(rusqlite::params![
                row.epoch_secs,
                row.nanos,
                row.level,
                row.content
            ])
            .map_err(SqlogError::Insert)?;
        Ok(self.conn.last_insert_rowid())
    }

    fn close(self: Box<Self>) -> Result<()> {
        self.conn.close().map_err(|(_, e)| SqlogError::Sqlite(e))
    }
}

/// Opens [`SqliteStore`] slots.
#[derive(Clone, Copy, Debug)]
pub struct SqliteOpener {
    busy_timeout_ms: u32,
}

impl SqliteOpener {
    /// Opener applying `busy_timeout_ms` to every slot.
    pub fn new(busy_timeout_ms: u32) -> Self {
        Self { busy_timeout_ms }
    }
}

impl Default for SqliteOpener {
    fn default() -> Self {
        Self::new(sqlog_settings::DEFAULT_BUSY_TIMEOUT_MS)
    }
}

impl StoreOpener for SqliteOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn SlotStore>> {
        Ok(Box::new(SqliteStore::open(path, self.busy_timeout_ms)?))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
