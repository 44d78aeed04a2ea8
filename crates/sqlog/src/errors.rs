//! Error types for the handler and its storage.
//!
//! [`SqlogError`] separates failures that prevent a handler from being built
//! (working directory, slot scan, initial schema) from failures of a single
//! emit (insert) and from rotation failures, which never reach an emit
//! caller and are reported through [`crate::Handler::rotation_error`].

use std::path::PathBuf;

use sqlog_settings::SettingsError;
use thiserror::Error;

/// Errors produced by the sqlog handler.
#[derive(Debug, Error)]
pub enum SqlogError {
    /// The working directory could not be determined.
    #[error("failed to get the working directory: {0}")]
    WorkingDir(#[source] std::io::Error),

    /// The log directory or a candidate file could not be inspected.
    #[error("failed to scan log directory {}: {source}", dir.display())]
    Scan {
        /// Directory being scanned.
        dir: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// `SQLite` error while opening a slot or resetting its schema.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Inserting a row failed.
    #[error("inserting log record: {0}")]
    Insert(#[source] rusqlite::Error),

    /// Switching to the next slot failed.
    #[error("rotating to slot {slot}: {source}")]
    Rotation {
        /// Slot that could not be activated.
        slot: u32,
        /// What went wrong.
        #[source]
        source: Box<SqlogError>,
    },

    /// The handler was closed.
    #[error("handler is closed")]
    Closed,

    /// Invalid handler options.
    #[error("{0}")]
    Settings(#[from] SettingsError),
}

/// Convenience type alias for handler results.
pub type Result<T> = std::result::Result<T, SqlogError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
