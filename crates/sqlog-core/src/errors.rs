//! Core error types.

use thiserror::Error;

/// Errors raised while building or parsing core values.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A level name did not match any known severity.
    #[error("unknown log level: {0}")]
    UnknownLevel(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
