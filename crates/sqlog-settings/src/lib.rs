//! # sqlog-settings
//!
//! Options for the sqlog handler, loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`HandlerOptions::default()`]
//! 2. **Options file**: a JSON file deep-merged over the defaults
//! 3. **Environment variables**: `SQLOG_*` overrides (highest priority)
//!
//! Options are read-only once a handler has been built from them.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod options;

pub use errors::{Result, SettingsError};
pub use loader::{apply_env_overrides, deep_merge, load_options_from_path};
pub use options::{
    DEFAULT_BASENAME, DEFAULT_BUSY_TIMEOUT_MS, DEFAULT_EXTENSION, DEFAULT_MAX_ROWS_PER_SLOT,
    DEFAULT_NUM_SLOTS, HandlerOptions,
};

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
