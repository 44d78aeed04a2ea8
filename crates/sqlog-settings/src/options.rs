//! Handler options.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use sqlog_core::Level;

use crate::errors::{Result, SettingsError};

/// Rows a slot may hold before the handler rotates to the next one.
pub const DEFAULT_MAX_ROWS_PER_SLOT: u64 = 50_000;

/// Slots in the rotation ring.
pub const DEFAULT_NUM_SLOTS: u32 = 7;

/// First segment of every slot file name.
pub const DEFAULT_BASENAME: &str = "logs";

/// Last segment of every slot file name.
pub const DEFAULT_EXTENSION: &str = "sqlite";

/// How long `SQLite` waits on a locked database before failing.
pub const DEFAULT_BUSY_TIMEOUT_MS: u32 = 5000;

/// Configuration for a handler.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HandlerOptions {
    /// Minimum level to log. Lower levels are discarded.
    pub level: Level,
    /// Rows per slot before rotating.
    pub max_rows_per_slot: u64,
    /// Number of slot files in the ring.
    pub num_slots: u32,
    /// Disable ANSI colors on the console.
    pub no_color: bool,
    /// Directory holding the slot files. `None` means the working directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
    /// File name prefix (`<basename>.<slot>.<extension>`).
    pub basename: String,
    /// File name suffix.
    pub extension: String,
    /// `SQLite` busy timeout in milliseconds.
    pub busy_timeout_ms: u32,
}

impl Default for HandlerOptions {
    fn default() -> Self {
        Self {
            level: Level::Info,
            max_rows_per_slot: DEFAULT_MAX_ROWS_PER_SLOT,
            num_slots: DEFAULT_NUM_SLOTS,
            no_color: false,
            directory: None,
            basename: DEFAULT_BASENAME.to_string(),
            extension: DEFAULT_EXTENSION.to_string(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

impl HandlerOptions {
    /// Replace unset (zero or empty) values with their defaults.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        if self.max_rows_per_slot == 0 {
            self.max_rows_per_slot = DEFAULT_MAX_ROWS_PER_SLOT;
        }
        if self.num_slots == 0 {
            self.num_slots = DEFAULT_NUM_SLOTS;
        }
        if self.basename.is_empty() {
            self.basename = DEFAULT_BASENAME.to_string();
        }
        if self.extension.is_empty() {
            self.extension = DEFAULT_EXTENSION.to_string();
        }
        self
    }

    /// Check that the options describe a usable ring.
    pub fn validate(&self) -> Result<()> {
        if self.num_slots == 0 {
            return Err(SettingsError::InvalidValue(
                "num_slots must be at least 1".to_string(),
            ));
        }
        if self.max_rows_per_slot == 0 {
            return Err(SettingsError::InvalidValue(
                "max_rows_per_slot must be at least 1".to_string(),
            ));
        }
        for (name, part) in [("basename", &self.basename), ("extension", &self.extension)] {
            if part.is_empty() || part.contains('.') {
                return Err(SettingsError::InvalidValue(format!(
                    "{name} must be non-empty and contain no '.', got {part:?}"
                )));
            }
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn defaults() {
        let opts = HandlerOptions::default();
        assert_eq!(opts.level, Level::Info);
        assert_eq!(opts.max_rows_per_slot, 50_000);
        assert_eq!(opts.num_slots, 7);
        assert!(!opts.no_color);
        assert_eq!(opts.basename, "logs");
        assert_eq!(opts.extension, "sqlite");
        assert!(opts.directory.is_none());
    }

    #[test]
    fn with_defaults_fills_zeroes() {
        let opts = HandlerOptions {
            max_rows_per_slot: 0,
            num_slots: 0,
            basename: String::new(),
            ..Default::default()
        }
        .with_defaults();
        assert_eq!(opts.max_rows_per_slot, DEFAULT_MAX_ROWS_PER_SLOT);
        assert_eq!(opts.num_slots, DEFAULT_NUM_SLOTS);
        assert_eq!(opts.basename, DEFAULT_BASENAME);
    }

    #[test]
    fn with_defaults_keeps_explicit_values() {
        let opts = HandlerOptions {
            max_rows_per_slot: 3,
            num_slots: 2,
            ..Default::default()
        }
        .with_defaults();
        assert_eq!(opts.max_rows_per_slot, 3);
        assert_eq!(opts.num_slots, 2);
    }

    #[test]
    fn validate_rejects_zero_slots() {
        let opts = HandlerOptions {
            num_slots: 0,
            ..Default::default()
        };
        assert_matches!(opts.validate(), Err(SettingsError::InvalidValue(_)));
    }

    #[test]
    fn validate_rejects_dotted_basename() {
        let opts = HandlerOptions {
            basename: "my.logs".to_string(),
            ..Default::default()
        };
        assert_matches!(opts.validate(), Err(SettingsError::InvalidValue(msg)) if msg.contains("basename"));
    }

    #[test]
    fn serde_uses_camel_case() {
        let json = serde_json::to_value(HandlerOptions::default()).unwrap();
        assert_eq!(json["maxRowsPerSlot"], 50_000);
        assert_eq!(json["numSlots"], 7);
        assert_eq!(json["level"], "info");
        assert!(json.get("directory").is_none());
    }
}
