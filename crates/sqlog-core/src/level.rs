//! Record severity.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// Severity of a log record, ordered from least to most severe.
///
/// The numeric code is what lands in the `level` column of a stored row.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Diagnostic detail.
    Debug,
    /// Normal operation (default minimum).
    #[default]
    Info,
    /// Something unexpected but recoverable.
    #[serde(alias = "warning")]
    Warn,
    /// A failed operation.
    Error,
}

impl Level {
    /// Code persisted in the `level` column.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Debug => -4,
            Self::Info => 0,
            Self::Warn => 4,
            Self::Error => 8,
        }
    }

    /// Inverse of [`Level::code`].
    #[must_use]
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            -4 => Some(Self::Debug),
            0 => Some(Self::Info),
            4 => Some(Self::Warn),
            8 => Some(Self::Error),
            _ => None,
        }
    }

    /// Upper-case display name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // `pad` so width specifiers like `{:<5}` apply.
        f.pad(self.as_str())
    }
}

impl FromStr for Level {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(CoreError::UnknownLevel(s.to_string())),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
