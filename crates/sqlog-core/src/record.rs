//! The record handed to a handler for every log call.

use chrono::{DateTime, Local};

use crate::level::Level;
use crate::value::Attr;

/// Source position of the log call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    /// Source file path as reported by the compiler.
    pub file: String,
    /// 1-based line number.
    pub line: u32,
}

impl Location {
    /// Location of the caller of the enclosing `#[track_caller]` chain.
    #[track_caller]
    #[must_use]
    pub fn caller() -> Self {
        let loc = std::panic::Location::caller();
        Self {
            file: loc.file().to_string(),
            line: loc.line(),
        }
    }
}

/// A single log event.
#[derive(Clone, Debug)]
pub struct Record {
    /// Wall-clock time. `None` is filled with "now" by the handler.
    pub time: Option<DateTime<Local>>,
    /// Severity.
    pub level: Level,
    /// Message text.
    pub message: String,
    /// Where the record was created, if captured.
    pub location: Option<Location>,
    /// Structured attributes in call order.
    pub attrs: Vec<Attr>,
}

impl Record {
    /// Create a record stamped with the current time and the caller's location.
    #[track_caller]
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            time: Some(Local::now()),
            level,
            message: message.into(),
            location: Some(Location::caller()),
            attrs: Vec::new(),
        }
    }

    /// Create a record with no time and no location.
    pub fn without_location(level: Level, message: impl Into<String>) -> Self {
        Self {
            time: None,
            level,
            message: message.into(),
            location: None,
            attrs: Vec::new(),
        }
    }

    /// Set the record time.
    #[must_use]
    pub fn with_time(mut self, time: DateTime<Local>) -> Self {
        self.time = Some(time);
        self
    }

    /// Set the source location.
    #[must_use]
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Append one attribute.
    #[must_use]
    pub fn with_attr(mut self, attr: Attr) -> Self {
        self.attrs.push(attr);
        self
    }

    /// Append several attributes.
    #[must_use]
    pub fn with_attrs(mut self, attrs: impl IntoIterator<Item = Attr>) -> Self {
        self.attrs.extend(attrs);
        self
    }

    /// Number of attributes carried by the record itself.
    pub fn num_attrs(&self) -> usize {
        self.attrs.len()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
