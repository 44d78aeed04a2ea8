//! # sqlog-core
//!
//! Data model shared by the sqlog crates: severity [`Level`], structured
//! [`Attr`]/[`Value`] pairs and the caller-owned [`Record`] handed to the
//! handler for every log call.

#![deny(unsafe_code)]

pub mod errors;
pub mod level;
pub mod record;
pub mod value;

pub use errors::{CoreError, Result};
pub use level::Level;
pub use record::{Location, Record};
pub use value::{Attr, LEVEL_KEY, LogValuer, Scalar, TIME_KEY, Value, ValueKind};
