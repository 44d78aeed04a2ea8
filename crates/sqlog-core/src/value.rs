//! Structured attributes attached to a record or bound to a handler.
//!
//! A [`Value`] is a closed set of kinds: strings, timestamps, nested groups
//! and everything else ([`Scalar`]). Values that are expensive to compute can
//! be deferred behind a [`LogValuer`]; the handler resolves them right before
//! rendering, so the renderer only ever dispatches on the four closed kinds.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, TimeZone};

/// Key under which a time attribute is rendered bare, without `key=`.
pub const TIME_KEY: &str = "time";

/// Key under which a non-string attribute is rendered bare, without `key=`.
pub const LEVEL_KEY: &str = "level";

/// Upper bound on chained [`LogValuer`] resolutions.
const MAX_RESOLVE_STEPS: usize = 100;

/// A value computed lazily at render time.
pub trait LogValuer: Send + Sync + fmt::Debug {
    /// Produce the value to render. May itself return [`Value::Lazy`].
    fn log_value(&self) -> Value;
}

/// Kind tag of a [`Value`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueKind {
    /// [`Value::String`].
    String,
    /// [`Value::Time`].
    Time,
    /// [`Value::Group`].
    Group,
    /// [`Value::Other`].
    Other,
    /// [`Value::Lazy`].
    Lazy,
}

/// Anything that is not a string, time or group.
#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    /// Absent value. Paired with an empty key it forms the zero attribute.
    Nil,
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Unsigned integer.
    Uint(u64),
    /// Floating point.
    Float(f64),
    /// Elapsed time.
    Duration(Duration),
    /// Pre-rendered display form of an arbitrary value (errors, custom types).
    Text(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => f.write_str("<nil>"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Uint(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Duration(d) => write!(f, "{d:?}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Attribute value.
#[derive(Clone, Debug)]
pub enum Value {
    /// Text, rendered quoted.
    String(String),
    /// Instant, rendered as RFC 3339 with nanoseconds.
    Time(DateTime<FixedOffset>),
    /// Nested attributes, flattened with dotted keys.
    Group(Vec<Attr>),
    /// Any other value, rendered via its display form.
    Other(Scalar),
    /// Deferred value, see [`LogValuer`].
    Lazy(Arc<dyn LogValuer>),
}

impl Value {
    /// Kind tag of this value.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::String(_) => ValueKind::String,
            Self::Time(_) => ValueKind::Time,
            Self::Group(_) => ValueKind::Group,
            Self::Other(_) => ValueKind::Other,
            Self::Lazy(_) => ValueKind::Lazy,
        }
    }

    /// Follow [`Value::Lazy`] until a concrete kind is reached.
    ///
    /// Resolution stops after a fixed number of steps; a valuer that keeps
    /// returning lazy values is replaced by an error text.
    #[must_use]
    pub fn resolve(self) -> Value {
        let mut value = self;
        for _ in 0..MAX_RESOLVE_STEPS {
            match value {
                Self::Lazy(valuer) => value = valuer.log_value(),
                resolved => return resolved,
            }
        }
        match value {
            Self::Lazy(valuer) => Self::Other(Scalar::Text(format!(
                "LogValue resolution exceeded {MAX_RESOLVE_STEPS} steps: {valuer:?}"
            ))),
            resolved => resolved,
        }
    }

    /// Whether this is the nil scalar.
    #[must_use]
    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Other(Scalar::Nil))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Time(a), Self::Time(b)) => a == b,
            (Self::Group(a), Self::Group(b)) => a == b,
            (Self::Other(a), Self::Other(b)) => a == b,
            (Self::Lazy(a), Self::Lazy(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Other(Scalar::Bool(b))
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Other(Scalar::Int(n.into()))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Other(Scalar::Int(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Self::Other(Scalar::Uint(n.into()))
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Self::Other(Scalar::Uint(n))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Other(Scalar::Float(x))
    }
}

impl From<Duration> for Value {
    fn from(d: Duration) -> Self {
        Self::Other(Scalar::Duration(d))
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for Value {
    fn from(t: DateTime<Tz>) -> Self {
        Self::Time(t.fixed_offset())
    }
}

impl From<Vec<Attr>> for Value {
    fn from(attrs: Vec<Attr>) -> Self {
        Self::Group(attrs)
    }
}

impl From<Scalar> for Value {
    fn from(s: Scalar) -> Self {
        Self::Other(s)
    }
}

/// A key/value pair.
#[derive(Clone, Debug, PartialEq)]
pub struct Attr {
    /// Attribute key. May be empty for inline groups.
    pub key: String,
    /// Attribute value.
    pub value: Value,
}

impl Attr {
    /// Build an attribute from anything convertible into a [`Value`].
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// A nested group of attributes.
    pub fn group(key: impl Into<String>, attrs: Vec<Attr>) -> Self {
        Self::new(key, Value::Group(attrs))
    }

    /// The display form of an arbitrary value, such as an error.
    pub fn display(key: impl Into<String>, value: &dyn fmt::Display) -> Self {
        Self::new(key, Scalar::Text(value.to_string()))
    }

    /// A value computed when the record is rendered.
    pub fn lazy(key: impl Into<String>, valuer: Arc<dyn LogValuer>) -> Self {
        Self::new(key, Value::Lazy(valuer))
    }

    /// The zero attribute: empty key, nil value. Renderers drop it.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(String::new(), Scalar::Nil)
    }

    /// Whether this is the zero attribute.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.key.is_empty() && self.value.is_nil()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
