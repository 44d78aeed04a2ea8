//! Record rendering.
//!
//! [`Renderer::render`] writes one record into two buffers in a single pass:
//! the colored console line and the plain line that is stored. Both carry
//! the same pieces in the same order:
//!
//! ```text
//! 14:03:07 INFO  src/main.rs:42 request done req.method="GET" status=200
//! ```
//!
//! time of day, level padded to five columns, source location (omitted
//! when the record has none), message, bound frames, then the record's own
//! attributes. Nested groups are flattened with dotted keys using an explicit
//! work stack, so deeply nested attributes never grow the call stack.

use std::borrow::Cow;
use std::fmt::{self, Write as _};
use std::path::{Path, PathBuf};

use bytes::BytesMut;
use chrono::{DateTime, Local, SecondsFormat};
use owo_colors::Style;
use sqlog_core::{Attr, LEVEL_KEY, Level, Record, TIME_KEY, Value};

use crate::frames::{Frame, FrameStack};

/// Display width the level column is padded to.
const LEVEL_WIDTH: usize = 5;

/// Grey used for the time column and attribute keys.
const GREY: (u8, u8, u8) = (130, 130, 130);

// =============================================================================
// Color Styles
// =============================================================================

/// Color styles for console output.
#[derive(Debug, Clone)]
struct Styles {
    time: Style,
    location: Style,
    key: Style,
}

impl Styles {
    fn new() -> Self {
        let grey = Style::new().truecolor(GREY.0, GREY.1, GREY.2);
        Self {
            time: grey,
            location: Style::new().blue(),
            key: grey,
        }
    }
}

/// Style for a level name.
fn level_style(level: Level) -> Style {
    match level {
        Level::Debug => Style::new().magenta(),
        Level::Info => Style::new().green(),
        Level::Warn => Style::new().yellow(),
        Level::Error => Style::new().red(),
    }
}

// =============================================================================
// Line writer
// =============================================================================

/// Writes every piece to both buffers, decorating only the colored one.
struct LineWriter<'b> {
    colored: &'b mut BytesMut,
    plain: &'b mut BytesMut,
    color: bool,
}

impl LineWriter<'_> {
    fn raw(&mut self, args: fmt::Arguments<'_>) {
        let _ = self.colored.write_fmt(args);
        let _ = self.plain.write_fmt(args);
    }

    fn styled(&mut self, args: fmt::Arguments<'_>, style: &Style) {
        if self.color {
            let _ = write!(self.colored, "{}", style.style(args));
        } else {
            let _ = self.colored.write_fmt(args);
        }
        let _ = self.plain.write_fmt(args);
    }

    fn sep(&mut self) {
        self.colored.extend_from_slice(b" ");
        self.plain.extend_from_slice(b" ");
    }
}

// =============================================================================
// Renderer
// =============================================================================

/// Renders records into colored and plain lines.
#[derive(Debug, Clone)]
pub struct Renderer {
    styles: Styles,
    color: bool,
    cwd: PathBuf,
}

impl Renderer {
    /// Create a renderer. Locations under `cwd` are shown relative to it.
    pub fn new(color: bool, cwd: PathBuf) -> Self {
        Self {
            styles: Styles::new(),
            color,
            cwd,
        }
    }

    /// Whether console output is decorated.
    pub fn color(&self) -> bool {
        self.color
    }

    /// Render `record` stamped with `time` and the visible `frames`.
    ///
    /// Both buffers receive a complete, newline-terminated line.
    pub fn render(
        &self,
        record: &Record,
        time: DateTime<Local>,
        frames: &FrameStack,
        colored: &mut BytesMut,
        plain: &mut BytesMut,
    ) {
        let mut out = LineWriter {
            colored,
            plain,
            color: self.color,
        };

        out.styled(format_args!("{}", time.format("%H:%M:%S")), &self.styles.time);

        out.sep();
        let level = record.level.as_str();
        out.styled(format_args!("{level}"), &level_style(record.level));
        for _ in level.len()..LEVEL_WIDTH {
            out.raw(format_args!(" "));
        }

        if let Some(location) = &record.location {
            out.sep();
            let file = relative_file(&self.cwd, &location.file);
            out.styled(
                format_args!("{file}:{}", location.line),
                &self.styles.location,
            );
        }

        out.sep();
        out.raw(format_args!("{}", record.message));

        for frame in frames.visible(!record.attrs.is_empty()) {
            match frame {
                Frame::Group(name) => {
                    out.sep();
                    out.raw(format_args!("{name}"));
                }
                Frame::Attrs(attrs) => self.append_attrs(&mut out, attrs),
            }
        }
        self.append_attrs(&mut out, &record.attrs);

        out.raw(format_args!("\n"));
    }

    /// Flatten `attrs` in order, depth-first, without recursion.
    fn append_attrs(&self, out: &mut LineWriter<'_>, attrs: &[Attr]) {
        let mut stack: Vec<(String, Cow<'_, Attr>)> = attrs
            .iter()
            .rev()
            .map(|a| (String::new(), Cow::Borrowed(a)))
            .collect();

        while let Some((prefix, attr)) = stack.pop() {
            let attr = resolve(attr);
            if attr.is_empty() {
                continue;
            }

            if let Value::Group(children) = &attr.value {
                if children.is_empty() {
                    continue;
                }
                let child_prefix = if attr.key.is_empty() {
                    prefix
                } else {
                    format!("{prefix}{}.", attr.key)
                };
                push_children(&mut stack, attr, &child_prefix);
                continue;
            }

            match &attr.value {
                Value::String(s) => {
                    self.key(out, &prefix, &attr.key);
                    out.raw(format_args!("{s:?}"));
                }
                Value::Time(t) => {
                    let formatted = t.to_rfc3339_opts(SecondsFormat::Nanos, true);
                    if attr.key == TIME_KEY {
                        out.sep();
                    } else {
                        self.key(out, &prefix, &attr.key);
                    }
                    out.raw(format_args!("{formatted}"));
                }
                Value::Other(scalar) => {
                    // Levels are already rendered in their own column.
                    if attr.key == LEVEL_KEY {
                        out.sep();
                    } else {
                        self.key(out, &prefix, &attr.key);
                    }
                    out.raw(format_args!("{scalar}"));
                }
                // Groups handled above, lazy values resolved above.
                Value::Group(_) | Value::Lazy(_) => {}
            }
        }
    }

    fn key(&self, out: &mut LineWriter<'_>, prefix: &str, key: &str) {
        out.sep();
        out.styled(format_args!("{prefix}{key}="), &self.styles.key);
    }
}

/// Resolve a lazy value, borrowing when nothing needs to change.
fn resolve(attr: Cow<'_, Attr>) -> Cow<'_, Attr> {
    if matches!(attr.value, Value::Lazy(_)) {
        let owned = attr.into_owned();
        Cow::Owned(Attr {
            key: owned.key,
            value: owned.value.resolve(),
        })
    } else {
        attr
    }
}

/// Push a group's children so they pop in their original order.
fn push_children<'a>(stack: &mut Vec<(String, Cow<'a, Attr>)>, group: Cow<'a, Attr>, prefix: &str) {
    match group {
        Cow::Borrowed(attr) => {
            if let Value::Group(children) = &attr.value {
                for child in children.iter().rev() {
                    stack.push((prefix.to_string(), Cow::Borrowed(child)));
                }
            }
        }
        Cow::Owned(attr) => {
            if let Value::Group(children) = attr.value {
                for child in children.into_iter().rev() {
                    stack.push((prefix.to_string(), Cow::Owned(child)));
                }
            }
        }
    }
}

/// Path of `file` relative to `cwd` when it lives under it.
fn relative_file<'f>(cwd: &Path, file: &'f str) -> Cow<'f, str> {
    let path = Path::new(file);
    if path.is_absolute() {
        if let Ok(rel) = path.strip_prefix(cwd) {
            return Cow::Owned(rel.display().to_string());
        }
    }
    Cow::Borrowed(file)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
