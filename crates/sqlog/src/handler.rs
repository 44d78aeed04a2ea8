//! The log handler.
//!
//! [`Handler`] filters records by level, renders each one into a colored
//! console line and a plain stored line, writes the former to the console
//! sink and inserts the latter into the active ring slot.
//!
//! # Concurrency
//!
//! Rendering happens outside any lock with buffers from the shared
//! [`BufferPool`]. The console write, the insert, the threshold check and any
//! resulting rotation then run under one mutex, so console order matches
//! insert order and no insert ever targets a slot that is being swapped.
//!
//! Handlers derived with [`Handler::with_attrs`]/[`Handler::with_group`]
//! share that state and differ only in their bound frames.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Local;
use parking_lot::Mutex;
use sqlog_core::{Attr, Level, Record};
use sqlog_settings::HandlerOptions;
use tracing::warn;

use crate::buffer_pool::{BufferPool, MetricsSnapshot};
use crate::errors::{Result, SqlogError};
use crate::frames::{Frame, FrameStack};
use crate::render::Renderer;
use crate::rotation::{RotationManager, SlotNaming};
use crate::store::{SqliteOpener, StoreOpener, StoredRow};

/// Name reported by [`Handler::name`].
pub const HANDLER_NAME: &str = "SQLogger";

/// Console sink receiving colored lines.
pub type Console = Box<dyn Write + Send>;

/// State touched by every emit, guarded as one unit.
struct Sink {
    rotation: RotationManager,
    console: Console,
}

struct Engine {
    options: HandlerOptions,
    renderer: Renderer,
    pool: BufferPool,
    sink: Mutex<Sink>,
}

/// Structured log handler backed by a ring of `SQLite` files.
#[derive(Clone)]
pub struct Handler {
    engine: Arc<Engine>,
    frames: FrameStack,
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler")
            .field("options", &self.engine.options)
            .field("frames", &self.frames.len())
            .finish_non_exhaustive()
    }
}

impl Handler {
    /// Build a handler writing colored lines to standard output.
    pub fn new(options: HandlerOptions) -> Result<Self> {
        Self::with_console(options, Box::new(std::io::stdout()))
    }

    /// Build a handler writing colored lines to `console`.
    pub fn with_console(options: HandlerOptions, console: Console) -> Result<Self> {
        let opener = Arc::new(SqliteOpener::new(options.busy_timeout_ms));
        Self::with_parts(options, console, opener)
    }

    /// Build a handler from explicit collaborators.
    ///
    /// Resolves the current slot in the log directory, opens it and resets
    /// its table. Fails if the working directory is unavailable, the
    /// directory cannot be scanned or the slot cannot be prepared.
    pub fn with_parts(
        options: HandlerOptions,
        console: Console,
        opener: Arc<dyn StoreOpener>,
    ) -> Result<Self> {
        let options = options.with_defaults();
        options.validate()?;

        let cwd = std::env::current_dir().map_err(SqlogError::WorkingDir)?;
        let dir = options
            .directory
            .as_ref()
            .map_or_else(|| cwd.clone(), |d| cwd.join(d));

        let rotation = RotationManager::open(
            dir,
            SlotNaming::new(options.basename.clone(), options.extension.clone()),
            options.num_slots,
            options.max_rows_per_slot,
            opener,
        )?;

        Ok(Self {
            engine: Arc::new(Engine {
                renderer: Renderer::new(!options.no_color, cwd),
                pool: BufferPool::default(),
                sink: Mutex::new(Sink { rotation, console }),
                options,
            }),
            frames: FrameStack::new(),
        })
    }

    /// Handler name.
    pub fn name(&self) -> &'static str {
        HANDLER_NAME
    }

    /// Whether records at `level` are handled.
    pub fn enabled(&self, level: Level) -> bool {
        level >= self.engine.options.level
    }

    /// Write `record` to the console and the active slot.
    ///
    /// Records below the minimum level are ignored. A record without a time
    /// is stamped with the current time. Console failures are logged and
    /// otherwise ignored; insert failures are returned. A rotation triggered
    /// by this record never fails the call, see [`Handler::rotation_error`].
    pub fn emit(&self, record: &Record) -> Result<()> {
        if !self.enabled(record.level) {
            return Ok(());
        }
        let time = record.time.unwrap_or_else(Local::now);

        let engine = &*self.engine;
        let mut colored = engine.pool.get();
        let mut plain = engine.pool.get();
        engine
            .renderer
            .render(record, time, &self.frames, &mut colored, &mut plain);

        let row = StoredRow {
            epoch_secs: time.timestamp(),
            nanos: time.timestamp_subsec_nanos(),
            level: record.level.code(),
            content: &plain,
        };

        let mut sink = engine.sink.lock();
        if sink.rotation.is_closed() {
            return Err(SqlogError::Closed);
        }
        if let Err(e) = sink.console.write_all(&colored) {
            warn!(error = %e, "console write failed");
        }
        let _ = sink.rotation.append(&row)?;
        Ok(())
    }

    /// A handler that also renders `attrs` on every record.
    ///
    /// Returns a plain clone when `attrs` is empty.
    #[must_use]
    pub fn with_attrs(&self, attrs: Vec<Attr>) -> Self {
        if attrs.is_empty() {
            return self.clone();
        }
        self.derive(Frame::Attrs(attrs))
    }

    /// A handler that renders the `name` group label before later attributes.
    ///
    /// Returns a plain clone when `name` is empty.
    #[must_use]
    pub fn with_group(&self, name: &str) -> Self {
        if name.is_empty() {
            return self.clone();
        }
        self.derive(Frame::Group(name.to_string()))
    }

    fn derive(&self, frame: Frame) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            frames: self.frames.push(frame),
        }
    }

    /// Switch to the next slot now.
    pub fn rotate(&self) -> Result<()> {
        self.engine.sink.lock().rotation.rotate()
    }

    /// Close the active slot. Every handler sharing it stops accepting records.
    pub fn close(&self) -> Result<()> {
        let mut sink = self.engine.sink.lock();
        let _ = sink.console.flush();
        sink.rotation.close()
    }

    /// Active slot id.
    pub fn current_slot(&self) -> u32 {
        self.engine.sink.lock().rotation.slot()
    }

    /// Path of the active slot file.
    pub fn current_path(&self) -> PathBuf {
        self.engine.sink.lock().rotation.path().to_path_buf()
    }

    /// Sequence number of the last row written to the active slot.
    pub fn last_sequence(&self) -> i64 {
        self.engine.sink.lock().rotation.last_sequence()
    }

    /// The last rotation failure, if the handler is stuck on a full slot.
    pub fn rotation_error(&self) -> Option<Arc<SqlogError>> {
        self.engine.sink.lock().rotation.rotation_error()
    }

    /// Effective options.
    pub fn options(&self) -> &HandlerOptions {
        &self.engine.options
    }

    /// Render buffer pool counters.
    pub fn buffer_metrics(&self) -> MetricsSnapshot {
        self.engine.pool.metrics().snapshot()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
