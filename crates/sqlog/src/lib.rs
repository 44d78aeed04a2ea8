//! # sqlog
//!
//! A structured log handler that mirrors every record to the console and
//! persists it into a ring of `SQLite` files.
//!
//! - [`Handler`] filters, renders and stores records.
//! - [`RotationManager`] keeps one slot active and moves to the next once it
//!   holds `max_rows_per_slot` rows, overwriting the oldest slot on wrap.
//! - [`Renderer`] flattens attributes and bound frames into colored and
//!   plain lines using pooled buffers from [`BufferPool`].
//! - [`SlotStore`]/[`StoreOpener`] are the storage seam, implemented by
//!   [`SqliteStore`]/[`SqliteOpener`].
//!
//! ```no_run
//! use sqlog::{Attr, Handler, HandlerOptions, Level, Record};
//!
//! let handler = Handler::new(HandlerOptions::default())?;
//! let api = handler.with_attrs(vec![Attr::new("svc", "api")]);
//! api.emit(&Record::new(Level::Info, "started").with_attr(Attr::new("port", 8080_i64)))?;
//! handler.close()?;
//! # Ok::<(), sqlog::SqlogError>(())
//! ```

#![deny(unsafe_code)]

pub mod buffer_pool;
pub mod errors;
pub mod frames;
pub mod handler;
pub mod render;
pub mod rotation;
pub mod store;

pub use buffer_pool::{BufferPool, MetricsSnapshot, PooledBuf};
pub use errors::{Result, SqlogError};
pub use frames::{Frame, FrameStack};
pub use handler::{Console, HANDLER_NAME, Handler};
pub use render::Renderer;
pub use rotation::{RotationManager, SlotNaming, determine_current_slot};
pub use store::{SlotStore, SqliteOpener, SqliteStore, StoreOpener, StoredRow};

pub use sqlog_core::{Attr, Level, Location, LogValuer, Record, Scalar, Value};
pub use sqlog_settings::{HandlerOptions, load_options_from_path};
