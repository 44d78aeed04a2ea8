//! Slot ring rotation.
//!
//! Log rows go to one of `num_slots` files named `<basename>.<slot>.<extension>`.
//! [`RotationManager`] owns the active slot. After each insert it compares
//! the row's sequence number against `max_rows`; once reached, it activates
//! the next slot (wrapping to 0), wiping whatever that slot held before.
//!
//! # Cold start
//!
//! [`determine_current_slot`] picks the slot to resume from. Candidates are
//! visited oldest first (by modification time, ties by descending slot) while
//! tracking a running `(best_slot, best_mtime)` that starts at `(0, 0)`:
//!
//! - a candidate older than `best_mtime` (in whole seconds) is skipped;
//! - otherwise it wins if its slot is greater than `best_slot`, or if it is
//!   slot 0 and `best_slot` is the last slot of the ring (a wrap).
//!
//! The slot found is always reset: cold start begins with an empty table.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::errors::{Result, SqlogError};
use crate::store::{SlotStore, StoreOpener, StoredRow};

/// File naming for ring slots.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotNaming {
    basename: String,
    extension: String,
}

impl SlotNaming {
    /// Naming with the given basename and extension (neither may contain `.`).
    pub fn new(basename: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            basename: basename.into(),
            extension: extension.into(),
        }
    }

    /// `<basename>.<slot>.<extension>`.
    pub fn file_name(&self, slot: u32) -> String {
        format!("{}.{slot}.{}", self.basename, self.extension)
    }

    /// Slot id encoded in `name`, if it follows the pattern.
    pub fn parse(&self, name: &str) -> Option<u32> {
        let mut parts = name.split('.');
        let (base, slot, ext) = (parts.next()?, parts.next()?, parts.next()?);
        if parts.next().is_some() || base != self.basename || ext != self.extension {
            return None;
        }
        // `u32::from_str` accepts a leading '+'.
        if !slot.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        slot.parse().ok()
    }
}

impl Default for SlotNaming {
    fn default() -> Self {
        Self::new(
            sqlog_settings::DEFAULT_BASENAME,
            sqlog_settings::DEFAULT_EXTENSION,
        )
    }
}

/// A slot file found on disk.
#[derive(Debug)]
struct Candidate {
    slot: u32,
    modified: SystemTime,
}

/// Whole seconds since the epoch (negative before it).
fn unix_secs(t: SystemTime) -> i64 {
    DateTime::<Utc>::from(t).timestamp()
}

/// Find the slot to resume writing into.
///
/// Returns 0 when `dir` holds no slot files. Files whose slot id is outside
/// `0..num_slots` are ignored.
pub fn determine_current_slot(dir: &Path, naming: &SlotNaming, num_slots: u32) -> Result<u32> {
    let scan_err = |source| SqlogError::Scan {
        dir: dir.to_path_buf(),
        source,
    };

    let mut candidates = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(scan_err)? {
        let entry = entry.map_err(scan_err)?;
        if entry.file_type().map_err(scan_err)?.is_dir() {
            continue;
        }
        let Some(slot) = entry.file_name().to_str().and_then(|n| naming.parse(n)) else {
            continue;
        };
        if slot >= num_slots {
            debug!(slot, num_slots, "ignoring slot file outside the ring");
            continue;
        }
        let modified = entry.metadata().and_then(|m| m.modified()).map_err(scan_err)?;
        candidates.push(Candidate { slot, modified });
    }

    candidates.sort_by(|a, b| a.modified.cmp(&b.modified).then(b.slot.cmp(&a.slot)));

    let last = num_slots.saturating_sub(1);
    let mut best_slot = 0;
    let mut best_mtime = 0;
    for c in &candidates {
        let mtime = unix_secs(c.modified);
        if mtime < best_mtime {
            continue;
        }
        if c.slot > best_slot || (c.slot == 0 && best_slot == last) {
            best_slot = c.slot;
            best_mtime = mtime;
        }
    }

    debug!(
        dir = %dir.display(),
        candidates = candidates.len(),
        slot = best_slot,
        "selected current log slot"
    );
    Ok(best_slot)
}

/// Owner of the active slot.
pub struct RotationManager {
    dir: PathBuf,
    naming: SlotNaming,
    num_slots: u32,
    max_rows: u64,
    opener: Arc<dyn StoreOpener>,
    slot: u32,
    path: PathBuf,
    store: Option<Box<dyn SlotStore>>,
    closed: bool,
    last_sequence: i64,
    rotation_error: Option<Arc<SqlogError>>,
}

impl std::fmt::Debug for RotationManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RotationManager")
            .field("path", &self.path)
            .field("slot", &self.slot)
            .field("num_slots", &self.num_slots)
            .field("max_rows", &self.max_rows)
            .field("last_sequence", &self.last_sequence)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl RotationManager {
    /// Resolve the current slot in `dir`, open it and reset its table.
    pub fn open(
        dir: PathBuf,
        naming: SlotNaming,
        num_slots: u32,
        max_rows: u64,
        opener: Arc<dyn StoreOpener>,
    ) -> Result<Self> {
        let slot = determine_current_slot(&dir, &naming, num_slots)?;
        let path = dir.join(naming.file_name(slot));
        let mut store = opener.open(&path)?;
        store.ensure_schema()?;
        info!(path = %path.display(), slot, "opened log slot");

        Ok(Self {
            dir,
            naming,
            num_slots,
            max_rows,
            opener,
            slot,
            path,
            store: Some(store),
            closed: false,
            last_sequence: 0,
            rotation_error: None,
        })
    }

    /// Insert a row, rotating afterwards if the slot is full.
    ///
    /// Returns the row's sequence number within the slot it was written to.
    /// A failed rotation does not fail the insert: the row is already stored.
    /// The failure is kept in [`RotationManager::rotation_error`] and retried
    /// after the next insert.
    pub fn append(&mut self, row: &StoredRow<'_>) -> Result<i64> {
        if self.closed {
            return Err(SqlogError::Closed);
        }
        if self.store.is_none() {
            self.reopen_current()?;
        }
        let Some(store) = self.store.as_mut() else {
            return Err(SqlogError::Closed);
        };
        let sequence = store.insert(row)?;
        self.last_sequence = sequence;

        if u64::try_from(sequence).is_ok_and(|s| s >= self.max_rows) {
            match self.rotate() {
                Ok(()) => self.rotation_error = None,
                Err(e) => {
                    warn!(error = %e, slot = self.slot, "log rotation failed, staying on current slot");
                    self.rotation_error = Some(Arc::new(e));
                }
            }
        }
        Ok(sequence)
    }

    /// Activate the next slot in the ring.
    ///
    /// The current slot is closed first so its file is never newer than the
    /// next one. If the next slot cannot be opened or reset, the current slot
    /// is reopened (keeping its rows) and stays active.
    pub fn rotate(&mut self) -> Result<()> {
        if self.closed {
            return Err(SqlogError::Closed);
        }
        let next = (self.slot + 1) % self.num_slots;
        let path = self.dir.join(self.naming.file_name(next));
        info!(from = self.slot, to = next, path = %path.display(), "rotating log file");

        if let Some(old) = self.store.take() {
            if let Err(e) = old.close() {
                warn!(error = %e, slot = self.slot, "closing previous log slot failed");
            }
        }

        let opened = self
            .opener
            .open(&path)
            .and_then(|mut store| store.ensure_schema().map(|()| store));
        match opened {
            Ok(store) => {
                self.store = Some(store);
                self.slot = next;
                self.path = path;
                self.last_sequence = 0;
                Ok(())
            }
            Err(e) => {
                if let Err(reopen) = self.reopen_current() {
                    warn!(error = %reopen, slot = self.slot, "reopening current log slot failed");
                }
                Err(SqlogError::Rotation {
                    slot: next,
                    source: Box::new(e),
                })
            }
        }
    }

    /// Reopen the active slot's file without resetting it.
    fn reopen_current(&mut self) -> Result<()> {
        self.store = Some(self.opener.open(&self.path)?);
        Ok(())
    }

    /// Close the active slot. Later calls are no-ops.
    pub fn close(&mut self) -> Result<()> {
        self.closed = true;
        match self.store.take() {
            Some(store) => store.close(),
            None => Ok(()),
        }
    }

    /// Whether [`RotationManager::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Active slot id.
    pub fn slot(&self) -> u32 {
        self.slot
    }

    /// Path of the active slot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sequence number of the last row inserted into the active slot.
    pub fn last_sequence(&self) -> i64 {
        self.last_sequence
    }

    /// The last rotation failure, cleared by the next successful rotation.
    pub fn rotation_error(&self) -> Option<Arc<SqlogError>> {
        self.rotation_error.clone()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use assert_matches::assert_matches;

    use crate::store::{SqliteOpener, SqliteStore};

    const T: u64 = 1_700_000_000;

    fn touch(dir: &Path, name: &str, secs: u64) {
        let file = File::create(dir.join(name)).unwrap();
        file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
            .unwrap();
    }

    fn naming() -> SlotNaming {
        SlotNaming::new("logs", "db")
    }

    fn row() -> StoredRow<'static> {
        StoredRow {
            epoch_secs: 1,
            nanos: 0,
            level: 0,
            content: b"line\n",
        }
    }

    fn count_rows(path: &Path) -> i64 {
        SqliteStore::open(path, 5000).unwrap().row_count().unwrap()
    }

    /// While `failing` is set, fails opens of `target` (or of every file).
    struct FlakyOpener {
        failing: AtomicBool,
        target: Option<&'static str>,
    }

    impl FlakyOpener {
        fn new(target: Option<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                failing: AtomicBool::new(false),
                target,
            })
        }
    }

    impl StoreOpener for FlakyOpener {
        fn open(&self, path: &Path) -> Result<Box<dyn SlotStore>> {
            let hit = self
                .target
                .is_none_or(|t| path.file_name().is_some_and(|n| n == t));
            if hit && self.failing.load(Ordering::SeqCst) {
                return Err(SqlogError::Scan {
                    dir: path.to_path_buf(),
                    source: std::io::Error::other("disk unavailable"),
                });
            }
            SqliteOpener::default().open(path)
        }
    }

    // ── naming ──────────────────────────────────────────────────────

    #[test]
    fn file_name_follows_pattern() {
        assert_eq!(naming().file_name(0), "logs.0.db");
        assert_eq!(naming().file_name(12), "logs.12.db");
    }

    #[test]
    fn parse_accepts_only_exact_pattern() {
        let n = naming();
        assert_eq!(n.parse("logs.3.db"), Some(3));
        assert_eq!(n.parse("logs.x.db"), None);
        assert_eq!(n.parse("logs.+3.db"), None);
        assert_eq!(n.parse("logs.-1.db"), None);
        assert_eq!(n.parse("logs.3.db-wal"), None);
        assert_eq!(n.parse("logs.3.db.bak"), None);
        assert_eq!(n.parse("other.3.db"), None);
        assert_eq!(n.parse("logs.3"), None);
    }

    // ── cold start ──────────────────────────────────────────────────

    #[test]
    fn empty_dir_selects_slot_zero() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(determine_current_slot(dir.path(), &naming(), 7).unwrap(), 0);
    }

    #[test]
    fn newest_higher_slot_wins() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "logs.0.db", T);
        touch(dir.path(), "logs.1.db", T + 1);
        assert_eq!(determine_current_slot(dir.path(), &naming(), 7).unwrap(), 1);
    }

    #[test]
    fn wrap_prefers_slot_zero_on_equal_mtime() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "logs.6.db", T);
        touch(dir.path(), "logs.0.db", T);
        assert_eq!(determine_current_slot(dir.path(), &naming(), 7).unwrap(), 0);
    }

    #[test]
    fn wrapped_ring_resumes_newest_slot() {
        let dir = tempfile::tempdir().unwrap();
        // Slots 4..=6 from the previous lap, 0..=2 from the current one.
        for (i, slot) in [4, 5, 6, 0, 1, 2].iter().enumerate() {
            touch(dir.path(), &format!("logs.{slot}.db"), T + i as u64 * 10);
        }
        assert_eq!(determine_current_slot(dir.path(), &naming(), 7).unwrap(), 2);
    }

    #[test]
    fn unrelated_and_out_of_ring_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "logs.2.db", T);
        touch(dir.path(), "logs.9.db", T + 5);
        touch(dir.path(), "logs.5.txt", T + 5);
        touch(dir.path(), "notes.md", T + 5);
        std::fs::create_dir(dir.path().join("logs.4.db")).unwrap();
        assert_eq!(determine_current_slot(dir.path(), &naming(), 7).unwrap(), 2);
    }

    #[test]
    fn missing_dir_is_a_scan_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert_matches!(
            determine_current_slot(&missing, &naming(), 7),
            Err(SqlogError::Scan { .. })
        );
    }

    // ── rotation ────────────────────────────────────────────────────

    fn manager(dir: &Path, num_slots: u32, max_rows: u64) -> RotationManager {
        RotationManager::open(
            dir.to_path_buf(),
            naming(),
            num_slots,
            max_rows,
            Arc::new(SqliteOpener::default()),
        )
        .unwrap()
    }

    #[test]
    fn open_resumes_selected_slot_and_resets_it() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut m = manager(dir.path(), 7, 100);
            m.rotate().unwrap();
            m.rotate().unwrap();
            let _ = m.append(&row()).unwrap();
            m.close().unwrap();
        }
        let m = manager(dir.path(), 7, 100);
        assert_eq!(m.slot(), 2);
        assert_eq!(count_rows(m.path()), 0);
    }

    #[test]
    fn rotates_after_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let mut m = manager(dir.path(), 7, 3);
        for expected in 1..=3 {
            assert_eq!(m.append(&row()).unwrap(), expected);
        }
        assert_eq!(m.slot(), 1);
        assert_eq!(m.last_sequence(), 0);

        assert_eq!(m.append(&row()).unwrap(), 1);
        assert_eq!(m.slot(), 1);
        assert_eq!(count_rows(&dir.path().join("logs.1.db")), 1);
        assert_eq!(count_rows(&dir.path().join("logs.0.db")), 3);
    }

    #[test]
    fn full_lap_wipes_first_slot() {
        let dir = tempfile::tempdir().unwrap();
        let mut m = manager(dir.path(), 3, 2);
        for _ in 0..2 {
            let _ = m.append(&row()).unwrap();
        }
        assert_eq!(count_rows(&dir.path().join("logs.0.db")), 2);
        m.rotate().unwrap();
        m.rotate().unwrap();
        assert_eq!(m.slot(), 0);
        assert_eq!(count_rows(&dir.path().join("logs.0.db")), 0);
    }

    fn flaky_manager(dir: &Path, opener: &Arc<FlakyOpener>) -> RotationManager {
        RotationManager::open(
            dir.to_path_buf(),
            naming(),
            7,
            1,
            Arc::clone(opener) as Arc<dyn StoreOpener>,
        )
        .unwrap()
    }

    #[test]
    fn failed_rotation_keeps_current_slot_and_retries() {
        let dir = tempfile::tempdir().unwrap();
        let opener = FlakyOpener::new(Some("logs.1.db"));
        let mut m = flaky_manager(dir.path(), &opener);

        opener.failing.store(true, Ordering::SeqCst);
        assert_eq!(m.append(&row()).unwrap(), 1);
        assert_eq!(m.slot(), 0);
        assert_matches!(
            m.rotation_error().as_deref(),
            Some(SqlogError::Rotation { slot: 1, .. })
        );

        opener.failing.store(false, Ordering::SeqCst);
        assert_eq!(m.append(&row()).unwrap(), 2);
        assert_eq!(m.slot(), 1);
        assert!(m.rotation_error().is_none());
        assert_eq!(count_rows(&dir.path().join("logs.0.db")), 2);
    }

    #[test]
    fn unavailable_slot_is_reopened_on_next_append() {
        let dir = tempfile::tempdir().unwrap();
        let opener = FlakyOpener::new(None);
        let mut m = flaky_manager(dir.path(), &opener);

        opener.failing.store(true, Ordering::SeqCst);
        assert_eq!(m.append(&row()).unwrap(), 1);
        assert!(m.rotation_error().is_some());
        assert!(!m.is_closed());
        assert!(m.append(&row()).is_err());

        opener.failing.store(false, Ordering::SeqCst);
        assert_eq!(m.append(&row()).unwrap(), 2);
        assert_eq!(m.slot(), 1);
        assert_eq!(count_rows(&dir.path().join("logs.0.db")), 2);
    }

    #[test]
    fn append_after_close_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut m = manager(dir.path(), 7, 10);
        m.close().unwrap();
        assert!(m.is_closed());
        assert_matches!(m.append(&row()), Err(SqlogError::Closed));
        assert_matches!(m.rotate(), Err(SqlogError::Closed));
        m.close().unwrap();
    }
}
