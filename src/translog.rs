//! Persistent transition log.
//!
//! Stores the last 50 fan-controller transitions in an NVS ring buffer
//! under the "translog" namespace, one postcard blob per slot plus a
//! persisted write cursor.  The ring survives reboots; the cursor is
//! committed right after each entry, so an unclean power-down loses at
//! most the entry being written.
//!
//! The log is advisory.  Every operation is best-effort: callers receive
//! a typed [`StorageError`] they are free to ignore, and a store that
//! cannot be opened degrades logging to a no-op without affecting
//! control decisions.

use core::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::app::ports::StoragePort;
use crate::error::StorageError;

/// Ring capacity — the bounded decision history kept across power cycles.
pub const LOG_CAPACITY: usize = 50;

const LOG_NAMESPACE: &str = "translog";
const INDEX_KEY: &str = "idx";
/// Upper bound on a serialized entry ("IDLE (from WAITING)" plus fields).
const MAX_ENTRY_BYTES: usize = 64;

// ---------------------------------------------------------------------------
// Log entry
// ---------------------------------------------------------------------------

/// One recorded transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Uptime at the moment of the transition, seconds since boot.
    /// Restarts at zero on every power cycle: entries that survived a
    /// reboot keep the uptime of the boot session that wrote them.
    pub up_seconds: u32,
    /// Transition label ("COOLING", "IDLE (from FORCE)", ...).
    pub label: heapless::String<24>,
    /// Relative humidity (%) at the moment of the transition.
    pub humidity_pct: f32,
}

impl LogEntry {
    pub fn new(up_seconds: u32, label: &str, humidity_pct: f32) -> Self {
        let mut l = heapless::String::new();
        let _ = l.push_str(&label[..label.len().min(24)]);
        Self {
            up_seconds,
            label: l,
            humidity_pct,
        }
    }

    /// Render the fixed log line: `HH:MM:SS: <label> [<hum>%]`.
    /// The timestamp is uptime of the writing boot session, not wall time.
    pub fn format_line(&self) -> heapless::String<48> {
        let hours = self.up_seconds / 3600;
        let mins = (self.up_seconds % 3600) / 60;
        let secs = self.up_seconds % 60;

        let mut line = heapless::String::new();
        // Truncation on overflow is deterministic and non-fatal: write!
        // into a heapless::String drops what does not fit.
        let _ = write!(
            line,
            "{:02}:{:02}:{:02}: {} [{:.1}%]",
            hours, mins, secs, self.label, self.humidity_pct
        );
        line
    }
}

// ---------------------------------------------------------------------------
// Ring buffer over the storage port
// ---------------------------------------------------------------------------

/// NVS-backed ring buffer of [`LogEntry`] blobs.
#[derive(Default)]
pub struct TransitionLog {
    next_index: usize,
}

impl TransitionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the write cursor from storage, or default to 0.
    /// A missing or short cursor blob is treated as an empty history.
    pub fn init(&mut self, store: &dyn StoragePort) {
        let mut buf = [0u8; 4];
        if let Ok(4) = store.read(LOG_NAMESPACE, INDEX_KEY, &mut buf) {
            self.next_index = u32::from_le_bytes(buf) as usize % LOG_CAPACITY;
        }
    }

    /// Append a transition at the current cursor, overwriting the oldest
    /// surviving entry, then advance and persist the cursor.
    ///
    /// Best-effort: the caller may ignore the result — a failed append
    /// leaves the control logic untouched and the previous history intact.
    pub fn append(
        &mut self,
        store: &mut dyn StoragePort,
        label: &str,
        humidity_pct: f32,
        now_us: u64,
    ) -> Result<(), StorageError> {
        let entry = LogEntry::new((now_us / 1_000_000) as u32, label, humidity_pct);

        let mut buf = [0u8; MAX_ENTRY_BYTES];
        let bytes = postcard::to_slice(&entry, &mut buf).map_err(|_| StorageError::IoError)?;
        store.write(LOG_NAMESPACE, &Self::slot_key(self.next_index), bytes)?;

        // Entry first, cursor second: if the cursor write is lost, the
        // next boot re-writes this slot and the ring stays consistent.
        self.next_index = (self.next_index + 1) % LOG_CAPACITY;
        let idx_bytes = (self.next_index as u32).to_le_bytes();
        store.write(LOG_NAMESPACE, INDEX_KEY, &idx_bytes)?;
        Ok(())
    }

    /// Read every stored entry, oldest-available to newest.
    ///
    /// Slots that are missing or fail to decode are skipped — a corrupt
    /// slot is an absent piece of history, never an error to the caller.
    pub fn load_all(&self, store: &dyn StoragePort) -> heapless::Vec<LogEntry, LOG_CAPACITY> {
        let mut entries = heapless::Vec::new();
        // The slot at the cursor is the oldest surviving entry.
        for offset in 0..LOG_CAPACITY {
            let slot = (self.next_index + offset) % LOG_CAPACITY;
            let mut buf = [0u8; MAX_ENTRY_BYTES];
            if let Ok(len) = store.read(LOG_NAMESPACE, &Self::slot_key(slot), &mut buf) {
                if let Ok(entry) = postcard::from_bytes::<LogEntry>(&buf[..len]) {
                    let _ = entries.push(entry);
                }
            }
        }
        entries
    }

    /// Erase all entries and reset the cursor.
    pub fn clear(&mut self, store: &mut dyn StoragePort) {
        for slot in 0..LOG_CAPACITY {
            let _ = store.delete(LOG_NAMESPACE, &Self::slot_key(slot));
        }
        let _ = store.delete(LOG_NAMESPACE, INDEX_KEY);
        self.next_index = 0;
    }

    /// Number of populated slots.
    pub fn count(&self, store: &dyn StoragePort) -> usize {
        (0..LOG_CAPACITY)
            .filter(|slot| store.exists(LOG_NAMESPACE, &Self::slot_key(*slot)))
            .count()
    }

    fn slot_key(index: usize) -> heapless::String<8> {
        let mut s = heapless::String::new();
        let _ = write!(s, "e{}", index);
        s
    }
}

/// Newest-first window over entries returned by [`TransitionLog::load_all`],
/// skipping the `scroll` most recent — the presentation layer's history view.
pub fn recent(entries: &[LogEntry], scroll: usize) -> impl Iterator<Item = &LogEntry> {
    entries.iter().rev().skip(scroll)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use std::collections::HashMap;

    struct MockStorage {
        data: HashMap<String, Vec<u8>>,
    }

    impl MockStorage {
        fn new() -> Self {
            Self {
                data: HashMap::new(),
            }
        }
    }

    impl StoragePort for MockStorage {
        fn read(&self, ns: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
            let k = format!("{ns}::{key}");
            match self.data.get(&k) {
                Some(v) => {
                    let len = v.len().min(buf.len());
                    buf[..len].copy_from_slice(&v[..len]);
                    Ok(len)
                }
                None => Err(StorageError::NotFound),
            }
        }

        fn write(&mut self, ns: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
            let k = format!("{ns}::{key}");
            self.data.insert(k, data.to_vec());
            Ok(())
        }

        fn delete(&mut self, ns: &str, key: &str) -> Result<(), StorageError> {
            let k = format!("{ns}::{key}");
            self.data.remove(&k);
            Ok(())
        }

        fn exists(&self, ns: &str, key: &str) -> bool {
            let k = format!("{ns}::{key}");
            self.data.contains_key(&k)
        }
    }

    fn secs(s: u32) -> u64 {
        u64::from(s) * 1_000_000
    }

    #[test]
    fn starts_empty() {
        let store = MockStorage::new();
        let log = TransitionLog::new();
        assert_eq!(log.count(&store), 0);
        assert!(log.load_all(&store).is_empty());
    }

    #[test]
    fn append_and_read_single_entry() {
        let mut store = MockStorage::new();
        let mut log = TransitionLog::new();

        log.append(&mut store, "COOLING", 75.5, secs(42)).unwrap();
        let entries = log.load_all(&store);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].up_seconds, 42);
        assert_eq!(entries[0].label.as_str(), "COOLING");
        assert!((entries[0].humidity_pct - 75.5).abs() < 0.01);
    }

    #[test]
    fn ring_keeps_only_newest_fifty() {
        let mut store = MockStorage::new();
        let mut log = TransitionLog::new();

        for i in 0..55u32 {
            log.append(&mut store, "WAITING", i as f32, secs(i)).unwrap();
        }

        let entries = log.load_all(&store);
        assert_eq!(entries.len(), LOG_CAPACITY);
        // Oldest five overwritten; survivors are 5..=54, in write order,
        // none duplicated.
        for (pos, entry) in entries.iter().enumerate() {
            assert_eq!(entry.up_seconds, 5 + pos as u32);
        }
    }

    #[test]
    fn cursor_survives_reinit() {
        let mut store = MockStorage::new();
        let mut log = TransitionLog::new();
        for i in 0..3u32 {
            log.append(&mut store, "COOLING", 80.0, secs(i)).unwrap();
        }

        // Simulated reboot: a fresh instance picks up the persisted cursor
        // and keeps appending where the old one stopped.
        let mut log2 = TransitionLog::new();
        log2.init(&store);
        log2.append(&mut store, "WAITING", 60.0, secs(99)).unwrap();

        let entries = log2.load_all(&store);
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[3].up_seconds, 99);
    }

    #[test]
    fn corrupt_slot_is_skipped() {
        let mut store = MockStorage::new();
        let mut log = TransitionLog::new();
        for i in 0..3u32 {
            log.append(&mut store, "COOLING", 80.0, secs(i)).unwrap();
        }
        store
            .write(LOG_NAMESPACE, "e1", &[0xFF, 0xFF, 0xFF])
            .unwrap();

        let entries = log.load_all(&store);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].up_seconds, 0);
        assert_eq!(entries[1].up_seconds, 2);
    }

    #[test]
    fn clear_erases_everything() {
        let mut store = MockStorage::new();
        let mut log = TransitionLog::new();
        log.append(&mut store, "COOLING", 71.0, secs(1)).unwrap();
        log.append(&mut store, "WAITING", 60.0, secs(2)).unwrap();

        log.clear(&mut store);
        assert_eq!(log.count(&store), 0);
        assert!(log.load_all(&store).is_empty());
    }

    #[test]
    fn long_label_is_truncated() {
        let entry = LogEntry::new(0, "THIS LABEL IS FAR TOO LONG TO STORE", 50.0);
        assert!(entry.label.len() <= 24);
    }

    #[test]
    fn format_line_renders_uptime_and_humidity() {
        let entry = LogEntry::new(3 * 3600 + 25 * 60 + 7, "COOLING", 82.4);
        assert_eq!(entry.format_line().as_str(), "03:25:07: COOLING [82.4%]");
    }

    #[test]
    fn format_line_boot_entry() {
        let entry = LogEntry::new(0, "FSM initialized", 0.0);
        assert_eq!(
            entry.format_line().as_str(),
            "00:00:00: FSM initialized [0.0%]"
        );
    }

    #[test]
    fn recent_is_newest_first_with_scroll() {
        let mut store = MockStorage::new();
        let mut log = TransitionLog::new();
        for i in 0..5u32 {
            log.append(&mut store, "WAITING", 60.0, secs(i)).unwrap();
        }
        let entries = log.load_all(&store);

        let newest: Vec<u32> = recent(&entries, 0).map(|e| e.up_seconds).collect();
        assert_eq!(newest, vec![4, 3, 2, 1, 0]);

        let scrolled: Vec<u32> = recent(&entries, 2).map(|e| e.up_seconds).collect();
        assert_eq!(scrolled, vec![2, 1, 0]);
    }
}
