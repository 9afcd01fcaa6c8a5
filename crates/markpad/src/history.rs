use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::store::SnapshotStore;

pub const DEFAULT_MAX_HISTORY: usize = 100;

const HISTORY_FORMAT_VERSION: u32 = 1;

/// Linear undo/redo log of full-content snapshots.
///
/// The cursor points at the snapshot matching the live buffer; `None` iff the
/// log is empty. Adjacent duplicates are coalesced, the redo tail is
/// discarded on every push, and the log is bounded by evicting from the
/// front (shifting the cursor down so the relative position is preserved).
#[derive(Debug, Clone)]
pub struct HistoryLog {
    entries: Vec<String>,
    cursor: Option<usize>,
    max_size: usize,
}

impl HistoryLog {
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: Vec::new(),
            cursor: None,
            max_size: max_size.max(1),
        }
    }

    /// Record a snapshot. Returns false when nothing changed (the snapshot
    /// equals the one under the cursor).
    pub fn push(&mut self, content: &str) -> bool {
        if let Some(cursor) = self.cursor {
            if self.entries[cursor] == content {
                return false;
            }
            // Linear timeline: everything past the cursor is gone
            self.entries.truncate(cursor + 1);
        }

        self.entries.push(content.to_string());
        let mut cursor = self.entries.len() - 1;

        if self.entries.len() > self.max_size {
            let overflow = self.entries.len() - self.max_size;
            self.entries.drain(..overflow);
            cursor -= overflow;
        }

        self.cursor = Some(cursor);
        true
    }

    pub fn undo(&mut self) -> Option<&str> {
        let cursor = self.cursor?;
        if cursor == 0 {
            return None;
        }
        self.cursor = Some(cursor - 1);
        Some(&self.entries[cursor - 1])
    }

    pub fn redo(&mut self) -> Option<&str> {
        let cursor = self.cursor?;
        if cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor = Some(cursor + 1);
        Some(&self.entries[cursor + 1])
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = None;
    }

    pub fn can_undo(&self) -> bool {
        matches!(self.cursor, Some(cursor) if cursor > 0)
    }

    pub fn can_redo(&self) -> bool {
        matches!(self.cursor, Some(cursor) if cursor + 1 < self.entries.len())
    }

    pub fn current(&self) -> Option<&str> {
        self.cursor.map(|cursor| self.entries[cursor].as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Serialized shape of the history record: `{version, entries, cursor}`,
/// cursor `-1` when empty. Blobs written before versioning existed parse
/// with the default version.
#[derive(Serialize, Deserialize)]
struct HistoryBlob {
    #[serde(default = "HistoryBlob::default_version")]
    version: u32,
    entries: Vec<String>,
    cursor: i64,
}

impl HistoryBlob {
    fn default_version() -> u32 {
        HISTORY_FORMAT_VERSION
    }
}

/// History log plus its persistence glue. Every mutation persists
/// synchronously; a store failure is logged and the in-memory mutation
/// stands (durability is best-effort).
pub struct HistoryManager {
    log: HistoryLog,
    storage_key: String,
}

impl HistoryManager {
    pub fn new(max_size: usize, storage_key: String) -> Self {
        Self {
            log: HistoryLog::new(max_size),
            storage_key,
        }
    }

    /// Restore the log from the store, falling back to an empty log on any
    /// corrupt or out-of-contract blob. When the restored log is empty and a
    /// non-empty seed is given, records the seed as the first entry.
    pub fn init(&mut self, store: &mut dyn SnapshotStore, seed: Option<&str>) {
        self.log.clear();
        match store.load(&self.storage_key) {
            Ok(Some(blob)) => {
                if let Some(log) = self.parse_blob(&blob) {
                    self.log = log;
                } else {
                    log::warn!("Discarding unusable history record, starting empty");
                }
            }
            Ok(None) => {}
            Err(e) => log::error!("Failed to load history: {}", e),
        }

        if self.log.is_empty() {
            if let Some(seed) = seed.filter(|s| !s.is_empty()) {
                self.record(seed, store);
            }
        }
    }

    fn parse_blob(&self, blob: &str) -> Option<HistoryLog> {
        let parsed: HistoryBlob = match serde_json::from_str(blob) {
            Ok(parsed) => parsed,
            Err(e) => {
                log::error!("Failed to parse history record: {}", e);
                return None;
            }
        };
        if parsed.version != HISTORY_FORMAT_VERSION {
            log::warn!("Unknown history record version {}", parsed.version);
            return None;
        }
        let cursor = match parsed.cursor {
            -1 if parsed.entries.is_empty() => None,
            c if c >= 0 && (c as usize) < parsed.entries.len() => Some(c as usize),
            c => {
                log::warn!(
                    "History cursor {} out of bounds for {} entries",
                    c,
                    parsed.entries.len()
                );
                return None;
            }
        };
        if parsed.entries.len() > self.log.max_size {
            log::warn!(
                "History record holds {} entries, limit is {}",
                parsed.entries.len(),
                self.log.max_size
            );
            return None;
        }
        Some(HistoryLog {
            entries: parsed.entries,
            cursor,
            max_size: self.log.max_size,
        })
    }

    pub fn record(&mut self, content: &str, store: &mut dyn SnapshotStore) -> bool {
        if !self.log.push(content) {
            return false;
        }
        self.persist(store);
        true
    }

    pub fn undo(&mut self, store: &mut dyn SnapshotStore) -> Option<String> {
        let snapshot = self.log.undo()?.to_string();
        self.persist(store);
        Some(snapshot)
    }

    pub fn redo(&mut self, store: &mut dyn SnapshotStore) -> Option<String> {
        let snapshot = self.log.redo()?.to_string();
        self.persist(store);
        Some(snapshot)
    }

    pub fn clear(&mut self, store: &mut dyn SnapshotStore) {
        self.log.clear();
        self.persist(store);
    }

    pub fn can_undo(&self) -> bool {
        self.log.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.log.can_redo()
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    fn persist(&self, store: &mut dyn SnapshotStore) {
        let blob = HistoryBlob {
            version: HISTORY_FORMAT_VERSION,
            entries: self.log.entries.clone(),
            cursor: self.log.cursor.map_or(-1, |cursor| cursor as i64),
        };
        let result: Result<()> = serde_json::to_string(&blob)
            .map_err(Into::into)
            .and_then(|json| store.save(&self.storage_key, &json));
        if let Err(e) = result {
            log::error!("Failed to save history: {}", e);
        }
    }
}
