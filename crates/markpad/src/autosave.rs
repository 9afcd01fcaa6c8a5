use anyhow::Result;
use std::time::{Duration, Instant};

use crate::store::SnapshotStore;

pub const DEFAULT_AUTOSAVE_INTERVAL: Duration = Duration::from_secs(30);

/// Interval-driven background persistence of the `content` record. Saves
/// only when the content changed since the last successful save; background
/// failures are logged, never surfaced.
pub struct Autosave {
    interval: Duration,
    next_due: Instant,
    last_saved: Option<String>,
}

impl Autosave {
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            next_due: now + interval,
            last_saved: None,
        }
    }

    /// Silent periodic save. Returns true when a write actually happened.
    pub fn tick(
        &mut self,
        now: Instant,
        content: &str,
        store: &mut dyn SnapshotStore,
        key: &str,
    ) -> bool {
        if now < self.next_due {
            return false;
        }
        self.next_due = now + self.interval;
        match self.write(content, store, key) {
            Ok(saved) => saved,
            Err(e) => {
                log::error!("Autosave failed: {}", e);
                false
            }
        }
    }

    /// Save unless the content is unchanged since the last save. Returns
    /// `Ok(false)` for the unchanged no-op case.
    pub fn write(
        &mut self,
        content: &str,
        store: &mut dyn SnapshotStore,
        key: &str,
    ) -> Result<bool> {
        if self.last_saved.as_deref() == Some(content) {
            return Ok(false);
        }
        store.save(key, content)?;
        self.last_saved = Some(content.to_string());
        Ok(true)
    }

    /// Tell the autosaver the given content is already durable (used after
    /// loading persisted content so it is not immediately rewritten).
    pub fn mark_saved(&mut self, content: &str) {
        self.last_saved = Some(content.to_string());
    }
}
