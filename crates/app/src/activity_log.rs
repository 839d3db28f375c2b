//! Activity log — process-wide, capacity-bounded record of what happened.
//!
//! Readers and writers share one instance behind an `Arc`; every operation
//! takes the inner lock for the shortest possible time and never blocks on
//! I/O. Persistence is handled by the engine through the
//! [`ActivityLogStore`](crate::ports::ActivityLogStore) port.

use std::collections::VecDeque;
use std::sync::{PoisonError, RwLock};

use chrono::Duration;
use idlewatch_domain::activity::{ExportFormat, LogEntry};
use idlewatch_domain::error::LogFormatError;
use idlewatch_domain::time::Timestamp;

/// FIFO log that evicts its oldest entry once full.
#[derive(Debug)]
pub struct ActivityLog {
    entries: RwLock<VecDeque<LogEntry>>,
    capacity: usize,
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

impl ActivityLog {
    pub const DEFAULT_CAPACITY: usize = 1000;

    /// Create an empty log holding at most `capacity` entries (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: RwLock::new(VecDeque::with_capacity(capacity.min(Self::DEFAULT_CAPACITY))),
            capacity,
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append an entry, evicting the oldest when full.
    pub fn add_entry(&self, entry: LogEntry) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        push_bounded(&mut entries, entry, self.capacity);
    }

    /// Append several entries in order, returning how many were added.
    pub fn extend(&self, new_entries: impl IntoIterator<Item = LogEntry>) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let mut added = 0;
        for entry in new_entries {
            push_bounded(&mut entries, entry, self.capacity);
            added += 1;
        }
        added
    }

    /// Every entry, oldest first.
    #[must_use]
    pub fn get_all(&self) -> Vec<LogEntry> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.iter().cloned().collect()
    }

    /// Entries whose reason, action or details contain `query`
    /// (case-insensitive). A blank query returns everything.
    #[must_use]
    pub fn get_filtered(&self, query: &str) -> Vec<LogEntry> {
        let query = query.trim();
        if query.is_empty() {
            return self.get_all();
        }
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.iter().filter(|e| e.matches(query)).cloned().collect()
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Encode every entry in `format`.
    ///
    /// # Errors
    ///
    /// Returns [`LogFormatError`] if encoding fails.
    pub fn export(&self, format: ExportFormat) -> Result<String, LogFormatError> {
        format.encode(&self.get_all())
    }

    /// Parse `text` in `format` and append the entries.
    ///
    /// Nothing is appended when any part of `text` is invalid.
    ///
    /// # Errors
    ///
    /// Returns [`LogFormatError`] when `text` does not parse.
    pub fn import(&self, format: ExportFormat, text: &str) -> Result<usize, LogFormatError> {
        let parsed = format.decode(text)?;
        Ok(self.extend(parsed))
    }

    /// Drop entries older than `days` days before `now`; returns how many.
    pub fn prune_older_than(&self, days: u32, now: Timestamp) -> usize {
        let cutoff = now - Duration::days(i64::from(days));
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|e| e.timestamp >= cutoff);
        before - entries.len()
    }
}

fn push_bounded(entries: &mut VecDeque<LogEntry>, entry: LogEntry, capacity: usize) {
    while entries.len() >= capacity {
        entries.pop_front();
    }
    entries.push_back(entry);
}
