use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;

use super::entry::CacheEntry;

/// Outcome of a memory-tier lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum MemoryLookup {
    Hit(JsonValue),
    /// Present but stale; already evicted by the lookup.
    Expired,
    Miss,
}

/// Bounded in-memory tier.
///
/// Tracks an estimated byte total; entries that would push it past
/// `max_bytes` are refused rather than evicting others.
#[derive(Debug)]
pub struct MemoryTier {
    entries: HashMap<String, Slot>,
    used_bytes: usize,
    max_bytes: usize,
}

#[derive(Debug)]
struct Slot {
    entry: CacheEntry,
    size: usize,
}

impl MemoryTier {
    pub fn new(max_bytes: usize) -> Self {
        Self {
            entries: HashMap::new(),
            used_bytes: 0,
            max_bytes,
        }
    }

    pub fn lookup(&mut self, key: &str, now: DateTime<Utc>) -> MemoryLookup {
        match self.entries.get(key) {
            None => return MemoryLookup::Miss,
            Some(slot) if !slot.entry.is_expired_at(now) => {
                return MemoryLookup::Hit(slot.entry.value.clone());
            }
            Some(_) => {}
        }
        self.remove(key);
        MemoryLookup::Expired
    }

    /// Peek without evicting; `None` for missing or expired keys.
    pub fn peek(&self, key: &str, now: DateTime<Utc>) -> Option<&JsonValue> {
        self.entries
            .get(key)
            .filter(|slot| !slot.entry.is_expired_at(now))
            .map(|slot| &slot.entry.value)
    }

    /// Insert or replace. Returns `false` when the entry does not fit.
    ///
    /// A refused replacement still drops the old value so the tier never
    /// serves something older than the persistent tier.
    pub fn admit(&mut self, entry: CacheEntry, size: usize) -> bool {
        self.remove(&entry.key);
        if self.used_bytes.saturating_add(size) > self.max_bytes {
            return false;
        }
        self.used_bytes += size;
        self.entries.insert(entry.key.clone(), Slot { entry, size });
        true
    }

    pub fn remove(&mut self, key: &str) -> bool {
        match self.entries.remove(key) {
            Some(slot) => {
                self.used_bytes -= slot.size;
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.used_bytes = 0;
    }

    /// Drop every expired entry; returns how many went.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        let mut freed = 0;
        self.entries.retain(|_, slot| {
            let keep = !slot.entry.is_expired_at(now);
            if !keep {
                freed += slot.size;
            }
            keep
        });
        self.used_bytes -= freed;
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn used_bytes(&self) -> usize {
        self.used_bytes
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }
}
