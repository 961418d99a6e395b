use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};
use std::time::Duration;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, error, info, warn};

use super::disk::DiskTier;
use super::entry::CacheEntry;
use super::memory::{MemoryLookup, MemoryTier};
use super::CacheError;
use crate::maintenance::PeriodicTask;

const MB: usize = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Persistent tier directory
    pub dir: PathBuf,
    /// Memory tier ceiling in bytes (estimated)
    pub max_memory_bytes: usize,
    /// TTL used by `set` when none is given
    pub default_ttl: Duration,
    pub cleanup_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./cache/aggregated-data"),
            max_memory_bytes: 100 * MB,
            default_ttl: Duration::from_secs(7 * 24 * 60 * 60),
            cleanup_interval: Duration::from_secs(60 * 60),
        }
    }
}

impl CacheConfig {
    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = dir.into();
        self
    }

    pub fn with_max_memory_mb(mut self, mb: usize) -> Self {
        self.max_memory_bytes = mb.saturating_mul(MB);
        self
    }

    pub fn with_max_memory_bytes(mut self, bytes: usize) -> Self {
        self.max_memory_bytes = bytes;
        self
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }
}

/// Diagnostic counters for both tiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub memory_entries: usize,
    pub disk_entries: usize,
    pub memory_size_mb: f64,
    pub max_memory_mb: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub memory_removed: usize,
    pub disk_removed: usize,
}

/// Memory tier in front of a persistent gzip tier.
///
/// Every `set` goes to disk; memory only holds what fits under the ceiling.
/// Reads check memory, then disk, promoting disk hits back into memory.
#[derive(Debug)]
pub struct TieredCache {
    memory: RwLock<MemoryTier>,
    disk: DiskTier,
    config: CacheConfig,
}

impl TieredCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            memory: RwLock::new(MemoryTier::new(config.max_memory_bytes)),
            disk: DiskTier::new(config.dir.clone()),
            config,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn memory(&self) -> RwLockWriteGuard<'_, MemoryTier> {
        self.memory.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Typed read. A stored value that does not decode as `T` is a miss.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get_value(key).await?;
        match serde_json::from_value(value) {
            Ok(typed) => Some(typed),
            Err(err) => {
                warn!(key, error = %err, "cached value has unexpected shape; treating as miss");
                None
            }
        }
    }

    pub async fn get_value(&self, key: &str) -> Option<JsonValue> {
        let now = Utc::now();

        // Fast path takes only the read lock.
        {
            let memory = self.memory.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(value) = memory.peek(key, now) {
                debug!(key, "cache hit (memory)");
                return Some(value.clone());
            }
        }
        if let MemoryLookup::Hit(value) = self.memory().lookup(key, now) {
            return Some(value);
        }

        let entry = match self.disk.read(key).await {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                debug!(key, "cache miss");
                return None;
            }
            Err(err) => {
                warn!(key, error = %err, "cache disk read failed; treating as miss");
                return None;
            }
        };

        if entry.key != key {
            debug!(key, stored = %entry.key, "cache file belongs to another key");
            return None;
        }

        let now = Utc::now();
        if entry.is_expired_at(now) {
            debug!(key, "cache entry expired on disk");
            if let Err(err) = self.disk.remove_expired(key, now).await {
                warn!(key, error = %err, "failed to remove expired cache file");
            }
            return None;
        }

        let value = entry.value.clone();
        let size = entry.estimated_size();
        if !self.memory().admit(entry, size) {
            debug!(key, size, "promotion skipped; memory tier full");
        }
        debug!(key, "cache hit (disk)");
        Some(value)
    }

    /// Typed write; `ttl` defaults to `config.default_ttl`.
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let value = serde_json::to_value(value).map_err(CacheError::Serialize)?;
        self.set_value(key, value, ttl).await
    }

    /// Fails only when neither tier took the entry.
    pub async fn set_value(
        &self,
        key: &str,
        value: JsonValue,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let entry = CacheEntry::new(key, value, ttl.unwrap_or(self.config.default_ttl));
        let size = entry.estimated_size();

        let admitted = self.memory().admit(entry.clone(), size);
        if !admitted {
            info!(key, size, "memory tier full; entry stored on disk only");
        }

        match self.disk.write(&entry).await {
            Ok(()) => Ok(()),
            Err(err) if admitted => {
                warn!(key, error = %err, "cache disk write failed; entry held in memory only");
                Ok(())
            }
            Err(err) => {
                error!(key, error = %err, "cache write failed on both tiers");
                Err(CacheError::Unavailable {
                    key: key.to_string(),
                })
            }
        }
    }

    /// Remove `key` from both tiers. Missing keys are fine.
    pub async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.memory().remove(key);
        self.disk.remove(key).await?;
        debug!(key, "cache entry deleted");
        Ok(())
    }

    pub async fn clear(&self) -> Result<(), CacheError> {
        self.memory().clear();
        let removed = self.disk.clear().await?;
        info!(disk_removed = removed, "cache cleared");
        Ok(())
    }

    /// Drop expired entries from both tiers.
    pub async fn cleanup(&self) -> CleanupReport {
        let now = Utc::now();
        let memory_removed = self.memory().sweep(now);
        let disk_removed = match self.disk.sweep(now).await {
            Ok(n) => n,
            Err(err) => {
                warn!(error = %err, "cache disk sweep failed");
                0
            }
        };

        let report = CleanupReport {
            memory_removed,
            disk_removed,
        };
        if memory_removed + disk_removed > 0 {
            info!(memory_removed, disk_removed, "cache cleanup");
        }
        report
    }

    pub async fn stats(&self) -> Result<CacheStats, CacheError> {
        let (memory_entries, used, max) = {
            let memory = self.memory.read().unwrap_or_else(PoisonError::into_inner);
            (memory.len(), memory.used_bytes(), memory.max_bytes())
        };
        Ok(CacheStats {
            memory_entries,
            disk_entries: self.disk.count().await?,
            memory_size_mb: to_mb(used),
            max_memory_mb: to_mb(max),
        })
    }

    /// Run [`cleanup`](Self::cleanup) every `config.cleanup_interval`.
    pub fn spawn_cleanup(self: &Arc<Self>) -> PeriodicTask {
        let cache = Arc::clone(self);
        PeriodicTask::spawn("cache-cleanup", self.config.cleanup_interval, move || {
            let cache = cache.clone();
            async move {
                cache.cleanup().await;
            }
        })
    }
}

fn to_mb(bytes: usize) -> f64 {
    (bytes as f64 / MB as f64 * 100.0).round() / 100.0
}
