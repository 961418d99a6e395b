//! Two-tier cache: bounded memory in front of a gzip-compressed directory.
//!
//! Expiry is enforced on every read; the periodic cleanup only reclaims
//! space. Persistent-tier read failures degrade to a miss.

mod disk;
mod entry;
mod memory;
mod store;

use std::fmt::Display;
use std::path::{Path, PathBuf};

pub use disk::DiskTier;
pub use entry::{CacheEntry, FILE_SUFFIX, file_name, sanitize_key};
pub use memory::{MemoryLookup, MemoryTier};
pub use store::{CacheConfig, CacheStats, CleanupReport, TieredCache};

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize cache value: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("unreadable cache file {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("gzip compression failed: {0}")]
    Compression(#[source] std::io::Error),

    /// Neither tier accepted the write.
    #[error("cache unavailable for key {key}")]
    Unavailable { key: String },
}

impl CacheError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn decode(path: &Path, reason: impl Display) -> Self {
        Self::Decode {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}
