//! Persistent tier: one gzip-compressed JSON file per key.

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tokio::fs;
use tracing::{debug, warn};

use super::entry::{CacheEntry, FILE_SUFFIX, file_name};
use super::CacheError;

#[derive(Debug, Clone)]
pub struct DiskTier {
    dir: PathBuf,
}

impl DiskTier {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(file_name(key))
    }

    /// Read the file for `key`. `Ok(None)` when there is no file.
    ///
    /// The returned entry may be expired or belong to a colliding key;
    /// callers decide what to do with it.
    pub async fn read(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let path = self.path_for(key);
        match fs::read(&path).await {
            Ok(bytes) => decode(&path, &bytes).map(Some),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(CacheError::io(&path, err)),
        }
    }

    /// Write via a temp file and rename so readers never see a partial file.
    pub async fn write(&self, entry: &CacheEntry) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|err| CacheError::io(&self.dir, err))?;

        let bytes = encode(entry)?;
        let path = self.path_for(&entry.key);
        let tmp = self
            .dir
            .join(format!(".{}.{}.tmp", file_name(&entry.key), uuid::Uuid::now_v7()));

        fs::write(&tmp, &bytes)
            .await
            .map_err(|err| CacheError::io(&tmp, err))?;
        if let Err(err) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(CacheError::io(&path, err));
        }

        debug!(key = %entry.key, bytes = bytes.len(), "cache entry persisted");
        Ok(())
    }

    /// Remove the file for `key`; `Ok(false)` when it did not exist.
    pub async fn remove(&self, key: &str) -> Result<bool, CacheError> {
        remove_path(&self.path_for(key)).await
    }

    /// Remove the file for `key` only if the copy on disk now is expired or
    /// unreadable. A fresh entry written after the caller's read is kept.
    pub async fn remove_expired(&self, key: &str, now: DateTime<Utc>) -> Result<bool, CacheError> {
        let path = self.path_for(key);
        let stale = match fs::read(&path).await {
            Ok(bytes) => decode(&path, &bytes).map_or(true, |entry| entry.is_expired_at(now)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(err) => return Err(CacheError::io(&path, err)),
        };
        if stale {
            remove_path(&path).await
        } else {
            Ok(false)
        }
    }

    /// Remove every cache file. Returns how many were removed.
    pub async fn clear(&self) -> Result<usize, CacheError> {
        let mut removed = 0;
        for path in self.cache_files().await? {
            if remove_path(&path).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Remove expired entries and files that no longer decode.
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<usize, CacheError> {
        let mut removed = 0;
        for path in self.cache_files().await? {
            let stale = match fs::read(&path).await {
                Ok(bytes) => match decode(&path, &bytes) {
                    Ok(entry) => entry.is_expired_at(now),
                    Err(err) => {
                        warn!(path = %path.display(), error = %err, "removing corrupt cache file");
                        true
                    }
                },
                // Raced with a delete.
                Err(err) if err.kind() == io::ErrorKind::NotFound => false,
                Err(err) => return Err(CacheError::io(&path, err)),
            };

            if stale && remove_path(&path).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Number of cache files on disk.
    pub async fn count(&self) -> Result<usize, CacheError> {
        Ok(self.cache_files().await?.len())
    }

    async fn cache_files(&self) -> Result<Vec<PathBuf>, CacheError> {
        let mut dir = match fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(CacheError::io(&self.dir, err)),
        };

        let mut files = Vec::new();
        while let Some(item) = dir
            .next_entry()
            .await
            .map_err(|err| CacheError::io(&self.dir, err))?
        {
            let path = item.path();
            let is_cache_file = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.ends_with(FILE_SUFFIX) && !name.starts_with('.'));
            if is_cache_file {
                files.push(path);
            }
        }
        Ok(files)
    }
}

async fn remove_path(path: &Path) -> Result<bool, CacheError> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(CacheError::io(path, err)),
    }
}

fn encode(entry: &CacheEntry) -> Result<Vec<u8>, CacheError> {
    let json = serde_json::to_vec(entry).map_err(CacheError::Serialize)?;
    let mut encoder = GzEncoder::new(Vec::with_capacity((json.len() / 4).max(256)), Compression::default());
    encoder.write_all(&json).map_err(CacheError::Compression)?;
    encoder.finish().map_err(CacheError::Compression)
}

fn decode(path: &Path, bytes: &[u8]) -> Result<CacheEntry, CacheError> {
    let mut decoder = GzDecoder::new(bytes);
    let mut json = Vec::new();
    decoder
        .read_to_end(&mut json)
        .map_err(|err| CacheError::decode(path, err))?;
    serde_json::from_slice(&json).map_err(|err| CacheError::decode(path, err))
}
