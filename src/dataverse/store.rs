//! Cache storage for schema metadata and access tokens.
//!
//! Nothing here locks: two processes refreshing the same cache directory at
//! the same time may interleave their writes. The last writer wins.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

use crate::error::DataverseError;

const CACHE_DIR_NAME: &str = "dataverse-bulk-load";
const FALLBACK_CACHE_DIR: &str = "_cache";

/// Keyed blob storage with modification times.
pub trait CacheStore {
    /// Contents stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>, DataverseError>;

    /// Replace the contents stored under `key`.
    fn put(&self, key: &str, contents: &str) -> Result<(), DataverseError>;

    /// When `key` was last written.
    fn modified(&self, key: &str) -> Option<DateTime<Utc>>;

    /// True if `key` exists and was written less than `max_age` ago.
    fn is_fresh(&self, key: &str, max_age: Duration) -> bool {
        match self.modified(key) {
            Some(modified) => Utc::now() - modified < max_age,
            None => false,
        }
    }
}

/// One file per key inside a cache directory.
#[derive(Debug, Clone)]
pub struct FileCacheStore {
    dir: PathBuf,
}

impl FileCacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Platform cache directory, or `./_cache` when the platform has none.
    pub fn default_location() -> Self {
        match dirs::cache_dir() {
            Some(dir) => Self::new(dir.join(CACHE_DIR_NAME)),
            None => Self::new(FALLBACK_CACHE_DIR),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl CacheStore for FileCacheStore {
    fn get(&self, key: &str) -> Result<Option<String>, DataverseError> {
        let path = self.path(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    fn put(&self, key: &str, contents: &str) -> Result<(), DataverseError> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path(key), contents)?;
        Ok(())
    }

    fn modified(&self, key: &str) -> Option<DateTime<Utc>> {
        let modified = fs::metadata(self.path(key)).ok()?.modified().ok()?;
        Some(DateTime::<Utc>::from(modified))
    }
}

/// In-process store, used by tests and by callers that never want disk I/O.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: Mutex<HashMap<String, (String, DateTime<Utc>)>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `contents` as if it had been written at `modified`.
    pub fn insert_at(&self, key: &str, contents: &str, modified: DateTime<Utc>) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), (contents.to_string(), modified));
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .lock()
            .map(|entries| entries.contains_key(key))
            .unwrap_or(false)
    }
}

impl CacheStore for MemoryCacheStore {
    fn get(&self, key: &str) -> Result<Option<String>, DataverseError> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| DataverseError::Cache(e.to_string()))?;
        Ok(entries.get(key).map(|(contents, _)| contents.clone()))
    }

    fn put(&self, key: &str, contents: &str) -> Result<(), DataverseError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| DataverseError::Cache(e.to_string()))?;
        entries.insert(key.to_string(), (contents.to_string(), Utc::now()));
        Ok(())
    }

    fn modified(&self, key: &str) -> Option<DateTime<Utc>> {
        let entries = self.entries.lock().ok()?;
        entries.get(key).map(|(_, modified)| *modified)
    }
}
