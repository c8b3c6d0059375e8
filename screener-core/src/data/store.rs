//! Series cache persistence.
//!
//! Best effort: a save overwrites the whole file, and a missing or unreadable
//! file loads as an empty cache.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use super::cache::SeriesCache;
use super::provider::DataError;

pub trait CacheStore: Send {
    /// Load the stored cache. Never fails: problems yield an empty cache.
    fn load(&self) -> SeriesCache;

    fn save(&self, cache: &SeriesCache) -> Result<(), DataError>;
}

/// JSON file with atomic writes (write to .tmp, rename into place).
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CacheStore for JsonFileStore {
    fn load(&self) -> SeriesCache {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return SeriesCache::new(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to read market data, starting fresh");
                return SeriesCache::new();
            }
        };
        serde_json::from_str(&text).unwrap_or_else(|e| {
            warn!(path = %self.path.display(), error = %e, "failed to parse market data, starting fresh");
            SeriesCache::new()
        })
    }

    fn save(&self, cache: &SeriesCache) -> Result<(), DataError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| DataError::Persistence(format!("failed to create dir: {e}")))?;
        }
        let json = serde_json::to_string_pretty(cache)
            .map_err(|e| DataError::Persistence(format!("failed to serialize cache: {e}")))?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .map_err(|e| DataError::Persistence(format!("failed to write {}: {e}", tmp.display())))?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            DataError::Persistence(format!("failed to rename into {}: {e}", self.path.display()))
        })
    }
}

/// Keeps nothing. Sessions use this: their caches live only in memory.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStore;

impl CacheStore for NullStore {
    fn load(&self) -> SeriesCache {
        SeriesCache::new()
    }

    fn save(&self, _cache: &SeriesCache) -> Result<(), DataError> {
        Ok(())
    }
}
