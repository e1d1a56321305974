//! Response cache for persisting API responses to disk
//!
//! Provides a `ResponseCache` that stores serializable payloads as JSON files
//! named by the request fingerprint. Entries expire lazily: a stale file stays
//! on disk and is simply reported as a miss until it is overwritten or cleared.

use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::fingerprint::{fingerprint, QueryParams};
use super::CacheError;

/// Extension of entry files inside the cache directory
const ENTRY_EXTENSION: &str = "json";

/// Extension of partially written entries
const TMP_EXTENSION: &str = "tmp";

/// Wrapper struct for cached data stored on disk
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry<T> {
    /// When the data was cached
    stored_at: DateTime<Utc>,
    /// The cached data
    data: T,
}

/// Caches decoded responses of idempotent requests on disk
///
/// One cache is built at startup and handed to every client that needs it.
/// Cloning is cheap; clones share the same directory.
#[derive(Debug, Clone)]
pub struct ResponseCache {
    /// Directory where cache files are stored
    cache_dir: PathBuf,
    /// Validity window; `None` means entries never go stale
    expiration: Option<Duration>,
}

impl ResponseCache {
    /// Creates a cache in `cache_dir` whose entries stay fresh for `expiration_hours`
    ///
    /// The directory is created on the first write, not here. A number of
    /// hours too large for a `Duration` means entries never expire.
    pub fn new(cache_dir: impl Into<PathBuf>, expiration_hours: u64) -> Self {
        let expiration = i64::try_from(expiration_hours)
            .ok()
            .and_then(Duration::try_hours);
        if expiration.is_none() {
            warn!(
                "Cache expiration of {} hours is out of range; entries will not expire",
                expiration_hours
            );
        }
        Self {
            cache_dir: cache_dir.into(),
            expiration,
        }
    }

    /// Creates a cache whose entries never expire
    pub fn without_expiry(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            expiration: None,
        }
    }

    /// Directory holding the entry files
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Validity window of an entry, if any
    pub fn expiration(&self) -> Option<Duration> {
        self.expiration
    }

    /// Returns the path to the entry file for a fingerprint
    fn entry_path(&self, key: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.{}", key, ENTRY_EXTENSION))
    }

    /// Ensures the cache directory exists
    fn ensure_dir(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.cache_dir)
    }

    /// Reads the payload stored for a request, if present and fresh
    ///
    /// Returns `None` when the entry is missing, expired, unreadable or cannot
    /// be decoded as `T`. It never fetches anything itself.
    pub fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: Option<&QueryParams>,
    ) -> Option<T> {
        self.get_at(endpoint, params, Utc::now())
    }

    /// Same as [`ResponseCache::get`] with an explicit notion of "now"
    pub fn get_at<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: Option<&QueryParams>,
        now: DateTime<Utc>,
    ) -> Option<T> {
        let key = fingerprint(endpoint, params);

        let entry = match self.read_entry::<T>(&key) {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(e) => {
                warn!("Error loading cache: {}", e);
                return None;
            }
        };

        if let Some(expiration) = self.expiration {
            if now - entry.stored_at >= expiration {
                info!("Cache expired for {}", endpoint);
                return None;
            }
        }

        Some(entry.data)
    }

    /// Stores a payload for a request, overwriting any previous entry
    ///
    /// Returns `false` if the entry could not be written. The failure is
    /// logged; it is never propagated to the caller.
    pub fn set<T: Serialize>(
        &self,
        endpoint: &str,
        params: Option<&QueryParams>,
        data: &T,
    ) -> bool {
        self.set_at(endpoint, params, data, Utc::now())
    }

    /// Same as [`ResponseCache::set`] with an explicit write timestamp
    pub fn set_at<T: Serialize>(
        &self,
        endpoint: &str,
        params: Option<&QueryParams>,
        data: &T,
        now: DateTime<Utc>,
    ) -> bool {
        let key = fingerprint(endpoint, params);
        let entry = CacheEntry {
            stored_at: now,
            data,
        };

        match self.write_entry(&key, &entry) {
            Ok(()) => true,
            Err(e) => {
                warn!("Error saving cache: {}", e);
                false
            }
        }
    }

    /// Removes cached entries
    ///
    /// With an endpoint, removes only the entry for that request and returns
    /// whether one existed. Without one, removes every entry and returns `true`.
    pub fn clear(&self, endpoint: Option<&str>, params: Option<&QueryParams>) -> bool {
        match endpoint {
            Some(endpoint) => {
                let path = self.entry_path(&fingerprint(endpoint, params));
                match fs::remove_file(&path) {
                    Ok(()) => {
                        debug!("Cache entry removed for {}", endpoint);
                        true
                    }
                    Err(e) if e.kind() == ErrorKind::NotFound => false,
                    Err(e) => {
                        warn!("Error removing cache entry {:?}: {}", path, e);
                        false
                    }
                }
            }
            None => {
                let mut removed = 0usize;
                for path in self.paths_with_extension(&[ENTRY_EXTENSION, TMP_EXTENSION]) {
                    match fs::remove_file(&path) {
                        Ok(()) => removed += 1,
                        Err(e) => warn!("Error removing cache entry {:?}: {}", path, e),
                    }
                }
                info!("Cache cleared ({} entries)", removed);
                true
            }
        }
    }

    /// Number of entry files on disk, fresh or stale
    pub fn len(&self) -> usize {
        self.entry_paths().len()
    }

    /// Whether the cache holds no entry files
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lists entry files in the cache directory
    fn entry_paths(&self) -> Vec<PathBuf> {
        self.paths_with_extension(&[ENTRY_EXTENSION])
    }

    /// Lists files in the cache directory with one of the given extensions
    fn paths_with_extension(&self, extensions: &[&str]) -> Vec<PathBuf> {
        let dir = match fs::read_dir(&self.cache_dir) {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!("Error listing cache directory {:?}: {}", self.cache_dir, e);
                return Vec::new();
            }
        };

        dir.filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| extensions.contains(&ext))
            })
            .collect()
    }

    fn read_entry<T: DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Option<CacheEntry<T>>, CacheError> {
        let path = self.entry_path(key);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(CacheError::StorageRead {
                    path,
                    reason: e.to_string(),
                })
            }
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| CacheError::StorageRead {
                path,
                reason: e.to_string(),
            })
    }

    /// Writes to a temporary file and renames it over the entry, so readers
    /// never observe a half-written entry.
    fn write_entry<T: Serialize>(&self, key: &str, entry: &CacheEntry<T>) -> Result<(), CacheError> {
        let path = self.entry_path(key);
        let write_error = |reason: String| CacheError::StorageWrite {
            path: path.clone(),
            reason,
        };

        self.ensure_dir().map_err(|e| write_error(e.to_string()))?;

        let json = serde_json::to_string_pretty(entry).map_err(|e| write_error(e.to_string()))?;

        let tmp_path = path.with_extension(TMP_EXTENSION);
        fs::write(&tmp_path, json).map_err(|e| write_error(e.to_string()))?;
        fs::rename(&tmp_path, &path).map_err(|e| write_error(e.to_string()))
    }
}
