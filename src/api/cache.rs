// src/api/cache.rs
//! Response cache for Omeka S API calls.
//!
//! Two tiers: a bounded in-memory map in front of gzip files on disk, one
//! file per request fingerprint. Cache operations are best-effort: read and
//! write failures are logged and otherwise ignored, so a broken cache never
//! prevents fresh API calls.

use crate::constants::{CACHE_DIR_NAME, MEMORY_CACHE_CAPACITY};
use crate::error::FetchError;
use crate::types::RequestKey;
use chrono::{DateTime, TimeDelta, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const CACHE_EXTENSION: &str = "json.gz";
const LEGACY_EXTENSION: &str = "json";
const DIGEST_LENGTH: usize = 64;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    timestamp: DateTime<Utc>,
    data: Value,
}

/// Hit/miss counters, reported when profiling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub memory_hits: u64,
    pub disk_hits: u64,
    pub misses: u64,
    pub writes: u64,
    pub write_failures: u64,
}

#[derive(Debug, Default)]
struct Counters {
    memory_hits: AtomicU64,
    disk_hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    write_failures: AtomicU64,
}

/// TTL-bounded store of raw JSON responses keyed by [`RequestKey`].
#[derive(Debug)]
pub struct CacheStore {
    cache_dir: PathBuf,
    ttl: TimeDelta,
    memory: Mutex<HashMap<RequestKey, CacheEntry>>,
    memory_capacity: usize,
    counters: Counters,
}

impl CacheStore {
    /// Opens (creating if needed) a cache rooted at `cache_dir`.
    ///
    /// On open, expired entries are purged to prevent unbounded disk growth.
    pub async fn open(cache_dir: impl Into<PathBuf>, ttl: Duration) -> std::io::Result<Self> {
        let cache_dir = cache_dir.into();
        tokio::fs::create_dir_all(&cache_dir).await?;
        let cache = Self {
            cache_dir,
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
            memory: Mutex::new(HashMap::new()),
            memory_capacity: MEMORY_CACHE_CAPACITY,
            counters: Counters::default(),
        };
        let purged = cache.purge_expired().await;
        if purged > 0 {
            log::info!("Purged {} expired cache entries", purged);
        }
        Ok(cache)
    }

    pub fn with_memory_capacity(mut self, capacity: usize) -> Self {
        self.memory_capacity = capacity;
        self
    }

    /// `$XDG_CACHE_HOME/omeka-harvest`, or `~/.cache/omeka-harvest`.
    pub fn default_cache_dir() -> PathBuf {
        std::env::var("XDG_CACHE_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                PathBuf::from(home).join(".cache")
            })
            .join(CACHE_DIR_NAME)
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Returns the cached payload if present and within the TTL.
    pub async fn get(&self, key: &RequestKey) -> Option<Value> {
        if let Some(data) = self.memory_get(key) {
            self.counters.memory_hits.fetch_add(1, Ordering::Relaxed);
            log::debug!("Cache hit (memory): {}", key);
            return Some(data);
        }

        match self.disk_get(key).await {
            Some(entry) => {
                self.counters.disk_hits.fetch_add(1, Ordering::Relaxed);
                log::debug!("Cache hit (disk): {}", key);
                let data = entry.data.clone();
                self.memory_insert(key, entry);
                Some(data)
            }
            None => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                log::debug!("Cache miss: {}", key);
                None
            }
        }
    }

    /// Stores a payload stamped with the current time.
    pub async fn set(&self, key: &RequestKey, data: &Value) {
        let entry = CacheEntry {
            timestamp: Utc::now(),
            data: data.clone(),
        };

        match self.disk_set(key, &entry).await {
            Ok(()) => {
                self.counters.writes.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.counters.write_failures.fetch_add(1, Ordering::Relaxed);
                log::warn!("{}", FetchError::Cache { reason: e });
            }
        }
        self.memory_insert(key, entry);
    }

    /// Removes every durable entry and empties the memory tier.
    pub async fn clear(&self) -> usize {
        self.memory.lock().clear();

        let mut removed = 0;
        let mut dir = match tokio::fs::read_dir(&self.cache_dir).await {
            Ok(d) => d,
            Err(e) => {
                log::warn!("Cannot list cache directory {:?}: {}", self.cache_dir, e);
                return 0;
            }
        };
        while let Ok(Some(entry)) = dir.next_entry().await {
            let path = entry.path();
            if is_cache_file(&path) && tokio::fs::remove_file(&path).await.is_ok() {
                removed += 1;
            }
        }
        log::info!("Cleared {} cache entries from {:?}", removed, self.cache_dir);
        removed
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            memory_hits: self.counters.memory_hits.load(Ordering::Relaxed),
            disk_hits: self.counters.disk_hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            writes: self.counters.writes.load(Ordering::Relaxed),
            write_failures: self.counters.write_failures.load(Ordering::Relaxed),
        }
    }

    fn is_fresh(&self, entry: &CacheEntry) -> bool {
        Utc::now().signed_duration_since(entry.timestamp) <= self.ttl
    }

    fn memory_get(&self, key: &RequestKey) -> Option<Value> {
        let mut memory = self.memory.lock();
        let fresh = self.is_fresh(memory.get(key)?);
        if fresh {
            memory.get(key).map(|entry| entry.data.clone())
        } else {
            memory.remove(key);
            None
        }
    }

    /// Inserts while under capacity; an existing key is always refreshed.
    fn memory_insert(&self, key: &RequestKey, entry: CacheEntry) {
        let mut memory = self.memory.lock();
        if memory.len() < self.memory_capacity || memory.contains_key(key) {
            memory.insert(key.clone(), entry);
        }
    }

    async fn disk_get(&self, key: &RequestKey) -> Option<CacheEntry> {
        let digest = key.digest();
        let path = self.entry_path(&digest);
        let (path, bytes) = match tokio::fs::read(&path).await {
            Ok(bytes) => (path, bytes),
            Err(_) => {
                let legacy = self.legacy_path(&digest);
                let bytes = tokio::fs::read(&legacy).await.ok()?;
                (legacy, bytes)
            }
        };

        let entry = match decode_entry(&bytes) {
            Ok(entry) => entry,
            Err(reason) => {
                log::warn!(
                    "Ignoring unreadable cache entry {:?}: {}",
                    path,
                    FetchError::Cache { reason }
                );
                return None;
            }
        };

        if !self.is_fresh(&entry) {
            log::debug!("Cache entry expired: {}", key);
            let _ = tokio::fs::remove_file(&path).await;
            return None;
        }
        Some(entry)
    }

    async fn disk_set(&self, key: &RequestKey, entry: &CacheEntry) -> Result<(), String> {
        let encoded = encode_entry(entry)?;
        let digest = key.digest();
        let path = self.entry_path(&digest);
        // Unique per write so concurrent sets of one key never share a file
        let tmp = self
            .cache_dir
            .join(format!("{}.{:016x}.tmp", digest, rand::random::<u64>()));

        tokio::fs::write(&tmp, encoded)
            .await
            .map_err(|e| format!("write {:?}: {}", tmp, e))?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(format!("rename {:?}: {}", path, e));
        }

        // A stale legacy sibling would otherwise outlive the fresh entry
        let _ = tokio::fs::remove_file(self.legacy_path(&digest)).await;
        Ok(())
    }

    /// Removes all expired durable entries. Errors are ignored.
    async fn purge_expired(&self) -> usize {
        let mut dir = match tokio::fs::read_dir(&self.cache_dir).await {
            Ok(d) => d,
            Err(_) => return 0,
        };

        let mut purged = 0;
        while let Ok(Some(entry)) = dir.next_entry().await {
            let path = entry.path();
            if !is_cache_file(&path) {
                continue;
            }
            if let Ok(bytes) = tokio::fs::read(&path).await {
                if let Ok(cached) = decode_entry(&bytes) {
                    if !self.is_fresh(&cached) && tokio::fs::remove_file(&path).await.is_ok() {
                        purged += 1;
                    }
                }
            }
        }
        purged
    }

    fn entry_path(&self, digest: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.{}", digest, CACHE_EXTENSION))
    }

    fn legacy_path(&self, digest: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.{}", digest, LEGACY_EXTENSION))
    }
}

/// Only files this store names: `<64 hex digits>.json.gz` or `.json`.
fn is_cache_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
        return false;
    };
    let digest = name
        .strip_suffix(&format!(".{}", CACHE_EXTENSION))
        .or_else(|| name.strip_suffix(&format!(".{}", LEGACY_EXTENSION)));
    digest.is_some_and(is_digest)
}

fn is_digest(stem: &str) -> bool {
    stem.len() == DIGEST_LENGTH
        && stem
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

fn encode_entry(entry: &CacheEntry) -> Result<Vec<u8>, String> {
    let json = serde_json::to_vec(entry).map_err(|e| e.to_string())?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&json).map_err(|e| e.to_string())?;
    encoder.finish().map_err(|e| e.to_string())
}

/// Accepts gzip content and, for older entries, plain JSON.
fn decode_entry(bytes: &[u8]) -> Result<CacheEntry, String> {
    if bytes.starts_with(&GZIP_MAGIC) {
        let mut json = Vec::new();
        GzDecoder::new(bytes)
            .read_to_end(&mut json)
            .map_err(|e| format!("gunzip: {}", e))?;
        serde_json::from_slice(&json).map_err(|e| format!("parse: {}", e))
    } else {
        serde_json::from_slice(bytes).map_err(|e| format!("parse legacy entry: {}", e))
    }
}
