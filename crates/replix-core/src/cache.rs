//! Result Cache - TTL-bounded cache of read query results
//!
//! Entries are keyed by the literal query text and share one TTL. Expired
//! entries are purged lazily when looked up, so an entry is never returned
//! after its expiry instant. An optional entry bound evicts the entry
//! closest to expiry once the cache is full.

use crate::{Error, Result};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// Cached value with its absolute expiry
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// Cached value
    pub value: V,
    /// Instant after which the entry is no longer served
    pub expires_at: Instant,
}

impl<V> CacheEntry<V> {
    /// Check if the entry has expired at `now`
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now > self.expires_at
    }
}

/// Cache counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Live entries (expired entries not yet purged included)
    pub entries: usize,
    /// Lookups that returned a value
    pub hits: u64,
    /// Lookups that found nothing servable
    pub misses: u64,
    /// Entries removed because they expired
    pub expirations: u64,
    /// Entries removed to honour the entry bound
    pub evictions: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    expirations: AtomicU64,
    evictions: AtomicU64,
}

/// Time-bounded result cache
pub struct ResultCache<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    ttl: Duration,
    max_entries: Option<usize>,
    counters: Counters,
}

impl<V: Clone> ResultCache<V> {
    /// Create a cache whose entries live for `ttl`
    pub fn new(ttl: Duration) -> Result<Self> {
        if ttl.is_zero() {
            return Err(Error::configuration("cache ttl must be positive"));
        }

        Ok(Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            max_entries: None,
            counters: Counters::default(),
        })
    }

    /// Create a cache holding at most `max_entries` entries
    pub fn bounded(ttl: Duration, max_entries: usize) -> Result<Self> {
        if max_entries == 0 {
            return Err(Error::configuration("cache max_entries must be at least 1"));
        }

        let mut cache = Self::new(ttl)?;
        cache.max_entries = Some(max_entries);
        Ok(cache)
    }

    /// Configured TTL
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Insert or overwrite the entry for `key`
    pub fn put(&self, key: impl Into<String>, value: V) {
        let key = key.into();
        let now = Instant::now();
        let entry = CacheEntry {
            value,
            expires_at: now + self.ttl,
        };

        let mut entries = self.entries.lock();

        if let Some(max) = self.max_entries {
            if entries.len() >= max && !entries.contains_key(&key) {
                let before = entries.len();
                entries.retain(|_, e| !e.is_expired_at(now));
                let purged = (before - entries.len()) as u64;
                self.counters.expirations.fetch_add(purged, Ordering::Relaxed);

                if entries.len() >= max {
                    let victim = entries
                        .iter()
                        .min_by_key(|(_, e)| e.expires_at)
                        .map(|(k, _)| k.clone());
                    if let Some(victim) = victim {
                        entries.remove(&victim);
                        self.counters.evictions.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
        }

        entries.insert(key, entry);
    }

    /// Look up `key`, purging it if it has expired
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut entries = self.entries.lock();

        let expired = match entries.get(key) {
            None => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
            Some(entry) => entry.is_expired_at(now),
        };

        if expired {
            entries.remove(key);
            self.counters.expirations.fetch_add(1, Ordering::Relaxed);
            self.counters.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        self.counters.hits.fetch_add(1, Ordering::Relaxed);
        entries.get(key).map(|entry| entry.value.clone())
    }

    /// Remove every expired entry, returning how many were dropped
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, e| !e.is_expired_at(now));
        let purged = before - entries.len();
        self.counters
            .expirations
            .fetch_add(purged as u64, Ordering::Relaxed);
        purged
    }

    /// Remove every entry, returning how many were dropped
    pub fn clear(&self) -> usize {
        let mut entries = self.entries.lock();
        let dropped = entries.len();
        entries.clear();
        dropped
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Snapshot of the cache counters
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            expirations: self.counters.expirations.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
        }
    }
}
