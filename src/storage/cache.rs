use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use tokio::time::{Duration, Instant};

/// Cached value with the instant it was stored.
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    cached_at: Instant,
    /// Insertion order, for entries stored at the same instant.
    seq: u64,
}

/// TTL cache for computed responses.
///
/// Expired entries are dropped lazily on `get` and in bulk by `cleanup`.
/// When `put` pushes the map past `max_entries`, the oldest entries go first.
pub struct ResultCache<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    ttl: Duration,
    max_entries: usize,
    next_seq: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Cache statistics reported by `/status`.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub hits: u64,
    pub misses: u64,
    /// Hits as a percentage of all lookups.
    pub hit_rate: f64,
    pub ttl_secs: u64,
    pub capacity: usize,
}

impl<V: Clone> ResultCache<V> {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            max_entries,
            next_seq: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    // A panic while holding the lock leaves the map itself intact.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<V>>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn is_fresh(&self, entry: &CacheEntry<V>, now: Instant) -> bool {
        now.duration_since(entry.cached_at) < self.ttl
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut entries = self.lock();

        match entries.get(key) {
            Some(entry) if self.is_fresh(entry, now) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.value.clone());
            }
            Some(_) => {
                entries.remove(key);
                tracing::debug!(key, "Cache entry expired");
            }
            None => {}
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    pub fn put(&self, key: impl Into<String>, value: V) {
        let mut entries = self.lock();
        entries.insert(
            key.into(),
            CacheEntry {
                value,
                cached_at: Instant::now(),
                seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            },
        );
        let evicted = self.evict_oldest(&mut entries);
        if evicted > 0 {
            tracing::debug!(evicted, "Evicted oldest cache entries");
        }
    }

    fn evict_oldest(&self, entries: &mut HashMap<String, CacheEntry<V>>) -> usize {
        let excess = entries.len().saturating_sub(self.max_entries);
        if excess == 0 {
            return 0;
        }

        let mut by_age: Vec<(Instant, u64, String)> = entries
            .iter()
            .map(|(key, entry)| (entry.cached_at, entry.seq, key.clone()))
            .collect();
        by_age.sort();
        for (_, _, key) in by_age.into_iter().take(excess) {
            entries.remove(&key);
        }
        excess
    }

    /// Removes expired entries and anything over capacity.
    pub fn cleanup(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| now.duration_since(entry.cached_at) < self.ttl);
        let expired = before - entries.len();
        let removed = expired + self.evict_oldest(&mut entries);
        tracing::debug!("Cleaned up {} cache entries", removed);
        removed
    }

    /// Empties the cache and resets hit/miss counters.
    pub fn clear(&self) -> usize {
        let mut entries = self.lock();
        let removed = entries.len();
        entries.clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        tracing::info!(removed, "Cache cleared");
        removed
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let size = self.len();
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        CacheStats {
            size,
            hits,
            misses,
            hit_rate,
            ttl_secs: self.ttl.as_secs(),
            capacity: self.max_entries,
        }
    }
}

/// Cache key for a (url, format, client) triple.
///
/// Each part is length-prefixed before hashing so that no two distinct
/// triples share a digest input.
pub fn cache_key(url: &str, format: &str, client_ip: Option<&str>) -> String {
    let mut hasher = Sha256::new();
    for part in [Some(url), Some(format), client_ip] {
        match part {
            Some(value) => {
                hasher.update((value.len() as u64).to_be_bytes());
                hasher.update(value.as_bytes());
            }
            None => hasher.update(u64::MAX.to_be_bytes()),
        }
    }
    hex::encode(hasher.finalize())
}
