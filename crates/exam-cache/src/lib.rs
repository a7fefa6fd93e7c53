//! # exam-cache
//!
//! Async in-memory TTL cache used to memoize resolved subject mappings.
//!
//! A single `tokio::sync::Mutex` guards the map and the counters, so every
//! operation is one mutual-exclusion region and concurrent `get`/`set` pairs
//! can never interleave inconsistently. Expired entries are evicted lazily on
//! `get`; [`TtlCache::cleanup`] is the caller-scheduled sweep for everything
//! the lazy path never touches again.
//!
//! The cache is process-local. A deployment that wants a shared cache swaps
//! this crate out behind the same interface.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::Mutex;

/// Default entry lifetime when none is given: 5 minutes.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

struct Entry<V> {
    value: V,
    #[allow(dead_code)]
    created_at: Instant,
    expires_at: Instant,
}

#[derive(Default)]
struct Counters {
    hits: u64,
    misses: u64,
    sets: u64,
    deletes: u64,
}

struct Inner<V> {
    entries: HashMap<String, Entry<V>>,
    counters: Counters,
}

/// Snapshot of cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    /// hits / (hits + misses), rounded to 4 decimal places; 0.0 before any request.
    pub hit_rate: f64,
    pub sets: u64,
    pub deletes: u64,
}

/// Thread-safe in-memory cache with per-entry TTL.
pub struct TtlCache<V> {
    inner: Mutex<Inner<V>>,
    default_ttl: Duration,
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl<V: Clone> TtlCache<V> {
    /// Create a cache whose `set` calls use `default_ttl`.
    #[must_use]
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                counters: Counters::default(),
            }),
            default_ttl,
        }
    }

    /// The TTL applied by [`TtlCache::set`].
    #[must_use]
    pub const fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Get a value if present and not expired.
    ///
    /// An expired entry is removed and counted as a miss.
    pub async fn get(&self, key: &str) -> Option<V> {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;
        if let Some(entry) = inner.entries.get(key) {
            if Instant::now() < entry.expires_at {
                inner.counters.hits += 1;
                return Some(entry.value.clone());
            }
            inner.entries.remove(key);
        }
        inner.counters.misses += 1;
        None
    }

    /// Store a value with the default TTL, overwriting any existing entry.
    pub async fn set(&self, key: impl Into<String>, value: V) {
        self.set_with_ttl(key, value, self.default_ttl).await;
    }

    /// Store a value with an explicit TTL, overwriting any existing entry.
    ///
    /// A zero TTL produces an entry that is already expired for any later `get`.
    pub async fn set_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let now = Instant::now();
        let mut inner = self.inner.lock().await;
        inner.entries.insert(
            key.into(),
            Entry {
                value,
                created_at: now,
                expires_at: now + ttl,
            },
        );
        inner.counters.sets += 1;
    }

    /// Remove an entry. Returns `true` if the key was present.
    pub async fn delete(&self, key: &str) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.entries.remove(key).is_some() {
            inner.counters.deletes += 1;
            true
        } else {
            false
        }
    }

    /// Remove every entry whose key starts with `prefix`. Returns the count.
    pub async fn delete_prefix(&self, prefix: &str) -> usize {
        let mut inner = self.inner.lock().await;
        let before = inner.entries.len();
        inner.entries.retain(|key, _| !key.starts_with(prefix));
        let removed = before - inner.entries.len();
        inner.counters.deletes += removed as u64;
        removed
    }

    /// Remove all entries. Returns the count.
    pub async fn clear(&self) -> usize {
        let mut inner = self.inner.lock().await;
        let count = inner.entries.len();
        inner.entries.clear();
        count
    }

    /// Sweep out every expired entry. Returns the count removed.
    ///
    /// Lazy eviction on `get` only touches keys that are still being asked
    /// for; this is the periodic maintenance hook for the rest.
    pub async fn cleanup(&self) -> usize {
        let now = Instant::now();
        let mut inner = self.inner.lock().await;
        let before = inner.entries.len();
        inner.entries.retain(|_, entry| now < entry.expires_at);
        let removed = before - inner.entries.len();
        if removed > 0 {
            tracing::debug!(removed, "cache cleanup swept expired entries");
        }
        removed
    }

    /// Current statistics snapshot.
    pub async fn stats(&self) -> CacheStats {
        let inner = self.inner.lock().await;
        let Counters {
            hits,
            misses,
            sets,
            deletes,
        } = inner.counters;
        let total = hits + misses;
        #[allow(clippy::cast_precision_loss)]
        let hit_rate = if total == 0 {
            0.0
        } else {
            (hits as f64 / total as f64 * 10_000.0).round() / 10_000.0
        };
        CacheStats {
            entries: inner.entries.len(),
            hits,
            misses,
            hit_rate,
            sets,
            deletes,
        }
    }
}
