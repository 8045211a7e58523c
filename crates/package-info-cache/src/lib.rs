//! In-memory cache for resolved package records.
//!
//! A bounded map keyed by package name. Entries expire after a fixed
//! time-to-live (checked lazily on read) and the least-recently-used entry
//! is evicted when an insert would exceed capacity.
//!
//! # Example
//!
//! ```
//! use package_info_cache::{CacheConfig, ResultCache};
//!
//! let cache = ResultCache::new(CacheConfig::default());
//! cache.set("lodash", 42u64);
//! assert_eq!(cache.get("lodash"), Some(42));
//! ```

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Default maximum number of entries.
pub const DEFAULT_CAPACITY: usize = 100;

/// Default time-to-live: one hour.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

/// Cache sizing and expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of entries. Size accounting is by entry count.
    pub capacity: usize,
    /// Age after which an entry is treated as absent.
    pub ttl: Duration,
}

impl CacheConfig {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self { capacity, ttl }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            ttl: DEFAULT_TTL,
        }
    }
}

/// Cache entry with timestamp.
struct CacheEntry<V> {
    value: V,
    cached_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.cached_at) >= ttl
    }
}

/// Thread-safe TTL + LRU cache.
///
/// Values are cloned out on [`get`](Self::get), so a caller can never mutate
/// what the cache holds. Each `get`/`set` runs under a single lock, which
/// makes replacement of a key atomic with respect to concurrent readers.
pub struct ResultCache<V> {
    entries: Mutex<LruCache<String, CacheEntry<V>>>,
    ttl: Duration,
}

impl<V: Clone> ResultCache<V> {
    /// Create a cache. A capacity of zero is clamped to one.
    pub fn new(config: CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl: config.ttl,
        }
    }

    /// Look up a live entry, marking it most recently used.
    ///
    /// Returns `None` on a miss. An expired entry is dropped and reported as a
    /// miss. Never fetches.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut entries = self.lock();

        let expired = entries.peek(key)?.is_expired(self.ttl, now);
        if expired {
            entries.pop(key);
            tracing::debug!(key, "cache entry expired");
            return None;
        }

        entries.get(key).map(|entry| entry.value.clone())
    }

    /// Insert or replace an entry, resetting its age to zero.
    ///
    /// Evicts the least-recently-used entry when a new key would exceed
    /// capacity.
    pub fn set(&self, key: impl Into<String>, value: V) {
        let key = key.into();
        let entry = CacheEntry {
            value,
            cached_at: Instant::now(),
        };
        if let Some((evicted, _)) = self.lock().push(key.clone(), entry) {
            if evicted != key {
                tracing::debug!(evicted = %evicted, "cache full, evicted least recently used");
            }
        }
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.lock();
        let stale: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(self.ttl, now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &stale {
            entries.pop(key);
        }
        stale.len()
    }

    /// Number of physically stored entries, expired ones included until they
    /// are read or purged.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.lock().cap().get()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, CacheEntry<V>>> {
        // A panic while holding the lock cannot leave a half-written entry:
        // every mutation is a single LruCache call.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<V: Clone> Default for ResultCache<V> {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
