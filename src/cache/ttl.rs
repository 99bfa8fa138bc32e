//! TTL cache with timestamped envelopes
//!
//! Entries carry the instant they were stored; `get` treats anything older
//! than the TTL as absent and proactively removes it. All operations are
//! infallible from the caller's point of view: a value that fails to
//! serialize or deserialize degrades to a miss / no-op so the feed falls
//! back transparently to a live fetch.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

/// Configuration for the TTL cache
#[derive(Debug, Clone)]
pub struct TtlCacheConfig {
    /// How long an entry stays fresh
    pub ttl: Duration,

    /// Maximum number of entries (prevents unbounded growth)
    pub max_entries: usize,
}

impl Default for TtlCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(60),
            max_entries: 1_000,
        }
    }
}

/// A cached value with its storage timestamp
struct Envelope {
    stored_at: Instant,
    data: serde_json::Value,
}

impl Envelope {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.stored_at.elapsed() >= ttl
    }
}

/// Cache statistics
#[derive(Debug, Default)]
struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    evictions: AtomicU64,
}

/// Snapshot of cache statistics
#[derive(Debug, Clone)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub evictions: u64,
}

/// Key/value cache with per-entry TTL enforcement
pub struct TtlCache {
    entries: DashMap<String, Envelope>,
    config: TtlCacheConfig,
    stats: CacheStats,
}

impl TtlCache {
    pub fn new(config: TtlCacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config,
            stats: CacheStats::default(),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(TtlCacheConfig::default())
    }

    /// Get a value if present and fresh.
    ///
    /// Expired entries are removed on the way out. A stored value that no
    /// longer deserializes is treated the same way.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let stale = match self.entries.get(key) {
            Some(envelope) => {
                if envelope.is_expired(self.config.ttl) {
                    true
                } else {
                    match serde_json::from_value(envelope.data.clone()) {
                        Ok(value) => {
                            self.stats.hits.fetch_add(1, Ordering::Relaxed);
                            return Some(value);
                        }
                        Err(e) => {
                            warn!(key, "Cache entry failed to deserialize: {}", e);
                            true
                        }
                    }
                }
            }
            None => false,
        };

        if stale {
            self.entries.remove(key);
            self.stats.evictions.fetch_add(1, Ordering::Relaxed);
        }
        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Store a value. Serialization failure is logged and the entry is
    /// dropped; the caller never sees an error.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) {
        let data = match serde_json::to_value(value) {
            Ok(v) => v,
            Err(e) => {
                warn!(key, "Cache value failed to serialize, skipping: {}", e);
                return;
            }
        };

        if self.entries.len() >= self.config.max_entries && !self.entries.contains_key(key) {
            self.evict_oldest();
        }

        self.entries.insert(
            key.to_string(),
            Envelope {
                stored_at: Instant::now(),
                data,
            },
        );
        self.stats.inserts.fetch_add(1, Ordering::Relaxed);
    }

    /// Remove every entry whose key starts with `prefix`.
    ///
    /// Returns the number of entries removed.
    pub fn invalidate(&self, prefix: &str) -> usize {
        let mut removed = 0;
        self.entries.retain(|key, _| {
            if key.starts_with(prefix) {
                removed += 1;
                false
            } else {
                true
            }
        });
        removed
    }

    /// Remove all expired entries
    pub fn cleanup(&self) -> usize {
        let ttl = self.config.ttl;
        let mut removed = 0;
        self.entries.retain(|_, envelope| {
            if envelope.is_expired(ttl) {
                removed += 1;
                self.stats.evictions.fetch_add(1, Ordering::Relaxed);
                false
            } else {
                true
            }
        });
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.stats.hits.load(Ordering::Relaxed),
            misses: self.stats.misses.load(Ordering::Relaxed),
            inserts: self.stats.inserts.load(Ordering::Relaxed),
            evictions: self.stats.evictions.load(Ordering::Relaxed),
        }
    }

    fn evict_oldest(&self) {
        let oldest_key = self
            .entries
            .iter()
            .min_by_key(|e| e.stored_at)
            .map(|e| e.key().clone());

        if let Some(key) = oldest_key {
            self.entries.remove(&key);
            self.stats.evictions.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl Default for TtlCache {
    fn default() -> Self {
        Self::with_defaults()
    }
}
