//! Session-scoped TTL cache for feed results
//!
//! Gives the aggregation pipeline a read-through/write-through shape: feed
//! fetches check the cache first, mutations invalidate by key prefix, and
//! entries silently expire after the TTL. Cache failures never propagate;
//! the pipeline falls back to a live fetch.

pub mod keys;
pub mod ttl;

pub use keys::CacheKey;
pub use ttl::{CacheStatsSnapshot, TtlCache, TtlCacheConfig};
