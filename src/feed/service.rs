//! Feed aggregation service
//!
//! Orchestrates one aggregation pass: cache check, concurrent adapter
//! fan-out, batched identity resolution, merge/dedupe, build, cache write.
//! A failing adapter degrades to an empty contribution; nothing in the
//! pass is fatal to the caller.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::cache::{CacheKey, TtlCache, TtlCacheConfig};
use crate::feed::adapters::{
    finalize_grade, finalize_message, FeedScope, GradeAdapter, MessageAdapter, NotificationAdapter,
};
use crate::feed::builder::{self, Feed, PAGE_SIZE};
use crate::feed::item::FeedItem;
use crate::feed::merge::merge_dedupe;
use crate::feed::resolver::IdentityResolver;
use crate::readstate::{MarkAllOutcome, ReadStateReconciler};
use crate::store::{self, DocumentStore};
use crate::types::Result;
use crate::util::measure;

/// Tunables for the feed service
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Items shown per page
    pub page_size: usize,
    /// Feed cache TTL
    pub cache_ttl: Duration,
    /// Delay before the authoritative re-fetch after mark-all-read,
    /// absorbing store propagation lag
    pub resync_delay: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            page_size: PAGE_SIZE,
            cache_ttl: Duration::from_secs(60),
            resync_delay: Duration::from_millis(500),
        }
    }
}

/// Builds deduplicated, unread-aware feeds for a principal
pub struct FeedService {
    store: Arc<dyn DocumentStore>,
    cache: TtlCache,
    reconciler: ReadStateReconciler,
    config: FeedConfig,
}

impl FeedService {
    pub fn new(store: Arc<dyn DocumentStore>, config: FeedConfig) -> Self {
        let cache = TtlCache::new(TtlCacheConfig {
            ttl: config.cache_ttl,
            ..Default::default()
        });
        let reconciler = ReadStateReconciler::new(store.clone());
        Self {
            store,
            cache,
            reconciler,
            config,
        }
    }

    pub fn with_defaults(store: Arc<dyn DocumentStore>) -> Self {
        Self::new(store, FeedConfig::default())
    }

    /// Fetch the feed for a scope, read-through the cache
    pub async fn fetch(&self, scope: &FeedScope) -> Feed {
        let key = self.cache_key(scope).to_storage_key();
        if let Some(feed) = self.cache.get::<Feed>(&key) {
            debug!(%key, "Feed served from cache");
            return feed;
        }

        self.fetch_uncached(scope).await
    }

    /// Run one full aggregation pass, bypassing the cache (the result is
    /// still written back to it)
    pub async fn fetch_uncached(&self, scope: &FeedScope) -> Feed {
        // Fan out: all source adapters run concurrently; each failure
        // degrades that adapter's contribution to empty
        let notification_adapter = NotificationAdapter::new(self.store.as_ref());
        let message_adapter = MessageAdapter::new(self.store.as_ref());
        let grade_adapter = GradeAdapter::new(self.store.as_ref());

        let (notifications, messages, grades) = measure("adapter_fan_out", async {
            tokio::join!(
                notification_adapter.fetch(scope),
                message_adapter.fetch(scope),
                grade_adapter.fetch(scope),
            )
        })
        .await;

        let notifications = unwrap_or_empty("notifications", notifications);
        let messages = unwrap_or_empty("messages", messages);
        let grades = unwrap_or_empty("grades", grades);

        // Batch secondary lookups: distinct foreign ids only, both
        // collections resolved concurrently
        let resolver = IdentityResolver::new(self.store.as_ref());
        let author_ids: BTreeSet<String> = messages.iter().map(|m| m.from.clone()).collect();
        let course_ids: BTreeSet<String> =
            grades.iter().filter_map(|g| g.course_id.clone()).collect();

        let (author_labels, course_labels) = measure("identity_resolution", async {
            tokio::join!(
                resolver.resolve(store::USERS, author_ids, &["displayName", "email"]),
                resolver.resolve(store::COURSES, course_ids, &["title"]),
            )
        })
        .await;

        let mut items: Vec<FeedItem> = notifications;
        items.extend(
            messages
                .into_iter()
                .map(|m| finalize_message(m, &author_labels)),
        );
        items.extend(
            grades
                .into_iter()
                .map(|g| finalize_grade(g, &course_labels)),
        );

        // Dedupe before sorting or counting
        let merged = merge_dedupe(items);
        let feed = builder::build(merged, self.config.page_size);

        let key = self.cache_key(scope).to_storage_key();
        self.cache.set(&key, &feed);

        info!(
            principal = %scope.principal_id,
            items = feed.items.len(),
            unread = feed.unread_count,
            "Feed aggregated"
        );
        feed
    }

    /// Persist one read acknowledgment and invalidate the scope's cache
    pub async fn mark_read(&self, scope: &FeedScope, item: &FeedItem) -> Result<()> {
        self.reconciler
            .mark_read(&scope.principal_id, &item.source)
            .await?;
        self.invalidate(scope);
        Ok(())
    }

    /// Mark every unread item read, then re-fetch authoritative state
    /// after a short propagation delay.
    ///
    /// Partial failure is tolerated: the outcome reports how many writes
    /// settled, and the refreshed feed reflects whatever actually landed.
    pub async fn mark_all_read(
        &self,
        scope: &FeedScope,
        items: &[FeedItem],
    ) -> (MarkAllOutcome, Feed) {
        let outcome = self
            .reconciler
            .mark_all_read(&scope.principal_id, items)
            .await;

        if outcome.failed > 0 {
            warn!(
                failed = outcome.failed,
                succeeded = outcome.succeeded,
                "Some mark-read writes failed"
            );
        }

        self.invalidate(scope);

        if !self.config.resync_delay.is_zero() {
            sleep(self.config.resync_delay).await;
        }
        let feed = self.fetch_uncached(scope).await;

        (outcome, feed)
    }

    /// Drop every cached feed for the scope's principal
    pub fn invalidate(&self, scope: &FeedScope) {
        let prefix = CacheKey::invalidation_prefix(&scope.principal_id);
        let removed = self.cache.invalidate(&prefix);
        debug!(%prefix, removed, "Feed cache invalidated");
    }

    /// Cache statistics (hit/miss/insert/eviction counters)
    pub fn cache_stats(&self) -> crate::cache::CacheStatsSnapshot {
        self.cache.stats()
    }

    fn cache_key(&self, scope: &FeedScope) -> CacheKey {
        match &scope.dependent_id {
            Some(dep) => CacheKey::feed_for_dependent(&scope.principal_id, dep),
            None => CacheKey::feed(&scope.principal_id),
        }
    }
}

fn unwrap_or_empty<T>(source: &str, result: Result<Vec<T>>) -> Vec<T> {
    match result {
        Ok(items) => items,
        Err(e) => {
            warn!(source, "Adapter query failed, contributing empty: {}", e);
            Vec::new()
        }
    }
}
