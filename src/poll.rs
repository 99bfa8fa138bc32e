//! Polling refresh
//!
//! The feed is polled on a fixed interval rather than pushed. Overlapping
//! refreshes are tolerated: each completed pass simply overwrites the
//! shared slot, last write wins, and no ordering between two in-flight
//! passes is assumed by consumers. A superseded pass's result may briefly
//! show slightly stale data after a rapid double-refresh; that is an
//! accepted limitation.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::feed::{Feed, FeedScope, FeedService};

/// Shared slot holding the latest aggregated feed
pub type FeedSlot = Arc<RwLock<Option<Feed>>>;

/// Create an empty feed slot
pub fn feed_slot() -> FeedSlot {
    Arc::new(RwLock::new(None))
}

/// Spawn an interval-driven refresh task for one scope.
///
/// The first pass runs immediately; subsequent passes run every
/// `interval`. Each pass bypasses the cache (it is the thing keeping the
/// cache warm) and writes its result into `slot`.
pub fn spawn_refresh_task(
    service: Arc<FeedService>,
    scope: FeedScope,
    interval: Duration,
    slot: FeedSlot,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        info!(
            principal = %scope.principal_id,
            interval_secs = interval.as_secs(),
            "Feed refresh task started"
        );

        loop {
            ticker.tick().await;
            let feed = service.fetch_uncached(&scope).await;
            debug!(
                principal = %scope.principal_id,
                unread = feed.unread_count,
                "Refresh pass complete"
            );
            *slot.write().await = Some(feed);
        }
    })
}
