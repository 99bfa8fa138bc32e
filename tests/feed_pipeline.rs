//! End-to-end aggregation pipeline tests against the in-memory store

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bson::{doc, Bson, Document};

use herald::feed::{FeedConfig, FeedKind, FeedScope, FeedService};
use herald::store::{DocumentStore, MemoryStore, StoredDoc};
use herald::types::{HeraldError, Result};

fn test_config() -> FeedConfig {
    FeedConfig {
        resync_delay: Duration::ZERO,
        ..Default::default()
    }
}

fn service_with(store: Arc<dyn DocumentStore>) -> FeedService {
    FeedService::new(store, test_config())
}

fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());

    store.put(
        "notifications",
        "n1",
        doc! {
            "user_id": "parent-1",
            "type": "assignment",
            "title": "New assignment",
            "message": "Algebra worksheet due Friday",
            "timestamp": "2025-03-05T10:00:00Z",
            "read": false,
        },
    );
    store.put(
        "messages",
        "m1",
        doc! {
            "from": "teacher-1",
            "to": "parent-1",
            "content": "Your child did great this week",
            "timestamp": "2025-03-04T09:00:00Z",
            "read": false,
        },
    );
    store.put("users", "teacher-1", doc! { "displayName": "T" });

    store
}

#[tokio::test]
async fn aggregates_notification_and_message_then_marks_read() {
    let store = seeded_store();
    let service = service_with(store.clone());
    let scope = FeedScope::principal("parent-1");

    let feed = service.fetch(&scope).await;
    assert_eq!(feed.items.len(), 2);
    assert_eq!(feed.unread_count, 2);

    let message_item = feed.items.iter().find(|i| i.id == "message_m1").unwrap();
    assert_eq!(message_item.kind, FeedKind::Message);
    assert_eq!(message_item.counterparty_name.as_deref(), Some("T"));

    // Mark the native notification read
    let n1 = feed.items.iter().find(|i| i.id == "n1").unwrap();
    service.mark_read(&scope, n1).await.unwrap();

    // Write-back landed on the originating document
    let raw = store.peek("notifications", "n1").unwrap();
    assert_eq!(raw.get_bool("read").unwrap(), true);

    // Cache was invalidated, so the next fetch reflects the write
    let feed = service.fetch(&scope).await;
    assert_eq!(feed.unread_count, 1);
    assert!(feed.items.iter().find(|i| i.id == "n1").unwrap().read);
}

#[tokio::test]
async fn same_grade_via_two_predicates_collapses_to_one_item() {
    let store = Arc::new(MemoryStore::new());
    // One grade document carrying both student-id field spellings, so both
    // query predicates would surface it
    store.put(
        "grades",
        "g1",
        doc! {
            "studentId": "student-1",
            "student": "student-1",
            "value": "5",
            "course_id": "c1",
            "date": "2025-03-01T10:00:00Z",
        },
    );
    store.put("courses", "c1", doc! { "title": "Mathematics" });

    let service = service_with(store);
    let scope = FeedScope::with_dependent("parent-1", "student-1");

    let feed = service.fetch(&scope).await;
    let grade_items: Vec<_> = feed.items.iter().filter(|i| i.id == "grade_g1").collect();
    assert_eq!(grade_items.len(), 1);
    assert_eq!(grade_items[0].course_title.as_deref(), Some("Mathematics"));
}

#[tokio::test]
async fn duplicate_notification_across_scopes_deduped_read_true_wins() {
    let store = Arc::new(MemoryStore::new());
    store.put(
        "notifications",
        "n1",
        doc! {
            "user_id": "parent-1",
            "title": "Twice surfaced",
            "timestamp": "2025-03-01T10:00:00Z",
            "read": true,
        },
    );

    let service = service_with(store);
    // Dependent scope set to the principal id: both queries return n1
    let scope = FeedScope::with_dependent("parent-1", "parent-1");

    let feed = service.fetch(&scope).await;
    let matches: Vec<_> = feed.items.iter().filter(|i| i.id == "n1").collect();
    assert_eq!(matches.len(), 1);
    assert!(matches[0].read);
    assert_eq!(feed.unread_count, 0);
}

#[tokio::test]
async fn feed_is_sorted_newest_first() {
    let store = Arc::new(MemoryStore::new());
    for (id, day) in [("n1", 3), ("n2", 1), ("n3", 5)] {
        store.put(
            "notifications",
            id,
            doc! {
                "user_id": "parent-1",
                "title": "x",
                "timestamp": format!("2025-03-{:02}T10:00:00Z", day),
            },
        );
    }

    let service = service_with(store);
    let feed = service.fetch(&FeedScope::principal("parent-1")).await;

    for pair in feed.items.windows(2) {
        assert!(pair[0].timestamp >= pair[1].timestamp);
    }
    assert_eq!(feed.items[0].id, "n3");
}

#[tokio::test]
async fn three_messages_from_two_authors_issue_two_point_reads() {
    let store = Arc::new(MemoryStore::new());
    for (id, from) in [("m1", "t1"), ("m2", "t2"), ("m3", "t1")] {
        store.put(
            "messages",
            id,
            doc! { "from": from, "to": "parent-1", "content": "hi", "read": false },
        );
    }
    store.put("users", "t1", doc! { "displayName": "A" });
    store.put("users", "t2", doc! { "displayName": "B" });

    let service = service_with(store.clone());
    let feed = service.fetch(&FeedScope::principal("parent-1")).await;

    assert_eq!(feed.items.len(), 3);
    // Distinct authors only: 2 point reads against users, not 3
    assert_eq!(store.stats().gets, 2);
}

#[tokio::test]
async fn marking_same_grade_read_twice_stores_id_once() {
    let store = Arc::new(MemoryStore::new());
    store.put(
        "grades",
        "g1",
        doc! { "studentId": "student-1", "value": "5", "date": "2025-03-01T10:00:00Z" },
    );

    let service = service_with(store.clone());
    let scope = FeedScope::with_dependent("parent-1", "student-1");

    let feed = service.fetch(&scope).await;
    let grade = feed.items.iter().find(|i| i.id == "grade_g1").unwrap();

    service.mark_read(&scope, grade).await.unwrap();
    service.mark_read(&scope, grade).await.unwrap();

    let side = store.peek("notification_read_status", "parent-1").unwrap();
    let ids = side.get_array("readGrades").unwrap();
    assert_eq!(ids.len(), 1);
    assert_eq!(ids[0].as_str(), Some("g1"));

    // And the next aggregation sees the grade as read
    let feed = service.fetch(&scope).await;
    assert!(feed.items.iter().find(|i| i.id == "grade_g1").unwrap().read);
}

#[tokio::test]
async fn mark_all_read_settles_every_kind_and_resyncs() {
    let store = seeded_store();
    store.put(
        "grades",
        "g1",
        doc! { "studentId": "student-1", "value": "4", "date": "2025-03-03T10:00:00Z" },
    );

    let service = service_with(store.clone());
    let scope = FeedScope::with_dependent("parent-1", "student-1");

    let feed = service.fetch(&scope).await;
    assert_eq!(feed.unread_count, 3);

    let (outcome, refreshed) = service.mark_all_read(&scope, &feed.items).await;
    assert_eq!(outcome.attempted, 3);
    assert_eq!(outcome.failed, 0);

    assert_eq!(refreshed.unread_count, 0);
    assert!(refreshed.items.iter().all(|i| i.read));

    // Each mechanism wrote to its own place
    assert_eq!(
        store.peek("notifications", "n1").unwrap().get_bool("read").unwrap(),
        true
    );
    assert_eq!(
        store.peek("messages", "m1").unwrap().get_bool("read").unwrap(),
        true
    );
    assert!(store.peek("notification_read_status", "parent-1").is_some());
}

#[tokio::test]
async fn cached_feed_expires_after_ttl() {
    let store = seeded_store();
    let service = FeedService::new(
        store.clone(),
        FeedConfig {
            cache_ttl: Duration::from_millis(50),
            resync_delay: Duration::ZERO,
            ..Default::default()
        },
    );
    let scope = FeedScope::principal("parent-1");

    let _ = service.fetch(&scope).await;
    // Second fetch inside the TTL is a cache hit
    let _ = service.fetch(&scope).await;
    assert_eq!(service.cache_stats().hits, 1);

    tokio::time::sleep(Duration::from_millis(80)).await;

    // Past the TTL: the stale entry is absent, a fresh pass runs
    let _ = service.fetch(&scope).await;
    assert_eq!(service.cache_stats().hits, 1);
    assert!(service.cache_stats().evictions >= 1);
}

#[tokio::test]
async fn cached_feed_hides_store_changes_until_invalidated() {
    let store = seeded_store();
    let service = service_with(store.clone());
    let scope = FeedScope::principal("parent-1");

    let first = service.fetch(&scope).await;
    assert_eq!(first.items.len(), 2);

    store.put(
        "notifications",
        "n9",
        doc! { "user_id": "parent-1", "title": "Late arrival", "read": false },
    );

    // Within the TTL the cached result is served as-is
    let second = service.fetch(&scope).await;
    assert_eq!(second.items.len(), 2);

    // A mutation invalidates and the next fetch sees the new record
    service.invalidate(&scope);
    let third = service.fetch(&scope).await;
    assert_eq!(third.items.len(), 3);
}

#[tokio::test]
async fn invalidating_one_principal_keeps_another_with_shared_prefix_cached() {
    let store = Arc::new(MemoryStore::new());
    // "p1" is a string prefix of "p10"
    for principal in ["p1", "p10"] {
        store.put(
            "notifications",
            &format!("n-{}", principal),
            doc! { "user_id": principal, "title": "Hello", "read": false },
        );
    }

    let service = service_with(store);
    let p1 = FeedScope::principal("p1");
    let p10 = FeedScope::principal("p10");

    let _ = service.fetch(&p1).await;
    let _ = service.fetch(&p10).await;

    service.invalidate(&p1);

    // p10's entry survived the p1 invalidation: this fetch is a cache hit
    let _ = service.fetch(&p10).await;
    assert_eq!(service.cache_stats().hits, 1);

    // p1's own entry is gone, so its fetch runs a fresh pass
    let _ = service.fetch(&p1).await;
    assert_eq!(service.cache_stats().hits, 1);
}

// ============================================================================
// Partial-source failure
// ============================================================================

/// Store wrapper that fails every query against one collection
struct FlakyStore {
    inner: Arc<MemoryStore>,
    failing_collection: &'static str,
}

#[async_trait]
impl DocumentStore for FlakyStore {
    async fn find(
        &self,
        collection: &str,
        field: &str,
        value: Bson,
        limit: usize,
    ) -> Result<Vec<StoredDoc>> {
        if collection == self.failing_collection {
            return Err(HeraldError::Store("simulated outage".to_string()));
        }
        self.inner.find(collection, field, value, limit).await
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<StoredDoc>> {
        self.inner.get(collection, id).await
    }

    async fn update_fields(&self, collection: &str, id: &str, fields: Document) -> Result<()> {
        self.inner.update_fields(collection, id, fields).await
    }

    async fn merge_fields(&self, collection: &str, id: &str, fields: Document) -> Result<()> {
        self.inner.merge_fields(collection, id, fields).await
    }
}

#[tokio::test]
async fn failing_adapter_degrades_to_empty_not_fatal() {
    let inner = seeded_store();
    let store = Arc::new(FlakyStore {
        inner,
        failing_collection: "messages",
    });

    let service = service_with(store);
    let feed = service.fetch(&FeedScope::principal("parent-1")).await;

    // The messages adapter contributed nothing; the notification survived
    assert_eq!(feed.items.len(), 1);
    assert_eq!(feed.items[0].id, "n1");
}
