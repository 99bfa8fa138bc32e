//! Herald - activity feed aggregator for dashboard notifications
//!
//! Herald collects heterogeneous activity records (notifications, direct
//! messages, grade postings, calendar events) scattered across independently
//! owned document-store collections and presents them as one deduplicated,
//! time-ordered, unread-aware feed.
//!
//! ## Services
//!
//! - **Store**: document-store boundary (MongoDB or in-memory)
//! - **Feed**: source adapters, identity resolution, merge/dedupe, builder
//! - **ReadState**: per-kind read acknowledgment write-back
//! - **Cache**: session-scoped TTL cache for feed results
//! - **Poll**: interval-driven feed refresh

pub mod cache;
pub mod config;
pub mod feed;
pub mod poll;
pub mod readstate;
pub mod store;
pub mod types;
pub mod util;

pub use config::Args;
pub use feed::{Feed, FeedItem, FeedKind, FeedScope, FeedService};
pub use types::{HeraldError, Result};
