//! Feed aggregation pipeline
//!
//! fetch -> normalize -> merge -> dedupe -> sort -> cache, with read-state
//! write-back handled by [`crate::readstate`].

pub mod adapters;
pub mod builder;
pub mod item;
pub mod merge;
pub mod resolver;
pub mod service;
pub mod timestamp;

pub use adapters::FeedScope;
pub use builder::{Feed, PAGE_SIZE};
pub use item::{FeedItem, FeedKind, SourceRef};
pub use resolver::IdentityResolver;
pub use service::{FeedConfig, FeedService};
