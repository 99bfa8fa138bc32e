//! Merge & dedupe engine
//!
//! Unions items from all adapters and collapses duplicate logical items.
//! Two query paths can legitimately return the same underlying record
//! (e.g. a notification addressed to both the principal and their
//! dependent); exactly one representative survives, and its `read` flag is
//! the logical OR of the group. `read` is monotonic within one pass: a
//! group with any read-true member merges to read-true, never the reverse.
//!
//! Dedupe runs before sorting or counting, never after.

use std::collections::HashMap;

use crate::feed::item::FeedItem;

/// Collapse duplicates by id, read-true winning within each group
pub fn merge_dedupe(items: Vec<FeedItem>) -> Vec<FeedItem> {
    let mut merged: Vec<FeedItem> = Vec::with_capacity(items.len());
    let mut index: HashMap<String, usize> = HashMap::new();

    for item in items {
        match index.get(&item.id) {
            Some(&at) => {
                if item.read && !merged[at].read {
                    merged[at] = item;
                }
            }
            None => {
                index.insert(item.id.clone(), merged.len());
                merged.push(item);
            }
        }
    }

    merged
}
