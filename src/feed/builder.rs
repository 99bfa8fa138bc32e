//! Feed builder
//!
//! Takes the merged, deduplicated item set and produces the consumer-facing
//! feed: newest first, truncated to one page, with the aggregate unread
//! count computed over what is shown.

use serde::{Deserialize, Serialize};

use crate::feed::item::FeedItem;

/// Display page size
pub const PAGE_SIZE: usize = 20;

/// The consumer-facing feed: page of items plus unread count
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feed {
    pub items: Vec<FeedItem>,
    pub unread_count: usize,
}

impl Feed {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            unread_count: 0,
        }
    }

    /// Optimistically mark one item read in this local copy.
    ///
    /// The store write happens separately; this patch keeps the UI
    /// responsive while the authoritative state catches up on the next
    /// reconciled fetch.
    pub fn patch_read(&mut self, item_id: &str) {
        for item in &mut self.items {
            if item.id == item_id && !item.read {
                item.read = true;
                self.unread_count = self.unread_count.saturating_sub(1);
                return;
            }
        }
    }

    /// Optimistically mark every item read in this local copy
    pub fn patch_all_read(&mut self) {
        for item in &mut self.items {
            item.read = true;
        }
        self.unread_count = 0;
    }

    /// Items currently unread
    pub fn unread(&self) -> impl Iterator<Item = &FeedItem> {
        self.items.iter().filter(|item| !item.read)
    }
}

/// Sort descending by timestamp, truncate to `page_size`, count unread
pub fn build(mut items: Vec<FeedItem>, page_size: usize) -> Feed {
    items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    items.truncate(page_size);

    let unread_count = items.iter().filter(|item| !item.read).count();

    Feed {
        items,
        unread_count,
    }
}
