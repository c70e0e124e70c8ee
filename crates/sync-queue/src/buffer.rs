//! Checked-out batches.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One stored item: its ordering key and payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: String,
    pub value: Value,
}

/// A snapshot of checked-out items plus the id proving ownership of the
/// checkout.
///
/// A buffer rebuilt from a remote-supplied id (see [`Buffer::from_id`]) carries
/// no items; the queue validates it against the live checkout token before any
/// destructive step.
#[derive(Debug, Clone, PartialEq)]
pub struct Buffer {
    id: String,
    items: Vec<QueueItem>,
}

impl Buffer {
    pub fn new(id: impl Into<String>, items: Vec<QueueItem>) -> Self {
        Self {
            id: id.into(),
            items,
        }
    }

    /// Reconstruct a buffer handle from its id alone.
    pub fn from_id(id: impl Into<String>) -> Self {
        Self::new(id, Vec::new())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Items in ascending key order.
    pub fn items(&self) -> &[QueueItem] {
        &self.items
    }

    pub fn item_ids(&self) -> Vec<String> {
        self.items.iter().map(|i| i.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_items(self) -> Vec<QueueItem> {
        self.items
    }
}
