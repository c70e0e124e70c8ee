//! Durable ordered queue over an item store.

use crate::keys::{self, KeyGenerator};
use crate::{Buffer, QueueError, QueueItem, QueueResult};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use sync_queue_store::{ItemStore, StoreRecord};
use tracing::{debug, info, warn};

/// Default number of items per checkout.
pub const DEFAULT_CHECKOUT_SIZE: usize = 10;

/// Default lifetime of a whole-queue lock before it counts as stale.
pub const DEFAULT_LOCK_TTL: Duration = Duration::from_secs(300);

/// Attempts at finding a free key for a single append.
pub const MAX_APPEND_ATTEMPTS: u32 = 64;

/// A named queue.
///
/// Handles hold no in-memory coordination state: every guarantee comes from
/// the store, so any number of handles (in any number of processes) may
/// operate on the same queue.
pub struct Queue {
    pub(crate) name: String,
    pub(crate) store: Arc<dyn ItemStore>,
    pub(crate) keys: KeyGenerator,
    checkout_size: usize,
    pub(crate) lock_ttl: Duration,
}

impl Queue {
    /// Open a handle on the queue called `name`.
    pub fn new(name: &str, store: Arc<dyn ItemStore>) -> QueueResult<Self> {
        Ok(Self {
            name: keys::normalize_queue_name(name)?,
            store,
            keys: KeyGenerator::new(),
            checkout_size: DEFAULT_CHECKOUT_SIZE,
            lock_ttl: DEFAULT_LOCK_TTL,
        })
    }

    /// Replace the key generator (clock and writer id).
    pub fn with_key_generator(mut self, keys: KeyGenerator) -> Self {
        self.keys = keys;
        self
    }

    pub fn with_checkout_size(mut self, checkout_size: usize) -> QueueResult<Self> {
        self.set_checkout_size(checkout_size)?;
        Ok(self)
    }

    pub fn with_lock_ttl(mut self, lock_ttl: Duration) -> Self {
        self.lock_ttl = lock_ttl;
        self
    }

    /// Normalized queue name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn checkout_size(&self) -> usize {
        self.checkout_size
    }

    pub fn set_checkout_size(&mut self, checkout_size: usize) -> QueueResult<()> {
        if checkout_size == 0 {
            return Err(QueueError::InvalidArgument(
                "checkout size must be at least 1".to_string(),
            ));
        }
        self.checkout_size = checkout_size;
        Ok(())
    }

    // ==========================================
    // Appends
    // ==========================================

    /// Append one item, returning its id.
    ///
    /// Keys are inserted with insert-if-absent; on a collision a fresh key is
    /// generated and the insert retried, so an existing item is never
    /// overwritten.
    pub fn append(&self, value: &Value) -> QueueResult<String> {
        let bytes = serde_json::to_vec(value)?;

        for attempt in 1..=MAX_APPEND_ATTEMPTS {
            let key = self.keys.item_key(&self.name);
            if self.store.insert_if_absent(&key, &bytes)? {
                debug!(queue = %self.name, item_id = %key, "Appended item");
                return Ok(key);
            }
            debug!(queue = %self.name, item_id = %key, attempt, "Item key taken, regenerating");
        }

        Err(QueueError::KeyCollision {
            attempts: MAX_APPEND_ATTEMPTS,
        })
    }

    /// Append several items with one multi-row insert.
    ///
    /// Colliding keys are skipped by the store; if fewer rows land than were
    /// requested this fails with `RowCountMismatch` and leaves the inserted
    /// rows in place.
    pub fn append_batch(&self, values: &[Value]) -> QueueResult<usize> {
        if values.is_empty() {
            return Ok(0);
        }

        let keys = self.keys.batch_keys(&self.name, values.len());
        let records = keys
            .into_iter()
            .zip(values)
            .map(|(key, value)| -> QueueResult<StoreRecord> {
                Ok(StoreRecord::new(key, serde_json::to_vec(value)?))
            })
            .collect::<QueueResult<Vec<_>>>()?;

        let inserted = self.store.insert_batch(&records)?;
        if inserted != records.len() {
            warn!(
                queue = %self.name,
                expected = records.len(),
                inserted,
                "Batch append stored fewer rows than requested"
            );
            return Err(QueueError::RowCountMismatch {
                expected: records.len(),
                inserted,
            });
        }

        debug!(queue = %self.name, count = inserted, "Appended batch");
        Ok(inserted)
    }

    // ==========================================
    // Reads
    // ==========================================

    /// Number of stored items, including checked-out ones.
    pub fn size(&self) -> QueueResult<usize> {
        Ok(self.store.count(&keys::item_range(&self.name))?)
    }

    /// Age of the oldest item, zero when the queue is empty.
    pub fn lag(&self) -> QueueResult<Duration> {
        let oldest = self.store.scan(&keys::item_range(&self.name), Some(1))?;
        let Some(record) = oldest.first() else {
            return Ok(Duration::ZERO);
        };
        let Some(enqueued_at) = keys::parse_item_timestamp(&self.name, &record.key) else {
            warn!(queue = %self.name, item_id = %record.key, "Unparseable item key");
            return Ok(Duration::ZERO);
        };
        Ok((self.keys.now() - enqueued_at)
            .to_std()
            .unwrap_or(Duration::ZERO))
    }

    /// Every stored item in ascending key order, without removing anything.
    pub fn get_all(&self) -> QueueResult<Vec<QueueItem>> {
        self.read_items(None)
    }

    /// The oldest `limit` items in ascending key order.
    pub fn peek(&self, limit: usize) -> QueueResult<Vec<QueueItem>> {
        self.read_items(Some(limit))
    }

    fn read_items(&self, limit: Option<usize>) -> QueueResult<Vec<QueueItem>> {
        self.store
            .scan(&keys::item_range(&self.name), limit)?
            .into_iter()
            .map(|record| -> QueueResult<QueueItem> {
                Ok(QueueItem {
                    value: serde_json::from_slice(&record.value)?,
                    id: record.key,
                })
            })
            .collect()
    }

    // ==========================================
    // Checkout
    // ==========================================

    /// Id of the outstanding buffer, if any.
    pub fn checkout_token(&self) -> QueueResult<Option<String>> {
        Ok(self
            .store
            .get(&keys::checkout_key(&self.name))?
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// Reserve the oldest `n` items (default: the checkout size).
    ///
    /// Returns `Ok(None)` when the queue is empty and `AlreadyCheckedOut`
    /// when another buffer is outstanding or wins the token race. Never
    /// blocks.
    pub fn checkout(&self, n: Option<usize>) -> QueueResult<Option<Buffer>> {
        let n = n.unwrap_or(self.checkout_size);
        if n == 0 {
            return Err(QueueError::InvalidArgument(
                "checkout size must be at least 1".to_string(),
            ));
        }

        let token_key = keys::checkout_key(&self.name);
        if self.store.get(&token_key)?.is_some() {
            return Err(self.already_checked_out());
        }

        let items = self.peek(n)?;
        if items.is_empty() {
            return Ok(None);
        }

        let buffer = Buffer::new(uuid::Uuid::new_v4().to_string(), items);
        if !self
            .store
            .insert_if_absent(&token_key, buffer.id().as_bytes())?
        {
            return Err(self.already_checked_out());
        }

        debug!(
            queue = %self.name,
            buffer_id = %buffer.id(),
            count = buffer.len(),
            "Checked out buffer"
        );
        Ok(Some(buffer))
    }

    /// Release the checkout without deleting any item.
    pub fn checkin(&self, buffer: &Buffer) -> QueueResult<()> {
        let token_key = keys::checkout_key(&self.name);
        match self
            .store
            .delete_if_match(&token_key, buffer.id().as_bytes(), &[token_key.clone()])?
        {
            Some(_) => {
                debug!(queue = %self.name, buffer_id = %buffer.id(), "Checked in buffer");
                Ok(())
            }
            None => Err(self.validation_failure(buffer)?),
        }
    }

    /// Delete the confirmed items and release the checkout, as one step.
    ///
    /// Ids outside this queue's item range are ignored. Returns the number of
    /// items deleted.
    pub fn close(&self, buffer: &Buffer, confirmed_ids: &[String]) -> QueueResult<usize> {
        let range = keys::item_range(&self.name);
        let token_key = keys::checkout_key(&self.name);

        let mut doomed: Vec<String> = Vec::with_capacity(confirmed_ids.len() + 1);
        for id in confirmed_ids {
            if range.contains(id) {
                doomed.push(id.clone());
            } else {
                warn!(queue = %self.name, item_id = %id, "Ignoring id outside queue");
            }
        }
        doomed.push(token_key.clone());

        match self
            .store
            .delete_if_match(&token_key, buffer.id().as_bytes(), &doomed)?
        {
            Some(deleted) => {
                // The token itself is one of the deleted keys.
                let items = deleted.saturating_sub(1);
                debug!(
                    queue = %self.name,
                    buffer_id = %buffer.id(),
                    count = items,
                    "Closed buffer"
                );
                Ok(items)
            }
            None => Err(self.validation_failure(buffer)?),
        }
    }

    /// Clear the checkout token whoever holds it.
    pub fn force_checkin(&self) -> QueueResult<()> {
        let removed = self
            .store
            .delete_keys(&[keys::checkout_key(&self.name)])?;
        if removed > 0 {
            info!(queue = %self.name, "Forced checkin");
        }
        Ok(())
    }

    // ==========================================
    // Maintenance
    // ==========================================

    /// Clear the checkout token and delete every item.
    pub fn reset(&self) -> QueueResult<()> {
        self.store
            .delete_keys(&[keys::checkout_key(&self.name)])?;
        let deleted = self.store.delete_range(&keys::item_range(&self.name))?;
        info!(queue = %self.name, count = deleted, "Reset queue");
        Ok(())
    }

    /// Return every item's value, then reset. Not meant for concurrent use.
    pub fn flush_all(&self) -> QueueResult<Vec<Value>> {
        let values: Vec<Value> = self.get_all()?.into_iter().map(|i| i.value).collect();
        self.reset()?;
        info!(queue = %self.name, count = values.len(), "Flushed queue");
        Ok(values)
    }

    fn already_checked_out(&self) -> QueueError {
        QueueError::AlreadyCheckedOut {
            queue: self.name.clone(),
        }
    }

    /// Explain why a guarded checkin/close was refused.
    fn validation_failure(&self, buffer: &Buffer) -> QueueResult<QueueError> {
        Ok(match self.checkout_token()? {
            None => QueueError::NotCheckedOut {
                queue: self.name.clone(),
            },
            Some(_) => {
                warn!(
                    queue = %self.name,
                    buffer_id = %buffer.id(),
                    "Rejected stale buffer"
                );
                QueueError::BufferMismatch {
                    queue: self.name.clone(),
                    presented: buffer.id().to_string(),
                }
            }
        })
    }
}
