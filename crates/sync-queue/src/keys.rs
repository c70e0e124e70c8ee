//! Key layout for queue records.
//!
//! Every queue owns a slice of the store's keyspace:
//!
//! - `<name>-<secs:010>.<nanos:09>-<writer>.<seq>` for appended items
//! - `<name>-<secs:010>.<nanos:09>-<writer>.<seq>-<index:06>` for batch members
//! - `<name>-checkout` for the checkout token
//! - `<name>-lock` for the whole-queue lock
//!
//! Item keys start with a digit after the separator and singleton keys with a
//! letter, so the item range `[<name>-0, <name>-:)` never contains them.

use crate::{QueueError, QueueResult};
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use sync_queue_store::KeyRange;

/// Wall-clock source, injectable for tests.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

const NANOS_PER_SEC: i64 = 1_000_000_000;

/// Normalize a queue name.
///
/// `-` becomes `_` so the key separator stays unambiguous; the result must be
/// non-empty ASCII alphanumerics and underscores.
///
/// # Example
///
/// ```ignore
/// assert_eq!(normalize_queue_name("full-sync")?, "full_sync");
/// ```
pub fn normalize_queue_name(name: &str) -> QueueResult<String> {
    let normalized = name.replace('-', "_");
    if normalized.is_empty()
        || !normalized
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(QueueError::InvalidQueueName(name.to_string()));
    }
    Ok(normalized)
}

/// Key of the checkout token.
///
/// # Example
///
/// ```ignore
/// assert_eq!(checkout_key("sync"), "sync-checkout");
/// ```
#[inline]
pub fn checkout_key(queue: &str) -> String {
    format!("{queue}-checkout")
}

/// Key of the whole-queue lock.
#[inline]
pub fn lock_key(queue: &str) -> String {
    format!("{queue}-lock")
}

/// Range covering every item of a queue and nothing else.
#[inline]
pub fn item_range(queue: &str) -> KeyRange {
    KeyRange::new(format!("{queue}-0"), format!("{queue}-:"))
}

/// Format a nanosecond timestamp as `<secs:010>.<nanos:09>`.
///
/// # Example
///
/// ```ignore
/// assert_eq!(format_timestamp(1_700_000_000_000_000_042), "1700000000.000000042");
/// ```
#[inline]
pub fn format_timestamp(nanos: i64) -> String {
    format!(
        "{:010}.{:09}",
        nanos / NANOS_PER_SEC,
        nanos % NANOS_PER_SEC
    )
}

/// Key of a single appended item.
#[inline]
pub fn item_key(queue: &str, nanos: i64, writer_id: u32, seq: u64) -> String {
    format!("{queue}-{}-{writer_id}.{seq}", format_timestamp(nanos))
}

/// Key of the `index`th member of a batch append.
#[inline]
pub fn batch_item_key(queue: &str, nanos: i64, writer_id: u32, seq: u64, index: usize) -> String {
    format!("{}-{index:06}", item_key(queue, nanos, writer_id, seq))
}

/// Recover the enqueue time encoded in an item key.
///
/// Returns `None` for keys that are not items of `queue`.
pub fn parse_item_timestamp(queue: &str, key: &str) -> Option<DateTime<Utc>> {
    let rest = key.strip_prefix(queue)?.strip_prefix('-')?;
    let stamp = rest.split('-').next()?;
    let (secs, nanos) = stamp.split_once('.')?;
    DateTime::from_timestamp(secs.parse().ok()?, nanos.parse().ok()?)
}

struct GeneratorState {
    last_nanos: i64,
    seq: u64,
}

/// Produces fresh, increasing item key components for one writer.
///
/// The timestamp is strictly increasing per generator: when the clock has not
/// advanced (or went backwards) it is bumped by one nanosecond. The sequence
/// number increases on every call, so a retried append never reuses a key.
pub struct KeyGenerator {
    clock: Clock,
    writer_id: u32,
    state: Mutex<GeneratorState>,
}

impl KeyGenerator {
    /// Generator using the system clock and this process id.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(Utc::now))
    }

    pub fn with_clock(clock: Clock) -> Self {
        Self {
            clock,
            writer_id: std::process::id(),
            state: Mutex::new(GeneratorState {
                last_nanos: 0,
                seq: 0,
            }),
        }
    }

    pub fn with_writer_id(mut self, writer_id: u32) -> Self {
        self.writer_id = writer_id;
        self
    }

    pub fn writer_id(&self) -> u32 {
        self.writer_id
    }

    /// Current time according to this generator's clock.
    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Next `(timestamp_nanos, seq)` pair.
    pub fn next(&self) -> (i64, u64) {
        let now = self.now().timestamp_nanos_opt().unwrap_or(0).max(0);
        // The state is two integers; a panic elsewhere cannot leave it torn.
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let nanos = if now > state.last_nanos {
            now
        } else {
            state.last_nanos + 1
        };
        state.last_nanos = nanos;
        state.seq += 1;
        (nanos, state.seq)
    }

    /// Fresh key for a single append.
    pub fn item_key(&self, queue: &str) -> String {
        let (nanos, seq) = self.next();
        item_key(queue, nanos, self.writer_id, seq)
    }

    /// Fresh keys for a batch append of `count` values, sharing one stamp.
    pub fn batch_keys(&self, queue: &str, count: usize) -> Vec<String> {
        let (nanos, seq) = self.next();
        (0..count)
            .map(|index| batch_item_key(queue, nanos, self.writer_id, seq, index))
            .collect()
    }
}

impl Default for KeyGenerator {
    fn default() -> Self {
        Self::new()
    }
}
