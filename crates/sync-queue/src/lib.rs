//! Durable ordered work queue for change synchronization.
//!
//! Producers [`append`](Queue::append) change records; a consumer
//! [`checkout`](Queue::checkout)s a bounded [`Buffer`] of the oldest items,
//! ships them, then [`close`](Queue::close)s the buffer with the ids the remote
//! side confirmed. Producer and consumer may be separate processes: all
//! coordination goes through the shared [`ItemStore`](sync_queue_store::ItemStore).
//!
//! # Guarantees
//!
//! - At most one buffer is checked out per queue (insert-if-absent on the
//!   checkout token)
//! - Items are deleted only by `close`, `reset` and `flush_all`
//! - `close`/`checkin` re-validate ownership and act in one atomic step
//!
//! ```ignore
//! let queue = Queue::new("sync", store)?;
//! queue.append(&json!(["save_post", [42]]))?;
//! if let Some(buffer) = queue.checkout(None)? {
//!     let sent = transmit(&buffer)?;
//!     queue.close(&buffer, &sent)?;
//! }
//! ```

mod buffer;
mod error;
pub mod keys;
mod lock;
mod queue;

#[cfg(test)]
mod tests;

pub use buffer::{Buffer, QueueItem};
pub use error::{QueueError, QueueResult};
pub use keys::{Clock, KeyGenerator};
pub use lock::LOCK_POLL_INTERVAL;
pub use queue::{Queue, DEFAULT_CHECKOUT_SIZE, DEFAULT_LOCK_TTL, MAX_APPEND_ATTEMPTS};
