//! Ordered key-value storage for sync queues.
//!
//! This crate provides:
//! - The [`ItemStore`] trait: an ordered, range-scannable key-value namespace
//!   with insert-if-absent and guarded delete primitives
//! - [`SqliteItemStore`]: durable store backed by one SQLite file, safe to
//!   share between processes (WAL mode + busy timeout)
//! - [`MemoryItemStore`]: in-process store for tests and embedding
//!
//! # Coordination
//!
//! Queues never rely on in-memory locks for cross-process exclusion. Every
//! exclusivity guarantee is built from two primitives:
//!
//! - [`ItemStore::insert_if_absent`]: exactly one caller wins a key
//! - [`ItemStore::delete_if_match`]: re-validate a token and delete in one step
//!
//! ```ignore
//! let store = SqliteItemStore::open(&path)?;
//! if store.insert_if_absent("sync-checkout", b"buffer-1")? {
//!     // we own the checkout
//! }
//! ```

mod error;
mod memory;
mod migrations;
mod sqlite;
mod store;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryItemStore;
pub use migrations::{run_migrations, CURRENT_VERSION};
pub use sqlite::SqliteItemStore;
pub use store::{ItemStore, KeyRange, StoreRecord};
