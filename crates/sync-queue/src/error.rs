//! Queue error types.

use sync_queue_store::StoreError;
use thiserror::Error;

/// Queue error type.
#[derive(Error, Debug)]
pub enum QueueError {
    /// Another buffer is outstanding for this queue
    #[error("Queue {queue} already has a buffer checked out")]
    AlreadyCheckedOut { queue: String },

    /// Checkin/close with no buffer outstanding
    #[error("Queue {queue} has no buffer checked out")]
    NotCheckedOut { queue: String },

    /// The presented buffer is not the live one
    #[error("Buffer {presented} does not match the checked-out buffer of queue {queue}")]
    BufferMismatch { queue: String, presented: String },

    #[error("Timed out after {timeout_ms}ms waiting for the lock on queue {queue}")]
    LockTimeout { queue: String, timeout_ms: u64 },

    #[error("Invalid queue name: {0:?}")]
    InvalidQueueName(String),

    /// Bulk insert stored fewer rows than requested
    #[error("Row count mismatch: expected {expected} rows, inserted {inserted}")]
    RowCountMismatch { expected: usize, inserted: usize },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Every generated key for an append was already taken
    #[error("Could not find a free item key after {attempts} attempts")]
    KeyCollision { attempts: u32 },

    /// Store error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A blocking store call panicked or was cancelled
    #[error("Store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl QueueError {
    /// Stable snake_case kind.
    pub fn kind(&self) -> &'static str {
        match self {
            QueueError::AlreadyCheckedOut { .. } => "already_checked_out",
            QueueError::NotCheckedOut { .. } => "not_checked_out",
            QueueError::BufferMismatch { .. } => "buffer_mismatch",
            QueueError::LockTimeout { .. } => "lock_timeout",
            QueueError::InvalidQueueName(_) => "invalid_queue_name",
            QueueError::RowCountMismatch { .. } => "row_count_mismatch",
            QueueError::InvalidArgument(_) => "invalid_argument",
            QueueError::KeyCollision { .. } => "key_collision",
            QueueError::Store(_) => "store",
            QueueError::Json(_) => "serialization",
            QueueError::Task(_) => "task",
        }
    }
}

/// Result type alias using QueueError.
pub type QueueResult<T> = Result<T, QueueError>;
