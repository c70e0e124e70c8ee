//! Endpoint error types.

use crate::error_codes;
use sync_codec::CodecError;
use sync_queue::QueueError;
use sync_queue_store::StoreError;
use thiserror::Error;

/// Endpoint error type.
#[derive(Error, Debug)]
pub enum EndpointError {
    /// Queue name missing or not on the allow-list
    #[error("Invalid queue: {0}")]
    InvalidQueueName(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A required parameter was not supplied
    #[error("Missing argument: {0}")]
    MissingArgument(String),

    #[error("Invalid sync module: {0}")]
    InvalidModule(String),

    /// Checkout stayed contested for the whole retry budget
    #[error("Buffer for queue {queue} is checked out; try again later")]
    BufferBusy { queue: String },

    /// A collaborator is not wired up in this deployment
    #[error("{0} is not available")]
    Unavailable(&'static str),

    /// A collaborator failed
    #[error("{0}")]
    Collaborator(String),

    /// Queue error
    #[error(transparent)]
    Queue(#[from] QueueError),

    /// Codec error
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Store error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EndpointError {
    /// Stable snake_case kind, carried in `error.data.kind`.
    pub fn kind(&self) -> &'static str {
        match self {
            EndpointError::InvalidQueueName(_) => "invalid_queue_name",
            EndpointError::InvalidArgument(_) => "invalid_argument",
            EndpointError::MissingArgument(_) => "missing_argument",
            EndpointError::InvalidModule(_) => "invalid_module",
            EndpointError::BufferBusy { .. } => "buffer_busy",
            EndpointError::Unavailable(_) => "unavailable",
            EndpointError::Collaborator(_) => "collaborator_error",
            EndpointError::Queue(e) => e.kind(),
            EndpointError::Codec(e) => e.kind(),
            EndpointError::Store(e) => e.kind(),
            EndpointError::Json(_) => "serialization",
        }
    }

    /// Response error code.
    pub fn code(&self) -> i32 {
        match self {
            EndpointError::InvalidQueueName(_)
            | EndpointError::InvalidArgument(_)
            | EndpointError::MissingArgument(_)
            | EndpointError::InvalidModule(_) => error_codes::INVALID_PARAMS,
            EndpointError::BufferBusy { .. } => error_codes::BUFFER_BUSY,
            EndpointError::Queue(QueueError::InvalidQueueName(_))
            | EndpointError::Queue(QueueError::InvalidArgument(_)) => error_codes::INVALID_PARAMS,
            EndpointError::Queue(QueueError::AlreadyCheckedOut { .. })
            | EndpointError::Queue(QueueError::NotCheckedOut { .. })
            | EndpointError::Queue(QueueError::BufferMismatch { .. }) => error_codes::CONFLICT,
            EndpointError::Queue(QueueError::LockTimeout { .. }) => error_codes::LOCK_TIMEOUT,
            _ => error_codes::INTERNAL_ERROR,
        }
    }
}

/// Result type alias using EndpointError.
pub type EndpointResult<T> = Result<T, EndpointError>;
