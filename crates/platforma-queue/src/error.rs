//! Queue errors.

use thiserror::Error;

/// Result type for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Error, Debug)]
pub enum QueueError {
    /// The submission did not fit within the configured timeout.
    #[error("enqueue timed out")]
    Timeout,

    /// The queue was not opened, or has already been closed.
    #[error("queue is closed")]
    ClosedQueue,

    /// The caller's context ended before the submission completed.
    #[error("context cancelled")]
    Cancelled,

    /// Failure surfaced by the backing provider.
    #[error("queue provider error: {0}")]
    Provider(#[source] Box<dyn std::error::Error + Send + Sync>),
}
