//! Queue error types.

use thiserror::Error;

use crate::lane::Lane;

/// Errors from queue operations.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The lane's worker is gone, usually because the queue was shut down.
    #[error("lane {lane} is closed")]
    LaneClosed {
        /// The lane that rejected the job.
        lane: Lane,
    },
}

/// Result alias for queue operations.
pub type Result<T> = std::result::Result<T, QueueError>;
