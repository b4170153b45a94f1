//! Delivery error types.

use thiserror::Error;

/// Errors from delivery surfaces.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// No template with the requested id exists.
    #[error("template not found: {id}")]
    TemplateMissing {
        /// The template id that was looked up.
        id: String,
    },

    /// Template rendering failed.
    #[error("failed to render template {id}: {reason}")]
    Render {
        /// The template id being rendered.
        id: String,
        /// What went wrong.
        reason: String,
    },

    /// The mail transport rejected or failed the send.
    #[error("mail send failed: {reason}")]
    Send {
        /// What went wrong.
        reason: String,
    },

    /// The notification store rejected the write.
    #[error("notification store error: {reason}")]
    Store {
        /// What went wrong.
        reason: String,
    },

    /// The broadcast transport failed to publish.
    #[error("broadcast failed: {reason}")]
    Broadcast {
        /// What went wrong.
        reason: String,
    },

    /// The user directory lookup failed.
    #[error("user directory error: {reason}")]
    Directory {
        /// What went wrong.
        reason: String,
    },
}

/// Result alias for delivery operations.
pub type Result<T> = std::result::Result<T, NotifyError>;
