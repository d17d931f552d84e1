//! Error types for roomsync.

use thiserror::Error;

/// Errors surfaced by the synchronization engine to the presentation layer.
///
/// None of these are fatal. Duplicate-id collisions are not errors at all:
/// they are absorbed by the message store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// The typed text was empty after trimming; nothing was sent.
    #[error("message is empty")]
    EmptyMessage,

    /// Snapshot load failed; the store was left untouched.
    #[error("failed to load messages: {0}")]
    FetchFailed(String),

    /// The live feed could not be established.
    #[error("subscription failed: {0}")]
    SubscribeFailed(String),

    /// The live feed terminated with an error.
    #[error("subscription stream error: {0}")]
    StreamError(String),

    /// The create request failed and the provisional message was rolled back.
    #[error("failed to send message: {reason}")]
    SendFailed {
        /// Why the backend rejected or lost the request.
        reason: String,
        /// The text exactly as the user typed it, for retry.
        original_text: String,
    },

    /// The room was closed while the operation was in flight.
    #[error("room is closed")]
    RoomClosed,
}

impl SyncError {
    /// The typed text to restore into the composer, if any.
    pub fn original_text(&self) -> Option<&str> {
        match self {
            SyncError::SendFailed { original_text, .. } => Some(original_text),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = SyncError::FetchFailed("server error 500".into());
        assert_eq!(err.to_string(), "failed to load messages: server error 500");
    }

    #[test]
    fn send_failure_keeps_original_text() {
        let err = SyncError::SendFailed {
            reason: "timeout".into(),
            original_text: "  **hi**  ".into(),
        };
        assert_eq!(err.original_text(), Some("  **hi**  "));
        assert_eq!(err.to_string(), "failed to send message: timeout");
        assert_eq!(SyncError::EmptyMessage.original_text(), None);
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SyncError>();
    }
}
