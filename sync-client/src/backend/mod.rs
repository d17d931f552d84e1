//! Backend abstraction for roomsync.
//!
//! This module provides the collaborator seam between the synchronization
//! engine and whatever data service hosts the rooms (a GraphQL/AppSync-style
//! API, a WebSocket gateway, or the in-process mock used for testing).
//!
//! # Design
//!
//! The backend trait is async and request-oriented:
//! - `fetch_messages()` returns a room's history, oldest first
//! - `create_message()` stores an encoded body and returns the confirmed record
//! - `subscribe()` opens a live feed of newly created messages
//!
//! A live feed is a [`Subscription`]: an event stream plus a cancel hook.
//! Cancelling is idempotent and also happens on drop, so a subscription can
//! never outlive its owner.
//!
//! # Example
//!
//! ```ignore
//! let backend = MockBackend::new(SenderIdentity::new("u1"));
//! let history = backend.fetch_messages(&room).await?;
//! let mut feed = backend.subscribe(&room).await?;
//! while let Some(event) = feed.next_event().await { /* ... */ }
//! ```

mod mock;

pub use mock::MockBackend;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use roomsync_types::{Message, RoomId, SenderIdentity};
use thiserror::Error;

/// Backend errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The request never reached the service or the connection dropped.
    #[error("transport error: {0}")]
    Transport(String),

    /// The service rejected the request.
    #[error("server error {status}: {message}")]
    Server {
        /// Status code reported by the service.
        status: u16,
        /// Service-provided description.
        message: String,
    },

    /// The feed or connection was closed.
    #[error("connection closed")]
    Closed,

    /// The request did not complete in time.
    #[error("request timed out")]
    Timeout,
}

/// Stream of live feed events. A terminal `Err` ends the feed.
pub type EventStream = BoxStream<'static, Result<Message, BackendError>>;

/// Backend trait for the three operations the engine consumes.
///
/// Implementations handle the underlying request mechanism and auth; the
/// sender of a created message is whoever the backend session belongs to.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Fetch a room's messages sorted oldest-first, sender identity expanded.
    async fn fetch_messages(&self, room_id: &RoomId) -> Result<Vec<Message>, BackendError>;

    /// Create a message with an already-encoded body.
    ///
    /// Returns the record with its backend-assigned id and timestamp.
    async fn create_message(&self, room_id: &RoomId, body: &str)
        -> Result<Message, BackendError>;

    /// Open a live feed of messages created in `room_id`.
    ///
    /// Returning `Ok` is the subscribe acknowledgement.
    async fn subscribe(&self, room_id: &RoomId) -> Result<Subscription, BackendError>;
}

/// Source of the current sender identity, read synchronously at send time.
pub trait IdentityProvider: Send + Sync {
    /// The identity messages are sent as right now.
    fn current_sender(&self) -> SenderIdentity;
}

impl IdentityProvider for SenderIdentity {
    fn current_sender(&self) -> SenderIdentity {
        self.clone()
    }
}

/// A live feed handle.
///
/// Holds the event stream and the hook that releases the underlying
/// transport resource. After [`Subscription::cancel`] no further events are
/// delivered.
pub struct Subscription {
    events: EventStream,
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Wrap an event stream and its release hook.
    pub fn new(events: EventStream, cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            events,
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Wait for the next event.
    ///
    /// Returns `None` once the stream completes or the subscription has been
    /// cancelled.
    pub async fn next_event(&mut self) -> Option<Result<Message, BackendError>> {
        if self.cancel.is_none() {
            return None;
        }
        self.events.next().await
    }

    /// Stop delivery and release the transport resource. Idempotent.
    pub fn cancel(&mut self) {
        if let Some(release) = self.cancel.take() {
            release();
        }
    }

    /// Check whether the subscription has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_none()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use roomsync_types::{MessageId, MessageState};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn msg(id: &str) -> Message {
        Message {
            id: MessageId::new(id),
            room_id: RoomId::new("general"),
            sender_id: "u1".into(),
            sender_nickname: None,
            body: "hi".into(),
            created_at: 0,
            state: MessageState::Confirmed,
        }
    }

    fn counting_subscription(
        items: Vec<Result<Message, BackendError>>,
    ) -> (Subscription, Arc<AtomicUsize>) {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&released);
        let sub = Subscription::new(stream::iter(items).boxed(), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (sub, released)
    }

    #[tokio::test]
    async fn subscription_yields_events_in_order() {
        let (mut sub, _) = counting_subscription(vec![Ok(msg("a")), Ok(msg("b"))]);

        assert_eq!(sub.next_event().await.unwrap().unwrap().id, MessageId::new("a"));
        assert_eq!(sub.next_event().await.unwrap().unwrap().id, MessageId::new("b"));
        assert!(sub.next_event().await.is_none());
    }

    #[tokio::test]
    async fn cancel_is_idempotent_and_stops_delivery() {
        let (mut sub, released) = counting_subscription(vec![Ok(msg("a"))]);

        sub.cancel();
        sub.cancel();

        assert!(sub.is_cancelled());
        assert!(sub.next_event().await.is_none());
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_releases_resource_once() {
        let (mut sub, released) = counting_subscription(vec![]);
        sub.cancel();
        drop(sub);
        assert_eq!(released.load(Ordering::SeqCst), 1);

        let (sub, released) = counting_subscription(vec![]);
        drop(sub);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn static_identity_provider() {
        let identity = SenderIdentity::new("u1").with_nickname("ada");
        assert_eq!(identity.current_sender(), identity);
    }

    #[test]
    fn backend_error_display() {
        let err = BackendError::Server {
            status: 503,
            message: "unavailable".into(),
        };
        assert_eq!(err.to_string(), "server error 503: unavailable");
        assert_eq!(BackendError::Closed.to_string(), "connection closed");
    }
}
