//! Optimistic send pipeline.
//!
//! A send shows up in the store before the network call resolves:
//!
//! 1. reject input that is empty after trimming
//! 2. encode the trimmed text
//! 3. prepend a `Pending` message under a provisional id
//! 4. issue the create request
//! 5. on success, reconcile the provisional entry against the confirmed one
//! 6. on failure, remove the provisional entry and hand back the typed text
//!
//! The live feed may deliver the confirmed message before the create
//! response arrives. [`SharedStore::replace_by_id`] absorbs that race: the
//! store ends up holding the confirmed id exactly once.
//!
//! Steps 4 to 6 run on a spawned task. A caller that stops waiting (a
//! `select!`, a timeout, a closed screen) does not strand the pending entry:
//! it is still confirmed or rolled back when the request resolves.

use std::sync::Arc;

use roomsync_core::{encode, ReplaceOutcome};
use roomsync_types::{Message, MessageId, MessageState, RoomId, SyncError};

use crate::backend::{ChatBackend, IdentityProvider};
use crate::store::SharedStore;

/// Sends messages for one room.
pub struct SendPipeline<B: ChatBackend> {
    backend: Arc<B>,
    identity: Arc<dyn IdentityProvider>,
    room_id: RoomId,
    store: SharedStore,
}

impl<B: ChatBackend + 'static> SendPipeline<B> {
    /// Create a pipeline for `room_id` writing into `store`.
    pub fn new(
        backend: Arc<B>,
        identity: Arc<dyn IdentityProvider>,
        room_id: RoomId,
        store: SharedStore,
    ) -> Self {
        Self {
            backend,
            identity,
            room_id,
            store,
        }
    }

    /// Send typed text.
    ///
    /// Returns the confirmed message. On [`SyncError::SendFailed`] the
    /// provisional entry has been rolled back and the error carries `text`
    /// exactly as given. Dropping the returned future after the provisional
    /// entry is shown does not cancel the request.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn send(&self, text: &str) -> Result<Message, SyncError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(SyncError::EmptyMessage);
        }

        let sender = self.identity.current_sender();
        let provisional = Message::provisional(self.room_id.clone(), &sender, encode(trimmed));
        let provisional_id = provisional.id.clone();
        let body = provisional.body.clone();

        if !self.store.prepend(provisional).await {
            return Err(SyncError::RoomClosed);
        }
        tracing::debug!("Sending {} to room={}", provisional_id, self.room_id);

        let outbound = Outbound {
            backend: Arc::clone(&self.backend),
            store: self.store.clone(),
            room_id: self.room_id.clone(),
            provisional_id: provisional_id.clone(),
            body,
            original_text: text.to_string(),
        };

        match tokio::spawn(outbound.deliver()).await {
            Ok(result) => result,
            Err(e) => {
                self.store.remove_by_id(&provisional_id).await;
                tracing::warn!(
                    "Send task for room={} aborted, rolled back {}: {}",
                    self.room_id,
                    provisional_id,
                    e
                );
                Err(SyncError::SendFailed {
                    reason: e.to_string(),
                    original_text: text.to_string(),
                })
            }
        }
    }
}

/// A provisional message awaiting its create response.
struct Outbound<B: ChatBackend> {
    backend: Arc<B>,
    store: SharedStore,
    room_id: RoomId,
    provisional_id: MessageId,
    body: String,
    original_text: String,
}

impl<B: ChatBackend> Outbound<B> {
    /// Issue the create request and reconcile the store with its outcome.
    async fn deliver(self) -> Result<Message, SyncError> {
        let mut confirmed = match self.backend.create_message(&self.room_id, &self.body).await {
            Ok(confirmed) => confirmed,
            Err(e) => {
                self.store.remove_by_id(&self.provisional_id).await;
                tracing::warn!(
                    "Send failed for room={}, rolled back {}: {}",
                    self.room_id,
                    self.provisional_id,
                    e
                );
                return Err(SyncError::SendFailed {
                    reason: e.to_string(),
                    original_text: self.original_text,
                });
            }
        };
        confirmed.state = MessageState::Confirmed;

        match self
            .store
            .replace_by_id(&self.provisional_id, confirmed.clone())
            .await
        {
            Some(ReplaceOutcome::Replaced) => {
                tracing::debug!("Confirmed {} as {}", self.provisional_id, confirmed.id);
            }
            Some(ReplaceOutcome::DuplicateDiscarded) => {
                tracing::debug!(
                    "Feed delivered {} first, dropped {}",
                    confirmed.id,
                    self.provisional_id
                );
            }
            Some(ReplaceOutcome::Inserted) => {
                tracing::debug!(
                    "Provisional {} was gone, inserted {}",
                    self.provisional_id,
                    confirmed.id
                );
            }
            None => {
                tracing::debug!(
                    "Send of {} completed after room={} closed",
                    confirmed.id,
                    self.room_id
                );
            }
        }

        Ok(confirmed)
    }
}
