//! Shared, closable handle to a room's [`MessageStore`].
//!
//! The snapshot loader, the live feed task and the send pipeline all write to
//! the same store. Every operation takes the lock once, so each mutation is
//! atomic with respect to the others. Closing the store turns every later
//! mutation into a no-op, which is how a closed room ignores late feed
//! events and late create responses.
//!
//! Observers follow a revision counter through [`SharedStore::changes`]; it
//! is bumped after every mutation that changed the contents.

use std::sync::Arc;

use roomsync_core::{MessageStore, ReplaceOutcome};
use roomsync_types::{Message, MessageId, RoomId};
use tokio::sync::{watch, Mutex};

/// Cloneable handle to one room's message store.
#[derive(Debug, Clone)]
pub struct SharedStore {
    inner: Arc<Mutex<Option<MessageStore>>>,
    revision: Arc<watch::Sender<u64>>,
}

impl SharedStore {
    /// Create an open, empty store.
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            inner: Arc::new(Mutex::new(Some(MessageStore::new()))),
            revision: Arc::new(revision),
        }
    }

    fn bump(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }

    /// Replace the whole collection with an oldest-first snapshot.
    ///
    /// Returns `false` if the store is closed.
    pub async fn replace_all(&self, oldest_first: Vec<Message>) -> bool {
        let mut guard = self.inner.lock().await;
        let Some(store) = guard.as_mut() else {
            return false;
        };
        store.replace_all(oldest_first);
        drop(guard);
        self.bump();
        true
    }

    /// Insert at the front unless the id is already present.
    ///
    /// Returns `true` if inserted; `false` for duplicates or a closed store.
    pub async fn prepend(&self, message: Message) -> bool {
        let mut guard = self.inner.lock().await;
        let Some(store) = guard.as_mut() else {
            return false;
        };
        let inserted = store.prepend(message);
        drop(guard);
        if inserted {
            self.bump();
        }
        inserted
    }

    /// Swap a provisional record for its confirmed counterpart.
    ///
    /// Returns `None` if the store is closed.
    pub async fn replace_by_id(&self, old_id: &MessageId, new: Message) -> Option<ReplaceOutcome> {
        let mut guard = self.inner.lock().await;
        let store = guard.as_mut()?;
        let outcome = store.replace_by_id(old_id, new);
        drop(guard);
        self.bump();
        Some(outcome)
    }

    /// Remove a message by id.
    pub async fn remove_by_id(&self, id: &MessageId) -> Option<Message> {
        let mut guard = self.inner.lock().await;
        let removed = guard.as_mut()?.remove_by_id(id);
        drop(guard);
        if removed.is_some() {
            self.bump();
        }
        removed
    }

    /// Newest-first copy of the messages belonging to `room_id`.
    ///
    /// Empty once the store is closed.
    pub async fn view_for_room(&self, room_id: &RoomId) -> Vec<Message> {
        self.inner
            .lock()
            .await
            .as_ref()
            .map(|store| store.view_for_room(room_id))
            .unwrap_or_default()
    }

    /// Check whether a message id is present.
    pub async fn contains(&self, id: &MessageId) -> bool {
        self.inner
            .lock()
            .await
            .as_ref()
            .is_some_and(|store| store.contains(id))
    }

    /// Number of messages held.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.as_ref().map_or(0, MessageStore::len)
    }

    /// Check if the store holds no messages.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Number of messages still awaiting confirmation.
    pub async fn pending_count(&self) -> usize {
        self.inner
            .lock()
            .await
            .as_ref()
            .map_or(0, MessageStore::pending_count)
    }

    /// Check whether the store still accepts mutations.
    pub async fn is_open(&self) -> bool {
        self.inner.lock().await.is_some()
    }

    /// Drop the contents and reject all further mutations. Idempotent.
    pub async fn close(&self) {
        let was_open = self.inner.lock().await.take().is_some();
        if was_open {
            self.bump();
        }
    }

    /// Subscribe to the revision counter.
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }
}

impl Default for SharedStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomsync_types::MessageState;

    fn room() -> RoomId {
        RoomId::new("general")
    }

    fn msg(id: &str) -> Message {
        Message {
            id: MessageId::new(id),
            room_id: room(),
            sender_id: "u1".into(),
            sender_nickname: None,
            body: format!("body {id}"),
            created_at: 0,
            state: MessageState::Confirmed,
        }
    }

    #[tokio::test]
    async fn snapshot_then_view_is_newest_first() {
        let store = SharedStore::new();

        assert!(store.replace_all(vec![msg("a"), msg("b"), msg("c")]).await);

        let ids: Vec<_> = store
            .view_for_room(&room())
            .await
            .into_iter()
            .map(|m| m.id.to_string())
            .collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
    }

    #[tokio::test]
    async fn duplicate_prepend_does_not_bump_revision() {
        let store = SharedStore::new();
        let changes = store.changes();

        assert!(store.prepend(msg("a")).await);
        let after_first = *changes.borrow();
        assert!(!store.prepend(msg("a")).await);

        assert_eq!(*changes.borrow(), after_first);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn replace_and_remove() {
        let store = SharedStore::new();
        let mut pending = msg("local-1-x");
        pending.state = MessageState::Pending;
        store.prepend(pending).await;
        assert_eq!(store.pending_count().await, 1);

        let outcome = store
            .replace_by_id(&MessageId::new("local-1-x"), msg("m1"))
            .await;
        assert_eq!(outcome, Some(ReplaceOutcome::Replaced));
        assert_eq!(store.pending_count().await, 0);

        assert!(store.remove_by_id(&MessageId::new("m1")).await.is_some());
        assert!(store.remove_by_id(&MessageId::new("m1")).await.is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn closed_store_ignores_mutations() {
        let store = SharedStore::new();
        store.prepend(msg("a")).await;

        store.close().await;
        store.close().await;

        assert!(!store.is_open().await);
        assert!(!store.prepend(msg("b")).await);
        assert!(!store.replace_all(vec![msg("c")]).await);
        assert_eq!(
            store.replace_by_id(&MessageId::new("a"), msg("d")).await,
            None
        );
        assert!(store.view_for_room(&room()).await.is_empty());
        assert!(!store.contains(&MessageId::new("a")).await);
    }

    #[tokio::test]
    async fn clones_share_contents() {
        let store = SharedStore::new();
        let other = store.clone();

        other.prepend(msg("a")).await;

        assert!(store.contains(&MessageId::new("a")).await);
    }
}
