//! RoomSession - the per-room scope object applications hold.
//!
//! A session owns everything a single open room needs: its message store,
//! snapshot loader, live feed and send pipeline. Nothing is process-wide;
//! opening a room creates the scope and closing it tears the scope down.
//!
//! # Architecture
//!
//! ```text
//!                       ┌─→ SnapshotLoader ─────┐
//! Application → RoomSession ─→ SubscriptionManager ─┼─→ SharedStore → view
//!                       └─→ SendPipeline ───────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use roomsync_client::{MockBackend, RoomSession, SyncConfig};
//!
//! let backend = Arc::new(MockBackend::default());
//! let identity = Arc::new(SenderIdentity::new("u1"));
//! let mut room = RoomSession::open(SyncConfig::default(), backend, identity, "general".into()).await;
//!
//! room.send("**hello**").await?;
//! let messages = room.messages().await;
//!
//! room.close().await;
//! ```

use std::sync::Arc;

use roomsync_core::ConnectionState;
use roomsync_types::{Message, RoomId, SyncError};
use tokio::sync::watch;

use crate::backend::{ChatBackend, IdentityProvider};
use crate::config::SyncConfig;
use crate::send::SendPipeline;
use crate::snapshot::{SnapshotLoader, SnapshotStatus};
use crate::store::SharedStore;
use crate::subscription::SubscriptionManager;

/// One open room.
///
/// Dropping a session without calling [`close`](Self::close) still aborts
/// its feed task.
pub struct RoomSession<B: ChatBackend + 'static> {
    room_id: RoomId,
    store: SharedStore,
    loader: SnapshotLoader<B>,
    feed: SubscriptionManager<B>,
    sender: SendPipeline<B>,
    snapshot: watch::Sender<SnapshotStatus>,
}

impl<B: ChatBackend + 'static> RoomSession<B> {
    /// Open a room: create its store, load the snapshot and start the feed.
    ///
    /// A failed snapshot does not prevent opening; it is reported through
    /// [`snapshot_status`](Self::snapshot_status) and can be retried with
    /// [`reload`](Self::reload).
    pub async fn open(
        config: SyncConfig,
        backend: Arc<B>,
        identity: Arc<dyn IdentityProvider>,
        room_id: RoomId,
    ) -> Self {
        let store = SharedStore::new();
        let loader = SnapshotLoader::new(Arc::clone(&backend), room_id.clone(), store.clone());
        let feed = SubscriptionManager::new(
            Arc::clone(&backend),
            room_id.clone(),
            store.clone(),
            config,
        );
        let sender = SendPipeline::new(backend, identity, room_id.clone(), store.clone());
        let (snapshot, _) = watch::channel(SnapshotStatus::NotLoaded);

        let mut session = Self {
            room_id,
            store,
            loader,
            feed,
            sender,
            snapshot,
        };

        tracing::info!("Opening room={}", session.room_id);
        let _ = session.reload().await;
        session.feed.start();
        session
    }

    /// The room this session belongs to.
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Newest-first messages of this room.
    pub async fn messages(&self) -> Vec<Message> {
        self.store.view_for_room(&self.room_id).await
    }

    /// Revision counter bumped on every store change.
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.store.changes()
    }

    /// Current live feed state.
    pub fn connection_state(&self) -> ConnectionState {
        self.feed.state()
    }

    /// Receiver for live feed state changes.
    pub fn connection_updates(&self) -> watch::Receiver<ConnectionState> {
        self.feed.updates()
    }

    /// Why the live feed last dropped, cleared once it reconnects.
    pub fn feed_error(&self) -> Option<SyncError> {
        self.feed.last_error()
    }

    /// Outcome of the most recent snapshot load.
    pub fn snapshot_status(&self) -> SnapshotStatus {
        self.snapshot.borrow().clone()
    }

    /// Receiver for snapshot status changes.
    pub fn snapshot_updates(&self) -> watch::Receiver<SnapshotStatus> {
        self.snapshot.subscribe()
    }

    /// Send typed text optimistically.
    pub async fn send(&self, text: &str) -> Result<Message, SyncError> {
        self.sender.send(text).await
    }

    /// Re-run the snapshot loader.
    ///
    /// On failure the store keeps its current contents.
    pub async fn reload(&self) -> Result<usize, SyncError> {
        let result = self.loader.load().await;
        self.snapshot
            .send_replace(SnapshotStatus::from_result(&result));
        result
    }

    /// Bring the room back to the foreground.
    ///
    /// Reloads the snapshot to catch up on anything missed, then tears down
    /// the live feed and starts it again.
    pub async fn resume(&mut self) -> Result<usize, SyncError> {
        if !self.store.is_open().await {
            return Err(SyncError::RoomClosed);
        }
        tracing::info!("Resuming room={}", self.room_id);
        let result = self.reload().await;
        self.feed.start();
        result
    }

    /// Close the room: stop the feed and discard the store. Idempotent.
    ///
    /// Sends or snapshot loads still in flight complete without touching the
    /// discarded store, including sends whose caller stopped waiting.
    pub async fn close(&mut self) {
        if !self.store.is_open().await {
            return;
        }
        self.feed.stop().await;
        self.store.close().await;
        tracing::info!("Closed room={}", self.room_id);
    }

    /// Check whether the room is still open.
    pub async fn is_open(&self) -> bool {
        self.store.is_open().await
    }
}
