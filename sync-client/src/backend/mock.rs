//! Mock backend for testing.
//!
//! Behaves like a small in-process chat service: it keeps per-room history,
//! assigns `msg-N` ids, and pushes created messages to live subscribers.
//! Tests can queue failures, hold a create response open, inject peer
//! messages and break live feeds.

use super::{BackendError, ChatBackend, Subscription};
use async_trait::async_trait;
use futures_util::stream;
use futures_util::StreamExt;
use roomsync_types::{now_millis, Message, MessageId, MessageState, RoomId, SenderIdentity};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, oneshot};

type FeedSender = mpsc::UnboundedSender<Result<Message, BackendError>>;

/// Mock chat backend for testing.
///
/// Clones share state, so a test can keep one handle while the engine owns
/// another.
#[derive(Debug)]
pub struct MockBackend {
    author: SenderIdentity,
    inner: Arc<Mutex<MockBackendInner>>,
}

#[derive(Debug, Default)]
struct MockBackendInner {
    history: HashMap<RoomId, Vec<Message>>,
    subscribers: Vec<LiveSubscriber>,
    next_message_id: u64,
    next_subscriber_id: u64,
    fail_next_fetch: Option<BackendError>,
    fail_next_create: Option<BackendError>,
    fail_next_subscribe: Option<BackendError>,
    stall_subscribe: bool,
    create_gate: Option<oneshot::Receiver<()>>,
    fetch_calls: usize,
    subscribe_calls: usize,
    created_bodies: Vec<String>,
}

#[derive(Debug)]
struct LiveSubscriber {
    id: u64,
    room_id: RoomId,
    tx: FeedSender,
}

impl MockBackendInner {
    /// Push `message` to every live subscriber of `room_id`, pruning closed feeds.
    fn broadcast(&mut self, room_id: &RoomId, message: &Message) -> usize {
        let mut delivered = 0;
        self.subscribers.retain(|sub| {
            if sub.room_id != *room_id {
                return true;
            }
            let alive = sub.tx.send(Ok(message.clone())).is_ok();
            if alive {
                delivered += 1;
            }
            alive
        });
        delivered
    }
}

fn lock(inner: &Mutex<MockBackendInner>) -> MutexGuard<'_, MockBackendInner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockBackend {
    /// Create a mock backend whose created messages are authored by `author`.
    pub fn new(author: SenderIdentity) -> Self {
        Self {
            author,
            inner: Arc::new(Mutex::new(MockBackendInner::default())),
        }
    }

    /// Replace a room's history (oldest-first, as the service returns it).
    pub fn set_history(&self, room_id: &RoomId, oldest_first: Vec<Message>) {
        lock(&self.inner)
            .history
            .insert(room_id.clone(), oldest_first);
    }

    /// A room's history, oldest-first.
    pub fn history(&self, room_id: &RoomId) -> Vec<Message> {
        lock(&self.inner)
            .history
            .get(room_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Simulate another user posting: record in history and push to live feeds.
    ///
    /// Returns how many live subscriptions received it.
    pub fn emit(&self, message: Message) -> usize {
        let mut inner = lock(&self.inner);
        let room_id = message.room_id.clone();
        inner
            .history
            .entry(room_id.clone())
            .or_default()
            .push(message.clone());
        inner.broadcast(&room_id, &message)
    }

    /// Push a record to `room_id`'s live feeds without touching history,
    /// even if the record claims another room.
    pub fn deliver_raw(&self, room_id: &RoomId, message: Message) -> usize {
        lock(&self.inner).broadcast(room_id, &message)
    }

    /// Terminate every live feed of `room_id` with `error`.
    pub fn fail_stream(&self, room_id: &RoomId, error: BackendError) {
        let mut inner = lock(&self.inner);
        inner.subscribers.retain(|sub| {
            if sub.room_id != *room_id {
                return true;
            }
            let _ = sub.tx.send(Err(error.clone()));
            false
        });
    }

    /// Complete every live feed of `room_id` without an error.
    pub fn end_stream(&self, room_id: &RoomId) {
        lock(&self.inner)
            .subscribers
            .retain(|sub| sub.room_id != *room_id);
    }

    /// Cause the next `fetch_messages()` to fail.
    pub fn fail_next_fetch(&self, error: BackendError) {
        lock(&self.inner).fail_next_fetch = Some(error);
    }

    /// Cause the next `create_message()` to fail.
    pub fn fail_next_create(&self, error: BackendError) {
        lock(&self.inner).fail_next_create = Some(error);
    }

    /// Cause the next `subscribe()` to fail.
    pub fn fail_next_subscribe(&self, error: BackendError) {
        lock(&self.inner).fail_next_subscribe = Some(error);
    }

    /// While set, `subscribe()` never acknowledges.
    pub fn stall_subscribe(&self, stall: bool) {
        lock(&self.inner).stall_subscribe = stall;
    }

    /// Hold the next `create_message()` response until the returned sender
    /// fires or is dropped.
    ///
    /// The message is still created and pushed to live feeds immediately, so
    /// the feed delivery wins the race against the response.
    pub fn hold_next_create(&self) -> oneshot::Sender<()> {
        let (release, gate) = oneshot::channel();
        lock(&self.inner).create_gate = Some(gate);
        release
    }

    /// Number of live subscriptions for `room_id`.
    pub fn live_subscriptions(&self, room_id: &RoomId) -> usize {
        lock(&self.inner)
            .subscribers
            .iter()
            .filter(|sub| sub.room_id == *room_id && !sub.tx.is_closed())
            .count()
    }

    /// How many times `fetch_messages()` was called.
    pub fn fetch_calls(&self) -> usize {
        lock(&self.inner).fetch_calls
    }

    /// How many times `subscribe()` was called.
    pub fn subscribe_calls(&self) -> usize {
        lock(&self.inner).subscribe_calls
    }

    /// Bodies of every successfully created message, in call order.
    pub fn created_bodies(&self) -> Vec<String> {
        lock(&self.inner).created_bodies.clone()
    }

    /// Clear all state (history, feeds, queued failures, counters).
    pub fn reset(&self) {
        *lock(&self.inner) = MockBackendInner::default();
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new(SenderIdentity::new("mock-user"))
    }
}

impl Clone for MockBackend {
    fn clone(&self) -> Self {
        Self {
            author: self.author.clone(),
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    async fn fetch_messages(&self, room_id: &RoomId) -> Result<Vec<Message>, BackendError> {
        let mut inner = lock(&self.inner);
        inner.fetch_calls += 1;

        if let Some(error) = inner.fail_next_fetch.take() {
            return Err(error);
        }

        Ok(inner.history.get(room_id).cloned().unwrap_or_default())
    }

    async fn create_message(
        &self,
        room_id: &RoomId,
        body: &str,
    ) -> Result<Message, BackendError> {
        let (message, gate) = {
            let mut inner = lock(&self.inner);

            if let Some(error) = inner.fail_next_create.take() {
                return Err(error);
            }

            inner.next_message_id += 1;
            let message = Message {
                id: MessageId::new(format!("msg-{}", inner.next_message_id)),
                room_id: room_id.clone(),
                sender_id: self.author.id.clone(),
                sender_nickname: self.author.nickname.clone(),
                body: body.to_string(),
                created_at: now_millis(),
                state: MessageState::Confirmed,
            };
            inner.created_bodies.push(body.to_string());
            inner
                .history
                .entry(room_id.clone())
                .or_default()
                .push(message.clone());
            inner.broadcast(room_id, &message);
            (message, inner.create_gate.take())
        };

        if let Some(gate) = gate {
            let _ = gate.await;
        }
        Ok(message)
    }

    async fn subscribe(&self, room_id: &RoomId) -> Result<Subscription, BackendError> {
        let stalled = {
            let mut inner = lock(&self.inner);
            inner.subscribe_calls += 1;
            inner.stall_subscribe
        };
        if stalled {
            std::future::pending::<()>().await;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let id = {
            let mut inner = lock(&self.inner);

            if let Some(error) = inner.fail_next_subscribe.take() {
                return Err(error);
            }

            inner.next_subscriber_id += 1;
            let id = inner.next_subscriber_id;
            inner.subscribers.push(LiveSubscriber {
                id,
                room_id: room_id.clone(),
                tx,
            });
            id
        };

        let events = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        })
        .boxed();
        let registry = Arc::clone(&self.inner);
        Ok(Subscription::new(events, move || {
            lock(&registry).subscribers.retain(|sub| sub.id != id);
        }))
    }
}
