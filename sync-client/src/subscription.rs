//! Subscription manager: owns one room's live feed.
//!
//! The lifecycle logic lives in the pure [`ConnectionState`] machine from
//! sync-core. This module runs a background task that feeds it events
//! (subscribe results, stream errors, timer expiry, restart/close requests)
//! and performs the returned actions against the backend.
//!
//! ```text
//! control (restart/close) ─┐
//! live feed events ────────┼─→ FeedTask ─→ ConnectionState::on_event
//! retry timer ─────────────┘       │                 │
//!                                  ↓                 ↓
//!                         SharedStore::prepend   Vec<Action>
//! ```
//!
//! At most one backend subscription is held at a time: every `Subscribe`
//! action cancels the previous one first.
//!
//! The most recent feed failure is published next to the state as a
//! [`SyncError::SubscribeFailed`] or [`SyncError::StreamError`], and cleared
//! once a subscription is acknowledged again.

use std::sync::Arc;

use roomsync_core::{Action, ConnectionState, Event, RetryPolicy};
use roomsync_types::{Message, RoomId, SyncError};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};

use crate::backend::{BackendError, ChatBackend, Subscription};
use crate::config::SyncConfig;
use crate::store::SharedStore;

/// Manages the live feed for one room.
pub struct SubscriptionManager<B: ChatBackend + 'static> {
    backend: Arc<B>,
    room_id: RoomId,
    store: SharedStore,
    config: SyncConfig,
    state: Arc<watch::Sender<ConnectionState>>,
    last_error: Arc<watch::Sender<Option<SyncError>>>,
    control: Option<mpsc::UnboundedSender<Event>>,
    task: Option<JoinHandle<()>>,
}

impl<B: ChatBackend + 'static> SubscriptionManager<B> {
    /// Create a stopped manager. Call [`start`](Self::start) to go live.
    ///
    /// A stopped manager reports `Disconnected`: no request is in flight and
    /// no retry is scheduled.
    pub fn new(backend: Arc<B>, room_id: RoomId, store: SharedStore, config: SyncConfig) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let (last_error, _) = watch::channel(None);
        Self {
            backend,
            room_id,
            store,
            config,
            state: Arc::new(state),
            last_error: Arc::new(last_error),
            control: None,
            task: None,
        }
    }

    /// Start the feed, or tear it down and restart it if already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) {
        if let Some(control) = &self.control {
            if control.send(Event::RestartRequested).is_ok() {
                tracing::debug!("Restarting feed for room={}", self.room_id);
                return;
            }
        }

        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let task = FeedTask {
            backend: Arc::clone(&self.backend),
            room_id: self.room_id.clone(),
            store: self.store.clone(),
            policy: self.config.retry_policy(),
            subscribe_timeout: self.config.subscribe_timeout,
            state: Arc::clone(&self.state),
            last_error: Arc::clone(&self.last_error),
            control: control_rx,
            subscription: None,
            retry_at: None,
        };

        if let Some(stale) = self.task.take() {
            stale.abort();
        }
        self.control = Some(control_tx);
        self.task = Some(tokio::spawn(task.run()));
        tracing::info!("Feed task started for room={}", self.room_id);
    }

    /// Cancel the feed and wait for the task to finish. Idempotent.
    pub async fn stop(&mut self) {
        if let Some(control) = self.control.take() {
            let _ = control.send(Event::CloseRequested);
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!("Feed task for room={} ended abnormally: {}", self.room_id, e);
            }
        }
    }

    /// Check whether the feed task is running.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Receiver that observes every published connection state.
    pub fn updates(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Why the feed last dropped, until the next acknowledged subscribe.
    pub fn last_error(&self) -> Option<SyncError> {
        self.last_error.borrow().clone()
    }
}

impl<B: ChatBackend + 'static> Drop for SubscriptionManager<B> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Why the feed task woke up while idle.
enum Wake {
    Control(Event),
    RetryTimer,
    Feed(Option<Result<Message, BackendError>>),
}

/// Background task interpreting the connection state machine.
struct FeedTask<B: ChatBackend> {
    backend: Arc<B>,
    room_id: RoomId,
    store: SharedStore,
    policy: RetryPolicy,
    subscribe_timeout: Option<Duration>,
    state: Arc<watch::Sender<ConnectionState>>,
    last_error: Arc<watch::Sender<Option<SyncError>>>,
    control: mpsc::UnboundedReceiver<Event>,
    subscription: Option<Subscription>,
    retry_at: Option<Instant>,
}

impl<B: ChatBackend> FeedTask<B> {
    async fn run(mut self) {
        let (mut state, actions) = ConnectionState::start();
        let mut pending = self.execute(actions).await;

        loop {
            let event = match pending.take() {
                Some(event) => event,
                None => self.next_event().await,
            };

            match &event {
                Event::SubscribeAcknowledged => {
                    self.last_error.send_replace(None);
                }
                Event::SubscribeFailed { error } => {
                    tracing::warn!("Subscribe failed for room={}: {}", self.room_id, error);
                    self.last_error
                        .send_replace(Some(SyncError::SubscribeFailed(error.clone())));
                }
                Event::StreamError { error } => {
                    tracing::warn!("Feed error for room={}: {}", self.room_id, error);
                    self.last_error
                        .send_replace(Some(SyncError::StreamError(error.clone())));
                }
                Event::StreamEnded => {
                    tracing::warn!("Feed for room={} ended unexpectedly", self.room_id);
                    self.last_error
                        .send_replace(Some(SyncError::StreamError("feed ended".to_string())));
                }
                _ => {}
            }

            let closing = event == Event::CloseRequested;
            let (next, actions) = state.on_event(event, &self.policy);
            state = next;
            pending = self.execute(actions).await;

            if closing {
                break;
            }
        }

        tracing::info!("Feed task stopped for room={}", self.room_id);
    }

    /// Perform actions in order. Returns the event produced by a `Subscribe`.
    async fn execute(&mut self, actions: Vec<Action>) -> Option<Event> {
        let mut produced = None;
        for action in actions {
            match action {
                Action::Publish(state) => {
                    tracing::debug!("Feed state: room={} -> {}", self.room_id, state);
                    self.state.send_replace(state);
                }
                Action::CancelSubscription => {
                    if let Some(mut subscription) = self.subscription.take() {
                        subscription.cancel();
                    }
                }
                Action::StartRetryTimer { delay } => {
                    tracing::info!("Resubscribing room={} in {:?}", self.room_id, delay);
                    self.retry_at = Some(Instant::now() + delay);
                }
                Action::CancelRetryTimer => {
                    self.retry_at = None;
                }
                Action::Subscribe => {
                    produced = Some(self.subscribe().await);
                }
            }
        }
        produced
    }

    /// Issue one subscribe request.
    ///
    /// A control event arriving mid-request abandons the attempt and is
    /// returned instead.
    async fn subscribe(&mut self) -> Event {
        if let Some(mut previous) = self.subscription.take() {
            previous.cancel();
        }

        let backend = &self.backend;
        let room_id = &self.room_id;
        let timeout = self.subscribe_timeout;
        let attempt = async move {
            let request = backend.subscribe(room_id);
            match timeout {
                Some(limit) => tokio::time::timeout(limit, request)
                    .await
                    .unwrap_or(Err(BackendError::Timeout)),
                None => request.await,
            }
        };

        let result = tokio::select! {
            result = attempt => Ok(result),
            control = self.control.recv() => Err(control.unwrap_or(Event::CloseRequested)),
        };

        match result {
            Ok(Ok(subscription)) => {
                self.subscription = Some(subscription);
                tracing::info!("Subscribed to room={}", self.room_id);
                Event::SubscribeAcknowledged
            }
            Ok(Err(e)) => Event::SubscribeFailed {
                error: e.to_string(),
            },
            Err(control) => control,
        }
    }

    /// Wait for the next state machine event, delivering feed messages to the
    /// store in the meantime.
    async fn next_event(&mut self) -> Event {
        loop {
            let wake = tokio::select! {
                control = self.control.recv() => {
                    Wake::Control(control.unwrap_or(Event::CloseRequested))
                }
                _ = retry_timer(self.retry_at) => Wake::RetryTimer,
                feed = next_feed_event(&mut self.subscription) => Wake::Feed(feed),
            };

            match wake {
                Wake::Control(event) => return event,
                Wake::RetryTimer => {
                    self.retry_at = None;
                    return Event::RetryTimerFired;
                }
                Wake::Feed(Some(Ok(message))) => self.deliver(message).await,
                Wake::Feed(Some(Err(e))) => {
                    self.subscription = None;
                    return Event::StreamError {
                        error: e.to_string(),
                    };
                }
                Wake::Feed(None) => {
                    self.subscription = None;
                    return Event::StreamEnded;
                }
            }
        }
    }

    async fn deliver(&mut self, message: Message) {
        if message.room_id != self.room_id {
            tracing::debug!(
                "Ignoring message {} for room={} on feed for room={}",
                message.id,
                message.room_id,
                self.room_id
            );
            return;
        }

        let id = message.id.clone();
        if self.store.prepend(message).await {
            tracing::debug!("Feed delivered message {} to room={}", id, self.room_id);
        } else {
            tracing::debug!("Duplicate message {} absorbed in room={}", id, self.room_id);
        }
    }
}

async fn retry_timer(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn next_feed_event(
    subscription: &mut Option<Subscription>,
) -> Option<Result<Message, BackendError>> {
    match subscription {
        Some(subscription) => subscription.next_event().await,
        None => std::future::pending().await,
    }
}
