//! Connection state machine for a room's live feed.
//!
//! This module provides a pure, side-effect-free state machine for the
//! subscription lifecycle. The state machine takes events as input and
//! produces a new state plus a list of actions to execute.
//!
//! The actual I/O (subscribing, sleeping, cancelling) is performed by
//! sync-client, not by this module. This enables instant unit testing
//! without network mocks.

use std::time::Duration;

/// Delay before an automatic resubscribe.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Connection state of one room's live feed - NO I/O, just state transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Subscription request in flight.
    Connecting,
    /// Subscription acknowledged; events are being delivered.
    Connected,
    /// Subscription failed or errored; a retry is scheduled.
    Disconnected,
}

impl ConnectionState {
    /// The initial state: `Connecting`.
    pub fn new() -> Self {
        Self::Connecting
    }

    /// Enter the initial state, returning the actions that begin subscribing.
    pub fn start() -> (Self, Vec<Action>) {
        (
            Self::Connecting,
            vec![Action::Publish(Self::Connecting), Action::Subscribe],
        )
    }

    /// Process an event and return the new state plus actions to execute.
    ///
    /// This is a pure function - no side effects. The caller (sync-client)
    /// is responsible for executing the returned actions.
    pub fn on_event(self, event: Event, policy: &RetryPolicy) -> (Self, Vec<Action>) {
        match (self, event) {
            // Teardown and restart are accepted from any state
            (_, Event::RestartRequested) => (
                Self::Connecting,
                vec![
                    Action::CancelSubscription,
                    Action::CancelRetryTimer,
                    Action::Publish(Self::Connecting),
                    Action::Subscribe,
                ],
            ),
            (_, Event::CloseRequested) => (
                Self::Disconnected,
                vec![
                    Action::CancelSubscription,
                    Action::CancelRetryTimer,
                    Action::Publish(Self::Disconnected),
                ],
            ),

            // From Connecting
            (Self::Connecting, Event::SubscribeAcknowledged) => {
                (Self::Connected, vec![Action::Publish(Self::Connected)])
            }
            (Self::Connecting, Event::SubscribeFailed { .. }) => (
                Self::Disconnected,
                vec![
                    Action::Publish(Self::Disconnected),
                    Action::StartRetryTimer {
                        delay: policy.delay(),
                    },
                ],
            ),

            // From Connecting or Connected
            (Self::Connecting | Self::Connected, Event::StreamError { .. })
            | (Self::Connected, Event::StreamEnded) => (
                Self::Disconnected,
                vec![
                    Action::CancelSubscription,
                    Action::Publish(Self::Disconnected),
                    Action::StartRetryTimer {
                        delay: policy.delay(),
                    },
                ],
            ),

            // From Disconnected
            (Self::Disconnected, Event::RetryTimerFired) => (
                Self::Connecting,
                vec![Action::Publish(Self::Connecting), Action::Subscribe],
            ),

            // Invalid transitions - stay in current state
            (state, _) => (state, vec![]),
        }
    }

    /// Check if the feed is live.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Short label for a status indicator.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
        }
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Reconnect policy: an unconditional retry after a fixed delay.
///
/// There is no backoff and no jitter. Under sustained server unavailability
/// every open room retries once per `delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    delay: Duration,
}

impl RetryPolicy {
    /// Retry after `delay`.
    pub fn fixed(delay: Duration) -> Self {
        Self { delay }
    }

    /// Delay before the next attempt.
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(DEFAULT_RETRY_DELAY)
    }
}

/// Events that can occur in the live feed lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The backend acknowledged the subscribe request.
    SubscribeAcknowledged,
    /// The subscribe request failed.
    SubscribeFailed {
        /// Error message describing the failure.
        error: String,
    },
    /// The event stream emitted a terminal error.
    StreamError {
        /// Error message describing the failure.
        error: String,
    },
    /// The event stream completed while the room was still open.
    StreamEnded,
    /// The retry timer fired.
    RetryTimerFired,
    /// Room re-entered or app regained focus: tear down and start over.
    RestartRequested,
    /// Room closed.
    CloseRequested,
}

/// Actions to be executed by sync-client.
///
/// These are instructions, not side effects. The sync-client interprets
/// these and performs the actual I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Issue a subscribe request for the room.
    Subscribe,
    /// Cancel the current subscription, if any. Must be idempotent.
    CancelSubscription,
    /// Start the retry timer.
    StartRetryTimer {
        /// Delay before resubscribing.
        delay: Duration,
    },
    /// Cancel any pending retry timer.
    CancelRetryTimer,
    /// Report the new state to the status indicator.
    Publish(ConnectionState),
}
