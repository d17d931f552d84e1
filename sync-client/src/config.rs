//! Configuration for room sessions.

use std::time::Duration;

use roomsync_core::{RetryPolicy, DEFAULT_RETRY_DELAY};

/// Configuration shared by every room session a client opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Fixed delay before resubscribing after a feed failure.
    pub reconnect_delay: Duration,
    /// Upper bound on waiting for a subscribe acknowledgement.
    /// `None` waits as long as the backend takes.
    pub subscribe_timeout: Option<Duration>,
}

impl SyncConfig {
    /// Default configuration: 5 second reconnect delay, no subscribe timeout.
    pub fn new() -> Self {
        Self {
            reconnect_delay: DEFAULT_RETRY_DELAY,
            subscribe_timeout: None,
        }
    }

    /// Set the reconnect delay.
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Set the subscribe acknowledgement timeout.
    pub fn with_subscribe_timeout(mut self, timeout: Duration) -> Self {
        self.subscribe_timeout = Some(timeout);
        self
    }

    /// Retry policy for the live feed state machine.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(self.reconnect_delay)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.reconnect_delay, Duration::from_secs(5));
        assert_eq!(config.subscribe_timeout, None);
        assert_eq!(config.retry_policy(), RetryPolicy::default());
    }

    #[test]
    fn builder_overrides() {
        let config = SyncConfig::new()
            .with_reconnect_delay(Duration::from_millis(100))
            .with_subscribe_timeout(Duration::from_secs(2));

        assert_eq!(config.retry_policy().delay(), Duration::from_millis(100));
        assert_eq!(config.subscribe_timeout, Some(Duration::from_secs(2)));
    }
}
