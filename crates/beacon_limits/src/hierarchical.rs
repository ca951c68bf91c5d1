//! Layered rate limiting across global, client and topic dimensions.

use core::time::Duration;
use std::sync::Arc;

use crate::clock::{Clock, ClockProvider};
use crate::config::HierarchicalRateLimitConfig;
use crate::error::RateLimitError;
use crate::sweeper::Sweeper;
use crate::window::{WindowSettings, WindowTable};

/// Key of the single broker-wide window.
const GLOBAL_KEY: &str = "global";

/// Applies a broker-wide, a per-client and a per-topic limit in that order.
///
/// The first dimension to reject aborts the check, so later dimensions do not
/// count the operation. A dimension whose maximum is zero or less is skipped.
///
/// Client and topic windows are swept in the background. The global dimension
/// has a single key and is never swept.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use beacon_limits::{HierarchicalRateLimiter, RateLimitError};
///
/// let limiter = HierarchicalRateLimiter::new(100, 0, 1, Duration::from_secs(1));
/// assert_eq!(limiter.check("sensor-1", "temp"), Ok(()));
/// assert_eq!(
///     limiter.check("sensor-2", "temp"),
///     Err(RateLimitError::GlobalRateExceeded)
/// );
/// ```
#[derive(Debug)]
pub struct HierarchicalRateLimiter {
    global: Arc<WindowTable>,
    clients: Arc<WindowTable>,
    topics: Arc<WindowTable>,
    client_sweeper: Sweeper,
    topic_sweeper: Sweeper,
}

impl HierarchicalRateLimiter {
    /// Creates a limiter with the given per-dimension maxima sharing one window.
    #[must_use]
    pub fn new(per_client_max: i64, per_topic_max: i64, global_max: i64, window: Duration) -> Self {
        Self::from_config(&HierarchicalRateLimitConfig::new(
            per_client_max,
            per_topic_max,
            global_max,
            window,
        ))
    }

    /// Creates a limiter from a deserialized configuration.
    #[must_use]
    pub fn from_config(config: &HierarchicalRateLimitConfig) -> Self {
        let settings = |max| {
            let mut settings = WindowSettings::new(max, config.window());
            settings.cleanup_multiplier = config.cleanup_multiplier;
            settings.expiry_multiplier = config.expiry_multiplier;
            settings
        };

        let global = Arc::new(WindowTable::new("global", settings(config.global_max)));
        let clients = Arc::new(WindowTable::new("clients", settings(config.per_client_max)));
        let topics = Arc::new(WindowTable::new("topics", settings(config.per_topic_max)));
        let client_sweeper = Sweeper::spawn(&clients);
        let topic_sweeper = Sweeper::spawn(&topics);

        Self {
            global,
            clients,
            topics,
            client_sweeper,
            topic_sweeper,
        }
    }

    /// Replaces the time source for every dimension.
    #[must_use]
    pub fn with_clock(self, provider: Arc<dyn ClockProvider>) -> Self {
        let clock = Clock::with_provider(provider);
        for table in self.tables() {
            table.set_clock(clock.clone());
        }
        self
    }

    fn tables(&self) -> [&WindowTable; 3] {
        [&self.global, &self.clients, &self.topics]
    }

    /// Records one operation by `client_id` on `topic`.
    ///
    /// # Errors
    ///
    /// Returns the error for the first dimension that rejects:
    /// [`GlobalRateExceeded`](RateLimitError::GlobalRateExceeded),
    /// [`ClientRateExceeded`](RateLimitError::ClientRateExceeded) or
    /// [`TopicRateExceeded`](RateLimitError::TopicRateExceeded).
    pub fn check(&self, client_id: &str, topic: &str) -> Result<(), RateLimitError> {
        if self.global.admit_if_enabled(GLOBAL_KEY) == Some(false) {
            tracing::trace!(client = client_id, topic, "global rate limit exceeded");
            return Err(RateLimitError::GlobalRateExceeded);
        }

        if self.clients.admit_if_enabled(client_id) == Some(false) {
            tracing::trace!(client = client_id, "client rate limit exceeded");
            return Err(RateLimitError::ClientRateExceeded(client_id.to_owned()));
        }

        if self.topics.admit_if_enabled(topic) == Some(false) {
            tracing::trace!(topic, "topic rate limit exceeded");
            return Err(RateLimitError::TopicRateExceeded(topic.to_owned()));
        }

        Ok(())
    }

    /// Sets the broker-wide maximum. Zero or less disables the dimension.
    pub fn set_global_max(&self, max: i64) {
        self.global.set_max(max);
    }

    /// Sets the per-client maximum. Zero or less disables the dimension.
    pub fn set_client_max(&self, max: i64) {
        self.clients.set_max(max);
    }

    /// Sets the per-topic maximum. Zero or less disables the dimension.
    pub fn set_topic_max(&self, max: i64) {
        self.topics.set_max(max);
    }

    /// Sets the window length of every dimension.
    pub fn set_window(&self, window: Duration) {
        for table in self.tables() {
            table.set_window(window);
        }
    }

    /// Forgets a client's window, returning whether it was tracked.
    pub fn forget_client(&self, client_id: &str) -> bool {
        self.clients.remove(client_id)
    }

    /// Returns the number of tracked clients.
    #[must_use]
    pub fn tracked_clients(&self) -> usize {
        self.clients.len()
    }

    /// Returns the number of tracked topics.
    #[must_use]
    pub fn tracked_topics(&self) -> usize {
        self.topics.len()
    }

    /// Evicts idle client and topic windows now and returns how many were removed.
    pub fn sweep(&self) -> usize {
        self.clients.sweep() + self.topics.sweep()
    }

    /// Stops both background sweepers.
    pub fn stop(&self) {
        self.client_sweeper.stop();
        self.topic_sweeper.stop();
    }

    /// Returns whether the background sweepers have been stopped.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.client_sweeper.is_stopped() && self.topic_sweeper.is_stopped()
    }
}
