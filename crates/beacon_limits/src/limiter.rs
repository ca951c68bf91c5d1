//! Single-level fixed-window rate limiting.

use core::time::Duration;
use std::sync::Arc;

use beacon_hooks::Client;

use crate::clock::{Clock, ClockProvider};
use crate::config::RateLimitConfig;
use crate::error::RateLimitError;
use crate::sweeper::Sweeper;
use crate::window::{RateWindow, WindowSettings, WindowTable};

/// Admits at most `max` operations per window for each key.
///
/// Idle keys are evicted by a background sweeper, which is stopped by
/// [`stop`](Self::stop) or when the limiter is dropped.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use beacon_limits::RateLimiter;
///
/// let limiter = RateLimiter::new(2, Duration::from_secs(1));
/// assert!(limiter.check("sensor-1"));
/// assert!(limiter.check("sensor-1"));
/// assert!(!limiter.check("sensor-1"));
/// assert!(limiter.check("sensor-2"));
/// ```
#[derive(Debug)]
pub struct RateLimiter {
    table: Arc<WindowTable>,
    sweeper: Sweeper,
}

impl RateLimiter {
    /// Creates a limiter admitting `max_operations` per `window` per key.
    ///
    /// A maximum of zero or less rejects every operation.
    #[must_use]
    pub fn new(max_operations: i64, window: Duration) -> Self {
        Self::from_settings(WindowSettings::new(max_operations, window))
    }

    /// Creates a limiter from a deserialized configuration.
    #[must_use]
    pub fn from_config(config: &RateLimitConfig) -> Self {
        let mut settings = WindowSettings::new(config.max_operations, config.window());
        settings.cleanup_multiplier = config.cleanup_multiplier;
        settings.expiry_multiplier = config.expiry_multiplier;
        Self::from_settings(settings)
    }

    fn from_settings(settings: WindowSettings) -> Self {
        let table = Arc::new(WindowTable::new("keys", settings));
        let sweeper = Sweeper::spawn(&table);
        Self { table, sweeper }
    }

    /// Replaces the time source.
    #[must_use]
    pub fn with_clock(self, provider: Arc<dyn ClockProvider>) -> Self {
        self.table.set_clock(Clock::with_provider(provider));
        self
    }

    /// Records one operation for `key` and returns whether it is admitted.
    pub fn check(&self, key: &str) -> bool {
        let admitted = self.table.admit(key);
        if !admitted {
            tracing::trace!(key, "rate limit exceeded");
        }
        admitted
    }

    /// Records one operation for `client`.
    ///
    /// # Errors
    ///
    /// - [`RateLimitError::MissingClient`] if the client has no identifier.
    /// - [`RateLimitError::RateExceeded`] if the client is over its limit.
    pub fn check_client(&self, client: &Client) -> Result<(), RateLimitError> {
        if client.id.is_empty() {
            return Err(RateLimitError::MissingClient);
        }
        if self.check(&client.id) {
            Ok(())
        } else {
            Err(RateLimitError::RateExceeded(client.id.clone()))
        }
    }

    /// Sets the maximum for subsequent checks.
    pub fn set_max_rate(&self, max_operations: i64) {
        self.table.set_max(max_operations);
    }

    /// Sets the window length for subsequent checks.
    pub fn set_window(&self, window: Duration) {
        self.table.set_window(window);
    }

    /// Returns the current maximum.
    #[must_use]
    pub fn max_rate(&self) -> i64 {
        self.table.max()
    }

    /// Returns the current window length.
    #[must_use]
    pub fn window(&self) -> Duration {
        self.table.window()
    }

    /// Returns the window tracked for `key`.
    #[must_use]
    pub fn current_window(&self, key: &str) -> Option<RateWindow> {
        self.table.get(key)
    }

    /// Forgets `key`, returning whether it was tracked.
    pub fn reset(&self, key: &str) -> bool {
        self.table.remove(key)
    }

    /// Evicts idle windows now and returns how many were removed.
    pub fn sweep(&self) -> usize {
        self.table.sweep()
    }

    /// Returns the number of tracked keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns whether no key is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stops the background sweeper. Checks keep working.
    pub fn stop(&self) {
        self.sweeper.stop();
    }

    /// Returns whether the background sweeper has been stopped.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.sweeper.is_stopped()
    }
}
