//! Serde configuration for the limiters.
//!
//! Windows are expressed in milliseconds. Every field has a default, so a
//! partial document such as `{"max_operations": 10}` is valid. Unknown keys
//! are rejected.

use core::time::Duration;

use serde::{Deserialize, Serialize};

const DEFAULT_WINDOW_MS: u64 = 1_000;
const DEFAULT_MULTIPLIER: u32 = 2;

/// Configuration for a single-level [`RateLimiter`](crate::RateLimiter).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RateLimitConfig {
    /// Operations admitted per window. Zero or less denies everything.
    pub max_operations: i64,
    /// Window length in milliseconds.
    pub window_ms: u64,
    /// Sweep interval as a multiple of the window (never below one minute).
    pub cleanup_multiplier: u32,
    /// Idle time, as a multiple of the window, after which a key's window is evicted.
    pub expiry_multiplier: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_operations: 100,
            window_ms: DEFAULT_WINDOW_MS,
            cleanup_multiplier: DEFAULT_MULTIPLIER,
            expiry_multiplier: DEFAULT_MULTIPLIER,
        }
    }
}

impl RateLimitConfig {
    /// Creates a configuration admitting `max_operations` per `window`.
    #[must_use]
    pub fn new(max_operations: i64, window: Duration) -> Self {
        Self {
            max_operations,
            window_ms: millis(window),
            ..Self::default()
        }
    }

    /// Sets the cleanup multiplier.
    #[must_use]
    pub fn with_cleanup_multiplier(mut self, multiplier: u32) -> Self {
        self.cleanup_multiplier = multiplier;
        self
    }

    /// Sets the expiry multiplier.
    #[must_use]
    pub fn with_expiry_multiplier(mut self, multiplier: u32) -> Self {
        self.expiry_multiplier = multiplier;
        self
    }

    /// Returns the window as a [`Duration`].
    #[must_use]
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

/// Configuration for a [`HierarchicalRateLimiter`](crate::HierarchicalRateLimiter).
///
/// A dimension whose maximum is zero or less is disabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HierarchicalRateLimitConfig {
    /// Operations admitted per client per window.
    pub per_client_max: i64,
    /// Operations admitted per topic per window.
    pub per_topic_max: i64,
    /// Operations admitted across the whole broker per window.
    pub global_max: i64,
    /// Window length in milliseconds, shared by all dimensions.
    pub window_ms: u64,
    /// Sweep interval as a multiple of the window (never below one minute).
    pub cleanup_multiplier: u32,
    /// Idle time, as a multiple of the window, after which a key's window is evicted.
    pub expiry_multiplier: u32,
}

impl Default for HierarchicalRateLimitConfig {
    fn default() -> Self {
        Self {
            per_client_max: 100,
            per_topic_max: 0,
            global_max: 0,
            window_ms: DEFAULT_WINDOW_MS,
            cleanup_multiplier: DEFAULT_MULTIPLIER,
            expiry_multiplier: DEFAULT_MULTIPLIER,
        }
    }
}

impl HierarchicalRateLimitConfig {
    /// Creates a configuration with the given per-dimension maxima.
    #[must_use]
    pub fn new(per_client_max: i64, per_topic_max: i64, global_max: i64, window: Duration) -> Self {
        Self {
            per_client_max,
            per_topic_max,
            global_max,
            window_ms: millis(window),
            ..Self::default()
        }
    }

    /// Returns the window as a [`Duration`].
    #[must_use]
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

fn millis(window: Duration) -> u64 {
    u64::try_from(window.as_millis()).unwrap_or(u64::MAX)
}
