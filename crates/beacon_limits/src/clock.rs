//! Time sources for rate windows.
//!
//! Limiters read the current instant through a [`ClockProvider`] so tests can
//! move time by hand with [`ManualClock`] instead of sleeping.

use core::fmt;
use core::time::Duration;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

// ─────────────────────────────────────────────────────────────────────────────
// ClockProvider Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Trait for providing current time.
///
/// # Example
///
/// ```
/// use std::time::Instant;
/// use beacon_limits::ClockProvider;
///
/// /// A clock that always returns a fixed instant.
/// struct FixedClock(Instant);
///
/// impl ClockProvider for FixedClock {
///     fn now(&self) -> Instant {
///         self.0
///     }
/// }
/// ```
pub trait ClockProvider: Send + Sync + 'static {
    /// Returns the current instant.
    fn now(&self) -> Instant;
}

/// System clock provider using `std::time::Instant`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl ClockProvider for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same current instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    /// Creates a clock frozen at the current system instant.
    #[must_use]
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Moves the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl ClockProvider for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Clock
// ─────────────────────────────────────────────────────────────────────────────

/// Shared handle to a [`ClockProvider`].
#[derive(Clone)]
pub(crate) struct Clock {
    provider: Arc<dyn ClockProvider>,
}

impl Clock {
    pub(crate) fn system() -> Self {
        Self::with_provider(Arc::new(SystemClock))
    }

    pub(crate) fn with_provider(provider: Arc<dyn ClockProvider>) -> Self {
        Self { provider }
    }

    pub(crate) fn now(&self) -> Instant {
        self.provider.now()
    }
}

impl fmt::Debug for Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Clock").finish_non_exhaustive()
    }
}
