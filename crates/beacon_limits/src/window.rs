//! Fixed-window counters keyed by string.
//!
//! A [`WindowTable`] holds one [`RateWindow`] per key. A key's window opens on
//! its first operation and is replaced once it is older than the configured
//! window length. Rejected operations still count, so a key that keeps
//! hammering stays rejected until its window expires.
//!
//! Windows reset on a fixed boundary, so a key can be admitted up to twice
//! the maximum across the boundary between two windows.

use core::time::Duration;
use std::time::Instant;

use hashbrown::HashMap;
use parking_lot::RwLock;

use crate::clock::Clock;

/// The sweep never runs more often than this.
pub(crate) const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Counter state for one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateWindow {
    /// Operations seen in this window, including rejected ones.
    pub count: i64,
    /// When this window opened.
    pub window_start: Instant,
    /// Most recent operation for this key.
    pub last_access: Instant,
}

impl RateWindow {
    fn open(now: Instant) -> Self {
        Self {
            count: 1,
            window_start: now,
            last_access: now,
        }
    }
}

/// Tunables shared by every key in a table.
#[derive(Debug, Clone)]
pub(crate) struct WindowSettings {
    pub(crate) max: i64,
    pub(crate) window: Duration,
    pub(crate) cleanup_multiplier: u32,
    pub(crate) expiry_multiplier: u32,
    pub(crate) clock: Clock,
}

impl WindowSettings {
    pub(crate) fn new(max: i64, window: Duration) -> Self {
        Self {
            max,
            window,
            cleanup_multiplier: 2,
            expiry_multiplier: 2,
            clock: Clock::system(),
        }
    }

    fn expiry(&self) -> Duration {
        self.window
            .checked_mul(self.expiry_multiplier)
            .unwrap_or(Duration::MAX)
    }

    fn sweep_interval(&self) -> Duration {
        self.window
            .checked_mul(self.cleanup_multiplier)
            .unwrap_or(Duration::MAX)
            .max(MIN_SWEEP_INTERVAL)
    }
}

/// Per-key windows behind one lock.
#[derive(Debug)]
pub(crate) struct WindowTable {
    name: &'static str,
    windows: RwLock<HashMap<String, RateWindow>>,
    settings: RwLock<WindowSettings>,
}

impl WindowTable {
    pub(crate) fn new(name: &'static str, settings: WindowSettings) -> Self {
        Self {
            name,
            windows: RwLock::new(HashMap::new()),
            settings: RwLock::new(settings),
        }
    }

    pub(crate) fn name(&self) -> &'static str {
        self.name
    }

    /// Records one operation for `key` and returns whether it is admitted.
    ///
    /// A freshly opened window is admitted unless the maximum is zero or less.
    pub(crate) fn admit(&self, key: &str) -> bool {
        self.record(key, false).unwrap_or(false)
    }

    /// Like [`admit`](Self::admit), but a table whose maximum is zero or less
    /// is disabled: nothing is recorded and `None` is returned.
    pub(crate) fn admit_if_enabled(&self, key: &str) -> Option<bool> {
        self.record(key, true)
    }

    fn record(&self, key: &str, skip_disabled: bool) -> Option<bool> {
        let (max, window, now) = {
            let settings = self.settings.read();
            (settings.max, settings.window, settings.clock.now())
        };
        if skip_disabled && max <= 0 {
            return None;
        }

        let mut windows = self.windows.write();
        let admitted = match windows.get_mut(key) {
            Some(current) if now.saturating_duration_since(current.window_start) <= window => {
                current.count = current.count.saturating_add(1);
                current.last_access = now;
                current.count <= max
            }
            _ => {
                windows.insert(key.to_owned(), RateWindow::open(now));
                max > 0
            }
        };
        Some(admitted)
    }

    /// Evicts windows idle for longer than the expiry and returns how many went.
    pub(crate) fn sweep(&self) -> usize {
        let (expiry, now) = {
            let settings = self.settings.read();
            (settings.expiry(), settings.clock.now())
        };

        let mut windows = self.windows.write();
        let before = windows.len();
        windows.retain(|_, w| now.saturating_duration_since(w.last_access) <= expiry);
        let evicted = before - windows.len();
        drop(windows);

        tracing::debug!(table = self.name, evicted, "swept idle rate windows");
        evicted
    }

    pub(crate) fn sweep_interval(&self) -> Duration {
        self.settings.read().sweep_interval()
    }

    pub(crate) fn get(&self, key: &str) -> Option<RateWindow> {
        self.windows.read().get(key).copied()
    }

    pub(crate) fn remove(&self, key: &str) -> bool {
        self.windows.write().remove(key).is_some()
    }

    pub(crate) fn len(&self) -> usize {
        self.windows.read().len()
    }

    pub(crate) fn max(&self) -> i64 {
        self.settings.read().max
    }

    pub(crate) fn window(&self) -> Duration {
        self.settings.read().window
    }

    pub(crate) fn set_max(&self, max: i64) {
        self.settings.write().max = max;
    }

    pub(crate) fn set_window(&self, window: Duration) {
        self.settings.write().window = window;
    }

    pub(crate) fn set_clock(&self, clock: Clock) {
        self.settings.write().clock = clock;
    }
}
