//! Fixed-window rate limiting for Beacon.
//!
//! # Core Concepts
//!
//! - [`RateLimiter`] - At most N operations per window per key
//! - [`HierarchicalRateLimiter`] - Global, per-client and per-topic limits checked in order
//! - [`RateLimitHook`] - A [`Hook`](beacon_hooks::Hook) that rejects publishes over the limit
//! - [`ClockProvider`] - Injectable time source, with [`ManualClock`] for tests
//!
//! Every limiter owns a background sweeper that evicts idle keys. The sweeper
//! runs on the current tokio runtime if there is one and on its own thread
//! otherwise. It stops when the limiter is stopped or dropped.

mod clock;
mod config;
mod error;
mod hierarchical;
mod hook;
mod limiter;
mod sweeper;
mod window;

pub use clock::{ClockProvider, ManualClock, SystemClock};
pub use config::{HierarchicalRateLimitConfig, RateLimitConfig};
pub use error::RateLimitError;
pub use hierarchical::HierarchicalRateLimiter;
pub use hook::RateLimitHook;
pub use limiter::RateLimiter;
pub use window::RateWindow;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::{
        HierarchicalRateLimiter, RateLimitConfig, RateLimitError, RateLimitHook, RateLimiter,
    };
}
