//! # Beacon Internal Library
//!
//! Re-exports the core Beacon crates for convenience.

/// Hook registry and lifecycle event dispatch.
pub use beacon_hooks;

/// Fixed-window rate limiting.
pub use beacon_limits;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use beacon_hooks::prelude::*;
    pub use beacon_limits::prelude::*;
}
