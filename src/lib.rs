//! Hook registry, lifecycle event dispatch and rate limiting for a message broker.
//!

pub use beacon_internal::*;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use beacon_internal::prelude::*;
}
