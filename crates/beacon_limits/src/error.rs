//! Error types for rate limiting.

use thiserror::Error;

/// Why an operation was refused by a limiter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RateLimitError {
    /// The key exceeded its single-level limit.
    #[error("rate limit exceeded for '{0}'")]
    RateExceeded(String),

    /// The broker-wide limit was exceeded.
    #[error("global rate limit exceeded")]
    GlobalRateExceeded,

    /// The client exceeded its per-client limit.
    #[error("client '{0}' exceeded its rate limit")]
    ClientRateExceeded(String),

    /// The topic exceeded its per-topic limit.
    #[error("topic '{0}' exceeded its rate limit")]
    TopicRateExceeded(String),

    /// The operation carried no client identifier to key the limit on.
    #[error("client identifier is missing")]
    MissingClient,
}
