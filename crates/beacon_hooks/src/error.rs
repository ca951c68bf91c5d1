//! Error types for hook registration and dispatch.

use thiserror::Error;

/// Errors returned by structural changes to a [`HookRegistry`](crate::HookRegistry).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A hook with this identifier is already registered.
    #[error("hook '{0}' already exists")]
    DuplicateHook(String),

    /// No hook with this identifier is registered.
    #[error("hook '{0}' not found")]
    HookNotFound(String),

    /// The hook cannot be registered (for example, its identifier is empty).
    #[error("invalid hook: {0}")]
    InvalidHook(String),
}

/// Errors produced by hooks.
///
/// Errors from sequential-error events are surfaced to the broker verbatim;
/// errors from notification events are logged and discarded.
#[derive(Debug, Error)]
pub enum HookError {
    /// The hook rejected the operation.
    #[error("rejected by hook '{hook}': {reason}")]
    Rejected {
        /// Identifier of the rejecting hook.
        hook: String,
        /// Human-readable reason.
        reason: String,
    },

    /// The operation exceeded a rate limit.
    #[error("rate limited: {0}")]
    RateLimited(#[source] Box<dyn core::error::Error + Send + Sync>),

    /// The hook failed to initialise with its configuration.
    #[error("hook '{hook}' failed to initialise: {reason}")]
    Init {
        /// Identifier of the hook.
        hook: String,
        /// Why initialisation failed.
        reason: String,
    },

    /// A packet could not be processed by the hook.
    #[error("malformed packet: {0}")]
    MalformedPacket(String),

    /// A backing store failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// Hook configuration could not be decoded.
    #[error("configuration error: {0}")]
    Config(#[from] serde_json::Error),

    /// Registration failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl HookError {
    /// Creates a [`Rejected`](Self::Rejected) error.
    pub fn rejected(hook: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Rejected {
            hook: hook.into(),
            reason: reason.into(),
        }
    }

    /// Creates an [`Init`](Self::Init) error.
    pub fn init(hook: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Init {
            hook: hook.into(),
            reason: reason.into(),
        }
    }

    /// Creates a [`Storage`](Self::Storage) error.
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Returns the rate-limit cause, if this is a [`RateLimited`](Self::RateLimited) error.
    #[must_use]
    pub fn rate_limit_cause<E: core::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            Self::RateLimited(source) => source.downcast_ref::<E>(),
            _ => None,
        }
    }
}
