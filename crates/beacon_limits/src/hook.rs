//! A hook that rate-limits publishes by client, topic and broker-wide volume.

use beacon_hooks::{Client, Event, EventSet, Hook, HookError, PublishPacket};
use parking_lot::RwLock;
use serde::Deserialize;

use crate::config::HierarchicalRateLimitConfig;
use crate::error::RateLimitError;
use crate::hierarchical::HierarchicalRateLimiter;

/// Rejects publishes that exceed the global, per-client or per-topic rate.
///
/// Configured through [`Hook::init`] with a JSON
/// [`HierarchicalRateLimitConfig`]. Each `init` replaces the limiter, dropping
/// the previous windows. Publishes without a client id are rejected with
/// [`RateLimitError::MissingClient`]. Windows of expired clients are forgotten
/// immediately.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use beacon_hooks::{Client, EventDispatcher, HookRegistry, PublishPacket};
/// use beacon_limits::RateLimitHook;
///
/// let registry = Arc::new(HookRegistry::new());
/// registry
///     .add_with_config(
///         Arc::new(RateLimitHook::new()),
///         &serde_json::json!({ "per_client_max": 1, "window_ms": 60000 }),
///     )
///     .unwrap();
///
/// let hooks = EventDispatcher::new(registry);
/// let client = Client::new("sensor-1");
/// let packet = PublishPacket::new("temp", "21.5");
/// assert!(hooks.on_publish(&client, &packet).is_ok());
/// assert!(hooks.on_publish(&client, &packet).is_err());
/// ```
#[derive(Debug)]
pub struct RateLimitHook {
    limiter: RwLock<HierarchicalRateLimiter>,
}

impl Default for RateLimitHook {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimitHook {
    /// The hook's registry identifier.
    pub const ID: &'static str = "rate-limit";

    const PROVIDED: EventSet = EventSet::of(&[Event::OnPublish, Event::OnClientExpired]);

    /// Creates a hook with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_limiter(HierarchicalRateLimiter::from_config(
            &HierarchicalRateLimitConfig::default(),
        ))
    }

    /// Creates a hook around an existing limiter.
    #[must_use]
    pub fn with_limiter(limiter: HierarchicalRateLimiter) -> Self {
        Self {
            limiter: RwLock::new(limiter),
        }
    }

    /// Returns the number of clients currently tracked.
    #[must_use]
    pub fn tracked_clients(&self) -> usize {
        self.limiter.read().tracked_clients()
    }

    /// Returns the number of topics currently tracked.
    #[must_use]
    pub fn tracked_topics(&self) -> usize {
        self.limiter.read().tracked_topics()
    }

    /// Returns whether the hook's limiter has been stopped.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.limiter.read().is_stopped()
    }
}

impl Hook for RateLimitHook {
    fn id(&self) -> &str {
        Self::ID
    }

    fn provides(&self, event: Event) -> bool {
        Self::PROVIDED.contains(event)
    }

    fn init(&self, config: &serde_json::Value) -> Result<(), HookError> {
        let config = if config.is_null() {
            HierarchicalRateLimitConfig::default()
        } else {
            HierarchicalRateLimitConfig::deserialize(config)?
        };

        let limiter = HierarchicalRateLimiter::from_config(&config);
        let previous = core::mem::replace(&mut *self.limiter.write(), limiter);
        previous.stop();

        tracing::info!(
            hook = Self::ID,
            per_client_max = config.per_client_max,
            per_topic_max = config.per_topic_max,
            global_max = config.global_max,
            window_ms = config.window_ms,
            "rate limit configured"
        );
        Ok(())
    }

    fn stop(&self) -> Result<(), HookError> {
        self.limiter.read().stop();
        Ok(())
    }

    fn on_publish(&self, client: &Client, packet: &PublishPacket) -> Result<(), HookError> {
        if client.id.is_empty() {
            return Err(HookError::RateLimited(Box::new(RateLimitError::MissingClient)));
        }

        self.limiter
            .read()
            .check(&client.id, &packet.topic)
            .map_err(|error| HookError::RateLimited(Box::new(error)))
    }

    fn on_client_expired(&self, client: &Client) -> Result<(), HookError> {
        self.limiter.read().forget_client(&client.id);
        Ok(())
    }
}
