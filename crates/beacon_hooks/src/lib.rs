//! Hook registry and lifecycle event dispatch for Beacon.
//!
//! `beacon_hooks` lets independently developed [`Hook`]s observe and intercept
//! every stage of a client's protocol lifecycle without the broker core
//! knowing any concrete hook.
//!
//! # Core Concepts
//!
//! - [`Event`] - The closed set of lifecycle points, with stable ordinals
//! - [`Hook`] - The capability set a hook implements (all methods default to no-ops)
//! - [`HookRegistry`] - Ordered, copy-on-write catalog of active hooks
//! - [`EventDispatcher`] - Invokes providing hooks in order and combines their results
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use beacon_hooks::{Client, ConnectPacket, Event, EventDispatcher, Hook, HookRegistry};
//!
//! struct DenyAnonymous;
//!
//! impl Hook for DenyAnonymous {
//!     fn id(&self) -> &str {
//!         "deny-anonymous"
//!     }
//!
//!     fn provides(&self, event: Event) -> bool {
//!         event == Event::OnConnectAuthenticate
//!     }
//!
//!     fn on_connect_authenticate(&self, _client: &Client, packet: &ConnectPacket) -> bool {
//!         packet.username.is_some()
//!     }
//! }
//!
//! let registry = Arc::new(HookRegistry::new());
//! registry.add(Arc::new(DenyAnonymous)).unwrap();
//!
//! let hooks = EventDispatcher::new(registry);
//! let client = Client::new("sensor-1");
//! assert!(!hooks.on_connect_authenticate(&client, &ConnectPacket::default()));
//! ```

/// Lifecycle event dispatch.
pub mod dispatch;

/// Error types.
pub mod error;

/// Lifecycle events and event sets.
pub mod event;

/// The hook capability set.
pub mod hook;

/// Value records passed to hooks.
pub mod packets;

/// The copy-on-write hook registry.
pub mod registry;

pub use dispatch::EventDispatcher;
pub use error::{HookError, RegistryError};
pub use event::{Event, EventSet};
pub use hook::{Capabilities, Hook, HookOptions};
pub use packets::{
    AuthPacket, Client, ConnectPacket, InflightMessage, PacketType, Properties, PublishPacket,
    RetainedMessage, SessionState, StoredClient, StoredSubscription, Subscribers,
    SubscribePacket, Subscription, SystemInfo, UnsubscribePacket, WillMessage, has_properties,
};
pub use registry::{HookRegistry, Snapshot};

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::dispatch::EventDispatcher;
    pub use crate::error::{HookError, RegistryError};
    pub use crate::event::{Event, EventSet};
    pub use crate::hook::{Hook, HookOptions};
    pub use crate::packets::{Client, ConnectPacket, PublishPacket};
    pub use crate::registry::HookRegistry;
}
