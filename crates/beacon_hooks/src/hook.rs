//! The [`Hook`] capability set.
//!
//! A hook is an independently developed unit that observes or intercepts the
//! broker's protocol lifecycle. Every method has a no-op default, so an
//! implementation overrides [`Hook::provides`] and the handful of methods it
//! cares about.
//!
//! Hooks are called from many client threads at once and must keep their own
//! state behind their own synchronisation.
//!
//! # Example
//!
//! ```
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use beacon_hooks::{Client, Event, EventSet, Hook, HookError, PublishPacket};
//!
//! #[derive(Default)]
//! struct PublishCounter {
//!     seen: AtomicUsize,
//! }
//!
//! impl Hook for PublishCounter {
//!     fn id(&self) -> &str {
//!         "publish-counter"
//!     }
//!
//!     fn provides(&self, event: Event) -> bool {
//!         const PROVIDED: EventSet = EventSet::of(&[Event::OnPublished]);
//!         PROVIDED.contains(event)
//!     }
//!
//!     fn on_published(&self, _client: &Client, _packet: &PublishPacket) -> Result<(), HookError> {
//!         self.seen.fetch_add(1, Ordering::Relaxed);
//!         Ok(())
//!     }
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::HookError;
use crate::event::Event;
use crate::packets::{
    AuthPacket, Client, ConnectPacket, InflightMessage, PacketType, PublishPacket,
    RetainedMessage, SessionState, StoredClient, StoredSubscription, Subscribers,
    SubscribePacket, SystemInfo, UnsubscribePacket, WillMessage,
};

// ─────────────────────────────────────────────────────────────────────────────
// HookOptions
// ─────────────────────────────────────────────────────────────────────────────

/// Broker capabilities shared with hooks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Capabilities {
    /// Highest QoS the broker grants.
    pub maximum_qos: u8,
    /// Whether retained messages are supported.
    pub retain_available: bool,
    /// Upper bound on message expiry, in seconds.
    pub maximum_message_expiry_interval: u32,
    /// Upper bound on session expiry, in seconds.
    pub maximum_session_expiry_interval: u32,
    /// Maximum unacknowledged QoS 1/2 messages per client.
    pub receive_maximum: u16,
    /// Highest topic alias the broker accepts.
    pub topic_alias_maximum: u16,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            maximum_qos: 2,
            retain_available: true,
            maximum_message_expiry_interval: 60 * 60 * 24,
            maximum_session_expiry_interval: u32::MAX,
            receive_maximum: 1024,
            topic_alias_maximum: u16::MAX,
        }
    }
}

/// Options pushed to every hook through [`Hook::set_options`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HookOptions {
    /// Broker capabilities.
    pub capabilities: Capabilities,
}

// ─────────────────────────────────────────────────────────────────────────────
// Hook
// ─────────────────────────────────────────────────────────────────────────────

/// A unit of broker extension invoked at lifecycle [`Event`]s.
///
/// The dispatcher only calls an event method when [`provides`](Self::provides)
/// returns `true` for that event, so the defaults below matter only for
/// hooks that declare an event without overriding its method. Veto defaults
/// deny, everything else is a pass-through or no-op.
#[expect(unused_variables, reason = "default methods ignore their arguments")]
pub trait Hook: Send + Sync + 'static {
    /// Unique, non-empty identifier of this hook.
    fn id(&self) -> &str;

    /// Returns whether this hook participates in `event`.
    fn provides(&self, event: Event) -> bool {
        false
    }

    /// Configures the hook. Called once by
    /// [`HookRegistry::add_with_config`](crate::HookRegistry::add_with_config).
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    fn init(&self, config: &serde_json::Value) -> Result<(), HookError> {
        Ok(())
    }

    /// Releases resources held by the hook.
    ///
    /// # Errors
    ///
    /// Errors are logged by the registry and never propagated.
    fn stop(&self) -> Result<(), HookError> {
        Ok(())
    }

    /// Receives the broker's options.
    fn set_options(&self, options: &HookOptions) {}

    // ── notifications ───────────────────────────────────────────────────────

    /// Periodic system information update.
    fn on_sys_info_tick(&self, info: &SystemInfo) -> Result<(), HookError> {
        Ok(())
    }

    /// The broker has started.
    fn on_started(&self) -> Result<(), HookError> {
        Ok(())
    }

    /// The broker has stopped.
    fn on_stopped(&self) -> Result<(), HookError> {
        Ok(())
    }

    // ── connection ──────────────────────────────────────────────────────────

    /// Authenticates a connecting client. `false` refuses the connection.
    fn on_connect_authenticate(&self, client: &Client, packet: &ConnectPacket) -> bool {
        false
    }

    /// Checks whether `client` may read (`write == false`) or write `topic`.
    fn on_acl_check(&self, client: &Client, topic: &str, write: bool) -> bool {
        false
    }

    /// A client sent CONNECT.
    ///
    /// # Errors
    ///
    /// An error refuses the connection.
    fn on_connect(&self, client: &Client, packet: &ConnectPacket) -> Result<(), HookError> {
        Ok(())
    }

    /// Resolves a session for a connecting client.
    ///
    /// `current` is the candidate chosen by earlier hooks. Returning `None`
    /// keeps it.
    fn on_session_establish(
        &self,
        client: &Client,
        packet: &ConnectPacket,
        current: Option<&SessionState>,
    ) -> Option<SessionState> {
        None
    }

    /// The client's session has been established.
    ///
    /// # Errors
    ///
    /// An error aborts the connection.
    fn on_session_established(
        &self,
        client: &Client,
        packet: &ConnectPacket,
    ) -> Result<(), HookError> {
        Ok(())
    }

    /// A client disconnected; `expire` is set when its session will not be kept.
    fn on_disconnect(
        &self,
        client: &Client,
        reason: Option<&str>,
        expire: bool,
    ) -> Result<(), HookError> {
        Ok(())
    }

    /// A client sent AUTH. `false` refuses the exchange.
    fn on_auth_packet(&self, client: &Client, packet: &AuthPacket) -> bool {
        false
    }

    // ── packets ─────────────────────────────────────────────────────────────

    /// Inspects or rewrites inbound packet bytes.
    ///
    /// # Errors
    ///
    /// An error drops the packet.
    fn on_packet_read(&self, client: &Client, data: Vec<u8>) -> Result<Vec<u8>, HookError> {
        Ok(data)
    }

    /// Inspects or rewrites outbound packet bytes. Must return the input
    /// unchanged on failure.
    fn on_packet_encode(&self, client: &Client, data: Vec<u8>) -> Vec<u8> {
        data
    }

    /// A packet was written to the client.
    fn on_packet_sent(
        &self,
        client: &Client,
        packet_type: PacketType,
        written: usize,
    ) -> Result<(), HookError> {
        Ok(())
    }

    /// An inbound packet finished processing, possibly with an error.
    fn on_packet_processed(
        &self,
        client: &Client,
        packet_type: PacketType,
        error: Option<&str>,
    ) -> Result<(), HookError> {
        Ok(())
    }

    // ── subscriptions ───────────────────────────────────────────────────────

    /// A client sent SUBSCRIBE.
    ///
    /// # Errors
    ///
    /// An error refuses the subscription.
    fn on_subscribe(&self, client: &Client, packet: &SubscribePacket) -> Result<(), HookError> {
        Ok(())
    }

    /// Subscriptions were accepted with the given reason codes.
    fn on_subscribed(
        &self,
        client: &Client,
        packet: &SubscribePacket,
        reason_codes: &[u8],
    ) -> Result<(), HookError> {
        Ok(())
    }

    /// Narrows or rewrites the subscribers selected for `packet`.
    fn on_select_subscribers(
        &self,
        subscribers: Subscribers,
        packet: &PublishPacket,
    ) -> Subscribers {
        subscribers
    }

    /// A client sent UNSUBSCRIBE.
    ///
    /// # Errors
    ///
    /// An error refuses the unsubscribe.
    fn on_unsubscribe(
        &self,
        client: &Client,
        packet: &UnsubscribePacket,
    ) -> Result<(), HookError> {
        Ok(())
    }

    /// Subscriptions were removed.
    fn on_unsubscribed(
        &self,
        client: &Client,
        packet: &UnsubscribePacket,
    ) -> Result<(), HookError> {
        Ok(())
    }

    // ── publishing ──────────────────────────────────────────────────────────

    /// Publish admission.
    ///
    /// # Errors
    ///
    /// An error drops the publish.
    fn on_publish(&self, client: &Client, packet: &PublishPacket) -> Result<(), HookError> {
        Ok(())
    }

    /// A publish was accepted and fanned out.
    fn on_published(&self, client: &Client, packet: &PublishPacket) -> Result<(), HookError> {
        Ok(())
    }

    /// A publish was dropped before delivery.
    fn on_publish_dropped(
        &self,
        client: &Client,
        packet: &PublishPacket,
    ) -> Result<(), HookError> {
        Ok(())
    }

    /// A retained message is about to be stored. `retained` is `1` for a new
    /// or replaced message and `-1` for a deletion.
    ///
    /// # Errors
    ///
    /// An error prevents the retained message from being stored.
    fn on_retain_message(
        &self,
        client: &Client,
        packet: &PublishPacket,
        retained: i64,
    ) -> Result<(), HookError> {
        Ok(())
    }

    /// A retained message was delivered to a new subscriber.
    fn on_retain_published(
        &self,
        client: &Client,
        packet: &PublishPacket,
    ) -> Result<(), HookError> {
        Ok(())
    }

    /// A QoS 1/2 message entered the inflight window.
    fn on_qos_publish(
        &self,
        client: &Client,
        packet: &PublishPacket,
        sent: i64,
        resends: u32,
    ) -> Result<(), HookError> {
        Ok(())
    }

    /// A QoS 1/2 flow completed.
    fn on_qos_complete(
        &self,
        client: &Client,
        packet_id: u16,
        packet_type: PacketType,
    ) -> Result<(), HookError> {
        Ok(())
    }

    /// A QoS 1/2 message was abandoned.
    fn on_qos_dropped(&self, client: &Client, packet_id: u16) -> Result<(), HookError> {
        Ok(())
    }

    /// The client ran out of packet identifiers.
    fn on_packet_id_exhausted(
        &self,
        client: &Client,
        packet_type: PacketType,
    ) -> Result<(), HookError> {
        Ok(())
    }

    // ── wills and expiry ────────────────────────────────────────────────────

    /// Inspects or replaces a will before it is sent. `Ok(None)` keeps `will`.
    ///
    /// # Errors
    ///
    /// Errors are logged and treated as "no opinion".
    fn on_will(
        &self,
        client: &Client,
        will: &WillMessage,
    ) -> Result<Option<WillMessage>, HookError> {
        Ok(None)
    }

    /// A will message was sent.
    fn on_will_sent(&self, client: &Client, packet: &PublishPacket) -> Result<(), HookError> {
        Ok(())
    }

    /// A disconnected client's session expired.
    fn on_client_expired(&self, client: &Client) -> Result<(), HookError> {
        Ok(())
    }

    /// A retained message expired.
    fn on_retained_expired(&self, topic: &str) -> Result<(), HookError> {
        Ok(())
    }

    // ── persistence ─────────────────────────────────────────────────────────

    /// Loads persisted clients.
    ///
    /// # Errors
    ///
    /// Returns the store's error.
    fn stored_clients(&self) -> Result<Vec<StoredClient>, HookError> {
        Ok(Vec::new())
    }

    /// Loads persisted subscriptions.
    ///
    /// # Errors
    ///
    /// Returns the store's error.
    fn stored_subscriptions(&self) -> Result<Vec<StoredSubscription>, HookError> {
        Ok(Vec::new())
    }

    /// Loads persisted inflight messages.
    ///
    /// # Errors
    ///
    /// Returns the store's error.
    fn stored_inflight_messages(&self) -> Result<Vec<InflightMessage>, HookError> {
        Ok(Vec::new())
    }

    /// Loads persisted retained messages.
    ///
    /// # Errors
    ///
    /// Returns the store's error.
    fn stored_retained_messages(&self) -> Result<Vec<RetainedMessage>, HookError> {
        Ok(Vec::new())
    }

    /// Loads persisted system information.
    ///
    /// # Errors
    ///
    /// Returns the store's error.
    fn stored_sys_info(&self) -> Result<Option<SystemInfo>, HookError> {
        Ok(None)
    }
}
