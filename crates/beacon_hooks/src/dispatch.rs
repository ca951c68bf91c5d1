//! Lifecycle event dispatch.
//!
//! The [`EventDispatcher`] is what the broker core calls at each lifecycle
//! point. Every call loads one registry [`Snapshot`](crate::Snapshot), keeps
//! the hooks whose [`provides`](Hook::provides) returns `true` for the event,
//! and invokes them in registration order. How their individual results are
//! combined depends on the event:
//!
//! | Shape | Events | Combination |
//! |-------|--------|-------------|
//! | Veto | `OnConnectAuthenticate`, `OnAclCheck`, `OnAuthPacket` | AND, stops at the first `false` |
//! | Sequential error | `OnConnect`, `OnSessionEstablished`, `OnSubscribe`, `OnUnsubscribe`, `OnPublish`, `OnRetainMessage` | stops at and returns the first error |
//! | Notification | everything else without a result | all hooks run, errors are logged and dropped |
//! | Pipe-through | `OnPacketRead`, `OnPacketEncode`, `OnSelectSubscribers` | each hook gets the previous output |
//! | Override | `OnSessionEstablish`, `OnWill` | last non-`None` candidate wins |
//! | First responder | `Stored*` | only the first providing hook is asked |
//!
//! The dispatcher keeps no state of its own; cloning it is cheap.

use std::sync::Arc;

use crate::error::HookError;
use crate::event::Event;
use crate::hook::Hook;
use crate::packets::{
    AuthPacket, Client, ConnectPacket, InflightMessage, PacketType, PublishPacket,
    RetainedMessage, SessionState, StoredClient, StoredSubscription, Subscribers,
    SubscribePacket, SystemInfo, UnsubscribePacket, WillMessage,
};
use crate::registry::HookRegistry;

/// Fans lifecycle events out to the hooks of a [`HookRegistry`].
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    registry: Arc<HookRegistry>,
}

impl EventDispatcher {
    /// Creates a dispatcher over `registry`.
    #[must_use]
    pub fn new(registry: Arc<HookRegistry>) -> Self {
        Self { registry }
    }

    /// Returns the registry this dispatcher reads from.
    #[must_use]
    pub fn registry(&self) -> &Arc<HookRegistry> {
        &self.registry
    }

    /// Returns whether any hook currently provides `event`.
    #[must_use]
    pub fn provides(&self, event: Event) -> bool {
        self.registry.snapshot().providing(event).next().is_some()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Combinators
    // ─────────────────────────────────────────────────────────────────────────

    fn veto(&self, event: Event, mut check: impl FnMut(&dyn Hook) -> bool) -> bool {
        let snapshot = self.registry.snapshot();
        for hook in snapshot.providing(event) {
            if !check(hook.as_ref()) {
                tracing::debug!(hook = %hook.id(), %event, "vetoed");
                return false;
            }
        }
        true
    }

    fn sequential(
        &self,
        event: Event,
        mut call: impl FnMut(&dyn Hook) -> Result<(), HookError>,
    ) -> Result<(), HookError> {
        let snapshot = self.registry.snapshot();
        for hook in snapshot.providing(event) {
            if let Err(error) = call(hook.as_ref()) {
                tracing::debug!(hook = %hook.id(), %event, %error, "hook refused event");
                return Err(error);
            }
        }
        Ok(())
    }

    fn notify(&self, event: Event, mut call: impl FnMut(&dyn Hook) -> Result<(), HookError>) {
        let snapshot = self.registry.snapshot();
        for hook in snapshot.providing(event) {
            if let Err(error) = call(hook.as_ref()) {
                tracing::debug!(hook = %hook.id(), %event, %error, "notification hook failed");
            }
        }
    }

    fn first_responder<T: Default>(
        &self,
        event: Event,
        call: impl FnOnce(&dyn Hook) -> Result<T, HookError>,
    ) -> Result<T, HookError> {
        let snapshot = self.registry.snapshot();
        match snapshot.providing(event).next() {
            Some(hook) => call(hook.as_ref()),
            None => Ok(T::default()),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Veto events
    // ─────────────────────────────────────────────────────────────────────────

    /// Authenticates a connecting client. `true` when no hook refuses.
    #[must_use]
    pub fn on_connect_authenticate(&self, client: &Client, packet: &ConnectPacket) -> bool {
        self.veto(Event::OnConnectAuthenticate, |hook| {
            hook.on_connect_authenticate(client, packet)
        })
    }

    /// Checks topic access. `true` when no hook refuses.
    #[must_use]
    pub fn on_acl_check(&self, client: &Client, topic: &str, write: bool) -> bool {
        self.veto(Event::OnAclCheck, |hook| hook.on_acl_check(client, topic, write))
    }

    /// Validates an AUTH packet. `true` when no hook refuses.
    #[must_use]
    pub fn on_auth_packet(&self, client: &Client, packet: &AuthPacket) -> bool {
        self.veto(Event::OnAuthPacket, |hook| hook.on_auth_packet(client, packet))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Sequential error events
    // ─────────────────────────────────────────────────────────────────────────

    /// Dispatches CONNECT.
    ///
    /// # Errors
    ///
    /// Returns the first hook error.
    pub fn on_connect(&self, client: &Client, packet: &ConnectPacket) -> Result<(), HookError> {
        self.sequential(Event::OnConnect, |hook| hook.on_connect(client, packet))
    }

    /// Dispatches session establishment completion.
    ///
    /// # Errors
    ///
    /// Returns the first hook error.
    pub fn on_session_established(
        &self,
        client: &Client,
        packet: &ConnectPacket,
    ) -> Result<(), HookError> {
        self.sequential(Event::OnSessionEstablished, |hook| {
            hook.on_session_established(client, packet)
        })
    }

    /// Dispatches SUBSCRIBE.
    ///
    /// # Errors
    ///
    /// Returns the first hook error.
    pub fn on_subscribe(&self, client: &Client, packet: &SubscribePacket) -> Result<(), HookError> {
        self.sequential(Event::OnSubscribe, |hook| hook.on_subscribe(client, packet))
    }

    /// Dispatches UNSUBSCRIBE.
    ///
    /// # Errors
    ///
    /// Returns the first hook error.
    pub fn on_unsubscribe(
        &self,
        client: &Client,
        packet: &UnsubscribePacket,
    ) -> Result<(), HookError> {
        self.sequential(Event::OnUnsubscribe, |hook| hook.on_unsubscribe(client, packet))
    }

    /// Publish admission.
    ///
    /// # Errors
    ///
    /// Returns the first hook error, for example a rate-limit rejection.
    pub fn on_publish(&self, client: &Client, packet: &PublishPacket) -> Result<(), HookError> {
        self.sequential(Event::OnPublish, |hook| hook.on_publish(client, packet))
    }

    /// Dispatches a retained message store.
    ///
    /// # Errors
    ///
    /// Returns the first hook error.
    pub fn on_retain_message(
        &self,
        client: &Client,
        packet: &PublishPacket,
        retained: i64,
    ) -> Result<(), HookError> {
        self.sequential(Event::OnRetainMessage, |hook| {
            hook.on_retain_message(client, packet, retained)
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Pipe-through events
    // ─────────────────────────────────────────────────────────────────────────

    /// Passes inbound packet bytes through every providing hook.
    ///
    /// # Errors
    ///
    /// The first hook error aborts the chain; no data is returned.
    pub fn on_packet_read(&self, client: &Client, data: Vec<u8>) -> Result<Vec<u8>, HookError> {
        let snapshot = self.registry.snapshot();
        snapshot
            .providing(Event::OnPacketRead)
            .try_fold(data, |data, hook| hook.on_packet_read(client, data))
    }

    /// Passes outbound packet bytes through every providing hook.
    ///
    /// Identity when no hook provides the event.
    #[must_use]
    pub fn on_packet_encode(&self, client: &Client, data: Vec<u8>) -> Vec<u8> {
        let snapshot = self.registry.snapshot();
        snapshot
            .providing(Event::OnPacketEncode)
            .fold(data, |data, hook| hook.on_packet_encode(client, data))
    }

    /// Passes the selected subscribers of a publish through every providing hook.
    #[must_use]
    pub fn on_select_subscribers(
        &self,
        subscribers: Subscribers,
        packet: &PublishPacket,
    ) -> Subscribers {
        let snapshot = self.registry.snapshot();
        snapshot
            .providing(Event::OnSelectSubscribers)
            .fold(subscribers, |subscribers, hook| {
                hook.on_select_subscribers(subscribers, packet)
            })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Override events
    // ─────────────────────────────────────────────────────────────────────────

    /// Resolves a session. Starts from `None`; each hook may replace the
    /// candidate and the last replacement wins.
    #[must_use]
    pub fn on_session_establish(
        &self,
        client: &Client,
        packet: &ConnectPacket,
    ) -> Option<SessionState> {
        let snapshot = self.registry.snapshot();
        snapshot
            .providing(Event::OnSessionEstablish)
            .fold(None, |current, hook| {
                hook.on_session_establish(client, packet, current.as_ref())
                    .or(current)
            })
    }

    /// Resolves the will to send. Starts from `will`; each hook may replace
    /// the candidate and the last replacement wins. Hook errors are logged and
    /// leave the candidate unchanged.
    #[must_use]
    pub fn on_will(&self, client: &Client, will: WillMessage) -> WillMessage {
        let snapshot = self.registry.snapshot();
        snapshot
            .providing(Event::OnWill)
            .fold(will, |current, hook| match hook.on_will(client, &current) {
                Ok(Some(replacement)) => replacement,
                Ok(None) => current,
                Err(error) => {
                    tracing::debug!(hook = %hook.id(), %error, "will hook failed");
                    current
                }
            })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // First-responder events
    // ─────────────────────────────────────────────────────────────────────────

    /// Loads persisted clients from the first providing hook.
    ///
    /// # Errors
    ///
    /// Returns that hook's error.
    pub fn stored_clients(&self) -> Result<Vec<StoredClient>, HookError> {
        self.first_responder(Event::StoredClients, |hook| hook.stored_clients())
    }

    /// Loads persisted subscriptions from the first providing hook.
    ///
    /// # Errors
    ///
    /// Returns that hook's error.
    pub fn stored_subscriptions(&self) -> Result<Vec<StoredSubscription>, HookError> {
        self.first_responder(Event::StoredSubscriptions, |hook| hook.stored_subscriptions())
    }

    /// Loads persisted inflight messages from the first providing hook.
    ///
    /// # Errors
    ///
    /// Returns that hook's error.
    pub fn stored_inflight_messages(&self) -> Result<Vec<InflightMessage>, HookError> {
        self.first_responder(Event::StoredInflightMessages, |hook| hook.stored_inflight_messages())
    }

    /// Loads persisted retained messages from the first providing hook.
    ///
    /// # Errors
    ///
    /// Returns that hook's error.
    pub fn stored_retained_messages(&self) -> Result<Vec<RetainedMessage>, HookError> {
        self.first_responder(Event::StoredRetainedMessages, |hook| hook.stored_retained_messages())
    }

    /// Loads persisted system information from the first providing hook.
    ///
    /// # Errors
    ///
    /// Returns that hook's error.
    pub fn stored_sys_info(&self) -> Result<Option<SystemInfo>, HookError> {
        self.first_responder(Event::StoredSysInfo, |hook| hook.stored_sys_info())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Notifications
    // ─────────────────────────────────────────────────────────────────────────

    /// Notifies a system information tick.
    pub fn on_sys_info_tick(&self, info: &SystemInfo) {
        self.notify(Event::OnSysInfoTick, |hook| hook.on_sys_info_tick(info));
    }

    /// Notifies that the broker started.
    pub fn on_started(&self) {
        self.notify(Event::OnStarted, Hook::on_started);
    }

    /// Notifies that the broker stopped.
    pub fn on_stopped(&self) {
        self.notify(Event::OnStopped, Hook::on_stopped);
    }

    /// Notifies a disconnect.
    pub fn on_disconnect(&self, client: &Client, reason: Option<&str>, expire: bool) {
        self.notify(Event::OnDisconnect, |hook| {
            hook.on_disconnect(client, reason, expire)
        });
    }

    /// Notifies that a packet was written.
    pub fn on_packet_sent(&self, client: &Client, packet_type: PacketType, written: usize) {
        self.notify(Event::OnPacketSent, |hook| {
            hook.on_packet_sent(client, packet_type, written)
        });
    }

    /// Notifies that an inbound packet was processed.
    pub fn on_packet_processed(
        &self,
        client: &Client,
        packet_type: PacketType,
        error: Option<&str>,
    ) {
        self.notify(Event::OnPacketProcessed, |hook| {
            hook.on_packet_processed(client, packet_type, error)
        });
    }

    /// Notifies accepted subscriptions.
    pub fn on_subscribed(&self, client: &Client, packet: &SubscribePacket, reason_codes: &[u8]) {
        self.notify(Event::OnSubscribed, |hook| {
            hook.on_subscribed(client, packet, reason_codes)
        });
    }

    /// Notifies removed subscriptions.
    pub fn on_unsubscribed(&self, client: &Client, packet: &UnsubscribePacket) {
        self.notify(Event::OnUnsubscribed, |hook| {
            hook.on_unsubscribed(client, packet)
        });
    }

    /// Notifies an accepted publish.
    pub fn on_published(&self, client: &Client, packet: &PublishPacket) {
        self.notify(Event::OnPublished, |hook| hook.on_published(client, packet));
    }

    /// Notifies a dropped publish.
    pub fn on_publish_dropped(&self, client: &Client, packet: &PublishPacket) {
        self.notify(Event::OnPublishDropped, |hook| {
            hook.on_publish_dropped(client, packet)
        });
    }

    /// Notifies delivery of a retained message.
    pub fn on_retain_published(&self, client: &Client, packet: &PublishPacket) {
        self.notify(Event::OnRetainPublished, |hook| {
            hook.on_retain_published(client, packet)
        });
    }

    /// Notifies that a message entered the inflight window.
    pub fn on_qos_publish(&self, client: &Client, packet: &PublishPacket, sent: i64, resends: u32) {
        self.notify(Event::OnQosPublish, |hook| {
            hook.on_qos_publish(client, packet, sent, resends)
        });
    }

    /// Notifies a completed QoS flow.
    pub fn on_qos_complete(&self, client: &Client, packet_id: u16, packet_type: PacketType) {
        self.notify(Event::OnQosComplete, |hook| {
            hook.on_qos_complete(client, packet_id, packet_type)
        });
    }

    /// Notifies an abandoned QoS flow.
    pub fn on_qos_dropped(&self, client: &Client, packet_id: u16) {
        self.notify(Event::OnQosDropped, |hook| hook.on_qos_dropped(client, packet_id));
    }

    /// Notifies packet identifier exhaustion.
    pub fn on_packet_id_exhausted(&self, client: &Client, packet_type: PacketType) {
        self.notify(Event::OnPacketIdExhausted, |hook| {
            hook.on_packet_id_exhausted(client, packet_type)
        });
    }

    /// Notifies that a will was sent.
    pub fn on_will_sent(&self, client: &Client, packet: &PublishPacket) {
        self.notify(Event::OnWillSent, |hook| hook.on_will_sent(client, packet));
    }

    /// Notifies that a client's session expired.
    pub fn on_client_expired(&self, client: &Client) {
        self.notify(Event::OnClientExpired, |hook| hook.on_client_expired(client));
    }

    /// Notifies that a retained message expired.
    pub fn on_retained_expired(&self, topic: &str) {
        self.notify(Event::OnRetainedExpired, |hook| hook.on_retained_expired(topic));
    }
}
