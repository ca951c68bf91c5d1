//! Passive value records handed to hooks by the broker core.
//!
//! The hook subsystem never owns the lifecycle of these records. Hooks read
//! them, and for a handful of events (`OnWill`, `OnPacketRead`,
//! `OnPacketEncode`, `OnSessionEstablish`, `OnSelectSubscribers`) return a
//! replacement that later hooks and the broker use instead.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

/// Protocol-extension metadata attached to packets and messages.
///
/// Keys are unordered; values are arbitrary JSON values.
pub type Properties = serde_json::Map<String, serde_json::Value>;

/// Returns `true` when `properties` carries at least one entry.
///
/// Absent and present-but-empty properties are both "no properties".
#[must_use]
pub fn has_properties(properties: Option<&Properties>) -> bool {
    properties.is_some_and(|p| !p.is_empty())
}

/// Control packet type, as carried in the fixed header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
#[expect(missing_docs, reason = "variants are the protocol's packet names")]
pub enum PacketType {
    #[default]
    Reserved = 0,
    Connect = 1,
    Connack = 2,
    Publish = 3,
    Puback = 4,
    Pubrec = 5,
    Pubrel = 6,
    Pubcomp = 7,
    Subscribe = 8,
    Suback = 9,
    Unsubscribe = 10,
    Unsuback = 11,
    Pingreq = 12,
    Pingresp = 13,
    Disconnect = 14,
    Auth = 15,
}

// ─────────────────────────────────────────────────────────────────────────────
// Clients
// ─────────────────────────────────────────────────────────────────────────────

/// A connected client as seen by hooks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    /// Client identifier. Empty only for a client that has not yet connected.
    pub id: String,
    /// Username supplied at connect time.
    pub username: Option<String>,
    /// Remote address of the connection.
    pub remote: String,
    /// Listener the client connected through.
    pub listener: String,
    /// Protocol version (3, 4 or 5).
    pub protocol_version: u8,
    /// Whether the client asked for a clean session.
    pub clean_start: bool,
}

impl Client {
    /// Creates a client with the given identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            protocol_version: 5,
            ..Self::default()
        }
    }

    /// Sets the username.
    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }
}

/// A persisted client record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredClient {
    /// Client identifier.
    pub id: String,
    /// Username used by the client.
    pub username: Option<String>,
    /// Last known remote address.
    pub remote: String,
    /// Listener the client used.
    pub listener: String,
    /// Protocol version.
    pub protocol_version: u8,
    /// Session expiry interval in seconds.
    pub session_expiry_interval: u32,
    /// Pending will message, if any.
    pub will: Option<WillMessage>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Packets
// ─────────────────────────────────────────────────────────────────────────────

/// A CONNECT packet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConnectPacket {
    /// Client identifier requested by the client.
    pub client_id: String,
    /// Username, if supplied.
    pub username: Option<String>,
    /// Password, if supplied.
    pub password: Option<Vec<u8>>,
    /// Keepalive in seconds.
    pub keepalive: u16,
    /// Clean start / clean session flag.
    pub clean_start: bool,
    /// Protocol version.
    pub protocol_version: u8,
    /// Will message carried by the connect.
    pub will: Option<WillMessage>,
    /// Connect properties.
    pub properties: Option<Properties>,
}

/// A PUBLISH packet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublishPacket {
    /// Topic name.
    pub topic: String,
    /// Application payload.
    pub payload: Vec<u8>,
    /// Quality of service (0, 1 or 2).
    pub qos: u8,
    /// Retain flag.
    pub retain: bool,
    /// Duplicate delivery flag.
    pub dup: bool,
    /// Packet identifier, present for QoS > 0.
    pub packet_id: Option<u16>,
    /// Publish properties.
    pub properties: Option<Properties>,
}

impl PublishPacket {
    /// Creates a QoS 0 publish for `topic`.
    #[must_use]
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            ..Self::default()
        }
    }
}

/// A SUBSCRIBE packet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribePacket {
    /// Packet identifier.
    pub packet_id: u16,
    /// Requested subscriptions.
    pub filters: Vec<Subscription>,
}

/// An UNSUBSCRIBE packet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsubscribePacket {
    /// Packet identifier.
    pub packet_id: u16,
    /// Topic filters to remove.
    pub filters: Vec<String>,
}

/// An AUTH packet (enhanced authentication exchange).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthPacket {
    /// Reason code.
    pub reason_code: u8,
    /// Authentication method.
    pub method: Option<String>,
    /// Authentication data.
    pub data: Option<Vec<u8>>,
    /// Auth properties.
    pub properties: Option<Properties>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Subscriptions
// ─────────────────────────────────────────────────────────────────────────────

/// A single topic-filter subscription.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Topic filter.
    pub filter: String,
    /// Maximum QoS granted.
    pub qos: u8,
    /// Do not deliver the client's own publishes.
    pub no_local: bool,
    /// Keep the retain flag when forwarding.
    pub retain_as_published: bool,
    /// Retain handling option (0, 1 or 2).
    pub retain_handling: u8,
    /// Subscription identifier.
    pub identifier: Option<u32>,
}

impl Subscription {
    /// Creates a subscription for `filter` at `qos`.
    #[must_use]
    pub fn new(filter: impl Into<String>, qos: u8) -> Self {
        Self {
            filter: filter.into(),
            qos,
            ..Self::default()
        }
    }
}

/// A persisted subscription, tagged with its owning client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSubscription {
    /// Owning client identifier.
    pub client_id: String,
    /// The subscription.
    pub subscription: Subscription,
}

/// The set of subscribers selected for a publish, keyed by client identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subscribers {
    /// Matching subscriptions per client.
    pub clients: HashMap<String, Subscription>,
}

impl Subscribers {
    /// Returns the number of selected clients.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Returns whether no client is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Messages and sessions
// ─────────────────────────────────────────────────────────────────────────────

/// A client's will (last will and testament).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WillMessage {
    /// Topic the will is published to.
    pub topic: String,
    /// Will payload.
    pub payload: Vec<u8>,
    /// Will QoS.
    pub qos: u8,
    /// Will retain flag.
    pub retain: bool,
    /// Delay before publishing, in seconds.
    pub delay_interval: u32,
    /// Will properties.
    pub properties: Option<Properties>,
}

/// A QoS 1/2 message awaiting acknowledgement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InflightMessage {
    /// Owning client identifier.
    pub client_id: String,
    /// Packet identifier of the flow.
    pub packet_id: u16,
    /// The message in flight.
    pub packet: PublishPacket,
    /// Unix timestamp (seconds) of the last send.
    pub sent: i64,
}

/// A retained message stored against its topic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetainedMessage {
    /// Topic name.
    pub topic: String,
    /// The retained publish.
    pub packet: PublishPacket,
}

/// Session state resolved for a connecting client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Owning client identifier.
    pub client_id: String,
    /// Restored subscriptions.
    pub subscriptions: Vec<Subscription>,
    /// Restored inflight messages.
    pub inflight: Vec<InflightMessage>,
    /// Session expiry interval in seconds.
    pub expiry_interval: u32,
}

/// Broker statistics published on `$SYS` and optionally persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemInfo {
    /// Broker version string.
    pub version: String,
    /// Unix timestamp (seconds) the broker started.
    pub started: i64,
    /// Uptime in seconds.
    pub uptime: i64,
    /// Currently connected clients.
    pub clients_connected: i64,
    /// Messages received since start.
    pub messages_received: i64,
    /// Messages sent since start.
    pub messages_sent: i64,
    /// Retained messages held.
    pub retained: i64,
    /// Inflight messages held.
    pub inflight: i64,
    /// Active subscriptions.
    pub subscriptions: i64,
}
