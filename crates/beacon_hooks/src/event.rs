//! Lifecycle events at which hooks may be invoked.
//!
//! Every [`Event`] has a stable `u8` ordinal (its declaration order) and a
//! textual name. Hooks advertise participation per event through
//! [`Hook::provides`](crate::Hook::provides), usually by testing membership in
//! an [`EventSet`].
//!
//! # Example
//!
//! ```
//! use beacon_hooks::{Event, EventSet};
//!
//! const PROVIDED: EventSet = EventSet::of(&[Event::OnConnect, Event::OnPublish]);
//!
//! assert!(PROVIDED.contains(Event::OnPublish));
//! assert!(!PROVIDED.contains(Event::OnSubscribe));
//! assert_eq!(Event::name_of(Event::OnPublish as u8), "OnPublish");
//! assert_eq!(Event::name_of(200), "Unknown");
//! ```

use core::fmt;

/// Declares [`Event`] with its ordinal table and name table kept in lockstep.
macro_rules! events {
    ($($(#[$meta:meta])* $variant:ident),+ $(,)?) => {
        /// A lifecycle point in the broker's protocol processing.
        ///
        /// The discriminant is the event's ordinal and never changes between
        /// releases; new events are only ever appended.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(u8)]
        pub enum Event {
            $($(#[$meta])* $variant,)+
        }

        impl Event {
            /// Every event, in ordinal order.
            pub const ALL: &'static [Event] = &[$(Event::$variant,)+];

            const NAMES: &'static [&'static str] = &[$(stringify!($variant),)+];
        }
    };
}

events! {
    /// Broker options were pushed to the hook.
    SetOptions,
    /// Periodic `$SYS` information tick.
    OnSysInfoTick,
    /// The broker started.
    OnStarted,
    /// The broker stopped.
    OnStopped,
    /// Authenticate a connecting client (veto).
    OnConnectAuthenticate,
    /// Check a client's access to a topic (veto).
    OnAclCheck,
    /// A client sent CONNECT (sequential error).
    OnConnect,
    /// Resolve a session for a connecting client (last-non-nil override).
    OnSessionEstablish,
    /// A client session was established (sequential error).
    OnSessionEstablished,
    /// A client disconnected.
    OnDisconnect,
    /// A client sent an AUTH packet (veto).
    OnAuthPacket,
    /// Raw inbound packet bytes (pipe-through with error).
    OnPacketRead,
    /// Raw outbound packet bytes (pipe-through).
    OnPacketEncode,
    /// A packet was written to a client.
    OnPacketSent,
    /// An inbound packet finished processing.
    OnPacketProcessed,
    /// A client sent SUBSCRIBE (sequential error).
    OnSubscribe,
    /// A subscription was accepted.
    OnSubscribed,
    /// Narrow or rewrite the subscribers of a publish (pipe-through).
    OnSelectSubscribers,
    /// A client sent UNSUBSCRIBE (sequential error).
    OnUnsubscribe,
    /// A subscription was removed.
    OnUnsubscribed,
    /// Publish admission (sequential error).
    OnPublish,
    /// A publish was accepted and fanned out.
    OnPublished,
    /// A publish was dropped before delivery.
    OnPublishDropped,
    /// A retained message is about to be stored (sequential error).
    OnRetainMessage,
    /// A retained message was delivered to a new subscriber.
    OnRetainPublished,
    /// A QoS 1/2 message entered the inflight window.
    OnQosPublish,
    /// A QoS 1/2 flow completed.
    OnQosComplete,
    /// A QoS 1/2 message was abandoned.
    OnQosDropped,
    /// A client ran out of packet identifiers.
    OnPacketIdExhausted,
    /// A will message is about to be sent (last-non-nil override).
    OnWill,
    /// A will message was sent.
    OnWillSent,
    /// A disconnected client's session expired.
    OnClientExpired,
    /// A retained message expired.
    OnRetainedExpired,
    /// Load persisted clients (first responder).
    StoredClients,
    /// Load persisted subscriptions (first responder).
    StoredSubscriptions,
    /// Load persisted inflight messages (first responder).
    StoredInflightMessages,
    /// Load persisted retained messages (first responder).
    StoredRetainedMessages,
    /// Load persisted system information (first responder).
    StoredSysInfo,
}

impl Event {
    /// Returns the event with the given ordinal, if it exists.
    #[must_use]
    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        Self::ALL.get(usize::from(ordinal)).copied()
    }

    /// Returns the stable ordinal of this event.
    #[must_use]
    pub const fn ordinal(self) -> u8 {
        self as u8
    }

    /// Returns the textual name of this event.
    #[must_use]
    pub fn name(self) -> &'static str {
        Self::NAMES[usize::from(self.ordinal())]
    }

    /// Returns the name for a raw ordinal, or `"Unknown"` when out of range.
    #[must_use]
    pub fn name_of(ordinal: u8) -> &'static str {
        Self::NAMES
            .get(usize::from(ordinal))
            .copied()
            .unwrap_or("Unknown")
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// EventSet
// ─────────────────────────────────────────────────────────────────────────────

/// A fixed-size set of [`Event`]s.
///
/// Intended for `const` declarations of what a hook provides, so that
/// [`Hook::provides`](crate::Hook::provides) is a single bit test.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct EventSet(u64);

impl EventSet {
    /// The empty set.
    pub const EMPTY: Self = Self(0);

    /// Builds a set from a slice of events.
    #[must_use]
    pub const fn of(events: &[Event]) -> Self {
        let mut bits = 0u64;
        let mut i = 0;
        while i < events.len() {
            bits |= 1u64 << events[i] as u8;
            i += 1;
        }
        Self(bits)
    }

    /// Returns a copy of this set with `event` added.
    #[must_use]
    pub const fn with(self, event: Event) -> Self {
        Self(self.0 | 1u64 << event as u8)
    }

    /// Returns whether `event` is in the set.
    #[must_use]
    pub const fn contains(self, event: Event) -> bool {
        self.0 & (1u64 << event as u8) != 0
    }

    /// Returns whether any event of `other` is in the set.
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Returns whether the set is empty.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterates the events in the set in ordinal order.
    pub fn iter(self) -> impl Iterator<Item = Event> {
        Event::ALL.iter().copied().filter(move |e| self.contains(*e))
    }
}

impl fmt::Debug for EventSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl FromIterator<Event> for EventSet {
    fn from_iter<I: IntoIterator<Item = Event>>(iter: I) -> Self {
        iter.into_iter().fold(Self::EMPTY, Self::with)
    }
}
