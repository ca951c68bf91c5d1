//! Dispatch semantics for each event shape.
//!
//! Every test builds a small registry of scripted hooks and checks both the
//! combined result and which hooks were actually invoked.


use std::sync::Arc;

use beacon_hooks::{
    AuthPacket, Client, ConnectPacket, Event, EventDispatcher, HookError, HookRegistry,
    PublishPacket, SessionState, StoredClient, Subscribers, Subscription, WillMessage,
};
use test_utils::{CallLog, InertHook, ScriptedHook};

fn dispatcher() -> (EventDispatcher, CallLog) {
    (
        EventDispatcher::new(Arc::new(HookRegistry::new())),
        CallLog::default(),
    )
}

fn client() -> Client {
    Client::new("client-1")
}

// ═══════════════════════════════════════════════════════════════════════════════
// VETO
// ═══════════════════════════════════════════════════════════════════════════════

/// H1 allows, H2 denies: denied, each asked exactly once.
#[test]
fn veto_is_denied_when_any_hook_refuses() {
    let (hooks, log) = dispatcher();
    let allow = ScriptedHook::new("h1", &log)
        .providing(&[Event::OnConnectAuthenticate])
        .build();
    let deny = ScriptedHook::new("h2", &log)
        .providing(&[Event::OnConnectAuthenticate])
        .denying()
        .build();
    hooks.registry().add(allow.clone()).unwrap();
    hooks.registry().add(deny.clone()).unwrap();

    let allowed = hooks.on_connect_authenticate(&client(), &ConnectPacket::default());

    assert!(!allowed);
    assert_eq!(allow.calls(), 1);
    assert_eq!(deny.calls(), 1);
}

/// A refusal short-circuits hooks registered after it.
#[test]
fn veto_short_circuits_after_first_refusal() {
    let (hooks, log) = dispatcher();
    let deny = ScriptedHook::new("deny", &log)
        .providing(&[Event::OnAclCheck])
        .denying()
        .build();
    let later = ScriptedHook::new("later", &log)
        .providing(&[Event::OnAclCheck])
        .build();
    hooks.registry().add(deny).unwrap();
    hooks.registry().add(later.clone()).unwrap();

    assert!(!hooks.on_acl_check(&client(), "a/b", true));
    assert_eq!(later.calls(), 0);
}

/// An auth packet refusal stops the chain and later hooks are never asked.
#[test]
fn auth_packet_refusal_short_circuits() {
    let (hooks, log) = dispatcher();
    let allow = ScriptedHook::new("allow", &log)
        .providing(&[Event::OnAuthPacket])
        .build();
    let deny = ScriptedHook::new("deny", &log)
        .providing(&[Event::OnAuthPacket])
        .denying()
        .build();
    let later = ScriptedHook::new("later", &log)
        .providing(&[Event::OnAuthPacket])
        .build();
    hooks.registry().add(allow.clone()).unwrap();
    hooks.registry().add(deny.clone()).unwrap();
    hooks.registry().add(later.clone()).unwrap();

    assert!(!hooks.on_auth_packet(&client(), &AuthPacket::default()));
    assert_eq!(log.hooks_for(Event::OnAuthPacket), vec!["allow", "deny"]);
    assert_eq!(later.calls(), 0, "hooks after a refusal must not be asked");

    hooks.registry().remove("deny").unwrap();
    assert!(hooks.on_auth_packet(&client(), &AuthPacket::default()));
    assert_eq!(later.calls(), 1);
}

/// With no providing hook, veto events are allowed.
#[test]
fn veto_allows_without_providing_hooks() {
    let (hooks, log) = dispatcher();
    hooks
        .registry()
        .add(ScriptedHook::new("other", &log).denying().build())
        .unwrap();

    assert!(hooks.on_connect_authenticate(&client(), &ConnectPacket::default()));
    assert!(hooks.on_acl_check(&client(), "a/b", false));
    assert_eq!(log.len(), 0, "non-providing hooks must not be called");
}

// ═══════════════════════════════════════════════════════════════════════════════
// SEQUENTIAL ERROR
// ═══════════════════════════════════════════════════════════════════════════════

/// The first error is returned verbatim and later hooks are skipped.
#[test]
fn sequential_returns_first_error() {
    let (hooks, log) = dispatcher();
    let ok = ScriptedHook::new("ok", &log).providing(&[Event::OnPublish]).build();
    let bad = ScriptedHook::new("bad", &log)
        .providing(&[Event::OnPublish])
        .failing("quota")
        .build();
    let never = ScriptedHook::new("never", &log)
        .providing(&[Event::OnPublish])
        .failing("other")
        .build();
    hooks.registry().add(ok.clone()).unwrap();
    hooks.registry().add(bad).unwrap();
    hooks.registry().add(never.clone()).unwrap();

    let result = hooks.on_publish(&client(), &PublishPacket::new("t", "x"));

    match result {
        Err(HookError::Rejected { hook, reason }) => {
            assert_eq!(hook, "bad");
            assert_eq!(reason, "quota");
        }
        other => panic!("expected rejection from 'bad', got {other:?}"),
    }
    assert_eq!(ok.calls(), 1);
    assert_eq!(never.calls(), 0);
}

/// Without failures every providing hook runs in registration order.
#[test]
fn sequential_runs_all_hooks_in_order() {
    let (hooks, log) = dispatcher();
    for id in ["first", "second", "third"] {
        hooks
            .registry()
            .add(
                ScriptedHook::new(id, &log)
                    .providing(&[Event::OnConnect])
                    .build(),
            )
            .unwrap();
    }

    hooks
        .on_connect(&client(), &ConnectPacket::default())
        .expect("no hook fails");

    assert_eq!(
        log.hooks_for(Event::OnConnect),
        vec!["first", "second", "third"],
        "hooks should execute in registration order"
    );
}

// ═══════════════════════════════════════════════════════════════════════════════
// NOTIFICATIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Notification failures are swallowed and do not stop later hooks.
#[test]
fn notifications_reach_every_hook_despite_failures() {
    let (hooks, log) = dispatcher();
    let failing = ScriptedHook::new("failing", &log)
        .providing(&[Event::OnPublished])
        .failing("broken sink")
        .build();
    let healthy = ScriptedHook::new("healthy", &log)
        .providing(&[Event::OnPublished])
        .build();
    hooks.registry().add(failing.clone()).unwrap();
    hooks.registry().add(healthy.clone()).unwrap();

    hooks.on_published(&client(), &PublishPacket::new("t", "x"));

    assert_eq!(failing.calls(), 1);
    assert_eq!(healthy.calls(), 1);
}

// ═══════════════════════════════════════════════════════════════════════════════
// PIPE-THROUGH
// ═══════════════════════════════════════════════════════════════════════════════

/// With no providing hooks packet encoding is the identity.
#[test]
fn packet_encode_without_hooks_is_identity() {
    let (hooks, log) = dispatcher();
    hooks
        .registry()
        .add(Arc::new(InertHook("inert".into())))
        .unwrap();

    let input = vec![0x30, 0x02, 0x00, 0x00];
    assert_eq!(hooks.on_packet_encode(&client(), input.clone()), input);
    assert_eq!(log.len(), 0);
}

/// Each encode hook sees the previous hook's output.
#[test]
fn packet_encode_chains_outputs() {
    let (hooks, log) = dispatcher();
    hooks
        .registry()
        .add(
            ScriptedHook::new("a", &log)
                .providing(&[Event::OnPacketEncode])
                .appending(1)
                .build(),
        )
        .unwrap();
    hooks
        .registry()
        .add(
            ScriptedHook::new("b", &log)
                .providing(&[Event::OnPacketEncode])
                .appending(2)
                .build(),
        )
        .unwrap();

    assert_eq!(hooks.on_packet_encode(&client(), vec![0]), vec![0, 1, 2]);
}

/// Each subscriber selection hook sees the set the previous one returned.
#[test]
fn select_subscribers_chains_outputs() {
    let (hooks, log) = dispatcher();
    let mut initial = Subscribers::default();
    initial
        .clients
        .insert("origin".into(), Subscription::new("sensors/#", 0));
    initial
        .clients
        .insert("muted".into(), Subscription::new("sensors/#", 0));

    let first = ScriptedHook::new("first", &log)
        .providing(&[Event::OnSelectSubscribers])
        .dropping_subscriber("muted")
        .adding_subscriber("bridge")
        .build();
    let second = ScriptedHook::new("second", &log)
        .providing(&[Event::OnSelectSubscribers])
        .adding_subscriber("audit")
        .build();
    hooks.registry().add(first.clone()).unwrap();
    hooks.registry().add(second.clone()).unwrap();

    let selected = hooks.on_select_subscribers(initial, &PublishPacket::new("sensors/temp", "1"));

    assert_eq!(*first.subscribers_seen.lock(), vec![vec!["muted", "origin"]]);
    assert_eq!(
        *second.subscribers_seen.lock(),
        vec![vec!["bridge", "origin"]],
        "second hook should see the first hook's output"
    );
    let mut ids: Vec<&str> = selected.clients.keys().map(String::as_str).collect();
    ids.sort_unstable();
    assert_eq!(ids, ["audit", "bridge", "origin"]);
}

/// Packet read chains outputs and aborts on the first error.
#[test]
fn packet_read_chains_and_aborts_on_error() {
    let (hooks, log) = dispatcher();
    hooks
        .registry()
        .add(
            ScriptedHook::new("a", &log)
                .providing(&[Event::OnPacketRead])
                .appending(7)
                .build(),
        )
        .unwrap();
    assert_eq!(hooks.on_packet_read(&client(), vec![1]).unwrap(), vec![1, 7]);

    let never = ScriptedHook::new("never", &log)
        .providing(&[Event::OnPacketRead])
        .appending(9)
        .build();
    hooks
        .registry()
        .add(
            ScriptedHook::new("bad", &log)
                .providing(&[Event::OnPacketRead])
                .failing("garbage")
                .build(),
        )
        .unwrap();
    hooks.registry().add(never.clone()).unwrap();

    let result = hooks.on_packet_read(&client(), vec![1]);
    assert!(matches!(result, Err(HookError::Rejected { .. })));
    assert_eq!(never.calls(), 0);
}

// ═══════════════════════════════════════════════════════════════════════════════
// OVERRIDE
// ═══════════════════════════════════════════════════════════════════════════════

/// Session establish starts from none and keeps the last non-none candidate.
#[test]
fn session_establish_keeps_last_replacement() {
    let (hooks, log) = dispatcher();
    assert_eq!(hooks.on_session_establish(&client(), &ConnectPacket::default()), None);

    let session = |expiry| SessionState {
        client_id: "client-1".into(),
        expiry_interval: expiry,
        ..SessionState::default()
    };
    hooks
        .registry()
        .add(
            ScriptedHook::new("a", &log)
                .providing(&[Event::OnSessionEstablish])
                .with_session(session(10))
                .build(),
        )
        .unwrap();
    hooks
        .registry()
        .add(
            ScriptedHook::new("b", &log)
                .providing(&[Event::OnSessionEstablish])
                .with_session(session(20))
                .build(),
        )
        .unwrap();
    hooks
        .registry()
        .add(
            ScriptedHook::new("no-opinion", &log)
                .providing(&[Event::OnSessionEstablish])
                .build(),
        )
        .unwrap();

    let resolved = hooks.on_session_establish(&client(), &ConnectPacket::default());

    assert_eq!(resolved, Some(session(20)));
    assert_eq!(log.hooks_for(Event::OnSessionEstablish).len(), 3);
}

/// Will starts from the caller's value; failing hooks have no opinion.
#[test]
fn will_override_ignores_failures() {
    let (hooks, log) = dispatcher();
    let original = WillMessage {
        topic: "status/offline".into(),
        payload: b"bye".to_vec(),
        ..WillMessage::default()
    };
    assert_eq!(hooks.on_will(&client(), original.clone()), original);

    hooks
        .registry()
        .add(
            ScriptedHook::new("rewrite", &log)
                .providing(&[Event::OnWill])
                .with_will_topic("status/gone")
                .build(),
        )
        .unwrap();
    hooks
        .registry()
        .add(
            ScriptedHook::new("broken", &log)
                .providing(&[Event::OnWill])
                .with_will_topic("never")
                .failing("oops")
                .build(),
        )
        .unwrap();

    let will = hooks.on_will(&client(), original);

    assert_eq!(will.topic, "status/gone");
    assert_eq!(will.payload, b"bye");
}

/// With two rewriting hooks the later registration decides the will.
#[test]
fn will_override_keeps_the_last_rewrite() {
    let (hooks, log) = dispatcher();
    for (id, topic) in [("early", "status/early"), ("late", "status/late")] {
        hooks
            .registry()
            .add(
                ScriptedHook::new(id, &log)
                    .providing(&[Event::OnWill])
                    .with_will_topic(topic)
                    .build(),
            )
            .unwrap();
    }
    hooks
        .registry()
        .add(ScriptedHook::new("silent", &log).providing(&[Event::OnWill]).build())
        .unwrap();
    let original = WillMessage {
        topic: "status/offline".into(),
        payload: b"bye".to_vec(),
        ..WillMessage::default()
    };

    let will = hooks.on_will(&client(), original);

    assert_eq!(will.topic, "status/late");
    assert_eq!(will.payload, b"bye");
    assert_eq!(log.hooks_for(Event::OnWill), vec!["early", "late", "silent"]);
}

// ═══════════════════════════════════════════════════════════════════════════════
// FIRST RESPONDER
// ═══════════════════════════════════════════════════════════════════════════════

/// Only the first providing hook answers a stored-data request.
#[test]
fn stored_data_comes_from_first_responder() {
    let (hooks, log) = dispatcher();
    assert!(hooks.stored_clients().unwrap().is_empty());
    assert_eq!(hooks.stored_sys_info().unwrap(), None);

    let stored = vec![StoredClient {
        id: "persisted".into(),
        ..StoredClient::default()
    }];
    let first = ScriptedHook::new("primary", &log)
        .providing(&[Event::StoredClients])
        .with_stored(stored.clone())
        .build();
    let second = ScriptedHook::new("secondary", &log)
        .providing(&[Event::StoredClients])
        .build();
    hooks.registry().add(first).unwrap();
    hooks.registry().add(second.clone()).unwrap();

    assert_eq!(hooks.stored_clients().unwrap(), stored);
    assert_eq!(second.calls(), 0);
}

/// A first-responder error is surfaced.
#[test]
fn stored_data_error_is_surfaced() {
    let (hooks, log) = dispatcher();
    hooks
        .registry()
        .add(
            ScriptedHook::new("store", &log)
                .providing(&[Event::StoredClients])
                .failing("disk")
                .build(),
        )
        .unwrap();

    assert!(hooks.stored_clients().is_err());
}

// ═══════════════════════════════════════════════════════════════════════════════
// SNAPSHOTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Removing a hook takes effect on the next dispatch.
#[test]
fn dispatch_reflects_registry_changes_between_calls() {
    let (hooks, log) = dispatcher();
    hooks
        .registry()
        .add(
            ScriptedHook::new("gate", &log)
                .providing(&[Event::OnAclCheck])
                .denying()
                .build(),
        )
        .unwrap();
    assert!(!hooks.on_acl_check(&client(), "t", false));
    assert!(hooks.provides(Event::OnAclCheck));

    hooks.registry().remove("gate").unwrap();

    assert!(hooks.on_acl_check(&client(), "t", false));
    assert!(!hooks.provides(Event::OnAclCheck));
}
