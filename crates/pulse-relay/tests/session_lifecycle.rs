//! Integration tests for connect/disconnect lifecycle, presence
//! transitions, group membership, and typing state.

mod helpers;

use pulse_core::error::ErrorKind;
use pulse_core::types::{ConnectionId, GroupId};
use pulse_relay::connection::PresenceStatus;
use pulse_relay::membership::registry::GroupKind;
use pulse_relay::message::types::{InboundEvent, OutboundEvent};

use helpers::{connect, drain, presence_updates_for, test_engine};

#[tokio::test]
async fn test_missing_credential_rejected_by_default() {
    let (engine, _verifier, _gateway) = test_engine(false);

    let err = engine.sessions.connect(None).await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::Authentication);
    assert_eq!(engine.connections.connection_count(), 0);
}

#[tokio::test]
async fn test_anonymous_connection_gets_guest_identity() {
    let (engine, _verifier, _gateway) = test_engine(true);

    let opened = engine.sessions.connect(None).await.expect("guest allowed");

    assert!(opened.handle.user_id.is_guest());
    assert_eq!(engine.connections.connection_count(), 1);
}

#[tokio::test]
async fn test_bad_credential_creates_no_state() {
    let (engine, _verifier, _gateway) = test_engine(false);

    let err = engine
        .sessions
        .connect(Some("nope".to_string()))
        .await
        .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Authentication);
    assert_eq!(engine.connections.connection_count(), 0);
    assert_eq!(engine.sessions.session_count(), 0);
}

#[tokio::test]
async fn test_presence_transitions_once_across_multiple_connections() {
    let (engine, verifier, _gateway) = test_engine(false);
    let alice = verifier.register("alice-token", "alice");
    verifier.register("bob-token", "bob");

    let (_bob_conn, mut bob_rx) = connect(&engine, "bob-token").await;
    drain(&mut bob_rx);

    let (alice_one, _alice_rx1) = connect(&engine, "alice-token").await;
    let (alice_two, _alice_rx2) = connect(&engine, "alice-token").await;

    // Exactly one online broadcast for two connections.
    let events = drain(&mut bob_rx);
    assert_eq!(
        presence_updates_for(&events, alice.id),
        vec![PresenceStatus::Online]
    );
    assert!(engine.connections.is_online(alice.id));

    // Closing one connection leaves the user online, no broadcast.
    engine.sessions.disconnect(alice_one.id);
    assert!(engine.connections.is_online(alice.id));
    assert!(presence_updates_for(&drain(&mut bob_rx), alice.id).is_empty());

    // Closing the last connection broadcasts offline exactly once.
    engine.sessions.disconnect(alice_two.id);
    assert!(!engine.connections.is_online(alice.id));
    assert_eq!(
        presence_updates_for(&drain(&mut bob_rx), alice.id),
        vec![PresenceStatus::Offline]
    );
}

#[tokio::test]
async fn test_new_connection_receives_online_snapshot() {
    let (engine, verifier, _gateway) = test_engine(false);
    let alice = verifier.register("alice-token", "alice");
    verifier.register("bob-token", "bob");

    let (_alice_conn, _alice_rx) = connect(&engine, "alice-token").await;
    let (_bob_conn, mut bob_rx) = connect(&engine, "bob-token").await;

    let snapshot = drain(&mut bob_rx)
        .into_iter()
        .find_map(|event| match event {
            OutboundEvent::PresenceState { users } => Some(users),
            _ => None,
        })
        .expect("snapshot sent on connect");

    assert!(snapshot.iter().any(|u| u.user_id == alice.id));
}

#[tokio::test]
async fn test_join_announces_and_replies_with_snapshot() {
    let (engine, verifier, _gateway) = test_engine(false);
    let alice = verifier.register("alice-token", "alice");
    verifier.register("bob-token", "bob");

    let (alice_conn, mut alice_rx) = connect(&engine, "alice-token").await;
    let (bob_conn, mut bob_rx) = connect(&engine, "bob-token").await;

    let channel = GroupId::new();
    engine
        .sessions
        .handle_event(
            bob_conn.id,
            InboundEvent::JoinGroup {
                kind: GroupKind::Channel,
                group_id: channel,
            },
        )
        .await;
    drain(&mut alice_rx);
    drain(&mut bob_rx);

    engine
        .sessions
        .handle_event(
            alice_conn.id,
            InboundEvent::JoinGroup {
                kind: GroupKind::Channel,
                group_id: channel,
            },
        )
        .await;

    // Bob, already a member, sees the join announcement.
    let bob_events = drain(&mut bob_rx);
    assert!(bob_events.iter().any(|event| matches!(
        event,
        OutboundEvent::MemberJoined { group_id, profile, .. }
            if *group_id == channel && profile.user_id == alice.id
    )));

    // Alice gets the member snapshot, including herself.
    let members = drain(&mut alice_rx)
        .into_iter()
        .find_map(|event| match event {
            OutboundEvent::GroupMembers { group_id, members, .. } if group_id == channel => {
                Some(members)
            }
            _ => None,
        })
        .expect("joiner receives snapshot");
    assert_eq!(members.len(), 2);
}

#[tokio::test]
async fn test_disconnect_sweeps_groups_and_announces_departures() {
    let (engine, verifier, _gateway) = test_engine(false);
    let alice = verifier.register("alice-token", "alice");
    verifier.register("bob-token", "bob");

    let (alice_conn, _alice_rx) = connect(&engine, "alice-token").await;
    let (bob_conn, mut bob_rx) = connect(&engine, "bob-token").await;

    let community = GroupId::new();
    let channel = GroupId::new();

    for conn in [alice_conn.id, bob_conn.id] {
        engine
            .sessions
            .handle_event(
                conn,
                InboundEvent::JoinGroup {
                    kind: GroupKind::Community,
                    group_id: community,
                },
            )
            .await;
        engine
            .sessions
            .handle_event(
                conn,
                InboundEvent::JoinGroup {
                    kind: GroupKind::Channel,
                    group_id: channel,
                },
            )
            .await;
    }
    drain(&mut bob_rx);

    engine.sessions.disconnect(alice_conn.id);

    let bob_events = drain(&mut bob_rx);
    for group_id in [community, channel] {
        assert!(bob_events.iter().any(|event| matches!(
            event,
            OutboundEvent::MemberLeft { group_id: gid, user_id, .. }
                if *gid == group_id && *user_id == alice.id
        )));
        assert!(
            !engine
                .groups
                .members_of(GroupKind::Community, group_id)
                .iter()
                .chain(engine.groups.members_of(GroupKind::Channel, group_id).iter())
                .any(|m| m.user_id == alice.id)
        );
    }
}

#[tokio::test]
async fn test_typing_broadcasts_only_on_state_change() {
    let (engine, verifier, _gateway) = test_engine(false);
    let alice = verifier.register("alice-token", "alice");
    verifier.register("bob-token", "bob");

    let (alice_conn, _alice_rx) = connect(&engine, "alice-token").await;
    let (bob_conn, mut bob_rx) = connect(&engine, "bob-token").await;

    let channel = GroupId::new();
    for conn in [alice_conn.id, bob_conn.id] {
        engine
            .sessions
            .handle_event(
                conn,
                InboundEvent::JoinGroup {
                    kind: GroupKind::Channel,
                    group_id: channel,
                },
            )
            .await;
    }
    drain(&mut bob_rx);

    // Same state twice: exactly one broadcast.
    for _ in 0..2 {
        engine
            .sessions
            .handle_event(
                alice_conn.id,
                InboundEvent::Typing {
                    channel_id: channel,
                    is_typing: true,
                },
            )
            .await;
    }

    let typing_events: Vec<_> = drain(&mut bob_rx)
        .into_iter()
        .filter(|event| matches!(
            event,
            OutboundEvent::TypingUpdate { user_id, is_typing: true, .. }
                if *user_id == alice.id
        ))
        .collect();
    assert_eq!(typing_events.len(), 1);
}

#[tokio::test]
async fn test_disconnect_clears_typing_and_announces_stop() {
    let (engine, verifier, _gateway) = test_engine(false);
    let alice = verifier.register("alice-token", "alice");
    verifier.register("bob-token", "bob");

    let (alice_conn, _alice_rx) = connect(&engine, "alice-token").await;
    let (bob_conn, mut bob_rx) = connect(&engine, "bob-token").await;

    let channel = GroupId::new();
    for conn in [alice_conn.id, bob_conn.id] {
        engine
            .sessions
            .handle_event(
                conn,
                InboundEvent::JoinGroup {
                    kind: GroupKind::Channel,
                    group_id: channel,
                },
            )
            .await;
    }
    engine
        .sessions
        .handle_event(
            alice_conn.id,
            InboundEvent::Typing {
                channel_id: channel,
                is_typing: true,
            },
        )
        .await;
    drain(&mut bob_rx);

    engine.sessions.disconnect(alice_conn.id);

    assert!(engine.typing.typing_in(channel).is_empty());
    let bob_events = drain(&mut bob_rx);
    assert!(bob_events.iter().any(|event| matches!(
        event,
        OutboundEvent::TypingUpdate { user_id, is_typing: false, .. }
            if *user_id == alice.id
    )));
}

#[tokio::test]
async fn test_unknown_connection_teardown_is_tolerated() {
    let (engine, verifier, _gateway) = test_engine(false);
    verifier.register("alice-token", "alice");
    let (_alice_conn, _alice_rx) = connect(&engine, "alice-token").await;

    engine.sessions.disconnect(ConnectionId::new());

    // No registry state was disturbed.
    assert_eq!(engine.connections.connection_count(), 1);
    assert_eq!(engine.sessions.session_count(), 1);
}

#[tokio::test]
async fn test_rejoin_after_disconnect_leaves_single_member() {
    let (engine, verifier, _gateway) = test_engine(false);
    let alice = verifier.register("alice-token", "alice");

    let group = GroupId::new();
    let (first, _rx1) = connect(&engine, "alice-token").await;
    engine
        .sessions
        .handle_event(
            first.id,
            InboundEvent::JoinGroup {
                kind: GroupKind::Community,
                group_id: group,
            },
        )
        .await;

    engine.sessions.disconnect(first.id);

    let (second, _rx2) = connect(&engine, "alice-token").await;
    engine
        .sessions
        .handle_event(
            second.id,
            InboundEvent::JoinGroup {
                kind: GroupKind::Community,
                group_id: group,
            },
        )
        .await;

    let members = engine.groups.members_of(GroupKind::Community, group);
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].user_id, alice.id);
}

#[tokio::test]
async fn test_event_for_closed_session_is_rejected() {
    let (engine, verifier, _gateway) = test_engine(false);
    verifier.register("alice-token", "alice");

    let (alice_conn, _alice_rx) = connect(&engine, "alice-token").await;
    engine.sessions.disconnect(alice_conn.id);

    // Must not panic or resurrect any state.
    engine
        .sessions
        .handle_event(
            alice_conn.id,
            InboundEvent::Typing {
                channel_id: GroupId::new(),
                is_typing: true,
            },
        )
        .await;

    assert_eq!(engine.sessions.session_count(), 0);
    assert!(engine.typing.typing_in(GroupId::new()).is_empty());
}

#[tokio::test]
async fn test_event_for_unregistered_connection_creates_no_state() {
    let (engine, verifier, _gateway) = test_engine(false);
    verifier.register("alice-token", "alice");
    let (_alice_conn, mut alice_rx) = connect(&engine, "alice-token").await;
    drain(&mut alice_rx);

    // A session either exists and is Active, or does not exist at all;
    // an event for an id the controller never issued must be rejected
    // without touching any registry.
    let channel = GroupId::new();
    engine
        .sessions
        .handle_event(
            ConnectionId::new(),
            InboundEvent::Typing {
                channel_id: channel,
                is_typing: true,
            },
        )
        .await;

    assert_eq!(engine.sessions.session_count(), 1);
    assert!(engine.typing.typing_in(channel).is_empty());
    assert!(drain(&mut alice_rx).is_empty());
}

#[tokio::test]
async fn test_shutdown_closes_all_connections() {
    let (engine, verifier, _gateway) = test_engine(false);
    let alice = verifier.register("alice-token", "alice");
    verifier.register("bob-token", "bob");

    let (_a, _arx) = connect(&engine, "alice-token").await;
    let (_b, _brx) = connect(&engine, "bob-token").await;

    engine.shutdown();

    assert_eq!(engine.connections.connection_count(), 0);
    assert!(!engine.connections.is_online(alice.id));
}
