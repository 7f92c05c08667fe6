//! Fuzz target for the [`SessionController`] state machine
//!
//! Prevent joining a room with a credential that no longer matches the
//! identity on screen.
//!
//! # Strategy
//!
//! - Event sequences: Arbitrary name edits, submissions, credential answers
//!   for current and superseded generations, room activity and teardown
//! - Timing: Advance time to fire scheduled credential retries
//! - Ordering: Device readiness before the room snapshot, late events from
//!   connections a rename already replaced, connect failures
//! - State probing: Room events before connect, double mounts, edits while
//!   loading
//!
//! # Invariants
//!
//! - `Connect` only carries the identity the controller currently holds
//! - A rendered identity always splits back into its base name
//! - No transition FROM `Ended` (terminal invariant)
//! - The focused track is always still published
//! - Local tracks are published at most once per connection in frozen mode
//! - Published flags match the room count at the moment of publish
//! - Events tagged with a replaced connection change nothing
//! - NEVER a fatal error after mount

#![no_main]

use std::time::Duration;

use arbitrary::Arbitrary;
use huddle_core::{
    CredentialRetry, Identity, MediaDefaults, MemoryIdentityStore, RoomEvent, SessionConfig, SessionEvent, View,
};
use huddle_harness::{IdMap, Operation, SimWorld};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Clone, Arbitrary)]
enum FuzzEvent {
    NameInput(String),
    SubmitName,
    DismissEntry,
    EditIdentity,
    Issue { generation_back: u8, empty: bool },
    Fail { generation_back: u8 },
    ConnectRoom { remote: u8 },
    Room(Operation),
    StaleRoom { op: Operation, back: u8 },
    ConnectFailed,
    Advance { millis: u16 },
    Disconnect,
    Shutdown,
    Remount,
}

/// Fuzz input with deterministic seed for identity suffixes.
#[derive(Debug, Clone, Arbitrary)]
struct FuzzInput {
    seed: u64,
    stored_identity: Option<String>,
    retry: bool,
    events: Vec<FuzzEvent>,
}

fuzz_target!(|input: FuzzInput| {
    let mut config = SessionConfig::new("wss://fuzz.invalid");
    if input.retry {
        config.credential_retry =
            CredentialRetry::Backoff { max_attempts: 3, initial_backoff: Duration::from_millis(10) };
    }
    let store = input
        .stored_identity
        .map_or_else(MemoryIdentityStore::new, MemoryIdentityStore::with_value);
    let mut world = SimWorld::new(input.seed, store, config);
    world.apply(SessionEvent::Mounted).expect("first mount succeeds");

    for event in input.events {
        let was_ended = world.controller().is_ended();
        let connections_before = world.connections().len();
        let published_before = world.published();

        let result = match event {
            FuzzEvent::NameInput(value) => world.apply(SessionEvent::NameInput { value }),
            FuzzEvent::SubmitName => world.apply(SessionEvent::SubmitName),
            FuzzEvent::DismissEntry => world.apply(SessionEvent::DismissEntry),
            FuzzEvent::EditIdentity => world.apply(SessionEvent::EditIdentity),
            FuzzEvent::Issue { generation_back, empty } => {
                let generation = world.controller().generation().saturating_sub(u64::from(generation_back % 3));
                let token = if empty { "" } else { "token" };
                world.issue_for(generation, token)
            },
            FuzzEvent::Fail { generation_back } => {
                let generation = world.controller().generation().saturating_sub(u64::from(generation_back % 3));
                world.apply(SessionEvent::CredentialFailed { generation, reason: "fuzz".to_string() })
            },
            FuzzEvent::ConnectRoom { remote } => {
                let remote: Vec<String> = (1..=(remote % 4)).map(|p| format!("p{p}")).collect();
                let remote: Vec<&str> = remote.iter().map(String::as_str).collect();
                world.connect_room(&remote)
            },
            FuzzEvent::Room(op) => match (world.local_participant(), world.connection()) {
                (Some(local), Some(connection)) => world.apply(IdMap::new(local, connection).event(op, false)),
                _ => Ok(()),
            },
            FuzzEvent::StaleRoom { op, back } => match (world.local_participant(), world.connection()) {
                (Some(local), Some(connection)) if op.is_room_event() => {
                    let stale = connection.saturating_sub(1 + u64::from(back % 4));
                    let before = world.view();
                    let result = world.apply(IdMap::new(local, stale).event(op, false));
                    assert_eq!(world.view(), before, "event from replaced connection {stale} changed the view");
                    result
                },
                _ => Ok(()),
            },
            FuzzEvent::ConnectFailed => world.room(RoomEvent::ConnectFailed { reason: "fuzz".to_string() }),
            FuzzEvent::Advance { millis } => world.advance(Duration::from_millis(u64::from(millis))),
            FuzzEvent::Disconnect => world.room(RoomEvent::Disconnected { reason: "fuzz".to_string() }),
            FuzzEvent::Shutdown => world.apply(SessionEvent::Shutdown),
            FuzzEvent::Remount => world.apply(SessionEvent::Mounted),
        };
        assert!(result.is_ok(), "fatal error after mount: {result:?}");

        let controller = world.controller();

        if was_ended {
            assert!(controller.is_ended(), "Transitioned FROM Ended. Ended must be terminal!");
            assert_eq!(world.connections().len(), connections_before);
        }

        if world.connections().len() > connections_before {
            let params = world.connections().last().expect("just connected");
            assert_eq!(Some(&params.identity), controller.identity(), "connected with a stale identity");
            assert_eq!(controller.credential(), Some(&params.credential));
        }

        if let Some(identity) = controller.identity() {
            let parsed = Identity::parse(&identity.rendered()).expect("rendered identity parses");
            assert_eq!(&parsed, identity);
        }

        if let Some(track) = controller.focus().selected() {
            assert!(controller.roster().contains_track(track), "focus on removed track {track}");
        }

        if let (Some(before), Some(after)) = (published_before, world.published()) {
            assert_eq!(before, after, "local tracks republished with different flags");
        }

        if let (None, Some(published)) = (published_before, world.published()) {
            let count = controller.roster().count();
            assert!(
                matches!(world.view(), View::Room(room) if room.connected),
                "published before the room snapshot"
            );
            assert_eq!(published, MediaDefaults::for_count(count), "published flags ignore the room count");
        }

        if let View::Room(room) = world.view() {
            assert_eq!(room.is_overlay_open(), controller.focus().is_overlay_open());
        }
    }
});
