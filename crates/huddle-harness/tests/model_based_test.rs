//! Model-based property tests.
//!
//! These tests generate random room activity and verify that the real
//! controller's roster, occupancy and focus match the reference model.
//!
//! # Architecture
//!
//! ```text
//! proptest generates: Vec<Operation>
//!                          │
//!           ┌──────────────┼──────────────┐
//!           ▼              ▼              ▼
//!       ModelRoom      SimWorld        Compare
//!      (reference)   (controller)   Observable state
//! ```

use huddle_core::{
    MediaDefaults, MemoryIdentityStore, OccupancyMode, ParticipantId, SessionConfig, TrackSid, View,
};
use huddle_harness::{
    IdMap, ModelRoom, Operation, SimWorld,
    model::{ModelParticipant, ModelTrack},
};
use proptest::prelude::*;

/// Real controller joined to a room, mirroring `ModelRoom`'s interface.
struct RealRoom {
    world: SimWorld,
    ids: IdMap,
}

impl RealRoom {
    fn new(seed: u64, mode: OccupancyMode, remote: &[ModelParticipant]) -> Self {
        Self::joined(seed, mode, remote, false)
    }

    /// With `early_media`, local devices report ready before the room
    /// snapshot arrives.
    fn joined(seed: u64, mode: OccupancyMode, remote: &[ModelParticipant], early_media: bool) -> Self {
        let mut config = SessionConfig::new("wss://sim.invalid");
        config.occupancy_mode = mode;
        let mut world = SimWorld::new(seed, MemoryIdentityStore::with_value("ana-k3x9q"), config);

        world.apply(huddle_core::SessionEvent::Mounted).expect("mount");
        world.issue("jwt").expect("issue");
        let local = world.local_participant().expect("connected");
        let connection = world.connection().expect("connection");
        let ids = IdMap::new(local, connection);

        if early_media {
            world.apply(ids.event(Operation::LocalMediaReady, false)).expect("media ready");
        }
        let remote: Vec<String> = remote.iter().map(|p| ids.participant(*p).to_string()).collect();
        let remote: Vec<&str> = remote.iter().map(String::as_str).collect();
        world.connect_room(&remote).expect("room connected");

        Self { world, ids }
    }

    /// Apply a room operation tagged with a connection other than the
    /// current one.
    fn apply_superseded(&mut self, op: Operation) {
        let stale = self.ids.on_connection(self.world.connection().expect("connection") + 1);
        self.world.apply(stale.event(op, false)).expect("no fatal errors");
    }

    fn apply(&mut self, op: Operation, screen: bool) {
        self.world.apply(self.ids.event(op, screen)).expect("no fatal errors");
    }

    fn focus(&self) -> Option<(ParticipantId, TrackSid)> {
        self.world
            .controller()
            .focus()
            .selected()
            .map(|track| (track.participant.clone(), track.publication.clone()))
    }

    fn participant_count(&self) -> usize {
        self.world.controller().roster().count()
    }

    fn published(&self) -> Option<MediaDefaults> {
        self.world.controller().occupancy().published()
    }

    fn media_defaults(&self) -> MediaDefaults {
        self.world.controller().occupancy().current()
    }
}

fn model_focus(ids: &IdMap, focus: Option<(ModelParticipant, ModelTrack)>) -> Option<(ParticipantId, TrackSid)> {
    focus.map(|(p, t)| (ids.participant(p), IdMap::publication(p, t, false).sid))
}

/// Strategy for generating operations over a small id space.
fn operation_strategy() -> impl Strategy<Value = Operation> {
    let participant = 0..4u8;
    let track = 0..3u8;

    prop_oneof![
        2 => participant.clone().prop_map(|participant| Operation::Join { participant }),
        1 => participant.clone().prop_map(|participant| Operation::Leave { participant }),
        4 => (participant.clone(), track.clone(), any::<bool>())
            .prop_map(|(participant, track, screen)| Operation::Publish { participant, track, screen }),
        2 => (participant.clone(), track.clone())
            .prop_map(|(participant, track)| Operation::Unpublish { participant, track }),
        4 => (participant, track).prop_map(|(participant, track)| Operation::ClickTrack { participant, track }),
        1 => Just(Operation::ClickPlaceholder),
        1 => Just(Operation::Dismiss),
        1 => Just(Operation::LocalMediaReady),
    ]
}

fn mode_strategy() -> impl Strategy<Value = OccupancyMode> {
    prop_oneof![Just(OccupancyMode::FreezeOnPublish), Just(OccupancyMode::Live)]
}

proptest! {
    /// Observable room state matches the model after every operation.
    #[test]
    fn prop_model_matches_real(
        seed in any::<u64>(),
        mode in mode_strategy(),
        remote in prop::collection::btree_set(1..4u8, 0..3),
        early_media in any::<bool>(),
        ops in prop::collection::vec(operation_strategy(), 0..60)
    ) {
        let remote: Vec<_> = remote.into_iter().collect();
        let mut model = ModelRoom::new(mode, &remote);
        if early_media {
            // Devices ready before the snapshot publish with the snapshot's count.
            model.apply(&Operation::LocalMediaReady);
        }
        let mut real = RealRoom::joined(seed, mode, &remote, early_media);
        prop_assert_eq!(real.published(), model.observable_state().published);

        for (i, op) in ops.iter().enumerate() {
            let screen = match op {
                Operation::ClickTrack { participant, track } => model.is_screen(*participant, *track),
                _ => false,
            };
            model.apply(op);
            real.apply(*op, screen);

            let expected = model.observable_state();
            prop_assert_eq!(
                real.participant_count(), expected.participant_count,
                "participant count diverged at operation {}: {:?}", i, op
            );
            prop_assert_eq!(
                real.focus(), model_focus(&real.ids, expected.focus),
                "focus diverged at operation {}: {:?}", i, op
            );
            prop_assert_eq!(
                real.published(), expected.published,
                "published flags diverged at operation {}: {:?}", i, op
            );
            prop_assert_eq!(
                real.media_defaults(), expected.media_defaults,
                "defaults diverged at operation {}: {:?}", i, op
            );
        }
    }

    /// The overlay never shows a track that is gone, and is open exactly when
    /// something is focused.
    #[test]
    fn prop_focus_never_stale(
        seed in any::<u64>(),
        ops in prop::collection::vec(operation_strategy(), 0..80)
    ) {
        let mut model = ModelRoom::new(OccupancyMode::FreezeOnPublish, &[1, 2]);
        let mut real = RealRoom::new(seed, OccupancyMode::FreezeOnPublish, &[1, 2]);

        for op in ops {
            let screen = match op {
                Operation::ClickTrack { participant, track } => model.is_screen(participant, track),
                _ => false,
            };
            model.apply(&op);
            real.apply(op, screen);

            let controller = real.world.controller();
            if let Some(track) = controller.focus().selected() {
                prop_assert!(
                    controller.roster().contains_track(track),
                    "focus {} refers to a removed track", track
                );
            }

            let View::Room(room) = real.world.view() else {
                return Err(TestCaseError::fail("left the room view"));
            };
            prop_assert_eq!(room.is_overlay_open(), controller.focus().is_overlay_open());
            prop_assert_eq!(room.focus.is_some(), room.is_overlay_open());
        }
    }

    /// Room events from a superseded connection never change what is shown.
    #[test]
    fn prop_superseded_connection_is_inert(
        seed in any::<u64>(),
        remote in prop::collection::btree_set(1..4u8, 0..3),
        setup in prop::collection::vec(operation_strategy(), 0..20),
        stale in prop::collection::vec(operation_strategy(), 0..40)
    ) {
        let remote: Vec<_> = remote.into_iter().collect();
        let mut model = ModelRoom::new(OccupancyMode::Live, &remote);
        let mut real = RealRoom::joined(seed, OccupancyMode::Live, &remote, false);

        for op in setup {
            let screen = match op {
                Operation::ClickTrack { participant, track } => model.is_screen(participant, track),
                _ => false,
            };
            model.apply(&op);
            real.apply(op, screen);
        }
        let expected = model.observable_state();
        let updates = real.world.track_updates().len();

        for op in stale.into_iter().filter(|op| op.is_room_event()) {
            real.apply_superseded(op);
        }

        prop_assert_eq!(real.participant_count(), expected.participant_count);
        prop_assert_eq!(real.focus(), model_focus(&real.ids, expected.focus));
        prop_assert_eq!(real.published(), expected.published);
        prop_assert_eq!(real.world.track_updates().len(), updates);
        prop_assert!(!real.world.controller().is_ended());
    }

    /// Local tracks are published at most once, with the defaults current at
    /// that moment, in frozen mode.
    #[test]
    fn prop_frozen_publish_is_stable(
        seed in any::<u64>(),
        ops in prop::collection::vec(operation_strategy(), 0..60)
    ) {
        let mut real = RealRoom::new(seed, OccupancyMode::FreezeOnPublish, &[]);
        let mut first_published = None;

        for op in ops {
            let before = real.media_defaults();
            real.apply(op, false);

            if let Some(published) = real.published() {
                match first_published {
                    None => {
                        prop_assert_eq!(op, Operation::LocalMediaReady);
                        prop_assert_eq!(published, before);
                        first_published = Some(published);
                    },
                    Some(first) => prop_assert_eq!(published, first),
                }
            }
        }

        prop_assert!(real.world.track_updates().is_empty());
    }
}
