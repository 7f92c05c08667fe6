//! Room operations for model-based testing.
//!
//! Participants and tracks are small integers so generated sequences hit the
//! same ids often. Participant 0 is the local participant.

use arbitrary::Arbitrary;
use huddle_core::{ParticipantId, Publication, RoomEvent, SessionEvent, TrackRef, TrackSource};

/// Participant index. `0` is local.
pub type ModelParticipant = u8;

/// Track index within a participant.
pub type ModelTrack = u8;

/// Something that can happen once the room is joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Arbitrary)]
pub enum Operation {
    /// A participant joins.
    Join {
        /// Who.
        participant: ModelParticipant,
    },

    /// A participant leaves.
    Leave {
        /// Who.
        participant: ModelParticipant,
    },

    /// A participant publishes a camera or screen-share track.
    Publish {
        /// Publisher.
        participant: ModelParticipant,
        /// Track index.
        track: ModelTrack,
        /// Screen share rather than camera.
        screen: bool,
    },

    /// A participant unpublishes a track.
    Unpublish {
        /// Publisher.
        participant: ModelParticipant,
        /// Track index.
        track: ModelTrack,
    },

    /// A tile showing this track is clicked.
    ClickTrack {
        /// Publisher.
        participant: ModelParticipant,
        /// Track index.
        track: ModelTrack,
    },

    /// A placeholder tile is clicked.
    ClickPlaceholder,

    /// The overlay is closed.
    Dismiss,

    /// Local devices are ready.
    LocalMediaReady,
}

impl Operation {
    /// Whether the operation arrives from the transport rather than the UI.
    pub fn is_room_event(self) -> bool {
        !matches!(self, Self::ClickTrack { .. } | Self::ClickPlaceholder | Self::Dismiss)
    }
}

/// Outcome of applying an operation to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationResult {
    /// State changed or the operation was accepted.
    Ok,
    /// Nothing to do.
    Ignored,
}

/// Maps model ids onto real ones.
#[derive(Debug, Clone)]
pub struct IdMap {
    local: ParticipantId,
    connection: u64,
}

impl IdMap {
    /// `local` is the id participant 0 maps to. Room events are tagged with
    /// `connection`.
    pub fn new(local: ParticipantId, connection: u64) -> Self {
        Self { local, connection }
    }

    /// Same ids, room events tagged with another connection.
    #[must_use]
    pub fn on_connection(&self, connection: u64) -> Self {
        Self { local: self.local.clone(), connection }
    }

    /// Real id for a model participant.
    pub fn participant(&self, participant: ModelParticipant) -> ParticipantId {
        if participant == 0 { self.local.clone() } else { ParticipantId::new(format!("p{participant}")) }
    }

    /// Real publication for a model track.
    pub fn publication(participant: ModelParticipant, track: ModelTrack, screen: bool) -> Publication {
        let source = if screen { TrackSource::ScreenShare } else { TrackSource::Camera };
        Publication::new(format!("TR_{participant}_{track}"), source)
    }

    /// Real track reference. `screen` only matters for display.
    pub fn track(&self, participant: ModelParticipant, track: ModelTrack, screen: bool) -> TrackRef {
        TrackRef::new(self.participant(participant), &Self::publication(participant, track, screen))
    }

    /// Session event for an operation. `screen` resolves the source of a
    /// clicked track.
    pub fn event(&self, op: Operation, screen: bool) -> SessionEvent {
        let event = match op {
            Operation::Join { participant } => {
                RoomEvent::ParticipantJoined { participant: self.participant(participant) }
            },
            Operation::Leave { participant } => {
                RoomEvent::ParticipantLeft { participant: self.participant(participant) }
            },
            Operation::Publish { participant, track, screen } => RoomEvent::TrackPublished {
                participant: self.participant(participant),
                publication: Self::publication(participant, track, screen),
            },
            Operation::Unpublish { participant, track } => RoomEvent::TrackUnpublished {
                participant: self.participant(participant),
                sid: Self::publication(participant, track, false).sid,
            },
            Operation::LocalMediaReady => RoomEvent::LocalMediaReady,
            Operation::ClickTrack { participant, track } => {
                return SessionEvent::TileClicked { track: Some(self.track(participant, track, screen)) };
            },
            Operation::ClickPlaceholder => return SessionEvent::TileClicked { track: None },
            Operation::Dismiss => return SessionEvent::FocusDismissed,
        };
        SessionEvent::Room { connection: self.connection, event }
    }
}
