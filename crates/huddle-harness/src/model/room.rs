//! Reference model of a joined room.

use std::collections::{BTreeMap, BTreeSet};

use huddle_core::{MediaDefaults, OccupancyMode};

use super::operation::{ModelParticipant, ModelTrack, Operation, OperationResult};

/// Observable state for oracle comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservableState {
    /// Participants present, local included.
    pub participant_count: usize,
    /// Focused `(participant, track)`, if any.
    pub focus: Option<(ModelParticipant, ModelTrack)>,
    /// Flags local tracks were published with.
    pub published: Option<MediaDefaults>,
    /// Defaults for the current count.
    pub media_defaults: MediaDefaults,
}

/// Obviously-correct room: sets and maps, no ordering concerns.
#[derive(Debug, Clone)]
pub struct ModelRoom {
    mode: OccupancyMode,
    participants: BTreeSet<ModelParticipant>,
    /// `(participant, track)` to "is a screen share".
    tracks: BTreeMap<(ModelParticipant, ModelTrack), bool>,
    focus: Option<(ModelParticipant, ModelTrack)>,
    published: Option<MediaDefaults>,
}

impl ModelRoom {
    /// Room just joined by participant 0 with `remote` already present.
    pub fn new(mode: OccupancyMode, remote: &[ModelParticipant]) -> Self {
        let mut participants: BTreeSet<_> = remote.iter().copied().collect();
        participants.insert(0);
        Self { mode, participants, tracks: BTreeMap::new(), focus: None, published: None }
    }

    /// Whether `(participant, track)` is a screen share. Unknown tracks are
    /// cameras.
    pub fn is_screen(&self, participant: ModelParticipant, track: ModelTrack) -> bool {
        self.tracks.get(&(participant, track)).copied().unwrap_or(false)
    }

    /// Apply an operation.
    pub fn apply(&mut self, op: &Operation) -> OperationResult {
        let result = match *op {
            Operation::Join { participant } => self.join(participant),
            Operation::Leave { participant } => {
                if !self.participants.remove(&participant) {
                    return OperationResult::Ignored;
                }
                self.tracks.retain(|(p, _), _| *p != participant);
                if self.focus.is_some_and(|(p, _)| p == participant) {
                    self.focus = None;
                }
                OperationResult::Ok
            },
            Operation::Publish { participant, track, screen } => {
                self.join(participant);
                self.tracks.insert((participant, track), screen);
                OperationResult::Ok
            },
            Operation::Unpublish { participant, track } => {
                if self.focus == Some((participant, track)) {
                    self.focus = None;
                }
                match self.tracks.remove(&(participant, track)) {
                    Some(_) => OperationResult::Ok,
                    None => OperationResult::Ignored,
                }
            },
            Operation::ClickTrack { participant, track } => {
                if self.tracks.contains_key(&(participant, track)) {
                    self.focus = Some((participant, track));
                    OperationResult::Ok
                } else {
                    OperationResult::Ignored
                }
            },
            Operation::ClickPlaceholder => OperationResult::Ignored,
            Operation::Dismiss => match self.focus.take() {
                Some(_) => OperationResult::Ok,
                None => OperationResult::Ignored,
            },
            Operation::LocalMediaReady => {
                if self.published.is_some() {
                    return OperationResult::Ignored;
                }
                self.published = Some(self.media_defaults());
                OperationResult::Ok
            },
        };

        if self.mode == OccupancyMode::Live && self.published.is_some() {
            self.published = Some(self.media_defaults());
        }
        result
    }

    fn join(&mut self, participant: ModelParticipant) -> OperationResult {
        if self.participants.insert(participant) { OperationResult::Ok } else { OperationResult::Ignored }
    }

    fn media_defaults(&self) -> MediaDefaults {
        MediaDefaults::for_count(self.participants.len())
    }

    /// Extract observable state for comparison.
    pub fn observable_state(&self) -> ObservableState {
        ObservableState {
            participant_count: self.participants.len(),
            focus: self.focus,
            published: self.published,
            media_defaults: self.media_defaults(),
        }
    }
}
