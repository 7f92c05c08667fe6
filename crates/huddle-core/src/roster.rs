//! Mirror of room membership and publications.
//!
//! Built purely from transport events. Drives the participant count seen by
//! the occupancy policy, the grid tiles, and focus invalidation.
//!
//! Order is join order with the local participant first, which is the order
//! tiles are laid out in.

use crate::track::{ParticipantId, Publication, TrackRef, TrackSid, TrackSource};

/// One grid cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    /// Owner of the tile.
    pub participant: ParticipantId,
    /// Track origin.
    pub source: TrackSource,
    /// Publication shown, or `None` for a camera placeholder.
    pub publication: Option<TrackSid>,
}

impl Tile {
    /// Whether this tile stands in for an unpublished camera.
    pub fn is_placeholder(&self) -> bool {
        self.publication.is_none()
    }

    /// Track carried by this tile, if any.
    ///
    /// This is what a tile click reports; placeholders report nothing.
    pub fn track_ref(&self) -> Option<TrackRef> {
        self.publication.as_ref().map(|sid| TrackRef {
            participant: self.participant.clone(),
            publication: sid.clone(),
            source: self.source,
        })
    }
}

#[derive(Debug, Clone)]
struct Member {
    id: ParticipantId,
    publications: Vec<Publication>,
}

/// Participants present in the room and what they publish.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    members: Vec<Member>,
}

impl Roster {
    /// Create an empty roster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the roster with a fresh snapshot.
    pub fn reset(&mut self, local: ParticipantId, remote: Vec<ParticipantId>) {
        self.members.clear();
        self.join(local);
        for participant in remote {
            self.join(participant);
        }
    }

    /// Drop everyone.
    pub fn clear(&mut self) {
        self.members.clear();
    }

    /// Number of participants, local included.
    pub fn count(&self) -> usize {
        self.members.len()
    }

    /// Whether `participant` is present.
    pub fn contains(&self, participant: &ParticipantId) -> bool {
        self.members.iter().any(|m| &m.id == participant)
    }

    /// Add a participant. Returns `false` if already present.
    pub fn join(&mut self, participant: ParticipantId) -> bool {
        if self.contains(&participant) {
            return false;
        }
        self.members.push(Member { id: participant, publications: Vec::new() });
        true
    }

    /// Remove a participant and everything they publish.
    pub fn leave(&mut self, participant: &ParticipantId) -> bool {
        let before = self.members.len();
        self.members.retain(|m| &m.id != participant);
        self.members.len() != before
    }

    /// Record a publication. Unknown participants are added first, since
    /// transports may report a track before the join.
    ///
    /// Republishing an existing `sid` replaces it.
    pub fn publish(&mut self, participant: ParticipantId, publication: Publication) {
        self.join(participant.clone());
        if let Some(member) = self.members.iter_mut().find(|m| m.id == participant) {
            member.publications.retain(|p| p.sid != publication.sid);
            member.publications.push(publication);
        }
    }

    /// Remove a publication. Returns `false` if it was not known.
    pub fn unpublish(&mut self, participant: &ParticipantId, sid: &TrackSid) -> bool {
        self.members.iter_mut().find(|m| &m.id == participant).is_some_and(|member| {
            let before = member.publications.len();
            member.publications.retain(|p| &p.sid != sid);
            member.publications.len() != before
        })
    }

    /// Whether `track` still refers to a live publication.
    pub fn contains_track(&self, track: &TrackRef) -> bool {
        self.members
            .iter()
            .find(|m| m.id == track.participant)
            .is_some_and(|m| m.publications.iter().any(|p| p.sid == track.publication))
    }

    /// Grid tiles: per participant, camera tiles (a placeholder when no camera
    /// is published) followed by published screen shares.
    pub fn tiles(&self) -> Vec<Tile> {
        let mut tiles = Vec::new();

        for member in &self.members {
            let tile = |p: &Publication| Tile {
                participant: member.id.clone(),
                source: p.source,
                publication: Some(p.sid.clone()),
            };

            let cameras: Vec<Tile> = member
                .publications
                .iter()
                .filter(|p| p.source == TrackSource::Camera)
                .map(tile)
                .collect();

            if cameras.is_empty() {
                tiles.push(Tile {
                    participant: member.id.clone(),
                    source: TrackSource::Camera,
                    publication: None,
                });
            } else {
                tiles.extend(cameras);
            }

            tiles.extend(
                member
                    .publications
                    .iter()
                    .filter(|p| p.source == TrackSource::ScreenShare)
                    .map(tile),
            );
        }

        tiles
    }
}
