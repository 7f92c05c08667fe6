//! Participant and track references.
//!
//! Participants and publications are owned by the media transport. The core
//! only holds their identifiers, so a reference can outlive the thing it
//! names; [`crate::roster::Roster`] is what decides whether it is still live.

use std::fmt;

/// Room-unique participant identity (the rendered identity string).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticipantId(pub String);

impl ParticipantId {
    /// Wrap a participant identity.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Transport-assigned publication identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackSid(pub String);

impl TrackSid {
    /// Wrap a publication identifier.
    pub fn new(sid: impl Into<String>) -> Self {
        Self(sid.into())
    }
}

impl fmt::Display for TrackSid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a track comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TrackSource {
    /// Camera video.
    Camera,
    /// Microphone audio.
    Microphone,
    /// Screen-share video.
    ScreenShare,
    /// Audio captured alongside a screen share.
    ScreenShareAudio,
    /// Anything the transport could not classify.
    Unknown,
}

impl TrackSource {
    /// Whether this source gets a grid tile.
    pub fn is_tiled(self) -> bool {
        matches!(self, Self::Camera | Self::ScreenShare)
    }
}

/// A published track.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Publication {
    /// Publication identifier.
    pub sid: TrackSid,
    /// Track origin.
    pub source: TrackSource,
}

impl Publication {
    /// Create a publication.
    pub fn new(sid: impl Into<String>, source: TrackSource) -> Self {
        Self { sid: TrackSid::new(sid), source }
    }
}

/// Fully qualified reference to one participant's publication.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackRef {
    /// Owner of the track.
    pub participant: ParticipantId,
    /// The publication.
    pub publication: TrackSid,
    /// Track origin.
    pub source: TrackSource,
}

impl TrackRef {
    /// Reference `publication` as published by `participant`.
    pub fn new(participant: ParticipantId, publication: &Publication) -> Self {
        Self { participant, publication: publication.sid.clone(), source: publication.source }
    }
}

impl fmt::Display for TrackRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({:?})", self.participant, self.publication, self.source)
    }
}
