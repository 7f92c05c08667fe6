//! Render model for the session surface.
//!
//! A [`View`] is derived from controller state on demand. Front-ends draw it
//! and never keep their own copy of dialog, loading or overlay flags.

use crate::{
    identity::Identity,
    occupancy::MediaDefaults,
    roster::Tile,
    track::TrackRef,
};

/// What the session surface shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    /// Not mounted yet.
    Blank,
    /// Name dialog.
    IdentityEntry(EntryDialog),
    /// Waiting for a credential.
    Loading,
    /// Live grid.
    Room(RoomView),
    /// Session over.
    Ended {
        /// Why it ended.
        reason: String,
    },
}

/// Name dialog contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryDialog {
    /// Current field value, already normalized.
    pub draft: String,
    /// Editing an existing identity ("save") rather than entering one ("join").
    pub editing: bool,
    /// Whether closing without submitting is allowed.
    pub dismissible: bool,
    /// Whether the submit button would be accepted.
    pub can_submit: bool,
}

/// Live grid contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomView {
    /// Local identity, shown next to the edit affordance.
    pub identity: Identity,
    /// Transport has joined; before that the grid is empty.
    pub connected: bool,
    /// Grid cells.
    pub tiles: Vec<Tile>,
    /// Track in the focus overlay. The overlay is open iff this is `Some`.
    pub focus: Option<TrackRef>,
    /// Participants present, local included.
    pub participant_count: usize,
    /// Latest occupancy default.
    pub media_defaults: MediaDefaults,
    /// Flags local tracks were published with, once they have been.
    pub published: Option<MediaDefaults>,
}

impl RoomView {
    /// Overlay visibility.
    pub fn is_overlay_open(&self) -> bool {
        self.focus.is_some()
    }
}
