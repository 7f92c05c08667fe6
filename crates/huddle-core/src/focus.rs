//! Track focus: which track is shown enlarged in the overlay.
//!
//! The overlay has no state of its own. It is open exactly when the
//! coordinator is [`FocusState::Focused`], so the two can never disagree.

use crate::track::{ParticipantId, TrackRef, TrackSid};

/// Selected track, or none.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FocusState {
    /// Nothing selected, overlay closed.
    #[default]
    Idle,
    /// Track shown in the overlay.
    Focused(TrackRef),
}

/// Reduces tile clicks, dismissals and track removals to a [`FocusState`].
#[derive(Debug, Clone, Default)]
pub struct FocusCoordinator {
    state: FocusState,
}

impl FocusCoordinator {
    /// Start idle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub fn state(&self) -> &FocusState {
        &self.state
    }

    /// Track in the overlay, if any.
    pub fn selected(&self) -> Option<&TrackRef> {
        match &self.state {
            FocusState::Idle => None,
            FocusState::Focused(track) => Some(track),
        }
    }

    /// Overlay visibility.
    pub fn is_overlay_open(&self) -> bool {
        self.selected().is_some()
    }

    /// A tile was clicked. Placeholders carry no track and change nothing.
    ///
    /// Returns `true` if the selection changed.
    pub fn click(&mut self, track: Option<TrackRef>) -> bool {
        let Some(track) = track else {
            return false;
        };
        if self.selected() == Some(&track) {
            return false;
        }
        self.state = FocusState::Focused(track);
        true
    }

    /// The overlay was closed. Returns `true` if something was selected.
    pub fn dismiss(&mut self) -> bool {
        !matches!(std::mem::take(&mut self.state), FocusState::Idle)
    }

    /// A publication went away. Clears the selection if it was the one shown.
    pub fn track_removed(&mut self, participant: &ParticipantId, sid: &TrackSid) -> bool {
        let stale = self
            .selected()
            .is_some_and(|track| &track.participant == participant && &track.publication == sid);
        if stale {
            self.state = FocusState::Idle;
        }
        stale
    }

    /// A participant left. Clears the selection if it was one of theirs.
    pub fn participant_removed(&mut self, participant: &ParticipantId) -> bool {
        let stale = self.selected().is_some_and(|track| &track.participant == participant);
        if stale {
            self.state = FocusState::Idle;
        }
        stale
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::{Publication, TrackSource};

    fn track(participant: &str, sid: &str) -> TrackRef {
        TrackRef::new(ParticipantId::new(participant), &Publication::new(sid, TrackSource::Camera))
    }

    #[test]
    fn starts_idle_with_overlay_closed() {
        let focus = FocusCoordinator::new();
        assert_eq!(focus.state(), &FocusState::Idle);
        assert!(!focus.is_overlay_open());
    }

    #[test]
    fn click_focuses_and_opens_overlay() {
        let mut focus = FocusCoordinator::new();
        assert!(focus.click(Some(track("a", "TR_1"))));
        assert!(focus.is_overlay_open());
        assert_eq!(focus.selected(), Some(&track("a", "TR_1")));
    }

    #[test]
    fn placeholder_click_is_ignored() {
        let mut focus = FocusCoordinator::new();
        assert!(!focus.click(None));
        assert!(!focus.is_overlay_open());

        focus.click(Some(track("a", "TR_1")));
        assert!(!focus.click(None));
        assert_eq!(focus.selected(), Some(&track("a", "TR_1")));
    }

    #[test]
    fn new_click_replaces_selection() {
        let mut focus = FocusCoordinator::new();
        focus.click(Some(track("a", "TR_1")));
        assert!(focus.click(Some(track("b", "TR_2"))));
        assert!(focus.is_overlay_open());
        assert_eq!(focus.selected(), Some(&track("b", "TR_2")));
    }

    #[test]
    fn dismiss_returns_to_idle() {
        let mut focus = FocusCoordinator::new();
        focus.click(Some(track("a", "TR_1")));
        assert!(focus.dismiss());
        assert!(!focus.is_overlay_open());
        assert!(!focus.dismiss());
    }

    #[test]
    fn removing_selected_track_clears_focus() {
        let mut focus = FocusCoordinator::new();
        focus.click(Some(track("a", "TR_1")));

        assert!(!focus.track_removed(&ParticipantId::new("a"), &TrackSid::new("TR_other")));
        assert!(focus.is_overlay_open());

        assert!(focus.track_removed(&ParticipantId::new("a"), &TrackSid::new("TR_1")));
        assert!(!focus.is_overlay_open());
    }

    #[test]
    fn participant_leaving_clears_their_focus_only() {
        let mut focus = FocusCoordinator::new();
        focus.click(Some(track("a", "TR_1")));

        assert!(!focus.participant_removed(&ParticipantId::new("b")));
        assert!(focus.participant_removed(&ParticipantId::new("a")));
        assert_eq!(focus.state(), &FocusState::Idle);
    }
}
