//! Occupancy-based media defaults.
//!
//! Someone alone in the room is probably checking their camera and mic, so
//! both start on. Joining an occupied room starts muted with the camera off.
//!
//! The default is recomputed on every participant-count change. What happens
//! once local tracks are published depends on [`OccupancyMode`].

/// Initial publish state for local tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaDefaults {
    /// Publish the microphone.
    pub audio: bool,
    /// Publish the camera.
    pub video: bool,
}

impl MediaDefaults {
    /// Both tracks on.
    pub const ON: Self = Self { audio: true, video: true };

    /// Both tracks off.
    pub const OFF: Self = Self { audio: false, video: false };

    /// Apply the occupancy rule to `participant_count` (local included).
    pub fn for_count(participant_count: usize) -> Self {
        if participant_count <= 1 { Self::ON } else { Self::OFF }
    }
}

/// Whether defaults keep driving local tracks after the first publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OccupancyMode {
    /// Read once when local tracks begin publishing, then frozen.
    #[default]
    FreezeOnPublish,

    /// Every flip after publishing is pushed to the local tracks.
    Live,
}

/// Tracks participant count and the resulting defaults.
#[derive(Debug, Clone)]
pub struct OccupancyPolicy {
    mode: OccupancyMode,
    participant_count: usize,
    current: MediaDefaults,
    published: Option<MediaDefaults>,
}

impl OccupancyPolicy {
    /// Create a policy with nobody observed yet.
    pub fn new(mode: OccupancyMode) -> Self {
        Self {
            mode,
            participant_count: 0,
            current: MediaDefaults::for_count(0),
            published: None,
        }
    }

    /// Configured mode.
    pub fn mode(&self) -> OccupancyMode {
        self.mode
    }

    /// Last observed participant count.
    pub fn participant_count(&self) -> usize {
        self.participant_count
    }

    /// Most recent recomputed default.
    pub fn current(&self) -> MediaDefaults {
        self.current
    }

    /// Value local tracks were published with, once they have been.
    pub fn published(&self) -> Option<MediaDefaults> {
        self.published
    }

    /// Feed a new participant count.
    ///
    /// Returns the defaults to push to already-published local tracks, which
    /// only happens in [`OccupancyMode::Live`] when the value flips.
    pub fn observe(&mut self, participant_count: usize) -> Option<MediaDefaults> {
        self.participant_count = participant_count;
        let next = MediaDefaults::for_count(participant_count);
        let changed = next != self.current;
        self.current = next;

        match (self.mode, self.published) {
            (OccupancyMode::Live, Some(published)) if changed && published != next => {
                self.published = Some(next);
                Some(next)
            },
            _ => None,
        }
    }

    /// Local tracks begin publishing now. Returns the value to publish with.
    ///
    /// A second call returns the value already published.
    pub fn publish(&mut self) -> MediaDefaults {
        *self.published.get_or_insert(self.current)
    }

    /// Forget everything, ready for a new session.
    pub fn reset(&mut self) {
        *self = Self::new(self.mode);
    }
}
