//! Session events and actions.
//!
//! Events are everything that can happen to a session: UI input, credential
//! responses, transport notifications. Actions are everything the caller must
//! do in response. The controller itself performs no I/O.

use std::time::Duration;

use crate::{
    credential::{Credential, CredentialRequest},
    identity::Identity,
    occupancy::MediaDefaults,
    track::{ParticipantId, Publication, TrackRef, TrackSid},
};

/// Input to [`crate::SessionController::handle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The session surface appeared. Reads the stored identity.
    Mounted,

    /// The name field changed.
    NameInput {
        /// Raw field contents.
        value: String,
    },

    /// The name form was submitted.
    SubmitName,

    /// The user tried to close the name dialog without submitting.
    DismissEntry,

    /// The user asked to change their name.
    EditIdentity,

    /// Token endpoint answered.
    CredentialIssued {
        /// Generation from the originating request.
        generation: u64,
        /// Issued token.
        token: String,
    },

    /// Token exchange failed.
    CredentialFailed {
        /// Generation from the originating request.
        generation: u64,
        /// Human-readable failure.
        reason: String,
    },

    /// A scheduled retry delay elapsed.
    RetryCredential {
        /// Generation the retry was scheduled for.
        generation: u64,
    },

    /// Something happened on a room connection.
    ///
    /// Events from a connection other than the current one are dropped.
    Room {
        /// Connection the event came from, as given in [`ConnectParams`].
        connection: u64,
        /// What happened.
        event: RoomEvent,
    },

    /// A grid tile was clicked. Placeholders report `None`.
    TileClicked {
        /// Track on the clicked tile.
        track: Option<TrackRef>,
    },

    /// The focus overlay was closed (close button or click outside).
    FocusDismissed,

    /// The session surface is going away.
    Shutdown,
}

/// Transport notification for one room connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEvent {
    /// Transport joined the room.
    Connected {
        /// Our own participant.
        local: ParticipantId,
        /// Participants already present.
        remote: Vec<ParticipantId>,
    },

    /// Someone joined.
    ParticipantJoined {
        /// The new participant.
        participant: ParticipantId,
    },

    /// Someone left.
    ParticipantLeft {
        /// The departed participant.
        participant: ParticipantId,
    },

    /// A track was published.
    TrackPublished {
        /// Publisher.
        participant: ParticipantId,
        /// The publication.
        publication: Publication,
    },

    /// A track was unpublished.
    TrackUnpublished {
        /// Publisher.
        participant: ParticipantId,
        /// The removed publication.
        sid: TrackSid,
    },

    /// Local devices are ready and local tracks can be published.
    ///
    /// May arrive before [`RoomEvent::Connected`]; publishing then waits for
    /// the room snapshot.
    LocalMediaReady,

    /// The transport could not join. The room is never entered.
    ConnectFailed {
        /// Transport error text.
        reason: String,
    },

    /// Transport lost or closed the room connection.
    Disconnected {
        /// Why the connection ended.
        reason: String,
    },
}

impl RoomEvent {
    /// Short name for log lines.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "room connected",
            Self::ParticipantJoined { .. } => "participant joined",
            Self::ParticipantLeft { .. } => "participant left",
            Self::TrackPublished { .. } => "track published",
            Self::TrackUnpublished { .. } => "track unpublished",
            Self::LocalMediaReady => "local media ready",
            Self::ConnectFailed { .. } => "connect failed",
            Self::Disconnected { .. } => "room disconnected",
        }
    }
}

/// Parameters the transport needs to join the room.
///
/// Local tracks are not published on connect; the publish flags follow in
/// [`SessionAction::PublishLocalTracks`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectParams {
    /// Tag to put on every [`RoomEvent`] from this connection.
    pub connection: u64,
    /// Media server URL.
    pub server_url: String,
    /// Identity the credential was issued for.
    pub identity: Identity,
    /// Join token.
    pub credential: Credential,
}

/// Log severity for [`SessionAction::Log`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Ignored or stale input.
    Debug,
    /// Lifecycle transitions.
    Info,
    /// Recoverable oddities.
    Warn,
    /// Failures the user will notice.
    Error,
}

/// Output of [`crate::SessionController::handle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Perform a credential exchange and report back with the same generation.
    RequestCredential(CredentialRequest),

    /// Abandon the exchange for `generation`; its result will be ignored.
    CancelCredentialRequest {
        /// Generation to abandon.
        generation: u64,
    },

    /// Sleep, then send [`SessionEvent::RetryCredential`].
    ScheduleCredentialRetry {
        /// Generation to retry.
        generation: u64,
        /// How long to wait.
        delay: Duration,
    },

    /// Join the room.
    Connect(ConnectParams),

    /// Start publishing local tracks with these flags.
    PublishLocalTracks(MediaDefaults),

    /// Change already-published local tracks.
    UpdateLocalTracks(MediaDefaults),

    /// Leave the room.
    Disconnect {
        /// Why.
        reason: String,
    },

    /// Emit a log line.
    Log {
        /// Severity.
        level: LogLevel,
        /// Message text.
        message: String,
    },
}

impl SessionAction {
    pub(crate) fn debug(message: impl Into<String>) -> Self {
        Self::Log { level: LogLevel::Debug, message: message.into() }
    }

    pub(crate) fn info(message: impl Into<String>) -> Self {
        Self::Log { level: LogLevel::Info, message: message.into() }
    }

    pub(crate) fn error(message: impl Into<String>) -> Self {
        Self::Log { level: LogLevel::Error, message: message.into() }
    }
}
