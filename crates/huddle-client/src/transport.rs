//! Media transport boundary.
//!
//! The media SDK sits behind [`MediaTransport`]. It receives the join
//! parameters and reports room activity back as [`RoomEvent`]s through a
//! [`RoomHandle`] bound to that one connection.

use async_trait::async_trait;
use huddle_core::{ConnectParams, MediaDefaults, ParticipantId, Publication, RoomEvent, SessionEvent, TrackSource};
use tokio::sync::mpsc;

use crate::error::TransportError;

/// Sends events into a running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl SessionHandle {
    pub(crate) fn new(tx: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self { tx }
    }

    /// Queue an event. Returns `false` once the session driver is gone.
    pub fn send(&self, event: SessionEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

/// Sends events from one room connection into a running session.
///
/// Every event is tagged with the connection it was created for, so a
/// connection torn down by a rename cannot touch the next one.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    connection: u64,
    session: SessionHandle,
}

impl RoomHandle {
    pub(crate) fn new(connection: u64, session: SessionHandle) -> Self {
        Self { connection, session }
    }

    /// Connection tag.
    pub fn connection(&self) -> u64 {
        self.connection
    }

    /// Queue a room event. Returns `false` once the session driver is gone.
    pub fn send(&self, event: RoomEvent) -> bool {
        self.session.send(SessionEvent::Room { connection: self.connection, event })
    }
}

/// Room connection owned by a media SDK.
#[async_trait]
pub trait MediaTransport: Send + 'static {
    /// Join the room. Room activity is reported through `events`.
    ///
    /// `Ok` means the join is under way. [`RoomEvent::Connected`] follows once
    /// the room snapshot is in.
    async fn connect(&mut self, params: ConnectParams, events: RoomHandle) -> Result<(), TransportError>;

    /// Start publishing local tracks.
    async fn publish(&mut self, defaults: MediaDefaults) -> Result<(), TransportError>;

    /// Change already-published local tracks.
    async fn update(&mut self, defaults: MediaDefaults) -> Result<(), TransportError>;

    /// Leave the room.
    async fn disconnect(&mut self, reason: &str) -> Result<(), TransportError>;
}

/// Dry-run transport that joins an empty room and logs every call.
///
/// Used by the `huddle` binary until a media SDK is wired in.
#[derive(Debug, Default)]
pub struct LogTransport {
    room: Option<(ParticipantId, RoomHandle)>,
}

impl LogTransport {
    /// Create a disconnected transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MediaTransport for LogTransport {
    async fn connect(&mut self, params: ConnectParams, events: RoomHandle) -> Result<(), TransportError> {
        tracing::info!("connecting to {} as {} (connection {})", params.server_url, params.identity, params.connection);

        let local = ParticipantId::new(params.identity.rendered());
        events.send(RoomEvent::Connected { local: local.clone(), remote: vec![] });
        events.send(RoomEvent::LocalMediaReady);
        self.room = Some((local, events));
        Ok(())
    }

    async fn publish(&mut self, defaults: MediaDefaults) -> Result<(), TransportError> {
        let Some((local, events)) = &self.room else {
            return Err(TransportError("publish before connect".to_string()));
        };
        tracing::info!("publishing local tracks (audio: {}, video: {})", defaults.audio, defaults.video);

        if defaults.video {
            events.send(RoomEvent::TrackPublished {
                participant: local.clone(),
                publication: Publication::new("local-camera", TrackSource::Camera),
            });
        }
        if defaults.audio {
            events.send(RoomEvent::TrackPublished {
                participant: local.clone(),
                publication: Publication::new("local-microphone", TrackSource::Microphone),
            });
        }
        Ok(())
    }

    async fn update(&mut self, defaults: MediaDefaults) -> Result<(), TransportError> {
        tracing::info!("local tracks now audio: {}, video: {}", defaults.audio, defaults.video);
        Ok(())
    }

    async fn disconnect(&mut self, reason: &str) -> Result<(), TransportError> {
        if self.room.take().is_some() {
            tracing::info!("leaving room: {}", reason);
        }
        Ok(())
    }
}
