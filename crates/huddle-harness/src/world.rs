//! Simulated surroundings for a real session controller.
//!
//! `SimWorld` plays the roles of the token endpoint and media transport. It
//! executes controller actions by recording them, and lets tests decide when
//! and how each outstanding credential request is answered.

use std::time::{Duration, Instant};

use huddle_core::{
    ConnectParams, CredentialRequest, Environment, LogLevel, MediaDefaults, MemoryIdentityStore, ParticipantId,
    RoomEvent, SessionAction, SessionConfig, SessionController, SessionError, SessionEvent, View,
};

use crate::sim_env::SimEnv;

/// Controller type driven by the harness.
pub type SimController = SessionController<SimEnv, MemoryIdentityStore>;

/// A real controller plus recorded side effects.
pub struct SimWorld {
    env: SimEnv,
    controller: SimController,
    /// Requests in issue order. Cancelled ones stay answerable, modelling a
    /// response already on the wire.
    requests: Vec<CredentialRequest>,
    cancelled: Vec<u64>,
    retries: Vec<(u64, Instant)>,
    connections: Vec<ConnectParams>,
    connected: bool,
    published: Option<MediaDefaults>,
    track_updates: Vec<MediaDefaults>,
    disconnects: Vec<String>,
    logs: Vec<(LogLevel, String)>,
    rejected: Vec<SessionError>,
}

impl SimWorld {
    /// Create an unmounted world.
    pub fn new(seed: u64, store: MemoryIdentityStore, config: SessionConfig) -> Self {
        let env = SimEnv::with_seed(seed);
        let controller = SessionController::new(env.clone(), store, config);

        Self {
            env,
            controller,
            requests: Vec::new(),
            cancelled: Vec::new(),
            retries: Vec::new(),
            connections: Vec::new(),
            connected: false,
            published: None,
            track_updates: Vec::new(),
            disconnects: Vec::new(),
            logs: Vec::new(),
            rejected: Vec::new(),
        }
    }

    /// The controller under test.
    pub fn controller(&self) -> &SimController {
        &self.controller
    }

    /// Simulation environment.
    pub fn env(&self) -> &SimEnv {
        &self.env
    }

    /// Current render model.
    pub fn view(&self) -> View {
        self.controller.view()
    }

    /// Feed an event and execute the resulting actions.
    ///
    /// Non-fatal rejections are recorded and return `Ok`, as a driver would
    /// treat them.
    ///
    /// # Errors
    ///
    /// Fatal [`SessionError`]s.
    pub fn apply(&mut self, event: SessionEvent) -> Result<(), SessionError> {
        let ends_link = matches!(
            &event,
            SessionEvent::Room { connection, event: RoomEvent::Disconnected { .. } | RoomEvent::ConnectFailed { .. } }
                if self.connection() == Some(*connection)
        );
        if ends_link {
            self.connected = false;
            self.published = None;
        }

        match self.controller.handle(event) {
            Ok(actions) => {
                self.execute(actions);
                Ok(())
            },
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                self.rejected.push(e);
                Ok(())
            },
        }
    }

    fn execute(&mut self, actions: Vec<SessionAction>) {
        for action in actions {
            match action {
                SessionAction::RequestCredential(request) => self.requests.push(request),
                SessionAction::CancelCredentialRequest { generation } => self.cancelled.push(generation),
                SessionAction::ScheduleCredentialRetry { generation, delay } => {
                    self.retries.push((generation, self.env.now() + delay));
                },
                SessionAction::Connect(params) => {
                    self.connections.push(params);
                    self.connected = true;
                },
                SessionAction::PublishLocalTracks(defaults) => self.published = Some(defaults),
                SessionAction::UpdateLocalTracks(defaults) => self.track_updates.push(defaults),
                SessionAction::Disconnect { reason } => {
                    self.connected = false;
                    self.published = None;
                    self.disconnects.push(reason);
                },
                SessionAction::Log { level, message } => self.logs.push((level, message)),
            }
        }
    }

    /// Every credential request seen, oldest first.
    pub fn requests(&self) -> &[CredentialRequest] {
        &self.requests
    }

    /// Most recent credential request.
    pub fn last_request(&self) -> Option<&CredentialRequest> {
        self.requests.last()
    }

    /// Generations the controller asked to cancel.
    pub fn cancelled(&self) -> &[u64] {
        &self.cancelled
    }

    /// Answer the latest request with `token`.
    ///
    /// # Errors
    ///
    /// Fatal [`SessionError`]s. Does nothing if no request was made.
    pub fn issue(&mut self, token: &str) -> Result<(), SessionError> {
        match self.last_request().map(|r| r.generation) {
            Some(generation) => self.issue_for(generation, token),
            None => Ok(()),
        }
    }

    /// Answer the request for `generation` with `token`, stale or not.
    ///
    /// # Errors
    ///
    /// Fatal [`SessionError`]s.
    pub fn issue_for(&mut self, generation: u64, token: &str) -> Result<(), SessionError> {
        self.apply(SessionEvent::CredentialIssued { generation, token: token.to_string() })
    }

    /// Fail the latest request.
    ///
    /// # Errors
    ///
    /// Fatal [`SessionError`]s. Does nothing if no request was made.
    pub fn fail(&mut self, reason: &str) -> Result<(), SessionError> {
        match self.last_request().map(|r| r.generation) {
            Some(generation) => {
                self.apply(SessionEvent::CredentialFailed { generation, reason: reason.to_string() })
            },
            None => Ok(()),
        }
    }

    /// Advance the clock and fire retries that came due, in due order.
    ///
    /// # Errors
    ///
    /// Fatal [`SessionError`]s.
    pub fn advance(&mut self, duration: Duration) -> Result<(), SessionError> {
        self.env.advance(duration);
        let now = self.env.now();

        self.retries.sort_by_key(|(_, due)| *due);
        let due: Vec<u64> =
            self.retries.iter().filter(|(_, at)| *at <= now).map(|(generation, _)| *generation).collect();
        self.retries.retain(|(_, at)| *at > now);

        for generation in due {
            self.apply(SessionEvent::RetryCredential { generation })?;
        }
        Ok(())
    }

    /// Retries scheduled but not yet fired.
    pub fn pending_retries(&self) -> usize {
        self.retries.len()
    }

    /// Tag of the latest live connection.
    pub fn connection(&self) -> Option<u64> {
        self.connections.last().filter(|_| self.connected).map(|params| params.connection)
    }

    /// Deliver `event` on the latest live connection.
    ///
    /// # Errors
    ///
    /// Fatal [`SessionError`]s. Does nothing unless `Connect` was executed.
    pub fn room(&mut self, event: RoomEvent) -> Result<(), SessionError> {
        match self.connection() {
            Some(connection) => self.room_from(connection, event),
            None => Ok(()),
        }
    }

    /// Deliver `event` tagged with `connection`, current or not.
    ///
    /// # Errors
    ///
    /// Fatal [`SessionError`]s.
    pub fn room_from(&mut self, connection: u64, event: RoomEvent) -> Result<(), SessionError> {
        self.apply(SessionEvent::Room { connection, event })
    }

    /// Report the room as joined, with `remote` already inside.
    ///
    /// # Errors
    ///
    /// Fatal [`SessionError`]s. Does nothing unless `Connect` was executed.
    pub fn connect_room(&mut self, remote: &[&str]) -> Result<(), SessionError> {
        let Some(local) = self.local_participant() else {
            return Ok(());
        };
        self.room(RoomEvent::Connected { local, remote: remote.iter().map(|p| ParticipantId::new(*p)).collect() })
    }

    /// Our participant id once connected.
    pub fn local_participant(&self) -> Option<ParticipantId> {
        self.connections
            .last()
            .filter(|_| self.connected)
            .map(|params| ParticipantId::new(params.identity.rendered()))
    }

    /// Every `Connect` executed, oldest first.
    pub fn connections(&self) -> &[ConnectParams] {
        &self.connections
    }

    /// Whether the transport is currently joined.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Flags local tracks were published with.
    pub fn published(&self) -> Option<MediaDefaults> {
        self.published
    }

    /// Live updates pushed to published tracks.
    pub fn track_updates(&self) -> &[MediaDefaults] {
        &self.track_updates
    }

    /// Reasons passed to `Disconnect`.
    pub fn disconnects(&self) -> &[String] {
        &self.disconnects
    }

    /// Log lines emitted by the controller.
    pub fn logs(&self) -> &[(LogLevel, String)] {
        &self.logs
    }

    /// Whether any log line at `level` contains `needle`.
    pub fn logged(&self, level: LogLevel, needle: &str) -> bool {
        self.logs.iter().any(|(l, message)| *l == level && message.contains(needle))
    }

    /// Events the controller rejected as not applicable.
    pub fn rejected(&self) -> &[SessionError] {
        &self.rejected
    }
}
