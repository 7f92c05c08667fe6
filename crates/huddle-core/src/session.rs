//! Session state machine.
//!
//! The `SessionController` composes the identity manager, credential broker,
//! occupancy policy, roster and focus coordinator. It takes one
//! [`SessionEvent`] at a time and returns the [`SessionAction`]s the caller
//! must perform. Pure state machine, caller handles I/O.
//!
//! # Ordering
//!
//! - Identity is resolved (loaded or submitted) before a credential is
//!   requested.
//! - A credential exists before `Connect` is emitted.
//! - Local tracks are published once both `LocalMediaReady` and the room
//!   snapshot have arrived, in either order. Media defaults are read then.
//! - Room events are tagged with the connection they came from; only the
//!   current connection is listened to.

use crate::{
    credential::{Credential, CredentialBroker, CredentialRetry, FailureOutcome},
    env::Environment,
    error::SessionError,
    event::{ConnectParams, RoomEvent, SessionAction, SessionEvent},
    focus::FocusCoordinator,
    identity::{Identity, IdentityError, IdentityManager, normalize_input},
    occupancy::{OccupancyMode, OccupancyPolicy},
    roster::Roster,
    store::IdentityStore,
    track::{ParticipantId, Publication, TrackRef, TrackSid},
    view::{EntryDialog, RoomView, View},
};

/// The single room every session joins.
pub const DEFAULT_ROOM: &str = "quickstart-room";

/// Static session parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Room to join.
    pub room: String,
    /// Media server URL handed to the transport.
    pub server_url: String,
    /// What to do when the credential exchange fails.
    pub credential_retry: CredentialRetry,
    /// Whether occupancy keeps driving local tracks after publish.
    pub occupancy_mode: OccupancyMode,
}

impl SessionConfig {
    /// Defaults for `server_url`: the quickstart room, no retry, frozen
    /// defaults.
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            room: DEFAULT_ROOM.to_string(),
            server_url: server_url.into(),
            credential_retry: CredentialRetry::Never,
            occupancy_mode: OccupancyMode::FreezeOnPublish,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Phase {
    Unmounted,
    /// No credential yet: loading, or waiting on the name dialog.
    Pending,
    /// Credential issued and `Connect` sent.
    Joined(Link),
    Ended { reason: String },
}

/// The room connection a joined session listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Link {
    connection: u64,
    /// Room snapshot received.
    connected: bool,
    /// Local devices reported ready.
    media_ready: bool,
}

#[derive(Debug, Clone)]
struct Dialog {
    draft: String,
    editing: bool,
}

/// Session state machine.
///
/// # Type Parameters
///
/// - `E`: Environment implementation for time/randomness
/// - `S`: Identity store backend
pub struct SessionController<E, S> {
    config: SessionConfig,
    env: E,
    identities: IdentityManager<E, S>,
    identity: Option<Identity>,
    dialog: Option<Dialog>,
    broker: CredentialBroker,
    occupancy: OccupancyPolicy,
    roster: Roster,
    focus: FocusCoordinator,
    phase: Phase,
}

impl<E: Environment, S: IdentityStore> SessionController<E, S> {
    /// Create an unmounted controller.
    pub fn new(env: E, store: S, config: SessionConfig) -> Self {
        Self {
            broker: CredentialBroker::new(config.room.clone(), config.credential_retry),
            occupancy: OccupancyPolicy::new(config.occupancy_mode),
            identities: IdentityManager::new(env.clone(), store),
            config,
            env,
            identity: None,
            dialog: None,
            roster: Roster::new(),
            focus: FocusCoordinator::new(),
            phase: Phase::Unmounted,
        }
    }

    /// Static configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Accepted identity, if any.
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Credential for the current identity, if issued.
    pub fn credential(&self) -> Option<&Credential> {
        self.broker.credential()
    }

    /// Current credential generation.
    pub fn generation(&self) -> u64 {
        self.broker.generation()
    }

    /// Focus coordinator.
    pub fn focus(&self) -> &FocusCoordinator {
        &self.focus
    }

    /// Occupancy policy.
    pub fn occupancy(&self) -> &OccupancyPolicy {
        &self.occupancy
    }

    /// Room roster.
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Identity store backend.
    pub fn identity_store(&self) -> &S {
        self.identities.store()
    }

    /// Tag of the connection currently listened to.
    pub fn connection(&self) -> Option<u64> {
        match &self.phase {
            Phase::Joined(link) => Some(link.connection),
            _ => None,
        }
    }

    /// Whether the session has ended.
    pub fn is_ended(&self) -> bool {
        matches!(self.phase, Phase::Ended { .. })
    }

    /// Render model for the current state.
    pub fn view(&self) -> View {
        if let Some(dialog) = &self.dialog {
            return View::IdentityEntry(EntryDialog {
                draft: dialog.draft.clone(),
                editing: dialog.editing,
                dismissible: self.dialog_dismissible(dialog),
                can_submit: !dialog.draft.trim().is_empty(),
            });
        }

        match (&self.phase, &self.identity) {
            (Phase::Unmounted, _) => View::Blank,
            (Phase::Ended { reason }, _) => View::Ended { reason: reason.clone() },
            (Phase::Joined(link), Some(identity)) => View::Room(RoomView {
                identity: identity.clone(),
                connected: link.connected,
                tiles: self.roster.tiles(),
                focus: self.focus.selected().cloned(),
                participant_count: self.roster.count(),
                media_defaults: self.occupancy.current(),
                published: self.occupancy.published(),
            }),
            (Phase::Pending | Phase::Joined(_), _) => View::Loading,
        }
    }

    /// Process an event and return resulting actions.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the event does not apply to the current
    /// state. No state is changed in that case.
    pub fn handle(&mut self, event: SessionEvent) -> Result<Vec<SessionAction>, SessionError> {
        if self.phase == Phase::Unmounted && event != SessionEvent::Mounted {
            return Err(SessionError::NotMounted);
        }
        if self.is_ended() {
            return Err(SessionError::InvalidState { reason: "session ended".to_string() });
        }

        match event {
            SessionEvent::Mounted => self.handle_mounted(),
            SessionEvent::NameInput { value } => self.handle_name_input(&value),
            SessionEvent::SubmitName => self.handle_submit_name(),
            SessionEvent::DismissEntry => Ok(self.handle_dismiss_entry()),
            SessionEvent::EditIdentity => self.handle_edit_identity(),
            SessionEvent::CredentialIssued { generation, token } => {
                Ok(self.handle_credential_issued(generation, token))
            },
            SessionEvent::CredentialFailed { generation, reason } => {
                Ok(self.handle_credential_failed(generation, &reason))
            },
            SessionEvent::RetryCredential { generation } => Ok(self.handle_retry(generation)),
            SessionEvent::Room { connection, event } => Ok(self.handle_room(connection, event)),
            SessionEvent::TileClicked { track } => self.handle_tile_clicked(track),
            SessionEvent::FocusDismissed => Ok(self.handle_focus_dismissed()),
            SessionEvent::Shutdown => Ok(self.handle_shutdown()),
        }
    }

    /// Handle mount: load the stored identity or open the name dialog.
    fn handle_mounted(&mut self) -> Result<Vec<SessionAction>, SessionError> {
        if self.phase != Phase::Unmounted {
            return Err(SessionError::InvalidState { reason: "already mounted".to_string() });
        }
        self.phase = Phase::Pending;

        match self.identities.load() {
            Some(identity) => {
                let mut actions = vec![SessionAction::info(format!("using stored identity {identity}"))];
                actions.extend(self.request_credential(identity));
                Ok(actions)
            },
            None => {
                self.dialog = Some(Dialog { draft: String::new(), editing: false });
                Ok(vec![SessionAction::info("no stored identity, prompting for a name")])
            },
        }
    }

    fn handle_name_input(&mut self, value: &str) -> Result<Vec<SessionAction>, SessionError> {
        let dialog = self.dialog_mut()?;
        dialog.draft = normalize_input(value);
        Ok(vec![])
    }

    /// Handle name submission.
    ///
    /// Blank drafts are a no-op and the dialog stays open. Otherwise a fresh
    /// identity replaces the old one; if a room was joined under the old one
    /// it is torn down and the whole bootstrap restarts.
    fn handle_submit_name(&mut self) -> Result<Vec<SessionAction>, SessionError> {
        let dialog = self.dialog_mut()?.clone();

        let identity = match self.identities.submit_lenient(&dialog.draft, dialog.editing) {
            Ok(identity) => identity,
            Err(IdentityError::Blank) => {
                return Ok(vec![SessionAction::debug("blank name rejected")]);
            },
            Err(e) => return Ok(vec![SessionAction::error(format!("name rejected: {e}"))]),
        };

        self.dialog = None;
        let mut actions = Vec::new();

        if matches!(self.phase, Phase::Joined(_)) {
            actions.push(SessionAction::Disconnect { reason: "identity changed".to_string() });
            self.teardown_room();
        }
        self.phase = Phase::Pending;

        actions.push(SessionAction::info(format!("identity set to {identity}")));
        actions.extend(self.request_credential(identity));
        Ok(actions)
    }

    fn handle_dismiss_entry(&mut self) -> Vec<SessionAction> {
        let Some(dialog) = &self.dialog else {
            return vec![SessionAction::debug("no dialog to dismiss")];
        };

        if !self.dialog_dismissible(dialog) {
            return vec![SessionAction::debug("name dialog cannot be dismissed yet")];
        }

        self.dialog = None;
        vec![]
    }

    /// Open the dialog pre-filled with the current base name.
    fn handle_edit_identity(&mut self) -> Result<Vec<SessionAction>, SessionError> {
        let identity = self.identity.as_ref().ok_or_else(|| SessionError::InvalidState {
            reason: "no identity to edit".to_string(),
        })?;

        self.dialog = Some(Dialog { draft: identity.base_name().to_string(), editing: true });
        Ok(vec![])
    }

    fn handle_credential_issued(&mut self, generation: u64, token: String) -> Vec<SessionAction> {
        if token.is_empty() {
            return self.handle_credential_failed(generation, "empty token");
        }

        let credential = Credential::new(token);
        let Some(elapsed) = self.broker.issue(generation, credential.clone(), self.env.now())
        else {
            return vec![SessionAction::debug(format!(
                "ignoring credential for stale generation {generation}"
            ))];
        };
        let Some(identity) = self.identity.clone() else {
            return vec![SessionAction::error("credential issued without an identity")];
        };

        self.phase = Phase::Joined(Link { connection: generation, connected: false, media_ready: false });

        vec![
            SessionAction::info(format!("credential issued after {elapsed:?}, connecting")),
            SessionAction::Connect(ConnectParams {
                connection: generation,
                server_url: self.config.server_url.clone(),
                identity,
                credential,
            }),
        ]
    }

    fn handle_credential_failed(&mut self, generation: u64, reason: &str) -> Vec<SessionAction> {
        match self.broker.fail(generation) {
            FailureOutcome::Stale => vec![SessionAction::debug(format!(
                "ignoring failure for stale generation {generation}: {reason}"
            ))],
            FailureOutcome::RetryAfter(delay) => vec![
                SessionAction::error(format!(
                    "credential request failed: {reason}, retrying in {delay:?}"
                )),
                SessionAction::ScheduleCredentialRetry { generation, delay },
            ],
            FailureOutcome::GiveUp => {
                vec![SessionAction::error(format!("credential request failed: {reason}"))]
            },
        }
    }

    fn handle_retry(&mut self, generation: u64) -> Vec<SessionAction> {
        match self.broker.retry(generation, self.env.now()) {
            Some(request) => vec![
                SessionAction::info(format!("retrying credential request (attempt {})", request.attempt)),
                SessionAction::RequestCredential(request),
            ],
            None => vec![SessionAction::debug(format!("ignoring retry for stale generation {generation}"))],
        }
    }

    /// Route a room event, dropping those from superseded connections.
    fn handle_room(&mut self, connection: u64, event: RoomEvent) -> Vec<SessionAction> {
        let Phase::Joined(link) = self.phase else {
            return vec![SessionAction::debug(format!(
                "ignoring {} from connection {connection} outside a room",
                event.name()
            ))];
        };
        if link.connection != connection {
            return vec![SessionAction::debug(format!(
                "ignoring {} from superseded connection {connection}",
                event.name()
            ))];
        }

        match event {
            RoomEvent::Connected { local, remote } => self.handle_room_connected(link, local, remote),
            RoomEvent::ParticipantJoined { participant } => self.handle_participant_joined(participant),
            RoomEvent::ParticipantLeft { participant } => self.handle_participant_left(&participant),
            RoomEvent::TrackPublished { participant, publication } => {
                self.handle_track_published(participant, publication)
            },
            RoomEvent::TrackUnpublished { participant, sid } => {
                self.handle_track_unpublished(&participant, &sid)
            },
            RoomEvent::LocalMediaReady => self.handle_local_media_ready(link),
            RoomEvent::ConnectFailed { reason } => self.handle_connect_failed(&reason),
            RoomEvent::Disconnected { reason } => self.handle_room_disconnected(reason),
        }
    }

    fn handle_room_connected(
        &mut self,
        link: Link,
        local: ParticipantId,
        remote: Vec<ParticipantId>,
    ) -> Vec<SessionAction> {
        self.roster.reset(local, remote);
        self.focus.dismiss();
        self.phase = Phase::Joined(Link { connected: true, ..link });

        let mut actions = vec![SessionAction::info(format!(
            "joined {} with {} participant(s)",
            self.config.room,
            self.roster.count()
        ))];
        actions.extend(self.observe_occupancy());
        if link.media_ready {
            actions.extend(self.publish_local_tracks());
        }
        actions
    }

    fn handle_participant_joined(&mut self, participant: ParticipantId) -> Vec<SessionAction> {
        if !self.roster.join(participant.clone()) {
            return vec![SessionAction::debug(format!("{participant} already present"))];
        }

        let mut actions = vec![SessionAction::info(format!("{participant} joined"))];
        actions.extend(self.observe_occupancy());
        actions
    }

    fn handle_participant_left(&mut self, participant: &ParticipantId) -> Vec<SessionAction> {
        if !self.roster.leave(participant) {
            return vec![SessionAction::debug(format!("{participant} was not present"))];
        }

        let mut actions = vec![SessionAction::info(format!("{participant} left"))];
        if self.focus.participant_removed(participant) {
            actions.push(SessionAction::info("focused participant left, closing overlay"));
        }
        actions.extend(self.observe_occupancy());
        actions
    }

    fn handle_track_published(
        &mut self,
        participant: ParticipantId,
        publication: Publication,
    ) -> Vec<SessionAction> {
        let was_present = self.roster.contains(&participant);
        self.roster.publish(participant, publication);

        if was_present { vec![] } else { self.observe_occupancy() }
    }

    fn handle_track_unpublished(&mut self, participant: &ParticipantId, sid: &TrackSid) -> Vec<SessionAction> {
        self.roster.unpublish(participant, sid);
        if self.focus.track_removed(participant, sid) {
            return vec![SessionAction::info("focused track unpublished, closing overlay")];
        }
        vec![]
    }

    /// Publish now if the room snapshot is in, otherwise once it arrives.
    fn handle_local_media_ready(&mut self, link: Link) -> Vec<SessionAction> {
        if !link.connected {
            self.phase = Phase::Joined(Link { media_ready: true, ..link });
            return vec![SessionAction::debug("local media ready before room snapshot, holding publish")];
        }
        self.publish_local_tracks()
    }

    fn publish_local_tracks(&mut self) -> Vec<SessionAction> {
        if self.occupancy.published().is_some() {
            return vec![SessionAction::debug("local tracks already published")];
        }

        let defaults = self.occupancy.publish();
        vec![
            SessionAction::info(format!(
                "publishing local tracks (audio: {}, video: {}) with {} participant(s) present",
                defaults.audio,
                defaults.video,
                self.occupancy.participant_count()
            )),
            SessionAction::PublishLocalTracks(defaults),
        ]
    }

    /// The room is never entered. Back to loading; editing the name retries.
    fn handle_connect_failed(&mut self, reason: &str) -> Vec<SessionAction> {
        self.teardown_room();
        self.broker.invalidate();
        self.phase = Phase::Pending;
        vec![SessionAction::error(format!("could not join {}: {reason}", self.config.room))]
    }

    fn handle_tile_clicked(
        &mut self,
        track: Option<TrackRef>,
    ) -> Result<Vec<SessionAction>, SessionError> {
        self.require_joined("tile clicked")?;

        if let Some(track) = &track {
            if !self.roster.contains_track(track) {
                return Ok(vec![SessionAction::debug(format!("ignoring click on unknown track {track}"))]);
            }
        }

        self.focus.click(track);
        Ok(vec![])
    }

    fn handle_focus_dismissed(&mut self) -> Vec<SessionAction> {
        if self.focus.dismiss() {
            vec![]
        } else {
            vec![SessionAction::debug("overlay already closed")]
        }
    }

    fn handle_room_disconnected(&mut self, reason: String) -> Vec<SessionAction> {
        self.teardown_room();
        self.broker.invalidate();
        self.dialog = None;
        let message = format!("disconnected from {}: {reason}", self.config.room);
        self.phase = Phase::Ended { reason };
        vec![SessionAction::info(message)]
    }

    fn handle_shutdown(&mut self) -> Vec<SessionAction> {
        let mut actions = Vec::new();

        if let Some(generation) = self.broker.invalidate() {
            actions.push(SessionAction::CancelCredentialRequest { generation });
        }
        if matches!(self.phase, Phase::Joined(_)) {
            actions.push(SessionAction::Disconnect { reason: "session closed".to_string() });
            self.teardown_room();
        }

        self.dialog = None;
        self.phase = Phase::Ended { reason: "session closed".to_string() };
        actions.push(SessionAction::info("session closed"));
        actions
    }

    fn request_credential(&mut self, identity: Identity) -> Vec<SessionAction> {
        self.identity = Some(identity.clone());
        let (superseded, request) = self.broker.begin(identity, self.env.now());

        let mut actions = Vec::with_capacity(2);
        if let Some(generation) = superseded {
            actions.push(SessionAction::CancelCredentialRequest { generation });
        }
        actions.push(SessionAction::RequestCredential(request));
        actions
    }

    fn observe_occupancy(&mut self) -> Vec<SessionAction> {
        self.occupancy
            .observe(self.roster.count())
            .map(SessionAction::UpdateLocalTracks)
            .into_iter()
            .collect()
    }

    fn teardown_room(&mut self) {
        self.roster.clear();
        self.focus.dismiss();
        self.occupancy.reset();
    }

    fn require_joined(&self, what: &str) -> Result<(), SessionError> {
        if matches!(self.phase, Phase::Joined(_)) {
            Ok(())
        } else {
            Err(SessionError::InvalidState { reason: format!("{what} outside a room") })
        }
    }

    fn dialog_mut(&mut self) -> Result<&mut Dialog, SessionError> {
        self.dialog
            .as_mut()
            .ok_or_else(|| SessionError::InvalidState { reason: "name dialog is closed".to_string() })
    }

    fn dialog_dismissible(&self, dialog: &Dialog) -> bool {
        self.identity.is_some() && !dialog.draft.trim().is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::{
        future::Future,
        pin::Pin,
        task::{Context, Poll},
        time::{Duration, Instant},
    };

    use super::*;
    use crate::{
        event::LogLevel,
        occupancy::MediaDefaults,
        store::MemoryIdentityStore,
        track::TrackSource,
    };

    /// Immediate future that completes instantly
    struct ImmediateFuture;

    impl Future for ImmediateFuture {
        type Output = ();

        fn poll(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
            Poll::Ready(())
        }
    }

    #[derive(Clone)]
    struct TestEnv;

    impl Environment for TestEnv {
        fn now(&self) -> Instant {
            Instant::now()
        }

        fn sleep(&self, _duration: Duration) -> impl Future<Output = ()> + Send {
            ImmediateFuture
        }

        fn random_bytes(&self, buffer: &mut [u8]) {
            // Deterministic for tests
            for (i, byte) in buffer.iter_mut().enumerate() {
                *byte = i as u8;
            }
        }
    }

    type Controller = SessionController<TestEnv, MemoryIdentityStore>;

    fn controller(store: MemoryIdentityStore) -> Controller {
        SessionController::new(TestEnv, store, SessionConfig::new("wss://media.example"))
    }

    fn pid(id: &str) -> ParticipantId {
        ParticipantId::new(id)
    }

    fn requested_generation(actions: &[SessionAction]) -> u64 {
        actions
            .iter()
            .find_map(|a| match a {
                SessionAction::RequestCredential(request) => Some(request.generation),
                _ => None,
            })
            .unwrap()
    }

    /// Feed a room event from the current connection.
    fn room(session: &mut Controller, event: RoomEvent) -> Vec<SessionAction> {
        let connection = session.connection().unwrap();
        session.handle(SessionEvent::Room { connection, event }).unwrap()
    }

    /// Controller with a stored identity and a credential, not yet in the room.
    fn connecting() -> Controller {
        let mut session = controller(MemoryIdentityStore::with_value("ana-x7f2a"));
        let actions = session.handle(SessionEvent::Mounted).unwrap();
        let generation = requested_generation(&actions);
        session
            .handle(SessionEvent::CredentialIssued { generation, token: "tok".to_string() })
            .unwrap();
        session
    }

    /// Controller with a stored identity, joined and connected alone.
    fn joined() -> Controller {
        let mut session = connecting();
        room(&mut session, RoomEvent::Connected { local: pid("ana-x7f2a"), remote: vec![] });
        session
    }

    fn published(actions: &[SessionAction]) -> Option<MediaDefaults> {
        actions.iter().find_map(|a| match a {
            SessionAction::PublishLocalTracks(defaults) => Some(*defaults),
            _ => None,
        })
    }

    #[test]
    fn events_before_mount_fail() {
        let mut session = controller(MemoryIdentityStore::new());
        assert_eq!(session.view(), View::Blank);

        let result = session.handle(SessionEvent::SubmitName);
        assert!(matches!(result, Err(SessionError::NotMounted)));
    }

    #[test]
    fn double_mount_fails() {
        let mut session = controller(MemoryIdentityStore::new());
        session.handle(SessionEvent::Mounted).unwrap();
        let result = session.handle(SessionEvent::Mounted);
        assert!(matches!(result, Err(SessionError::InvalidState { .. })));
    }

    #[test]
    fn mount_without_identity_prompts() {
        let mut session = controller(MemoryIdentityStore::new());
        let actions = session.handle(SessionEvent::Mounted).unwrap();

        assert!(!actions.iter().any(|a| matches!(a, SessionAction::RequestCredential(_))));
        match session.view() {
            View::IdentityEntry(dialog) => {
                assert!(!dialog.editing);
                assert!(!dialog.dismissible);
                assert!(!dialog.can_submit);
            },
            other => panic!("expected entry dialog, got {other:?}"),
        }
    }

    #[test]
    fn mount_with_identity_requests_credential() {
        let mut session = controller(MemoryIdentityStore::with_value("ana-x7f2a"));
        let actions = session.handle(SessionEvent::Mounted).unwrap();

        let request = actions
            .iter()
            .find_map(|a| match a {
                SessionAction::RequestCredential(request) => Some(request.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(request.room, DEFAULT_ROOM);
        assert_eq!(request.identity.rendered(), "ana-x7f2a");
        assert_eq!(session.view(), View::Loading);
    }

    #[test]
    fn name_input_is_normalized() {
        let mut session = controller(MemoryIdentityStore::new());
        session.handle(SessionEvent::Mounted).unwrap();
        session.handle(SessionEvent::NameInput { value: "ana-maria".to_string() }).unwrap();

        match session.view() {
            View::IdentityEntry(dialog) => assert_eq!(dialog.draft, "ana_maria"),
            other => panic!("expected entry dialog, got {other:?}"),
        }
    }

    #[test]
    fn blank_submit_keeps_dialog_open() {
        let mut session = controller(MemoryIdentityStore::new());
        session.handle(SessionEvent::Mounted).unwrap();
        session.handle(SessionEvent::NameInput { value: "   ".to_string() }).unwrap();

        let actions = session.handle(SessionEvent::SubmitName).unwrap();
        assert!(matches!(actions.as_slice(), [SessionAction::Log { level: LogLevel::Debug, .. }]));
        assert!(matches!(session.view(), View::IdentityEntry(_)));
        assert_eq!(session.identity_store().value(), None);
    }

    #[test]
    fn first_time_dialog_cannot_be_dismissed() {
        let mut session = controller(MemoryIdentityStore::new());
        session.handle(SessionEvent::Mounted).unwrap();
        session.handle(SessionEvent::NameInput { value: "ana".to_string() }).unwrap();
        session.handle(SessionEvent::DismissEntry).unwrap();

        assert!(matches!(session.view(), View::IdentityEntry(_)));
    }

    #[test]
    fn submit_persists_and_requests_credential() {
        let mut session = controller(MemoryIdentityStore::new());
        session.handle(SessionEvent::Mounted).unwrap();
        session.handle(SessionEvent::NameInput { value: "ana".to_string() }).unwrap();
        let actions = session.handle(SessionEvent::SubmitName).unwrap();

        let identity = session.identity().unwrap().clone();
        assert_eq!(identity.rendered(), "ana-01234");
        assert_eq!(session.identity_store().value(), Some("ana-01234"));
        assert_eq!(requested_generation(&actions), session.generation());
        assert_eq!(session.view(), View::Loading);
    }

    #[test]
    fn credential_mounts_room_view() {
        let mut session = controller(MemoryIdentityStore::with_value("ana-x7f2a"));
        let generation = requested_generation(&session.handle(SessionEvent::Mounted).unwrap());
        let actions = session
            .handle(SessionEvent::CredentialIssued { generation, token: "tok".to_string() })
            .unwrap();

        let connect = actions
            .iter()
            .find_map(|a| match a {
                SessionAction::Connect(params) => Some(params.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(connect.server_url, "wss://media.example");
        assert_eq!(connect.connection, generation);
        assert_eq!(session.connection(), Some(generation));
        assert_eq!(connect.credential.token(), "tok");

        match session.view() {
            View::Room(room) => {
                assert!(!room.connected);
                assert!(room.tiles.is_empty());
            },
            other => panic!("expected room, got {other:?}"),
        }
    }

    #[test]
    fn credential_failure_keeps_loading() {
        let mut session = controller(MemoryIdentityStore::with_value("ana-x7f2a"));
        let generation = requested_generation(&session.handle(SessionEvent::Mounted).unwrap());
        let actions = session
            .handle(SessionEvent::CredentialFailed { generation, reason: "503".to_string() })
            .unwrap();

        assert!(matches!(actions.as_slice(), [SessionAction::Log { level: LogLevel::Error, .. }]));
        assert_eq!(session.view(), View::Loading);
        assert!(session.credential().is_none());
    }

    #[test]
    fn empty_token_is_a_failure() {
        let mut session = controller(MemoryIdentityStore::with_value("ana-x7f2a"));
        let generation = requested_generation(&session.handle(SessionEvent::Mounted).unwrap());
        session
            .handle(SessionEvent::CredentialIssued { generation, token: String::new() })
            .unwrap();

        assert_eq!(session.view(), View::Loading);
    }

    #[test]
    fn retry_policy_schedules_next_attempt() {
        let mut config = SessionConfig::new("wss://media.example");
        config.credential_retry = CredentialRetry::Backoff {
            max_attempts: 2,
            initial_backoff: Duration::from_millis(250),
        };
        let mut session =
            SessionController::new(TestEnv, MemoryIdentityStore::with_value("ana-x7f2a"), config);
        let generation = requested_generation(&session.handle(SessionEvent::Mounted).unwrap());

        let actions = session
            .handle(SessionEvent::CredentialFailed { generation, reason: "timeout".to_string() })
            .unwrap();
        assert!(actions.contains(&SessionAction::ScheduleCredentialRetry {
            generation,
            delay: Duration::from_millis(250),
        }));

        let actions = session.handle(SessionEvent::RetryCredential { generation }).unwrap();
        assert_eq!(requested_generation(&actions), generation);
    }

    #[test]
    fn edit_prefills_base_name_and_is_dismissible() {
        let mut session = joined();
        session.handle(SessionEvent::EditIdentity).unwrap();

        match session.view() {
            View::IdentityEntry(dialog) => {
                assert_eq!(dialog.draft, "ana");
                assert!(dialog.editing);
                assert!(dialog.dismissible);
            },
            other => panic!("expected entry dialog, got {other:?}"),
        }

        session.handle(SessionEvent::DismissEntry).unwrap();
        assert!(matches!(session.view(), View::Room(_)));
    }

    #[test]
    fn edit_submit_restarts_session() {
        let mut session = joined();
        room(
            &mut session,
            RoomEvent::TrackPublished {
                participant: pid("ana-x7f2a"),
                publication: Publication::new("TR_cam", TrackSource::Camera),
            },
        );
        let old_generation = session.generation();

        session.handle(SessionEvent::EditIdentity).unwrap();
        session.handle(SessionEvent::NameInput { value: "bia".to_string() }).unwrap();
        let actions = session.handle(SessionEvent::SubmitName).unwrap();

        assert!(matches!(actions[0], SessionAction::Disconnect { .. }));
        assert!(requested_generation(&actions) > old_generation);
        assert_eq!(session.identity().map(Identity::base_name), Some("bia"));
        assert!(session.credential().is_none());
        assert_eq!(session.roster().count(), 0);
        assert_eq!(session.view(), View::Loading);
    }

    #[test]
    fn stale_credential_is_ignored_after_edit() {
        let mut session = controller(MemoryIdentityStore::with_value("ana-x7f2a"));
        let stale = requested_generation(&session.handle(SessionEvent::Mounted).unwrap());

        session.handle(SessionEvent::EditIdentity).unwrap();
        session.handle(SessionEvent::NameInput { value: "bia".to_string() }).unwrap();
        let actions = session.handle(SessionEvent::SubmitName).unwrap();
        assert!(actions.contains(&SessionAction::CancelCredentialRequest { generation: stale }));

        session
            .handle(SessionEvent::CredentialIssued { generation: stale, token: "old".to_string() })
            .unwrap();
        assert_eq!(session.view(), View::Loading);
        assert!(session.credential().is_none());
    }

    #[test]
    fn solo_join_publishes_media_on() {
        let mut session = joined();
        let actions = room(&mut session, RoomEvent::LocalMediaReady);
        assert_eq!(published(&actions), Some(MediaDefaults::ON));
    }

    #[test]
    fn second_participant_before_publish_wins() {
        let mut session = joined();
        room(&mut session, RoomEvent::ParticipantJoined { participant: pid("bia-bbbbb") });
        let actions = room(&mut session, RoomEvent::LocalMediaReady);
        assert_eq!(published(&actions), Some(MediaDefaults::OFF));

        let actions = room(&mut session, RoomEvent::LocalMediaReady);
        assert_eq!(published(&actions), None);
    }

    #[test]
    fn media_ready_before_snapshot_waits_for_room_count() {
        let mut session = connecting();
        let actions = room(&mut session, RoomEvent::LocalMediaReady);
        assert_eq!(published(&actions), None);
        assert_eq!(session.occupancy().published(), None);

        let actions = room(
            &mut session,
            RoomEvent::Connected { local: pid("ana-x7f2a"), remote: vec![pid("bob-bbbbb"), pid("cy-ccccc")] },
        );
        assert_eq!(published(&actions), Some(MediaDefaults::OFF));
        assert_eq!(session.occupancy().published(), Some(MediaDefaults::OFF));
    }

    #[test]
    fn media_ready_before_empty_snapshot_publishes_on() {
        let mut session = connecting();
        room(&mut session, RoomEvent::LocalMediaReady);
        let actions = room(&mut session, RoomEvent::Connected { local: pid("ana-x7f2a"), remote: vec![] });
        assert_eq!(published(&actions), Some(MediaDefaults::ON));
    }

    #[test]
    fn join_after_publish_does_not_republish() {
        let mut session = joined();
        room(&mut session, RoomEvent::LocalMediaReady);
        let actions = room(&mut session, RoomEvent::ParticipantJoined { participant: pid("bia-bbbbb") });

        assert!(!actions.iter().any(|a| matches!(a, SessionAction::UpdateLocalTracks(_))));
        match session.view() {
            View::Room(room) => {
                assert_eq!(room.media_defaults, MediaDefaults::OFF);
                assert_eq!(room.published, Some(MediaDefaults::ON));
            },
            other => panic!("expected room, got {other:?}"),
        }
    }

    #[test]
    fn focus_follows_clicks_and_dismissal() {
        let mut session = joined();
        let publication = Publication::new("TR_cam", TrackSource::Camera);
        room(
            &mut session,
            RoomEvent::TrackPublished { participant: pid("ana-x7f2a"), publication: publication.clone() },
        );
        let track = TrackRef::new(pid("ana-x7f2a"), &publication);

        session.handle(SessionEvent::TileClicked { track: Some(track.clone()) }).unwrap();
        match session.view() {
            View::Room(room) => {
                assert!(room.is_overlay_open());
                assert_eq!(room.focus, Some(track));
            },
            other => panic!("expected room, got {other:?}"),
        }

        session.handle(SessionEvent::FocusDismissed).unwrap();
        assert!(!session.focus().is_overlay_open());
    }

    #[test]
    fn click_on_unknown_track_is_ignored() {
        let mut session = joined();
        let ghost = TrackRef::new(pid("ghost"), &Publication::new("TR_x", TrackSource::Camera));
        session.handle(SessionEvent::TileClicked { track: Some(ghost) }).unwrap();
        assert!(!session.focus().is_overlay_open());
    }

    #[test]
    fn unpublishing_focused_track_closes_overlay() {
        let mut session = joined();
        let publication = Publication::new("TR_screen", TrackSource::ScreenShare);
        room(
            &mut session,
            RoomEvent::TrackPublished { participant: pid("bia-bbbbb"), publication: publication.clone() },
        );
        session
            .handle(SessionEvent::TileClicked {
                track: Some(TrackRef::new(pid("bia-bbbbb"), &publication)),
            })
            .unwrap();

        room(&mut session, RoomEvent::TrackUnpublished { participant: pid("bia-bbbbb"), sid: publication.sid });
        assert!(!session.focus().is_overlay_open());
    }

    #[test]
    fn room_events_outside_room_are_ignored() {
        let mut session = controller(MemoryIdentityStore::with_value("ana-x7f2a"));
        session.handle(SessionEvent::Mounted).unwrap();

        let actions = session
            .handle(SessionEvent::Room {
                connection: 1,
                event: RoomEvent::ParticipantJoined { participant: pid("x") },
            })
            .unwrap();
        assert!(matches!(actions.as_slice(), [SessionAction::Log { level: LogLevel::Debug, .. }]));
        assert_eq!(session.roster().count(), 0);
    }

    #[test]
    fn old_connection_cannot_end_renamed_session() {
        let mut session = joined();
        let old = session.connection().unwrap();
        room(&mut session, RoomEvent::ParticipantJoined { participant: pid("bob-bbbbb") });

        session.handle(SessionEvent::EditIdentity).unwrap();
        session.handle(SessionEvent::NameInput { value: "bia".to_string() }).unwrap();
        let generation = requested_generation(&session.handle(SessionEvent::SubmitName).unwrap());
        session
            .handle(SessionEvent::CredentialIssued { generation, token: "tok2".to_string() })
            .unwrap();
        assert_ne!(session.connection(), Some(old));

        for event in [
            RoomEvent::Connected { local: pid("ana-x7f2a"), remote: vec![pid("bob-bbbbb")] },
            RoomEvent::ParticipantJoined { participant: pid("cy-ccccc") },
            RoomEvent::Disconnected { reason: "old connection closed".to_string() },
        ] {
            let actions = session.handle(SessionEvent::Room { connection: old, event }).unwrap();
            assert!(matches!(actions.as_slice(), [SessionAction::Log { level: LogLevel::Debug, .. }]));
        }

        assert!(!session.is_ended());
        assert_eq!(session.roster().count(), 0);
        room(&mut session, RoomEvent::Connected { local: pid("bia-01234"), remote: vec![] });
        match session.view() {
            View::Room(room) => {
                assert!(room.connected);
                assert_eq!(room.participant_count, 1);
            },
            other => panic!("expected room, got {other:?}"),
        }
    }

    #[test]
    fn connect_failure_returns_to_loading() {
        let mut session = connecting();
        let actions = room(&mut session, RoomEvent::ConnectFailed { reason: "refused".to_string() });

        assert!(matches!(actions.as_slice(), [SessionAction::Log { level: LogLevel::Error, .. }]));
        assert_eq!(session.view(), View::Loading);
        assert!(!session.is_ended());
        assert!(session.credential().is_none());
        assert_eq!(session.connection(), None);

        session.handle(SessionEvent::EditIdentity).unwrap();
        let actions = session.handle(SessionEvent::SubmitName).unwrap();
        assert!(!actions.iter().any(|a| matches!(a, SessionAction::Disconnect { .. })));
        assert!(actions.iter().any(|a| matches!(a, SessionAction::RequestCredential(_))));
    }

    #[test]
    fn disconnect_ends_session() {
        let mut session = joined();
        room(&mut session, RoomEvent::Disconnected { reason: "server closed".to_string() });

        assert_eq!(session.view(), View::Ended { reason: "server closed".to_string() });
        assert!(session.credential().is_none());
        assert!(session.is_ended());
    }

    #[test]
    fn ended_session_rejects_everything() {
        let mut session = joined();
        session.handle(SessionEvent::EditIdentity).unwrap();
        room(&mut session, RoomEvent::Disconnected { reason: "server closed".to_string() });
        assert_eq!(session.view(), View::Ended { reason: "server closed".to_string() });

        for event in [
            SessionEvent::EditIdentity,
            SessionEvent::SubmitName,
            SessionEvent::Room { connection: 1, event: RoomEvent::LocalMediaReady },
            SessionEvent::Shutdown,
        ] {
            let result = session.handle(event);
            assert!(matches!(result, Err(SessionError::InvalidState { .. })));
        }
        assert!(session.is_ended());
    }

    #[test]
    fn shutdown_cancels_in_flight_request() {
        let mut session = controller(MemoryIdentityStore::with_value("ana-x7f2a"));
        let generation = requested_generation(&session.handle(SessionEvent::Mounted).unwrap());

        let actions = session.handle(SessionEvent::Shutdown).unwrap();
        assert!(actions.contains(&SessionAction::CancelCredentialRequest { generation }));
        assert!(!actions.iter().any(|a| matches!(a, SessionAction::Disconnect { .. })));
        assert!(session.is_ended());
    }

    #[test]
    fn shutdown_in_room_disconnects() {
        let mut session = joined();
        let actions = session.handle(SessionEvent::Shutdown).unwrap();
        assert!(actions.iter().any(|a| matches!(a, SessionAction::Disconnect { .. })));
    }
}
