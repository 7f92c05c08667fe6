//! Scripted session scenarios.
//!
//! A [`Scenario`] mounts a controller in a [`SimWorld`], plays a list of
//! steps against it and finally hands the world to an oracle.
//!
//! ```
//! use huddle_harness::scenario::Scenario;
//!
//! let world = Scenario::new()
//!     .submit_name("ana")
//!     .issue("token")
//!     .connect_room(&[])
//!     .local_media_ready()
//!     .oracle(Box::new(|world| {
//!         world.published().map(|_| ()).ok_or_else(|| "nothing published".to_string())
//!     }))
//!     .run()
//!     .expect("scenario passes");
//! assert!(world.is_connected());
//! ```

use std::time::Duration;

use huddle_core::{
    CredentialRetry, MemoryIdentityStore, OccupancyMode, ParticipantId, Publication, RoomEvent, SessionConfig,
    SessionEvent, TrackSid, TrackSource,
};

use crate::world::SimWorld;

/// Final check over the world. `Err` fails the scenario.
pub type Oracle = Box<dyn Fn(&SimWorld) -> Result<(), String>>;

/// One scripted step.
#[derive(Debug, Clone)]
pub enum Step {
    /// Feed an event to the controller.
    Event(SessionEvent),
    /// Answer the latest credential request.
    Issue(String),
    /// Answer a specific generation, even a superseded one.
    IssueFor {
        /// Generation to answer.
        generation: u64,
        /// Token to hand back.
        token: String,
    },
    /// Fail the latest credential request.
    Fail(String),
    /// Report the room joined with these remote participants.
    ConnectRoom(Vec<String>),
    /// Deliver a room event on the live connection.
    Room(RoomEvent),
    /// Deliver a room event tagged with a specific connection.
    RoomFrom {
        /// Connection tag.
        connection: u64,
        /// What happened.
        event: RoomEvent,
    },
    /// Advance virtual time, firing due retries.
    Advance(Duration),
}

/// Scenario builder.
pub struct Scenario {
    seed: u64,
    stored_identity: Option<String>,
    config: SessionConfig,
    steps: Vec<Step>,
    oracle: Option<Oracle>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self::new()
    }
}

impl Scenario {
    /// Empty scenario: seed 0, no stored identity, default session config.
    pub fn new() -> Self {
        Self {
            seed: 0,
            stored_identity: None,
            config: SessionConfig::new("wss://sim.invalid"),
            steps: Vec::new(),
            oracle: None,
        }
    }

    /// Seed for the simulated RNG.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Pre-populate the identity store.
    #[must_use]
    pub fn with_stored_identity(mut self, rendered: impl Into<String>) -> Self {
        self.stored_identity = Some(rendered.into());
        self
    }

    /// Credential failure handling.
    #[must_use]
    pub fn with_retry(mut self, retry: CredentialRetry) -> Self {
        self.config.credential_retry = retry;
        self
    }

    /// Occupancy mode.
    #[must_use]
    pub fn with_occupancy_mode(mut self, mode: OccupancyMode) -> Self {
        self.config.occupancy_mode = mode;
        self
    }

    /// Append a raw step.
    #[must_use]
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Feed an event.
    #[must_use]
    pub fn event(self, event: SessionEvent) -> Self {
        self.step(Step::Event(event))
    }

    /// Type `name` into the dialog and submit.
    #[must_use]
    pub fn submit_name(self, name: &str) -> Self {
        self.event(SessionEvent::NameInput { value: name.to_string() }).event(SessionEvent::SubmitName)
    }

    /// Answer the latest credential request.
    #[must_use]
    pub fn issue(self, token: &str) -> Self {
        self.step(Step::Issue(token.to_string()))
    }

    /// Answer `generation`, stale or not.
    #[must_use]
    pub fn issue_for(self, generation: u64, token: &str) -> Self {
        self.step(Step::IssueFor { generation, token: token.to_string() })
    }

    /// Fail the latest credential request.
    #[must_use]
    pub fn fail(self, reason: &str) -> Self {
        self.step(Step::Fail(reason.to_string()))
    }

    /// Report the room joined.
    #[must_use]
    pub fn connect_room(self, remote: &[&str]) -> Self {
        self.step(Step::ConnectRoom(remote.iter().map(ToString::to_string).collect()))
    }

    /// Deliver a room event on the live connection.
    #[must_use]
    pub fn room(self, event: RoomEvent) -> Self {
        self.step(Step::Room(event))
    }

    /// Deliver a room event from `connection`, live or superseded.
    #[must_use]
    pub fn room_from(self, connection: u64, event: RoomEvent) -> Self {
        self.step(Step::RoomFrom { connection, event })
    }

    /// A remote participant joins.
    #[must_use]
    pub fn join(self, participant: &str) -> Self {
        self.room(RoomEvent::ParticipantJoined { participant: ParticipantId::new(participant) })
    }

    /// A remote participant leaves.
    #[must_use]
    pub fn leave(self, participant: &str) -> Self {
        self.room(RoomEvent::ParticipantLeft { participant: ParticipantId::new(participant) })
    }

    /// A participant publishes a track.
    #[must_use]
    pub fn publish(self, participant: &str, sid: &str, source: TrackSource) -> Self {
        self.room(RoomEvent::TrackPublished {
            participant: ParticipantId::new(participant),
            publication: Publication::new(sid, source),
        })
    }

    /// A participant unpublishes a track.
    #[must_use]
    pub fn unpublish(self, participant: &str, sid: &str) -> Self {
        self.room(RoomEvent::TrackUnpublished { participant: ParticipantId::new(participant), sid: TrackSid::new(sid) })
    }

    /// Local devices are ready.
    #[must_use]
    pub fn local_media_ready(self) -> Self {
        self.room(RoomEvent::LocalMediaReady)
    }

    /// The live connection drops.
    #[must_use]
    pub fn disconnect(self, reason: &str) -> Self {
        self.room(RoomEvent::Disconnected { reason: reason.to_string() })
    }

    /// Advance virtual time.
    #[must_use]
    pub fn advance(self, duration: Duration) -> Self {
        self.step(Step::Advance(duration))
    }

    /// Check to run after the last step.
    #[must_use]
    pub fn oracle(mut self, oracle: Oracle) -> Self {
        self.oracle = Some(oracle);
        self
    }

    /// Mount the session, play every step, then consult the oracle.
    ///
    /// # Errors
    ///
    /// A description of the first fatal controller error or the oracle's
    /// complaint.
    pub fn run(self) -> Result<SimWorld, String> {
        let store = self.stored_identity.map_or_else(MemoryIdentityStore::new, MemoryIdentityStore::with_value);
        let mut world = SimWorld::new(self.seed, store, self.config);

        world.apply(SessionEvent::Mounted).map_err(|e| format!("mount failed: {e}"))?;

        for (index, step) in self.steps.into_iter().enumerate() {
            let description = format!("{step:?}");
            let result = match step {
                Step::Event(event) => world.apply(event),
                Step::Issue(token) => world.issue(&token),
                Step::IssueFor { generation, token } => world.issue_for(generation, &token),
                Step::Fail(reason) => world.fail(&reason),
                Step::ConnectRoom(remote) => {
                    let remote: Vec<&str> = remote.iter().map(String::as_str).collect();
                    world.connect_room(&remote)
                },
                Step::Room(event) => world.room(event),
                Step::RoomFrom { connection, event } => world.room_from(connection, event),
                Step::Advance(duration) => world.advance(duration),
            };
            result.map_err(|e| format!("step {index} ({description}) failed: {e}"))?;
        }

        if let Some(oracle) = &self.oracle {
            oracle(&world)?;
        }
        Ok(world)
    }
}
