//! Huddle core
//!
//! Sans-IO state machines for joining a single video-conference room: picking
//! a unique display identity, exchanging it for a join credential, choosing
//! default media flags from room occupancy, and keeping the focus overlay in
//! step with a changing set of tracks.
//!
//! # Architecture
//!
//! The [`SessionController`] is a pure state machine that:
//! - Receives events from the caller (UI input, credential responses,
//!   transport notifications)
//! - Produces actions for the caller to execute (request a credential,
//!   connect, publish local tracks)
//! - Uses the [`Environment`] trait for time and randomness (deterministic
//!   testing)
//!
//! # Components
//!
//! - [`IdentityManager`]: Mints and persists `<base>-<suffix>` identities
//! - [`CredentialBroker`]: Generation-guarded credential bookkeeping
//! - [`OccupancyPolicy`]: Participant count to [`MediaDefaults`]
//! - [`FocusCoordinator`]: Selected track and overlay visibility
//! - [`Roster`]: Participants, publications and grid tiles
//! - [`View`]: Render model derived from controller state

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod credential;
pub mod env;
mod error;
mod event;
pub mod focus;
pub mod identity;
pub mod occupancy;
pub mod roster;
mod session;
pub mod store;
pub mod track;
mod view;

pub use credential::{Credential, CredentialBroker, CredentialRequest, CredentialRetry};
pub use env::Environment;
pub use error::SessionError;
pub use event::{ConnectParams, LogLevel, RoomEvent, SessionAction, SessionEvent};
pub use focus::{FocusCoordinator, FocusState};
pub use identity::{Identity, IdentityError, IdentityManager};
pub use occupancy::{MediaDefaults, OccupancyMode, OccupancyPolicy};
pub use roster::{Roster, Tile};
pub use session::{DEFAULT_ROOM, SessionConfig, SessionController};
pub use store::{IdentityStore, MemoryIdentityStore, StoreError};
pub use track::{ParticipantId, Publication, TrackRef, TrackSid, TrackSource};
pub use view::{EntryDialog, RoomView, View};
