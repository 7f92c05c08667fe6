//! Huddle client runtime.
//!
//! Production wiring for the sans-IO session controller in `huddle-core`:
//! - [`SystemEnv`]: system clock, tokio timers, OS randomness
//! - [`HttpTokenIssuer`]: the participant-token HTTP endpoint
//! - [`FileIdentityStore`]: identity persisted to a text file
//! - [`MediaTransport`]: boundary to the media SDK, with a dry-run
//!   [`LogTransport`]
//! - [`SessionDriver`]: event loop that executes controller actions
//!
//! ## Architecture
//!
//! ```text
//! UI input ──┐
//! issuer ────┼─▶ event queue ─▶ SessionController ─▶ actions ─▶ issuer / transport / tracing
//! transport ─┘                         │
//!                                      └─▶ watch<View> ─▶ renderer
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
mod driver;
mod error;
mod file_store;
mod system_env;
mod token;
mod transport;

pub use config::ClientConfig;
pub use driver::SessionDriver;
pub use error::{ConfigError, CredentialError, DriverError, TransportError, check_response};
pub use file_store::FileIdentityStore;
pub use system_env::SystemEnv;
pub use token::{HttpTokenIssuer, TOKEN_PATH, TokenIssuer};
pub use transport::{LogTransport, MediaTransport, RoomHandle, SessionHandle};
