//! Session error types.

use thiserror::Error;

/// Errors from [`crate::SessionController::handle`].
#[derive(Debug, Error)]
pub enum SessionError {
    /// An event arrived before [`crate::SessionEvent::Mounted`].
    #[error("session not mounted")]
    NotMounted,

    /// The event does not apply to the current phase.
    #[error("invalid state: {reason}")]
    InvalidState {
        /// Description of the mismatch.
        reason: String,
    },
}

impl SessionError {
    /// Returns true if this error indicates a driver bug.
    ///
    /// Transport events racing a teardown are expected and transient.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::NotMounted => true,
            Self::InvalidState { .. } => false,
        }
    }
}
