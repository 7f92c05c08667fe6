//! Reference model for model-based testing.
//!
//! The model captures what a joined room should look like after any sequence
//! of roster, track and focus operations, without the controller's
//! bookkeeping. It is the oracle the real controller is checked against.
//!
//! # Design Principles
//!
//! - Simplicity: The model should be obviously correct
//! - Deterministic: Same inputs produce same outputs

pub mod operation;
mod room;

pub use operation::{IdMap, ModelParticipant, ModelTrack, Operation, OperationResult};
pub use room::{ModelRoom, ObservableState};
