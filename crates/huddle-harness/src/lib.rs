//! Deterministic simulation harness for huddle sessions.
//!
//! A real [`huddle_core::SessionController`] runs inside a [`SimWorld`] that
//! stands in for the token endpoint and the media transport, with a seeded
//! [`SimEnv`] for time and randomness.
//!
//! # Model-Based Testing
//!
//! The `model` module provides a reference room. Operations are applied to
//! both the model and the real controller, and their observable states are
//! compared.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod model;
pub mod scenario;
pub mod sim_env;
pub mod world;

pub use model::{IdMap, ModelRoom, ObservableState, Operation, OperationResult};
pub use scenario::{Oracle, Scenario, Step};
pub use sim_env::SimEnv;
pub use world::{SimController, SimWorld};
