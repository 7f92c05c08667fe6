//! Environment abstraction for deterministic testing.
//!
//! The `Environment` trait decouples session logic from system resources
//! (time and randomness). Identity suffixes come from `random_bytes`, retry
//! delays are slept through `sleep`, and credential round-trips are timed
//! with `now`.
//!
//! - Deterministic Simulation: the harness provides a virtual clock and a
//!   seeded RNG, so a scenario that generated `ana-x7f2a` once generates it
//!   again on every run.
//!
//! - Production Runtime: the client crate uses the OS entropy pool and tokio
//!   timers without any change to the state machines.
//!
//! # Invariants
//!
//! - Monotonicity: `env.now()` must never go backwards
//! - Determinism: Given the same seed, `random_bytes()` produces the same
//!   sequence
//! - Isolation: Implementations must not share global state

use std::time::{Duration, Instant};

/// Abstract environment providing time, randomness, and async sleeping.
///
/// Implementations MUST guarantee:
///
/// 1. Time monotonicity: `now()` never goes backwards
/// 2. RNG quality: `random_bytes()` uses OS entropy in production
/// 3. Infallibility: methods do not fail under normal operation
pub trait Environment: Clone + Send + Sync + 'static {
    /// Returns the current time.
    fn now(&self) -> Instant;

    /// Sleeps for the specified duration.
    ///
    /// Only driver code awaits this (credential retry backoff). State machines
    /// never sleep.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;

    /// Fills the provided buffer with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);
}
