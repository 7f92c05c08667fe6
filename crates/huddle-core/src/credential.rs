//! Credential bookkeeping.
//!
//! The broker never performs I/O. It hands out [`CredentialRequest`]s tagged
//! with a generation, and only accepts a response whose generation is still
//! current. Submitting a new identity or shutting down bumps the generation,
//! so a slow response for an old name can never mount the room.

use std::{
    fmt,
    time::{Duration, Instant},
};

use crate::identity::Identity;

/// Opaque join token scoped to one room and identity. Never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a token string.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token for the transport.
    pub fn token(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// One credential exchange for the driver to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRequest {
    /// Room to join.
    pub room: String,
    /// Identity to bind the token to.
    pub identity: Identity,
    /// Generation the response must echo.
    pub generation: u64,
    /// 1-based attempt number within this generation.
    pub attempt: u32,
}

/// What to do when a credential exchange fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CredentialRetry {
    /// Stay on the loading view. The room is never entered.
    #[default]
    Never,

    /// Retry with a doubling delay.
    Backoff {
        /// Total attempts including the first.
        max_attempts: u32,
        /// Delay before the second attempt.
        initial_backoff: Duration,
    },
}

impl CredentialRetry {
    /// Delay before attempt `attempt + 1`, or `None` when out of attempts.
    pub fn delay_after(self, attempt: u32) -> Option<Duration> {
        match self {
            Self::Never => None,
            Self::Backoff { max_attempts, initial_backoff } => {
                if attempt >= max_attempts {
                    return None;
                }
                let doublings = attempt.saturating_sub(1).min(16);
                Some(initial_backoff.saturating_mul(1_u32 << doublings))
            },
        }
    }
}

/// Outcome of a failed exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// Response belonged to an older generation.
    Stale,
    /// Try again after `delay`.
    RetryAfter(Duration),
    /// Out of attempts.
    GiveUp,
}

#[derive(Debug, Clone)]
struct InFlight {
    request: CredentialRequest,
    started_at: Instant,
}

/// Tracks the single in-flight credential exchange.
#[derive(Debug, Clone)]
pub struct CredentialBroker {
    room: String,
    retry: CredentialRetry,
    generation: u64,
    in_flight: Option<InFlight>,
    credential: Option<Credential>,
}

impl CredentialBroker {
    /// Create a broker for `room`.
    pub fn new(room: impl Into<String>, retry: CredentialRetry) -> Self {
        Self { room: room.into(), retry, generation: 0, in_flight: None, credential: None }
    }

    /// Room credentials are requested for.
    pub fn room(&self) -> &str {
        &self.room
    }

    /// Current generation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Credential for the current generation, once issued.
    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    /// Whether a request is outstanding.
    pub fn is_pending(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Start a new exchange for `identity`, superseding anything before it.
    ///
    /// Returns the generation of a superseded in-flight request, if any, and
    /// the new request.
    pub fn begin(&mut self, identity: Identity, now: Instant) -> (Option<u64>, CredentialRequest) {
        let superseded = self.invalidate();
        let request = CredentialRequest {
            room: self.room.clone(),
            identity,
            generation: self.generation,
            attempt: 1,
        };
        self.in_flight = Some(InFlight { request: request.clone(), started_at: now });
        (superseded, request)
    }

    /// Accept a token for `generation`. Returns how long the exchange took, or
    /// `None` if the generation is stale.
    pub fn issue(&mut self, generation: u64, credential: Credential, now: Instant) -> Option<Duration> {
        let in_flight = self.take_current(generation)?;
        self.credential = Some(credential);
        Some(now.saturating_duration_since(in_flight.started_at))
    }

    /// Record a failure for `generation`.
    pub fn fail(&mut self, generation: u64) -> FailureOutcome {
        let Some(in_flight) = self.in_flight.as_ref().filter(|f| f.request.generation == generation)
        else {
            return FailureOutcome::Stale;
        };

        match self.retry.delay_after(in_flight.request.attempt) {
            Some(delay) => FailureOutcome::RetryAfter(delay),
            None => {
                self.in_flight = None;
                FailureOutcome::GiveUp
            },
        }
    }

    /// Build the next attempt for `generation` after a scheduled delay.
    pub fn retry(&mut self, generation: u64, now: Instant) -> Option<CredentialRequest> {
        let in_flight = self.in_flight.as_mut().filter(|f| f.request.generation == generation)?;
        in_flight.request.attempt += 1;
        in_flight.started_at = now;
        Some(in_flight.request.clone())
    }

    /// Drop the credential and any in-flight request. Returns the generation
    /// of the cancelled request, if one was outstanding.
    pub fn invalidate(&mut self) -> Option<u64> {
        self.generation += 1;
        self.credential = None;
        self.in_flight.take().map(|f| f.request.generation)
    }

    fn take_current(&mut self, generation: u64) -> Option<InFlight> {
        if self.in_flight.as_ref().is_some_and(|f| f.request.generation == generation) {
            self.in_flight.take()
        } else {
            None
        }
    }
}
