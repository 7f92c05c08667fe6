//! [`Environment`] backed by the OS clock, tokio timers and `getrandom`.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use huddle_core::Environment;

/// Wall-clock environment for the running client.
///
/// Randomness only feeds identity suffixes, so if the OS source fails the
/// bytes are derived from the clock instead.
#[derive(Clone, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        if let Err(e) = getrandom::fill(buffer) {
            tracing::error!("getrandom failed, deriving suffix bytes from the clock: {}", e);
            let nanos = SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |d| d.subsec_nanos());
            clock_bytes(nanos, buffer);
        }
    }
}

fn clock_bytes(nanos: u32, buffer: &mut [u8]) {
    let seed = nanos.to_le_bytes();
    let mut step = 0u8;
    for (byte, source) in buffer.iter_mut().zip(seed.iter().cycle()) {
        *byte = source.wrapping_add(step);
        step = step.wrapping_add(1);
    }
}
