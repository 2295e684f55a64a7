//! Clock abstraction behind the refill computation.
//!
//! Buckets refill based on elapsed time between inspections. Production code
//! uses the monotonic [`SystemClock`]; tests drive refill deterministically
//! with a [`ManualClock`] instead of sleeping.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Source of clock readings for refill computations.
///
/// Readings are durations since an arbitrary fixed origin; only differences
/// between readings are meaningful.
pub trait Clock: Send + Sync + Debug {
    /// Current reading.
    fn now(&self) -> Duration;
}

/// Monotonic clock backed by [`Instant`].
///
/// Immune to system-clock adjustments, so elapsed time between readings
/// never goes backward.
#[derive(Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Creates a clock whose origin is the moment of construction.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Manually advanced clock for tests.
///
/// Starts at zero and moves only when told to, so refill scenarios can be
/// stepped through exactly.
#[derive(Debug, Default)]
pub struct ManualClock {
    nanos: AtomicU64,
}

impl ManualClock {
    /// Creates a clock reading zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances the clock by an arbitrary duration.
    pub fn advance(&self, by: Duration) {
        self.nanos.fetch_add(by.as_nanos() as u64, Ordering::SeqCst);
    }

    /// Advances the clock by whole seconds.
    pub fn advance_secs(&self, secs: u64) {
        self.advance(Duration::from_secs(secs));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }
}
