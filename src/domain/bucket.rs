//! Token bucket for a single identity.

use std::time::Duration;

use crate::config::RateLimitConfig;

/// Continuously refilling token balance for one identity.
///
/// The balance is real-valued: fractional tokens accrue between calls, so
/// closely spaced requests observe gradual progress instead of integer jumps.
/// The balance always stays within `[0, capacity]`.
///
/// A bucket is not synchronized on its own; the in-memory adapter wraps each
/// bucket in its own mutex and holds it across [`consume`](Self::consume).
#[derive(Debug)]
pub struct TokenBucket {
    /// Ceiling for `tokens`, copied from the tier's `burst`.
    capacity: f64,
    /// Current balance.
    tokens: f64,
    /// Refill velocity, `rate / period_secs` tokens per second.
    refill_per_sec: f64,
    /// Clock reading at the last refill computation.
    last_update: Duration,
}

impl TokenBucket {
    /// Creates a full bucket from a tier config.
    ///
    /// Starting full means the first burst from a fresh identity never
    /// starves.
    pub fn new(config: &RateLimitConfig, now: Duration) -> Self {
        let capacity = f64::from(config.burst);
        Self {
            capacity,
            tokens: capacity,
            refill_per_sec: f64::from(config.rate) / f64::from(config.period_secs),
            last_update: now,
        }
    }

    /// Attempts to spend `cost` tokens at clock reading `now`.
    ///
    /// Refills first, then admits iff the refreshed balance covers `cost`.
    /// On admission the balance drops by exactly `cost`; on denial it keeps
    /// its post-refill value. `last_update` advances on every call, admitted
    /// or denied. A `cost` above `capacity` can never be admitted.
    pub fn consume(&mut self, cost: u32, now: Duration) -> bool {
        self.tokens = self.refilled(now);
        self.last_update = now;

        let cost = f64::from(cost);
        if self.tokens >= cost {
            self.tokens -= cost;
            true
        } else {
            false
        }
    }

    /// Balance a refill would produce at `now`, without mutating state.
    pub fn peek(&self, now: Duration) -> f64 {
        self.refilled(now)
    }

    /// Current balance as of the last refill computation.
    pub fn tokens(&self) -> f64 {
        self.tokens
    }

    /// Capacity ceiling (the tier's burst).
    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    /// Clock reading at the last refill computation.
    pub fn last_update(&self) -> Duration {
        self.last_update
    }

    fn refilled(&self, now: Duration) -> f64 {
        // saturating_sub clamps a backward clock reading to zero elapsed
        // time, so clock skew never drains the balance.
        let elapsed = now.saturating_sub(self.last_update);
        (self.tokens + elapsed.as_secs_f64() * self.refill_per_sec).min(self.capacity)
    }
}
