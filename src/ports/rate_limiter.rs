//! Rate limiting port for protecting a quota-constrained upstream API.
//!
//! The port answers a single question per request: may this caller spend
//! `cost` tokens right now? Running out of tokens is a routine outcome, not
//! a fault, so the decision is an [`Admission`] value rather than an error.

use async_trait::async_trait;

/// Port for admission control keyed by caller identity.
///
/// Implementations must be thread-safe and support many concurrent callers.
/// Checks on distinct keys must not contend with each other.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Check whether `key` may spend `cost` tokens now, spending them if so.
    ///
    /// A key seen for the first time gets a fresh, full bucket built from
    /// `tier`'s configuration; unknown tier names fall back to the default
    /// tier. For a key that already has a bucket the `tier` argument is
    /// ignored: limits are fixed at bucket creation and change only once the
    /// bucket is reclaimed or reset.
    ///
    /// The decision is immediate; there is no internal queueing or waiting
    /// for refill. A denied caller retries on its own schedule.
    async fn check_limit(
        &self,
        key: &str,
        tier: &str,
        cost: u32,
    ) -> Result<Admission, RateLimitError>;

    /// Current status of `key`'s bucket without spending or refreshing it.
    ///
    /// Returns `None` for a key with no live bucket. Useful for displaying
    /// quota information to users.
    async fn status(&self, key: &str) -> Option<BucketStatus>;

    /// Drop `key`'s bucket so its next request starts a fresh one (admin
    /// operation; also the only way a tier change takes effect early).
    ///
    /// Returns whether a bucket existed.
    async fn reset(&self, key: &str) -> bool;

    /// Reclaim buckets idle longer than the configured TTL.
    ///
    /// Idempotent; the host calls this periodically (e.g. on a timer every
    /// few minutes) to bound memory growth from rotating identities.
    /// Returns the number of buckets removed.
    async fn cleanup(&self) -> usize;
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The caller may proceed; `cost` tokens were spent.
    Granted,
    /// Insufficient balance; the caller should reject or defer the request.
    /// No retry hint is computed here: producing a 429 and any `Retry-After`
    /// is the host's concern.
    Denied,
}

impl Admission {
    /// Returns true if the request was admitted.
    pub fn is_granted(&self) -> bool {
        matches!(self, Admission::Granted)
    }

    /// Returns true if the request was denied.
    pub fn is_denied(&self) -> bool {
        matches!(self, Admission::Denied)
    }
}

/// Point-in-time view of one identity's bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketStatus {
    /// Balance a refill would produce right now.
    pub tokens: f64,
    /// Capacity ceiling (the tier's burst).
    pub capacity: f64,
}

/// Errors from caller misuse. Insufficient balance is never an error.
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    /// A zero cost is a caller bug: admitting it would be a no-op that
    /// still refreshes the bucket clock.
    #[error("cost must be positive")]
    ZeroCost,
}
