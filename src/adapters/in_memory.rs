//! In-memory rate limiter implementation.
//!
//! Token-bucket admission control for a single process: one bucket per
//! identity key, tier limits fixed at bucket creation, idle buckets
//! reclaimed by `cleanup`. Not suitable for multi-server deployments.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::config::RateLimitSettings;
use crate::domain::{Clock, SystemClock, TokenBucket};
use crate::ports::{Admission, BucketStatus, RateLimitError, RateLimiter};

type BucketMap = HashMap<String, Arc<Mutex<TokenBucket>>>;

/// In-memory, single-node implementation of the [`RateLimiter`] port.
///
/// Each bucket sits behind its own mutex, so heavy traffic on one identity
/// never stalls another. The map lock is held only for lookup and insertion,
/// never across a balance update.
#[derive(Debug)]
pub struct InMemoryRateLimiter {
    /// Tier table and service knobs.
    settings: RateLimitSettings,
    /// Per-key bucket state.
    buckets: RwLock<BucketMap>,
    /// Time source for refill and idle-age computations.
    clock: Arc<dyn Clock>,
}

impl InMemoryRateLimiter {
    /// Create a limiter over the given settings.
    pub fn new(settings: RateLimitSettings) -> Self {
        Self::with_clock(settings, Arc::new(SystemClock::new()))
    }

    /// Create a limiter with the built-in tier table.
    pub fn with_defaults() -> Self {
        Self::new(RateLimitSettings::default())
    }

    /// Create a limiter driven by an explicit clock.
    ///
    /// Tests pair this with [`ManualClock`](crate::domain::ManualClock) to
    /// step through refill scenarios deterministically.
    pub fn with_clock(settings: RateLimitSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            settings,
            buckets: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Number of live buckets. Exposed for host metrics and tests.
    pub async fn bucket_count(&self) -> usize {
        self.buckets.read().await.len()
    }

    /// Resolve the bucket for `key`, creating it from `tier`'s config on
    /// first sight.
    async fn bucket_for(&self, key: &str, tier: &str) -> Arc<Mutex<TokenBucket>> {
        if let Some(bucket) = self.buckets.read().await.get(key) {
            return Arc::clone(bucket);
        }

        let mut buckets = self.buckets.write().await;
        // Re-check under the write lock: a concurrent first request for the
        // same key may have created the bucket already, and only one may win.
        if let Some(bucket) = buckets.get(key) {
            return Arc::clone(bucket);
        }

        if !self.settings.tiers.contains_key(tier) {
            warn!(
                tier,
                fallback = %self.settings.default_tier,
                "unknown tier, using fallback"
            );
        }
        let config = self.settings.config_for_tier(tier);
        debug!(key, tier, burst = config.burst, "creating bucket");
        let bucket = Arc::new(Mutex::new(TokenBucket::new(config, self.clock.now())));
        buckets.insert(key.to_string(), Arc::clone(&bucket));
        bucket
    }
}

#[async_trait]
impl RateLimiter for InMemoryRateLimiter {
    async fn check_limit(
        &self,
        key: &str,
        tier: &str,
        cost: u32,
    ) -> Result<Admission, RateLimitError> {
        if cost == 0 {
            return Err(RateLimitError::ZeroCost);
        }

        let bucket = self.bucket_for(key, tier).await;
        let admitted = bucket.lock().await.consume(cost, self.clock.now());

        Ok(if admitted {
            Admission::Granted
        } else {
            Admission::Denied
        })
    }

    async fn status(&self, key: &str) -> Option<BucketStatus> {
        let bucket = {
            let buckets = self.buckets.read().await;
            Arc::clone(buckets.get(key)?)
        };
        let bucket = bucket.lock().await;

        Some(BucketStatus {
            tokens: bucket.peek(self.clock.now()),
            capacity: bucket.capacity(),
        })
    }

    async fn reset(&self, key: &str) -> bool {
        self.buckets.write().await.remove(key).is_some()
    }

    async fn cleanup(&self) -> usize {
        let now = self.clock.now();
        let idle_ttl = Duration::from_secs(self.settings.idle_ttl_secs);

        let mut buckets = self.buckets.write().await;
        let mut idle = Vec::new();
        for (key, bucket) in buckets.iter() {
            // Taking the bucket mutex under the map write lock means the
            // sweep cannot race an in-flight consume on the same bucket.
            let last_update = bucket.lock().await.last_update();
            if now.saturating_sub(last_update) > idle_ttl {
                idle.push(key.clone());
            }
        }
        for key in &idle {
            buckets.remove(key);
        }

        if !idle.is_empty() {
            debug!(reclaimed = idle.len(), "cleanup removed idle buckets");
        }
        idle.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RateLimitConfig;
    use crate::domain::ManualClock;

    fn limiter_with_manual_clock() -> (InMemoryRateLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let limiter =
            InMemoryRateLimiter::with_clock(RateLimitSettings::default(), clock.clone());
        (limiter, clock)
    }

    // ─── Admission ────────────────────────────────────────────────────

    #[tokio::test]
    async fn fresh_key_gets_full_burst() {
        let (limiter, _clock) = limiter_with_manual_clock();

        // Pro tier: burst 60, all spendable immediately.
        for i in 0..60 {
            let admission = limiter.check_limit("bob", "pro", 1).await.unwrap();
            assert!(admission.is_granted(), "request {} should be granted", i + 1);
        }
        let admission = limiter.check_limit("bob", "pro", 1).await.unwrap();
        assert!(admission.is_denied());
    }

    #[tokio::test]
    async fn multi_token_cost_spends_in_one_call() {
        let (limiter, _clock) = limiter_with_manual_clock();

        assert!(limiter
            .check_limit("bob", "pro", 60)
            .await
            .unwrap()
            .is_granted());
        assert!(limiter
            .check_limit("bob", "pro", 1)
            .await
            .unwrap()
            .is_denied());
    }

    #[tokio::test]
    async fn zero_cost_is_rejected() {
        let (limiter, _clock) = limiter_with_manual_clock();

        let result = limiter.check_limit("bob", "free", 0).await;
        assert!(matches!(result, Err(RateLimitError::ZeroCost)));
    }

    #[tokio::test]
    async fn unknown_tier_behaves_like_default() {
        let (limiter, _clock) = limiter_with_manual_clock();

        // Free tier burst is 10.
        for _ in 0..10 {
            assert!(limiter
                .check_limit("x", "unknown_tier", 1)
                .await
                .unwrap()
                .is_granted());
        }
        assert!(limiter
            .check_limit("x", "unknown_tier", 1)
            .await
            .unwrap()
            .is_denied());
    }

    #[tokio::test]
    async fn different_keys_have_independent_buckets() {
        let (limiter, _clock) = limiter_with_manual_clock();

        for _ in 0..10 {
            limiter.check_limit("alice", "free", 1).await.unwrap();
        }
        assert!(limiter
            .check_limit("alice", "free", 1)
            .await
            .unwrap()
            .is_denied());

        assert!(limiter
            .check_limit("carol", "free", 1)
            .await
            .unwrap()
            .is_granted());
    }

    #[tokio::test]
    async fn tier_argument_is_ignored_for_existing_bucket() {
        let (limiter, _clock) = limiter_with_manual_clock();

        // Bucket created as free (burst 10). A later studio call does not
        // widen its limits.
        assert!(limiter
            .check_limit("dave", "free", 10)
            .await
            .unwrap()
            .is_granted());
        assert!(limiter
            .check_limit("dave", "studio", 1)
            .await
            .unwrap()
            .is_denied());
    }

    #[tokio::test]
    async fn refill_grants_again_after_wait() {
        let (limiter, clock) = limiter_with_manual_clock();

        assert!(limiter
            .check_limit("erin", "free", 10)
            .await
            .unwrap()
            .is_granted());
        assert!(limiter
            .check_limit("erin", "free", 1)
            .await
            .unwrap()
            .is_denied());

        // One full period refills `rate` tokens.
        clock.advance_secs(60);
        assert!(limiter
            .check_limit("erin", "free", 5)
            .await
            .unwrap()
            .is_granted());
    }

    // ─── Status and reset ─────────────────────────────────────────────

    #[tokio::test]
    async fn status_of_unknown_key_is_none() {
        let (limiter, _clock) = limiter_with_manual_clock();
        assert!(limiter.status("nobody").await.is_none());
    }

    #[tokio::test]
    async fn status_reports_balance_without_consuming() {
        let (limiter, _clock) = limiter_with_manual_clock();

        limiter.check_limit("alice", "free", 3).await.unwrap();

        let status = limiter.status("alice").await.unwrap();
        assert_eq!(status.tokens, 7.0);
        assert_eq!(status.capacity, 10.0);

        // A second look sees the same balance.
        let status = limiter.status("alice").await.unwrap();
        assert_eq!(status.tokens, 7.0);
    }

    #[tokio::test]
    async fn reset_drops_the_bucket() {
        let (limiter, _clock) = limiter_with_manual_clock();

        assert!(limiter
            .check_limit("alice", "free", 10)
            .await
            .unwrap()
            .is_granted());
        assert!(limiter.reset("alice").await);
        assert!(!limiter.reset("alice").await);

        // Recreated bucket starts full again.
        assert!(limiter
            .check_limit("alice", "free", 10)
            .await
            .unwrap()
            .is_granted());
    }

    // ─── Cleanup ──────────────────────────────────────────────────────

    #[tokio::test]
    async fn cleanup_removes_only_idle_buckets() {
        let (limiter, clock) = limiter_with_manual_clock();

        limiter.check_limit("stale", "free", 1).await.unwrap();
        clock.advance_secs(3000);
        limiter.check_limit("fresh", "free", 1).await.unwrap();
        clock.advance_secs(601);

        // "stale" is 3601s idle, "fresh" only 601s.
        assert_eq!(limiter.cleanup().await, 1);
        assert!(limiter.status("stale").await.is_none());
        assert!(limiter.status("fresh").await.is_some());
    }

    #[tokio::test]
    async fn cleanup_spares_buckets_at_the_threshold() {
        let (limiter, clock) = limiter_with_manual_clock();

        limiter.check_limit("edge", "free", 1).await.unwrap();
        clock.advance_secs(3600);

        // Exactly at the TTL is not "more than" the TTL.
        assert_eq!(limiter.cleanup().await, 0);
        assert_eq!(limiter.bucket_count().await, 1);
    }

    #[tokio::test]
    async fn cleanup_is_idempotent() {
        let (limiter, clock) = limiter_with_manual_clock();

        limiter.check_limit("stale", "free", 1).await.unwrap();
        clock.advance_secs(4000);

        assert_eq!(limiter.cleanup().await, 1);
        assert_eq!(limiter.cleanup().await, 0);
        assert_eq!(limiter.bucket_count().await, 0);
    }

    #[tokio::test]
    async fn denied_request_still_refreshes_idle_age() {
        let mut settings = RateLimitSettings::default();
        // Slow tier: 3500s of refill stays below one token.
        settings
            .tiers
            .insert("slow".to_string(), RateLimitConfig::new(1, 7200, 10));
        let clock = Arc::new(ManualClock::new());
        let limiter = InMemoryRateLimiter::with_clock(settings, clock.clone());

        limiter.check_limit("alice", "slow", 10).await.unwrap();
        clock.advance_secs(3500);

        // Denied, but the bucket clock resets on every inspection.
        assert!(limiter
            .check_limit("alice", "slow", 1)
            .await
            .unwrap()
            .is_denied());
        clock.advance_secs(3500);

        assert_eq!(limiter.cleanup().await, 0);
        assert_eq!(limiter.bucket_count().await, 1);
    }

    #[tokio::test]
    async fn custom_settings_are_honored() {
        let mut settings = RateLimitSettings::default();
        settings
            .tiers
            .insert("tiny".to_string(), RateLimitConfig::new(1, 1, 2));
        let limiter = InMemoryRateLimiter::new(settings);

        assert!(limiter
            .check_limit("k", "tiny", 2)
            .await
            .unwrap()
            .is_granted());
        assert!(limiter.check_limit("k", "tiny", 2).await.unwrap().is_denied());
    }
}
