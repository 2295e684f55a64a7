//! Genlimit - Tiered token-bucket admission control
//!
//! Gates outbound calls to a costly, quota-constrained generation API on a
//! single node. The host constructs an [`InMemoryRateLimiter`], shares it by
//! `Arc`, asks [`RateLimiter::check_limit`] before every upstream call, and
//! runs [`RateLimiter::cleanup`] on a timer to reclaim idle buckets.
//!
//! ```
//! use genlimit::{Admission, InMemoryRateLimiter, RateLimiter};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), genlimit::RateLimitError> {
//! let limiter = InMemoryRateLimiter::with_defaults();
//!
//! match limiter.check_limit("alice", "pro", 1).await? {
//!     Admission::Granted => { /* call the upstream API */ }
//!     Admission::Denied => { /* answer 429; the caller retries later */ }
//! }
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;

pub use adapters::InMemoryRateLimiter;
pub use config::{RateLimitConfig, RateLimitSettings};
pub use ports::{Admission, BucketStatus, RateLimitError, RateLimiter};
