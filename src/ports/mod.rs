//! Ports - Interfaces between the admission-control domain and its hosts.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `RateLimiter` - per-identity admission control for upstream calls

mod rate_limiter;

pub use rate_limiter::{Admission, BucketStatus, RateLimitError, RateLimiter};
