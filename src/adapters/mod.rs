//! Adapters - Implementations of port interfaces.
//!
//! - `InMemoryRateLimiter` - single-process, in-memory admission control

mod in_memory;

pub use in_memory::InMemoryRateLimiter;
