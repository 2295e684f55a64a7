//! Domain layer: pure admission-control logic.
//!
//! # Module Organization
//!
//! - `bucket` - refilling token balance for one identity
//! - `clock` - time source behind the refill computation

mod bucket;
mod clock;

pub use bucket::TokenBucket;
pub use clock::{Clock, ManualClock, SystemClock};
