//! Curation Types
//!
//! Identifiers, the token amount unit and protocol-wide constants shared by
//! the staking engine, the rebate pool and the fixed-point math.

pub mod amounts;
pub mod ids;

pub use amounts::*;
pub use ids::*;

/// Protocol epoch, advanced externally by the epoch clock
pub type Epoch = u64;

/// Denominator for every ratio expressed in parts per million.
/// Reserve ratios and the staking tax both use it (1_000_000 = 100%).
pub const MAX_PPM: u32 = 1_000_000;
