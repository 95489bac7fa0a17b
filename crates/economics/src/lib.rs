//! Curation Economics Module
//!
//! Integer-only math behind the curation protocol:
//! - WAD fixed-point (`10^18 == 1.0`) helpers with a wide `mul_div`
//! - `ln`/`exp` approximations and fractional powers
//! - Bancor-style bonding-curve purchase and sale returns
//! - Cobb-Douglas rebate split

pub mod bonding_curve;
pub mod cobb_douglas;
pub mod errors;
pub mod fixed;

pub use bonding_curve::*;
pub use cobb_douglas::*;
pub use errors::*;
pub use fixed::*;

/// Module version for API introspection
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
