//! Curation Time Library
//!
//! Provides the epoch clock consumed by the staking engine.
//!
//! # Features
//! - Monotonic epoch counter
//! - Manually driven clock for tests and simulations
//! - Block-driven clock with adjustable epoch length

pub mod epoch;

pub use epoch::{BlockEpochClock, EpochClock, EpochClockError, EpochSnapshot, ManualEpochClock};
