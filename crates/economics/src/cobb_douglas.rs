//! Cobb-Douglas rebate split
//!
//! `reward = total_rewards * (fees / total_fees)^α * (stake / total_stake)^(1 - α)`
//! with `α = numerator / denominator`.

use crate::errors::{MathError, MathResult};
use crate::fixed::{exp_wad, ln_wad, mul_div, mul_wad, mul_wad_signed, WAD};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Cobb-Douglas exponent `α` as a ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebateRatio {
    pub numerator: u32,
    pub denominator: u32,
}

impl RebateRatio {
    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// `0 <= α <= 1` with a non-zero denominator
    pub fn is_valid(&self) -> bool {
        self.denominator > 0 && self.numerator <= self.denominator
    }

    /// α as a WAD
    pub fn alpha_wad(&self) -> MathResult<u128> {
        mul_div(self.numerator as u128, WAD, self.denominator as u128)
    }
}

impl Default for RebateRatio {
    fn default() -> Self {
        Self::new(77, 100)
    }
}

impl fmt::Display for RebateRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// Share of `total_rewards` owed to a participant contributing `fees` out of
/// `total_fees` and `stake` out of `total_stake`.
///
/// Zero fees, zero stake or zero `total_fees` yield zero. `α == 1` and
/// `α == 0` are exact proportional splits.
pub fn cobb_douglas(
    total_rewards: u128,
    fees: u128,
    total_fees: u128,
    stake: u128,
    total_stake: u128,
    ratio: RebateRatio,
) -> MathResult<u128> {
    if !ratio.is_valid() {
        return Err(MathError::Domain("cobb-douglas alpha outside [0, 1]"));
    }
    if total_rewards == 0 || total_fees == 0 || fees == 0 || stake == 0 {
        return Ok(0);
    }
    if ratio.numerator == ratio.denominator {
        return mul_div(total_rewards, fees, total_fees);
    }
    if total_stake == 0 {
        return Ok(0);
    }
    if ratio.numerator == 0 {
        return mul_div(total_rewards, stake, total_stake);
    }

    let fee_share = mul_div(fees, WAD, total_fees)?;
    let stake_share = mul_div(stake, WAD, total_stake)?;
    if fee_share == 0 || stake_share == 0 {
        return Ok(0);
    }

    let alpha = ratio.alpha_wad()?;
    let weighted = mul_wad_signed(ln_wad(fee_share)?, alpha)?
        .checked_add(mul_wad_signed(ln_wad(stake_share)?, WAD - alpha)?)
        .ok_or(MathError::Overflow("cobb_douglas"))?;
    let factor = exp_wad(weighted)?;
    mul_wad(total_rewards, factor)
}
