//! Bancor-style constant reserve ratio bonding curve
//!
//! For a pool holding `supply` shares against `reserve` tokens with reserve
//! ratio `r` (parts per million):
//!
//! - depositing `d` tokens mints `supply * ((1 + d / reserve)^r - 1)` shares
//! - burning `s` shares releases `reserve * (1 - (1 - s / supply)^(1 / r))` tokens
//!
//! Both functions expect an initialized pool; bootstrapping an empty pool is
//! the caller's concern.

use crate::errors::{MathError, MathResult};
use crate::fixed::{exp_wad, ln_wad, mul_div, mul_wad, mul_wad_signed, pow_wad, EXP_MAX_WAD, WAD};
use curation_types::MAX_PPM;

fn check_pool(supply: u128, reserve: u128, ratio_ppm: u32) -> MathResult<()> {
    if supply == 0 || reserve == 0 {
        return Err(MathError::Domain("bonding curve on an empty pool"));
    }
    if ratio_ppm == 0 || ratio_ppm > MAX_PPM {
        return Err(MathError::Domain("reserve ratio outside (0, 1]"));
    }
    Ok(())
}

/// Shares minted for depositing `deposit` tokens
pub fn purchase_return(
    supply: u128,
    reserve: u128,
    ratio_ppm: u32,
    deposit: u128,
) -> MathResult<u128> {
    check_pool(supply, reserve, ratio_ppm)?;
    if deposit == 0 {
        return Ok(0);
    }
    if ratio_ppm == MAX_PPM {
        return mul_div(supply, deposit, reserve);
    }

    let grown = reserve
        .checked_add(deposit)
        .ok_or(MathError::Overflow("purchase_return"))?;
    let exponent = mul_div(ratio_ppm as u128, WAD, MAX_PPM as u128)?;
    match purchase_return_wad(supply, reserve, grown, exponent) {
        Err(MathError::Overflow(_)) => purchase_return_ln(supply, reserve, grown, exponent),
        result => result,
    }
}

/// Growth factor `grown / reserve` held as a WAD
fn purchase_return_wad(supply: u128, reserve: u128, grown: u128, exponent: u128) -> MathResult<u128> {
    let base = mul_div(grown, WAD, reserve)?;
    let factor = pow_wad(base, exponent)?;
    let new_supply = mul_wad(supply, factor)?;
    Ok(new_supply.saturating_sub(supply))
}

/// Log-domain pricing for growth factors past the WAD range, e.g. a large
/// deposit into a pool holding a handful of base units.
///
/// Plain amounts fed to `ln_wad` read as WADs, so
/// `exp(ln(supply) + r * (ln(grown) - ln(reserve)))` lands in base units.
fn purchase_return_ln(supply: u128, reserve: u128, grown: u128, exponent: u128) -> MathResult<u128> {
    let growth = ln_wad(grown)? - ln_wad(reserve)?;
    let ln_new_supply = ln_wad(supply)? + mul_wad_signed(growth, exponent)?;
    if ln_new_supply > EXP_MAX_WAD {
        return Err(MathError::Overflow("purchase_return"));
    }
    let new_supply = exp_wad(ln_new_supply)?;
    Ok(new_supply.saturating_sub(supply))
}

/// Tokens released for burning `amount` shares
pub fn sale_return(supply: u128, reserve: u128, ratio_ppm: u32, amount: u128) -> MathResult<u128> {
    check_pool(supply, reserve, ratio_ppm)?;
    if amount > supply {
        return Err(MathError::Domain("sale larger than supply"));
    }
    if amount == 0 {
        return Ok(0);
    }
    if amount == supply {
        return Ok(reserve);
    }
    if ratio_ppm == MAX_PPM {
        return mul_div(reserve, amount, supply);
    }

    let base = mul_div(supply - amount, WAD, supply)?;
    let exponent = mul_div(MAX_PPM as u128, WAD, ratio_ppm as u128)?;
    let factor = pow_wad(base, exponent)?;
    mul_div(reserve, WAD - factor.min(WAD), WAD)
}

#[cfg(test)]
mod tests {
    use super::*;
    use curation_types::tokens;

    const HALF: u32 = 500_000;

    #[test]
    fn test_linear_curve_is_proportional() {
        let minted = purchase_return(tokens(100), tokens(50), MAX_PPM, tokens(25)).unwrap();
        assert_eq!(minted, tokens(50));
        let released = sale_return(tokens(150), tokens(75), MAX_PPM, tokens(50)).unwrap();
        assert_eq!(released, tokens(25));
    }

    #[test]
    fn test_half_ratio_purchase() {
        // 10 shares over 10 tokens; depositing 90 grows reserve 10x -> supply * sqrt(10)
        let minted = purchase_return(tokens(10), tokens(10), HALF, tokens(90)).unwrap();
        assert_eq!(minted, 21_622_776_601_683_793_320);
    }

    #[test]
    fn test_half_ratio_sale_squares() {
        // burning half the supply at r = 0.5 leaves (1/2)^2 of the reserve
        let released = sale_return(tokens(10), tokens(100), HALF, tokens(5)).unwrap();
        assert_eq!(released, tokens(75));
    }

    #[test]
    fn test_full_sale_returns_reserve() {
        let reserve = 123_456_789_012_345_678_901;
        assert_eq!(sale_return(tokens(3), reserve, 333_333, tokens(3)).unwrap(), reserve);
    }

    #[test]
    fn test_zero_amounts() {
        assert_eq!(purchase_return(tokens(1), tokens(1), HALF, 0).unwrap(), 0);
        assert_eq!(sale_return(tokens(1), tokens(1), HALF, 0).unwrap(), 0);
    }

    #[test]
    fn test_rejects_empty_pool_and_bad_ratio() {
        assert!(purchase_return(0, 0, HALF, tokens(1)).is_err());
        assert!(sale_return(tokens(1), 0, HALF, 1).is_err());
        assert!(purchase_return(tokens(1), tokens(1), 0, tokens(1)).is_err());
        assert!(purchase_return(tokens(1), tokens(1), MAX_PPM + 1, tokens(1)).is_err());
        assert!(sale_return(tokens(1), tokens(1), HALF, tokens(2)).is_err());
    }

    #[test]
    fn test_purchase_into_dust_reserve() {
        // 10^21 growth does not fit a WAD; sqrt(10^21 + 1) - 1 shares
        let minted = purchase_return(1, 1, HALF, tokens(1_000)).unwrap();
        assert!(minted.abs_diff(31_622_776_600) <= 10, "minted={minted}");

        let minted = purchase_return(1, 1, 999_999, tokens(1_000)).unwrap();
        assert!(minted > tokens(999) && minted < tokens(1_000), "minted={minted}");

        assert!(purchase_return(tokens(1_000_000), 1, 900_000, u128::MAX / 2).is_err());
    }

    #[test]
    fn test_log_domain_matches_wad_pricing() {
        let exponent = 3 * WAD / 10;
        let grown = tokens(100);
        let direct = purchase_return_wad(tokens(10), tokens(10), grown, exponent).unwrap();
        let logged = purchase_return_ln(tokens(10), tokens(10), grown, exponent).unwrap();
        assert!(direct.abs_diff(logged) <= direct / 1_000_000_000_000, "{direct} vs {logged}");
    }

    #[test]
    fn test_sale_inverts_purchase() {
        for ratio in [100_000u32, 250_000, HALF, 800_000] {
            let supply = tokens(40);
            let reserve = tokens(25);
            let deposit = tokens(7);
            let minted = purchase_return(supply, reserve, ratio, deposit).unwrap();
            let back = sale_return(supply + minted, reserve + deposit, ratio, minted).unwrap();
            let drift = back.abs_diff(deposit);
            assert!(drift < 1_000_000, "ratio={ratio} drift={drift}");
        }
    }
}
