//! Token amount unit
//!
//! Token and share quantities are fixed-point integers with 18 decimal
//! places. 1 token = 10^18 base units.

use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;

/// Token (or share) amount in base units
pub type TokenAmount = u128;

/// Number of decimal places carried by every amount
pub const TOKEN_DECIMALS: u32 = 18;

/// Conversion factor: 1 token = 10^18 base units
pub const TOKEN_UNIT: TokenAmount = 10u128.pow(TOKEN_DECIMALS);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("amount must not be negative: {0}")]
    Negative(Decimal),
    #[error("amount {0} has more than 18 decimal places")]
    TooPrecise(Decimal),
    #[error("amount out of range: {0}")]
    OutOfRange(String),
    #[error("invalid amount literal: {0}")]
    Parse(String),
}

/// Whole tokens to base units (saturating)
#[inline]
pub const fn tokens(whole: u128) -> TokenAmount {
    whole.saturating_mul(TOKEN_UNIT)
}

/// Base units to a decimal token amount for display
pub fn to_decimal(amount: TokenAmount) -> Result<Decimal, AmountError> {
    let signed =
        i128::try_from(amount).map_err(|_| AmountError::OutOfRange(amount.to_string()))?;
    Decimal::try_from_i128_with_scale(signed, TOKEN_DECIMALS)
        .map_err(|_| AmountError::OutOfRange(amount.to_string()))
}

/// Decimal token amount to base units
pub fn parse_tokens(value: Decimal) -> Result<TokenAmount, AmountError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(AmountError::Negative(value));
    }
    let normalized = value.normalize();
    let scale = normalized.scale();
    if scale > TOKEN_DECIMALS {
        return Err(AmountError::TooPrecise(value));
    }
    let mantissa = normalized.mantissa().unsigned_abs();
    mantissa
        .checked_mul(10u128.pow(TOKEN_DECIMALS - scale))
        .ok_or_else(|| AmountError::OutOfRange(value.to_string()))
}

/// Parse a decimal literal such as `"12.5"` into base units
pub fn parse_tokens_str(literal: &str) -> Result<TokenAmount, AmountError> {
    let value =
        Decimal::from_str(literal.trim()).map_err(|e| AmountError::Parse(format!("{literal}: {e}")))?;
    parse_tokens(value)
}
