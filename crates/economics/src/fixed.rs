//! WAD fixed-point arithmetic
//!
//! Values are `u128` scaled by `10^18`; logarithms are signed (`i128`).
//! `ln_wad` and `exp_wad` are accurate to a few tens of base units over their
//! whole range, which is well below the 18-decimal resolution of token
//! amounts at any realistic pool size.

use crate::errors::{MathError, MathResult};
use num_bigint::BigUint;
use num_traits::ToPrimitive;

/// Fixed-point one
pub const WAD: u128 = 1_000_000_000_000_000_000;

const WAD_I: i128 = WAD as i128;

/// ln(2) in WAD, floor of 0.693147180559945309417...
pub const LN_2_WAD: i128 = 693_147_180_559_945_309;

/// Below this argument `exp_wad` is smaller than one base unit
pub const EXP_MIN_WAD: i128 = -42 * WAD_I;

/// Largest argument whose exponential still fits a `u128` WAD
pub const EXP_MAX_WAD: i128 = 47 * WAD_I;

/// Exact `floor(a * b / d)`, widening to a big integer when `a * b` overflows.
pub fn mul_div(a: u128, b: u128, d: u128) -> MathResult<u128> {
    if d == 0 {
        return Err(MathError::DivisionByZero("mul_div"));
    }
    match a.checked_mul(b) {
        Some(product) => Ok(product / d),
        None => {
            let wide = BigUint::from(a) * BigUint::from(b) / BigUint::from(d);
            wide.to_u128().ok_or(MathError::Overflow("mul_div"))
        }
    }
}

/// `a * b` for two WAD values
#[inline]
pub fn mul_wad(a: u128, b: u128) -> MathResult<u128> {
    mul_div(a, b, WAD)
}

/// `a / b` for two WAD values
#[inline]
pub fn div_wad(a: u128, b: u128) -> MathResult<u128> {
    mul_div(a, WAD, b)
}

/// Signed WAD product `a * b` where `b` is a non-negative WAD
pub fn mul_wad_signed(a: i128, b: u128) -> MathResult<i128> {
    let magnitude = mul_div(a.unsigned_abs(), b, WAD)?;
    let magnitude = i128::try_from(magnitude).map_err(|_| MathError::Overflow("mul_wad_signed"))?;
    Ok(if a < 0 { -magnitude } else { magnitude })
}

/// Integer square root, rounded down
pub fn isqrt(n: u128) -> u128 {
    if n < 2 {
        return n;
    }
    let bits = 128 - n.leading_zeros();
    let mut x = 1u128 << bits.div_ceil(2);
    loop {
        let y = (x + n / x) / 2;
        if y >= x {
            return x;
        }
        x = y;
    }
}

/// Square root of a WAD value
pub fn sqrt_wad(x: u128) -> MathResult<u128> {
    match x.checked_mul(WAD) {
        Some(scaled) => Ok(isqrt(scaled)),
        None => (BigUint::from(x) * BigUint::from(WAD))
            .sqrt()
            .to_u128()
            .ok_or(MathError::Overflow("sqrt_wad")),
    }
}

/// Natural logarithm of a positive WAD value.
///
/// Reduces `x = y * 2^k` with `y` in `[1, 2)` and sums the `atanh` series
/// `ln(y) = 2 * (z + z^3/3 + z^5/5 + ...)`, `z = (y - 1) / (y + 1)`.
pub fn ln_wad(x: u128) -> MathResult<i128> {
    if x == 0 {
        return Err(MathError::Domain("ln of zero"));
    }
    if x == WAD {
        return Ok(0);
    }

    let mut k: i128 = 0;
    let mut y = x;
    while y >= 2 * WAD {
        y >>= 1;
        k += 1;
    }
    while y < WAD {
        y <<= 1;
        k -= 1;
    }

    // z < 1/3, so every term below stays far inside i128
    let z = ((y - WAD) * WAD / (y + WAD)) as i128;
    let z_squared = z * z / WAD_I;

    let mut term = z;
    let mut sum = 0i128;
    let mut n = 1i128;
    while term != 0 {
        sum += term / n;
        term = term * z_squared / WAD_I;
        n += 2;
    }

    Ok(k * LN_2_WAD + 2 * sum)
}

/// `e^x` for a signed WAD argument.
///
/// Reduces `x = k * ln 2 + r` with `|r| <= ln(2) / 2`, evaluates the Taylor
/// series of `e^r` and scales by `2^k`.
pub fn exp_wad(x: i128) -> MathResult<u128> {
    if x == 0 {
        return Ok(WAD);
    }
    if x < EXP_MIN_WAD {
        return Ok(0);
    }
    if x > EXP_MAX_WAD {
        return Err(MathError::Overflow("exp"));
    }

    let half = LN_2_WAD / 2;
    let k = if x >= 0 {
        (x + half) / LN_2_WAD
    } else {
        (x - half) / LN_2_WAD
    };
    let r = x - k * LN_2_WAD;

    let mut sum = WAD_I;
    let mut term = WAD_I;
    let mut i = 1i128;
    loop {
        term = term * r / WAD_I / i;
        if term == 0 {
            break;
        }
        sum += term;
        i += 1;
    }

    let reduced = sum as u128;
    if k >= 0 {
        reduced
            .checked_mul(1u128 << k)
            .ok_or(MathError::Overflow("exp"))
    } else {
        Ok(reduced >> (-k))
    }
}

/// `base^n` for a WAD base and an integer exponent
pub fn pow_wad_int(base: u128, mut n: u128) -> MathResult<u128> {
    let mut result = WAD;
    let mut power = base;
    while n > 0 {
        if n & 1 == 1 {
            result = mul_wad(result, power)?;
        }
        n >>= 1;
        if n > 0 {
            power = mul_wad(power, power)?;
        }
    }
    Ok(result)
}

/// `base^exponent` for WAD base and WAD exponent.
///
/// Integer exponents and the square root are computed exactly (up to the
/// final floor); every other exponent goes through `exp(exponent * ln(base))`.
pub fn pow_wad(base: u128, exponent: u128) -> MathResult<u128> {
    if exponent == 0 {
        return Ok(WAD);
    }
    if base == 0 {
        return Ok(0);
    }
    if base == WAD {
        return Ok(WAD);
    }
    if exponent == WAD {
        return Ok(base);
    }
    if exponent % WAD == 0 {
        return pow_wad_int(base, exponent / WAD);
    }
    if exponent == WAD / 2 {
        return sqrt_wad(base);
    }

    let ln = ln_wad(base)?;
    let magnitude = mul_div(ln.unsigned_abs(), exponent, WAD)?;
    if ln < 0 {
        if magnitude > EXP_MIN_WAD.unsigned_abs() {
            return Ok(0);
        }
        exp_wad(-(magnitude as i128))
    } else {
        if magnitude > EXP_MAX_WAD as u128 {
            return Err(MathError::Overflow("pow"));
        }
        exp_wad(magnitude as i128)
    }
}
