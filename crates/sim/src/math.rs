//! Fixed-point helpers for WAD-scaled (1e18) arithmetic on [`U256`].
//!
//! Every balance, ratio and rate inside the engine is an integer: balances in
//! token base units, ratios and rates scaled by [`WAD`]. All multiplications
//! are checked; an operation that would exceed 256 bits reports
//! [`SimError::ArithmeticOverflow`] instead of wrapping. Conversion to
//! [`Decimal`] happens only at the valuation boundary.

use alloy_primitives::U256;
use rust_decimal::Decimal;

use crate::error::{Result, SimError};

/// 1e18, the fixed-point unit
pub const WAD: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

/// Basis points per unit
pub const BPS_SCALE: u64 = 10_000;

/// Seconds in a 365-day year
pub const SECONDS_PER_YEAR: u64 = 31_536_000;

/// Chain timestamps are in milliseconds
pub const MILLIS_PER_SECOND: u64 = 1_000;

/// WAD / BPS_SCALE
const WAD_PER_BPS: U256 = U256::from_limbs([100_000_000_000_000, 0, 0, 0]);

/// Rounding direction for integer division
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundingDirection {
    Up,
    Down,
}

/// Computes `x * y / d` with the requested rounding.
pub fn mul_div(
    x: U256,
    y: U256,
    d: U256,
    rounding: RoundingDirection,
    operation: &'static str,
) -> Result<U256> {
    if d.is_zero() {
        return Err(SimError::DivisionByZero { operation });
    }
    let product = x.checked_mul(y).ok_or(SimError::overflow(operation))?;
    let quotient = product / d;
    match rounding {
        RoundingDirection::Down => Ok(quotient),
        RoundingDirection::Up if (product % d).is_zero() => Ok(quotient),
        RoundingDirection::Up => quotient
            .checked_add(U256::from(1))
            .ok_or(SimError::overflow(operation)),
    }
}

/// `x * y / d` rounded down
pub fn mul_div_down(x: U256, y: U256, d: U256) -> Result<U256> {
    mul_div(x, y, d, RoundingDirection::Down, "mul_div_down")
}

/// `x * y / d` rounded up
pub fn mul_div_up(x: U256, y: U256, d: U256) -> Result<U256> {
    mul_div(x, y, d, RoundingDirection::Up, "mul_div_up")
}

/// `x * y / WAD` rounded down
pub fn w_mul_down(x: U256, y: U256) -> Result<U256> {
    mul_div(x, y, WAD, RoundingDirection::Down, "w_mul_down")
}

/// `x * WAD / y` rounded down
pub fn w_div_down(x: U256, y: U256) -> Result<U256> {
    mul_div(x, WAD, y, RoundingDirection::Down, "w_div_down")
}

/// Returns `max(x - y, 0)`
pub fn zero_floor_sub(x: U256, y: U256) -> U256 {
    x.saturating_sub(y)
}

/// Converts a basis-point value to a WAD-scaled fraction (10000 bps = WAD).
pub fn bps_to_wad(bps: u64) -> U256 {
    U256::from(bps) * WAD_PER_BPS
}

/// Raises a WAD-scaled `base` to an integer power using exponentiation by
/// squaring. Each multiplication is rescaled by WAD and truncated, so the
/// cost is O(log exp) multiplications.
///
/// # Errors
///
/// [`SimError::ArithmeticOverflow`] if an intermediate product exceeds 256 bits.
///
/// # Example
///
/// ```rust
/// use xlend_rs_sim::math::{w_pow, WAD};
/// use alloy_primitives::U256;
///
/// let two = U256::from(2) * WAD;
/// assert_eq!(w_pow(two, 10).unwrap(), U256::from(1024) * WAD);
/// assert_eq!(w_pow(two, 0).unwrap(), WAD);
/// ```
pub fn w_pow(base: U256, exp: u64) -> Result<U256> {
    let mut result = WAD;
    let mut base = base;
    let mut exp = exp;

    while exp > 0 {
        if exp & 1 == 1 {
            result = mul_div(result, base, WAD, RoundingDirection::Down, "w_pow")?;
        }
        exp >>= 1;
        if exp > 0 {
            base = mul_div(base, base, WAD, RoundingDirection::Down, "w_pow")?;
        }
    }

    Ok(result)
}

/// Converts an integer carrying `scale` implied decimals into a [`Decimal`].
pub fn to_decimal(value: U256, scale: u32, operation: &'static str) -> Result<Decimal> {
    if value > U256::from(u128::MAX) {
        return Err(SimError::overflow(operation));
    }
    let mantissa =
        i128::try_from(value.saturating_to::<u128>()).map_err(|_| SimError::overflow(operation))?;
    Decimal::try_from_i128_with_scale(mantissa, scale).map_err(|_| SimError::overflow(operation))
}

/// Converts a base-unit token amount into whole tokens.
pub fn amount_to_decimal(amount: U256, decimals: u8) -> Result<Decimal> {
    to_decimal(amount, u32::from(decimals), "amount_to_decimal")
}

/// Converts a WAD-scaled value to f64 for display.
pub fn rate_to_f64(value: U256) -> f64 {
    value.saturating_to::<u128>() as f64 / 1e18
}

/// Converts a WAD-scaled APR to an APY with per-second compounding.
pub fn apr_to_apy(apr: U256) -> f64 {
    let periods = SECONDS_PER_YEAR as f64;
    let rate_per_second = rate_to_f64(apr) / periods;
    (1.0 + rate_per_second).powf(periods) - 1.0
}

/// Returns the smaller of two values
pub fn min(a: U256, b: U256) -> U256 {
    if a < b {
        a
    } else {
        b
    }
}
