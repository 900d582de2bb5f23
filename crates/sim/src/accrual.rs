//! Discrete interest compounding for a market's borrowed balance.
//!
//! Interest compounds once per elapsed second at `borrow_apr / SECONDS_PER_YEAR`:
//!
//! ```text
//! multiplier          = 1 + borrow_apr / 31_536_000          (WAD)
//! compound_multiplier = multiplier ^ elapsed_seconds          (exponentiation by squaring)
//! borrowed_amount'    = borrowed_amount * compound_multiplier / WAD
//! compounded_interest'= compounded_interest * compound_multiplier / WAD
//! ```
//!
//! Every step is integer arithmetic truncating toward zero, matching the
//! on-chain contract. Timestamps are chain milliseconds; partial seconds are
//! carried over to the next accrual.

use alloy_primitives::U256;
use serde::Serialize;

use crate::error::{Result, SimError};
use crate::math::{w_mul_down, w_pow, MILLIS_PER_SECOND, SECONDS_PER_YEAR, WAD};

/// Borrow-side interest state of a market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InterestAccrual {
    /// Outstanding principal plus interest, in base units
    pub borrowed_amount: U256,
    /// Cumulative interest index (WAD-scaled, starts at 1.0)
    pub compounded_interest: U256,
    /// Chain timestamp (ms) interest was last compounded to
    pub last_accrual_ms: u64,
}

impl InterestAccrual {
    /// Create a new accrual state
    pub fn new(borrowed_amount: U256, compounded_interest: U256, last_accrual_ms: u64) -> Self {
        Self {
            borrowed_amount,
            compounded_interest,
            last_accrual_ms,
        }
    }

    /// Whole seconds between the last accrual and `now_ms` (zero if `now_ms` is earlier)
    pub fn elapsed_seconds(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.last_accrual_ms) / MILLIS_PER_SECOND
    }

    /// Compounds interest from the last accrual up to `now_ms` at a constant APR.
    ///
    /// Returns an unchanged copy when no whole second has elapsed or nothing is
    /// borrowed, so repeating a call with the same `now_ms` has no further effect.
    ///
    /// # Errors
    ///
    /// [`SimError::ArithmeticOverflow`] if the compounded multiplier or the
    /// scaled balances exceed 256 bits.
    ///
    /// # Example
    ///
    /// ```rust
    /// use xlend_rs_sim::accrual::InterestAccrual;
    /// use xlend_rs_sim::math::{bps_to_wad, WAD};
    /// use alloy_primitives::U256;
    ///
    /// let state = InterestAccrual::new(U256::from(1_000_000_000u64), WAD, 0);
    /// let one_day_ms = 86_400_000;
    /// let accrued = state.accrue(bps_to_wad(500), one_day_ms).unwrap();
    ///
    /// assert!(accrued.borrowed_amount > state.borrowed_amount);
    /// assert_eq!(accrued.last_accrual_ms, one_day_ms);
    /// assert_eq!(accrued.accrue(bps_to_wad(500), one_day_ms).unwrap(), accrued);
    /// ```
    pub fn accrue(&self, borrow_apr: U256, now_ms: u64) -> Result<Self> {
        let elapsed = self.elapsed_seconds(now_ms);
        if elapsed == 0 || self.borrowed_amount.is_zero() {
            return Ok(*self);
        }

        let multiplier = compounded_multiplier(borrow_apr, elapsed)?;

        Ok(Self {
            borrowed_amount: w_mul_down(self.borrowed_amount, multiplier)?,
            compounded_interest: w_mul_down(self.compounded_interest, multiplier)?,
            last_accrual_ms: self.last_accrual_ms + elapsed * MILLIS_PER_SECOND,
        })
    }
}

/// Computes `(1 + borrow_apr / SECONDS_PER_YEAR) ^ elapsed_seconds` in WAD.
pub fn compounded_multiplier(borrow_apr: U256, elapsed_seconds: u64) -> Result<U256> {
    let rate_per_second = borrow_apr / U256::from(SECONDS_PER_YEAR);
    let multiplier = WAD
        .checked_add(rate_per_second)
        .ok_or(SimError::overflow("compounded_multiplier"))?;
    w_pow(multiplier, elapsed_seconds)
}
