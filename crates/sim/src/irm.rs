//! Kinked interest rate curve.
//!
//! Each market configures its borrow rate as a piecewise-linear function of
//! utilization. The table is two parallel lists read from the market config:
//!
//! ```text
//! kinks: [  0,   80,  100]   utilization breakpoints, percent
//! rates: [  0,  500, 4000]   borrow rate at each breakpoint, basis points
//! ```
//!
//! Between two breakpoints the rate is interpolated linearly:
//!
//! ```text
//! rate = left_rate + (right_rate - left_rate) * (u - left_kink) / (right_kink - left_kink)
//! ```
//!
//! The segment before the first breakpoint starts at `(0%, 0 bps)`. Above the
//! last breakpoint the rate stays at the last tabulated value. An empty kink
//! list means a flat rate of `rates[0]`.
//!
//! # Example
//!
//! ```rust
//! use xlend_rs_sim::irm::RateCurve;
//! use xlend_rs_sim::math::{bps_to_wad, WAD};
//! use alloy_primitives::U256;
//!
//! let curve = RateCurve::new(vec![80, 100], vec![500, 4000]).unwrap();
//!
//! // 80% utilization sits exactly on the first kink: 5% APR
//! let utilization = U256::from(800_000_000_000_000_000u64);
//! assert_eq!(curve.borrow_apr(utilization).unwrap(), bps_to_wad(500));
//!
//! // Full utilization: 40% APR
//! assert_eq!(curve.borrow_apr(WAD).unwrap(), bps_to_wad(4000));
//! ```

use alloy_primitives::U256;
use serde::Serialize;

use crate::error::{Result, SimError};
use crate::math::{bps_to_wad, mul_div_down, BPS_SCALE, WAD};

/// Piecewise-linear borrow rate curve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateCurve {
    /// Utilization breakpoints in percent, strictly ascending
    kinks: Vec<u64>,
    /// Borrow rate in basis points at each breakpoint
    rates: Vec<u64>,
}

impl RateCurve {
    /// Creates a validated rate curve.
    ///
    /// # Errors
    ///
    /// [`SimError::Configuration`] if the rate list is empty, the kink and rate
    /// lists differ in length, the kinks are not strictly ascending, or a rate
    /// is below the one before it.
    pub fn new(kinks: Vec<u64>, rates: Vec<u64>) -> Result<Self> {
        if rates.is_empty() {
            return Err(SimError::configuration("interest rate table is empty"));
        }
        if !kinks.is_empty() && kinks.len() != rates.len() {
            return Err(SimError::configuration(format!(
                "{} utilization kinks but {} interest rates",
                kinks.len(),
                rates.len()
            )));
        }
        if kinks.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(SimError::configuration(format!(
                "utilization kinks are not strictly ascending: {kinks:?}"
            )));
        }
        if rates.windows(2).any(|pair| pair[0] > pair[1]) {
            return Err(SimError::configuration(format!(
                "interest rates decrease with utilization: {rates:?}"
            )));
        }
        Ok(Self { kinks, rates })
    }

    /// Creates a curve that charges the same rate at every utilization.
    pub fn flat(rate_bps: u64) -> Self {
        Self {
            kinks: Vec::new(),
            rates: vec![rate_bps],
        }
    }

    /// Utilization breakpoints in percent
    pub fn kinks(&self) -> &[u64] {
        &self.kinks
    }

    /// Borrow rates in basis points
    pub fn rates(&self) -> &[u64] {
        &self.rates
    }

    /// Evaluates the borrow APR (WAD-scaled) at a WAD-scaled utilization.
    ///
    /// Pure and deterministic: the same inputs always give the same output.
    pub fn borrow_apr(&self, utilization: U256) -> Result<U256> {
        let first_rate = self.rates.first().copied().unwrap_or_default();
        if self.kinks.is_empty() {
            return Ok(bps_to_wad(first_rate));
        }

        // Utilization in percent, WAD-scaled
        let utilization_pct = utilization
            .checked_mul(U256::from(100))
            .ok_or(SimError::overflow("borrow_apr"))?;

        let mut left_kink = 0u64;
        let mut left_rate = 0u64;

        for (&kink, &rate) in self.kinks.iter().zip(&self.rates) {
            let kink_pct = U256::from(kink) * WAD;
            if kink_pct == utilization_pct {
                return Ok(bps_to_wad(rate));
            }
            if kink_pct > utilization_pct {
                let span = U256::from(kink - left_kink);
                let progress = utilization_pct - U256::from(left_kink) * WAD;
                let left = U256::from(left_rate) * WAD;

                // Rates never decrease, so the segment only climbs
                let rise = U256::from(rate - left_rate);
                let rate_bps = left + mul_div_down(rise, progress, span)?;
                return Ok(rate_bps / U256::from(BPS_SCALE));
            }
            left_kink = kink;
            left_rate = rate;
        }

        // Past the last kink: clamp to the final tabulated rate
        Ok(bps_to_wad(left_rate))
    }
}
