//! xToken exchange ratio and spread fee split.
//!
//! Suppliers hold xTokens whose value in the underlying coin is
//! `xtoken_supply * xtoken_ratio / WAD`. After interest is compounded the
//! ratio is recomputed from the market's net liquidity, and a share of the
//! increase is withheld as the spread fee:
//!
//! ```text
//! total_liquidity   = balance + borrowed - unclaimed_fee - writeoff - unclaimed_fee_protocol   (floored at 0)
//! new_ratio         = total_liquidity * WAD / xtoken_supply          (WAD when supply is 0)
//! spread_fee_ratio  = (new_ratio - prior_ratio) * spread_fee_bps / 10000
//! gross_spread_fee  = total_liquidity * spread_fee_ratio              (WAD-scaled amount)
//! protocol_share    = gross_spread_fee * protocol_share_bps / 10000
//! published ratio   = new_ratio - spread_fee_ratio
//! ```
//!
//! The protocol's part and the pool's remainder are added to their respective
//! unclaimed fee counters after removing the WAD scale.

use alloy_primitives::U256;
use serde::Serialize;

use crate::error::{Result, SimError};
use crate::math::{mul_div_down, zero_floor_sub, BPS_SCALE, WAD};

/// Market state needed to recompute the exchange ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeRatioInput {
    /// Underlying coins held by the market
    pub balance_holding: U256,
    /// Outstanding borrows after interest accrual
    pub borrowed_amount: U256,
    /// Spread fee earmarked for the pool, not yet claimed
    pub unclaimed_spread_fee: U256,
    /// Spread fee earmarked for the protocol, not yet claimed
    pub unclaimed_spread_fee_protocol: U256,
    /// Bad debt written off
    pub writeoff_amount: U256,
    /// xTokens outstanding
    pub xtoken_supply: U256,
    /// Ratio published by the previous update (WAD)
    pub xtoken_ratio: U256,
    /// Share of the ratio increase withheld, in basis points
    pub spread_fee_bps: u64,
    /// Protocol's share of the withheld fee, in basis points
    pub protocol_spread_fee_share_bps: u64,
}

/// Outcome of an exchange ratio update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExchangeRatioUpdate {
    /// Net liquidity backing the xTokens
    pub total_liquidity: U256,
    /// Published ratio after the spread fee (WAD)
    pub xtoken_ratio: U256,
    /// Ratio withheld as spread fee in this update (WAD)
    pub spread_fee_ratio: U256,
    /// Cumulative unclaimed pool fee
    pub unclaimed_spread_fee: U256,
    /// Cumulative unclaimed protocol fee
    pub unclaimed_spread_fee_protocol: U256,
}

impl ExchangeRatioInput {
    /// Net liquidity: holdings plus borrows minus fees and write-offs, floored at zero.
    pub fn total_liquidity(&self) -> U256 {
        let gross = self.balance_holding.saturating_add(self.borrowed_amount);
        [
            self.unclaimed_spread_fee,
            self.writeoff_amount,
            self.unclaimed_spread_fee_protocol,
        ]
        .into_iter()
        .fold(gross, zero_floor_sub)
    }

    /// Recomputes the ratio and splits the spread fee.
    ///
    /// When the ratio did not increase no fee is taken and the fee counters are
    /// left untouched, so they never decrease.
    pub fn apply(&self) -> Result<ExchangeRatioUpdate> {
        let total_liquidity = self.total_liquidity();

        let new_ratio = if self.xtoken_supply.is_zero() {
            WAD
        } else {
            mul_div_down(total_liquidity, WAD, self.xtoken_supply)?
        };

        if new_ratio <= self.xtoken_ratio {
            return Ok(ExchangeRatioUpdate {
                total_liquidity,
                xtoken_ratio: new_ratio,
                spread_fee_ratio: U256::ZERO,
                unclaimed_spread_fee: self.unclaimed_spread_fee,
                unclaimed_spread_fee_protocol: self.unclaimed_spread_fee_protocol,
            });
        }

        let ratio_delta = new_ratio - self.xtoken_ratio;
        let spread_fee_ratio = mul_div_down(
            ratio_delta,
            U256::from(self.spread_fee_bps),
            U256::from(BPS_SCALE),
        )?;

        let gross_spread_fee = total_liquidity
            .checked_mul(spread_fee_ratio)
            .ok_or(SimError::overflow("gross_spread_fee"))?;
        let protocol_share = mul_div_down(
            gross_spread_fee,
            U256::from(self.protocol_spread_fee_share_bps),
            U256::from(BPS_SCALE),
        )?;
        let pool_share = zero_floor_sub(gross_spread_fee, protocol_share);

        let unclaimed_spread_fee_protocol = self
            .unclaimed_spread_fee_protocol
            .checked_add(protocol_share / WAD)
            .ok_or(SimError::overflow("unclaimed_spread_fee_protocol"))?;
        let unclaimed_spread_fee = self
            .unclaimed_spread_fee
            .checked_add(pool_share / WAD)
            .ok_or(SimError::overflow("unclaimed_spread_fee"))?;

        Ok(ExchangeRatioUpdate {
            total_liquidity,
            xtoken_ratio: zero_floor_sub(new_ratio, spread_fee_ratio),
            spread_fee_ratio,
            unclaimed_spread_fee,
            unclaimed_spread_fee_protocol,
        })
    }
}
