//! Portfolio valuation.
//!
//! A [`Portfolio`] is one [`Position`] valued against projected markets and a
//! price map at a single point in time:
//!
//! ```text
//! collateral_usd      = shares * xtoken_ratio / WAD * price
//! loan_usd            = debt * price
//! safe_borrow_limit   = sum(collateral_usd * ltv)
//! liquidation_limit   = sum(collateral_usd * liquidation_threshold)
//! borrow_limit_used   = total_borrowed_usd / safe_borrow_limit
//! health_factor       = liquidation_limit / total_borrowed_usd
//! ```
//!
//! Entries whose market or price cannot be resolved are left out of every sum
//! and listed in [`Portfolio::excluded`] with the reason.
//!
//! [`MarketSnapshot`] bundles the market map, price map and configuration so
//! any number of positions can be valued against the same inputs.

use std::collections::BTreeMap;

use alloy_primitives::U256;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::warn;

use crate::batch;
use crate::config::EngineConfig;
use crate::error::{MarketId, Result, SimError};
use crate::market::Market;
use crate::position::{Loan, Position};
use crate::price::PriceMap;
use crate::protocol::{aggregate, ProtocolStats};

/// Which side of a position an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PositionSide {
    Collateral,
    Loan,
}

/// A collateral or loan entry left out of the valuation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExcludedEntry {
    pub market_id: MarketId,
    pub side: PositionSide,
    pub error: SimError,
}

/// Valued collateral in one market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollateralValuation {
    pub market_id: MarketId,
    pub coin_type: String,
    /// xToken shares held
    pub shares: U256,
    /// Underlying amount, in base units
    pub amount: U256,
    pub amount_usd: Decimal,
    pub ltv: Decimal,
    pub liquidation_threshold: Decimal,
}

/// Valued debt in one market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanValuation {
    pub market_id: MarketId,
    pub coin_type: String,
    /// Current debt including interest, in base units
    pub amount: U256,
    pub amount_usd: Decimal,
    pub borrow_weight: Decimal,
}

/// A position valued at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    pub position_id: String,
    pub owner: String,
    pub collaterals: Vec<CollateralValuation>,
    pub loans: Vec<LoanValuation>,
    /// Entries left out of every total
    pub excluded: Vec<ExcludedEntry>,
    pub total_supplied_usd: Decimal,
    pub total_borrowed_usd: Decimal,
    /// Supplied minus borrowed; negative for an underwater position
    pub net_worth: Decimal,
    pub safe_borrow_limit: Decimal,
    pub liquidation_limit: Decimal,
    /// Borrowed over safe limit; `Decimal::MAX` for debt against a zero limit
    pub borrow_limit_used: Decimal,
    /// Liquidation limit over borrowed; the configured sentinel without debt
    pub health_factor: Decimal,
    pub is_liquidatable: bool,
}

impl Portfolio {
    /// Returns true if nothing was valued or excluded
    pub fn is_empty(&self) -> bool {
        self.collaterals.is_empty() && self.loans.is_empty() && self.excluded.is_empty()
    }

    /// Returns true if the debt is within the safe borrow limit
    pub fn is_healthy(&self) -> bool {
        self.borrow_limit_used <= Decimal::ONE
    }

    /// Additional USD that could be borrowed before reaching the safe limit
    pub fn available_borrow_usd(&self) -> Decimal {
        (self.safe_borrow_limit - self.total_borrowed_usd).max(Decimal::ZERO)
    }
}

fn usd_value(
    market: &Market,
    amount: U256,
    price: Decimal,
    operation: &'static str,
) -> Result<Decimal> {
    market
        .to_decimal_amount(amount)?
        .checked_mul(price)
        .ok_or(SimError::overflow(operation))
}

fn resolve<'a>(
    markets: &'a BTreeMap<MarketId, Market>,
    prices: &PriceMap,
    market_id: MarketId,
) -> Result<(&'a Market, Decimal)> {
    let market = markets
        .get(&market_id)
        .ok_or(SimError::MarketNotFound { market_id })?;
    let price = prices.price_of(&market.coin_type)?;
    Ok((market, price))
}

fn value_collateral(
    markets: &BTreeMap<MarketId, Market>,
    prices: &PriceMap,
    market_id: MarketId,
    shares: U256,
) -> Result<CollateralValuation> {
    let (market, price) = resolve(markets, prices, market_id)?;
    let amount = market.to_underlying(shares)?;
    Ok(CollateralValuation {
        market_id,
        coin_type: market.coin_type.clone(),
        shares,
        amount,
        amount_usd: usd_value(market, amount, price, "collateral_usd")?,
        ltv: market.config.ltv,
        liquidation_threshold: market.config.liquidation_threshold,
    })
}

fn value_loan(
    markets: &BTreeMap<MarketId, Market>,
    prices: &PriceMap,
    market_id: MarketId,
    loan: &Loan,
) -> Result<LoanValuation> {
    let (market, price) = resolve(markets, prices, market_id)?;
    let amount = market.current_debt(loan.amount, loan.borrow_compounded_interest)?;
    Ok(LoanValuation {
        market_id,
        coin_type: market.coin_type.clone(),
        amount,
        amount_usd: usd_value(market, amount, price, "loan_usd")?,
        borrow_weight: market.config.borrow_weight(),
    })
}

/// Running totals; every addition is checked.
#[derive(Debug, Clone, Copy, Default)]
struct Totals {
    supplied: Decimal,
    borrowed: Decimal,
    safe_limit: Decimal,
    liquidation_limit: Decimal,
}

fn checked_add(a: Decimal, b: Decimal, operation: &'static str) -> Result<Decimal> {
    a.checked_add(b).ok_or(SimError::overflow(operation))
}

impl Totals {
    fn with_collateral(&self, line: &CollateralValuation) -> Result<Totals> {
        let safe = line
            .amount_usd
            .checked_mul(line.ltv)
            .ok_or(SimError::overflow("safe_borrow_limit"))?;
        let liquidation = line
            .amount_usd
            .checked_mul(line.liquidation_threshold)
            .ok_or(SimError::overflow("liquidation_limit"))?;
        Ok(Totals {
            supplied: checked_add(self.supplied, line.amount_usd, "total_supplied_usd")?,
            borrowed: self.borrowed,
            safe_limit: checked_add(self.safe_limit, safe, "safe_borrow_limit")?,
            liquidation_limit: checked_add(self.liquidation_limit, liquidation, "liquidation_limit")?,
        })
    }

    fn with_loan(&self, line: &LoanValuation) -> Result<Totals> {
        Ok(Totals {
            borrowed: checked_add(self.borrowed, line.amount_usd, "total_borrowed_usd")?,
            ..*self
        })
    }
}

/// Values a position against a market map and a price map.
///
/// Never fails as a whole: a collateral or loan entry whose market is not in
/// `markets`, whose coin has no price, or whose value overflows is recorded
/// in [`Portfolio::excluded`] and contributes nothing to the totals.
pub fn valuate(
    position: &Position,
    markets: &BTreeMap<MarketId, Market>,
    prices: &PriceMap,
    config: &EngineConfig,
) -> Portfolio {
    let mut totals = Totals::default();
    let mut collaterals = Vec::new();
    let mut loans = Vec::new();
    let mut excluded = Vec::new();

    let mut exclude = |market_id: MarketId, side: PositionSide, error: SimError| {
        warn!(
            position_id = %position.position_id,
            market_id,
            ?side,
            %error,
            "Excluding position entry"
        );
        excluded.push(ExcludedEntry {
            market_id,
            side,
            error,
        });
    };

    for (&market_id, &shares) in &position.collaterals {
        let result = value_collateral(markets, prices, market_id, shares)
            .and_then(|line| totals.with_collateral(&line).map(|next| (line, next)));
        match result {
            Ok((line, next)) => {
                totals = next;
                collaterals.push(line);
            }
            Err(error) => exclude(market_id, PositionSide::Collateral, error),
        }
    }

    for (&market_id, loan) in &position.loans {
        let result = value_loan(markets, prices, market_id, loan)
            .and_then(|line| totals.with_loan(&line).map(|next| (line, next)));
        match result {
            Ok((line, next)) => {
                totals = next;
                loans.push(line);
            }
            Err(error) => exclude(market_id, PositionSide::Loan, error),
        }
    }

    let has_debt = totals.borrowed > Decimal::ZERO;

    let health_factor = if has_debt {
        totals
            .liquidation_limit
            .checked_div(totals.borrowed)
            .unwrap_or(config.health_factor_sentinel)
    } else {
        config.health_factor_sentinel
    };

    let borrow_limit_used = if !has_debt {
        Decimal::ZERO
    } else if totals.safe_limit.is_zero() {
        Decimal::MAX
    } else {
        totals
            .borrowed
            .checked_div(totals.safe_limit)
            .unwrap_or(Decimal::MAX)
    };

    Portfolio {
        position_id: position.position_id.clone(),
        owner: position.owner.clone(),
        collaterals,
        loans,
        excluded,
        total_supplied_usd: totals.supplied,
        total_borrowed_usd: totals.borrowed,
        net_worth: totals.supplied - totals.borrowed,
        safe_borrow_limit: totals.safe_limit,
        liquidation_limit: totals.liquidation_limit,
        borrow_limit_used,
        health_factor,
        is_liquidatable: has_debt && health_factor < Decimal::ONE,
    }
}

/// Immutable market and price inputs shared by many valuations.
#[derive(Debug, Clone, Default)]
pub struct MarketSnapshot {
    markets: BTreeMap<MarketId, Market>,
    prices: PriceMap,
    config: EngineConfig,
}

impl MarketSnapshot {
    /// Create a snapshot from projected markets.
    ///
    /// A later market with the same id replaces an earlier one.
    pub fn new(
        markets: impl IntoIterator<Item = Market>,
        prices: PriceMap,
        config: EngineConfig,
    ) -> Self {
        Self {
            markets: markets
                .into_iter()
                .map(|market| (market.market_id, market))
                .collect(),
            prices,
            config,
        }
    }

    /// Look up a market by id
    pub fn market(&self, market_id: MarketId) -> Option<&Market> {
        self.markets.get(&market_id)
    }

    /// Markets in ascending id order
    pub fn markets(&self) -> impl Iterator<Item = &Market> {
        self.markets.values()
    }

    /// The price map
    pub fn prices(&self) -> &PriceMap {
        &self.prices
    }

    /// The engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Value one position
    pub fn valuate(&self, position: &Position) -> Portfolio {
        valuate(position, &self.markets, &self.prices, &self.config)
    }

    /// Value many positions, in input order
    pub fn valuate_all(&self, positions: &[Position]) -> Vec<Portfolio> {
        batch::map_ordered(positions, |position| self.valuate(position))
    }

    /// Protocol-wide supplied and borrowed totals
    pub fn protocol_stats(&self) -> ProtocolStats {
        aggregate(self.markets.values(), &self.prices)
    }
}
