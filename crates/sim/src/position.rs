//! Account positions across markets.
//!
//! A [`Position`] holds xToken collateral and debt in any number of markets,
//! each keyed by market id. Positions are read-only snapshots; valuing them
//! against markets and prices is done by [`crate::portfolio`].

use std::collections::BTreeMap;

use alloy_primitives::U256;
use serde::Serialize;

use crate::error::MarketId;

/// Debt in a single market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Loan {
    /// Debt in base units, as of `borrow_compounded_interest`
    pub amount: U256,
    /// Market interest index when the loan was last updated (WAD).
    /// `None` means `amount` already includes accrued interest.
    pub borrow_compounded_interest: Option<U256>,
}

impl Loan {
    /// Loan whose amount already includes accrued interest
    pub fn new(amount: U256) -> Self {
        Self {
            amount,
            borrow_compounded_interest: None,
        }
    }

    /// Loan recorded at a market interest index
    pub fn with_index(amount: U256, index: U256) -> Self {
        Self {
            amount,
            borrow_compounded_interest: Some(index),
        }
    }
}

/// One account's collateral and debt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    /// Position identifier
    pub position_id: String,
    /// Account that owns the position
    pub owner: String,
    /// xToken shares held as collateral, per market
    pub collaterals: BTreeMap<MarketId, U256>,
    /// Debt, per market
    pub loans: BTreeMap<MarketId, Loan>,
}

impl Position {
    /// Create an empty position
    pub fn empty(position_id: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            position_id: position_id.into(),
            owner: owner.into(),
            collaterals: BTreeMap::new(),
            loans: BTreeMap::new(),
        }
    }

    /// Add collateral shares in a market, replacing any existing entry
    pub fn with_collateral(mut self, market_id: MarketId, shares: U256) -> Self {
        self.collaterals.insert(market_id, shares);
        self
    }

    /// Add a loan in a market, replacing any existing entry
    pub fn with_loan(mut self, market_id: MarketId, loan: Loan) -> Self {
        self.loans.insert(market_id, loan);
        self
    }

    /// Returns true if the position holds no collateral and no debt
    pub fn is_empty(&self) -> bool {
        self.collaterals.is_empty() && self.loans.is_empty()
    }

    /// Returns true if the position has debt in any market
    pub fn has_debt(&self) -> bool {
        self.loans.values().any(|loan| !loan.amount.is_zero())
    }

    /// Markets the position touches, ascending and without duplicates
    pub fn market_ids(&self) -> Vec<MarketId> {
        let mut ids: Vec<MarketId> = self
            .collaterals
            .keys()
            .chain(self.loans.keys())
            .copied()
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_position() {
        let position = Position::empty("0x1", "0xowner");
        assert!(position.is_empty());
        assert!(!position.has_debt());
        assert!(position.market_ids().is_empty());
    }

    #[test]
    fn test_builder_and_market_ids() {
        let position = Position::empty("0x1", "0xowner")
            .with_collateral(3, U256::from(100))
            .with_collateral(1, U256::from(5))
            .with_loan(3, Loan::new(U256::from(10)));

        assert!(!position.is_empty());
        assert!(position.has_debt());
        assert_eq!(position.market_ids(), vec![1, 3]);
    }

    #[test]
    fn test_zero_loan_is_not_debt() {
        let position = Position::empty("0x1", "0xowner").with_loan(0, Loan::new(U256::ZERO));
        assert!(!position.is_empty());
        assert!(!position.has_debt());
    }
}
