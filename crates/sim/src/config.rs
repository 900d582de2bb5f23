//! Engine configuration.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Tunables shared by market projection and portfolio valuation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Compound interest and refresh the exchange ratio up to the projection
    /// timestamp before deriving rates.
    pub accrue_interest: bool,
    /// Health factor reported for portfolios without debt.
    pub health_factor_sentinel: Decimal,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            accrue_interest: true,
            health_factor_sentinel: Decimal::MAX,
        }
    }
}

impl EngineConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable interest accrual during projection.
    pub fn with_accrue_interest(mut self, accrue_interest: bool) -> Self {
        self.accrue_interest = accrue_interest;
        self
    }

    /// Set the health factor reported when a portfolio has no debt.
    pub fn with_health_factor_sentinel(mut self, sentinel: Decimal) -> Self {
        self.health_factor_sentinel = sentinel;
        self
    }
}
