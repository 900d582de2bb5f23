//! xToken Lending Accrual & Risk Engine
//!
//! This crate mirrors the accounting of an xToken lending protocol off-chain.
//! Given raw market and position records read from chain plus externally
//! resolved prices, it rebuilds the derived market state and values positions
//! without touching the chain.
//!
//! # Overview
//!
//! - [`irm`]: kinked utilization to borrow rate curve
//! - [`accrual`]: per-second compounding of the borrowed balance
//! - [`exchange`]: xToken exchange ratio and spread fee split
//! - [`market`]: market projection, capacities and rankings
//! - [`portfolio`]: position valuation, health factor and borrow limit usage
//! - [`protocol`]: protocol-wide supplied and borrowed totals
//!
//! Balances, ratios and rates are integers on [`U256`](alloy_primitives::U256)
//! (ratios and rates scaled by [`WAD`]); USD values are
//! [`Decimal`](rust_decimal::Decimal). Every operation is a pure function of
//! its inputs and the caller-supplied timestamp.
//!
//! # Example
//!
//! ```rust
//! use xlend_rs_sim::{project_markets, EngineConfig, MarketSnapshot, PriceMap, RawMarket, RawPosition};
//!
//! let markets = RawMarket::list_from_json("[]").unwrap();
//! let projection = project_markets(&markets, 1_700_000_000_000, &EngineConfig::new());
//!
//! let snapshot = MarketSnapshot::new(projection.markets, PriceMap::new(), EngineConfig::new());
//! let position = RawPosition::list_from_json(r#"[{ "positionId": "0x1", "owner": "0x2" }]"#)
//!     .unwrap()[0]
//!     .decode()
//!     .unwrap();
//!
//! let portfolio = snapshot.valuate(&position);
//! assert!(portfolio.is_empty());
//! assert!(!portfolio.is_liquidatable);
//! ```

pub mod accrual;
mod batch;
pub mod coin;
pub mod config;
pub mod error;
pub mod exchange;
pub mod irm;
pub mod market;
pub mod math;
pub mod portfolio;
pub mod position;
pub mod price;
pub mod protocol;
pub mod snapshot;

// Re-export commonly used types
pub use config::EngineConfig;
pub use error::{ErrorCategory, MarketId, Result, SimError};

// Market exports
pub use market::{
    get_supply_apr, get_utilization, project_markets, rank_markets_by_borrow_apr,
    rank_markets_by_supply_apr, Market, MarketConfig, MarketProjection, MarketRanking,
    MarketState, RejectedMarket,
};

// Math exports
pub use math::{RoundingDirection, BPS_SCALE, MILLIS_PER_SECOND, SECONDS_PER_YEAR, WAD};

// Rate and accrual exports
pub use accrual::{compounded_multiplier, InterestAccrual};
pub use exchange::{ExchangeRatioInput, ExchangeRatioUpdate};
pub use irm::RateCurve;

// Snapshot exports
pub use snapshot::{
    decode_positions, RawCollateral, RawLoan, RawMarket, RawMarketConfig, RawPosition,
    RejectedPosition, Scalar,
};

// Position and valuation exports
pub use coin::{normalize_coin_type, NATIVE_COIN_TYPE};
pub use portfolio::{
    valuate, CollateralValuation, ExcludedEntry, LoanValuation, MarketSnapshot, Portfolio,
    PositionSide,
};
pub use position::{Loan, Position};
pub use price::{Price, PriceMap};
pub use protocol::{aggregate, MarketStats, ProtocolStats, SkippedMarket};
