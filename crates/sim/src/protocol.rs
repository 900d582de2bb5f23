//! Protocol-wide statistics.

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::warn;

use crate::error::{MarketId, Result, SimError};
use crate::market::Market;
use crate::price::PriceMap;

/// USD totals of one market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketStats {
    pub market_id: MarketId,
    pub coin_type: String,
    pub supplied_usd: Decimal,
    pub borrowed_usd: Decimal,
}

/// A market left out of the protocol totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedMarket {
    pub market_id: MarketId,
    pub error: SimError,
}

/// Supplied and borrowed value across every priced market.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolStats {
    pub total_supplied_usd: Decimal,
    pub total_borrowed_usd: Decimal,
    /// Supplied minus borrowed, floored at zero
    pub total_value_locked_usd: Decimal,
    /// Per-market figures, in input order
    pub markets: Vec<MarketStats>,
    /// Markets whose price or value could not be resolved
    pub skipped: Vec<SkippedMarket>,
}

impl ProtocolStats {
    /// Borrowed over supplied across all counted markets (zero when nothing is supplied)
    pub fn utilization(&self) -> Decimal {
        self.total_borrowed_usd
            .checked_div(self.total_supplied_usd)
            .unwrap_or(Decimal::ZERO)
    }
}

fn market_stats(market: &Market, prices: &PriceMap) -> Result<MarketStats> {
    let price = prices.price_of(&market.coin_type)?;
    let supplied_usd = market
        .to_decimal_amount(market.total_supply)?
        .checked_mul(price)
        .ok_or(SimError::overflow("supplied_usd"))?;
    let borrowed_usd = market
        .to_decimal_amount(market.total_borrow)?
        .checked_mul(price)
        .ok_or(SimError::overflow("borrowed_usd"))?;
    Ok(MarketStats {
        market_id: market.market_id,
        coin_type: market.coin_type.clone(),
        supplied_usd,
        borrowed_usd,
    })
}

/// Sums `total_supply * price` and `total_borrow * price` over all markets.
///
/// A market without a price, or whose value overflows, is logged and listed in
/// [`ProtocolStats::skipped`]; the remaining markets are still counted.
pub fn aggregate<'a>(
    markets: impl IntoIterator<Item = &'a Market>,
    prices: &PriceMap,
) -> ProtocolStats {
    let mut stats = ProtocolStats::default();

    for market in markets {
        let result = market_stats(market, prices).and_then(|line| {
            let supplied = stats
                .total_supplied_usd
                .checked_add(line.supplied_usd)
                .ok_or(SimError::overflow("total_supplied_usd"))?;
            let borrowed = stats
                .total_borrowed_usd
                .checked_add(line.borrowed_usd)
                .ok_or(SimError::overflow("total_borrowed_usd"))?;
            Ok((line, supplied, borrowed))
        });

        match result {
            Ok((line, supplied, borrowed)) => {
                stats.total_supplied_usd = supplied;
                stats.total_borrowed_usd = borrowed;
                stats.markets.push(line);
            }
            Err(error) => {
                warn!(
                    market_id = market.market_id,
                    coin_type = %market.coin_type,
                    %error,
                    "Skipping market in protocol totals"
                );
                stats.skipped.push(SkippedMarket {
                    market_id: market.market_id,
                    error,
                });
            }
        }
    }

    stats.total_value_locked_usd =
        (stats.total_supplied_usd - stats.total_borrowed_usd).max(Decimal::ZERO);
    stats
}
