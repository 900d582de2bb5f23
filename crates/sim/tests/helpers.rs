//! Test helper utilities for engine integration tests.

use xlend_rs_sim::{
    decode_positions, project_markets, EngineConfig, MarketProjection, MarketSnapshot, Position,
    PriceMap, RawMarket, RawPosition,
};

/// `lastAutoCompound` of every fixture market
pub const FIXTURE_NOW_MS: u64 = 1_700_000_000_000;

pub const USDC_COIN_TYPE: &str =
    "0xdba34672e30cb065b1f93e3ab55318768fd6fef66c15942c9f7cb846e2f900e7::usdc::USDC";

/// Load a fixture file as a string.
pub fn load_fixture(name: &str) -> String {
    let path = format!(
        "{}/tests/fixtures/{}.json",
        env!("CARGO_MANIFEST_DIR"),
        name
    );
    std::fs::read_to_string(&path).unwrap_or_else(|_| panic!("Failed to load fixture: {}", path))
}

pub fn raw_markets() -> Vec<RawMarket> {
    RawMarket::list_from_json(&load_fixture("markets")).unwrap()
}

pub fn raw_positions() -> Vec<RawPosition> {
    RawPosition::list_from_json(&load_fixture("positions")).unwrap()
}

pub fn prices() -> PriceMap {
    PriceMap::from_json(&load_fixture("prices")).unwrap()
}

/// Project the fixture markets at `now_ms`.
pub fn projection_at(now_ms: u64) -> MarketProjection {
    project_markets(&raw_markets(), now_ms, &EngineConfig::new())
}

/// Snapshot of the fixture markets as recorded, with fixture prices.
pub fn fixture_snapshot() -> MarketSnapshot {
    MarketSnapshot::new(
        projection_at(FIXTURE_NOW_MS).markets,
        prices(),
        EngineConfig::new(),
    )
}

/// Fixture positions that decode.
pub fn positions() -> Vec<Position> {
    decode_positions(&raw_positions()).0
}
