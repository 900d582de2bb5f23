//! Raw chain records and their strict decoding.
//!
//! Indexers and RPC nodes hand out market and position objects with integers
//! encoded as decimal strings (sometimes as JSON numbers) and fields that may
//! simply be missing. The `Raw*` types here accept that shape as-is; `decode`
//! turns one record into a fully typed [`MarketState`] or [`Position`], or
//! fails with a [`SimError::Decoding`] / [`SimError::Configuration`] for that
//! record alone. Nothing partially typed flows past this module.

use std::collections::BTreeMap;
use std::str::FromStr;

use alloy_primitives::U256;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::accrual::InterestAccrual;
use crate::coin::normalize_coin_type;
use crate::error::{MarketId, Result, SimError};
use crate::irm::RateCurve;
use crate::market::{MarketConfig, MarketState};
use crate::math::BPS_SCALE;
use crate::position::{Loan, Position};

/// Largest number of decimals a coin can have and still be valued exactly
const MAX_DECIMALS: u8 = 28;

/// Integer field as encoded by the source: a decimal string or a JSON number.
///
/// Anything else (floats, negatives, booleans, numbers past `u64`) lands in
/// [`Scalar::Other`] so the owning record still parses and is rejected on
/// decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Number(u64),
    Text(String),
    Other(serde_json::Value),
}

impl Scalar {
    /// Parse as a 256-bit unsigned integer
    pub fn to_u256(&self) -> Option<U256> {
        match self {
            Self::Number(value) => Some(U256::from(*value)),
            Self::Text(text) => parse_bigint(text),
            Self::Other(_) => None,
        }
    }

    /// Parse as a 64-bit unsigned integer
    pub fn to_u64(&self) -> Option<u64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Text(text) => text.trim().parse().ok(),
            Self::Other(_) => None,
        }
    }
}

/// Splits a JSON array into its elements without interpreting them.
fn json_array(json: &str, entity: &str) -> Result<Vec<serde_json::Value>> {
    serde_json::from_str(json).map_err(|e| SimError::decoding(entity, e.to_string()))
}

/// Parse a big integer string into a U256.
pub fn parse_bigint(s: &str) -> Option<U256> {
    U256::from_str(s.trim()).ok()
}

/// Market record as read from chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawMarket {
    pub market_id: Option<Scalar>,
    pub coin_type: Option<String>,
    pub decimal_digit: Option<Scalar>,
    pub balance_holding: Option<Scalar>,
    pub borrowed_amount: Option<Scalar>,
    pub compounded_interest: Option<Scalar>,
    /// Last interest accrual, chain milliseconds
    pub last_auto_compound: Option<Scalar>,
    pub xtoken_supply: Option<Scalar>,
    pub xtoken_ratio: Option<Scalar>,
    pub unclaimed_spread_fee: Option<Scalar>,
    pub unclaimed_spread_fee_protocol: Option<Scalar>,
    pub writeoff_amount: Option<Scalar>,
    pub config: Option<RawMarketConfig>,
    /// Set when the record did not have the shape of a market
    #[serde(skip)]
    pub malformed: Option<String>,
}

/// Market risk configuration as read from chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawMarketConfig {
    /// Percent, 0..=100
    pub ltv: Option<Scalar>,
    /// Percent, 0..=100
    pub liquidation_threshold: Option<Scalar>,
    pub deposit_limit: Option<Scalar>,
    pub borrow_limit: Option<Scalar>,
    pub borrow_fee_bps: Option<Scalar>,
    pub borrow_weight: Option<Scalar>,
    pub spread_fee_bps: Option<Scalar>,
    pub protocol_spread_fee_share_bps: Option<Scalar>,
    pub interest_rate_kinks: Option<Vec<Scalar>>,
    pub interest_rates: Option<Vec<Scalar>>,
}

/// Field reader that names the record in every error.
struct Fields<'a> {
    entity: &'a str,
}

impl Fields<'_> {
    fn required<'v, T>(&self, value: &'v Option<T>, field: &str) -> Result<&'v T> {
        value
            .as_ref()
            .ok_or_else(|| SimError::decoding(self.entity, format!("missing field `{field}`")))
    }

    fn u256(&self, value: &Option<Scalar>, field: &str) -> Result<U256> {
        self.required(value, field)?.to_u256().ok_or_else(|| {
            SimError::decoding(self.entity, format!("field `{field}` is not an unsigned integer"))
        })
    }

    fn u64(&self, value: &Option<Scalar>, field: &str) -> Result<u64> {
        self.required(value, field)?.to_u64().ok_or_else(|| {
            SimError::decoding(self.entity, format!("field `{field}` is not a 64-bit integer"))
        })
    }

    fn u64_list(&self, value: &Option<Vec<Scalar>>, field: &str) -> Result<Vec<u64>> {
        self.required(value, field)?
            .iter()
            .map(|item| {
                item.to_u64().ok_or_else(|| {
                    SimError::decoding(self.entity, format!("field `{field}` has a non-integer entry"))
                })
            })
            .collect()
    }

    fn bps(&self, value: &Option<Scalar>, field: &str) -> Result<u64> {
        let bps = self.u64(value, field)?;
        if bps > BPS_SCALE {
            return Err(SimError::configuration(format!(
                "{}: `{field}` is {bps} bps, above {BPS_SCALE}",
                self.entity
            )));
        }
        Ok(bps)
    }

    fn percent(&self, value: &Option<Scalar>, field: &str) -> Result<Decimal> {
        let percent = self.u64(value, field)?;
        if percent > 100 {
            return Err(SimError::configuration(format!(
                "{}: `{field}` is {percent}%, above 100%",
                self.entity
            )));
        }
        Ok(Decimal::from(percent) / Decimal::ONE_HUNDRED)
    }
}

impl RawMarket {
    /// Parses a JSON array of market records.
    ///
    /// Only a document that is not an array fails here. Each element is read
    /// on its own with [`RawMarket::from_value`], so a malformed market is
    /// rejected later by [`RawMarket::decode`] without losing the others.
    pub fn list_from_json(json: &str) -> Result<Vec<RawMarket>> {
        Ok(json_array(json, "market list")?
            .into_iter()
            .map(RawMarket::from_value)
            .collect())
    }

    /// Reads one market record. A record of the wrong shape keeps its
    /// `marketId` (when readable) and the reason in `malformed`.
    pub fn from_value(value: serde_json::Value) -> RawMarket {
        let market_id = value
            .get("marketId")
            .and_then(|id| Scalar::deserialize(id).ok());
        serde_json::from_value(value).unwrap_or_else(|e: serde_json::Error| RawMarket {
            market_id,
            malformed: Some(e.to_string()),
            ..RawMarket::default()
        })
    }

    /// Market identifier, if present and well-formed
    pub fn market_id(&self) -> Option<MarketId> {
        self.market_id.as_ref().and_then(Scalar::to_u64)
    }

    /// Decodes this record into a validated [`MarketState`].
    ///
    /// # Errors
    ///
    /// - [`SimError::Decoding`] if any field is missing or unparsable
    /// - [`SimError::Configuration`] if risk parameters are out of range or the
    ///   rate table is malformed
    pub fn decode(&self) -> Result<MarketState> {
        let entity = match self.market_id() {
            Some(id) => format!("market {id}"),
            None => "market".to_string(),
        };
        if let Some(reason) = &self.malformed {
            return Err(SimError::decoding(&entity, reason.clone()));
        }
        let fields = Fields { entity: &entity };

        let market_id = fields.u64(&self.market_id, "marketId")?;
        let coin_type = normalize_coin_type(fields.required(&self.coin_type, "coinType")?);
        if coin_type.is_empty() {
            return Err(SimError::decoding(&entity, "field `coinType` is empty"));
        }

        let decimals = fields.u64(&self.decimal_digit, "decimalDigit")?;
        let decimals = u8::try_from(decimals)
            .ok()
            .filter(|d| *d <= MAX_DECIMALS)
            .ok_or_else(|| {
                SimError::configuration(format!(
                    "{entity}: {decimals} decimal digits, at most {MAX_DECIMALS} supported"
                ))
            })?;

        let interest = InterestAccrual::new(
            fields.u256(&self.borrowed_amount, "borrowedAmount")?,
            fields.u256(&self.compounded_interest, "compoundedInterest")?,
            fields.u64(&self.last_auto_compound, "lastAutoCompound")?,
        );

        let config = decode_config(fields.required(&self.config, "config")?, &fields)?;

        Ok(MarketState {
            market_id,
            coin_type,
            decimals,
            balance_holding: fields.u256(&self.balance_holding, "balanceHolding")?,
            interest,
            xtoken_supply: fields.u256(&self.xtoken_supply, "xtokenSupply")?,
            xtoken_ratio: fields.u256(&self.xtoken_ratio, "xtokenRatio")?,
            unclaimed_spread_fee: fields.u256(&self.unclaimed_spread_fee, "unclaimedSpreadFee")?,
            unclaimed_spread_fee_protocol: fields
                .u256(&self.unclaimed_spread_fee_protocol, "unclaimedSpreadFeeProtocol")?,
            writeoff_amount: fields.u256(&self.writeoff_amount, "writeoffAmount")?,
            config,
        })
    }
}

fn decode_config(raw: &RawMarketConfig, fields: &Fields<'_>) -> Result<MarketConfig> {
    let ltv = fields.percent(&raw.ltv, "config.ltv")?;
    let liquidation_threshold =
        fields.percent(&raw.liquidation_threshold, "config.liquidationThreshold")?;
    if ltv > liquidation_threshold {
        return Err(SimError::configuration(format!(
            "{}: ltv {ltv} above liquidation threshold {liquidation_threshold}",
            fields.entity
        )));
    }

    let kinks = fields.u64_list(&raw.interest_rate_kinks, "config.interestRateKinks")?;
    let rates = fields.u64_list(&raw.interest_rates, "config.interestRates")?;
    let rate_curve = RateCurve::new(kinks, rates).map_err(|e| match e {
        SimError::Configuration { reason } => {
            SimError::configuration(format!("{}: {reason}", fields.entity))
        }
        other => other,
    })?;

    Ok(MarketConfig {
        ltv,
        liquidation_threshold,
        deposit_limit: fields.u256(&raw.deposit_limit, "config.depositLimit")?,
        borrow_limit: fields.u256(&raw.borrow_limit, "config.borrowLimit")?,
        borrow_fee_bps: fields.bps(&raw.borrow_fee_bps, "config.borrowFeeBps")?,
        borrow_weight_bps: fields.u64(&raw.borrow_weight, "config.borrowWeight")?,
        spread_fee_bps: fields.bps(&raw.spread_fee_bps, "config.spreadFeeBps")?,
        protocol_spread_fee_share_bps: fields.bps(
            &raw.protocol_spread_fee_share_bps,
            "config.protocolSpreadFeeShareBps",
        )?,
        rate_curve,
    })
}

/// Collateral entry of a raw position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawCollateral {
    pub market_id: Option<Scalar>,
    /// xToken shares
    pub amount: Option<Scalar>,
}

/// Loan entry of a raw position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawLoan {
    pub market_id: Option<Scalar>,
    /// Debt in base units as of `borrow_compounded_interest`
    pub amount: Option<Scalar>,
    /// Market interest index when the loan was last touched
    pub borrow_compounded_interest: Option<Scalar>,
}

/// Position record as read from chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawPosition {
    pub position_id: Option<String>,
    pub owner: Option<String>,
    pub collaterals: Vec<RawCollateral>,
    pub loans: Vec<RawLoan>,
    /// Set when the record did not have the shape of a position
    #[serde(skip)]
    pub malformed: Option<String>,
}

impl RawPosition {
    /// Parses a JSON array of position records, one element at a time.
    pub fn list_from_json(json: &str) -> Result<Vec<RawPosition>> {
        Ok(json_array(json, "position list")?
            .into_iter()
            .map(RawPosition::from_value)
            .collect())
    }

    /// Reads one position record, keeping the reason in `malformed` when the
    /// shape is wrong.
    pub fn from_value(value: serde_json::Value) -> RawPosition {
        let position_id = value
            .get("positionId")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string);
        serde_json::from_value(value).unwrap_or_else(|e: serde_json::Error| RawPosition {
            position_id,
            malformed: Some(e.to_string()),
            ..RawPosition::default()
        })
    }

    /// Decodes this record into a [`Position`].
    ///
    /// # Errors
    ///
    /// [`SimError::Decoding`] if an identifier or amount is missing or
    /// unparsable, a market appears twice on the same side, or a loan index is
    /// zero.
    pub fn decode(&self) -> Result<Position> {
        let entity = match &self.position_id {
            Some(id) => format!("position {id}"),
            None => "position".to_string(),
        };
        if let Some(reason) = &self.malformed {
            return Err(SimError::decoding(&entity, reason.clone()));
        }
        let fields = Fields { entity: &entity };

        let position_id = fields.required(&self.position_id, "positionId")?.clone();
        let owner = fields.required(&self.owner, "owner")?.clone();

        let mut collaterals = BTreeMap::new();
        for entry in &self.collaterals {
            let market_id = fields.u64(&entry.market_id, "collaterals.marketId")?;
            let shares = fields.u256(&entry.amount, "collaterals.amount")?;
            if collaterals.insert(market_id, shares).is_some() {
                return Err(SimError::decoding(
                    &entity,
                    format!("market {market_id} listed twice in collaterals"),
                ));
            }
        }

        let mut loans = BTreeMap::new();
        for entry in &self.loans {
            let market_id = fields.u64(&entry.market_id, "loans.marketId")?;
            let amount = fields.u256(&entry.amount, "loans.amount")?;
            let index = match &entry.borrow_compounded_interest {
                None => None,
                Some(_) => Some(
                    fields.u256(&entry.borrow_compounded_interest, "loans.borrowCompoundedInterest")?,
                ),
            };
            if index.is_some_and(|index| index.is_zero()) {
                return Err(SimError::decoding(
                    &entity,
                    format!("loan in market {market_id} has a zero interest index"),
                ));
            }
            let loan = Loan {
                amount,
                borrow_compounded_interest: index,
            };
            if loans.insert(market_id, loan).is_some() {
                return Err(SimError::decoding(
                    &entity,
                    format!("market {market_id} listed twice in loans"),
                ));
            }
        }

        Ok(Position {
            position_id,
            owner,
            collaterals,
            loans,
        })
    }
}

/// A raw position that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedPosition {
    /// Position of the record in the input batch
    pub index: usize,
    /// Position identifier, if present
    pub position_id: Option<String>,
    /// Why the position was rejected
    pub error: SimError,
}

/// Decodes a batch of raw positions, setting aside the ones that fail.
pub fn decode_positions(raw: &[RawPosition]) -> (Vec<Position>, Vec<RejectedPosition>) {
    let mut positions = Vec::with_capacity(raw.len());
    let mut rejected = Vec::new();

    for (index, record) in raw.iter().enumerate() {
        match record.decode() {
            Ok(position) => positions.push(position),
            Err(error) => {
                warn!(index, position_id = ?record.position_id, %error, "Skipping position");
                rejected.push(RejectedPosition {
                    index,
                    position_id: record.position_id.clone(),
                    error,
                });
            }
        }
    }

    (positions, rejected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coin::NATIVE_COIN_TYPE;
    use crate::error::ErrorCategory;
    use crate::math::WAD;
    use rust_decimal_macros::dec;

    fn market_json() -> serde_json::Value {
        serde_json::json!({
            "marketId": "0",
            "coinType": "0000000000000000000000000000000000000000000000000000000000000002::sui::SUI",
            "decimalDigit": 9,
            "balanceHolding": "200000",
            "borrowedAmount": "800000",
            "compoundedInterest": "1000000000000000000",
            "lastAutoCompound": "1700000000000",
            "xtokenSupply": "1000000",
            "xtokenRatio": "1000000000000000000",
            "unclaimedSpreadFee": "0",
            "unclaimedSpreadFeeProtocol": "0",
            "writeoffAmount": "0",
            "config": {
                "ltv": "60",
                "liquidationThreshold": "75",
                "depositLimit": "10000000",
                "borrowLimit": "5000000",
                "borrowFeeBps": "30",
                "borrowWeight": "10000",
                "spreadFeeBps": "2000",
                "protocolSpreadFeeShareBps": "5000",
                "interestRateKinks": ["80", "100"],
                "interestRates": ["500", "4000"]
            }
        })
    }

    fn decode_market(value: serde_json::Value) -> Result<MarketState> {
        serde_json::from_value::<RawMarket>(value).unwrap().decode()
    }

    #[test]
    fn test_parse_bigint() {
        assert_eq!(parse_bigint("1000000000000000000"), Some(WAD));
        assert_eq!(parse_bigint(" 42 "), Some(U256::from(42)));
        assert!(parse_bigint("not-a-number").is_none());
        assert!(parse_bigint("-5").is_none());
    }

    #[test]
    fn test_decode_market() {
        let state = decode_market(market_json()).unwrap();
        assert_eq!(state.market_id, 0);
        assert_eq!(state.coin_type, NATIVE_COIN_TYPE);
        assert_eq!(state.decimals, 9);
        assert_eq!(state.interest.borrowed_amount, U256::from(800_000));
        assert_eq!(state.interest.last_accrual_ms, 1_700_000_000_000);
        assert_eq!(state.xtoken_ratio, WAD);
        assert_eq!(state.config.ltv, dec!(0.6));
        assert_eq!(state.config.liquidation_threshold, dec!(0.75));
        assert_eq!(state.config.rate_curve.kinks(), &[80, 100]);
    }

    #[test]
    fn test_missing_field_is_decoding_error() {
        let mut value = market_json();
        value.as_object_mut().unwrap().remove("xtokenRatio");
        let err = decode_market(value).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Decoding);
        assert!(err.to_string().contains("xtokenRatio"));
        assert!(err.to_string().contains("market 0"));
    }

    #[test]
    fn test_missing_config_field_is_decoding_error() {
        let mut value = market_json();
        value["config"].as_object_mut().unwrap().remove("interestRates");
        let err = decode_market(value).unwrap_err();
        assert!(matches!(err, SimError::Decoding { .. }));
    }

    #[test]
    fn test_malformed_number_is_decoding_error() {
        let mut value = market_json();
        value["balanceHolding"] = serde_json::json!("12abc");
        assert!(matches!(decode_market(value), Err(SimError::Decoding { .. })));
    }

    #[test]
    fn test_mistyped_scalars_are_decoding_errors() {
        for (field, value) in [
            ("decimalDigit", serde_json::json!(9.5)),
            ("borrowedAmount", serde_json::json!(-800_000)),
            ("xtokenSupply", serde_json::json!(true)),
        ] {
            let mut market = market_json();
            market[field] = value;
            let raw = RawMarket::from_value(market);
            assert!(raw.malformed.is_none());
            let err = raw.decode().unwrap_err();
            assert_eq!(err.category(), ErrorCategory::Decoding);
            assert!(err.to_string().contains(field));
        }
    }

    #[test]
    fn test_wrong_shape_keeps_market_id() {
        let mut value = market_json();
        value["marketId"] = serde_json::json!(5);
        value["config"]["interestRates"] = serde_json::json!("500,4000");

        let raw = RawMarket::from_value(value);
        assert!(raw.malformed.is_some());
        assert_eq!(raw.market_id(), Some(5));
        let err = raw.decode().unwrap_err();
        assert!(matches!(err, SimError::Decoding { .. }));
        assert!(err.to_string().contains("market 5"));
    }

    #[test]
    fn test_unsorted_kinks_is_configuration_error() {
        let mut value = market_json();
        value["config"]["interestRateKinks"] = serde_json::json!(["100", "80"]);
        let err = decode_market(value).unwrap_err();
        assert!(matches!(err, SimError::Configuration { .. }));
        assert!(err.to_string().contains("market 0"));
    }

    #[test]
    fn test_ltv_above_threshold_is_configuration_error() {
        let mut value = market_json();
        value["config"]["ltv"] = serde_json::json!("80");
        assert!(matches!(decode_market(value), Err(SimError::Configuration { .. })));

        let mut value = market_json();
        value["config"]["liquidationThreshold"] = serde_json::json!("101");
        assert!(matches!(decode_market(value), Err(SimError::Configuration { .. })));
    }

    #[test]
    fn test_bps_above_scale_is_configuration_error() {
        let mut value = market_json();
        value["config"]["spreadFeeBps"] = serde_json::json!("10001");
        assert!(matches!(decode_market(value), Err(SimError::Configuration { .. })));
    }

    #[test]
    fn test_decimals_out_of_range() {
        let mut value = market_json();
        value["decimalDigit"] = serde_json::json!(40);
        assert!(matches!(decode_market(value), Err(SimError::Configuration { .. })));
    }

    #[test]
    fn test_decode_position() {
        let raw: RawPosition = serde_json::from_value(serde_json::json!({
            "positionId": "0xabc",
            "owner": "0xowner",
            "collaterals": [{ "marketId": "0", "amount": "100" }],
            "loans": [
                { "marketId": 1, "amount": "50", "borrowCompoundedInterest": "1000000000000000000" },
                { "marketId": "2", "amount": "7" }
            ]
        }))
        .unwrap();

        let position = raw.decode().unwrap();
        assert_eq!(position.position_id, "0xabc");
        assert_eq!(position.collaterals.get(&0), Some(&U256::from(100)));
        assert_eq!(position.loans[&1].borrow_compounded_interest, Some(WAD));
        assert_eq!(position.loans[&2].borrow_compounded_interest, None);
    }

    #[test]
    fn test_duplicate_market_in_position() {
        let raw: RawPosition = serde_json::from_value(serde_json::json!({
            "positionId": "0xabc",
            "owner": "0xowner",
            "collaterals": [
                { "marketId": "0", "amount": "100" },
                { "marketId": "0", "amount": "5" }
            ]
        }))
        .unwrap();
        assert!(matches!(raw.decode(), Err(SimError::Decoding { .. })));
    }

    #[test]
    fn test_zero_loan_index_is_rejected() {
        let raw: RawPosition = serde_json::from_value(serde_json::json!({
            "positionId": "0xabc",
            "owner": "0xowner",
            "loans": [{ "marketId": "0", "amount": "10", "borrowCompoundedInterest": "0" }]
        }))
        .unwrap();
        assert!(matches!(raw.decode(), Err(SimError::Decoding { .. })));
    }

    #[test]
    fn test_position_list_isolates_wrong_shape() {
        let raw = RawPosition::list_from_json(
            r#"[
                { "positionId": "0x1", "owner": "0xowner" },
                { "positionId": "0x2", "owner": "0xowner", "collaterals": "none" },
                { "positionId": "0x3", "owner": "0xowner", "loans": [{ "marketId": 0, "amount": 1.5 }] }
            ]"#,
        )
        .unwrap();

        let (positions, rejected) = decode_positions(&raw);
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].position_id, "0x1");
        let ids: Vec<_> = rejected.iter().map(|r| r.position_id.as_deref()).collect();
        assert_eq!(ids, vec![Some("0x2"), Some("0x3")]);
        assert!(rejected
            .iter()
            .all(|r| r.error.category() == ErrorCategory::Decoding));
    }

    #[test]
    fn test_decode_positions_partial_failure() {
        let good = RawPosition {
            position_id: Some("0x1".to_string()),
            owner: Some("0xowner".to_string()),
            ..Default::default()
        };
        let missing_owner = RawPosition {
            position_id: Some("0x2".to_string()),
            ..Default::default()
        };

        let (positions, rejected) = decode_positions(&[good, missing_owner]);
        assert_eq!(positions.len(), 1);
        assert!(positions[0].is_empty());
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].index, 1);
        assert_eq!(rejected[0].position_id.as_deref(), Some("0x2"));
    }
}
