//! Externally supplied coin prices.
//!
//! The engine never fetches prices. Callers resolve them from their oracle or
//! price API and hand over a [`PriceMap`]; a coin type missing from the map is
//! reported as [`SimError::PriceNotFound`], never valued at zero.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::coin::normalize_coin_type;
use crate::error::{Result, SimError};

/// USD price of one whole token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Price {
    /// Price mantissa
    pub price: Decimal,
    /// Power of ten applied to `price`
    #[serde(default)]
    pub exponent: i32,
    /// Publish time reported by the price source (seconds)
    #[serde(default)]
    pub publish_time: u64,
}

impl Price {
    /// Create a price with no exponent
    pub fn new(price: Decimal) -> Self {
        Self {
            price,
            exponent: 0,
            publish_time: 0,
        }
    }

    /// Set the power-of-ten exponent
    pub fn with_exponent(mut self, exponent: i32) -> Self {
        self.exponent = exponent;
        self
    }

    /// Set the publish time
    pub fn with_publish_time(mut self, publish_time: u64) -> Self {
        self.publish_time = publish_time;
        self
    }

    /// Returns `price * 10^exponent`.
    pub fn value(&self) -> Result<Decimal> {
        let factor = if self.exponent >= 0 {
            10i64
                .checked_pow(self.exponent.unsigned_abs())
                .map(Decimal::from)
                .ok_or(SimError::overflow("price_exponent"))?
        } else {
            Decimal::try_from_i128_with_scale(1, self.exponent.unsigned_abs())
                .map_err(|_| SimError::overflow("price_exponent"))?
        };
        self.price
            .checked_mul(factor)
            .ok_or(SimError::overflow("price_exponent"))
    }
}

/// Coin type to price mapping with normalized keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "HashMap<String, Price>", into = "HashMap<String, Price>")]
pub struct PriceMap {
    prices: HashMap<String, Price>,
}

impl PriceMap {
    /// Create an empty price map
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON object of `coinType -> { price, exponent, publishTime }`.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| SimError::decoding("price map", e.to_string()))
    }

    /// Insert or replace the price of a coin type
    pub fn insert(&mut self, coin_type: &str, price: Price) {
        self.prices.insert(normalize_coin_type(coin_type), price);
    }

    /// Look up the raw price entry for a coin type
    pub fn get(&self, coin_type: &str) -> Option<&Price> {
        self.prices.get(&normalize_coin_type(coin_type))
    }

    /// Resolves the USD value of one whole token.
    ///
    /// # Errors
    ///
    /// - [`SimError::PriceNotFound`] if the coin type has no entry
    /// - [`SimError::Decoding`] if the entry is negative
    pub fn price_of(&self, coin_type: &str) -> Result<Decimal> {
        let price = self.get(coin_type).ok_or_else(|| SimError::PriceNotFound {
            coin_type: normalize_coin_type(coin_type),
        })?;
        let value = price.value()?;
        if value.is_sign_negative() && !value.is_zero() {
            return Err(SimError::decoding(
                format!("price for {coin_type}"),
                format!("negative price {value}"),
            ));
        }
        Ok(value)
    }

    /// Number of priced coin types
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    /// Returns true if no prices are present
    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// Iterate over normalized coin types and their prices
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Price)> {
        self.prices.iter()
    }
}

impl From<HashMap<String, Price>> for PriceMap {
    fn from(prices: HashMap<String, Price>) -> Self {
        prices.into_iter().collect()
    }
}

impl From<PriceMap> for HashMap<String, Price> {
    fn from(map: PriceMap) -> Self {
        map.prices
    }
}

impl<S: AsRef<str>> FromIterator<(S, Price)> for PriceMap {
    fn from_iter<I: IntoIterator<Item = (S, Price)>>(iter: I) -> Self {
        let mut map = PriceMap::new();
        for (coin_type, price) in iter {
            map.insert(coin_type.as_ref(), price);
        }
        map
    }
}
