//! Error types for the accounting engine.

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Identifier of a lending market as assigned on-chain
pub type MarketId = u64;

/// Errors that can occur while projecting markets or valuing positions
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    /// A raw snapshot is missing a required field or a field failed to parse
    #[error("Failed to decode {entity}: {reason}")]
    Decoding { entity: String, reason: String },

    /// A position references a market absent from the market snapshot
    #[error("Market {market_id} not found in market snapshot")]
    MarketNotFound { market_id: MarketId },

    /// No price is available for a coin type
    #[error("Price not found for coin type {coin_type}")]
    PriceNotFound { coin_type: String },

    /// A fixed-point or decimal operation exceeded its working width
    #[error("Arithmetic overflow in {operation}")]
    ArithmeticOverflow { operation: &'static str },

    /// Market risk parameters or the kink table are malformed
    #[error("Invalid market configuration: {reason}")]
    Configuration { reason: String },

    /// Division by zero
    #[error("Division by zero in {operation}")]
    DivisionByZero { operation: &'static str },
}

/// Coarse classification of [`SimError`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Raw input could not be turned into a typed snapshot
    Decoding,
    /// A reference between snapshots does not resolve
    Integrity,
    /// Price input is missing
    Pricing,
    /// Computation exceeded the representable range
    Arithmetic,
    /// Market parameters are inconsistent
    Configuration,
}

impl SimError {
    pub(crate) fn decoding(entity: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Decoding {
            entity: entity.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    pub(crate) fn overflow(operation: &'static str) -> Self {
        Self::ArithmeticOverflow { operation }
    }

    /// Returns the category this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Decoding { .. } => ErrorCategory::Decoding,
            Self::MarketNotFound { .. } => ErrorCategory::Integrity,
            Self::PriceNotFound { .. } => ErrorCategory::Pricing,
            Self::ArithmeticOverflow { .. } | Self::DivisionByZero { .. } => {
                ErrorCategory::Arithmetic
            }
            Self::Configuration { .. } => ErrorCategory::Configuration,
        }
    }
}

/// Errors travel to consumers as their display message.
impl Serialize for SimError {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert_eq!(
            SimError::MarketNotFound { market_id: 7 }.category(),
            ErrorCategory::Integrity
        );
        assert_eq!(
            SimError::PriceNotFound {
                coin_type: "0x2::sui::SUI".to_string()
            }
            .category(),
            ErrorCategory::Pricing
        );
        assert_eq!(
            SimError::overflow("w_pow").category(),
            ErrorCategory::Arithmetic
        );
        assert_eq!(
            SimError::DivisionByZero { operation: "mul_div" }.category(),
            ErrorCategory::Arithmetic
        );
    }

    #[test]
    fn test_error_display() {
        let err = SimError::decoding("market 3", "missing field `xtokenRatio`");
        assert_eq!(
            err.to_string(),
            "Failed to decode market 3: missing field `xtokenRatio`"
        );
    }

    #[test]
    fn test_error_serializes_as_message() {
        let err = SimError::MarketNotFound { market_id: 2 };
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            serde_json::json!("Market 2 not found in market snapshot")
        );
    }
}
