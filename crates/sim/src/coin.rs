//! Coin type identifiers.
//!
//! Chain records spell the same coin type in several ways: with or without a
//! `0x` prefix, with the address zero-padded to 32 bytes or not. Market
//! snapshots and price maps both pass through [`normalize_coin_type`] so lookups
//! agree regardless of the source's spelling.

/// Canonical spelling of the native gas coin
pub const NATIVE_COIN_TYPE: &str = "0x2::sui::SUI";

/// Hex digits in a full 32-byte address
const ADDRESS_HEX_LEN: usize = 64;

/// Normalizes a fully-qualified coin type.
///
/// Every variant of the native coin collapses to [`NATIVE_COIN_TYPE`]. Other
/// coin types get a lowercase, `0x`-prefixed, zero-padded package address.
/// Anything that does not look like `<address>::<module>::<name>` is returned
/// trimmed but otherwise unchanged.
///
/// # Example
///
/// ```rust
/// use xlend_rs_sim::coin::{normalize_coin_type, NATIVE_COIN_TYPE};
///
/// let long = "0x0000000000000000000000000000000000000000000000000000000000000002::sui::SUI";
/// assert_eq!(normalize_coin_type(long), NATIVE_COIN_TYPE);
/// assert_eq!(normalize_coin_type("0x2::sui::SUI"), NATIVE_COIN_TYPE);
/// ```
pub fn normalize_coin_type(coin_type: &str) -> String {
    let trimmed = coin_type.trim();
    let Some((address, rest)) = trimmed.split_once("::") else {
        return trimmed.to_string();
    };

    let hex = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .unwrap_or(address)
        .to_ascii_lowercase();

    if hex.is_empty() || hex.len() > ADDRESS_HEX_LEN || !hex.chars().all(|c| c.is_ascii_hexdigit())
    {
        return trimmed.to_string();
    }

    if hex.trim_start_matches('0') == "2" && rest == "sui::SUI" {
        return NATIVE_COIN_TYPE.to_string();
    }

    format!("0x{hex:0>ADDRESS_HEX_LEN$}::{rest}")
}

/// Returns true if the coin type is the native gas coin in any spelling
pub fn is_native_coin(coin_type: &str) -> bool {
    normalize_coin_type(coin_type) == NATIVE_COIN_TYPE
}

#[cfg(test)]
mod tests {
    use super::*;

    const USDC_COIN_TYPE: &str = "0xdba34672e30cb065b1f93e3ab55318768fd6fef66c15942c9f7cb846e2f900e7::usdc::USDC";

    #[test]
    fn test_native_coin_variants() {
        let variants = [
            "0x2::sui::SUI",
            "0x0000000000000000000000000000000000000000000000000000000000000002::sui::SUI",
            "0000000000000000000000000000000000000000000000000000000000000002::sui::SUI",
            "2::sui::SUI",
            " 0x02::sui::SUI ",
        ];
        for variant in variants {
            assert_eq!(normalize_coin_type(variant), NATIVE_COIN_TYPE, "{variant}");
            assert!(is_native_coin(variant));
        }
    }

    #[test]
    fn test_full_length_address_is_kept() {
        assert_eq!(normalize_coin_type(USDC_COIN_TYPE), USDC_COIN_TYPE);
        let without_prefix = USDC_COIN_TYPE.trim_start_matches("0x");
        assert_eq!(normalize_coin_type(without_prefix), USDC_COIN_TYPE);
    }

    #[test]
    fn test_short_address_is_padded() {
        assert_eq!(
            normalize_coin_type("0xABC::coin::COIN"),
            "0x0000000000000000000000000000000000000000000000000000000000000abc::coin::COIN"
        );
    }

    #[test]
    fn test_unparseable_input_is_trimmed() {
        assert_eq!(normalize_coin_type("  not-a-coin "), "not-a-coin");
        assert_eq!(normalize_coin_type("0xzz::a::B"), "0xzz::a::B");
        assert!(!is_native_coin("0x2::coin::Coin"));
    }
}
