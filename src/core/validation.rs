//! Transaction limits and input validation.

use crate::core::currency::FiatCurrency;
use crate::core::format::format_currency;
use regex::Regex;
use std::sync::LazyLock;

/// Stellar account ids: `G` followed by 55 base32 characters.
static STELLAR_ADDRESS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^G[A-Z2-7]{55}$").expect("Invalid regex pattern"));

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Limits {
    pub min: f64,
    pub max: f64,
}

pub fn get_limits(currency: FiatCurrency) -> Limits {
    match currency {
        FiatCurrency::Ngn => Limits {
            min: 1_000.0,
            max: 500_000.0,
        },
        FiatCurrency::Kes => Limits {
            min: 100.0,
            max: 50_000.0,
        },
        FiatCurrency::Ghs => Limits {
            min: 10.0,
            max: 5_000.0,
        },
        FiatCurrency::Zar => Limits {
            min: 20.0,
            max: 80_000.0,
        },
        FiatCurrency::Ugx => Limits {
            min: 2_000.0,
            max: 1_000_000.0,
        },
    }
}

/// Returns an inline error message for `amount`, or an empty string when the
/// amount is within the currency's limits.
pub fn validate_amount(amount: f64, currency: FiatCurrency) -> String {
    let Limits { min, max } = get_limits(currency);
    if amount.is_nan() || amount <= 0.0 {
        return "Enter an amount to continue.".to_string();
    }
    if amount < min {
        return format!("Minimum amount is {}.", format_currency(min, currency, 0));
    }
    if amount > max {
        return format!("Maximum amount is {}.", format_currency(max, currency, 0));
    }
    String::new()
}

pub fn is_valid_stellar_address(address: &str) -> bool {
    !address.is_empty() && STELLAR_ADDRESS_REGEX.is_match(address)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_ADDRESS: &str = "GBRPYHIL2CI3FNQ4BXLFMNDLFJUNPU2HY3ZMFSHONUCEOASW7QC7OX2H";

    #[test]
    fn test_ngn_limits() {
        assert!(validate_amount(999.0, FiatCurrency::Ngn).contains("Minimum"));
        assert_eq!(validate_amount(1000.0, FiatCurrency::Ngn), "");
        assert_eq!(validate_amount(1001.0, FiatCurrency::Ngn), "");
        assert_eq!(validate_amount(500000.0, FiatCurrency::Ngn), "");
        assert!(validate_amount(500001.0, FiatCurrency::Ngn).contains("Maximum"));
        assert_eq!(
            validate_amount(999.0, FiatCurrency::Ngn),
            "Minimum amount is ₦1,000."
        );
    }

    #[test]
    fn test_rejects_zero_and_negative_amounts() {
        assert!(validate_amount(0.0, FiatCurrency::Ngn).contains("Enter an amount"));
        assert!(validate_amount(-100.0, FiatCurrency::Ngn).contains("Enter an amount"));
        assert!(validate_amount(f64::NAN, FiatCurrency::Kes).contains("Enter an amount"));
    }

    #[test]
    fn test_other_currency_limits() {
        assert!(validate_amount(99.0, FiatCurrency::Kes).contains("Minimum"));
        assert_eq!(validate_amount(100.0, FiatCurrency::Kes), "");
        assert_eq!(validate_amount(50000.0, FiatCurrency::Kes), "");
        assert!(validate_amount(50001.0, FiatCurrency::Kes).contains("Maximum"));
        assert!(validate_amount(9.0, FiatCurrency::Ghs).contains("Minimum"));
        assert_eq!(validate_amount(10.0, FiatCurrency::Ghs), "");
        assert_eq!(
            get_limits(FiatCurrency::Ugx),
            Limits {
                min: 2000.0,
                max: 1_000_000.0
            }
        );
    }

    #[test]
    fn test_valid_stellar_address() {
        assert_eq!(VALID_ADDRESS.len(), 56);
        assert!(is_valid_stellar_address(VALID_ADDRESS));
    }

    #[test]
    fn test_rejects_invalid_stellar_addresses() {
        assert!(!is_valid_stellar_address(""));
        // wrong leading character
        assert!(!is_valid_stellar_address(
            "ABRPYHIL2CI3FNQ4BXLFMNDLFJUNPU2HY3ZMFSHONUCEOASW7QC7OX2H"
        ));
        // too short
        assert!(!is_valid_stellar_address(
            "GBRPYHIL2CI3FNQ4BXLFMNDLFJUNPU2HY3ZMFSHONUCEOASW7QC7OX2"
        ));
        // too long
        assert!(!is_valid_stellar_address(
            "GBRPYHIL2CI3FNQ4BXLFMNDLFJUNPU2HY3ZMFSHONUCEOASW7QC7OX2HX"
        ));
        assert!(!is_valid_stellar_address(
            "GBRPYHIL2CI3FNQ4BXLFMNDLFJUNPU2HY3ZMFSHONUCEOASW7QC7OX2!"
        ));
        assert!(!is_valid_stellar_address(
            "gbrpyhil2ci3fnq4bxlfmndlfjunpu2hy3zmfshonuceoasw7qc7ox2h"
        ));
        // 0, 1, 8 and 9 are outside the base32 alphabet
        assert!(!is_valid_stellar_address(
            "GBRPYHIL2CI3FNQ4BXLFMNDLFJUNPU2HY3ZMFSHONUCEOASW7QC7OX21"
        ));
    }
}
