//! Fee breakdowns and conversion arithmetic for both ramps.
//!
//! Amounts are plain `f64`; rounding only happens when values are formatted
//! for display.

use crate::core::currency::{FiatCurrency, PaymentMethod};
use crate::core::validation::Limits;
use serde::{Deserialize, Serialize};

const CARD_FEE_RATE: f64 = 0.015;
const MOBILE_MONEY_FEE_RATE: f64 = 0.005;

pub const OFFRAMP_FEE_RATE: f64 = 0.01;
const DEFAULT_CHAIN_NETWORK_FEE: f64 = 15.0;

pub const OFFRAMP_LIMITS: Limits = Limits {
    min: 5_000.0,
    max: 5_000_000.0,
};
pub const OFFRAMP_LIQUIDITY_LIMIT: f64 = 1_500_000.0;
pub const OFFRAMP_DAILY_LIMIT: f64 = 5_000_000.0;
pub const OFFRAMP_DAILY_USED: f64 = 1_250_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeBreakdown {
    pub processing_fee: f64,
    pub network_fee: f64,
    pub total_fees: f64,
    pub total_cost: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfframpFeeBreakdown {
    pub offramp_fee: f64,
    pub network_fee: f64,
    pub bank_fee: f64,
    pub total_fees: f64,
    pub receive_amount: f64,
}

fn is_positive(value: f64) -> bool {
    value > 0.0
}

pub fn calculate_crypto_amount(fiat_amount: f64, rate: f64) -> f64 {
    if !is_positive(fiat_amount) || !is_positive(rate) {
        return 0.0;
    }
    fiat_amount * rate
}

pub fn calculate_processing_fee(amount: f64, method: PaymentMethod) -> f64 {
    if !is_positive(amount) {
        return 0.0;
    }
    match method {
        PaymentMethod::Card => amount * CARD_FEE_RATE,
        PaymentMethod::MobileMoney => amount * MOBILE_MONEY_FEE_RATE,
        PaymentMethod::BankTransfer => 0.0,
    }
}

pub fn calculate_network_fee(currency: FiatCurrency) -> f64 {
    match currency {
        FiatCurrency::Ngn => 0.15,
        FiatCurrency::Kes => 0.5,
        FiatCurrency::Ghs => 0.05,
        FiatCurrency::Zar => 0.1,
        FiatCurrency::Ugx => 10.0,
    }
}

pub fn calculate_fee_breakdown(
    amount: f64,
    currency: FiatCurrency,
    method: PaymentMethod,
) -> FeeBreakdown {
    let processing_fee = calculate_processing_fee(amount, method);
    let network_fee = calculate_network_fee(currency);
    let total_fees = processing_fee + network_fee;
    FeeBreakdown {
        processing_fee,
        network_fee,
        total_fees,
        total_cost: amount + total_fees,
    }
}

pub fn calculate_fiat_amount(amount: f64, rate: f64) -> f64 {
    if !is_positive(amount) {
        return 0.0;
    }
    amount * rate
}

/// Flat settlement fee charged per chain, by chain name.
pub fn chain_network_fee(chain: &str) -> f64 {
    match chain {
        "Stellar" => 15.0,
        "Ethereum" => 1500.0,
        "Polygon" => 120.0,
        "Base" => 200.0,
        _ => DEFAULT_CHAIN_NETWORK_FEE,
    }
}

pub fn calculate_offramp_fees(fiat_amount: f64, chain: &str, fee_rate: f64) -> OfframpFeeBreakdown {
    let offramp_fee = fiat_amount * fee_rate;
    let network_fee = chain_network_fee(chain);
    let bank_fee = 0.0;
    let total_fees = offramp_fee + network_fee + bank_fee;
    OfframpFeeBreakdown {
        offramp_fee,
        network_fee,
        bank_fee,
        total_fees,
        receive_amount: (fiat_amount - total_fees).max(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crypto_amount() {
        assert_eq!(calculate_crypto_amount(1000.0, 0.0012), 1.2);
        assert_eq!(calculate_crypto_amount(50000.0, 0.00085), 42.5);
        assert_eq!(calculate_crypto_amount(1.0, 1.0), 1.0);
        assert_eq!(calculate_crypto_amount(0.01, 100.0), 1.0);
    }

    #[test]
    fn test_crypto_amount_non_positive_inputs() {
        assert_eq!(calculate_crypto_amount(0.0, 0.0012), 0.0);
        assert_eq!(calculate_crypto_amount(-100.0, 0.0012), 0.0);
        assert_eq!(calculate_crypto_amount(1000.0, 0.0), 0.0);
        assert_eq!(calculate_crypto_amount(1000.0, -1.0), 0.0);
        assert_eq!(calculate_crypto_amount(f64::NAN, 1.0), 0.0);
    }

    #[test]
    fn test_processing_fees() {
        assert_eq!(calculate_processing_fee(10000.0, PaymentMethod::BankTransfer), 0.0);
        assert_eq!(calculate_processing_fee(500000.0, PaymentMethod::BankTransfer), 0.0);
        assert_eq!(calculate_processing_fee(10000.0, PaymentMethod::Card), 150.0);
        assert_eq!(calculate_processing_fee(50000.0, PaymentMethod::Card), 750.0);
        assert_eq!(calculate_processing_fee(10000.0, PaymentMethod::MobileMoney), 50.0);
        assert_eq!(calculate_processing_fee(50000.0, PaymentMethod::MobileMoney), 250.0);
        assert_eq!(calculate_processing_fee(0.0, PaymentMethod::Card), 0.0);
        assert_eq!(calculate_processing_fee(-100.0, PaymentMethod::Card), 0.0);
    }

    #[test]
    fn test_fee_breakdown() {
        let fees = calculate_fee_breakdown(10000.0, FiatCurrency::Ngn, PaymentMethod::Card);
        assert_eq!(fees.processing_fee, 150.0);
        assert_eq!(fees.network_fee, 0.15);
        assert!((fees.total_fees - 150.15).abs() < 1e-9);
        assert!((fees.total_cost - 10150.15).abs() < 1e-9);

        let fees = calculate_fee_breakdown(0.0, FiatCurrency::Ugx, PaymentMethod::MobileMoney);
        assert_eq!(fees.processing_fee, 0.0);
        assert_eq!(fees.total_fees, 10.0);
    }

    #[test]
    fn test_offramp_fees() {
        let fees = calculate_offramp_fees(79200.0, "Stellar", OFFRAMP_FEE_RATE);
        assert_eq!(fees.offramp_fee, 792.0);
        assert_eq!(fees.network_fee, 15.0);
        assert_eq!(fees.bank_fee, 0.0);
        assert_eq!(fees.total_fees, 807.0);
        assert_eq!(fees.receive_amount, 78393.0);

        assert_eq!(calculate_offramp_fees(0.0, "Ethereum", OFFRAMP_FEE_RATE).network_fee, 1500.0);
        assert_eq!(calculate_offramp_fees(0.0, "Solana", OFFRAMP_FEE_RATE).network_fee, 15.0);
    }

    #[test]
    fn test_offramp_receive_amount_floors_at_zero() {
        let fees = calculate_offramp_fees(100.0, "Ethereum", OFFRAMP_FEE_RATE);
        assert_eq!(fees.receive_amount, 0.0);
        assert!(fees.total_fees > 100.0);
    }

    #[test]
    fn test_fiat_amount() {
        assert_eq!(calculate_fiat_amount(50.0, 1584.0), 79200.0);
        assert_eq!(calculate_fiat_amount(0.0, 1584.0), 0.0);
        assert_eq!(calculate_fiat_amount(-5.0, 1584.0), 0.0);
    }
}
