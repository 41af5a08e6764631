//! Exchange-rate abstractions and core types

use crate::core::currency::{
    CryptoAsset, FiatCurrency, OfframpAsset, OfframpChain, STELLAR_PRICE_ID, USD_COIN_PRICE_ID,
};
use crate::core::format::format_rate;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Raw price API payload: price id -> lower-case fiat code -> price.
pub type PriceMap = HashMap<String, HashMap<String, f64>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RateSource {
    #[serde(rename = "coingecko")]
    Live,
    #[serde(rename = "cache")]
    Cache,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRateResult {
    pub fiat: FiatCurrency,
    pub asset: CryptoAsset,
    /// Units of `asset` per unit of `fiat`.
    pub rate: f64,
    pub source: RateSource,
    pub last_updated: DateTime<Utc>,
}

impl ExchangeRateResult {
    pub fn display_rate(&self) -> String {
        format!("1 {} = {} {}", self.fiat, format_rate(self.rate, 8), self.asset)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RateError {
    #[error("Exchange rate request failed: {status}")]
    Http { status: u16 },
    #[error("Exchange rate request failed: {0}")]
    Transport(String),
    #[error("Failed to parse exchange rate response: {0}")]
    Decode(String),
    #[error("Exchange rate unavailable for selected currency.")]
    MissingPrice { fiat: FiatCurrency },
    #[error("Unable to fetch exchange rates.")]
    NoRateAvailable,
}

impl RateError {
    /// Whether another attempt against the price API could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RateError::Http { .. } | RateError::Transport(_) | RateError::Decode(_)
        )
    }
}

#[async_trait]
pub trait RateProvider: Send + Sync {
    async fn fetch_prices(&self) -> Result<PriceMap, RateError>;
}

fn positive_price(prices: &PriceMap, price_id: &str, fiat: FiatCurrency) -> Option<f64> {
    prices
        .get(price_id)
        .and_then(|by_fiat| by_fiat.get(&fiat.api_key()))
        .copied()
        .filter(|price| *price > 0.0)
}

/// Derives the fiat -> asset rate from a price snapshot. Both the USD coin and
/// Stellar prices must be quoted for `fiat`.
pub fn build_rate_result(
    fiat: FiatCurrency,
    asset: CryptoAsset,
    prices: &PriceMap,
    source: RateSource,
    last_updated: DateTime<Utc>,
) -> Result<ExchangeRateResult, RateError> {
    let usdc_price = positive_price(prices, USD_COIN_PRICE_ID, fiat);
    let xlm_price = positive_price(prices, STELLAR_PRICE_ID, fiat);
    let (Some(usdc_price), Some(xlm_price)) = (usdc_price, xlm_price) else {
        return Err(RateError::MissingPrice { fiat });
    };

    let price = if asset.price_id() == STELLAR_PRICE_ID {
        xlm_price
    } else {
        usdc_price
    };

    Ok(ExchangeRateResult {
        fiat,
        asset,
        rate: 1.0 / price,
        source,
        last_updated,
    })
}

/// Fiat received per unit of an off-ramp asset on the given chain.
pub fn offramp_rate(asset: OfframpAsset, chain: OfframpChain) -> f64 {
    let base = match asset {
        OfframpAsset::CNgn => 1584.0,
        OfframpAsset::Usdc => 1500.0,
        OfframpAsset::Usdt => 1490.0,
        OfframpAsset::Xlm => 420.0,
    };
    let chain_multiplier = match chain {
        OfframpChain::Ethereum => 1.01,
        OfframpChain::Polygon => 0.995,
        OfframpChain::Base => 1.002,
        OfframpChain::Stellar => 1.0,
    };
    base * chain_multiplier
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_prices() -> PriceMap {
        serde_json::from_str(
            r#"{
                "usd-coin": {"ngn": 1600.0, "kes": 129.0, "ghs": 12.5, "zar": 18.0, "ugx": 3700.0},
                "stellar": {"ngn": 400.0, "kes": 32.0}
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_build_rate_for_stablecoin_and_xlm() {
        let prices = sample_prices();
        let now = Utc::now();

        let usdc = build_rate_result(
            FiatCurrency::Ngn,
            CryptoAsset::CNgn,
            &prices,
            RateSource::Live,
            now,
        )
        .unwrap();
        assert_eq!(usdc.rate, 1.0 / 1600.0);
        assert_eq!(usdc.source, RateSource::Live);

        let xlm = build_rate_result(
            FiatCurrency::Ngn,
            CryptoAsset::Xlm,
            &prices,
            RateSource::Cache,
            now,
        )
        .unwrap();
        assert_eq!(xlm.rate, 1.0 / 400.0);
        assert_eq!(xlm.display_rate(), "1 NGN = 0.0025 XLM");
    }

    #[test]
    fn test_missing_price_is_not_retryable() {
        let prices = sample_prices();
        // GHS has no Stellar quote
        let err = build_rate_result(
            FiatCurrency::Ghs,
            CryptoAsset::CGhs,
            &prices,
            RateSource::Live,
            Utc::now(),
        )
        .unwrap_err();
        assert_eq!(err, RateError::MissingPrice { fiat: FiatCurrency::Ghs });
        assert!(!err.is_retryable());
        assert_eq!(
            err.to_string(),
            "Exchange rate unavailable for selected currency."
        );
        assert!(RateError::Http { status: 503 }.is_retryable());
    }

    #[test]
    fn test_offramp_rate_applies_chain_multiplier() {
        assert_eq!(offramp_rate(OfframpAsset::CNgn, OfframpChain::Stellar), 1584.0);
        assert_eq!(offramp_rate(OfframpAsset::Usdc, OfframpChain::Ethereum), 1515.0);
        assert!((offramp_rate(OfframpAsset::Usdt, OfframpChain::Polygon) - 1482.55).abs() < 1e-9);
    }
}
