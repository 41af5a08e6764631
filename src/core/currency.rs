//! Fiat currencies, crypto assets and payment methods supported by the ramps.

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FiatCurrency {
    Ngn,
    Kes,
    Ghs,
    Zar,
    Ugx,
}

impl FiatCurrency {
    pub const ALL: [FiatCurrency; 5] = [
        FiatCurrency::Ngn,
        FiatCurrency::Kes,
        FiatCurrency::Ghs,
        FiatCurrency::Zar,
        FiatCurrency::Ugx,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            FiatCurrency::Ngn => "NGN",
            FiatCurrency::Kes => "KES",
            FiatCurrency::Ghs => "GHS",
            FiatCurrency::Zar => "ZAR",
            FiatCurrency::Ugx => "UGX",
        }
    }

    /// Key used by the price API for this currency.
    pub fn api_key(&self) -> String {
        self.code().to_lowercase()
    }

    /// Asset paired with this currency when the user holds a local stablecoin.
    pub fn paired_asset(&self) -> CryptoAsset {
        match self {
            FiatCurrency::Ngn => CryptoAsset::CNgn,
            FiatCurrency::Kes => CryptoAsset::CKes,
            FiatCurrency::Ghs => CryptoAsset::CGhs,
            FiatCurrency::Zar | FiatCurrency::Ugx => CryptoAsset::Usdc,
        }
    }
}

impl Display for FiatCurrency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for FiatCurrency {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "NGN" => Ok(FiatCurrency::Ngn),
            "KES" => Ok(FiatCurrency::Kes),
            "GHS" => Ok(FiatCurrency::Ghs),
            "ZAR" => Ok(FiatCurrency::Zar),
            "UGX" => Ok(FiatCurrency::Ugx),
            _ => Err(anyhow!("Unsupported fiat currency: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CryptoAsset {
    #[serde(rename = "cNGN")]
    CNgn,
    #[serde(rename = "cKES")]
    CKes,
    #[serde(rename = "cGHS")]
    CGhs,
    #[serde(rename = "USDC")]
    Usdc,
    #[serde(rename = "XLM")]
    Xlm,
}

impl CryptoAsset {
    pub fn code(&self) -> &'static str {
        match self {
            CryptoAsset::CNgn => "cNGN",
            CryptoAsset::CKes => "cKES",
            CryptoAsset::CGhs => "cGHS",
            CryptoAsset::Usdc => "USDC",
            CryptoAsset::Xlm => "XLM",
        }
    }

    /// Local-currency stablecoins follow the selected fiat currency.
    pub fn is_local_stablecoin(&self) -> bool {
        self.code().starts_with('c')
    }

    /// Identifier of the price series this asset is quoted against.
    pub fn price_id(&self) -> &'static str {
        match self {
            CryptoAsset::Xlm => STELLAR_PRICE_ID,
            _ => USD_COIN_PRICE_ID,
        }
    }
}

pub const USD_COIN_PRICE_ID: &str = "usd-coin";
pub const STELLAR_PRICE_ID: &str = "stellar";

impl Display for CryptoAsset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for CryptoAsset {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cngn" => Ok(CryptoAsset::CNgn),
            "ckes" => Ok(CryptoAsset::CKes),
            "cghs" => Ok(CryptoAsset::CGhs),
            "usdc" => Ok(CryptoAsset::Usdc),
            "xlm" => Ok(CryptoAsset::Xlm),
            _ => Err(anyhow!("Unsupported crypto asset: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    BankTransfer,
    Card,
    MobileMoney,
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                PaymentMethod::BankTransfer => "bank_transfer",
                PaymentMethod::Card => "card",
                PaymentMethod::MobileMoney => "mobile_money",
            }
        )
    }
}

impl FromStr for PaymentMethod {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "bank_transfer" | "bank" => Ok(PaymentMethod::BankTransfer),
            "card" => Ok(PaymentMethod::Card),
            "mobile_money" | "momo" => Ok(PaymentMethod::MobileMoney),
            _ => Err(anyhow!("Unsupported payment method: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OfframpChain {
    Stellar,
    Ethereum,
    Polygon,
    Base,
}

impl Display for OfframpChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                OfframpChain::Stellar => "Stellar",
                OfframpChain::Ethereum => "Ethereum",
                OfframpChain::Polygon => "Polygon",
                OfframpChain::Base => "Base",
            }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OfframpAsset {
    #[serde(rename = "cNGN")]
    CNgn,
    #[serde(rename = "USDC")]
    Usdc,
    #[serde(rename = "USDT")]
    Usdt,
    #[serde(rename = "XLM")]
    Xlm,
}

impl Display for OfframpAsset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                OfframpAsset::CNgn => "cNGN",
                OfframpAsset::Usdc => "USDC",
                OfframpAsset::Usdt => "USDT",
                OfframpAsset::Xlm => "XLM",
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_currency_codes() {
        assert_eq!("ngn".parse::<FiatCurrency>().unwrap(), FiatCurrency::Ngn);
        assert_eq!("UGX".parse::<FiatCurrency>().unwrap(), FiatCurrency::Ugx);
        assert!("USD".parse::<FiatCurrency>().is_err());

        assert_eq!("cNGN".parse::<CryptoAsset>().unwrap(), CryptoAsset::CNgn);
        assert_eq!("xlm".parse::<CryptoAsset>().unwrap(), CryptoAsset::Xlm);
        assert!("BTC".parse::<CryptoAsset>().is_err());

        assert_eq!(
            "mobile-money".parse::<PaymentMethod>().unwrap(),
            PaymentMethod::MobileMoney
        );
    }

    #[test]
    fn test_serde_uses_wire_names() {
        let json = serde_json::to_string(&(
            FiatCurrency::Kes,
            CryptoAsset::CGhs,
            PaymentMethod::BankTransfer,
        ))
        .unwrap();
        assert_eq!(json, r#"["KES","cGHS","bank_transfer"]"#);
    }

    #[test]
    fn test_paired_assets() {
        assert_eq!(FiatCurrency::Ghs.paired_asset(), CryptoAsset::CGhs);
        assert_eq!(FiatCurrency::Zar.paired_asset(), CryptoAsset::Usdc);
        assert!(CryptoAsset::CKes.is_local_stablecoin());
        assert!(!CryptoAsset::Usdc.is_local_stablecoin());
        assert_eq!(CryptoAsset::Xlm.price_id(), "stellar");
        assert_eq!(CryptoAsset::CNgn.price_id(), "usd-coin");
    }
}
