use crate::core::currency::{CryptoAsset, FiatCurrency, PaymentMethod};
use crate::core::form::{OfframpAssetOption, default_offramp_assets};
use crate::core::validation::is_valid_stellar_address;
use crate::providers::coingecko::DEFAULT_BASE_URL;
use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CoinGeckoProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub coingecko: Option<CoinGeckoProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            coingecko: Some(CoinGeckoProviderConfig {
                base_url: DEFAULT_BASE_URL.to_string(),
            }),
        }
    }
}

/// Initial selections for a fresh on-ramp quote.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct DefaultsConfig {
    pub fiat: FiatCurrency,
    pub asset: CryptoAsset,
    pub payment_method: PaymentMethod,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        DefaultsConfig {
            fiat: FiatCurrency::Ngn,
            asset: CryptoAsset::CNgn,
            payment_method: PaymentMethod::BankTransfer,
        }
    }
}

/// Exchange-rate refresh policy.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct RefreshConfig {
    pub countdown_seconds: u32,
    /// Total attempts per refresh, including the first.
    pub attempts: usize,
    /// Delay after the first failed attempt; doubled after each further one.
    pub backoff_ms: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        RefreshConfig {
            countdown_seconds: 30,
            attempts: 3,
            backoff_ms: 300,
        }
    }
}

/// Staging account that receives off-ramp deposits.
pub const DEFAULT_SETTLEMENT_ADDRESS: &str =
    "GAFRAMPSTAGINGWALLETADDRESSXYZ234567ABCDEFGHIJKLMNOPQRST";

fn default_settlement_address() -> String {
    DEFAULT_SETTLEMENT_ADDRESS.to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
    #[serde(default = "default_offramp_assets")]
    pub offramp_assets: Vec<OfframpAssetOption>,
    #[serde(default = "default_settlement_address")]
    pub settlement_address: String,
    pub data_path: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            providers: ProvidersConfig::default(),
            defaults: DefaultsConfig::default(),
            refresh: RefreshConfig::default(),
            offramp_assets: default_offramp_assets(),
            settlement_address: default_settlement_address(),
            data_path: None,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("org", "aframp", "aframp")
            .context("Could not determine project directories")
    }

    pub fn default_config_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        Ok(Self::project_dirs()?.data_dir().to_path_buf())
    }

    pub fn coingecko_base_url(&self) -> &str {
        self.providers
            .coingecko
            .as_ref()
            .map_or(DEFAULT_BASE_URL, |p| &p.base_url)
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config.validate()?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !is_valid_stellar_address(&self.settlement_address) {
            bail!(
                "Invalid settlement_address in config: {}",
                self.settlement_address
            );
        }
        Ok(())
    }
}
