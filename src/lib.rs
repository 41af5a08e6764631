pub mod cli;
pub mod core;
pub mod exchange;
pub mod providers;
pub mod store;

use crate::core::cache::Store;
use crate::core::config::AppConfig;
use crate::core::currency::{CryptoAsset, FiatCurrency, PaymentMethod};
use crate::core::order::BankDetails;
use crate::exchange::ExchangeRateService;
use crate::providers::coingecko::CoinGeckoProvider;
use crate::store::{KeyValueStore, LOCAL_STORAGE};
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    Rate {
        fiat: Option<FiatCurrency>,
        asset: Option<CryptoAsset>,
    },
    Watch {
        fiat: Option<FiatCurrency>,
        asset: Option<CryptoAsset>,
        cycles: Option<u32>,
    },
    Quote(QuoteArgs),
    Offramp(OfframpArgs),
    Order(OrderCommand),
    Wallet(WalletCommand),
    Address {
        address: String,
    },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct QuoteArgs {
    pub amount: String,
    pub fiat: Option<FiatCurrency>,
    pub asset: Option<CryptoAsset>,
    pub payment_method: Option<PaymentMethod>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct OfframpArgs {
    /// Amount of the selected asset; ignored when `max` is set.
    pub amount: Option<String>,
    pub asset_id: Option<String>,
    pub fiat: Option<FiatCurrency>,
    pub max: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OrderCommand {
    CreateOnramp(QuoteArgs),
    CreateOfframp(OfframpArgs),
    List,
    Show {
        id: String,
    },
    Advance {
        id: String,
        fail: bool,
        tx_hash: Option<String>,
        /// Payout account, required to move an off-ramp order past
        /// `pending_bank_details`.
        bank_details: Option<BankDetails>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum WalletCommand {
    Connect { address: String },
    List,
    Disconnect,
}

/// Shared resources for a single command run.
pub struct AppContext {
    pub config: AppConfig,
    pub store: KeyValueStore,
}

impl AppContext {
    pub fn new(config: AppConfig) -> Result<Self> {
        let data_path = config.default_data_path()?;
        debug!("Using data path {}", data_path.display());
        let store = KeyValueStore::open(&data_path);
        Ok(Self { config, store })
    }

    pub fn local_storage(&self) -> Arc<dyn core::cache::KeyValueCollection> {
        self.store.get_collection(LOCAL_STORAGE)
    }

    pub fn rate_service(&self) -> Result<Arc<ExchangeRateService>> {
        let provider = CoinGeckoProvider::new(self.config.coingecko_base_url())?;
        Ok(Arc::new(ExchangeRateService::new(
            Arc::new(provider),
            self.local_storage(),
            &self.config.refresh,
        )))
    }
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("aframp starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let context = AppContext::new(config)?;

    match command {
        AppCommand::Rate { fiat, asset } => cli::rate::run(&context, fiat, asset).await,
        AppCommand::Watch {
            fiat,
            asset,
            cycles,
        } => cli::rate::watch(&context, fiat, asset, cycles).await,
        AppCommand::Quote(args) => cli::quote::run_onramp(&context, &args).await,
        AppCommand::Offramp(args) => cli::quote::run_offramp(&context, &args).await,
        AppCommand::Order(command) => cli::order::run(&context, command).await,
        AppCommand::Wallet(command) => cli::wallet::run(&context, command).await,
        AppCommand::Address { address } => cli::wallet::check_address(&address),
    }
}
