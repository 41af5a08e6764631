use crate::core::currency::{FiatCurrency, STELLAR_PRICE_ID, USD_COIN_PRICE_ID};
use crate::core::rate::{PriceMap, RateError, RateProvider};
use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use tracing::{debug, error, instrument};

pub const DEFAULT_BASE_URL: &str = "https://api.coingecko.com";

/// Price provider backed by the CoinGecko `simple/price` endpoint.
pub struct CoinGeckoProvider {
    base_url: String,
    client: reqwest::Client,
}

impl CoinGeckoProvider {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder().user_agent("aframp/1.0").build()?;
        Ok(CoinGeckoProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn price_url(&self) -> String {
        let vs_currencies = FiatCurrency::ALL
            .iter()
            .map(|fiat| fiat.api_key())
            .collect::<Vec<_>>()
            .join(",");
        format!(
            "{}/api/v3/simple/price?ids={},{}&vs_currencies={}",
            self.base_url, USD_COIN_PRICE_ID, STELLAR_PRICE_ID, vs_currencies
        )
    }
}

#[async_trait]
impl RateProvider for CoinGeckoProvider {
    #[instrument(name = "CoinGeckoPriceFetch", skip(self))]
    async fn fetch_prices(&self) -> Result<PriceMap, RateError> {
        let url = self.price_url();
        debug!("Requesting prices from {}", url);

        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| RateError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RateError::Http {
                status: status.as_u16(),
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| RateError::Transport(e.to_string()))?;

        serde_json::from_str::<PriceMap>(&text).map_err(|e| {
            error!(
                error = ?e,
                response = %text,
                "Failed to parse price response"
            );
            RateError::Decode(e.to_string())
        })
    }
}
