//! Exchange-rate acquisition: fetch with retry, cache fallback and a
//! countdown-driven refresher.

use crate::core::cache::{KeyValueCollection, get_json, put_json};
use crate::core::config::RefreshConfig;
use crate::core::currency::{CryptoAsset, FiatCurrency};
use crate::core::rate::{
    ExchangeRateResult, PriceMap, RateError, RateProvider, RateSource, build_rate_result,
};
use crate::providers::util::with_backoff;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, warn};

pub const RATES_KEY: &str = "onramp:rates";

pub const CACHED_WARNING: &str = "Using cached exchange rate.";
pub const CACHED_WHILE_REFRESHING_WARNING: &str = "Using cached exchange rate while refreshing.";

/// Last successful price response, as persisted under [`RATES_KEY`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedPrices {
    pub timestamp: DateTime<Utc>,
    pub data: PriceMap,
}

/// Fetches prices, derives rates and keeps the last good response around.
pub struct ExchangeRateService {
    provider: Arc<dyn RateProvider>,
    collection: Arc<dyn KeyValueCollection>,
    attempts: usize,
    base_delay: Duration,
    countdown_start: u32,
}

impl ExchangeRateService {
    pub fn new(
        provider: Arc<dyn RateProvider>,
        collection: Arc<dyn KeyValueCollection>,
        refresh: &RefreshConfig,
    ) -> Self {
        Self {
            provider,
            collection,
            attempts: refresh.attempts,
            base_delay: Duration::from_millis(refresh.backoff_ms),
            countdown_start: refresh.countdown_seconds.max(1),
        }
    }

    pub fn countdown_start(&self) -> u32 {
        self.countdown_start
    }

    /// Fetches a live rate. Transport failures are retried with backoff; a
    /// response that lacks the requested currency fails immediately.
    pub async fn fetch(
        &self,
        fiat: FiatCurrency,
        asset: CryptoAsset,
    ) -> Result<ExchangeRateResult, RateError> {
        let data = with_backoff(
            || self.provider.fetch_prices(),
            self.attempts,
            self.base_delay,
        )
        .await?;

        let result = build_rate_result(fiat, asset, &data, RateSource::Live, Utc::now())?;

        let cached = CachedPrices {
            timestamp: result.last_updated,
            data,
        };
        if let Err(e) = put_json(self.collection.as_ref(), RATES_KEY, &cached).await {
            warn!("Failed to cache exchange rates: {:#}", e);
        }
        debug!(rate = result.rate, %fiat, %asset, "Fetched live exchange rate");
        Ok(result)
    }

    /// Recomputes a rate from the last cached response, if one is stored and
    /// quotes `fiat`.
    pub async fn cached(&self, fiat: FiatCurrency, asset: CryptoAsset) -> Option<ExchangeRateResult> {
        let cached: CachedPrices = match get_json(self.collection.as_ref(), RATES_KEY).await {
            Ok(Some(cached)) => cached,
            Ok(None) => return None,
            Err(e) => {
                warn!("Ignoring unreadable cached rates: {:#}", e);
                return None;
            }
        };
        build_rate_result(fiat, asset, &cached.data, RateSource::Cache, cached.timestamp).ok()
    }

    /// Live rate, falling back to the cache once retries are exhausted.
    /// Returns the result together with a warning when the cache was used.
    pub async fn fetch_or_cached(
        &self,
        fiat: FiatCurrency,
        asset: CryptoAsset,
    ) -> Result<(ExchangeRateResult, Option<String>), RateError> {
        match self.fetch(fiat, asset).await {
            Ok(result) => Ok((result, None)),
            Err(err) => {
                warn!("Exchange rate error: {}", err);
                match self.cached(fiat, asset).await {
                    Some(result) => Ok((result, Some(CACHED_WARNING.to_string()))),
                    None => Err(err),
                }
            }
        }
    }
}

/// Observable state of an [`ExchangeRateFeed`].
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeRateState {
    pub data: Option<ExchangeRateResult>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub warning: Option<String>,
    pub countdown: u32,
    /// Refresh cycles that have finished, successfully or not.
    pub refreshes: u64,
}

impl ExchangeRateState {
    fn initial(countdown: u32) -> Self {
        Self {
            data: None,
            is_loading: true,
            error: None,
            warning: None,
            countdown,
            refreshes: 0,
        }
    }

    pub fn display_rate(&self) -> String {
        self.data
            .as_ref()
            .map(ExchangeRateResult::display_rate)
            .unwrap_or_default()
    }
}

struct FeedContext {
    service: Arc<ExchangeRateService>,
    fiat: FiatCurrency,
    asset: CryptoAsset,
    state: watch::Sender<ExchangeRateState>,
    generation: AtomicU64,
}

impl FeedContext {
    async fn publish_cached(&self, warning: &str) {
        if let Some(result) = self.service.cached(self.fiat, self.asset).await {
            self.state.send_modify(|state| {
                state.data = Some(result);
                state.is_loading = false;
                state.warning = Some(warning.to_string());
            });
        }
    }

    /// One refresh cycle. Results of a cycle that has been superseded by a
    /// newer one are dropped.
    async fn refresh(self: Arc<Self>) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_modify(|state| {
            state.is_loading = true;
            state.error = None;
        });

        let outcome = self.service.fetch(self.fiat, self.asset).await;
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(generation, "Discarding superseded exchange rate result");
            return;
        }

        match outcome {
            Ok(result) => {
                let countdown = self.service.countdown_start();
                self.state.send_modify(|state| {
                    *state = ExchangeRateState {
                        data: Some(result),
                        is_loading: false,
                        error: None,
                        warning: None,
                        countdown,
                        refreshes: state.refreshes + 1,
                    };
                });
            }
            Err(err) => {
                warn!("Exchange rate error: {}", err);
                let cached = self.service.cached(self.fiat, self.asset).await;
                if self.generation.load(Ordering::SeqCst) != generation {
                    return;
                }
                self.state.send_modify(|state| {
                    if let Some(result) = cached {
                        state.data = Some(result);
                        state.warning = Some(CACHED_WARNING.to_string());
                    }
                    state.is_loading = false;
                    state.error = Some(err.to_string());
                    state.refreshes += 1;
                });
            }
        }
    }
}

/// Keeps an exchange rate fresh: publishes a cached rate immediately, fetches
/// a live one, then refreshes every time the countdown reaches zero.
///
/// Dropping the feed stops the countdown and any in-flight fetch.
pub struct ExchangeRateFeed {
    state: watch::Receiver<ExchangeRateState>,
    refresh_tx: mpsc::UnboundedSender<()>,
    task: JoinHandle<()>,
}

impl ExchangeRateFeed {
    pub fn spawn(service: Arc<ExchangeRateService>, fiat: FiatCurrency, asset: CryptoAsset) -> Self {
        let (state_tx, state_rx) =
            watch::channel(ExchangeRateState::initial(service.countdown_start()));
        let (refresh_tx, refresh_rx) = mpsc::unbounded_channel();
        let context = Arc::new(FeedContext {
            service,
            fiat,
            asset,
            state: state_tx,
            generation: AtomicU64::new(0),
        });
        let task = tokio::spawn(drive(context, refresh_rx));

        Self {
            state: state_rx,
            refresh_tx,
            task,
        }
    }

    pub fn state(&self) -> ExchangeRateState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ExchangeRateState> {
        self.state.clone()
    }

    /// Starts a refresh cycle now, superseding any fetch still in flight.
    pub fn refresh(&self) {
        if self.refresh_tx.send(()).is_err() {
            debug!("Exchange rate feed already stopped");
        }
    }
}

impl Drop for ExchangeRateFeed {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn drive(context: Arc<FeedContext>, mut refresh_rx: mpsc::UnboundedReceiver<()>) {
    let mut in_flight = JoinSet::new();

    context
        .publish_cached(CACHED_WHILE_REFRESHING_WARNING)
        .await;
    in_flight.spawn(Arc::clone(&context).refresh());

    let countdown_start = context.service.countdown_start();
    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let mut due = false;
                context.state.send_modify(|state| {
                    if state.countdown <= 1 {
                        state.countdown = countdown_start;
                        due = true;
                    } else {
                        state.countdown -= 1;
                    }
                });
                if due {
                    debug!("Countdown elapsed, refreshing exchange rate");
                    in_flight.spawn(Arc::clone(&context).refresh());
                }
            }
            request = refresh_rx.recv() => match request {
                Some(()) => {
                    in_flight.spawn(Arc::clone(&context).refresh());
                }
                None => break,
            },
            Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
        }
    }
}
