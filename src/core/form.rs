//! Form-state controllers for the on-ramp and off-ramp flows.
//!
//! Each form persists its raw inputs to a key-value collection on every change
//! and restores them on load unless the record is older than [`FORM_TTL`].
//! Amount parsing is debounced; fee and conversion outputs are derived from
//! the debounced value.

use crate::core::cache::{KeyValueCollection, get_json, put_json};
use crate::core::currency::{CryptoAsset, FiatCurrency, OfframpAsset, OfframpChain, PaymentMethod};
use crate::core::fees::{
    FeeBreakdown, OFFRAMP_DAILY_LIMIT, OFFRAMP_DAILY_USED, OFFRAMP_FEE_RATE, OFFRAMP_LIMITS,
    OFFRAMP_LIQUIDITY_LIMIT, OfframpFeeBreakdown, calculate_crypto_amount, calculate_fee_breakdown,
    calculate_fiat_amount, calculate_offramp_fees,
};
use crate::core::format::{format_amount_input, format_number, parse_amount_input};
use crate::core::rate::offramp_rate;
use crate::core::validation::{Limits, get_limits, validate_amount};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub const ONRAMP_FORM_KEY: &str = "onramp:form";
pub const OFFRAMP_FORM_KEY: &str = "offramp:form";

pub const FORM_TTL: Duration = Duration::from_secs(15 * 60);

pub const ONRAMP_DEBOUNCE: Duration = Duration::from_millis(300);
pub const OFFRAMP_DEBOUNCE: Duration = Duration::from_millis(250);

const MAX_DECIMALS: usize = 6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnrampFormState {
    pub amount_input: String,
    pub fiat_currency: FiatCurrency,
    pub crypto_asset: CryptoAsset,
    pub payment_method: PaymentMethod,
}

impl Default for OnrampFormState {
    fn default() -> Self {
        Self {
            amount_input: String::new(),
            fiat_currency: FiatCurrency::Ngn,
            crypto_asset: CryptoAsset::CNgn,
            payment_method: PaymentMethod::BankTransfer,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfframpFormState {
    pub asset_id: String,
    pub amount_input: String,
    pub fiat_currency: FiatCurrency,
}

impl Default for OfframpFormState {
    fn default() -> Self {
        Self {
            asset_id: "cngn-stellar".to_string(),
            amount_input: String::new(),
            fiat_currency: FiatCurrency::Ngn,
        }
    }
}

/// Stored form record. `timestamp` is milliseconds since the epoch of the
/// last write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedForm<T> {
    pub data: T,
    pub timestamp: i64,
}

/// Saves and restores one form's state under a fixed key.
pub struct FormPersistence<T> {
    collection: Arc<dyn KeyValueCollection>,
    key: &'static str,
    _state: PhantomData<fn() -> T>,
}

impl<T> FormPersistence<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    pub fn new(collection: Arc<dyn KeyValueCollection>, key: &'static str) -> Self {
        Self {
            collection,
            key,
            _state: PhantomData,
        }
    }

    pub async fn restore(&self) -> T {
        self.restore_at(Utc::now()).await
    }

    /// Restores the stored state as of `now`. Expired or unreadable records
    /// are removed and the default state is returned.
    pub async fn restore_at(&self, now: DateTime<Utc>) -> T {
        let record: PersistedForm<T> = match get_json(self.collection.as_ref(), self.key).await {
            Ok(Some(record)) => record,
            Ok(None) => return T::default(),
            Err(e) => {
                warn!("Discarding unreadable form state: {:#}", e);
                self.collection.remove(self.key.as_bytes()).await;
                return T::default();
            }
        };

        let age_ms = now.timestamp_millis() - record.timestamp;
        if age_ms > FORM_TTL.as_millis() as i64 {
            debug!(key = self.key, age_ms, "Stored form state expired");
            self.collection.remove(self.key.as_bytes()).await;
            return T::default();
        }
        record.data
    }

    pub async fn persist(&self, data: &T) -> Result<()> {
        self.persist_at(data, Utc::now()).await
    }

    pub async fn persist_at(&self, data: &T, now: DateTime<Utc>) -> Result<()> {
        let record = PersistedForm {
            data,
            timestamp: now.timestamp_millis(),
        };
        put_json(self.collection.as_ref(), self.key, &record).await
    }
}

/// Normalizes typed amount input: keeps digits and the first decimal point,
/// clamps the fraction to 6 digits and re-inserts thousands separators.
pub fn sanitize_amount_input(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if cleaned.is_empty() {
        return String::new();
    }

    let (whole, fraction) = match cleaned.split_once('.') {
        Some((whole, rest)) => {
            let fraction: String = rest
                .split('.')
                .next()
                .unwrap_or_default()
                .chars()
                .take(MAX_DECIMALS)
                .collect();
            (whole, Some(fraction))
        }
        None => (cleaned.as_str(), None),
    };

    let normalized = match fraction {
        Some(fraction) if whole.is_empty() => format!("0.{fraction}"),
        Some(fraction) => format!("{whole}.{fraction}"),
        None => whole.to_string(),
    };
    format_amount_input(&normalized)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Debounced {
    pub input: String,
    pub amount: f64,
}

/// Parses amount input once it has been quiet for the debounce window.
///
/// The parsed amount starts at 0 and is first published after the initial
/// quiet period. Dropping the debouncer stops its task.
pub struct AmountDebouncer {
    input: watch::Sender<String>,
    output: watch::Receiver<Debounced>,
    task: JoinHandle<()>,
}

impl AmountDebouncer {
    pub fn spawn(initial: &str, delay: Duration) -> Self {
        let (input_tx, mut input_rx) = watch::channel(initial.to_string());
        let (output_tx, output_rx) = watch::channel(Debounced {
            input: String::new(),
            amount: 0.0,
        });

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = input_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        continue;
                    }
                    _ = tokio::time::sleep(delay) => {}
                }

                let input = input_rx.borrow_and_update().clone();
                let amount = parse_amount_input(&input);
                output_tx.send_replace(Debounced { input, amount });

                if input_rx.changed().await.is_err() {
                    break;
                }
            }
        });

        Self {
            input: input_tx,
            output: output_rx,
            task,
        }
    }

    pub fn set(&self, input: &str) {
        self.input.send_replace(input.to_string());
    }

    /// Last published amount.
    pub fn amount(&self) -> f64 {
        self.output.borrow().amount
    }

    /// Whether the published amount reflects the latest input.
    pub fn is_settled(&self) -> bool {
        self.output.borrow().input == *self.input.borrow()
    }

    /// Waits for the current input to be published and returns its amount.
    pub async fn settled(&self) -> f64 {
        let target = self.input.borrow().clone();
        let mut output = self.output.clone();
        match output.wait_for(|debounced| debounced.input == target).await {
            Ok(debounced) => debounced.amount,
            Err(_) => parse_amount_input(&target),
        }
    }
}

impl Drop for AmountDebouncer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Conversion and fees derived from the debounced on-ramp amount.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OnrampQuote {
    pub amount: f64,
    pub crypto_amount: f64,
    pub fees: FeeBreakdown,
}

pub struct OnrampForm {
    state: OnrampFormState,
    persistence: FormPersistence<OnrampFormState>,
    debouncer: AmountDebouncer,
}

impl OnrampForm {
    pub async fn load(collection: Arc<dyn KeyValueCollection>) -> Self {
        let persistence = FormPersistence::<OnrampFormState>::new(collection, ONRAMP_FORM_KEY);
        let state = persistence.restore().await;
        let debouncer = AmountDebouncer::spawn(&state.amount_input, ONRAMP_DEBOUNCE);
        Self {
            state,
            persistence,
            debouncer,
        }
    }

    pub fn state(&self) -> &OnrampFormState {
        &self.state
    }

    pub async fn set_amount_input(&mut self, raw: &str) -> Result<()> {
        self.state.amount_input = sanitize_amount_input(raw);
        self.debouncer.set(&self.state.amount_input);
        self.persist().await
    }

    /// Switches the fiat currency. A local stablecoin selection follows the
    /// currency to its paired asset.
    pub async fn set_fiat_currency(&mut self, fiat: FiatCurrency) -> Result<()> {
        self.state.fiat_currency = fiat;
        if self.state.crypto_asset.is_local_stablecoin() {
            self.state.crypto_asset = fiat.paired_asset();
        }
        self.persist().await
    }

    pub async fn set_crypto_asset(&mut self, asset: CryptoAsset) -> Result<()> {
        self.state.crypto_asset = asset;
        self.persist().await
    }

    pub async fn set_payment_method(&mut self, method: PaymentMethod) -> Result<()> {
        self.state.payment_method = method;
        self.persist().await
    }

    async fn persist(&self) -> Result<()> {
        self.persistence.persist(&self.state).await
    }

    /// Amount parsed from the current input, without debouncing.
    pub fn amount_value(&self) -> f64 {
        parse_amount_input(&self.state.amount_input)
    }

    /// Inline amount error; empty while nothing has been typed.
    pub fn amount_error(&self) -> String {
        if self.state.amount_input.is_empty() {
            return String::new();
        }
        validate_amount(self.amount_value(), self.state.fiat_currency)
    }

    pub fn limits(&self) -> Limits {
        get_limits(self.state.fiat_currency)
    }

    pub fn is_calculating(&self) -> bool {
        !self.debouncer.is_settled()
    }

    pub fn quote(&self, rate: f64) -> OnrampQuote {
        self.quote_for(self.debouncer.amount(), rate)
    }

    /// Waits for the debounced amount to catch up with the input, then quotes.
    pub async fn settled_quote(&self, rate: f64) -> OnrampQuote {
        let amount = self.debouncer.settled().await;
        self.quote_for(amount, rate)
    }

    fn quote_for(&self, amount: f64, rate: f64) -> OnrampQuote {
        OnrampQuote {
            amount,
            crypto_amount: calculate_crypto_amount(amount, rate),
            fees: calculate_fee_breakdown(
                amount,
                self.state.fiat_currency,
                self.state.payment_method,
            ),
        }
    }

    pub fn is_valid(&self, rate: f64, wallet_connected: bool) -> bool {
        wallet_connected && self.amount_error().is_empty() && self.amount_value() > 0.0 && rate > 0.0
    }
}

/// An asset the user can withdraw from, with its available balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfframpAssetOption {
    pub id: String,
    pub asset: OfframpAsset,
    pub chain: OfframpChain,
    pub label: String,
    pub balance: f64,
}

impl OfframpAssetOption {
    pub fn rate(&self) -> f64 {
        offramp_rate(self.asset, self.chain)
    }
}

/// Assets offered when none are configured.
pub fn default_offramp_assets() -> Vec<OfframpAssetOption> {
    let option = |id: &str, asset, chain, label: &str, balance| OfframpAssetOption {
        id: id.to_string(),
        asset,
        chain,
        label: label.to_string(),
        balance,
    };
    vec![
        option(
            "cngn-stellar",
            OfframpAsset::CNgn,
            OfframpChain::Stellar,
            "cNGN (Stellar)",
            250_000.0,
        ),
        option(
            "usdc-stellar",
            OfframpAsset::Usdc,
            OfframpChain::Stellar,
            "USDC (Stellar)",
            1_200.0,
        ),
        option(
            "usdc-ethereum",
            OfframpAsset::Usdc,
            OfframpChain::Ethereum,
            "USDC (Ethereum)",
            540.5,
        ),
        option(
            "usdt-polygon",
            OfframpAsset::Usdt,
            OfframpChain::Polygon,
            "USDT (Polygon)",
            860.0,
        ),
        option(
            "xlm-stellar",
            OfframpAsset::Xlm,
            OfframpChain::Stellar,
            "XLM (Stellar)",
            3_400.0,
        ),
    ]
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OfframpErrors {
    pub amount: Option<String>,
    pub liquidity: Option<String>,
    pub limit: Option<String>,
}

impl OfframpErrors {
    pub fn is_empty(&self) -> bool {
        self.amount.is_none() && self.liquidity.is_none() && self.limit.is_none()
    }

    pub fn messages(&self) -> impl Iterator<Item = &str> {
        [&self.amount, &self.liquidity, &self.limit]
            .into_iter()
            .filter_map(|message| message.as_deref())
    }
}

/// Fiat payout and fees derived from the debounced off-ramp amount.
#[derive(Debug, Clone, PartialEq)]
pub struct OfframpQuote {
    pub amount: f64,
    pub rate: f64,
    pub fiat_amount: f64,
    pub fees: OfframpFeeBreakdown,
    pub errors: OfframpErrors,
}

impl OfframpQuote {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty() && self.fiat_amount > 0.0
    }
}

pub struct OfframpForm {
    state: OfframpFormState,
    options: Vec<OfframpAssetOption>,
    persistence: FormPersistence<OfframpFormState>,
    debouncer: AmountDebouncer,
}

impl OfframpForm {
    pub async fn load(
        collection: Arc<dyn KeyValueCollection>,
        options: Vec<OfframpAssetOption>,
    ) -> Self {
        let persistence = FormPersistence::<OfframpFormState>::new(collection, OFFRAMP_FORM_KEY);
        let state = persistence.restore().await;
        let debouncer = AmountDebouncer::spawn(&state.amount_input, OFFRAMP_DEBOUNCE);
        Self {
            state,
            options,
            persistence,
            debouncer,
        }
    }

    pub fn state(&self) -> &OfframpFormState {
        &self.state
    }

    pub fn options(&self) -> &[OfframpAssetOption] {
        &self.options
    }

    /// The option matching the stored asset id, or the first option.
    pub fn selected_asset(&self) -> Option<&OfframpAssetOption> {
        self.options
            .iter()
            .find(|option| option.id == self.state.asset_id)
            .or_else(|| self.options.first())
    }

    pub async fn set_amount_input(&mut self, raw: &str) -> Result<()> {
        self.state.amount_input = sanitize_amount_input(raw);
        self.debouncer.set(&self.state.amount_input);
        self.persist().await
    }

    pub async fn set_fiat_currency(&mut self, fiat: FiatCurrency) -> Result<()> {
        self.state.fiat_currency = fiat;
        self.persist().await
    }

    pub async fn set_asset_id(&mut self, asset_id: &str) -> Result<()> {
        self.state.asset_id = asset_id.to_string();
        self.persist().await
    }

    /// Fills the amount with the selected asset's full balance.
    pub async fn set_max_amount(&mut self) -> Result<()> {
        let Some(balance) = self.selected_asset().map(|option| option.balance) else {
            return Ok(());
        };
        self.state.amount_input = format_amount_input(&balance.to_string());
        self.debouncer.set(&self.state.amount_input);
        self.persist().await
    }

    async fn persist(&self) -> Result<()> {
        self.persistence.persist(&self.state).await
    }

    pub fn limits(&self) -> Limits {
        OFFRAMP_LIMITS
    }

    pub fn is_calculating(&self) -> bool {
        !self.debouncer.is_settled()
    }

    pub fn quote(&self) -> OfframpQuote {
        self.quote_for(self.debouncer.amount())
    }

    pub async fn settled_quote(&self) -> OfframpQuote {
        let amount = self.debouncer.settled().await;
        self.quote_for(amount)
    }

    fn quote_for(&self, amount: f64) -> OfframpQuote {
        let selected = self.selected_asset();
        let rate = selected.map(OfframpAssetOption::rate).unwrap_or_default();
        let chain = selected
            .map(|option| option.chain)
            .unwrap_or(OfframpChain::Stellar);

        let fiat_amount = calculate_fiat_amount(amount, rate);
        let fees = calculate_offramp_fees(fiat_amount, &chain.to_string(), OFFRAMP_FEE_RATE);
        let errors = self.errors_for(amount, fiat_amount);

        OfframpQuote {
            amount,
            rate,
            fiat_amount,
            fees,
            errors,
        }
    }

    fn errors_for(&self, amount: f64, fiat_amount: f64) -> OfframpErrors {
        let Limits { min, max } = self.limits();
        let mut errors = OfframpErrors::default();

        if self.state.amount_input.is_empty() || amount <= 0.0 {
            errors.amount = Some("Enter an amount to continue.".to_string());
        }
        if fiat_amount > 0.0 && fiat_amount < min {
            errors.amount = Some(format!("Minimum withdrawal is {}.", format_number(min, 3)));
        }
        if fiat_amount > max {
            errors.amount = Some(format!("Maximum withdrawal is {}.", format_number(max, 3)));
        }
        if fiat_amount > OFFRAMP_LIQUIDITY_LIMIT {
            errors.liquidity =
                Some("Limited liquidity available right now. Try a smaller amount.".to_string());
        }
        if fiat_amount + OFFRAMP_DAILY_USED > OFFRAMP_DAILY_LIMIT {
            errors.limit = Some("Daily withdrawal limit reached.".to_string());
        }
        errors
    }
}
