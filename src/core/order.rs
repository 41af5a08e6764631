//! On-ramp and off-ramp orders.
//!
//! Orders move through their statuses only in response to explicit events.
//! Each order is stored as JSON under `<prefix>:order:<id>`.

use crate::core::cache::{KeyValueCollection, get_json, put_json};
use crate::core::currency::{CryptoAsset, FiatCurrency, OfframpAsset, OfframpChain, PaymentMethod};
use crate::core::fees::{
    FeeBreakdown, OfframpFeeBreakdown, calculate_crypto_amount, calculate_fee_breakdown,
};
use crate::core::form::{OfframpAssetOption, OfframpQuote, OnrampFormState};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::fmt::Display;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// How long a quoted rate stays locked for an order.
pub const ORDER_TTL_MINUTES: i64 = 15;

pub const ONRAMP_ID_PREFIX: &str = "ONR";
pub const OFFRAMP_ID_PREFIX: &str = "OFF";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrderError {
    #[error("Order not found")]
    NotFound,
    #[error("Failed to load order")]
    LoadFailed,
    #[error("Failed to save order")]
    SaveFailed,
    #[error("Cannot apply {event} to an order that is {status}")]
    InvalidTransition { status: String, event: String },
}

/// Builds an id such as `ONR-20260119-A1B2C3`.
pub fn generate_order_id(prefix: &str, now: DateTime<Utc>) -> String {
    let suffix: String = uuid::Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(6)
        .collect::<String>()
        .to_uppercase();
    format!("{}-{}-{}", prefix, now.format("%Y%m%d"), suffix)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    AwaitingPayment,
    PaymentReceived,
    Minting,
    Transferring,
    Completed,
    Failed,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Failed)
    }

    /// Rough completion percentage shown while tracking an order.
    pub fn progress(&self) -> u8 {
        match self {
            OrderStatus::AwaitingPayment => 25,
            OrderStatus::PaymentReceived => 50,
            OrderStatus::Minting => 75,
            OrderStatus::Transferring => 90,
            OrderStatus::Completed => 100,
            OrderStatus::Failed => 0,
        }
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            OrderStatus::AwaitingPayment => "awaiting_payment",
            OrderStatus::PaymentReceived => "payment_received",
            OrderStatus::Minting => "minting",
            OrderStatus::Transferring => "transferring",
            OrderStatus::Completed => "completed",
            OrderStatus::Failed => "failed",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderEvent {
    PaymentReceived,
    MintingStarted,
    TransferStarted,
    TransferCompleted { transaction_hash: String },
    Failed,
}

impl Display for OrderEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            OrderEvent::PaymentReceived => "payment received",
            OrderEvent::MintingStarted => "minting started",
            OrderEvent::TransferStarted => "transfer started",
            OrderEvent::TransferCompleted { .. } => "transfer completed",
            OrderEvent::Failed => "failure",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnrampOrder {
    pub id: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub expires_at: DateTime<Utc>,
    pub fiat_currency: FiatCurrency,
    pub crypto_asset: CryptoAsset,
    pub payment_method: PaymentMethod,
    pub amount: f64,
    pub exchange_rate: f64,
    pub crypto_amount: f64,
    pub fees: FeeBreakdown,
    pub wallet_address: String,
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub completed_at: Option<DateTime<Utc>>,
}

impl OnrampOrder {
    /// Creates an order from a validated form snapshot, locking `rate` for
    /// [`ORDER_TTL_MINUTES`].
    pub fn new(
        form: &OnrampFormState,
        amount: f64,
        rate: f64,
        wallet_address: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: generate_order_id(ONRAMP_ID_PREFIX, now),
            created_at: now,
            expires_at: now + Duration::minutes(ORDER_TTL_MINUTES),
            fiat_currency: form.fiat_currency,
            crypto_asset: form.crypto_asset,
            payment_method: form.payment_method,
            amount,
            exchange_rate: rate,
            crypto_amount: calculate_crypto_amount(amount, rate),
            fees: calculate_fee_breakdown(amount, form.fiat_currency, form.payment_method),
            wallet_address: wallet_address.to_string(),
            status: OrderStatus::AwaitingPayment,
            transaction_hash: None,
            completed_at: None,
        }
    }

    pub fn apply(&mut self, event: OrderEvent, now: DateTime<Utc>) -> Result<(), OrderError> {
        let next = match (self.status, &event) {
            (OrderStatus::AwaitingPayment, OrderEvent::PaymentReceived) => {
                OrderStatus::PaymentReceived
            }
            (OrderStatus::PaymentReceived, OrderEvent::MintingStarted) => OrderStatus::Minting,
            (OrderStatus::Minting, OrderEvent::TransferStarted) => OrderStatus::Transferring,
            (OrderStatus::Transferring, OrderEvent::TransferCompleted { transaction_hash }) => {
                self.transaction_hash = Some(transaction_hash.clone());
                self.completed_at = Some(now);
                OrderStatus::Completed
            }
            (status, OrderEvent::Failed) if !status.is_terminal() => OrderStatus::Failed,
            (status, event) => {
                return Err(OrderError::InvalidTransition {
                    status: status.to_string(),
                    event: event.to_string(),
                });
            }
        };
        debug!(id = %self.id, from = %self.status, to = %next, "Order status changed");
        self.status = next;
        Ok(())
    }

    /// Fails an order whose payment window closed before payment arrived.
    /// Returns whether the order changed.
    pub fn expire(&mut self, now: DateTime<Utc>) -> bool {
        if self.status == OrderStatus::AwaitingPayment && now >= self.expires_at {
            info!(id = %self.id, "Order expired before payment");
            self.status = OrderStatus::Failed;
            return true;
        }
        false
    }

    /// Time left to pay, zero once expired.
    pub fn time_left(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at - now).max(Duration::zero())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfframpStatus {
    PendingBankDetails,
    AwaitingCrypto,
    Processing,
    Completed,
    Failed,
}

impl OfframpStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OfframpStatus::Completed | OfframpStatus::Failed)
    }
}

impl Display for OfframpStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            OfframpStatus::PendingBankDetails => "pending_bank_details",
            OfframpStatus::AwaitingCrypto => "awaiting_crypto",
            OfframpStatus::Processing => "processing",
            OfframpStatus::Completed => "completed",
            OfframpStatus::Failed => "failed",
        };
        write!(f, "{label}")
    }
}

/// Account the fiat payout is sent to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankDetails {
    pub bank_name: String,
    pub account_number: String,
    pub account_name: String,
}

impl Display for BankDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} ({})",
            self.bank_name, self.account_number, self.account_name
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OfframpEvent {
    BankDetailsSubmitted(BankDetails),
    CryptoReceived,
    PayoutSent,
    Failed,
}

impl Display for OfframpEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            OfframpEvent::BankDetailsSubmitted(_) => "bank details submitted",
            OfframpEvent::CryptoReceived => "crypto received",
            OfframpEvent::PayoutSent => "payout sent",
            OfframpEvent::Failed => "failure",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfframpOrder {
    pub id: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub lock_expires_at: DateTime<Utc>,
    pub asset_id: String,
    pub asset: OfframpAsset,
    pub chain: OfframpChain,
    pub amount: f64,
    pub fiat_currency: FiatCurrency,
    pub rate: f64,
    pub fiat_amount: f64,
    pub fees: OfframpFeeBreakdown,
    /// Stellar account the user sends the crypto to.
    pub settlement_address: String,
    /// Tag the user attaches to the crypto transfer; equal to the id.
    pub memo: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_details: Option<BankDetails>,
    pub status: OfframpStatus,
}

impl OfframpOrder {
    pub fn new(
        option: &OfframpAssetOption,
        fiat_currency: FiatCurrency,
        quote: &OfframpQuote,
        settlement_address: &str,
        now: DateTime<Utc>,
    ) -> Self {
        let id = generate_order_id(OFFRAMP_ID_PREFIX, now);
        Self {
            memo: id.clone(),
            id,
            created_at: now,
            lock_expires_at: now + Duration::minutes(ORDER_TTL_MINUTES),
            asset_id: option.id.clone(),
            asset: option.asset,
            chain: option.chain,
            amount: quote.amount,
            fiat_currency,
            rate: quote.rate,
            fiat_amount: quote.fiat_amount,
            fees: quote.fees,
            settlement_address: settlement_address.to_string(),
            bank_details: None,
            status: OfframpStatus::PendingBankDetails,
        }
    }

    pub fn apply(&mut self, event: OfframpEvent) -> Result<(), OrderError> {
        let next = match (self.status, &event) {
            (OfframpStatus::PendingBankDetails, OfframpEvent::BankDetailsSubmitted(details)) => {
                self.bank_details = Some(details.clone());
                OfframpStatus::AwaitingCrypto
            }
            (OfframpStatus::AwaitingCrypto, OfframpEvent::CryptoReceived) => {
                OfframpStatus::Processing
            }
            (OfframpStatus::Processing, OfframpEvent::PayoutSent) => OfframpStatus::Completed,
            (status, OfframpEvent::Failed) if !status.is_terminal() => OfframpStatus::Failed,
            (status, event) => {
                return Err(OrderError::InvalidTransition {
                    status: status.to_string(),
                    event: event.to_string(),
                });
            }
        };
        debug!(id = %self.id, from = %self.status, to = %next, "Order status changed");
        self.status = next;
        Ok(())
    }

    /// Fails the order when the rate lock ran out before the crypto arrived.
    pub fn expire(&mut self, now: DateTime<Utc>) -> bool {
        let waiting = matches!(
            self.status,
            OfframpStatus::PendingBankDetails | OfframpStatus::AwaitingCrypto
        );
        if waiting && now >= self.lock_expires_at {
            info!(id = %self.id, "Rate lock expired");
            self.status = OfframpStatus::Failed;
            return true;
        }
        false
    }
}

/// An order that can be kept in an [`OrderStore`].
pub trait StoredOrder: Serialize + DeserializeOwned {
    const KEY_PREFIX: &'static str;

    fn id(&self) -> &str;

    fn storage_key(id: &str) -> String {
        format!("{}:order:{}", Self::KEY_PREFIX, id)
    }

    /// Key of the id list, most recent first.
    fn index_key() -> String {
        format!("{}:orders", Self::KEY_PREFIX)
    }
}

impl StoredOrder for OnrampOrder {
    const KEY_PREFIX: &'static str = "onramp";

    fn id(&self) -> &str {
        &self.id
    }
}

impl StoredOrder for OfframpOrder {
    const KEY_PREFIX: &'static str = "offramp";

    fn id(&self) -> &str {
        &self.id
    }
}

pub struct OrderStore {
    collection: Arc<dyn KeyValueCollection>,
}

impl OrderStore {
    pub fn new(collection: Arc<dyn KeyValueCollection>) -> Self {
        Self { collection }
    }

    pub async fn save<O: StoredOrder>(&self, order: &O) -> Result<(), OrderError> {
        let key = O::storage_key(order.id());
        put_json(self.collection.as_ref(), &key, order)
            .await
            .map_err(|e| {
                warn!("Failed to save order {}: {:#}", key, e);
                OrderError::SaveFailed
            })?;

        let mut ids = self.list_ids::<O>().await;
        if !ids.iter().any(|id| id == order.id()) {
            ids.insert(0, order.id().to_string());
            put_json(self.collection.as_ref(), &O::index_key(), &ids)
                .await
                .map_err(|e| {
                    warn!("Failed to update order index: {:#}", e);
                    OrderError::SaveFailed
                })?;
        }
        Ok(())
    }

    /// Ids of saved orders of one kind, most recent first.
    pub async fn list_ids<O: StoredOrder>(&self) -> Vec<String> {
        match get_json(self.collection.as_ref(), &O::index_key()).await {
            Ok(ids) => ids.unwrap_or_default(),
            Err(e) => {
                warn!("Ignoring unreadable order index: {:#}", e);
                Vec::new()
            }
        }
    }

    pub async fn load<O: StoredOrder>(&self, id: &str) -> Result<O, OrderError> {
        let key = O::storage_key(id);
        match get_json(self.collection.as_ref(), &key).await {
            Ok(Some(order)) => Ok(order),
            Ok(None) => Err(OrderError::NotFound),
            Err(e) => {
                warn!("Failed to load order {}: {:#}", key, e);
                Err(OrderError::LoadFailed)
            }
        }
    }
}
