//! Core business logic abstractions

pub mod cache;
pub mod config;
pub mod currency;
pub mod fees;
pub mod form;
pub mod format;
pub mod log;
pub mod order;
pub mod rate;
pub mod validation;
pub mod wallet;

// Re-export main types for cleaner imports
pub use currency::{CryptoAsset, FiatCurrency, PaymentMethod};
pub use rate::{ExchangeRateResult, RateError, RateProvider};
