use super::ui;
use crate::AppContext;
use crate::core::currency::{CryptoAsset, FiatCurrency};
use crate::core::format::format_rate_countdown;
use crate::core::rate::{ExchangeRateResult, RateSource};
use crate::exchange::{ExchangeRateFeed, ExchangeRateState};
use anyhow::Result;
use chrono::Local;
use tracing::{debug, info};

fn resolve_pair(
    context: &AppContext,
    fiat: Option<FiatCurrency>,
    asset: Option<CryptoAsset>,
) -> (FiatCurrency, CryptoAsset) {
    let fiat = fiat.unwrap_or(context.config.defaults.fiat);
    let asset = asset.unwrap_or_else(|| {
        let default = context.config.defaults.asset;
        if default.is_local_stablecoin() {
            fiat.paired_asset()
        } else {
            default
        }
    });
    (fiat, asset)
}

fn source_label(result: &ExchangeRateResult) -> String {
    match result.source {
        RateSource::Live => "live".to_string(),
        RateSource::Cache => ui::style_text("cached", ui::StyleType::Warning),
    }
}

pub fn display_rate(result: &ExchangeRateResult) -> String {
    let updated = result
        .last_updated
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string();
    let mut table = ui::key_value_table(&[
        ("Rate", result.display_rate()),
        ("Source", source_label(result)),
        ("Last updated", updated),
    ]);
    table.set_header(vec![
        ui::header_cell(&format!("{} → {}", result.fiat, result.asset)),
        ui::header_cell(""),
    ]);
    table.to_string()
}

/// Fetches one rate, falling back to the last cached prices.
pub async fn run(
    context: &AppContext,
    fiat: Option<FiatCurrency>,
    asset: Option<CryptoAsset>,
) -> Result<()> {
    let (fiat, asset) = resolve_pair(context, fiat, asset);
    let service = context.rate_service()?;

    let pb = ui::new_spinner("Fetching exchange rate...");
    let outcome = service.fetch_or_cached(fiat, asset).await;
    pb.finish_and_clear();

    let (result, warning) = outcome?;
    if let Some(warning) = warning {
        println!("{}", ui::style_text(&warning, ui::StyleType::Warning));
    }
    println!("{}", display_rate(&result));
    Ok(())
}

fn status_line(state: &ExchangeRateState) -> String {
    let rate = if state.data.is_some() {
        state.display_rate()
    } else {
        "No rate yet".to_string()
    };
    let countdown = if state.is_loading {
        "refreshing".to_string()
    } else {
        format!("refresh in {}", format_rate_countdown(state.countdown))
    };
    format!("{rate}  {}", ui::style_text(&countdown, ui::StyleType::Subtle))
}

/// Keeps the rate on screen and refreshes it on the countdown. Stops after
/// `cycles` completed refreshes, or on Ctrl-C.
pub async fn watch(
    context: &AppContext,
    fiat: Option<FiatCurrency>,
    asset: Option<CryptoAsset>,
    cycles: Option<u32>,
) -> Result<()> {
    let (fiat, asset) = resolve_pair(context, fiat, asset);
    let feed = ExchangeRateFeed::spawn(context.rate_service()?, fiat, asset);
    let mut updates = feed.subscribe();

    println!(
        "{}",
        ui::style_text(&format!("Watching {fiat} → {asset}"), ui::StyleType::Title)
    );
    let pb = ui::new_spinner("Fetching exchange rate...");

    let mut completed = 0;
    loop {
        let state = updates.borrow_and_update().clone();

        // Updates can coalesce, so catch up on every refresh finished since
        // the last wake-up.
        if state.refreshes > completed {
            completed = state.refreshes;
            debug!(completed, "Refresh cycle finished");
            if let Some(error) = &state.error {
                pb.println(ui::style_text(error, ui::StyleType::Error));
            }
            if let Some(warning) = &state.warning {
                pb.println(ui::style_text(warning, ui::StyleType::Warning));
            }
            if let Some(data) = &state.data {
                pb.println(format!(
                    "{}  {}",
                    data.display_rate(),
                    ui::style_text(&source_label(data), ui::StyleType::Subtle)
                ));
            }
        }
        pb.set_message(status_line(&state));

        if cycles.is_some_and(|limit| completed >= u64::from(limit)) {
            break;
        }

        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    pb.finish_and_clear();
    Ok(())
}
