use super::ui;
use crate::core::currency::FiatCurrency;
use crate::core::form::{OfframpForm, OfframpQuote, OnrampForm, OnrampFormState, OnrampQuote};
use crate::core::format::{format_currency, format_number};
use crate::core::rate::ExchangeRateResult;
use crate::{AppContext, OfframpArgs, QuoteArgs};
use anyhow::Result;
use comfy_table::Cell;

/// Loads the on-ramp form and applies the command's inputs on top of the
/// restored state. Config defaults seed a form that has not been used yet.
pub async fn prepare_onramp_form(context: &AppContext, args: &QuoteArgs) -> Result<OnrampForm> {
    let mut form = OnrampForm::load(context.local_storage()).await;

    let fresh = *form.state() == OnrampFormState::default();
    let defaults = &context.config.defaults;

    // Switching fiat re-pairs a local stablecoin, so leave a restored
    // selection alone unless a currency was asked for.
    if let Some(fiat) = args.fiat.or(fresh.then_some(defaults.fiat)) {
        form.set_fiat_currency(fiat).await?;
    }
    let fiat = form.state().fiat_currency;

    if let Some(asset) = args.asset.or(fresh.then_some(defaults.asset)) {
        let asset = if args.asset.is_none() && asset.is_local_stablecoin() {
            fiat.paired_asset()
        } else {
            asset
        };
        form.set_crypto_asset(asset).await?;
    }
    if let Some(method) = args
        .payment_method
        .or(fresh.then_some(defaults.payment_method))
    {
        form.set_payment_method(method).await?;
    }
    form.set_amount_input(&args.amount).await?;
    Ok(form)
}

/// Fetches the rate for the form's current selection, printing any cache
/// warning.
pub async fn fetch_rate(context: &AppContext, form: &OnrampForm) -> Result<ExchangeRateResult> {
    let service = context.rate_service()?;
    let state = form.state();

    let pb = ui::new_spinner("Fetching exchange rate...");
    let outcome = service
        .fetch_or_cached(state.fiat_currency, state.crypto_asset)
        .await;
    pb.finish_and_clear();

    let (result, warning) = outcome?;
    if let Some(warning) = warning {
        println!("{}", ui::style_text(&warning, ui::StyleType::Warning));
    }
    Ok(result)
}

pub fn display_onramp_quote(form: &OnrampForm, rate: &ExchangeRateResult, quote: &OnrampQuote) -> String {
    let state = form.state();
    let fiat = state.fiat_currency;
    let limits = form.limits();

    let mut table = ui::key_value_table(&[
        ("You pay", format_currency(quote.amount, fiat, 2)),
        ("Payment method", state.payment_method.to_string()),
        ("Rate", rate.display_rate()),
        ("Processing fee", format_currency(quote.fees.processing_fee, fiat, 2)),
        ("Network fee", format_currency(quote.fees.network_fee, fiat, 2)),
        ("Total fees", format_currency(quote.fees.total_fees, fiat, 2)),
        ("Total cost", format_currency(quote.fees.total_cost, fiat, 2)),
        (
            "Limits",
            format!(
                "{} – {}",
                format_currency(limits.min, fiat, 0),
                format_currency(limits.max, fiat, 0)
            ),
        ),
    ]);
    table.add_row(vec![
        Cell::new("You receive"),
        ui::total_cell(&format!(
            "{} {}",
            format_number(quote.crypto_amount, 6),
            state.crypto_asset
        )),
    ]);

    let mut output = format!(
        "{}\n\n",
        ui::style_text(&format!("Buy {}", state.crypto_asset), ui::StyleType::Title)
    );
    output.push_str(&table.to_string());
    output
}

pub async fn run_onramp(context: &AppContext, args: &QuoteArgs) -> Result<()> {
    let form = prepare_onramp_form(context, args).await?;
    let rate = fetch_rate(context, &form).await?;
    let quote = form.settled_quote(rate.rate).await;

    println!("{}", display_onramp_quote(&form, &rate, &quote));

    let error = form.amount_error();
    if !error.is_empty() {
        println!("\n{}", ui::style_text(&error, ui::StyleType::Error));
    }
    Ok(())
}

pub async fn prepare_offramp_form(context: &AppContext, args: &OfframpArgs) -> Result<OfframpForm> {
    let mut form = OfframpForm::load(
        context.local_storage(),
        context.config.offramp_assets.clone(),
    )
    .await;

    if let Some(asset_id) = &args.asset_id {
        if !form.options().iter().any(|option| &option.id == asset_id) {
            anyhow::bail!("Unknown off-ramp asset: {}", asset_id);
        }
        form.set_asset_id(asset_id).await?;
    }
    if let Some(fiat) = args.fiat {
        form.set_fiat_currency(fiat).await?;
    }
    if args.max {
        form.set_max_amount().await?;
    } else if let Some(amount) = &args.amount {
        form.set_amount_input(amount).await?;
    }
    Ok(form)
}

pub fn display_offramp_quote(form: &OfframpForm, quote: &OfframpQuote) -> String {
    let fiat: FiatCurrency = form.state().fiat_currency;
    let Some(selected) = form.selected_asset() else {
        return ui::style_text("No off-ramp assets configured", ui::StyleType::Error);
    };

    let mut table = ui::key_value_table(&[
        (
            "You send",
            format!("{} {}", format_number(quote.amount, 6), selected.asset),
        ),
        ("Network", selected.chain.to_string()),
        (
            "Available",
            format!("{} {}", format_number(selected.balance, 4), selected.asset),
        ),
        (
            "Rate",
            format!("1 {} = {}", selected.asset, format_currency(quote.rate, fiat, 2)),
        ),
        ("Payout", format_currency(quote.fiat_amount, fiat, 2)),
        ("Off-ramp fee (1%)", format_currency(quote.fees.offramp_fee, fiat, 2)),
        ("Network fee", format_currency(quote.fees.network_fee, fiat, 2)),
        ("Bank fee", format_currency(quote.fees.bank_fee, fiat, 2)),
        ("Total fees", format_currency(quote.fees.total_fees, fiat, 2)),
    ]);
    table.add_row(vec![
        Cell::new("You receive"),
        ui::total_cell(&format_currency(quote.fees.receive_amount, fiat, 2)),
    ]);

    let mut output = format!(
        "{}\n\n",
        ui::style_text(&format!("Sell {}", selected.label), ui::StyleType::Title)
    );
    output.push_str(&table.to_string());
    output
}

pub async fn run_offramp(context: &AppContext, args: &OfframpArgs) -> Result<()> {
    let form = prepare_offramp_form(context, args).await?;
    let quote = form.settled_quote().await;

    println!("{}", display_offramp_quote(&form, &quote));
    for message in quote.errors.messages() {
        println!("{}", ui::style_text(message, ui::StyleType::Error));
    }
    Ok(())
}
