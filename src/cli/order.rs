use super::quote::{fetch_rate, prepare_offramp_form, prepare_onramp_form};
use super::ui;
use crate::core::format::{format_currency, format_number, truncate_address};
use crate::core::order::{
    BankDetails, OFFRAMP_ID_PREFIX, OfframpEvent, OfframpOrder, OfframpStatus, OnrampOrder, OrderEvent,
    OrderStatus, OrderStore,
};
use crate::core::wallet::WalletConnection;
use crate::{AppContext, OfframpArgs, OrderCommand, QuoteArgs};
use anyhow::{Context, Result, bail};
use chrono::{Local, Utc};
use comfy_table::Cell;
use tracing::{info, warn};

pub async fn run(context: &AppContext, command: OrderCommand) -> Result<()> {
    let store = OrderStore::new(context.local_storage());
    match command {
        OrderCommand::CreateOnramp(args) => create_onramp(context, &store, &args).await,
        OrderCommand::CreateOfframp(args) => create_offramp(context, &store, &args).await,
        OrderCommand::List => list(&store).await,
        OrderCommand::Show { id } => show(&store, &id).await,
        OrderCommand::Advance {
            id,
            fail,
            tx_hash,
            bank_details,
        } => advance(&store, &id, fail, tx_hash, bank_details).await,
    }
}

fn is_offramp_id(id: &str) -> bool {
    id.starts_with(&format!("{OFFRAMP_ID_PREFIX}-"))
}

fn local_time(time: chrono::DateTime<Utc>) -> String {
    time.with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

pub fn display_onramp_order(order: &OnrampOrder) -> String {
    let fiat = order.fiat_currency;
    let mut table = ui::key_value_table(&[
        ("Order", order.id.clone()),
        ("Created", local_time(order.created_at)),
        ("Pay before", local_time(order.expires_at)),
        ("Amount", format_currency(order.amount, fiat, 2)),
        ("Payment method", order.payment_method.to_string()),
        ("Total cost", format_currency(order.fees.total_cost, fiat, 2)),
        (
            "You receive",
            format!(
                "{} {}",
                format_number(order.crypto_amount, 6),
                order.crypto_asset
            ),
        ),
        ("Wallet", truncate_address(&order.wallet_address, 6)),
    ]);
    table.add_row(vec![
        Cell::new("Status"),
        ui::status_cell(&order.status.to_string()),
    ]);
    if let Some(hash) = &order.transaction_hash {
        table.add_row(vec![Cell::new("Transaction"), Cell::new(hash)]);
    }
    table.to_string()
}

pub fn display_offramp_order(order: &OfframpOrder) -> String {
    let fiat = order.fiat_currency;
    let mut table = ui::key_value_table(&[
        ("Order", order.id.clone()),
        ("Created", local_time(order.created_at)),
        ("Rate locked until", local_time(order.lock_expires_at)),
        (
            "You send",
            format!("{} {} on {}", format_number(order.amount, 6), order.asset, order.chain),
        ),
        ("Send to", order.settlement_address.clone()),
        ("Memo", order.memo.clone()),
        ("Payout", format_currency(order.fiat_amount, fiat, 2)),
        ("Total fees", format_currency(order.fees.total_fees, fiat, 2)),
        ("You receive", format_currency(order.fees.receive_amount, fiat, 2)),
    ]);
    if let Some(bank) = &order.bank_details {
        table.add_row(vec![Cell::new("Bank account"), Cell::new(bank.to_string())]);
    }
    table.add_row(vec![
        Cell::new("Status"),
        ui::status_cell(&order.status.to_string()),
    ]);
    table.to_string()
}

async fn create_onramp(context: &AppContext, store: &OrderStore, args: &QuoteArgs) -> Result<()> {
    let wallet = WalletConnection::load(context.local_storage()).await;
    if !wallet.is_connected() {
        bail!("Connect a wallet first with `aframp wallet connect <address>`");
    }

    let form = prepare_onramp_form(context, args).await?;
    let rate = fetch_rate(context, &form).await?;
    if !form.is_valid(rate.rate, wallet.is_connected()) {
        let error = form.amount_error();
        if error.is_empty() {
            bail!("Cannot create an order for this amount");
        }
        bail!(error);
    }

    let amount = form.settled_quote(rate.rate).await.amount;
    let order = OnrampOrder::new(form.state(), amount, rate.rate, wallet.address(), Utc::now());
    store.save(&order).await?;
    info!(id = %order.id, "Created on-ramp order");

    println!("{}", display_onramp_order(&order));
    Ok(())
}

async fn create_offramp(context: &AppContext, store: &OrderStore, args: &OfframpArgs) -> Result<()> {
    let form = prepare_offramp_form(context, args).await?;
    let quote = form.settled_quote().await;
    if !quote.is_valid() {
        let messages: Vec<&str> = quote.errors.messages().collect();
        if messages.is_empty() {
            bail!("Cannot create an order for this amount");
        }
        bail!(messages.join(" "));
    }

    let option = form
        .selected_asset()
        .context("No off-ramp assets configured")?;
    let order = OfframpOrder::new(
        option,
        form.state().fiat_currency,
        &quote,
        &context.config.settlement_address,
        Utc::now(),
    );
    store.save(&order).await?;
    info!(id = %order.id, "Created off-ramp order");

    println!("{}", display_offramp_order(&order));
    println!(
        "\n{}",
        ui::style_text(
            &format!(
                "Send {} {} to {} and include memo {} with your transfer.",
                format_number(order.amount, 6),
                order.asset,
                order.settlement_address,
                order.memo
            ),
            ui::StyleType::Warning
        )
    );
    Ok(())
}

async fn list(store: &OrderStore) -> Result<()> {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Order"),
        ui::header_cell("Created"),
        ui::header_cell("Amount"),
        ui::header_cell("Status"),
    ]);

    let mut count = 0;
    for id in store.list_ids::<OnrampOrder>().await {
        match store.load::<OnrampOrder>(&id).await {
            Ok(order) => {
                table.add_row(vec![
                    Cell::new(&order.id),
                    Cell::new(local_time(order.created_at)),
                    Cell::new(format_currency(order.amount, order.fiat_currency, 2)),
                    ui::status_cell(&order.status.to_string()),
                ]);
                count += 1;
            }
            Err(e) => warn!(%id, "Skipping order: {e}"),
        }
    }
    for id in store.list_ids::<OfframpOrder>().await {
        match store.load::<OfframpOrder>(&id).await {
            Ok(order) => {
                table.add_row(vec![
                    Cell::new(&order.id),
                    Cell::new(local_time(order.created_at)),
                    Cell::new(format!("{} {}", format_number(order.amount, 6), order.asset)),
                    ui::status_cell(&order.status.to_string()),
                ]);
                count += 1;
            }
            Err(e) => warn!(%id, "Skipping order: {e}"),
        }
    }

    if count == 0 {
        println!("{}", ui::style_text("No orders yet", ui::StyleType::Subtle));
    } else {
        println!("{table}");
    }
    Ok(())
}

async fn show(store: &OrderStore, id: &str) -> Result<()> {
    let now = Utc::now();
    if is_offramp_id(id) {
        let mut order: OfframpOrder = store.load(id).await?;
        if order.expire(now) {
            store.save(&order).await?;
        }
        println!("{}", display_offramp_order(&order));
    } else {
        let mut order: OnrampOrder = store.load(id).await?;
        if order.expire(now) {
            store.save(&order).await?;
        }
        println!("{}", display_onramp_order(&order));
        if order.status == OrderStatus::AwaitingPayment {
            let left = order.time_left(now);
            println!(
                "\n{}",
                ui::style_text(
                    &format!(
                        "{}:{:02} left to pay",
                        left.num_minutes(),
                        left.num_seconds() % 60
                    ),
                    ui::StyleType::Subtle
                )
            );
        }
    }
    Ok(())
}

/// Moves an order to its next status, or to failed when `fail` is set.
async fn advance(
    store: &OrderStore,
    id: &str,
    fail: bool,
    tx_hash: Option<String>,
    bank_details: Option<BankDetails>,
) -> Result<()> {
    let now = Utc::now();
    if is_offramp_id(id) {
        let mut order: OfframpOrder = store.load(id).await?;
        if order.expire(now) {
            store.save(&order).await?;
            bail!("Rate lock expired; order {} failed", order.id);
        }
        let event = if fail {
            OfframpEvent::Failed
        } else {
            match order.status {
                OfframpStatus::PendingBankDetails => OfframpEvent::BankDetailsSubmitted(
                    bank_details.context(
                        "Bank details are required: pass --bank-name, --account-number and --account-name",
                    )?,
                ),
                OfframpStatus::AwaitingCrypto => OfframpEvent::CryptoReceived,
                OfframpStatus::Processing => OfframpEvent::PayoutSent,
                status => bail!("Order is already {}", status),
            }
        };
        order.apply(event)?;
        store.save(&order).await?;
        println!("{}", display_offramp_order(&order));
    } else {
        let mut order: OnrampOrder = store.load(id).await?;
        if order.expire(now) {
            store.save(&order).await?;
            bail!("Payment window closed; order {} failed", order.id);
        }
        let event = if fail {
            OrderEvent::Failed
        } else {
            match order.status {
                OrderStatus::AwaitingPayment => OrderEvent::PaymentReceived,
                OrderStatus::PaymentReceived => OrderEvent::MintingStarted,
                OrderStatus::Minting => OrderEvent::TransferStarted,
                OrderStatus::Transferring => OrderEvent::TransferCompleted {
                    transaction_hash: tx_hash
                        .context("A transaction hash is required to complete the order")?,
                },
                status => bail!("Order is already {}", status),
            }
        };
        order.apply(event, now)?;
        store.save(&order).await?;
        println!("{}", display_onramp_order(&order));
    }
    Ok(())
}
