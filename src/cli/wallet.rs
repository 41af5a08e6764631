use super::ui;
use crate::core::format::truncate_address;
use crate::core::validation::is_valid_stellar_address;
use crate::core::wallet::{ManualWalletBridge, WalletConnection};
use crate::{AppContext, WalletCommand};
use anyhow::{Result, bail};
use comfy_table::Cell;

pub async fn run(context: &AppContext, command: WalletCommand) -> Result<()> {
    let mut wallet = WalletConnection::load(context.local_storage()).await;
    match command {
        WalletCommand::Connect { address } => {
            let bridge = ManualWalletBridge::new(&address);
            let key = wallet.connect(&bridge).await?;
            println!(
                "Connected {}",
                ui::style_text(&truncate_address(&key, 6), ui::StyleType::TotalValue)
            );
        }
        WalletCommand::List => println!("{}", display_wallets(&wallet)),
        WalletCommand::Disconnect => {
            if !wallet.is_connected() {
                println!("{}", ui::style_text("No wallet connected", ui::StyleType::Subtle));
                return Ok(());
            }
            wallet.disconnect().await;
            println!("Wallet disconnected");
        }
    }
    Ok(())
}

pub fn display_wallets(wallet: &WalletConnection) -> String {
    if wallet.addresses().is_empty() {
        return ui::style_text("No wallets used yet", ui::StyleType::Subtle);
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Address"), ui::header_cell("Status")]);
    for address in wallet.addresses() {
        let status = if address == wallet.address() {
            ui::status_cell("connected").fg(comfy_table::Color::Green)
        } else {
            Cell::new("")
        };
        table.add_row(vec![Cell::new(address), status]);
    }
    table.to_string()
}

/// Checks whether `address` is a valid Stellar account id.
pub fn check_address(address: &str) -> Result<()> {
    let address = address.trim();
    if !is_valid_stellar_address(address) {
        bail!("{} is not a valid Stellar address", truncate_address(address, 6));
    }
    println!(
        "{} is a valid Stellar address",
        ui::style_text(&truncate_address(address, 6), ui::StyleType::TotalValue)
    );
    Ok(())
}
