use aframp::core::currency::{CryptoAsset, FiatCurrency, PaymentMethod};
use aframp::core::log::init_logging;
use aframp::core::order::BankDetails;
use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct PairArgs {
    /// Fiat currency (NGN, KES, GHS, ZAR, UGX)
    #[arg(short, long)]
    fiat: Option<FiatCurrency>,

    /// Crypto asset (cNGN, cKES, cGHS, USDC, XLM)
    #[arg(short, long)]
    asset: Option<CryptoAsset>,
}

#[derive(Args)]
struct OnrampArgs {
    /// Amount of fiat to pay
    amount: String,

    #[command(flatten)]
    pair: PairArgs,

    /// Payment method (bank_transfer, card, mobile_money)
    #[arg(short, long)]
    payment_method: Option<PaymentMethod>,
}

impl From<OnrampArgs> for aframp::QuoteArgs {
    fn from(args: OnrampArgs) -> aframp::QuoteArgs {
        aframp::QuoteArgs {
            amount: args.amount,
            fiat: args.pair.fiat,
            asset: args.pair.asset,
            payment_method: args.payment_method,
        }
    }
}

#[derive(Args)]
struct SellArgs {
    /// Amount of the asset to sell
    #[arg(required_unless_present = "max")]
    amount: Option<String>,

    /// Asset option id, e.g. usdc-stellar
    #[arg(long)]
    asset_id: Option<String>,

    /// Fiat currency to receive
    #[arg(short, long)]
    fiat: Option<FiatCurrency>,

    /// Sell the full available balance
    #[arg(long)]
    max: bool,
}

impl From<SellArgs> for aframp::OfframpArgs {
    fn from(args: SellArgs) -> aframp::OfframpArgs {
        aframp::OfframpArgs {
            amount: args.amount,
            asset_id: args.asset_id,
            fiat: args.fiat,
            max: args.max,
        }
    }
}

/// Payout account for an off-ramp order
#[derive(Args)]
struct BankArgs {
    /// Bank receiving the payout
    #[arg(long, requires_all = ["account_number", "account_name"])]
    bank_name: Option<String>,

    #[arg(long, requires = "bank_name")]
    account_number: Option<String>,

    /// Name on the account
    #[arg(long, requires = "bank_name")]
    account_name: Option<String>,
}

impl BankArgs {
    fn into_details(self) -> Option<BankDetails> {
        Some(BankDetails {
            bank_name: self.bank_name?,
            account_number: self.account_number?,
            account_name: self.account_name?,
        })
    }
}

#[derive(Subcommand)]
enum OrderCommands {
    /// Create an on-ramp order for the connected wallet
    Create(OnrampArgs),
    /// Create an off-ramp order
    Sell(SellArgs),
    /// List saved orders
    List,
    /// Show an order
    Show { id: String },
    /// Move an order to its next status
    Advance {
        id: String,
        /// Mark the order as failed instead
        #[arg(long)]
        fail: bool,
        /// Transaction hash, required to complete an on-ramp order
        #[arg(long)]
        tx_hash: Option<String>,
        #[command(flatten)]
        bank: BankArgs,
    },
}

#[derive(Subcommand)]
enum WalletCommands {
    /// Connect a Stellar address
    Connect { address: String },
    /// List previously used addresses
    List,
    /// Disconnect the current address
    Disconnect,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Display the current exchange rate
    Rate(PairArgs),
    /// Keep the exchange rate refreshed on a countdown
    Watch {
        #[command(flatten)]
        pair: PairArgs,
        /// Stop after this many refreshes
        #[arg(long)]
        cycles: Option<u32>,
    },
    /// Quote buying crypto with fiat
    Quote(OnrampArgs),
    /// Quote selling crypto for fiat
    Offramp(SellArgs),
    /// Create and track orders
    #[command(subcommand)]
    Order(OrderCommands),
    /// Manage the connected wallet
    #[command(subcommand)]
    Wallet(WalletCommands),
    /// Check a Stellar address
    Address { address: String },
}

impl From<Commands> for aframp::AppCommand {
    fn from(cmd: Commands) -> aframp::AppCommand {
        match cmd {
            Commands::Rate(pair) => aframp::AppCommand::Rate {
                fiat: pair.fiat,
                asset: pair.asset,
            },
            Commands::Watch { pair, cycles } => aframp::AppCommand::Watch {
                fiat: pair.fiat,
                asset: pair.asset,
                cycles,
            },
            Commands::Quote(args) => aframp::AppCommand::Quote(args.into()),
            Commands::Offramp(args) => aframp::AppCommand::Offramp(args.into()),
            Commands::Order(order) => aframp::AppCommand::Order(match order {
                OrderCommands::Create(args) => aframp::OrderCommand::CreateOnramp(args.into()),
                OrderCommands::Sell(args) => aframp::OrderCommand::CreateOfframp(args.into()),
                OrderCommands::List => aframp::OrderCommand::List,
                OrderCommands::Show { id } => aframp::OrderCommand::Show { id },
                OrderCommands::Advance {
                    id,
                    fail,
                    tx_hash,
                    bank,
                } => aframp::OrderCommand::Advance {
                    id,
                    fail,
                    tx_hash,
                    bank_details: bank.into_details(),
                },
            }),
            Commands::Wallet(wallet) => aframp::AppCommand::Wallet(match wallet {
                WalletCommands::Connect { address } => aframp::WalletCommand::Connect { address },
                WalletCommands::List => aframp::WalletCommand::List,
                WalletCommands::Disconnect => aframp::WalletCommand::Disconnect,
            }),
            Commands::Address { address } => aframp::AppCommand::Address { address },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => aframp::cli::setup::setup(),
        Some(cmd) => aframp::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
