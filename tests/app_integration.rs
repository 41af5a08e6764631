use aframp::core::cache::Store;
use aframp::core::order::{OnrampOrder, OrderStatus, OrderStore};
use aframp::core::wallet::WalletConnection;
use aframp::store::{KeyValueStore, LOCAL_STORAGE};
use std::fs;
use std::path::Path;
use tracing::{error, info};

const WALLET: &str = "GBRPYHIL2CI3FNQ4BXLFMNDLFJUNPU2HY3ZMFSHONUCEOASW7QC7OX2H";

// Adds automatic logging to test
mod test_utils {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub const MOCK_PRICES: &str = r#"{
        "usd-coin": {"ngn": 1600.0, "kes": 129.0, "ghs": 12.5, "zar": 18.0, "ugx": 3700.0},
        "stellar": {"ngn": 400.0, "kes": 32.0, "ghs": 3.1, "zar": 4.5, "ugx": 925.0}
    }"#;

    pub async fn create_mock_server(status: u16, mock_response: &str) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/v3/simple/price"))
            .respond_with(ResponseTemplate::new(status).set_body_string(mock_response))
            .mount(&mock_server)
            .await;

        mock_server
    }
}

fn write_config(dir: &Path, base_url: &str) -> String {
    let config_path = dir.join("config.yaml");
    let config_content = format!(
        r#"
        providers:
          coingecko:
            base_url: {}
        refresh:
          attempts: 2
          backoff_ms: 10
        data_path: {}
    "#,
        base_url,
        dir.join("data").display()
    );
    fs::write(&config_path, config_content).expect("Failed to write config file");
    config_path.to_str().unwrap().to_string()
}

async fn run(command: aframp::AppCommand, config_path: &str) -> anyhow::Result<()> {
    aframp::run_command(command, Some(config_path)).await
}

#[test_log::test(tokio::test)]
async fn test_rate_command_with_mock() {
    let mock_server = test_utils::create_mock_server(200, test_utils::MOCK_PRICES).await;
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_config(dir.path(), &mock_server.uri());

    let result = run(
        aframp::AppCommand::Rate {
            fiat: None,
            asset: None,
        },
        &config_path,
    )
    .await;
    assert!(result.is_ok(), "Rate command failed with: {:?}", result.err());
}

#[test_log::test(tokio::test)]
async fn test_rate_command_fails_without_cache() {
    let mock_server = test_utils::create_mock_server(500, "").await;
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_config(dir.path(), &mock_server.uri());

    let result = run(
        aframp::AppCommand::Rate {
            fiat: None,
            asset: None,
        },
        &config_path,
    )
    .await;
    let err = result.unwrap_err();
    assert_eq!(err.to_string(), "Exchange rate request failed: 500");
}

#[test_log::test(tokio::test)]
async fn test_watch_stops_after_requested_cycles() {
    let mock_server = test_utils::create_mock_server(200, test_utils::MOCK_PRICES).await;
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.yaml");
    fs::write(
        &config_path,
        format!(
            "providers:\n  coingecko:\n    base_url: {}\nrefresh:\n  countdown_seconds: 1\ndata_path: {}\n",
            mock_server.uri(),
            dir.path().join("data").display()
        ),
    )
    .unwrap();

    let result = run(
        aframp::AppCommand::Watch {
            fiat: None,
            asset: None,
            cycles: Some(2),
        },
        config_path.to_str().unwrap(),
    )
    .await;
    assert!(result.is_ok(), "Watch failed with: {:?}", result.err());

    // One initial fetch plus one countdown refresh
    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
}

#[test_log::test(tokio::test)]
async fn test_quote_uses_cached_rate_when_api_fails() {
    let dir = tempfile::tempdir().unwrap();

    // A successful run leaves the prices cached on disk
    {
        let mock_server = test_utils::create_mock_server(200, test_utils::MOCK_PRICES).await;
        let config_path = write_config(dir.path(), &mock_server.uri());
        run(
            aframp::AppCommand::Rate {
                fiat: None,
                asset: None,
            },
            &config_path,
        )
        .await
        .unwrap();
    }

    let failing = test_utils::create_mock_server(503, "").await;
    let config_path = write_config(dir.path(), &failing.uri());
    let result = run(
        aframp::AppCommand::Quote(aframp::QuoteArgs {
            amount: "25000".to_string(),
            ..Default::default()
        }),
        &config_path,
    )
    .await;
    assert!(result.is_ok(), "Quote failed with: {:?}", result.err());
}

#[test_log::test(tokio::test)]
async fn test_order_flow_with_mock() {
    let mock_server = test_utils::create_mock_server(200, test_utils::MOCK_PRICES).await;
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_config(dir.path(), &mock_server.uri());
    let quote = aframp::QuoteArgs {
        amount: "10000".to_string(),
        ..Default::default()
    };

    // No wallet yet
    let result = run(
        aframp::AppCommand::Order(aframp::OrderCommand::CreateOnramp(quote.clone())),
        &config_path,
    )
    .await;
    assert!(result.is_err());

    run(
        aframp::AppCommand::Wallet(aframp::WalletCommand::Connect {
            address: WALLET.to_string(),
        }),
        &config_path,
    )
    .await
    .unwrap();

    let result = run(
        aframp::AppCommand::Order(aframp::OrderCommand::CreateOnramp(quote)),
        &config_path,
    )
    .await;
    assert!(result.is_ok(), "Order creation failed with: {:?}", result.err());

    // Inspect what the run persisted
    let order_id = {
        let store = KeyValueStore::open(&dir.path().join("data"));
        let collection = store.get_collection(LOCAL_STORAGE);
        let wallet = WalletConnection::load(collection).await;
        assert_eq!(wallet.address(), WALLET);

        let form_key = aframp::core::form::ONRAMP_FORM_KEY;
        let form = store.get_collection(LOCAL_STORAGE).get(form_key.as_bytes()).await;
        assert!(form.is_some());

        let orders = OrderStore::new(store.get_collection(LOCAL_STORAGE));
        let ids = orders.list_ids::<OnrampOrder>().await;
        assert_eq!(ids.len(), 1);
        let order: OnrampOrder = orders
            .load(&ids[0])
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::AwaitingPayment);
        assert_eq!(order.wallet_address, WALLET);
        assert_eq!(order.amount, 10_000.0);
        assert_eq!(order.exchange_rate, 1.0 / 1600.0);
        order.id
    };

    run(
        aframp::AppCommand::Order(aframp::OrderCommand::Advance {
            id: order_id.clone(),
            fail: false,
            tx_hash: None,
            bank_details: None,
        }),
        &config_path,
    )
    .await
    .unwrap();

    run(
        aframp::AppCommand::Order(aframp::OrderCommand::Show {
            id: order_id.clone(),
        }),
        &config_path,
    )
    .await
    .unwrap();
    run(aframp::AppCommand::Order(aframp::OrderCommand::List), &config_path)
        .await
        .unwrap();

    {
        let store = KeyValueStore::open(&dir.path().join("data"));
        let order: OnrampOrder = OrderStore::new(store.get_collection(LOCAL_STORAGE))
            .load(&order_id)
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::PaymentReceived);
    }

    let missing = run(
        aframp::AppCommand::Order(aframp::OrderCommand::Show {
            id: "ONR-20260101-ZZZZZZ".to_string(),
        }),
        &config_path,
    )
    .await;
    assert_eq!(missing.unwrap_err().to_string(), "Order not found");
}

#[test_log::test(tokio::test)]
async fn test_offramp_quote() {
    let dir = tempfile::tempdir().unwrap();
    // Off-ramp rates never hit the network
    let config_path = write_config(dir.path(), "http://127.0.0.1:1");

    let result = run(
        aframp::AppCommand::Offramp(aframp::OfframpArgs {
            asset_id: Some("usdc-stellar".to_string()),
            max: true,
            ..Default::default()
        }),
        &config_path,
    )
    .await;
    assert!(result.is_ok(), "Off-ramp quote failed with: {:?}", result.err());

    let unknown = run(
        aframp::AppCommand::Offramp(aframp::OfframpArgs {
            amount: Some("10".to_string()),
            asset_id: Some("btc-bitcoin".to_string()),
            ..Default::default()
        }),
        &config_path,
    )
    .await;
    assert!(unknown.is_err());
}

#[test_log::test(tokio::test)]
async fn test_address_command() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_config(dir.path(), "http://127.0.0.1:1");

    let valid = run(
        aframp::AppCommand::Address {
            address: WALLET.to_string(),
        },
        &config_path,
    )
    .await;
    assert!(valid.is_ok());

    let invalid = run(
        aframp::AppCommand::Address {
            address: WALLET.to_lowercase(),
        },
        &config_path,
    )
    .await;
    assert!(invalid.is_err());
}

#[test_log::test(tokio::test)]
#[ignore = "requires network access"]
async fn test_real_coingecko_api() {
    use aframp::core::rate::RateProvider;
    use aframp::providers::coingecko::{CoinGeckoProvider, DEFAULT_BASE_URL};

    let provider = CoinGeckoProvider::new(DEFAULT_BASE_URL).unwrap();
    info!("Fetching prices from CoinGecko");

    match provider.fetch_prices().await {
        Ok(prices) => {
            info!(?prices, "Received successful price response");
            let ngn = prices["usd-coin"]["ngn"];
            assert!(ngn > 0.0, "Price should be positive");
        }
        Err(e) => {
            error!("Price API request failed: {e}\n{e:?}");
            panic!("Price API request failed: {e}");
        }
    }
}
