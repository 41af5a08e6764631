//! Stellar wallet connection state, persisted in the local collection.

use crate::core::cache::{KeyValueCollection, get_json, get_string, put_json, put_string};
use crate::core::validation::is_valid_stellar_address;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

pub const WALLET_ADDRESS_KEY: &str = "walletAddress";
pub const WALLET_LIST_KEY: &str = "walletAddresses";
const WALLET_NAME_KEY: &str = "walletName";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WalletError {
    #[error("Wallet extension not installed")]
    NotInstalled,
    #[error("Wallet access denied")]
    AccessDenied,
    #[error("Invalid Stellar address")]
    InvalidAddress,
    #[error("Wallet error: {0}")]
    Bridge(String),
}

/// Access to a wallet holding the user's Stellar keys.
#[async_trait]
pub trait WalletBridge: Send + Sync {
    async fn is_installed(&self) -> bool;
    async fn request_access(&self) -> Result<bool, WalletError>;
    async fn get_public_key(&self) -> Result<String, WalletError>;
}

/// Bridge for a key the user supplies directly, e.g. on the command line.
pub struct ManualWalletBridge {
    public_key: String,
}

impl ManualWalletBridge {
    pub fn new(public_key: &str) -> Self {
        Self {
            public_key: public_key.trim().to_string(),
        }
    }
}

#[async_trait]
impl WalletBridge for ManualWalletBridge {
    async fn is_installed(&self) -> bool {
        true
    }

    async fn request_access(&self) -> Result<bool, WalletError> {
        Ok(!self.public_key.is_empty())
    }

    async fn get_public_key(&self) -> Result<String, WalletError> {
        Ok(self.public_key.clone())
    }
}

/// The connected address plus every address used before, most recent first.
pub struct WalletConnection {
    collection: Arc<dyn KeyValueCollection>,
    address: String,
    addresses: Vec<String>,
}

impl WalletConnection {
    pub async fn load(collection: Arc<dyn KeyValueCollection>) -> Self {
        let address = get_string(collection.as_ref(), WALLET_ADDRESS_KEY)
            .await
            .unwrap_or_default();
        let stored: Vec<String> = match get_json(collection.as_ref(), WALLET_LIST_KEY).await {
            Ok(list) => list.unwrap_or_default(),
            Err(e) => {
                warn!("Ignoring unreadable wallet list: {:#}", e);
                Vec::new()
            }
        };

        let mut addresses: Vec<String> = stored.into_iter().filter(|a| !a.is_empty()).collect();
        if !address.is_empty() && !addresses.contains(&address) {
            addresses.insert(0, address.clone());
        }

        Self {
            collection,
            address,
            addresses,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn addresses(&self) -> &[String] {
        &self.addresses
    }

    pub fn is_connected(&self) -> bool {
        is_valid_stellar_address(&self.address)
    }

    /// Makes `address` the connected one and moves it to the front of the list.
    pub async fn update_address(&mut self, address: &str) -> Result<(), WalletError> {
        if !is_valid_stellar_address(address) {
            return Err(WalletError::InvalidAddress);
        }

        self.address = address.to_string();
        put_string(self.collection.as_ref(), WALLET_ADDRESS_KEY, address).await;

        self.addresses.retain(|a| a != address);
        self.addresses.insert(0, address.to_string());
        put_json(self.collection.as_ref(), WALLET_LIST_KEY, &self.addresses)
            .await
            .map_err(|e| WalletError::Bridge(e.to_string()))?;

        debug!("Connected wallet {}", address);
        Ok(())
    }

    pub async fn connect(&mut self, bridge: &dyn WalletBridge) -> Result<String, WalletError> {
        if !bridge.is_installed().await {
            return Err(WalletError::NotInstalled);
        }
        if !bridge.request_access().await? {
            return Err(WalletError::AccessDenied);
        }
        let public_key = bridge.get_public_key().await?;
        self.update_address(&public_key).await?;
        Ok(public_key)
    }

    /// Forgets the connected address. Previously used addresses are kept.
    pub async fn disconnect(&mut self) {
        self.collection.remove(WALLET_ADDRESS_KEY.as_bytes()).await;
        self.collection.remove(WALLET_NAME_KEY.as_bytes()).await;
        self.address.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryCollection;

    const FIRST: &str = "GBRPYHIL2CI3FNQ4BXLFMNDLFJUNPU2HY3ZMFSHONUCEOASW7QC7OX2H";
    const SECOND: &str = "GAAZI4TCR3TY5OJHCTJC2A4QSY6CJWJH5IAJTGKIN2ER7LBNVKOCCWN7";

    struct MockBridge {
        installed: bool,
        access: Result<bool, WalletError>,
        key: &'static str,
    }

    #[async_trait]
    impl WalletBridge for MockBridge {
        async fn is_installed(&self) -> bool {
            self.installed
        }

        async fn request_access(&self) -> Result<bool, WalletError> {
            self.access.clone()
        }

        async fn get_public_key(&self) -> Result<String, WalletError> {
            Ok(self.key.to_string())
        }
    }

    fn collection() -> Arc<dyn KeyValueCollection> {
        Arc::new(MemoryCollection::new())
    }

    #[tokio::test]
    async fn test_restores_address_first_in_list() {
        let collection = collection();
        put_string(collection.as_ref(), WALLET_ADDRESS_KEY, FIRST).await;
        put_json(collection.as_ref(), WALLET_LIST_KEY, &vec![SECOND, ""])
            .await
            .unwrap();

        let wallet = WalletConnection::load(collection).await;
        assert!(wallet.is_connected());
        assert_eq!(wallet.address(), FIRST);
        assert_eq!(wallet.addresses(), [FIRST.to_string(), SECOND.to_string()]);
    }

    #[tokio::test]
    async fn test_update_address_moves_to_front() {
        let collection = collection();
        let mut wallet = WalletConnection::load(Arc::clone(&collection)).await;
        assert!(!wallet.is_connected());

        wallet.update_address(FIRST).await.unwrap();
        wallet.update_address(SECOND).await.unwrap();
        wallet.update_address(FIRST).await.unwrap();
        assert_eq!(wallet.addresses(), [FIRST.to_string(), SECOND.to_string()]);

        assert_eq!(
            wallet.update_address("gbad").await,
            Err(WalletError::InvalidAddress)
        );
        assert_eq!(wallet.address(), FIRST);

        let reloaded = WalletConnection::load(collection).await;
        assert_eq!(reloaded.address(), FIRST);
        assert_eq!(reloaded.addresses().len(), 2);
    }

    #[tokio::test]
    async fn test_connect_through_bridge() {
        let mut wallet = WalletConnection::load(collection()).await;

        let missing = MockBridge {
            installed: false,
            access: Ok(true),
            key: FIRST,
        };
        let err = wallet.connect(&missing).await.unwrap_err();
        assert_eq!(err.to_string(), "Wallet extension not installed");

        let denied = MockBridge {
            installed: true,
            access: Ok(false),
            key: FIRST,
        };
        let err = wallet.connect(&denied).await.unwrap_err();
        assert_eq!(err.to_string(), "Wallet access denied");
        assert!(!wallet.is_connected());

        let ok = MockBridge {
            installed: true,
            access: Ok(true),
            key: SECOND,
        };
        assert_eq!(wallet.connect(&ok).await.unwrap(), SECOND);
        assert!(wallet.is_connected());
    }

    #[tokio::test]
    async fn test_disconnect_keeps_history() {
        let collection = collection();
        put_string(collection.as_ref(), WALLET_NAME_KEY, "freighter").await;
        let mut wallet = WalletConnection::load(Arc::clone(&collection)).await;
        wallet
            .connect(&ManualWalletBridge::new(FIRST))
            .await
            .unwrap();

        wallet.disconnect().await;
        assert!(!wallet.is_connected());
        assert_eq!(wallet.address(), "");
        assert!(get_string(collection.as_ref(), WALLET_ADDRESS_KEY).await.is_none());
        assert!(get_string(collection.as_ref(), WALLET_NAME_KEY).await.is_none());

        let reloaded = WalletConnection::load(collection).await;
        assert_eq!(reloaded.addresses(), [FIRST.to_string()]);
    }
}
