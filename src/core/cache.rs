use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use std::sync::Arc;
use tracing::debug;

/// A flat key-value collection. Writes are last-writer-wins.
#[async_trait]
pub trait KeyValueCollection: Send + Sync {
    async fn get(&self, key: &[u8]) -> Option<Vec<u8>>;
    async fn put(&self, key: &[u8], value: &[u8]);
    async fn remove(&self, key: &[u8]);
    async fn clear(&self);
}

/// Provides named collections backed by memory or disk.
pub trait Store {
    fn get_collection(&self, name: &str) -> Arc<dyn KeyValueCollection>;
    fn remove_collection(&self, name: &str) -> bool;
}

/// Reads `key` and decodes it as JSON. A missing key is `Ok(None)`.
pub async fn get_json<T: DeserializeOwned>(
    collection: &dyn KeyValueCollection,
    key: &str,
) -> Result<Option<T>> {
    match collection.get(key.as_bytes()).await {
        Some(bytes) => {
            let value = serde_json::from_slice(&bytes)
                .with_context(|| format!("Failed to decode stored value for key: {key}"))?;
            Ok(Some(value))
        }
        None => {
            debug!("No stored value for key: {}", key);
            Ok(None)
        }
    }
}

pub async fn put_json<T: Serialize>(
    collection: &dyn KeyValueCollection,
    key: &str,
    value: &T,
) -> Result<()> {
    let bytes = serde_json::to_vec(value)
        .with_context(|| format!("Failed to encode value for key: {key}"))?;
    collection.put(key.as_bytes(), &bytes).await;
    Ok(())
}

/// Reads a plain string value, as stored for simple keys like the wallet address.
pub async fn get_string(collection: &dyn KeyValueCollection, key: &str) -> Option<String> {
    collection
        .get(key.as_bytes())
        .await
        .and_then(|bytes| String::from_utf8(bytes).ok())
}

pub async fn put_string(collection: &dyn KeyValueCollection, key: &str, value: &str) {
    collection.put(key.as_bytes(), value.as_bytes()).await;
}
