use crate::core::cache::KeyValueCollection;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// In-memory collection, used in tests and when the disk store is unavailable.
#[derive(Default)]
pub struct MemoryCollection {
    inner: Arc<Mutex<HashMap<Vec<u8>, Vec<u8>>>>,
}

impl MemoryCollection {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueCollection for MemoryCollection {
    async fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        let entries = self.inner.lock().await;
        let value = entries.get(key).cloned();
        if value.is_some() {
            debug!("Store HIT for key: {}", String::from_utf8_lossy(key));
        } else {
            debug!("Store MISS for key: {}", String::from_utf8_lossy(key));
        }
        value
    }

    async fn put(&self, key: &[u8], value: &[u8]) {
        let mut entries = self.inner.lock().await;
        debug!("Store PUT for key: {}", String::from_utf8_lossy(key));
        entries.insert(key.to_vec(), value.to_vec());
    }

    async fn remove(&self, key: &[u8]) {
        let mut entries = self.inner.lock().await;
        entries.remove(key);
        debug!("Store REMOVE for key: {}", String::from_utf8_lossy(key));
    }

    async fn clear(&self) {
        let mut entries = self.inner.lock().await;
        entries.clear();
        debug!("Store CLEAR");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cache::{get_json, put_json};

    #[tokio::test]
    async fn test_collection_get_put() {
        let collection = MemoryCollection::new();

        // Initially, collection is empty
        assert!(collection.get(b"key1").await.is_none());

        collection.put(b"key1", b"123").await;
        assert_eq!(collection.get(b"key1").await, Some(b"123".to_vec()));

        // Last write wins
        collection.put(b"key1", b"456").await;
        assert_eq!(collection.get(b"key1").await, Some(b"456".to_vec()));

        assert!(collection.get(b"key2").await.is_none());
    }

    #[tokio::test]
    async fn test_collection_remove_and_clear() {
        let collection = MemoryCollection::new();

        collection.put(b"key1", b"1").await;
        collection.put(b"key2", b"2").await;

        collection.remove(b"key1").await;
        assert!(collection.get(b"key1").await.is_none());
        assert!(collection.get(b"key2").await.is_some());

        collection.clear().await;
        assert!(collection.get(b"key2").await.is_none());
    }

    #[tokio::test]
    async fn test_json_helpers() {
        let collection = MemoryCollection::new();

        put_json(&collection, "list", &vec!["a", "b"]).await.unwrap();
        let list: Option<Vec<String>> = get_json(&collection, "list").await.unwrap();
        assert_eq!(list, Some(vec!["a".to_string(), "b".to_string()]));

        let missing: Option<Vec<String>> = get_json(&collection, "missing").await.unwrap();
        assert!(missing.is_none());

        collection.put(b"broken", b"{not json").await;
        let broken: anyhow::Result<Option<Vec<String>>> = get_json(&collection, "broken").await;
        assert!(broken.is_err());
    }
}
