pub mod disk;
pub mod memory;

use crate::core::cache::{KeyValueCollection, Store};
use disk::DiskCollection;
use fjall::{Keyspace, PartitionCreateOptions};
use memory::MemoryCollection;
use std::{
    collections::HashMap,
    path::Path,
    sync::{Arc, RwLock},
};
use tracing::{debug, warn};

/// Collection holding the application's transient state, the counterpart of
/// browser local storage.
pub const LOCAL_STORAGE: &str = "local_storage";

/// A thread-safe key-value store that can hold multiple collections.
pub struct KeyValueStore {
    collections: RwLock<HashMap<String, Arc<dyn KeyValueCollection>>>,
    keyspace: Option<Arc<Keyspace>>,
}

impl KeyValueStore {
    /// Opens a disk-backed store under `data_path`. Falls back to memory-only
    /// collections when the keyspace cannot be opened.
    pub fn open(data_path: &Path) -> Self {
        let store_dir = data_path.join("store");
        let keyspace = match fjall::Config::new(&store_dir).open() {
            Ok(keyspace) => {
                debug!("Opened store at {}", store_dir.display());
                Some(Arc::new(keyspace))
            }
            Err(e) => {
                warn!(
                    "Failed to open store at {}: {}. Falling back to memory",
                    store_dir.display(),
                    e
                );
                None
            }
        };

        Self {
            collections: RwLock::new(HashMap::new()),
            keyspace,
        }
    }

    pub fn in_memory() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            keyspace: None,
        }
    }

    pub fn is_persistent(&self) -> bool {
        self.keyspace.is_some()
    }

    fn create_collection(&self, name: &str) -> Arc<dyn KeyValueCollection> {
        let disk = self.keyspace.as_ref().and_then(|ks| {
            match ks.open_partition(name, PartitionCreateOptions::default()) {
                Ok(partition) => Some(Arc::new(DiskCollection::new(Arc::clone(ks), partition))
                    as Arc<dyn KeyValueCollection>),
                Err(e) => {
                    warn!("Failed to open partition {}: {}", name, e);
                    None
                }
            }
        });
        disk.unwrap_or_else(|| Arc::new(MemoryCollection::new()) as Arc<dyn KeyValueCollection>)
    }
}

impl Store for KeyValueStore {
    fn get_collection(&self, name: &str) -> Arc<dyn KeyValueCollection> {
        if let Some(collection) = self
            .collections
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(name)
        {
            return Arc::clone(collection);
        }

        let mut collections = self
            .collections
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let collection = collections
            .entry(name.to_string())
            .or_insert_with(|| self.create_collection(name));
        Arc::clone(collection)
    }

    fn remove_collection(&self, name: &str) -> bool {
        let mut collections = self
            .collections
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        collections.remove(name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_disk_backed_collection() {
        let dir = tempdir().unwrap();
        let store = KeyValueStore::open(dir.path());
        assert!(store.is_persistent());

        let collection = store.get_collection(LOCAL_STORAGE);
        collection.put(b"onramp:form", b"{}").await;
        assert_eq!(collection.get(b"onramp:form").await, Some(b"{}".to_vec()));
    }

    #[tokio::test]
    async fn test_collections_are_shared_by_name() {
        let store = KeyValueStore::in_memory();
        assert!(!store.is_persistent());

        let first = store.get_collection(LOCAL_STORAGE);
        first.put(b"walletAddress", b"GABC").await;

        let second = store.get_collection(LOCAL_STORAGE);
        assert_eq!(second.get(b"walletAddress").await, Some(b"GABC".to_vec()));

        let other = store.get_collection("other");
        assert!(other.get(b"walletAddress").await.is_none());

        assert!(store.remove_collection("other"));
        assert!(!store.remove_collection("other"));
    }
}
