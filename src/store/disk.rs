use crate::core::cache::KeyValueCollection;
use anyhow::Result;
use async_trait::async_trait;
use fjall::{Keyspace, PartitionHandle, PersistMode};
use std::sync::Arc;
use tracing::debug;

/// Collection stored in a fjall partition.
pub struct DiskCollection {
    keyspace: Arc<Keyspace>,
    partition: PartitionHandle,
}

impl DiskCollection {
    pub fn new(keyspace: Arc<Keyspace>, partition: PartitionHandle) -> Self {
        Self {
            keyspace,
            partition,
        }
    }

    fn flush(&self) -> Result<()> {
        self.keyspace.persist(PersistMode::Buffer)?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueCollection for DiskCollection {
    async fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        match self.partition.get(key) {
            Ok(Some(value)) => {
                debug!("Store HIT for key: {}", String::from_utf8_lossy(key));
                Some(value.to_vec())
            }
            Ok(None) => {
                debug!("Store MISS for key: {}", String::from_utf8_lossy(key));
                None
            }
            Err(e) => {
                debug!("DiskCollection get error: {}", e);
                None
            }
        }
    }

    async fn put(&self, key: &[u8], value: &[u8]) {
        let res: Result<()> = (|| {
            self.partition.insert(key, value)?;
            self.flush()?;
            debug!("Store PUT for key: {}", String::from_utf8_lossy(key));
            Ok(())
        })();
        if let Err(e) = res {
            debug!("DiskCollection put error: {}", e);
        }
    }

    async fn remove(&self, key: &[u8]) {
        let res: Result<()> = (|| {
            self.partition.remove(key)?;
            self.flush()
        })();
        if let Err(e) = res {
            debug!("DiskCollection remove error: {}", e);
        }
    }

    async fn clear(&self) {
        let res: Result<()> = (|| {
            let keys = self
                .partition
                .keys()
                .collect::<std::result::Result<Vec<_>, _>>()?;
            for key in keys {
                self.partition.remove(key)?;
            }
            self.flush()
        })();
        if let Err(e) = res {
            debug!("DiskCollection clear error: {}", e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fjall::PartitionCreateOptions;
    use tempfile::tempdir;

    fn open_collection(path: &std::path::Path) -> DiskCollection {
        let keyspace = Arc::new(fjall::Config::new(path).open().unwrap());
        let partition = keyspace
            .open_partition("test", PartitionCreateOptions::default())
            .unwrap();
        DiskCollection::new(keyspace, partition)
    }

    #[tokio::test]
    async fn test_disk_collection_get_put() {
        let dir = tempdir().unwrap();
        let collection = open_collection(dir.path());

        assert!(collection.get(b"key1").await.is_none());

        collection.put(b"key1", b"123").await;
        assert_eq!(collection.get(b"key1").await, Some(b"123".to_vec()));
        assert!(collection.get(b"key2").await.is_none());
    }

    #[tokio::test]
    async fn test_disk_collection_remove() {
        let dir = tempdir().unwrap();
        let collection = open_collection(dir.path());

        collection.put(b"key1", b"123").await;
        collection.remove(b"key1").await;
        assert!(collection.get(b"key1").await.is_none());
    }

    #[tokio::test]
    async fn test_disk_collection_clear() {
        let dir = tempdir().unwrap();
        let collection = open_collection(dir.path());

        collection.put(b"key1", b"1").await;
        collection.put(b"key2", b"2").await;

        collection.clear().await;

        assert!(collection.get(b"key1").await.is_none());
        assert!(collection.get(b"key2").await.is_none());
    }
}
