//! Zone persistence
//!
//! The monitor only needs load-at-start and save-on-mutation; the format
//! belongs to this module. The whole zone set is kept as one JSON array
//! under a single key, so a saved empty set stays distinguishable from a
//! store that has never been written.

use async_trait::async_trait;
use thiserror::Error;

use crate::types::Zone;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage backend error: {0}")]
    Backend(#[from] sled::Error),
    #[error("failed to encode zone record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Durable store for the monitored zone set.
#[async_trait]
pub trait ZoneStore: Send + Sync {
    /// Load the persisted zone set. `None` means nothing has ever been
    /// saved, which is distinct from an empty set.
    async fn load(&self) -> Result<Option<Vec<Zone>>, StorageError>;

    /// Replace the persisted zone set with the given one.
    async fn save(&self, zones: &[Zone]) -> Result<(), StorageError>;
}

const ZONE_TREE: &str = "zones";
const ZONE_SET_KEY: &[u8] = b"zone_set";

/// Sled-backed zone store.
pub struct SledZoneStore {
    tree: sled::Tree,
}

impl SledZoneStore {
    pub fn open(db: &sled::Db) -> Result<Self, StorageError> {
        Ok(Self {
            tree: db.open_tree(ZONE_TREE)?,
        })
    }
}

#[async_trait]
impl ZoneStore for SledZoneStore {
    async fn load(&self) -> Result<Option<Vec<Zone>>, StorageError> {
        match self.tree.get(ZONE_SET_KEY)? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, zones: &[Zone]) -> Result<(), StorageError> {
        let encoded = serde_json::to_vec(zones)?;
        self.tree.insert(ZONE_SET_KEY, encoded)?;
        self.tree.flush_async().await?;
        Ok(())
    }
}

/// In-memory store for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryZoneStore {
    zones: std::sync::Mutex<Option<Vec<Zone>>>,
}

#[async_trait]
impl ZoneStore for MemoryZoneStore {
    async fn load(&self) -> Result<Option<Vec<Zone>>, StorageError> {
        Ok(self
            .zones
            .lock()
            .map_err(|_| sled::Error::ReportableBug("zone store mutex poisoned".into()))?
            .clone())
    }

    async fn save(&self, zones: &[Zone]) -> Result<(), StorageError> {
        *self
            .zones
            .lock()
            .map_err(|_| sled::Error::ReportableBug("zone store mutex poisoned".into()))? =
            Some(zones.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_zones;

    #[tokio::test]
    async fn sled_store_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let db = sled::open(dir.path()).unwrap();
        let store = SledZoneStore::open(&db).unwrap();

        assert!(store.load().await.unwrap().is_none());

        let zones = default_zones();
        store.save(&zones).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(zones));
    }

    #[tokio::test]
    async fn sled_empty_save_is_distinct_from_never_saved() {
        let dir = tempfile::tempdir().unwrap();
        let db = sled::open(dir.path()).unwrap();
        let store = SledZoneStore::open(&db).unwrap();

        assert!(store.load().await.unwrap().is_none());
        // Removing the last zone must survive a restart; defaults come
        // back only when nothing was ever saved
        store.save(&default_zones()).await.unwrap();
        store.save(&[]).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(vec![]));
    }

    #[tokio::test]
    async fn empty_save_is_distinct_from_never_saved() {
        let store = MemoryZoneStore::default();
        assert!(store.load().await.unwrap().is_none());
        store.save(&[]).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(vec![]));
    }
}
