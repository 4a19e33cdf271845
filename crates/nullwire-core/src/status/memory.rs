//! In-memory status store.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::RwLock;

use super::{StatusStore, StatusStoreError};
use crate::telemetry::DeviceStatusRecord;

const SHARD_COUNT: usize = 16;

/// Keyed in-memory store, sharded so writes for unrelated identities do not
/// contend on one lock.
///
/// Suitable for tests and ephemeral runs; durable deployments use
/// [`SqliteStatusStore`](super::SqliteStatusStore).
pub struct MemoryStatusStore {
    shards: Vec<RwLock<HashMap<String, DeviceStatusRecord>>>,
}

impl MemoryStatusStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shards: (0..SHARD_COUNT).map(|_| RwLock::new(HashMap::new())).collect(),
        }
    }

    fn shard(&self, owner_identity: &str) -> &RwLock<HashMap<String, DeviceStatusRecord>> {
        let mut hasher = DefaultHasher::new();
        owner_identity.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % SHARD_COUNT]
    }
}

impl Default for MemoryStatusStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusStore for MemoryStatusStore {
    fn put(&self, record: &DeviceStatusRecord) -> Result<(), StatusStoreError> {
        let shard = self.shard(&record.owner_identity);
        let mut map = shard
            .write()
            .map_err(|_| StatusStoreError::storage("status store lock poisoned"))?;
        map.insert(record.owner_identity.clone(), record.clone());
        Ok(())
    }

    fn get_latest(
        &self,
        owner_identity: &str,
    ) -> Result<Option<DeviceStatusRecord>, StatusStoreError> {
        let shard = self.shard(owner_identity);
        let map = shard
            .read()
            .map_err(|_| StatusStoreError::storage("status store lock poisoned"))?;
        Ok(map.get(owner_identity).cloned())
    }
}
