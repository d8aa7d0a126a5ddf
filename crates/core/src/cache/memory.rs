//! Process-lifetime store for the metadata scope.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::key::{ResourceKey, VersionToken};
use super::store::{Lookup, VersionedStore};
use crate::Error;

/// In-memory [`VersionedStore`]. Entries are never expired by age and the map
/// is unbounded across distinct keys.
#[derive(Debug)]
pub struct MemoryStore<T> {
    entries: RwLock<HashMap<ResourceKey, (VersionToken, T)>>,
}

impl<T> Default for MemoryStore<T> {
    fn default() -> Self {
        Self { entries: RwLock::new(HashMap::new()) }
    }
}

impl<T> MemoryStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Records `payload` under `key` at `version`, replacing any prior entry.
    pub async fn insert(&self, key: &ResourceKey, version: &VersionToken, payload: T) {
        self.entries.write().await.insert(key.clone(), (version.clone(), payload));
    }
}

#[async_trait]
impl<T> VersionedStore<T> for MemoryStore<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn lookup(&self, key: &ResourceKey, version: &VersionToken) -> Lookup<T> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Lookup::Miss,
                Some((recorded, payload)) if recorded == version => return Lookup::Hit(payload.clone()),
                Some(_) => {}
            }
        }

        // Re-check under the write lock: another task may have refreshed the entry.
        let mut entries = self.entries.write().await;
        match entries.get(key) {
            Some((recorded, payload)) if recorded == version => Lookup::Hit(payload.clone()),
            Some((recorded, _)) => {
                let recorded = recorded.clone();
                entries.remove(key);
                tracing::debug!(key = %key, recorded = %recorded, current = %version, "evicted stale metadata");
                Lookup::Stale(recorded)
            }
            None => Lookup::Miss,
        }
    }

    async fn store(&self, key: &ResourceKey, version: &VersionToken, payload: T) -> Result<(), Error> {
        self.insert(key, version, payload).await;
        Ok(())
    }

    async fn evict(&self, key: &ResourceKey) {
        self.entries.write().await.remove(key);
    }
}
