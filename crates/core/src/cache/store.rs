//! Version-gated cache stores.
//!
//! A store answers one question: is the entry recorded for a key still valid
//! for the version the remote reports right now? There is no TTL. Any version
//! mismatch evicts the entry before the lookup returns, so stale content can
//! never be served and version churn does not accumulate storage.
//!
//! [`FileStore`] persists one JSON metadata file per entry directory and is
//! used for document snapshots and render artifacts. Storage failures on the
//! read path are logged and reported as [`Lookup::Miss`]: the caller redoes
//! the work instead of failing or serving stale data.

use async_trait::async_trait;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use super::hash::entry_dir_name;
use super::key::{ResourceKey, VersionToken};
use crate::Error;

/// Result of a version-gated lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    /// Entry recorded for exactly the requested version.
    Hit(T),
    /// Entry existed for another version and has been evicted.
    Stale(VersionToken),
    /// Nothing usable was recorded.
    Miss,
}

impl<T> Lookup<T> {
    pub fn is_hit(&self) -> bool {
        matches!(self, Lookup::Hit(_))
    }

    pub fn hit(self) -> Option<T> {
        match self {
            Lookup::Hit(payload) => Some(payload),
            _ => None,
        }
    }
}

/// Contract shared by every cache scope.
#[async_trait]
pub trait VersionedStore<T: Send + 'static>: Send + Sync {
    /// Return the payload if it was stored for `version`; evict it otherwise.
    async fn lookup(&self, key: &ResourceKey, version: &VersionToken) -> Lookup<T>;

    /// Record `payload` for `version`, replacing whatever was there.
    async fn store(&self, key: &ResourceKey, version: &VersionToken, payload: T) -> Result<(), Error>;

    /// Drop the entry regardless of version.
    async fn evict(&self, key: &ResourceKey);
}

/// On-disk layout of an entry's metadata file.
#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    version: VersionToken,
    stored_at: String,
    #[serde(flatten)]
    payload: T,
}

/// What a [`FileStore`] knows about an entry without checking versions.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct EntryStamp {
    pub version: VersionToken,
    pub stored_at: String,
}

/// Durable store: `<root>/<scope>/<entry>/<meta file>`.
///
/// The entry directory also holds whatever files the owning component writes
/// (page markup, screenshots); eviction removes the whole directory.
#[derive(Debug, Clone)]
pub struct FileStore<T> {
    root: PathBuf,
    _payload: PhantomData<fn() -> T>,
}

impl<T> FileStore<T> {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), _payload: PhantomData }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory owned by the entry for `key`.
    pub fn entry_dir(&self, key: &ResourceKey) -> PathBuf {
        self.root.join(key.scope.dir_name()).join(entry_dir_name(&key.id))
    }

    fn meta_path(&self, key: &ResourceKey) -> PathBuf {
        self.entry_dir(key).join(key.scope.meta_file())
    }

    /// Read the recorded version without validating it against the remote.
    pub async fn stamp(&self, key: &ResourceKey) -> Option<EntryStamp> {
        let raw = tokio::fs::read(self.meta_path(key)).await.ok()?;
        serde_json::from_slice(&raw).ok()
    }
}

#[async_trait]
impl<T> VersionedStore<T> for FileStore<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn lookup(&self, key: &ResourceKey, version: &VersionToken) -> Lookup<T> {
        let path = self.meta_path(key);
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Lookup::Miss,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "unreadable cache metadata, treating as miss");
                return Lookup::Miss;
            }
        };

        let envelope: Envelope<T> = match serde_json::from_slice(&raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "corrupt cache metadata, evicting");
                self.evict(key).await;
                return Lookup::Miss;
            }
        };

        if envelope.version == *version {
            tracing::debug!(key = %key, version = %version, "cache hit");
            Lookup::Hit(envelope.payload)
        } else {
            tracing::debug!(key = %key, recorded = %envelope.version, current = %version, "stale cache entry, evicting");
            self.evict(key).await;
            Lookup::Stale(envelope.version)
        }
    }

    async fn store(&self, key: &ResourceKey, version: &VersionToken, payload: T) -> Result<(), Error> {
        let dir = self.entry_dir(key);
        tokio::fs::create_dir_all(&dir).await?;

        let envelope = Envelope { version: version.clone(), stored_at: chrono::Utc::now().to_rfc3339(), payload };
        let json = serde_json::to_vec_pretty(&envelope).map_err(|e| Error::Cache(e.to_string()))?;

        let path = self.meta_path(key);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn evict(&self, key: &ResourceKey) {
        match tokio::fs::remove_dir_all(self.entry_dir(key)).await {
            Ok(()) => tracing::debug!(key = %key, "evicted cache entry"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(key = %key, error = %e, "failed to evict cache entry"),
        }
    }
}
