//! Descriptive metadata of projects and documents, kept for the process lifetime.

use serde::{Deserialize, Serialize};

use super::key::{ResourceKey, VersionToken};
use super::memory::MemoryStore;
use super::store::VersionedStore;

/// Descriptive metadata attached to board messages and tool output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct DocumentMetadata {
    pub project_id: Option<String>,
    pub project_name: Option<String>,
    pub folder_name: Option<String>,
    pub doc_id: Option<String>,
    pub doc_name: Option<String>,
    pub doc_type: Option<String>,
    pub doc_version: Option<String>,
    pub doc_updated_at: Option<String>,
    pub doc_url: Option<String>,
}

/// Version-gated metadata cache.
///
/// Keys narrowed to a document are validated against the document's version
/// token; project-only keys use [`VersionToken::unversioned`] and stay valid
/// until the process exits.
#[derive(Debug, Default)]
pub struct MetadataCache {
    store: MemoryStore<DocumentMetadata>,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(project_id: &str, document_id: Option<&str>) -> ResourceKey {
        ResourceKey::metadata(project_id, document_id)
    }

    pub async fn get(&self, key: &ResourceKey, version: Option<&VersionToken>) -> Option<DocumentMetadata> {
        let unversioned = VersionToken::unversioned();
        self.store.lookup(key, version.unwrap_or(&unversioned)).await.hit()
    }

    pub async fn put(&self, key: &ResourceKey, metadata: DocumentMetadata, version: Option<&VersionToken>) {
        let unversioned = VersionToken::unversioned();
        self.store.insert(key, version.unwrap_or(&unversioned), metadata).await;
    }

    pub async fn invalidate(&self, key: &ResourceKey) {
        self.store.evict(key).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(name: &str) -> DocumentMetadata {
        DocumentMetadata { doc_name: Some(name.into()), ..Default::default() }
    }

    #[tokio::test]
    async fn test_versioned_entry_evicted_on_change() {
        let cache = MetadataCache::new();
        let key = MetadataCache::key("p1", Some("d1"));
        let v1 = VersionToken::new("v1");
        let v2 = VersionToken::new("v2");

        cache.put(&key, metadata("PRD"), Some(&v1)).await;
        assert_eq!(cache.get(&key, Some(&v1)).await, Some(metadata("PRD")));
        assert_eq!(cache.get(&key, Some(&v2)).await, None);
        assert_eq!(cache.get(&key, Some(&v1)).await, None);
    }

    #[tokio::test]
    async fn test_project_entry_is_unversioned() {
        let cache = MetadataCache::new();
        let key = MetadataCache::key("p1", None);

        cache.put(&key, metadata("project"), None).await;
        assert_eq!(cache.get(&key, None).await, Some(metadata("project")));
        assert_eq!(cache.get(&key, None).await, Some(metadata("project")));
    }

    #[tokio::test]
    async fn test_invalidate() {
        let cache = MetadataCache::new();
        let key = MetadataCache::key("p1", Some("d1"));
        let v1 = VersionToken::new("v1");

        cache.put(&key, metadata("PRD"), Some(&v1)).await;
        cache.invalidate(&key).await;
        assert_eq!(cache.get(&key, Some(&v1)).await, None);
    }
}
