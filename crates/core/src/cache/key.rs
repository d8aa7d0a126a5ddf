//! Cache identities: version tokens and scoped resource keys.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of one content generation of a remote document.
///
/// Equality is the only meaningful operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(transparent)]
pub struct VersionToken(String);

impl VersionToken {
    const UNVERSIONED: &'static str = "~unversioned";

    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Token used for entries that have no remote version (project-level metadata).
    pub fn unversioned() -> Self {
        Self(Self::UNVERSIONED.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight characters, for display in tool output.
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(8) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VersionToken {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Namespace of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheScope {
    DocumentSnapshot,
    RenderedPage,
    Metadata,
}

impl CacheScope {
    /// Subdirectory holding entries of this scope under the cache root.
    pub fn dir_name(self) -> &'static str {
        match self {
            CacheScope::DocumentSnapshot => "snapshots",
            CacheScope::RenderedPage => "renders",
            CacheScope::Metadata => "metadata",
        }
    }

    /// Name of the metadata file written inside an entry directory.
    pub fn meta_file(self) -> &'static str {
        match self {
            CacheScope::DocumentSnapshot => ".snapshot_cache.json",
            CacheScope::RenderedPage => ".render_cache.json",
            CacheScope::Metadata => ".metadata_cache.json",
        }
    }
}

/// Composite identity of a cacheable unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKey {
    pub scope: CacheScope,
    pub id: String,
}

impl ResourceKey {
    pub fn new(scope: CacheScope, id: impl Into<String>) -> Self {
        Self { scope, id: id.into() }
    }

    pub fn snapshot(document_id: &str) -> Self {
        Self::new(CacheScope::DocumentSnapshot, document_id)
    }

    pub fn renders(document_id: &str) -> Self {
        Self::new(CacheScope::RenderedPage, document_id)
    }

    /// Metadata key for a project, optionally narrowed to one document.
    pub fn metadata(project_id: &str, document_id: Option<&str>) -> Self {
        match document_id {
            Some(doc) => Self::new(CacheScope::Metadata, format!("{project_id}_{doc}")),
            None => Self::new(CacheScope::Metadata, project_id),
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scope.dir_name(), self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_id_differs_across_scopes() {
        let a = ResourceKey::snapshot("doc-1");
        let b = ResourceKey::renders("doc-1");
        assert_ne!(a, b);
        assert_ne!(a.to_string(), b.to_string());
    }

    #[test]
    fn test_metadata_key_with_and_without_document() {
        assert_eq!(ResourceKey::metadata("p1", Some("d1")).id, "p1_d1");
        assert_eq!(ResourceKey::metadata("p1", None).id, "p1");
    }

    #[test]
    fn test_version_short() {
        assert_eq!(VersionToken::new("0123456789abcdef").short(), "01234567");
        assert_eq!(VersionToken::new("abc").short(), "abc");
    }

    #[test]
    fn test_version_serializes_as_plain_string() {
        let json = serde_json::to_string(&VersionToken::new("v1")).unwrap();
        assert_eq!(json, "\"v1\"");
    }
}
