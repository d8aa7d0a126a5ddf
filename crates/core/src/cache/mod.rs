//! Version-gated caches for Lanhu documents.
//!
//! Every cached unit is identified by a [`ResourceKey`] and is valid only for
//! the [`VersionToken`] it was stored with. There is no time-based expiry:
//! entries live until the remote reports a different version.
//!
//! - [`DocumentSnapshotManager`]: page markup and assets on disk
//! - [`RenderCache`]: screenshots and extracted text per page
//! - [`MetadataCache`]: descriptive project/document metadata in memory

pub mod hash;
pub mod key;
pub mod manifest;
pub mod memory;
pub mod metadata;
pub mod render;
pub mod snapshot;
pub mod store;

pub use crate::Error;

pub use key::{CacheScope, ResourceKey, VersionToken};
pub use manifest::{AssetKind, AssetManifest, AssetRef, DocumentManifest, PageEntry};
pub use memory::MemoryStore;
pub use metadata::{DocumentMetadata, MetadataCache};
pub use render::{
    PageArtifact, PageRender, RenderBackend, RenderCache, RenderCacheMeta, RenderOutcome, RenderSession, RenderedPage,
};
pub use snapshot::{
    DocumentSnapshotManager, FetchFailure, ResourceSource, SHARED_SCRIPT, SnapshotMeta, SnapshotState, SnapshotStatus,
    UpdateReason,
};
pub use store::{EntryStamp, FileStore, Lookup, VersionedStore};
