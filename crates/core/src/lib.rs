//! Core types and shared functionality for mcp-lanhu.
//!
//! This crate provides:
//! - Version-gated caches for document snapshots, rendered pages and metadata
//! - The team message board backed by SQLite
//! - Unified error types
//! - Configuration structures

pub mod board;
pub mod cache;
pub mod config;
pub mod error;

pub use board::BoardDb;
pub use cache::{
    DocumentManifest, DocumentMetadata, DocumentSnapshotManager, Lookup, MetadataCache, RenderCache, ResourceKey,
    SnapshotState, SnapshotStatus, VersionToken,
};
pub use config::AppConfig;
pub use error::Error;
