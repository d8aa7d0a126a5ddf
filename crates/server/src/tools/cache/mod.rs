//! Cache-related MCP tools.
//!
//! Both tools work on a single document's on-disk snapshot and render
//! entries; the in-memory metadata cache is not exposed.

pub mod purge;
pub mod status;

pub use purge::{CachePurgeParams, purge_impl};
pub use status::{CacheStatusParams, status_impl};
