//! lanhu_cache_purge tool implementation.
//!
//! Evicts a document's snapshot and render entries so the next analysis
//! downloads and renders from scratch.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use lanhu_client::DocumentUrl;

use crate::state::AppState;
use crate::tools::json_result;

/// Parameters for the lanhu_cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeParams {
    /// Lanhu document URL containing tid, pid and docId.
    pub url: String,
}

/// Output from the lanhu_cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    pub document_id: String,
    /// Version the snapshot was recorded at, if one existed.
    pub snapshot_version: Option<String>,
    /// Version the renders were recorded at, if any existed.
    pub renders_version: Option<String>,
}

/// Implementation of the lanhu_cache_purge tool.
pub async fn purge_impl(state: &AppState, params: CachePurgeParams) -> Result<CallToolResult, McpError> {
    let url = DocumentUrl::parse(&params.url).map_err(lanhu_core::Error::from)?;
    let doc_id = url.require_doc().map_err(lanhu_core::Error::from)?.to_string();

    let snapshot_version = state.snapshots.recorded(&doc_id).await.map(|s| s.version.to_string());
    let renders_version = state.renders.recorded(&doc_id).await.map(|s| s.version.to_string());

    state.snapshots.purge(&doc_id).await;
    state.renders.purge(&doc_id).await;

    tracing::info!(doc_id = %doc_id, ?snapshot_version, ?renders_version, "purged document cache");

    json_result(&CachePurgeOutput { document_id: doc_id, snapshot_version, renders_version })
}
