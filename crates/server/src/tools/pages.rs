//! lanhu_get_pages tool implementation.
//!
//! Lists the navigable pages of a prototype document from its sitemap.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use lanhu_client::api::{PageInfo, PageListStats, extract_pages, response::format_time};
use lanhu_core::DocumentMetadata;

use super::json_result;
use crate::state::AppState;

/// Parameters for the lanhu_get_pages tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GetPagesParams {
    /// Lanhu document URL containing tid, pid and docId.
    pub url: String,
}

/// Output from the lanhu_get_pages tool.
#[derive(Debug, Clone, Serialize)]
pub struct GetPagesOutput {
    pub document_id: String,
    pub document_name: String,
    pub document_type: String,
    /// Version token of the latest version.
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_info: Option<String>,
    pub total_versions: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_time: Option<String>,
    #[serde(flatten)]
    pub stats: PageListStats,
    pub pages: Vec<PageInfo>,
    pub metadata: DocumentMetadata,
}

/// Implementation of the lanhu_get_pages tool.
pub async fn get_pages_impl(state: &AppState, params: GetPagesParams) -> Result<CallToolResult, McpError> {
    let document = state.remote_document(&params.url).await?;
    let manifest = state.manifest(&document).await?;
    let pages = extract_pages(&manifest.sitemap.root_nodes);
    let metadata = state.document_metadata(&document).await;

    tracing::info!(doc_id = %document.doc_id, pages = pages.len(), "listed document pages");

    let info = &document.info;
    let output = GetPagesOutput {
        document_id: document.doc_id.clone(),
        document_name: info.name.clone().unwrap_or_else(|| "Unknown".into()),
        document_type: info.doc_type.clone().unwrap_or_else(|| "axure".into()),
        version: document.version.to_string(),
        version_info: info.latest().and_then(|v| v.version_info.clone()),
        total_versions: info.versions.len(),
        create_time: info.create_time.as_deref().map(format_time),
        update_time: info.update_time.as_deref().map(format_time),
        stats: PageListStats::from_pages(&pages),
        pages,
        metadata,
    };

    json_result(&output)
}
