//! UI design tools: lanhu_get_designs and lanhu_get_design_slices.
//!
//! Both take a project URL without a document id.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use lanhu_client::api::{DesignSlice, DesignSummary, extract_slices};
use lanhu_core::{DocumentMetadata, Error};

use super::board::{project_url, record_activity};
use super::json_result;
use crate::state::AppState;

/// Parameters for the lanhu_get_designs tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GetDesignsParams {
    /// Lanhu project URL containing tid and pid (no docId).
    pub url: String,
}

/// Output from the lanhu_get_designs tool.
#[derive(Debug, Clone, Serialize)]
pub struct GetDesignsOutput {
    pub project_name: Option<String>,
    pub total_designs: usize,
    pub designs: Vec<DesignSummary>,
    pub metadata: DocumentMetadata,
}

/// Parameters for the lanhu_get_design_slices tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GetDesignSlicesParams {
    /// Lanhu project URL containing tid and pid (no docId).
    pub url: String,
    /// Exact design name as listed by lanhu_get_designs.
    pub design_name: String,
    /// Include fills, borders, opacity, shadows and text style (default true).
    #[serde(default)]
    pub include_metadata: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CanvasSize {
    pub width: Option<Value>,
    pub height: Option<Value>,
}

/// Output from the lanhu_get_design_slices tool.
#[derive(Debug, Clone, Serialize)]
pub struct GetDesignSlicesOutput {
    pub design_id: String,
    pub design_name: String,
    pub version: Option<String>,
    pub canvas_size: CanvasSize,
    pub total_slices: usize,
    pub slices: Vec<DesignSlice>,
    pub metadata: DocumentMetadata,
}

/// Implementation of the lanhu_get_designs tool.
pub async fn get_designs_impl(state: &AppState, params: GetDesignsParams) -> Result<CallToolResult, McpError> {
    let url = project_url(&params.url)?;
    record_activity(state, &url.project_id).await;

    let list = state.client()?.get_designs(&url.team_id, &url.project_id).await.map_err(Error::from)?;
    let metadata = state.project_metadata(&url).await;
    let designs = list.summaries();

    tracing::info!(project_id = %url.project_id, designs = designs.len(), "listed designs");

    let output = GetDesignsOutput {
        project_name: list.name.clone().or_else(|| metadata.project_name.clone()),
        total_designs: designs.len(),
        designs,
        metadata,
    };
    json_result(&output)
}

/// Implementation of the lanhu_get_design_slices tool.
pub async fn get_design_slices_impl(
    state: &AppState, params: GetDesignSlicesParams,
) -> Result<CallToolResult, McpError> {
    let url = project_url(&params.url)?;
    let design_name = params.design_name.trim();
    if design_name.is_empty() {
        return Err(Error::InvalidInput("design_name must not be empty".into()).into());
    }
    record_activity(state, &url.project_id).await;

    let client = state.client()?;
    let list = client.get_designs(&url.team_id, &url.project_id).await.map_err(Error::from)?;
    let design = list.find(design_name).ok_or_else(|| {
        Error::NotFound(format!("design '{design_name}' does not exist; available designs: {}", list.names().join(", ")))
    })?;

    let info = client.get_design_info(&url.team_id, &url.project_id, &design.id).await.map_err(Error::from)?;
    let tree = client.get_design_json(&info).await.map_err(Error::from)?;
    let slices = extract_slices(&tree, params.include_metadata.unwrap_or(true));
    let metadata = state.design_metadata(&url, design, &info).await;

    tracing::info!(design_id = %design.id, slices = slices.len(), "extracted design slices");

    let output = GetDesignSlicesOutput {
        design_id: design.id.clone(),
        design_name: info.name.clone().unwrap_or_else(|| design.name.clone()),
        version: info.latest().and_then(|v| v.version_info.clone()),
        canvas_size: CanvasSize { width: info.width.clone(), height: info.height.clone() },
        total_slices: slices.len(),
        slices,
        metadata,
    };
    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::tests::offline_state;

    #[tokio::test]
    async fn test_get_designs_requires_project_url() {
        let dir = tempfile::tempdir().unwrap();
        let state = offline_state(dir.path()).await;

        let err = get_designs_impl(&state, GetDesignsParams { url: "tid=t".into() }).await.unwrap_err();
        assert_eq!(err.code.0, -32003);
    }

    #[tokio::test]
    async fn test_get_designs_without_cookie_still_records_caller() {
        let dir = tempfile::tempdir().unwrap();
        let state = offline_state(dir.path()).await;

        let err = get_designs_impl(&state, GetDesignsParams { url: "tid=t&pid=p".into() }).await.unwrap_err();
        assert_eq!(err.code.0, -32602);
        assert!(err.message.contains("cookie"));

        let members = state.board.collaborators("p").await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].name, "alice");
    }

    #[tokio::test]
    async fn test_get_design_slices_rejects_blank_name() {
        let dir = tempfile::tempdir().unwrap();
        let state = offline_state(dir.path()).await;

        let params =
            GetDesignSlicesParams { url: "tid=t&pid=p".into(), design_name: "  ".into(), include_metadata: None };
        let err = get_design_slices_impl(&state, params).await.unwrap_err();
        assert_eq!(err.code.0, -32602);
        assert!(err.message.contains("design_name"));
    }

    #[tokio::test]
    async fn test_get_design_slices_without_cookie() {
        let dir = tempfile::tempdir().unwrap();
        let state = offline_state(dir.path()).await;

        let params =
            GetDesignSlicesParams { url: "tid=t&pid=p".into(), design_name: "首页".into(), include_metadata: Some(false) };
        let err = get_design_slices_impl(&state, params).await.unwrap_err();
        assert_eq!(err.code.0, -32602);
    }

    #[test]
    fn test_slices_params_default_metadata() {
        let params: GetDesignSlicesParams =
            serde_json::from_value(serde_json::json!({"url": "tid=t&pid=p", "design_name": "首页"})).unwrap();
        assert_eq!(params.include_metadata, None);
    }
}
