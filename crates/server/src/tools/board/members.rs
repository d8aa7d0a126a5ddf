//! lanhu_get_members tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use serde::{Deserialize, Serialize};

use lanhu_core::board::Collaborator;

use super::{UrlParams, project_url, record_activity};
use crate::state::AppState;
use crate::tools::json_result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembersOutput {
    pub project_id: String,
    pub total: usize,
    pub collaborators: Vec<Collaborator>,
}

/// Implementation of the lanhu_get_members tool.
pub async fn members_impl(state: &AppState, params: UrlParams) -> Result<CallToolResult, McpError> {
    let url = project_url(&params.url)?;
    record_activity(state, &url.project_id).await;

    let collaborators = state.board.collaborators(&url.project_id).await?;
    json_result(&MembersOutput { project_id: url.project_id, total: collaborators.len(), collaborators })
}
