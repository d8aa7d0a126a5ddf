//! lanhu_say_delete tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use lanhu_core::Error;

use super::{project_url, record_activity};
use crate::state::AppState;
use crate::tools::json_result;

/// Parameters for the lanhu_say_delete tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SayDeleteParams {
    /// Lanhu URL containing tid and pid.
    pub url: String,

    pub message_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SayDeleteOutput {
    pub project_id: String,
    pub deleted_id: i64,
    pub deleted_by_name: String,
    pub deleted_by_role: String,
}

/// Implementation of the lanhu_say_delete tool.
pub async fn delete_impl(state: &AppState, params: SayDeleteParams) -> Result<CallToolResult, McpError> {
    let url = project_url(&params.url)?;
    record_activity(state, &url.project_id).await;

    if !state.board.delete_message(&url.project_id, params.message_id).await? {
        return Err(Error::NotFound(format!("message {} in project {}", params.message_id, url.project_id)).into());
    }

    let author = state.author();
    json_result(&SayDeleteOutput {
        project_id: url.project_id,
        deleted_id: params.message_id,
        deleted_by_name: author.name,
        deleted_by_role: author.role,
    })
}
