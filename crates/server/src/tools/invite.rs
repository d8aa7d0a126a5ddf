//! lanhu_resolve_invite_link tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use lanhu_client::{DocumentUrl, parse_invite};

use super::json_result;
use crate::state::AppState;

/// Parameters for the lanhu_resolve_invite_link tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ResolveInviteParams {
    /// Invite or share link, e.g. https://lanhuapp.com/link/#/invite?sid=xxx
    pub invite_url: String,
}

/// Identifiers found in the resolved URL.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedParams {
    pub team_id: String,
    pub project_id: String,
    pub doc_id: Option<String>,
    pub version_id: Option<String>,
}

impl From<DocumentUrl> for ResolvedParams {
    fn from(url: DocumentUrl) -> Self {
        Self { team_id: url.team_id, project_id: url.project_id, doc_id: url.doc_id, version_id: url.version_id }
    }
}

/// Output from the lanhu_resolve_invite_link tool.
#[derive(Debug, Clone, Serialize)]
pub struct ResolveInviteOutput {
    /// `success`, or `partial_success` when the resolved URL has no project identifiers.
    pub status: &'static str,
    pub invite_url: String,
    pub resolved_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed_params: Option<ResolvedParams>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_error: Option<String>,
}

impl ResolveInviteOutput {
    fn new(invite_url: String, resolved_url: String) -> Self {
        match DocumentUrl::parse(&resolved_url) {
            Ok(url) => Self {
                status: "success",
                invite_url,
                resolved_url,
                parsed_params: Some(url.into()),
                parse_error: None,
            },
            Err(e) => Self {
                status: "partial_success",
                invite_url,
                resolved_url,
                parsed_params: None,
                parse_error: Some(e.to_string()),
            },
        }
    }
}

/// Implementation of the lanhu_resolve_invite_link tool.
pub async fn resolve_invite_impl(state: &AppState, params: ResolveInviteParams) -> Result<CallToolResult, McpError> {
    let invite_url = parse_invite(&params.invite_url).map_err(lanhu_core::Error::from)?;
    let cookie = state.config.require_cookie().ok();

    let resolved = state.browser.resolve_redirect(&invite_url, cookie, &state.config.base_url).await?;
    let output = ResolveInviteOutput::new(invite_url, resolved);

    tracing::info!(status = output.status, resolved = %output.resolved_url, "resolved invite link");
    json_result(&output)
}
