//! lanhu_say tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use lanhu_core::Error;
use lanhu_core::board::{Message, NewMessage};

use super::{parse_message_type, project_url, record_activity, validate_mentions};
use crate::state::AppState;
use crate::tools::json_result;

/// Parameters for the lanhu_say tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SayParams {
    /// Lanhu URL containing tid and pid; docId attaches the message to a document.
    pub url: String,

    /// One-line summary shown in listings.
    pub summary: String,

    /// Full message body.
    pub content: String,

    /// Names to notify, or "all".
    #[serde(default)]
    pub mentions: Vec<String>,

    /// normal (default), task, question, urgent or knowledge.
    pub message_type: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SayOutput {
    pub message: Message,
    /// Whether a webhook notice was dispatched.
    pub notified: bool,
}

/// Implementation of the lanhu_say tool.
pub async fn say_impl(state: &AppState, params: SayParams) -> Result<CallToolResult, McpError> {
    if params.summary.trim().is_empty() || params.content.trim().is_empty() {
        return Err(Error::InvalidInput("summary and content cannot be empty".into()).into());
    }
    let message_type = parse_message_type(params.message_type.as_deref())?.unwrap_or_default();
    validate_mentions(&state.config, &params.mentions)?;

    let url = project_url(&params.url)?;
    record_activity(state, &url.project_id).await;
    let document = state.metadata_for_url(&url).await;

    let message = state
        .board
        .post_message(
            &url.project_id,
            NewMessage {
                summary: params.summary,
                content: params.content,
                mentions: params.mentions,
                message_type,
                author: state.author(),
                document,
            },
        )
        .await?;

    let notified = state.notifier.as_ref().is_some_and(|n| n.notify(&message));
    json_result(&SayOutput { message, notified })
}
