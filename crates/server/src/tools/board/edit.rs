//! lanhu_say_edit tool implementation.
//!
//! Edits are re-announced to mentioned people with an "[edited]" marker.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use lanhu_core::Error;
use lanhu_core::board::{Message, MessageEdit};

use super::{parse_message_type, project_url, record_activity, validate_mentions};
use crate::state::AppState;
use crate::tools::json_result;

/// Parameters for the lanhu_say_edit tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SayEditParams {
    /// Lanhu URL containing tid and pid.
    pub url: String,

    pub message_id: i64,

    /// New summary; unchanged when omitted.
    pub summary: Option<String>,

    /// New content; unchanged when omitted.
    pub content: Option<String>,

    /// New mention list; unchanged when omitted.
    pub mentions: Option<Vec<String>>,

    /// New message type; unchanged when omitted.
    pub message_type: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SayEditOutput {
    pub message: Message,
    pub notified: bool,
}

/// Implementation of the lanhu_say_edit tool.
pub async fn edit_impl(state: &AppState, params: SayEditParams) -> Result<CallToolResult, McpError> {
    let edit = MessageEdit {
        summary: params.summary.filter(|s| !s.trim().is_empty()),
        content: params.content.filter(|s| !s.trim().is_empty()),
        mentions: params.mentions,
        message_type: parse_message_type(params.message_type.as_deref())?,
    };
    if edit.is_empty() {
        return Err(Error::InvalidInput("provide at least one field to update".into()).into());
    }
    if let Some(mentions) = &edit.mentions {
        validate_mentions(&state.config, mentions)?;
    }

    let url = project_url(&params.url)?;
    record_activity(state, &url.project_id).await;

    let editor = state.author();
    let message = state
        .board
        .update_message(&url.project_id, params.message_id, edit, &editor)
        .await?
        .ok_or_else(|| Error::NotFound(format!("message {} in project {}", params.message_id, url.project_id)))?;

    let notified = state.notifier.as_ref().is_some_and(|n| {
        let notice = Message {
            summary: format!("[edited] {}", message.summary),
            author_name: format!("{} (edited)", editor.name),
            author_role: editor.role.clone(),
            ..message.clone()
        };
        n.notify(&notice)
    });

    json_result(&SayEditOutput { message, notified })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::tests::offline_state;
    use crate::tools::board::say::{say_impl, tests::say};
    use crate::tools::first_text;
    use serde_json::Value;

    fn edit(message_id: i64) -> SayEditParams {
        SayEditParams {
            url: "tid=t1&pid=p1".into(),
            message_id,
            summary: None,
            content: None,
            mentions: None,
            message_type: None,
        }
    }

    #[tokio::test]
    async fn test_edit_updates_given_fields_and_records_editor() {
        let dir = tempfile::tempdir().unwrap();
        let state = offline_state(dir.path()).await;
        say_impl(&state, say("draft", &[], None)).await.unwrap();

        let params = SayEditParams { summary: Some("final".into()), message_type: Some("knowledge".into()), ..edit(1) };
        let output: Value = serde_json::from_str(&first_text(&edit_impl(&state, params).await.unwrap())).unwrap();

        let message = &output["message"];
        assert_eq!(message["summary"], "final");
        assert_eq!(message["content"], "draft body");
        assert_eq!(message["message_type"], "knowledge");
        assert_eq!(message["updated_by_name"], "alice");
        assert!(message["updated_at"].is_string());
    }

    #[tokio::test]
    async fn test_edit_errors() {
        let dir = tempfile::tempdir().unwrap();
        let state = offline_state(dir.path()).await;
        say_impl(&state, say("draft", &[], None)).await.unwrap();

        assert_eq!(edit_impl(&state, edit(1)).await.unwrap_err().code.0, -32602);

        let params = SayEditParams { mentions: Some(vec!["mallory".into()]), ..edit(1) };
        assert_eq!(edit_impl(&state, params).await.unwrap_err().code.0, -32602);

        let params = SayEditParams { summary: Some("x".into()), ..edit(42) };
        assert_eq!(edit_impl(&state, params).await.unwrap_err().code.0, -32001);
    }
}
