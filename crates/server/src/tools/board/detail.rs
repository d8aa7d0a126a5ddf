//! lanhu_say_detail tool implementation.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use lanhu_core::Error;
use lanhu_core::board::Message;

use super::{project_url, record_activity};
use crate::state::AppState;
use crate::tools::json_result;

/// One message id or several.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum MessageIds {
    One(i64),
    Many(Vec<i64>),
}

impl MessageIds {
    fn to_vec(&self) -> Vec<i64> {
        match self {
            MessageIds::One(id) => vec![*id],
            MessageIds::Many(ids) => ids.clone(),
        }
    }
}

/// Parameters for the lanhu_say_detail tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SayDetailParams {
    /// Message id or list of ids.
    pub message_ids: MessageIds,

    /// Lanhu URL containing tid and pid. Either this or project_id is required.
    pub url: Option<String>,

    /// Project id, as shown in lanhu_say_list output.
    pub project_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SayDetailOutput {
    pub project_id: String,
    pub messages: Vec<Message>,
    pub not_found: Vec<i64>,
}

/// Implementation of the lanhu_say_detail tool.
pub async fn detail_impl(state: &AppState, params: SayDetailParams) -> Result<CallToolResult, McpError> {
    let project_id = match (params.url.as_deref(), params.project_id) {
        (Some(url), _) if !url.trim().is_empty() => project_url(url)?.project_id,
        (_, Some(project_id)) if !project_id.trim().is_empty() => project_id,
        _ => return Err(Error::InvalidInput("either url or project_id is required".into()).into()),
    };
    let ids = params.message_ids.to_vec();
    if ids.is_empty() {
        return Err(Error::InvalidInput("message_ids cannot be empty".into()).into());
    }
    record_activity(state, &project_id).await;

    let mut messages = Vec::with_capacity(ids.len());
    let mut not_found = Vec::new();
    for id in ids {
        match state.board.get_message(&project_id, id).await? {
            Some(message) => messages.push(message),
            None => not_found.push(id),
        }
    }

    json_result(&SayDetailOutput { project_id, messages, not_found })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::tests::offline_state;
    use crate::tools::board::say::{say_impl, tests::say};
    use crate::tools::first_text;
    use serde_json::Value;

    #[tokio::test]
    async fn test_detail_returns_full_messages_and_missing_ids() {
        let dir = tempfile::tempdir().unwrap();
        let state = offline_state(dir.path()).await;
        say_impl(&state, say("first", &[], None)).await.unwrap();

        let params =
            SayDetailParams { message_ids: MessageIds::Many(vec![1, 7]), url: None, project_id: Some("p1".into()) };
        let output: Value = serde_json::from_str(&first_text(&detail_impl(&state, params).await.unwrap())).unwrap();

        assert_eq!(output["messages"][0]["content"], "first body");
        assert_eq!(output["not_found"], serde_json::json!([7]));
    }

    #[tokio::test]
    async fn test_detail_requires_a_project() {
        let dir = tempfile::tempdir().unwrap();
        let state = offline_state(dir.path()).await;

        let params = SayDetailParams { message_ids: MessageIds::One(1), url: None, project_id: None };
        assert_eq!(detail_impl(&state, params).await.unwrap_err().code.0, -32602);
    }

    #[test]
    fn test_message_ids_accepts_number_or_list() {
        let params: SayDetailParams = serde_json::from_str(r#"{"message_ids": 3, "project_id": "p"}"#).unwrap();
        assert_eq!(params.message_ids, MessageIds::One(3));
        let params: SayDetailParams = serde_json::from_str(r#"{"message_ids": [1, 2], "url": "u"}"#).unwrap();
        assert_eq!(params.message_ids.to_vec(), vec![1, 2]);
    }
}
