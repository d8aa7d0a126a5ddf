//! lanhu_say_list tool implementation.
//!
//! Lists board messages newest first, grouped by project and document, with
//! the content left out; lanhu_say_detail returns full messages.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use lanhu_core::Error;
use lanhu_core::board::{MessageFilter, MessageGroup, group_messages};

use super::{parse_message_type, project_url, record_activity};
use crate::state::AppState;
use crate::tools::json_result;

/// Parameters for the lanhu_say_list tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SayListParams {
    /// Lanhu URL containing tid and pid. Omit or pass "all" to list every project.
    pub url: Option<String>,

    /// Only messages of this type.
    pub filter_type: Option<String>,

    /// Regular expression matched against summary and content.
    pub search_regex: Option<String>,

    /// Maximum number of messages.
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SayListOutput {
    /// Project listed, or absent for all projects.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    pub total_messages: usize,
    pub mentions_me_count: usize,
    pub groups: Vec<MessageGroup>,
}

/// Implementation of the lanhu_say_list tool.
pub async fn list_impl(state: &AppState, params: SayListParams) -> Result<CallToolResult, McpError> {
    let project_id = match params.url.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(url) if url.eq_ignore_ascii_case("all") => None,
        Some(url) => Some(project_url(url)?.project_id),
    };
    if let Some(project_id) = &project_id {
        record_activity(state, project_id).await;
    }

    let search = params
        .search_regex
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(regex::Regex::new)
        .transpose()
        .map_err(|e| Error::InvalidInput(format!("invalid search_regex: {e}")))?;

    let filter = MessageFilter {
        project_id: project_id.clone(),
        message_type: parse_message_type(params.filter_type.as_deref())?,
        search,
        limit: params.limit,
    };
    let messages = state.board.list_messages(&filter).await?;
    let groups = group_messages(&messages, &state.viewer());

    tracing::debug!(project_id = ?project_id, messages = messages.len(), groups = groups.len(), "listed board");

    json_result(&SayListOutput {
        project_id,
        total_messages: messages.len(),
        mentions_me_count: groups.iter().map(|g| g.mentions_me_count).sum(),
        groups,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::tests::offline_state;
    use crate::tools::board::say::{say_impl, tests::say};
    use crate::tools::first_text;
    use serde_json::Value;

    fn list(url: Option<&str>) -> SayListParams {
        SayListParams { url: url.map(String::from), ..Default::default() }
    }

    #[tokio::test]
    async fn test_list_groups_and_counts_mentions() {
        let dir = tempfile::tempdir().unwrap();
        let state = offline_state(dir.path()).await;
        say_impl(&state, say("first", &["bob"], None)).await.unwrap();
        say_impl(&state, say("second", &["all"], Some("urgent"))).await.unwrap();

        let result = list_impl(&state, list(Some("tid=t1&pid=p1"))).await.unwrap();
        let output: Value = serde_json::from_str(&first_text(&result)).unwrap();

        assert_eq!(output["project_id"], "p1");
        assert_eq!(output["total_messages"], 2);
        assert_eq!(output["mentions_me_count"], 1);
        let group = &output["groups"][0];
        assert_eq!(group["doc_id"], "d1");
        assert_eq!(group["messages"][0]["summary"], "second");
        assert_eq!(group["messages"][0]["mentions_me"], true);
        assert_eq!(group["messages"][0]["is_mine"], true);
        assert!(group["messages"][0].get("content").is_none());
    }

    #[tokio::test]
    async fn test_list_filters() {
        let dir = tempfile::tempdir().unwrap();
        let state = offline_state(dir.path()).await;
        say_impl(&state, say("login bug", &[], Some("urgent"))).await.unwrap();
        say_impl(&state, say("colors", &[], None)).await.unwrap();

        let params = SayListParams { filter_type: Some("urgent".into()), ..list(None) };
        let output: Value = serde_json::from_str(&first_text(&list_impl(&state, params).await.unwrap())).unwrap();
        assert_eq!(output["total_messages"], 1);
        assert!(output.get("project_id").is_none());

        let params = SayListParams { search_regex: Some("^col".into()), ..list(Some("all")) };
        let output: Value = serde_json::from_str(&first_text(&list_impl(&state, params).await.unwrap())).unwrap();
        assert_eq!(output["groups"][0]["messages"][0]["summary"], "colors");

        let params = SayListParams { search_regex: Some("(".into()), ..list(None) };
        assert_eq!(list_impl(&state, params).await.unwrap_err().code.0, -32602);
    }
}
