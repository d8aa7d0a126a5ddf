//! lanhu_cache_status tool implementation.
//!
//! Reports the versions recorded for a document's snapshot and renders and,
//! when a cookie is configured, whether they match the remote's latest version.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use lanhu_client::DocumentUrl;
use lanhu_core::cache::EntryStamp;

use crate::state::AppState;
use crate::tools::json_result;

/// Parameters for the lanhu_cache_status tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheStatusParams {
    /// Lanhu document URL containing tid, pid and docId.
    pub url: String,
}

/// One cache entry as seen from disk.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EntryStatus {
    /// Recorded version and store time; absent when nothing is cached.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recorded: Option<EntryStamp>,
    /// Whether the recorded version equals the remote's latest. Unknown
    /// without a remote version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<bool>,
    pub dir: String,
}

/// Output from the lanhu_cache_status tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheStatusOutput {
    pub document_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_error: Option<String>,
    pub snapshot: EntryStatus,
    pub renders: EntryStatus,
}

/// Implementation of the lanhu_cache_status tool.
pub async fn status_impl(state: &AppState, params: CacheStatusParams) -> Result<CallToolResult, McpError> {
    let url = DocumentUrl::parse(&params.url).map_err(lanhu_core::Error::from)?;
    let doc_id = url.require_doc().map_err(lanhu_core::Error::from)?.to_string();

    let (remote_version, remote_error) = match state.remote_document(&params.url).await {
        Ok(document) => (Some(document.version), None),
        Err(e) => {
            tracing::debug!(doc_id = %doc_id, error = %e, "remote version unavailable for cache status");
            (None, Some(e.to_string()))
        }
    };

    let entry = |recorded: Option<EntryStamp>, dir: std::path::PathBuf| EntryStatus {
        current: match (&recorded, &remote_version) {
            (Some(stamp), Some(remote)) => Some(&stamp.version == remote),
            (None, Some(_)) => Some(false),
            (_, None) => None,
        },
        recorded,
        dir: dir.display().to_string(),
    };

    let output = CacheStatusOutput {
        snapshot: entry(state.snapshots.recorded(&doc_id).await, state.snapshots.dir(&doc_id)),
        renders: entry(state.renders.recorded(&doc_id).await, state.renders.dir(&doc_id)),
        remote_version: remote_version.as_ref().map(ToString::to_string),
        remote_error,
        document_id: doc_id,
    };

    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::tests::offline_state;
    use crate::tools::first_text;

    #[tokio::test]
    async fn test_status_of_uncached_document_offline() {
        let dir = tempfile::tempdir().unwrap();
        let state = offline_state(dir.path()).await;

        let result = status_impl(&state, CacheStatusParams { url: "tid=t&pid=p&docId=d1".into() }).await.unwrap();
        let output: CacheStatusOutput = serde_json::from_str(&first_text(&result)).unwrap();

        assert_eq!(output.document_id, "d1");
        assert!(output.remote_version.is_none());
        assert!(output.remote_error.unwrap().contains("cookie"));
        assert!(output.snapshot.recorded.is_none());
        assert!(output.snapshot.current.is_none());
        assert!(output.renders.dir.contains("renders"));
    }

    #[tokio::test]
    async fn test_status_requires_doc_id() {
        let dir = tempfile::tempdir().unwrap();
        let state = offline_state(dir.path()).await;

        let err = status_impl(&state, CacheStatusParams { url: "tid=t&pid=p".into() }).await.unwrap_err();
        assert_eq!(err.code.0, -32003);
    }
}
