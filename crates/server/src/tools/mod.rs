//! MCP tool implementations.
//!
//! This module contains all tools exposed by the mcp-lanhu server. Each tool
//! has a `*Params` input type and an `*_impl` function taking the shared
//! [`AppState`](crate::state::AppState).

pub mod analyze;
pub mod board;
pub mod cache;
pub mod design;
pub mod invite;
pub mod pages;

pub use analyze::AnalyzePagesParams;
pub use board::{SayDeleteParams, SayDetailParams, SayEditParams, SayListParams, SayParams, UrlParams};
pub use cache::{CachePurgeParams, CacheStatusParams};
pub use design::{GetDesignSlicesParams, GetDesignsParams};
pub use invite::ResolveInviteParams;
pub use pages::GetPagesParams;

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

use lanhu_core::Error;

/// Serialize `output` as pretty JSON text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

/// Text of the first content item, for asserting on tool output in tests.
#[cfg(test)]
pub(crate) fn first_text(result: &CallToolResult) -> String {
    let content_val = serde_json::to_value(&result.content[0]).unwrap();
    content_val.get("text").and_then(|v| v.as_str()).expect("Expected text field in content").to_string()
}
