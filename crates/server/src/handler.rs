//! MCP server handler implementation.
//!
//! Routes tool calls to the implementations in [`crate::tools`], all sharing
//! one [`AppState`].
use std::sync::Arc;

use crate::state::AppState;
use crate::tools::{
    AnalyzePagesParams, CachePurgeParams, CacheStatusParams, GetDesignSlicesParams, GetDesignsParams, GetPagesParams,
    ResolveInviteParams, SayDeleteParams, SayDetailParams, SayEditParams, SayListParams, SayParams, UrlParams, analyze,
    board, cache, design, invite, pages,
};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for mcp-lanhu.
#[derive(Clone)]
pub struct LanhuServer {
    state: Arc<AppState>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
#[tool_router]
impl LanhuServer {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state, tool_router: Self::tool_router() }
    }

    #[tool(
        description = "List the pages of a Lanhu prototype document: page names, files, folders and levels, plus document and project metadata. Call this before lanhu_analyze_pages."
    )]
    async fn lanhu_get_pages(&self, params: Parameters<GetPagesParams>) -> Result<CallToolResult, McpError> {
        pages::get_pages_impl(&self.state, params.0).await
    }

    /// Screenshots and page text, cached per document version.
    #[tool(
        description = "Analyze prototype pages: returns full-page screenshots and extracted text (annotations, labels, page text). page_names is \"all\", a page name or a list of names. mode \"text_only\" skips images. Results are cached until the document gets a new version."
    )]
    async fn lanhu_analyze_pages(&self, params: Parameters<AnalyzePagesParams>) -> Result<CallToolResult, McpError> {
        analyze::analyze_impl(&self.state, params.0).await
    }

    #[tool(
        description = "Resolve a Lanhu invite or share link (lanhuapp.com/link/#/invite?sid=..) to the project URL it redirects to, with its tid, pid and docId. Use the resolved URL with the other tools."
    )]
    async fn lanhu_resolve_invite_link(
        &self, params: Parameters<ResolveInviteParams>,
    ) -> Result<CallToolResult, McpError> {
        invite::resolve_invite_impl(&self.state, params.0).await
    }

    #[tool(
        description = "List the UI design images of a Lanhu project (URL with tid and pid, no docId): id, name, size, image URL and update time. Call this before lanhu_get_design_slices."
    )]
    async fn lanhu_get_designs(&self, params: Parameters<GetDesignsParams>) -> Result<CallToolResult, McpError> {
        design::get_designs_impl(&self.state, params.0).await
    }

    #[tool(
        description = "List the exported slices (icons, images) of one design by exact name: download URL, size, position, layer path and, unless include_metadata is false, fills, borders, opacity, shadows and text style."
    )]
    async fn lanhu_get_design_slices(
        &self, params: Parameters<GetDesignSlicesParams>,
    ) -> Result<CallToolResult, McpError> {
        design::get_design_slices_impl(&self.state, params.0).await
    }

    #[tool(
        description = "Show the locally cached snapshot and render versions of a document and whether they match the latest remote version."
    )]
    async fn lanhu_cache_status(&self, params: Parameters<CacheStatusParams>) -> Result<CallToolResult, McpError> {
        cache::status_impl(&self.state, params.0).await
    }

    #[tool(description = "Delete the cached snapshot and renders of a document. The next analysis fetches everything again.")]
    async fn lanhu_cache_purge(&self, params: Parameters<CachePurgeParams>) -> Result<CallToolResult, McpError> {
        cache::purge_impl(&self.state, params.0).await
    }

    #[tool(
        description = "Post a message to the project's team board. message_type is normal, task, question, urgent or knowledge. Mentioned people are notified."
    )]
    async fn lanhu_say(&self, params: Parameters<SayParams>) -> Result<CallToolResult, McpError> {
        board::say_impl(&self.state, params.0).await
    }

    #[tool(
        description = "List team board messages, newest first and grouped by document. Omit url or pass \"all\" for every project. Supports filter_type, search_regex and limit."
    )]
    async fn lanhu_say_list(&self, params: Parameters<SayListParams>) -> Result<CallToolResult, McpError> {
        board::list_impl(&self.state, params.0).await
    }

    #[tool(description = "Get the full content of one or more board messages by id.")]
    async fn lanhu_say_detail(&self, params: Parameters<SayDetailParams>) -> Result<CallToolResult, McpError> {
        board::detail_impl(&self.state, params.0).await
    }

    #[tool(description = "Edit a board message. Only the given fields change; the editor is recorded.")]
    async fn lanhu_say_edit(&self, params: Parameters<SayEditParams>) -> Result<CallToolResult, McpError> {
        board::edit_impl(&self.state, params.0).await
    }

    #[tool(description = "Delete a board message.")]
    async fn lanhu_say_delete(&self, params: Parameters<SayDeleteParams>) -> Result<CallToolResult, McpError> {
        board::delete_impl(&self.state, params.0).await
    }

    #[tool(description = "List the collaborators who have used these tools on a project, with first and last activity.")]
    async fn lanhu_get_members(&self, params: Parameters<UrlParams>) -> Result<CallToolResult, McpError> {
        board::members_impl(&self.state, params.0).await
    }
}

impl ServerHandler for LanhuServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "mcp-lanhu".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(
                "Read Lanhu prototype documents (page lists, screenshots, page text), list UI designs and their \
                 slices, and share notes with the team on a per-project message board."
                    .into(),
            ),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
