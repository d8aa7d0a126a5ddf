//! Client code for mcp-lanhu.
//!
//! This crate talks to everything outside the process: the Lanhu web API and
//! CDN, the headless browser used for rendering, the loopback file server it
//! reads snapshots from, and the notification webhook.

pub mod api;
pub mod html;
pub mod notify;
#[cfg(feature = "render")]
pub mod render;
pub mod serve;
pub mod source;
pub mod url;

pub use api::{ApiError, DocumentInfo, LanhuClient, LanhuConfig, PageInfo, PageListStats, ProjectInfo, extract_pages};
pub use notify::WebhookNotifier;
#[cfg(feature = "render")]
pub use render::{BrowserBackend, BrowserSession, RenderError, RenderOptions};
pub use serve::LocalServer;
pub use source::LanhuSource;
pub use url::{DocumentUrl, UrlError, parse_invite};
