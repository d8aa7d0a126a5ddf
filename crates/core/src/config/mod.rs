//! Server settings: Lanhu endpoints and session cookie, cache location,
//! renderer knobs, board identity and webhook.
//!
//! Sources, later ones overriding earlier ones: built-in defaults, the TOML
//! file named by `LANHU_MCP_CONFIG_FILE`, then `LANHU_MCP_*` variables.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Settings shared by every crate in the workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Session cookie sent to the Lanhu API.
    ///
    /// Set via LANHU_MCP_COOKIE environment variable.
    /// Required only when a tool talks to the remote API.
    #[serde(default)]
    pub cookie: Option<String>,

    /// Base URL of the Lanhu web API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Base URL of the CDN hosting prototype files.
    #[serde(default = "default_cdn_url")]
    pub cdn_url: String,

    /// Root directory for snapshots and render artifacts.
    ///
    /// Set via LANHU_MCP_DATA_DIR environment variable.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Path to the message board SQLite database.
    ///
    /// Defaults to `board.sqlite` inside `data_dir` when unset.
    #[serde(default)]
    pub db_path: Option<PathBuf>,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request HTTP timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Whether the headless browser may be launched.
    ///
    /// Set via LANHU_MCP_RENDER_ENABLED environment variable.
    #[serde(default = "default_true")]
    pub render_enabled: bool,

    /// Per-page render timeout in milliseconds.
    #[serde(default = "default_render_timeout_ms")]
    pub render_timeout_ms: u64,

    /// Extra wait after navigation before capturing a page, in milliseconds.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,

    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,

    /// Incoming-webhook URL for board notifications.
    ///
    /// Notifications are disabled when unset.
    #[serde(default)]
    pub webhook_url: Option<String>,

    /// Display name of the user driving this server.
    #[serde(default = "default_user_name")]
    pub user_name: String,

    /// Free-form role of the user driving this server.
    #[serde(default = "default_user_role")]
    pub user_role: String,

    /// People that may be mentioned on the board, mapped to their webhook user id.
    #[serde(default)]
    pub mention_directory: BTreeMap<String, String>,
}

fn default_base_url() -> String {
    "https://lanhuapp.com".into()
}

fn default_cdn_url() -> String {
    "https://axure-file.lanhuapp.com".into()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_user_agent() -> String {
    "mcp-lanhu/0.1".into()
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_render_timeout_ms() -> u64 {
    30_000
}

fn default_settle_ms() -> u64 {
    2_000
}

fn default_viewport_width() -> u32 {
    1920
}

fn default_viewport_height() -> u32 {
    1080
}

fn default_user_name() -> String {
    "anonymous".into()
}

fn default_user_role() -> String {
    "unknown".into()
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cookie: None,
            base_url: default_base_url(),
            cdn_url: default_cdn_url(),
            data_dir: default_data_dir(),
            db_path: None,
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            render_enabled: true,
            render_timeout_ms: default_render_timeout_ms(),
            settle_ms: default_settle_ms(),
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
            webhook_url: None,
            user_name: default_user_name(),
            user_role: default_user_role(),
            mention_directory: BTreeMap::new(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_millis(self.render_timeout_ms)
    }

    /// Directory holding document snapshots and render artifacts.
    pub fn cache_root(&self) -> PathBuf {
        self.data_dir.clone()
    }

    /// Resolved message board database path.
    pub fn board_db_path(&self) -> PathBuf {
        self.db_path.clone().unwrap_or_else(|| self.data_dir.join("board.sqlite"))
    }

    /// Merge defaults, the optional TOML file and `LANHU_MCP_*` variables,
    /// then validate. Nested tables such as `mention_directory` use `__` in
    /// variable names (`LANHU_MCP_MENTION_DIRECTORY__BOB=ou_123`).
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("LANHU_MCP_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("LANHU_MCP_")
                .ignore(&["config_file"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Check if the Lanhu cookie is available (for deferred validation).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the cookie is not set.
    pub fn require_cookie(&self) -> Result<&str, ConfigError> {
        self.cookie.as_deref().filter(|c| !c.is_empty()).ok_or_else(|| ConfigError::Missing {
            field: "cookie".into(),
            hint: "Set LANHU_MCP_COOKIE environment variable".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.base_url, "https://lanhuapp.com");
        assert_eq!(config.cdn_url, "https://axure-file.lanhuapp.com");
        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert_eq!(config.timeout_ms, 30_000);
        assert!(config.render_enabled);
        assert!(config.cookie.is_none());
        assert!(config.webhook_url.is_none());
        assert!(config.mention_directory.is_empty());
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(30_000));
        assert_eq!(config.render_timeout(), Duration::from_millis(30_000));
    }

    #[test]
    fn test_board_db_path_defaults_into_data_dir() {
        let config = AppConfig { data_dir: PathBuf::from("/tmp/lanhu"), ..Default::default() };
        assert_eq!(config.board_db_path(), PathBuf::from("/tmp/lanhu/board.sqlite"));

        let config = AppConfig { db_path: Some(PathBuf::from("/var/board.db")), ..Default::default() };
        assert_eq!(config.board_db_path(), PathBuf::from("/var/board.db"));
    }

    #[test]
    fn test_require_cookie_missing() {
        let config = AppConfig::default();
        assert!(matches!(config.require_cookie(), Err(ConfigError::Missing { .. })));

        let config = AppConfig { cookie: Some(String::new()), ..Default::default() };
        assert!(matches!(config.require_cookie(), Err(ConfigError::Missing { .. })));
    }

    #[test]
    fn test_require_cookie_present() {
        let config = AppConfig { cookie: Some("session=abc".into()), ..Default::default() };
        assert_eq!(config.require_cookie().unwrap(), "session=abc");
    }
}
