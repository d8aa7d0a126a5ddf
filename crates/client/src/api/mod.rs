//! Lanhu web API client.
//!
//! ### Endpoints
//!
//! - **Document info**: `GET {base}/api/project/image?pid=..&image_id=..`,
//!   versions latest first, each carrying the document manifest URL.
//! - **Project info**: `GET {base}/api/project/multi_info?project_id=..&team_id=..&doc_info=1`.
//! - **Design list**: `GET {base}/api/project/images?project_id=..&team_id=..`.
//! - **Design info**: `GET {base}/api/project/image?dds_status=1&image_id=..`, whose
//!   latest version references the layer tree JSON.
//! - **Manifests and assets**: absolute URLs, or CDN-relative locations
//!   resolved against `cdn_url`.
//!
//! Every request carries the session cookie and the browser-like headers the
//! web app sends. Nothing is retried; callers report failures per item.

pub mod design;
pub mod response;
pub mod sitemap;

pub use design::{DesignImage, DesignInfo, DesignList, DesignSlice, DesignSummary, extract_slices};
pub use response::{
    DocumentInfo, ProjectInfo, RawAssetManifest, RawDocumentManifest, VersionInfo, document_metadata, project_metadata,
};
pub use sitemap::{PageInfo, PageListStats, ROOT_FOLDER, SitemapNode, extract_pages};

use bytes::Bytes;
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

use lanhu_core::AppConfig;

use response::ApiEnvelope;

const REFERER: &str = "https://lanhuapp.com/web/";

/// Errors from the Lanhu API client.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    /// No session cookie configured.
    #[error("missing cookie: LANHU_MCP_COOKIE not set")]
    MissingCookie,

    /// Header value could not be encoded (e.g. non-ASCII cookie).
    #[error("invalid header value: {0}")]
    InvalidHeader(String),

    /// API answered with a non-success code.
    #[error("API error {code}: {message}")]
    Api { code: String, message: String },

    /// Success envelope without `data` or `result`.
    #[error("empty API payload from {0}")]
    EmptyPayload(String),

    /// Document exists but has no published versions.
    #[error("document has no versions")]
    NoVersions,

    /// Latest version has no manifest URL.
    #[error("document manifest URL not found")]
    NoManifest,

    #[error("HTTP error: {status} for {url}")]
    HttpError { status: u16, url: String },

    #[error("request timeout")]
    Timeout,

    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    #[error("parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { ApiError::Timeout } else { ApiError::Network(Arc::new(err)) }
    }
}

impl From<ApiError> for lanhu_core::Error {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::MissingCookie | ApiError::InvalidHeader(_) => lanhu_core::Error::InvalidInput(err.to_string()),
            ApiError::Timeout => lanhu_core::Error::FetchTimeout(err.to_string()),
            ApiError::HttpError { .. } | ApiError::Network(_) => lanhu_core::Error::HttpError(err.to_string()),
            ApiError::Api { .. }
            | ApiError::EmptyPayload(_)
            | ApiError::NoVersions
            | ApiError::NoManifest
            | ApiError::Parse(_) => lanhu_core::Error::RemoteApi(err.to_string()),
        }
    }
}

/// Lanhu API client configuration.
#[derive(Debug, Clone)]
pub struct LanhuConfig {
    pub cookie: String,
    pub base_url: String,
    pub cdn_url: String,
    pub timeout: Duration,
    pub user_agent: String,
}

impl LanhuConfig {
    pub fn from_app(config: &AppConfig) -> Result<Self, ApiError> {
        let cookie = config.require_cookie().map_err(|_| ApiError::MissingCookie)?;
        Ok(Self {
            cookie: cookie.to_string(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            cdn_url: config.cdn_url.trim_end_matches('/').to_string(),
            timeout: config.timeout(),
            user_agent: config.user_agent.clone(),
        })
    }
}

/// Lanhu web API client.
#[derive(Debug, Clone)]
pub struct LanhuClient {
    http: reqwest::Client,
    config: LanhuConfig,
}

impl LanhuClient {
    pub fn new(config: LanhuConfig) -> Result<Self, ApiError> {
        if config.cookie.is_empty() {
            return Err(ApiError::MissingCookie);
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&config.cookie).map_err(|e| ApiError::InvalidHeader(e.to_string()))?,
        );
        headers.insert(header::REFERER, HeaderValue::from_static(REFERER));
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
        headers.insert("request-from", HeaderValue::from_static("web"));
        headers.insert("real-path", HeaderValue::from_static("/item/project/product"));

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .build()?;

        Ok(Self { http, config })
    }

    pub fn from_app(config: &AppConfig) -> Result<Self, ApiError> {
        Self::new(LanhuConfig::from_app(config)?)
    }

    pub fn config(&self) -> &LanhuConfig {
        &self.config
    }

    /// Document name, type, timestamps and versions (latest first).
    pub async fn get_document_info(&self, project_id: &str, doc_id: &str) -> Result<DocumentInfo, ApiError> {
        let url = format!("{}/api/project/image", self.config.base_url);
        tracing::debug!(project_id, doc_id, "fetching document info");

        let info: DocumentInfo = self.get_api(&url, &[("pid", project_id), ("image_id", doc_id)]).await?;
        if info.versions.is_empty() {
            return Err(ApiError::NoVersions);
        }
        Ok(info)
    }

    /// Project name and folder; callers treat failures as "unknown".
    pub async fn get_project_info(&self, team_id: &str, project_id: &str) -> Result<ProjectInfo, ApiError> {
        let url = format!("{}/api/project/multi_info", self.config.base_url);
        tracing::debug!(team_id, project_id, "fetching project info");

        self.get_api(&url, &[("project_id", project_id), ("team_id", team_id), ("doc_info", "1")]).await
    }

    /// Design images of a project, in the order the web app shows them.
    pub async fn get_designs(&self, team_id: &str, project_id: &str) -> Result<DesignList, ApiError> {
        let url = format!("{}/api/project/images", self.config.base_url);
        tracing::debug!(team_id, project_id, "fetching design list");

        self.get_api(
            &url,
            &[
                ("project_id", project_id),
                ("team_id", team_id),
                ("dds_status", "1"),
                ("position", "1"),
                ("show_cb_src", "1"),
                ("comment", "1"),
            ],
        )
        .await
    }

    /// Design name, canvas size and versions (latest first).
    pub async fn get_design_info(
        &self, team_id: &str, project_id: &str, image_id: &str,
    ) -> Result<DesignInfo, ApiError> {
        let url = format!("{}/api/project/image", self.config.base_url);
        tracing::debug!(project_id, image_id, "fetching design info");

        let info: DesignInfo = self
            .get_api(
                &url,
                &[("dds_status", "1"), ("image_id", image_id), ("team_id", team_id), ("project_id", project_id)],
            )
            .await?;
        if info.versions.is_empty() {
            return Err(ApiError::NoVersions);
        }
        Ok(info)
    }

    /// Layer tree JSON of the latest design version.
    pub async fn get_design_json(&self, info: &DesignInfo) -> Result<serde_json::Value, ApiError> {
        let latest = info.latest().ok_or(ApiError::NoVersions)?;
        let json_url = latest.json_url.as_deref().filter(|u| !u.is_empty()).ok_or(ApiError::NoManifest)?;
        self.get_json(json_url).await
    }

    /// Document manifest referenced by the latest version of `info`.
    pub async fn get_document_manifest(&self, info: &DocumentInfo) -> Result<RawDocumentManifest, ApiError> {
        let latest = info.latest().ok_or(ApiError::NoVersions)?;
        let json_url = latest.json_url.as_deref().filter(|u| !u.is_empty()).ok_or(ApiError::NoManifest)?;
        self.get_json(json_url).await
    }

    /// Absolute URL for a manifest or asset location.
    pub fn resolve(&self, location: &str) -> String {
        if location.starts_with("http://") || location.starts_with("https://") {
            location.to_string()
        } else {
            format!("{}/{}", self.config.cdn_url, location.trim_start_matches('/'))
        }
    }

    /// GET a JSON document.
    pub async fn get_json<T: DeserializeOwned>(&self, location: &str) -> Result<T, ApiError> {
        let bytes = self.get_bytes(location).await?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Parse(e.to_string()))
    }

    /// GET a raw body.
    pub async fn get_bytes(&self, location: &str) -> Result<Bytes, ApiError> {
        let url = self.resolve(location);
        let response = self.http.get(&url).send().await?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(ApiError::HttpError { status: status.as_u16(), url });
        }

        Ok(response.bytes().await?)
    }

    async fn get_api<T: DeserializeOwned>(&self, url: &str, query: &[(&str, &str)]) -> Result<T, ApiError> {
        let response = self.http.get(url).query(query).send().await?;

        let status = response.status();
        tracing::debug!(url, status = status.as_u16(), "Lanhu API response");
        if status.is_client_error() || status.is_server_error() {
            return Err(ApiError::HttpError { status: status.as_u16(), url: url.to_string() });
        }

        let bytes = response.bytes().await?;
        let envelope: ApiEnvelope<T> = serde_json::from_slice(&bytes).map_err(|e| ApiError::Parse(e.to_string()))?;
        if !envelope.is_success() {
            return Err(ApiError::Api {
                code: envelope.code_string(),
                message: envelope.msg.clone().unwrap_or_else(|| "unknown error".into()),
            });
        }

        envelope.into_payload().ok_or_else(|| ApiError::EmptyPayload(url.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> LanhuConfig {
        LanhuConfig {
            cookie: "session=abc".into(),
            base_url: "https://lanhuapp.com".into(),
            cdn_url: "https://axure-file.lanhuapp.com".into(),
            timeout: Duration::from_secs(5),
            user_agent: "mcp-lanhu/test".into(),
        }
    }

    #[test]
    fn test_new_requires_cookie() {
        let result = LanhuClient::new(LanhuConfig { cookie: String::new(), ..config() });
        assert!(matches!(result, Err(ApiError::MissingCookie)));
    }

    #[test]
    fn test_from_app_without_cookie() {
        let result = LanhuClient::from_app(&AppConfig::default());
        assert!(matches!(result, Err(ApiError::MissingCookie)));
    }

    #[test]
    fn test_resolve_locations() {
        let client = LanhuClient::new(config()).unwrap();
        assert_eq!(client.resolve("https://cdn.example/a.js"), "https://cdn.example/a.js");
        assert_eq!(client.resolve("abc123"), "https://axure-file.lanhuapp.com/abc123");
        assert_eq!(client.resolve("/abc123"), "https://axure-file.lanhuapp.com/abc123");
    }

    #[test]
    fn test_error_mapping() {
        let err: lanhu_core::Error = ApiError::NoVersions.into();
        assert!(err.to_string().starts_with("REMOTE_API_ERROR"));

        let err: lanhu_core::Error = ApiError::Timeout.into();
        assert!(err.to_string().starts_with("FETCH_TIMEOUT"));

        let err: lanhu_core::Error = ApiError::HttpError { status: 404, url: "u".into() }.into();
        assert!(err.to_string().starts_with("HTTP_ERROR"));
    }

    #[tokio::test]
    async fn test_design_json_requires_json_url() {
        let client = LanhuClient::new(config()).unwrap();
        let info = DesignInfo { name: None, width: None, height: None, update_time: None, versions: vec![] };
        assert!(matches!(client.get_design_json(&info).await, Err(ApiError::NoVersions)));

        let info = DesignInfo {
            versions: vec![VersionInfo { id: "1".into(), version_info: None, json_url: Some(String::new()) }],
            ..info
        };
        assert!(matches!(client.get_design_json(&info).await, Err(ApiError::NoManifest)));
    }

    #[tokio::test]
    async fn test_document_manifest_requires_versions() {
        let client = LanhuClient::new(config()).unwrap();
        let info = DocumentInfo { name: None, doc_type: None, create_time: None, update_time: None, versions: vec![] };
        assert!(matches!(client.get_document_manifest(&info).await, Err(ApiError::NoVersions)));

        let info = DocumentInfo {
            versions: vec![VersionInfo { id: "1".into(), version_info: None, json_url: None }],
            ..info
        };
        assert!(matches!(client.get_document_manifest(&info).await, Err(ApiError::NoManifest)));
    }
}
