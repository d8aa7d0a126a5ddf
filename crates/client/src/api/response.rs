//! Lanhu API response types and normalization.

use lanhu_core::cache::{AssetKind, AssetManifest, AssetRef, DocumentManifest, PageEntry};
use lanhu_core::{DocumentMetadata, VersionToken};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::sitemap::SitemapNode;

/// Raw envelope of every `/api/...` response.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub code: Value,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default = "none")]
    pub data: Option<T>,
    #[serde(default = "none")]
    pub result: Option<T>,
}

fn none<T>() -> Option<T> {
    None
}

impl<T> ApiEnvelope<T> {
    /// Lanhu reports success as `0`, `"0"` or `"00000"` depending on the endpoint.
    pub fn is_success(&self) -> bool {
        match &self.code {
            Value::Number(n) => n.as_i64() == Some(0),
            Value::String(s) => s == "0" || s == "00000",
            _ => false,
        }
    }

    pub fn code_string(&self) -> String {
        match &self.code {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    pub fn into_payload(self) -> Option<T> {
        self.data.or(self.result)
    }
}

/// One published version of a document, latest first in [`DocumentInfo::versions`].
#[derive(Debug, Clone, Deserialize)]
pub struct VersionInfo {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub version_info: Option<String>,
    #[serde(default)]
    pub json_url: Option<String>,
}

/// Payload of `/api/project/image`.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub doc_type: Option<String>,
    #[serde(default)]
    pub create_time: Option<String>,
    #[serde(default)]
    pub update_time: Option<String>,
    #[serde(default)]
    pub versions: Vec<VersionInfo>,
}

impl DocumentInfo {
    pub fn latest(&self) -> Option<&VersionInfo> {
        self.versions.first()
    }

    pub fn latest_token(&self) -> Option<VersionToken> {
        self.latest().map(|v| VersionToken::new(v.id.clone()))
    }
}

/// Payload of `/api/project/multi_info`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProjectInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub folder_name: Option<String>,
    #[serde(default)]
    pub creator_name: Option<String>,
    #[serde(default)]
    pub save_path: Option<String>,
    #[serde(default)]
    pub member_cnt: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Sitemap {
    #[serde(default, rename = "rootNodes")]
    pub root_nodes: Vec<SitemapNode>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignedFile {
    #[serde(default)]
    pub sign_md5: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPage {
    #[serde(default)]
    pub html: SignedFile,
    #[serde(default)]
    pub mapping_md5: String,
}

/// Document-level mapping JSON referenced by a version's `json_url`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDocumentManifest {
    #[serde(default)]
    pub sitemap: Sitemap,
    /// Markup file name to page entry, in document order.
    #[serde(default)]
    pub pages: Map<String, Value>,
}

impl RawDocumentManifest {
    /// Pages that declare markup, in document order. Malformed entries are skipped.
    pub fn to_manifest(&self) -> DocumentManifest {
        let pages = self
            .pages
            .iter()
            .filter_map(|(filename, raw)| {
                let page: RawPage = match serde_json::from_value(raw.clone()) {
                    Ok(page) => page,
                    Err(e) => {
                        tracing::debug!(page = %filename, error = %e, "skipping malformed page entry");
                        return None;
                    }
                };
                if page.html.sign_md5.is_empty() {
                    return None;
                }
                Some(PageEntry {
                    filename: filename.clone(),
                    markup: page.html.sign_md5,
                    asset_manifest: Some(page.mapping_md5).filter(|m| !m.is_empty()),
                })
            })
            .collect();

        DocumentManifest { pages }
    }
}

/// Page-level mapping JSON: `local_path -> {sign_md5}` per asset kind.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAssetManifest {
    #[serde(default)]
    pub styles: Map<String, Value>,
    #[serde(default)]
    pub scripts: Map<String, Value>,
    #[serde(default)]
    pub images: Map<String, Value>,
}

impl From<RawAssetManifest> for AssetManifest {
    fn from(raw: RawAssetManifest) -> Self {
        let kinds = [(AssetKind::Style, raw.styles), (AssetKind::Script, raw.scripts), (AssetKind::Image, raw.images)];

        let assets = kinds
            .into_iter()
            .flat_map(|(kind, entries)| {
                entries.into_iter().filter_map(move |(local_path, info)| {
                    let location = info.get("sign_md5").and_then(Value::as_str).filter(|s| !s.is_empty())?;
                    Some(AssetRef { kind, local_path, location: location.to_string() })
                })
            })
            .collect();

        AssetManifest { assets }
    }
}

/// Offset the Lanhu web UI displays timestamps in (UTC+8).
const DISPLAY_OFFSET_SECS: i32 = 8 * 3600;

/// Render an API timestamp as `YYYY-MM-DD HH:MM:SS` in UTC+8; unparseable values pass through.
pub fn format_time(raw: &str) -> String {
    let (Ok(dt), Some(offset)) =
        (chrono::DateTime::parse_from_rfc3339(raw), chrono::FixedOffset::east_opt(DISPLAY_OFFSET_SECS))
    else {
        return raw.to_string();
    };
    dt.with_timezone(&offset).format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Project-level metadata; names stay unknown when project info is unavailable.
pub fn project_metadata(project_id: &str, project: Option<&ProjectInfo>) -> DocumentMetadata {
    DocumentMetadata {
        project_id: Some(project_id.to_string()),
        project_name: project.and_then(|p| p.name.clone()),
        folder_name: project.and_then(|p| p.folder_name.clone()),
        ..DocumentMetadata::default()
    }
}

/// Extend project-level metadata with one document's fields.
pub fn document_metadata(
    project: &DocumentMetadata, doc_id: &str, info: &DocumentInfo, doc_url: Option<String>,
) -> DocumentMetadata {
    DocumentMetadata {
        doc_id: Some(doc_id.to_string()),
        doc_name: info.name.clone(),
        doc_type: Some(info.doc_type.clone().unwrap_or_else(|| "axure".to_string())),
        doc_version: info.latest().and_then(|v| v.version_info.clone()),
        doc_updated_at: info.update_time.as_deref().map(format_time),
        doc_url,
        ..project.clone()
    }
}

pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("expected string or number, got {other}"))),
    }
}
