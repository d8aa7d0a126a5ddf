//! Shared services behind every tool call.

use std::sync::Arc;

use lanhu_client::api::{
    ApiError, DesignImage, DesignInfo, DocumentInfo, RawDocumentManifest, document_metadata, project_metadata,
    response::format_time,
};
use lanhu_client::{BrowserBackend, DocumentUrl, LanhuClient, LanhuSource, RenderOptions, WebhookNotifier};
use lanhu_core::board::{Author, Viewer};
use lanhu_core::{
    AppConfig, BoardDb, DocumentMetadata, DocumentSnapshotManager, Error, MetadataCache, RenderCache, VersionToken,
};

/// A document resolved against the remote API.
#[derive(Debug, Clone)]
pub struct RemoteDocument {
    pub url: DocumentUrl,
    pub doc_id: String,
    pub info: DocumentInfo,
    pub version: VersionToken,
}

/// Explicitly constructed caches and clients, shared by all tools.
pub struct AppState {
    pub config: AppConfig,
    client: Option<LanhuClient>,
    pub snapshots: DocumentSnapshotManager<LanhuSource>,
    pub renders: RenderCache<BrowserBackend>,
    pub browser: Arc<BrowserBackend>,
    pub metadata: MetadataCache,
    pub board: BoardDb,
    pub notifier: Option<WebhookNotifier>,
}

impl AppState {
    /// Open the board database and build the caches under `config.data_dir`.
    pub async fn new(config: AppConfig) -> Result<Self, Error> {
        let board = BoardDb::open(config.board_db_path()).await?;
        Self::with_board(config, board)
    }

    pub fn with_board(config: AppConfig, board: BoardDb) -> Result<Self, Error> {
        let client = match LanhuClient::from_app(&config) {
            Ok(client) => Some(client),
            Err(ApiError::MissingCookie) => {
                tracing::warn!("no Lanhu cookie configured, remote document tools are unavailable");
                None
            }
            Err(e) => return Err(e.into()),
        };

        let root = config.cache_root();
        let snapshots = DocumentSnapshotManager::new(&root, Arc::new(LanhuSource::new(client.clone())));
        let browser = Arc::new(BrowserBackend::new(RenderOptions::from_app(&config)));
        let renders = RenderCache::new(&root, browser.clone());
        let notifier = WebhookNotifier::from_app(&config)?;

        Ok(Self { config, client, snapshots, renders, browser, metadata: MetadataCache::new(), board, notifier })
    }

    pub fn client(&self) -> Result<&LanhuClient, Error> {
        self.client.as_ref().ok_or_else(|| ApiError::MissingCookie.into())
    }

    pub fn viewer(&self) -> Viewer {
        Viewer { name: self.config.user_name.clone(), role: self.config.user_role.clone() }
    }

    pub fn author(&self) -> Author {
        Author { name: self.config.user_name.clone(), role: self.config.user_role.clone() }
    }

    /// Parse `raw_url` and fetch document info; the document id is required.
    pub async fn remote_document(&self, raw_url: &str) -> Result<RemoteDocument, Error> {
        let url = DocumentUrl::parse(raw_url)?;
        let doc_id = url.require_doc()?.to_string();
        let info = self.client()?.get_document_info(&url.project_id, &doc_id).await?;
        let version = info.latest_token().ok_or(ApiError::NoVersions)?;

        tracing::debug!(doc_id = %doc_id, version = %version, "resolved remote document");
        Ok(RemoteDocument { url, doc_id, info, version })
    }

    pub async fn manifest(&self, document: &RemoteDocument) -> Result<RawDocumentManifest, Error> {
        Ok(self.client()?.get_document_manifest(&document.info).await?)
    }

    /// Project name and folder, cached for the process lifetime. Failures are not cached.
    pub async fn project_metadata(&self, url: &DocumentUrl) -> DocumentMetadata {
        let key = MetadataCache::key(&url.project_id, None);
        if let Some(hit) = self.metadata.get(&key, None).await {
            return hit;
        }

        let Ok(client) = self.client() else {
            return project_metadata(&url.project_id, None);
        };
        match client.get_project_info(&url.team_id, &url.project_id).await {
            Ok(project) => {
                let metadata = project_metadata(&url.project_id, Some(&project));
                self.metadata.put(&key, metadata.clone(), None).await;
                metadata
            }
            Err(e) => {
                tracing::debug!(project_id = %url.project_id, error = %e, "project info unavailable");
                project_metadata(&url.project_id, None)
            }
        }
    }

    /// Metadata of an already resolved document, cached per version.
    pub async fn document_metadata(&self, document: &RemoteDocument) -> DocumentMetadata {
        let key = MetadataCache::key(&document.url.project_id, Some(&document.doc_id));
        if let Some(hit) = self.metadata.get(&key, Some(&document.version)).await {
            return hit;
        }

        let project = self.project_metadata(&document.url).await;
        let metadata =
            document_metadata(&project, &document.doc_id, &document.info, document.url.web_url(&self.config.base_url));
        self.metadata.put(&key, metadata.clone(), Some(&document.version)).await;
        metadata
    }

    /// Metadata of a design image, cached per design version.
    pub async fn design_metadata(
        &self, url: &DocumentUrl, design: &DesignImage, info: &DesignInfo,
    ) -> DocumentMetadata {
        let key = MetadataCache::key(&url.project_id, Some(&design.id));
        let version = info.latest_token();
        if let Some(version) = &version {
            if let Some(hit) = self.metadata.get(&key, Some(version)).await {
                return hit;
            }
        }

        let metadata = DocumentMetadata {
            doc_id: Some(design.id.clone()),
            doc_name: info.name.clone().or_else(|| Some(design.name.clone())),
            doc_type: Some("design".into()),
            doc_version: info.latest().and_then(|v| v.version_info.clone()),
            doc_updated_at: info.update_time.as_deref().or(design.update_time.as_deref()).map(format_time),
            doc_url: Some(url.stage_url(&self.config.base_url)),
            ..self.project_metadata(url).await
        };
        if let Some(version) = &version {
            self.metadata.put(&key, metadata.clone(), Some(version)).await;
        }
        metadata
    }

    /// Best-effort metadata for board messages: whatever the URL and the
    /// remote API can tell, never an error.
    pub async fn metadata_for_url(&self, url: &DocumentUrl) -> DocumentMetadata {
        let Some(doc_id) = url.doc_id.clone() else {
            return self.project_metadata(url).await;
        };

        let info = match self.client() {
            Ok(client) => client.get_document_info(&url.project_id, &doc_id).await,
            Err(_) => Err(ApiError::MissingCookie),
        };
        match info {
            Ok(info) => match info.latest_token() {
                Some(version) => {
                    let document = RemoteDocument { url: url.clone(), doc_id, info, version };
                    self.document_metadata(&document).await
                }
                None => self.fallback_metadata(url, doc_id).await,
            },
            Err(e) => {
                tracing::debug!(doc_id = %doc_id, error = %e, "document info unavailable for metadata");
                self.fallback_metadata(url, doc_id).await
            }
        }
    }

    async fn fallback_metadata(&self, url: &DocumentUrl, doc_id: String) -> DocumentMetadata {
        DocumentMetadata {
            doc_id: Some(doc_id),
            doc_url: url.web_url(&self.config.base_url),
            ..self.project_metadata(url).await
        }
    }
}
