//! Per-page render artifacts (screenshot + extracted text).
//!
//! The render directory of a document carries one stamp, `.render_cache.json`,
//! recording the snapshot version the artifacts were produced from and the
//! pages rendered for it. A page is served from disk only when the stamp
//! version equals the snapshot version, the page is listed in the stamp and both
//! its image and text files exist. Anything else is rendered again.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::hash::safe_file_stem;
use super::key::{ResourceKey, VersionToken};
use super::snapshot::SnapshotState;
use super::store::{EntryStamp, FileStore, Lookup, VersionedStore};
use crate::Error;

/// Raw output of rendering one page.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub image: Bytes,
    pub text: String,
}

/// Starts rendering sessions over a snapshot directory.
#[async_trait]
pub trait RenderBackend: Send + Sync {
    type Session: RenderSession;

    async fn start(&self, snapshot_dir: &Path) -> Result<Self::Session, Error>;
}

/// A live session: local file server plus browser tab. Used serially.
#[async_trait]
pub trait RenderSession: Send {
    /// Render `page_file` (e.g. `login.html`) relative to the snapshot directory.
    async fn render(&mut self, page_file: &str) -> Result<RenderedPage, Error>;

    async fn close(&mut self);
}

/// Stamp payload recorded in `.render_cache.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderCacheMeta {
    pub document_id: String,
    pub cached_pages: Vec<String>,
}

/// Render artifact of one page at one version.
#[derive(Debug, Clone)]
pub struct PageArtifact {
    pub page_id: String,
    pub version: VersionToken,
    pub image: Bytes,
    pub text: String,
    pub image_path: PathBuf,
}

#[derive(Debug, Clone)]
pub enum RenderOutcome {
    Rendered { artifact: PageArtifact, from_cache: bool },
    Failed { reason: String },
}

#[derive(Debug, Clone)]
pub struct PageRender {
    pub page: String,
    pub outcome: RenderOutcome,
}

impl PageRender {
    fn failed(page: &str, reason: impl ToString) -> Self {
        Self { page: page.to_string(), outcome: RenderOutcome::Failed { reason: reason.to_string() } }
    }

    pub fn artifact(&self) -> Option<&PageArtifact> {
        match &self.outcome {
            RenderOutcome::Rendered { artifact, .. } => Some(artifact),
            RenderOutcome::Failed { .. } => None,
        }
    }

    pub fn from_cache(&self) -> bool {
        matches!(self.outcome, RenderOutcome::Rendered { from_cache: true, .. })
    }
}

pub struct RenderCache<B> {
    store: FileStore<RenderCacheMeta>,
    backend: Arc<B>,
}

impl<B: RenderBackend> RenderCache<B> {
    pub fn new(root: impl Into<PathBuf>, backend: Arc<B>) -> Self {
        Self { store: FileStore::new(root), backend }
    }

    pub fn dir(&self, document_id: &str) -> PathBuf {
        self.store.entry_dir(&ResourceKey::renders(document_id))
    }

    pub async fn recorded(&self, document_id: &str) -> Option<EntryStamp> {
        self.store.stamp(&ResourceKey::renders(document_id)).await
    }

    pub async fn purge(&self, document_id: &str) {
        self.store.evict(&ResourceKey::renders(document_id)).await;
    }

    /// Artifacts for `page_ids` at the snapshot's version, in request order.
    ///
    /// A page id is the markup file stem (`login` for `login.html`).
    pub async fn get_or_render(&self, snapshot: &SnapshotState, page_ids: &[String]) -> Vec<PageRender> {
        let key = ResourceKey::renders(&snapshot.document_id);
        let dir = self.store.entry_dir(&key);
        let version = &snapshot.version;

        let mut cached_pages = match self.store.lookup(&key, version).await {
            Lookup::Hit(meta) => meta.cached_pages,
            Lookup::Stale(_) | Lookup::Miss => Vec::new(),
        };

        let mut slots: Vec<Option<PageRender>> = vec![None; page_ids.len()];
        let mut misses = Vec::new();
        for (idx, page) in page_ids.iter().enumerate() {
            if !tokio::fs::try_exists(snapshot.dir.join(format!("{page}.html"))).await.unwrap_or(false) {
                slots[idx] = Some(PageRender::failed(page, format!("page {page} does not exist")));
                continue;
            }
            if cached_pages.contains(page) {
                if let Some(artifact) = read_artifact(&dir, page, version).await {
                    slots[idx] = Some(PageRender {
                        page: page.clone(),
                        outcome: RenderOutcome::Rendered { artifact, from_cache: true },
                    });
                    continue;
                }
            }
            misses.push(idx);
        }

        tracing::debug!(
            document_id = %snapshot.document_id,
            requested = page_ids.len(),
            misses = misses.len(),
            "render cache lookup"
        );

        if !misses.is_empty() {
            let rendered = self.render_misses(snapshot, &dir, page_ids, &misses, &mut slots).await;
            if !rendered.is_empty() {
                for page in rendered {
                    if !cached_pages.contains(&page) {
                        cached_pages.push(page);
                    }
                }
                let meta = RenderCacheMeta { document_id: snapshot.document_id.clone(), cached_pages };
                if let Err(e) = self.store.store(&key, version, meta).await {
                    tracing::warn!(document_id = %snapshot.document_id, error = %e, "failed to write render stamp");
                }
            }
        }

        slots.into_iter().flatten().collect()
    }

    /// Render every missed page in one session; returns the pages whose
    /// artifacts were persisted.
    async fn render_misses(
        &self, snapshot: &SnapshotState, dir: &Path, page_ids: &[String], misses: &[usize],
        slots: &mut [Option<PageRender>],
    ) -> Vec<String> {
        let mut persisted = Vec::new();

        if let Err(e) = tokio::fs::create_dir_all(dir).await {
            for &idx in misses {
                slots[idx] = Some(PageRender::failed(&page_ids[idx], format!("render directory unavailable: {e}")));
            }
            return persisted;
        }

        let mut session = match self.backend.start(&snapshot.dir).await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(document_id = %snapshot.document_id, error = %e, "failed to start render session");
                for &idx in misses {
                    slots[idx] = Some(PageRender::failed(&page_ids[idx], &e));
                }
                return persisted;
            }
        };

        for &idx in misses {
            let page = &page_ids[idx];
            if persisted.contains(page) {
                let reused = slots.iter().flatten().find(|r| &r.page == page).cloned();
                slots[idx] = reused;
                continue;
            }

            let rendered = match session.render(&format!("{page}.html")).await {
                Ok(rendered) => rendered,
                Err(e) => {
                    tracing::warn!(document_id = %snapshot.document_id, page = %page, error = %e, "page render failed");
                    slots[idx] = Some(PageRender::failed(page, e));
                    continue;
                }
            };

            let stem = safe_file_stem(page);
            let image_path = dir.join(format!("{stem}.png"));
            let written = match tokio::fs::write(&image_path, &rendered.image).await {
                Ok(()) => tokio::fs::write(dir.join(format!("{stem}.txt")), &rendered.text).await,
                Err(e) => Err(e),
            };
            match written {
                Ok(()) => persisted.push(page.clone()),
                Err(e) => tracing::warn!(page = %page, error = %e, "failed to persist render artifact"),
            }

            let artifact = PageArtifact {
                page_id: page.clone(),
                version: snapshot.version.clone(),
                image: rendered.image,
                text: rendered.text,
                image_path,
            };
            slots[idx] = Some(PageRender { page: page.clone(), outcome: RenderOutcome::Rendered { artifact, from_cache: false } });
        }

        session.close().await;
        tracing::info!(document_id = %snapshot.document_id, rendered = persisted.len(), "render session closed");
        persisted
    }
}

async fn read_artifact(dir: &Path, page: &str, version: &VersionToken) -> Option<PageArtifact> {
    let stem = safe_file_stem(page);
    let image_path = dir.join(format!("{stem}.png"));
    let image = tokio::fs::read(&image_path).await.ok()?;
    let text = tokio::fs::read_to_string(dir.join(format!("{stem}.txt"))).await.ok()?;

    Some(PageArtifact { page_id: page.to_string(), version: version.clone(), image: Bytes::from(image), text, image_path })
}
