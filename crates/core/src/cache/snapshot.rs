//! Local snapshots of a document's resource graph.
//!
//! [`DocumentSnapshotManager::ensure`] reconciles the on-disk snapshot of a
//! document with the version the remote currently reports:
//!
//! - nothing recorded: full fetch, status `Downloaded`
//! - recorded for another version: entry evicted, full fetch, `Updated { VersionChanged }`
//! - recorded for this version but a declared file is gone: full fetch, `Updated { FilesMissing }`
//! - recorded for this version and complete: `Cached`, no network work
//!
//! Individual file failures never abort a fetch. The file stays declared in
//! the snapshot metadata so the next integrity check sees it missing and
//! triggers another full fetch.

use async_trait::async_trait;
use bytes::Bytes;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::key::{ResourceKey, VersionToken};
use super::manifest::{AssetKind, AssetManifest, AssetRef, DocumentManifest};
use super::store::{EntryStamp, FileStore, Lookup, VersionedStore};
use crate::Error;

/// Document-wide script shipped with every page's asset manifest. Only the
/// copy declared by the first page is downloaded.
pub const SHARED_SCRIPT: &str = "data/document.js";

/// Where snapshot content comes from.
#[async_trait]
pub trait ResourceSource: Send + Sync {
    /// Page markup, ready to be written to disk.
    async fn fetch_markup(&self, location: &str) -> Result<Bytes, Error>;

    async fn fetch_asset_manifest(&self, location: &str) -> Result<AssetManifest, Error>;

    async fn fetch_asset(&self, location: &str) -> Result<Bytes, Error>;
}

/// Payload recorded in `.snapshot_cache.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    pub document_id: String,
    /// Page markup files that were written, in document order.
    pub pages: Vec<String>,
    /// Every file the snapshot declares, written or not.
    pub files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UpdateReason {
    VersionChanged { previous: VersionToken },
    FilesMissing { missing: Vec<String> },
    Forced,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SnapshotStatus {
    Cached,
    Downloaded,
    Updated { reason: UpdateReason },
}

/// A file that could not be fetched or written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct FetchFailure {
    pub path: String,
    pub reason: String,
}

/// Outcome of [`DocumentSnapshotManager::ensure`].
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct SnapshotState {
    pub document_id: String,
    pub version: VersionToken,
    pub dir: PathBuf,
    pub status: SnapshotStatus,
    pub pages: Vec<String>,
    pub failures: Vec<FetchFailure>,
}

#[derive(Default)]
struct FetchReport {
    pages: Vec<String>,
    files: Vec<String>,
    failures: Vec<FetchFailure>,
}

impl FetchReport {
    fn declare(&mut self, path: &str) {
        if !self.files.iter().any(|f| f == path) {
            self.files.push(path.to_string());
        }
    }

    fn fail(&mut self, path: &str, reason: impl ToString) {
        self.failures.push(FetchFailure { path: path.to_string(), reason: reason.to_string() });
    }
}

pub struct DocumentSnapshotManager<S> {
    store: FileStore<SnapshotMeta>,
    source: Arc<S>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl<S: ResourceSource> DocumentSnapshotManager<S> {
    pub fn new(root: impl Into<PathBuf>, source: Arc<S>) -> Self {
        Self { store: FileStore::new(root), source, locks: Mutex::new(HashMap::new()) }
    }

    /// Directory holding the snapshot of `document_id`.
    pub fn dir(&self, document_id: &str) -> PathBuf {
        self.store.entry_dir(&ResourceKey::snapshot(document_id))
    }

    /// Recorded version, without consulting the remote.
    pub async fn recorded(&self, document_id: &str) -> Option<EntryStamp> {
        self.store.stamp(&ResourceKey::snapshot(document_id)).await
    }

    pub async fn purge(&self, document_id: &str) {
        let guard = self.lock(document_id).await;
        let _held = guard.lock().await;
        self.store.evict(&ResourceKey::snapshot(document_id)).await;
    }

    /// Make sure the local snapshot matches `version`, fetching whatever is needed.
    pub async fn ensure(
        &self, document_id: &str, version: &VersionToken, manifest: &DocumentManifest,
    ) -> Result<SnapshotState, Error> {
        let guard = self.lock(document_id).await;
        let _held = guard.lock().await;

        let key = ResourceKey::snapshot(document_id);
        let status = match self.store.lookup(&key, version).await {
            Lookup::Hit(meta) => {
                let missing = self.missing_files(&key, &meta, manifest).await;
                if missing.is_empty() {
                    tracing::debug!(document_id, version = %version, pages = meta.pages.len(), "snapshot up to date");
                    return Ok(SnapshotState {
                        document_id: document_id.to_string(),
                        version: version.clone(),
                        dir: self.store.entry_dir(&key),
                        status: SnapshotStatus::Cached,
                        pages: meta.pages,
                        failures: Vec::new(),
                    });
                }
                tracing::info!(document_id, missing = missing.len(), "snapshot incomplete, refetching");
                SnapshotStatus::Updated { reason: UpdateReason::FilesMissing { missing } }
            }
            Lookup::Stale(previous) => {
                tracing::info!(document_id, previous = %previous, current = %version, "snapshot version changed");
                SnapshotStatus::Updated { reason: UpdateReason::VersionChanged { previous } }
            }
            Lookup::Miss => SnapshotStatus::Downloaded,
        };

        self.fetch_all(&key, version, manifest, status).await
    }

    /// Discard whatever is recorded and fetch everything again.
    pub async fn refetch(
        &self, document_id: &str, version: &VersionToken, manifest: &DocumentManifest,
    ) -> Result<SnapshotState, Error> {
        let guard = self.lock(document_id).await;
        let _held = guard.lock().await;

        let key = ResourceKey::snapshot(document_id);
        self.fetch_all(&key, version, manifest, SnapshotStatus::Updated { reason: UpdateReason::Forced }).await
    }

    async fn lock(&self, document_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(document_id.to_string()).or_default().clone()
    }

    async fn missing_files(&self, key: &ResourceKey, meta: &SnapshotMeta, manifest: &DocumentManifest) -> Vec<String> {
        let dir = self.store.entry_dir(key);
        let pages = manifest.pages.iter().map(|p| &p.filename).filter(|f| is_safe_relative(f));
        let declared = meta.files.iter().chain(pages);

        let mut seen = HashSet::new();
        let mut missing = Vec::new();
        for file in declared {
            if !seen.insert(file.as_str()) {
                continue;
            }
            if !tokio::fs::try_exists(dir.join(file)).await.unwrap_or(false) {
                missing.push(file.clone());
            }
        }
        missing
    }

    async fn fetch_all(
        &self, key: &ResourceKey, version: &VersionToken, manifest: &DocumentManifest, status: SnapshotStatus,
    ) -> Result<SnapshotState, Error> {
        self.store.evict(key).await;
        let dir = self.store.entry_dir(key);
        tokio::fs::create_dir_all(&dir).await?;

        let mut report = FetchReport::default();
        let mut fetched: HashSet<String> = HashSet::new();
        let mut shared_script_claimed = false;

        for page in &manifest.pages {
            if !is_safe_relative(&page.filename) {
                report.fail(&page.filename, "unsafe page path");
                continue;
            }
            report.declare(&page.filename);

            let markup = match self.source.fetch_markup(&page.markup).await {
                Ok(markup) => markup,
                Err(e) => {
                    tracing::warn!(document_id = %key.id, page = %page.filename, error = %e, "page markup fetch failed");
                    report.fail(&page.filename, e);
                    continue;
                }
            };

            if let Some(location) = &page.asset_manifest {
                let assets = match self.source.fetch_asset_manifest(location).await {
                    Ok(assets) => assets,
                    Err(e) => {
                        tracing::warn!(document_id = %key.id, page = %page.filename, error = %e, "asset manifest fetch failed");
                        report.fail(&page.filename, e);
                        continue;
                    }
                };

                let skip_shared = shared_script_claimed;
                shared_script_claimed = true;

                let mut wanted: Vec<&AssetRef> = Vec::new();
                for asset in &assets.assets {
                    if skip_shared && asset.kind == AssetKind::Script && asset.local_path == SHARED_SCRIPT {
                        continue;
                    }
                    if !is_safe_relative(&asset.local_path) {
                        report.fail(&asset.local_path, "unsafe asset path");
                        continue;
                    }
                    report.declare(&asset.local_path);
                    if fetched.contains(&asset.local_path) || wanted.iter().any(|w| w.local_path == asset.local_path) {
                        continue;
                    }
                    wanted.push(asset);
                }

                let results = join_all(wanted.iter().map(|asset| self.download_asset(&dir, asset))).await;
                for (asset, result) in wanted.iter().zip(results) {
                    match result {
                        Ok(()) => {
                            fetched.insert(asset.local_path.clone());
                        }
                        Err(e) => {
                            tracing::debug!(path = %asset.local_path, error = %e, "asset fetch failed");
                            report.fail(&asset.local_path, e);
                        }
                    }
                }
            }

            match tokio::fs::write(dir.join(&page.filename), &markup).await {
                Ok(()) => report.pages.push(page.filename.clone()),
                Err(e) => report.fail(&page.filename, e),
            }
        }

        let meta = SnapshotMeta { document_id: key.id.clone(), pages: report.pages.clone(), files: report.files };
        self.store.store(key, version, meta).await?;

        tracing::info!(
            document_id = %key.id,
            version = %version,
            pages = report.pages.len(),
            failures = report.failures.len(),
            "snapshot fetched"
        );

        Ok(SnapshotState {
            document_id: key.id.clone(),
            version: version.clone(),
            dir,
            status,
            pages: report.pages,
            failures: report.failures,
        })
    }

    async fn download_asset(&self, dir: &Path, asset: &AssetRef) -> Result<(), Error> {
        let body = self.source.fetch_asset(&asset.location).await?;
        let path = dir.join(&asset.local_path);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &body).await?;
        Ok(())
    }
}

/// Relative path that stays inside the snapshot directory.
fn is_safe_relative(path: &str) -> bool {
    !path.is_empty() && Path::new(path).components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::manifest::PageEntry;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeSource {
        manifests: HashMap<String, AssetManifest>,
        fail_once: StdMutex<HashSet<String>>,
        fail_always: HashSet<String>,
        calls: AtomicUsize,
        fetched: StdMutex<Vec<String>>,
    }

    impl FakeSource {
        fn hit(&self, location: &str) -> Result<(), Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.fetched.lock().unwrap().push(location.to_string());
            if self.fail_always.contains(location) || self.fail_once.lock().unwrap().remove(location) {
                return Err(Error::HttpError(format!("HTTP 500 for {location}")));
            }
            Ok(())
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn fetch_count(&self, location: &str) -> usize {
            self.fetched.lock().unwrap().iter().filter(|l| *l == location).count()
        }
    }

    #[async_trait]
    impl ResourceSource for FakeSource {
        async fn fetch_markup(&self, location: &str) -> Result<Bytes, Error> {
            self.hit(location)?;
            Ok(Bytes::from(format!("<html>{location}</html>")))
        }

        async fn fetch_asset_manifest(&self, location: &str) -> Result<AssetManifest, Error> {
            self.hit(location)?;
            self.manifests.get(location).cloned().ok_or_else(|| Error::NotFound(location.to_string()))
        }

        async fn fetch_asset(&self, location: &str) -> Result<Bytes, Error> {
            self.hit(location)?;
            Ok(Bytes::from(location.to_string()))
        }
    }

    fn asset(kind: AssetKind, local_path: &str, location: &str) -> AssetRef {
        AssetRef { kind, local_path: local_path.into(), location: location.into() }
    }

    fn page(name: &str) -> PageEntry {
        PageEntry {
            filename: format!("{name}.html"),
            markup: format!("md5-{name}"),
            asset_manifest: Some(format!("map-{name}")),
        }
    }

    fn two_page_source() -> FakeSource {
        let mut source = FakeSource::default();
        source.manifests.insert(
            "map-a".into(),
            AssetManifest {
                assets: vec![
                    asset(AssetKind::Style, "resources/css/axure.css", "css-1"),
                    asset(AssetKind::Script, SHARED_SCRIPT, "doc-js-a"),
                    asset(AssetKind::Image, "images/a/logo.png", "img-a"),
                ],
            },
        );
        source.manifests.insert(
            "map-b".into(),
            AssetManifest {
                assets: vec![
                    asset(AssetKind::Script, SHARED_SCRIPT, "doc-js-b"),
                    asset(AssetKind::Script, "files/b/data.js", "js-b"),
                    asset(AssetKind::Image, "images/b/hero.png", "img-b"),
                ],
            },
        );
        source
    }

    fn manifest() -> DocumentManifest {
        DocumentManifest { pages: vec![page("a"), page("b")] }
    }

    #[tokio::test]
    async fn test_first_ensure_downloads_then_second_is_cached_without_fetching() {
        let tmp = tempfile::tempdir().unwrap();
        let source = Arc::new(two_page_source());
        let manager = DocumentSnapshotManager::new(tmp.path(), source.clone());
        let v1 = VersionToken::new("v1");

        let first = manager.ensure("doc", &v1, &manifest()).await.unwrap();
        assert_eq!(first.status, SnapshotStatus::Downloaded);
        assert_eq!(first.pages, vec!["a.html", "b.html"]);
        assert!(first.failures.is_empty());
        assert!(first.dir.join("images/a/logo.png").exists());
        assert!(first.dir.join("files/b/data.js").exists());

        let calls = source.calls();
        let second = manager.ensure("doc", &v1, &manifest()).await.unwrap();
        assert_eq!(second.status, SnapshotStatus::Cached);
        assert_eq!(second.pages, vec!["a.html", "b.html"]);
        assert_eq!(source.calls(), calls);
    }

    #[tokio::test]
    async fn test_shared_script_only_from_first_page() {
        let tmp = tempfile::tempdir().unwrap();
        let source = Arc::new(two_page_source());
        let manager = DocumentSnapshotManager::new(tmp.path(), source.clone());

        let state = manager.ensure("doc", &VersionToken::new("v1"), &manifest()).await.unwrap();

        assert_eq!(source.fetch_count("doc-js-a"), 1);
        assert_eq!(source.fetch_count("doc-js-b"), 0);
        let body = std::fs::read_to_string(state.dir.join(SHARED_SCRIPT)).unwrap();
        assert_eq!(body, "doc-js-a");
    }

    #[tokio::test]
    async fn test_deleted_file_forces_refetch() {
        let tmp = tempfile::tempdir().unwrap();
        let source = Arc::new(two_page_source());
        let manager = DocumentSnapshotManager::new(tmp.path(), source.clone());
        let v1 = VersionToken::new("v1");

        let state = manager.ensure("doc", &v1, &manifest()).await.unwrap();
        std::fs::remove_file(state.dir.join("images/b/hero.png")).unwrap();

        let again = manager.ensure("doc", &v1, &manifest()).await.unwrap();
        assert_eq!(
            again.status,
            SnapshotStatus::Updated { reason: UpdateReason::FilesMissing { missing: vec!["images/b/hero.png".into()] } }
        );
        assert!(again.dir.join("images/b/hero.png").exists());
        assert_eq!(manager.ensure("doc", &v1, &manifest()).await.unwrap().status, SnapshotStatus::Cached);
    }

    #[tokio::test]
    async fn test_unsafe_page_path_does_not_block_cached_state() {
        let tmp = tempfile::tempdir().unwrap();
        let source = Arc::new(two_page_source());
        let manager = DocumentSnapshotManager::new(tmp.path(), source.clone());
        let v1 = VersionToken::new("v1");
        let unsafe_page = PageEntry { filename: "../evil.html".into(), markup: "md5-evil".into(), asset_manifest: None };
        let manifest = DocumentManifest { pages: vec![page("a"), unsafe_page] };

        let first = manager.ensure("doc", &v1, &manifest).await.unwrap();
        assert_eq!(first.status, SnapshotStatus::Downloaded);
        assert_eq!(first.pages, vec!["a.html"]);
        assert_eq!(first.failures.len(), 1);
        assert_eq!(first.failures[0].path, "../evil.html");
        assert_eq!(source.fetch_count("md5-evil"), 0);
        assert!(!first.dir.parent().unwrap().join("evil.html").exists());

        let calls = source.calls();
        for _ in 0..2 {
            let again = manager.ensure("doc", &v1, &manifest).await.unwrap();
            assert_eq!(again.status, SnapshotStatus::Cached);
        }
        assert_eq!(source.calls(), calls);
    }

    #[tokio::test]
    async fn test_version_change_scenario() {
        let tmp = tempfile::tempdir().unwrap();
        let source = Arc::new(two_page_source());
        let manager = DocumentSnapshotManager::new(tmp.path(), source.clone());
        let v1 = VersionToken::new("v1");
        let v2 = VersionToken::new("v2");

        assert_eq!(manager.ensure("D", &v1, &manifest()).await.unwrap().status, SnapshotStatus::Downloaded);
        assert_eq!(manager.ensure("D", &v1, &manifest()).await.unwrap().status, SnapshotStatus::Cached);

        let updated = manager.ensure("D", &v2, &manifest()).await.unwrap();
        assert_eq!(
            updated.status,
            SnapshotStatus::Updated { reason: UpdateReason::VersionChanged { previous: v1.clone() } }
        );
        assert_eq!(updated.version, v2);
        assert_eq!(manager.recorded("D").await.unwrap().version, v2);
    }

    #[tokio::test]
    async fn test_failing_asset_is_reported_and_retried() {
        let tmp = tempfile::tempdir().unwrap();
        let source = two_page_source();
        source.fail_once.lock().unwrap().insert("img-a".into());
        let source = Arc::new(source);
        let manager = DocumentSnapshotManager::new(tmp.path(), source.clone());
        let v1 = VersionToken::new("v1");

        let state = manager.ensure("doc", &v1, &manifest()).await.unwrap();
        assert_eq!(state.status, SnapshotStatus::Downloaded);
        assert_eq!(state.failures.len(), 1);
        assert_eq!(state.failures[0].path, "images/a/logo.png");
        assert_eq!(state.pages, vec!["a.html", "b.html"]);
        assert!(state.dir.join("resources/css/axure.css").exists());
        assert!(state.dir.join("images/b/hero.png").exists());

        let retried = manager.ensure("doc", &v1, &manifest()).await.unwrap();
        assert!(matches!(
            retried.status,
            SnapshotStatus::Updated { reason: UpdateReason::FilesMissing { ref missing } } if missing == &vec!["images/a/logo.png".to_string()]
        ));
        assert!(retried.failures.is_empty());
        assert!(retried.dir.join("images/a/logo.png").exists());
    }

    #[tokio::test]
    async fn test_page_without_asset_manifest_is_not_written() {
        let tmp = tempfile::tempdir().unwrap();
        let mut source = two_page_source();
        source.fail_always.insert("map-b".into());
        let source = Arc::new(source);
        let manager = DocumentSnapshotManager::new(tmp.path(), source.clone());
        let v1 = VersionToken::new("v1");

        let state = manager.ensure("doc", &v1, &manifest()).await.unwrap();
        assert_eq!(state.pages, vec!["a.html"]);
        assert!(!state.dir.join("b.html").exists());
        assert_eq!(state.failures[0].path, "b.html");

        let again = manager.ensure("doc", &v1, &manifest()).await.unwrap();
        assert!(matches!(
            again.status,
            SnapshotStatus::Updated { reason: UpdateReason::FilesMissing { ref missing } } if missing.contains(&"b.html".to_string())
        ));
    }

    #[tokio::test]
    async fn test_unsafe_asset_paths_are_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let mut source = FakeSource::default();
        source.manifests.insert(
            "map-a".into(),
            AssetManifest {
                assets: vec![
                    asset(AssetKind::Image, "../escape.png", "evil-1"),
                    asset(AssetKind::Image, "/etc/passwd", "evil-2"),
                    asset(AssetKind::Image, "images/ok.png", "ok"),
                ],
            },
        );
        let source = Arc::new(source);
        let manager = DocumentSnapshotManager::new(tmp.path().join("cache"), source.clone());

        let state = manager
            .ensure("doc", &VersionToken::new("v1"), &DocumentManifest { pages: vec![page("a")] })
            .await
            .unwrap();

        assert_eq!(state.failures.len(), 2);
        assert_eq!(source.fetch_count("evil-1"), 0);
        assert_eq!(source.fetch_count("evil-2"), 0);
        assert!(state.dir.join("images/ok.png").exists());
        assert!(!tmp.path().join("cache/snapshots/escape.png").exists());
    }

    #[tokio::test]
    async fn test_refetch_is_forced() {
        let tmp = tempfile::tempdir().unwrap();
        let source = Arc::new(two_page_source());
        let manager = DocumentSnapshotManager::new(tmp.path(), source.clone());
        let v1 = VersionToken::new("v1");

        manager.ensure("doc", &v1, &manifest()).await.unwrap();
        let calls = source.calls();

        let state = manager.refetch("doc", &v1, &manifest()).await.unwrap();
        assert_eq!(state.status, SnapshotStatus::Updated { reason: UpdateReason::Forced });
        assert!(source.calls() > calls);
    }

    #[tokio::test]
    async fn test_purge_removes_snapshot() {
        let tmp = tempfile::tempdir().unwrap();
        let manager = DocumentSnapshotManager::new(tmp.path(), Arc::new(two_page_source()));
        let v1 = VersionToken::new("v1");

        manager.ensure("doc", &v1, &manifest()).await.unwrap();
        manager.purge("doc").await;

        assert!(manager.recorded("doc").await.is_none());
        assert!(!manager.dir("doc").exists());
        assert_eq!(manager.ensure("doc", &v1, &manifest()).await.unwrap().status, SnapshotStatus::Downloaded);
    }

    #[test]
    fn test_is_safe_relative() {
        assert!(is_safe_relative("data/document.js"));
        assert!(is_safe_relative("./images/a.png"));
        assert!(!is_safe_relative("../a.png"));
        assert!(!is_safe_relative("/abs.png"));
        assert!(!is_safe_relative(""));
    }
}
