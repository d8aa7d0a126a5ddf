//! lanhu_analyze_pages tool implementation.
//!
//! Brings the local snapshot up to the document's latest version, renders the
//! requested pages (serving cached renders where possible), and returns
//! screenshots interleaved with extracted page text.

use std::fmt::Write as _;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use lanhu_client::api::{PageInfo, extract_pages};
use lanhu_core::cache::{PageRender, RenderOutcome, SnapshotState, SnapshotStatus, UpdateReason};
use lanhu_core::Error;

use crate::state::AppState;

/// Which pages to analyze.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum PageSelection {
    /// `"all"`, a page display name, or a filename stem.
    One(String),
    /// Several display names or filename stems.
    Many(Vec<String>),
}

/// Output shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AnalyzeMode {
    /// Screenshots and text.
    #[default]
    Full,
    /// Text only, for a fast scan of many pages.
    TextOnly,
}

/// Parameters for the lanhu_analyze_pages tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AnalyzePagesParams {
    /// Lanhu document URL containing tid, pid and docId.
    pub url: String,

    /// "all", a page name, or a list of page names. Names may be display
    /// names from lanhu_get_pages or filename stems.
    pub page_names: PageSelection,

    /// "full" (default) or "text_only".
    #[serde(default)]
    pub mode: AnalyzeMode,
}

/// A page id to render plus the name shown to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Target {
    id: String,
    display: String,
}

fn resolve_targets(selection: &PageSelection, pages: &[PageInfo]) -> Vec<Target> {
    let lookup = |name: &str| match pages.iter().find(|p| p.name == name) {
        Some(page) => Target { id: page.stem().to_string(), display: page.name.clone() },
        None => {
            let display = pages.iter().find(|p| p.stem() == name).map_or(name, |p| p.name.as_str());
            Target { id: name.to_string(), display: display.to_string() }
        }
    };

    match selection {
        PageSelection::One(name) if name.eq_ignore_ascii_case("all") => {
            pages.iter().map(|p| Target { id: p.stem().to_string(), display: p.name.clone() }).collect()
        }
        PageSelection::One(name) => vec![lookup(name)],
        PageSelection::Many(names) => names.iter().map(|n| lookup(n)).collect(),
    }
}

fn describe_status(status: &SnapshotStatus) -> String {
    match status {
        SnapshotStatus::Cached => "cached".into(),
        SnapshotStatus::Downloaded => "downloaded".into(),
        SnapshotStatus::Updated { reason: UpdateReason::VersionChanged { previous } } => {
            format!("updated (version changed from {})", previous.short())
        }
        SnapshotStatus::Updated { reason: UpdateReason::FilesMissing { missing } } => {
            format!("updated ({} missing files)", missing.len())
        }
        SnapshotStatus::Updated { reason: UpdateReason::Forced } => "updated (forced)".into(),
    }
}

fn build_contents(
    mode: AnalyzeMode, snapshot: &SnapshotState, targets: &[Target], results: &[PageRender],
) -> Vec<Content> {
    let rendered: Vec<(&Target, &PageRender)> =
        targets.iter().zip(results).filter(|(_, r)| r.artifact().is_some()).collect();
    let from_cache = results.iter().filter(|r| r.from_cache()).count();
    let all_cached = from_cache == results.len() && from_cache > 0;

    let mut header = String::new();
    let _ = writeln!(
        header,
        "{} {} | Version: {}",
        if all_cached { "[cached]" } else { "[rendered]" },
        match mode {
            AnalyzeMode::Full => "FULL MODE",
            AnalyzeMode::TextOnly => "TEXT_ONLY MODE",
        },
        snapshot.version.short()
    );
    let _ = writeln!(header, "Total {}/{} pages, {} from cache", rendered.len(), targets.len(), from_cache);
    let _ = writeln!(header, "Snapshot: {}", describe_status(&snapshot.status));
    if !snapshot.failures.is_empty() {
        let _ = writeln!(header, "Snapshot files that failed to download: {}", snapshot.failures.len());
    }
    if mode == AnalyzeMode::Full && !rendered.is_empty() {
        let _ = writeln!(header, "\nImages below are in page order; image N matches page text N.");
    }

    let mut contents = vec![Content::text(header)];

    if mode == AnalyzeMode::Full {
        for (_, result) in &rendered {
            if let Some(artifact) = result.artifact() {
                contents.push(Content::image(STANDARD.encode(&artifact.image), "image/png"));
            }
        }
    }

    let mut texts = String::new();
    for (idx, (target, result)) in rendered.iter().enumerate() {
        if let Some(artifact) = result.artifact() {
            let _ = write!(texts, "Page {}: {}\n{}\n\n", idx + 1, target.display, artifact.text.trim_end());
        }
    }
    if !texts.is_empty() {
        contents.push(Content::text(texts));
    }

    let failures: Vec<String> = targets
        .iter()
        .zip(results)
        .filter_map(|(target, result)| match &result.outcome {
            RenderOutcome::Failed { reason } => Some(format!("- {}: {}", target.display, reason)),
            RenderOutcome::Rendered { .. } => None,
        })
        .collect();
    if !failures.is_empty() {
        contents.push(Content::text(format!("Failed pages:\n{}", failures.join("\n"))));
    }

    contents
}

/// Implementation of the lanhu_analyze_pages tool.
pub async fn analyze_impl(state: &AppState, params: AnalyzePagesParams) -> Result<CallToolResult, McpError> {
    if matches!(&params.page_names, PageSelection::Many(names) if names.is_empty()) {
        return Err(Error::InvalidInput("page_names cannot be empty".into()).into());
    }

    let document = state.remote_document(&params.url).await?;
    let raw_manifest = state.manifest(&document).await?;
    let manifest = raw_manifest.to_manifest();
    let pages = extract_pages(&raw_manifest.sitemap.root_nodes);

    let snapshot = state.snapshots.ensure(&document.doc_id, &document.version, &manifest).await?;

    let targets = resolve_targets(&params.page_names, &pages);
    let ids: Vec<String> = targets.iter().map(|t| t.id.clone()).collect();
    let results = state.renders.get_or_render(&snapshot, &ids).await;

    tracing::info!(
        doc_id = %document.doc_id,
        version = %document.version,
        requested = ids.len(),
        rendered = results.iter().filter(|r| r.artifact().is_some()).count(),
        from_cache = results.iter().filter(|r| r.from_cache()).count(),
        "analyzed pages"
    );

    Ok(CallToolResult::success(build_contents(params.mode, &snapshot, &targets, &results)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use lanhu_core::VersionToken;
    use lanhu_core::cache::PageArtifact;
    use std::path::PathBuf;

    fn page(name: &str, filename: &str) -> PageInfo {
        PageInfo {
            index: 1,
            name: name.into(),
            filename: filename.into(),
            id: String::new(),
            page_type: "Wireframe".into(),
            level: 0,
            folder: "root".into(),
            path: name.into(),
            has_children: false,
        }
    }

    fn pages() -> Vec<PageInfo> {
        vec![page("Login", "login.html"), page("Home Page", "home.html")]
    }

    #[test]
    fn test_resolve_all() {
        let targets = resolve_targets(&PageSelection::One("ALL".into()), &pages());
        let ids: Vec<_> = targets.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["login", "home"]);
    }

    #[test]
    fn test_resolve_display_names_and_stems() {
        let targets = resolve_targets(
            &PageSelection::Many(vec!["Home Page".into(), "login".into(), "ghost".into()]),
            &pages(),
        );
        assert_eq!(targets[0], Target { id: "home".into(), display: "Home Page".into() });
        assert_eq!(targets[1], Target { id: "login".into(), display: "Login".into() });
        assert_eq!(targets[2], Target { id: "ghost".into(), display: "ghost".into() });
    }

    #[test]
    fn test_page_selection_deserializes_string_or_list() {
        let one: PageSelection = serde_json::from_str(r#""all""#).unwrap();
        assert_eq!(one, PageSelection::One("all".into()));
        let many: PageSelection = serde_json::from_str(r#"["a", "b"]"#).unwrap();
        assert_eq!(many, PageSelection::Many(vec!["a".into(), "b".into()]));

        let params: AnalyzePagesParams = serde_json::from_str(r#"{"url": "u", "page_names": "all"}"#).unwrap();
        assert_eq!(params.mode, AnalyzeMode::Full);
        let params: AnalyzePagesParams =
            serde_json::from_str(r#"{"url": "u", "page_names": "all", "mode": "text_only"}"#).unwrap();
        assert_eq!(params.mode, AnalyzeMode::TextOnly);
    }

    fn snapshot() -> SnapshotState {
        SnapshotState {
            document_id: "d1".into(),
            version: VersionToken::new("0123456789abcdef"),
            dir: PathBuf::from("/tmp/d1"),
            status: SnapshotStatus::Cached,
            pages: vec!["login.html".into(), "home.html".into()],
            failures: Vec::new(),
        }
    }

    fn rendered(page: &str, from_cache: bool) -> PageRender {
        PageRender {
            page: page.into(),
            outcome: RenderOutcome::Rendered {
                artifact: PageArtifact {
                    page_id: page.into(),
                    version: VersionToken::new("0123456789abcdef"),
                    image: Bytes::from_static(b"png"),
                    text: format!("text of {page}"),
                    image_path: PathBuf::from(format!("/tmp/{page}.png")),
                },
                from_cache,
            },
        }
    }

    #[test]
    fn test_full_mode_contents() {
        let targets = resolve_targets(&PageSelection::Many(vec!["Login".into(), "Home Page".into()]), &pages());
        let results = vec![
            rendered("login", true),
            PageRender { page: "home".into(), outcome: RenderOutcome::Failed { reason: "render timeout".into() } },
        ];

        let contents = build_contents(AnalyzeMode::Full, &snapshot(), &targets, &results);
        assert_eq!(contents.len(), 4);

        let header = serde_json::to_value(&contents[0]).unwrap();
        let header = header["text"].as_str().unwrap();
        assert!(header.contains("FULL MODE | Version: 01234567"));
        assert!(header.contains("Total 1/2 pages, 1 from cache"));

        let image = serde_json::to_value(&contents[1]).unwrap();
        assert_eq!(image["mimeType"], "image/png");
        assert_eq!(image["data"], STANDARD.encode(b"png"));

        let texts = serde_json::to_value(&contents[2]).unwrap();
        assert!(texts["text"].as_str().unwrap().contains("Page 1: Login\ntext of login"));

        let failures = serde_json::to_value(&contents[3]).unwrap();
        assert!(failures["text"].as_str().unwrap().contains("- Home Page: render timeout"));
    }

    #[test]
    fn test_text_only_mode_has_no_images() {
        let targets = resolve_targets(&PageSelection::One("all".into()), &pages());
        let results = vec![rendered("login", true), rendered("home", true)];

        let contents = build_contents(AnalyzeMode::TextOnly, &snapshot(), &targets, &results);
        assert_eq!(contents.len(), 2);
        let header = serde_json::to_value(&contents[0]).unwrap();
        assert!(header["text"].as_str().unwrap().starts_with("[cached] TEXT_ONLY MODE"));
    }

    #[test]
    fn test_describe_status() {
        let status = SnapshotStatus::Updated {
            reason: UpdateReason::VersionChanged { previous: VersionToken::new("abcdefghijkl") },
        };
        assert_eq!(describe_status(&status), "updated (version changed from abcdefgh)");
    }

    #[tokio::test]
    async fn test_empty_page_list_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let state = crate::state::tests::offline_state(dir.path()).await;
        let params = AnalyzePagesParams {
            url: "tid=t&pid=p&docId=d".into(),
            page_names: PageSelection::Many(vec![]),
            mode: AnalyzeMode::Full,
        };
        let err = analyze_impl(&state, params).await.unwrap_err();
        assert_eq!(err.code.0, -32602);
    }
}
