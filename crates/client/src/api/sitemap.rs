//! Page list extraction from a document sitemap.
//!
//! A node with both a name and a url is a page (pages may have child pages).
//! A pure folder is a `Folder` node with no url; a page's folder is its
//! nearest pure-folder ancestor.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Folder reported for pages with no pure-folder ancestor.
pub const ROOT_FOLDER: &str = "root";

/// One node of `sitemap.rootNodes`.
#[derive(Debug, Clone, Deserialize)]
pub struct SitemapNode {
    #[serde(default, rename = "pageName")]
    pub page_name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_node_type", rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub children: Vec<SitemapNode>,
}

fn default_node_type() -> String {
    "Wireframe".into()
}

impl SitemapNode {
    fn is_pure_folder(&self) -> bool {
        self.node_type == "Folder" && self.url.is_empty()
    }
}

/// A navigable page of the document.
#[derive(Debug, Clone, PartialEq, Serialize, schemars::JsonSchema)]
pub struct PageInfo {
    /// 1-based position in sitemap order.
    pub index: usize,
    pub name: String,
    /// Markup file name, e.g. `login.html`.
    pub filename: String,
    pub id: String,
    #[serde(rename = "type")]
    pub page_type: String,
    pub level: usize,
    pub folder: String,
    /// Slash-joined names from the root down to this node.
    pub path: String,
    pub has_children: bool,
}

impl PageInfo {
    /// Filename without the `.html` extension, used as the page id.
    pub fn stem(&self) -> &str {
        self.filename.strip_suffix(".html").unwrap_or(&self.filename)
    }
}

/// Flatten the sitemap into pages in depth-first order.
pub fn extract_pages(nodes: &[SitemapNode]) -> Vec<PageInfo> {
    let mut pages = Vec::new();
    walk(nodes, "", 0, None, &mut pages);
    pages
}

fn walk(nodes: &[SitemapNode], parent_path: &str, level: usize, folder: Option<&str>, pages: &mut Vec<PageInfo>) {
    for node in nodes {
        let path =
            if parent_path.is_empty() { node.page_name.clone() } else { format!("{parent_path}/{}", node.page_name) };

        if !node.page_name.is_empty() && !node.url.is_empty() {
            pages.push(PageInfo {
                index: pages.len() + 1,
                name: node.page_name.clone(),
                filename: node.url.clone(),
                id: node.id.clone(),
                page_type: node.node_type.clone(),
                level,
                folder: folder.unwrap_or(ROOT_FOLDER).to_string(),
                path: path.clone(),
                has_children: !node.children.is_empty(),
            });
        }

        if !node.children.is_empty() {
            let next_folder = if node.is_pure_folder() { Some(node.page_name.as_str()) } else { folder };
            walk(&node.children, &path, level + 1, next_folder, pages);
        }
    }
}

/// Aggregate figures over a page list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, schemars::JsonSchema)]
pub struct PageListStats {
    pub total_pages: usize,
    pub max_level: usize,
    pub pages_with_children: usize,
    /// Page count per folder.
    pub folder_statistics: BTreeMap<String, usize>,
}

impl PageListStats {
    pub fn from_pages(pages: &[PageInfo]) -> Self {
        let mut stats = Self { total_pages: pages.len(), ..Self::default() };
        for page in pages {
            *stats.folder_statistics.entry(page.folder.clone()).or_default() += 1;
            stats.max_level = stats.max_level.max(page.level);
            if page.has_children {
                stats.pages_with_children += 1;
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sitemap() -> Vec<SitemapNode> {
        serde_json::from_str(
            r#"[
                {"pageName": "Home", "url": "home.html", "id": "p1", "children": [
                    {"pageName": "Detail", "url": "detail.html", "id": "p2"}
                ]},
                {"pageName": "Account", "type": "Folder", "url": "", "children": [
                    {"pageName": "Login", "url": "login.html", "id": "p3"},
                    {"pageName": "Nested", "type": "Folder", "children": [
                        {"pageName": "Reset", "url": "reset.html", "id": "p4"}
                    ]}
                ]},
                {"pageName": "", "url": "orphan.html"}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn test_extract_pages_walks_depth_first() {
        let pages = extract_pages(&sitemap());
        let names: Vec<_> = pages.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Home", "Detail", "Login", "Reset"]);
        assert_eq!(pages.iter().map(|p| p.index).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_folder_is_nearest_pure_folder() {
        let pages = extract_pages(&sitemap());
        assert_eq!(pages[0].folder, ROOT_FOLDER);
        assert_eq!(pages[1].folder, ROOT_FOLDER);
        assert_eq!(pages[2].folder, "Account");
        assert_eq!(pages[3].folder, "Nested");
        assert_eq!(pages[3].path, "Account/Nested/Reset");
        assert_eq!(pages[3].level, 2);
    }

    #[test]
    fn test_page_fields() {
        let pages = extract_pages(&sitemap());
        assert!(pages[0].has_children);
        assert_eq!(pages[0].page_type, "Wireframe");
        assert_eq!(pages[0].stem(), "home");
        assert_eq!(pages[1].path, "Home/Detail");
    }

    #[test]
    fn test_stats() {
        let stats = PageListStats::from_pages(&extract_pages(&sitemap()));
        assert_eq!(stats.total_pages, 4);
        assert_eq!(stats.max_level, 2);
        assert_eq!(stats.pages_with_children, 1);
        assert_eq!(stats.folder_statistics.get(ROOT_FOLDER), Some(&2));
        assert_eq!(stats.folder_statistics.get("Account"), Some(&1));
    }
}
