//! Declarative descriptions of a document's resource graph.

use serde::{Deserialize, Serialize};

/// Pages of a document in document order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentManifest {
    pub pages: Vec<PageEntry>,
}

/// One page of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageEntry {
    /// File name of the page markup inside the snapshot, e.g. `login.html`.
    pub filename: String,
    /// Location of the page markup (absolute URL or CDN-relative sign).
    pub markup: String,
    /// Location of the page's asset manifest, if the page declares one.
    pub asset_manifest: Option<String>,
}

impl PageEntry {
    /// File name without the `.html` extension.
    pub fn stem(&self) -> &str {
        self.filename.strip_suffix(".html").unwrap_or(&self.filename)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Style,
    Script,
    Image,
}

/// Asset a page depends on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRef {
    pub kind: AssetKind,
    /// Path relative to the snapshot directory, e.g. `data/document.js`.
    pub local_path: String,
    pub location: String,
}

/// Styles, scripts and images of one page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetManifest {
    pub assets: Vec<AssetRef>,
}

impl AssetManifest {
    pub fn count(&self, kind: AssetKind) -> usize {
        self.assets.iter().filter(|a| a.kind == kind).count()
    }
}
