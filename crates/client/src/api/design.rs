//! UI design listings and slice extraction.
//!
//! A design's layer tree is the JSON referenced by its latest version. Any
//! object carrying `ddsImage.imageUrl` is an exported slice. Child layers sit
//! under `layers`; other nested objects and arrays are searched too, without
//! extending the layer path.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use lanhu_core::VersionToken;

use super::response::{VersionInfo, format_time, string_or_number};

/// Payload of `/api/project/images`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DesignList {
    /// Project name.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub images: Vec<DesignImage>,
}

/// One design image of a project.
#[derive(Debug, Clone, Deserialize)]
pub struct DesignImage {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub width: Option<Value>,
    #[serde(default)]
    pub height: Option<Value>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub has_comment: bool,
    #[serde(default)]
    pub update_time: Option<String>,
}

/// A design as listed to callers, numbered from 1.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DesignSummary {
    pub index: usize,
    pub id: String,
    pub name: String,
    pub width: Option<Value>,
    pub height: Option<Value>,
    pub url: Option<String>,
    pub has_comment: bool,
    pub update_time: Option<String>,
}

impl DesignList {
    pub fn summaries(&self) -> Vec<DesignSummary> {
        self.images
            .iter()
            .enumerate()
            .map(|(i, image)| DesignSummary {
                index: i + 1,
                id: image.id.clone(),
                name: image.name.clone(),
                width: image.width.clone(),
                height: image.height.clone(),
                url: image.url.clone(),
                has_comment: image.has_comment,
                update_time: image.update_time.as_deref().map(format_time),
            })
            .collect()
    }

    /// Exact-name lookup.
    pub fn find(&self, name: &str) -> Option<&DesignImage> {
        self.images.iter().find(|image| image.name == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.images.iter().map(|image| image.name.as_str()).collect()
    }
}

/// Payload of `/api/project/image` requested with `dds_status=1`.
#[derive(Debug, Clone, Deserialize)]
pub struct DesignInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub width: Option<Value>,
    #[serde(default)]
    pub height: Option<Value>,
    #[serde(default)]
    pub update_time: Option<String>,
    #[serde(default)]
    pub versions: Vec<VersionInfo>,
}

impl DesignInfo {
    pub fn latest(&self) -> Option<&VersionInfo> {
        self.versions.first()
    }

    pub fn latest_token(&self) -> Option<VersionToken> {
        self.latest().map(|v| VersionToken::new(v.id.clone()))
    }
}

/// An exported slice found in a design's layer tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DesignSlice {
    pub id: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub slice_type: Option<String>,
    pub download_url: String,
    pub size: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<SlicePosition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_name: Option<String>,
    /// Slash-joined layer names from the artboard down to the slice.
    pub layer_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<SliceStyle>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlicePosition {
    pub x: i64,
    pub y: i64,
}

/// Visual properties copied verbatim from the layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SliceStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fills: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub borders: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_style: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shadows: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_radius: Option<Value>,
}

impl SliceStyle {
    fn from_layer(layer: &Map<String, Value>) -> Option<Self> {
        let set = |key: &str| layer.get(key).filter(|v| truthy(v)).cloned();
        let style = Self {
            fills: set("fills"),
            borders: set("borders"),
            opacity: layer.get("opacity").cloned(),
            rotation: set("rotation"),
            text_style: set("textStyle"),
            shadows: set("shadows"),
            border_radius: set("radius"),
        };
        (style != Self::default()).then_some(style)
    }
}

/// All slices of a design JSON, in document order.
pub fn extract_slices(design: &Value, include_style: bool) -> Vec<DesignSlice> {
    let mut slices = Vec::new();
    for item in design.get("info").and_then(Value::as_array).into_iter().flatten() {
        visit(item, None, "", include_style, &mut slices);
    }
    slices
}

fn visit(value: &Value, parent: Option<&str>, path: &str, include_style: bool, slices: &mut Vec<DesignSlice>) {
    let Some(layer) = value.as_object() else {
        return;
    };

    let name = layer.get("name").and_then(Value::as_str).unwrap_or_default();
    let layer_path = if path.is_empty() { name.to_string() } else { format!("{path}/{name}") };

    if let Some(slice) = slice_of(layer, name, parent, &layer_path, include_style) {
        slices.push(slice);
    }

    if let Some(children) = layer.get("layers").and_then(Value::as_array) {
        let child_parent = Some(name).filter(|n| !n.is_empty());
        for child in children {
            visit(child, child_parent, &layer_path, include_style, slices);
        }
    }

    for (key, nested) in layer {
        if key == "layers" {
            continue;
        }
        match nested {
            Value::Object(_) => visit(nested, parent, path, include_style, slices),
            Value::Array(items) => {
                for item in items {
                    visit(item, parent, path, include_style, slices);
                }
            }
            _ => {}
        }
    }
}

fn slice_of(
    layer: &Map<String, Value>, name: &str, parent: Option<&str>, layer_path: &str, include_style: bool,
) -> Option<DesignSlice> {
    let image = layer.get("ddsImage")?.as_object()?;
    let download_url = image.get("imageUrl").and_then(Value::as_str).filter(|u| !u.is_empty())?;

    let position = match (layer.get("left").and_then(number), layer.get("top").and_then(number)) {
        (Some(x), Some(y)) => Some(SlicePosition { x: x as i64, y: y as i64 }),
        _ => None,
    };

    Some(DesignSlice {
        id: layer.get("id").and_then(scalar_string),
        name: name.to_string(),
        slice_type: ["type", "ddsType"]
            .iter()
            .find_map(|key| layer.get(*key).and_then(Value::as_str).filter(|s| !s.is_empty()))
            .map(str::to_string),
        download_url: download_url.to_string(),
        size: image.get("size").cloned(),
        position,
        parent_name: parent.map(str::to_string),
        layer_path: layer_path.to_string(),
        metadata: if include_style { SliceStyle::from_layer(layer) } else { None },
    })
}

fn number(value: &Value) -> Option<f64> {
    value.as_f64().or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
