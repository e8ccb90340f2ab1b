//! Figma REST client for template-driven cards.
//!
//! A card template lives in Figma as a frame with named text layers. The
//! client resolves those layers to pixel boxes ([`FigmaClient::fetch_layout`])
//! and exports the frame itself as a bitmap ([`FigmaClient::render_frame`]);
//! the card pipeline then pastes a background into the template's background
//! boxes and draws text into the slot boxes.
//!
//! Slot and background values are looked up by node id when they have node-id
//! shape (`123:45`), otherwise by layer name within the frame subtree. A slot
//! with no configured value at all defaults to its own key as the layer name,
//! and is silently absent from the layout when the template has no such layer.

use std::collections::BTreeMap;
use std::time::Duration;

use image::RgbaImage;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde_json::Value;
use thiserror::Error;

use crate::render::layout::Region;

/// Environment variable holding the Figma personal access token.
pub const TOKEN_ENV: &str = "FIGMA_API_KEY";

/// Older installs exported the token under this name; still honored.
pub const LEGACY_TOKEN_ENV: &str = "FIGMA_ACCESS_TOKEN";

const API_BASE: &str = "https://api.figma.com/v1";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum FigmaError {
    #[error("Figma API token is missing or was rejected; set {TOKEN_ENV}")]
    NotConfigured,
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("Figma API error (status {status}): {body}")]
    Api { status: StatusCode, body: String },
    #[error("unexpected Figma response: {0}")]
    Response(&'static str),
    #[error("node {0} is missing from the Figma response")]
    MissingNode(String),
    #[error("node {0} has no bounding box")]
    MissingBounds(String),
    #[error("layer '{0}' was not found in the frame")]
    LayerNotFound(String),
    #[error("Figma did not return a render URL for node {0}")]
    MissingImageUrl(String),
    #[error("could not decode rendered frame: {0}")]
    Image(#[from] image::ImageError),
}

/// Absolute bounding box of one Figma node, in file coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeBounds {
    pub node_id: String,
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl NodeBounds {
    /// Translate file coordinates into a pixel box on a frame rendered at
    /// `scale`, where `origin` is the frame's own top-left corner.
    ///
    /// Corners are rounded independently so adjacent boxes stay adjacent
    /// after scaling.
    pub fn to_box(&self, scale: f64, origin_x: f64, origin_y: f64) -> Region {
        let x0 = (self.x - origin_x) * scale;
        let y0 = (self.y - origin_y) * scale;
        let x1 = x0 + self.width * scale;
        let y1 = y0 + self.height * scale;
        Region::from_corners(
            x0.round() as i32,
            y0.round() as i32,
            x1.round() as i32,
            y1.round() as i32,
        )
    }
}

/// Resolved geometry for one template frame.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateLayout {
    pub frame: NodeBounds,
    pub slots: BTreeMap<String, NodeBounds>,
    pub backgrounds: Vec<NodeBounds>,
    pub scale: f64,
}

impl TemplateLayout {
    /// Pixel box for a slot on the rendered frame, `None` when the template
    /// has no layer for it.
    pub fn slot_box(&self, slot: &str) -> Option<Region> {
        let node = self.slots.get(slot)?;
        Some(node.to_box(self.scale, self.frame.x, self.frame.y))
    }

    /// Pixel boxes for every background layer, in configuration order.
    pub fn background_boxes(&self) -> Vec<Region> {
        self.backgrounds
            .iter()
            .map(|node| node.to_box(self.scale, self.frame.x, self.frame.y))
            .collect()
    }
}

/// Read the access token from the environment. Blank values count as unset.
pub fn get_token() -> Option<String> {
    for var in [TOKEN_ENV, LEGACY_TOKEN_ENV] {
        if let Ok(token) = std::env::var(var) {
            let token = token.trim();
            if !token.is_empty() {
                return Some(token.to_string());
            }
        }
    }
    None
}

/// Thin wrapper around the Figma REST API, authenticated with a personal
/// access token.
pub struct FigmaClient {
    token: String,
    client: Client,
}

impl FigmaClient {
    pub fn new(token: impl Into<String>) -> Result<Self, FigmaError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(FigmaError::NotConfigured);
        }
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| FigmaError::Http(e.to_string()))?;
        Ok(Self { token, client })
    }

    /// Build a client from `FIGMA_API_KEY` (or the legacy variable).
    pub fn from_env() -> Result<Self, FigmaError> {
        Self::new(get_token().ok_or(FigmaError::NotConfigured)?)
    }

    /// Resolve the frame and its slot/background layers to bounding boxes.
    ///
    /// `slot_ids` maps slot keys (`title`, `subtitle`, ...) to configured
    /// node ids or layer names; see the module docs for the resolution rules.
    /// `backgrounds` entries follow the same id-or-name dispatch but must
    /// resolve; a missing background layer is an error.
    pub fn fetch_layout(
        &self,
        file_key: &str,
        frame_id: &str,
        slot_ids: &BTreeMap<String, String>,
        backgrounds: &[String],
        scale: f64,
    ) -> Result<TemplateLayout, FigmaError> {
        let mut ids = vec![frame_id.to_string()];
        ids.extend(
            slot_ids
                .values()
                .chain(backgrounds)
                .filter(|value| looks_like_node_id(value))
                .map(|value| value.trim().to_string()),
        );

        let payload = self.get_json(
            &format!("{API_BASE}/files/{file_key}/nodes"),
            &[("ids", ids.join(","))],
        )?;
        let nodes = payload
            .get("nodes")
            .and_then(Value::as_object)
            .ok_or(FigmaError::Response("no node data"))?;

        let frame_doc = nodes
            .get(frame_id)
            .and_then(|entry| entry.get("document"))
            .ok_or_else(|| FigmaError::MissingNode(frame_id.to_string()))?;
        let frame = bounds_from_node(frame_doc)?;

        let mut slots = BTreeMap::new();
        for (slot, configured) in slot_ids {
            let configured = configured.trim();
            let node = if looks_like_node_id(configured) {
                let doc = nodes
                    .get(configured)
                    .and_then(|entry| entry.get("document"))
                    .ok_or_else(|| FigmaError::MissingNode(configured.to_string()))?;
                Some(doc)
            } else if !configured.is_empty() {
                Some(
                    find_by_name(frame_doc, configured, false)
                        .ok_or_else(|| FigmaError::LayerNotFound(configured.to_string()))?,
                )
            } else {
                // Unconfigured slot: the key itself is the default layer
                // name, and absence is not an error.
                find_by_name(frame_doc, slot, false)
            };
            if let Some(node) = node {
                slots.insert(slot.clone(), bounds_from_node(node)?);
            }
        }

        let mut resolved_backgrounds = Vec::new();
        for configured in backgrounds {
            let configured = configured.trim();
            if configured.is_empty() {
                continue;
            }
            let node = if looks_like_node_id(configured) {
                nodes
                    .get(configured)
                    .and_then(|entry| entry.get("document"))
                    .ok_or_else(|| FigmaError::MissingNode(configured.to_string()))?
            } else {
                find_by_name(frame_doc, configured, true)
                    .ok_or_else(|| FigmaError::LayerNotFound(configured.to_string()))?
            };
            resolved_backgrounds.push(bounds_from_node(node)?);
        }

        Ok(TemplateLayout {
            frame,
            slots,
            backgrounds: resolved_backgrounds,
            scale,
        })
    }

    /// Export the frame as a bitmap: one call for the render URL, one
    /// download. No retries; a busy renderer surfaces as an API error.
    pub fn render_frame(
        &self,
        file_key: &str,
        frame_id: &str,
        format: &str,
        scale: f64,
    ) -> Result<RgbaImage, FigmaError> {
        let payload = self.get_json(
            &format!("{API_BASE}/images/{file_key}"),
            &[
                ("ids", frame_id.to_string()),
                ("format", format.to_string()),
                ("scale", scale.to_string()),
            ],
        )?;

        let url = payload
            .pointer(&format!("/images/{}", pointer_escape(frame_id)))
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| FigmaError::MissingImageUrl(frame_id.to_string()))?;

        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| FigmaError::Http(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(FigmaError::Api { status, body });
        }
        let bytes = response
            .bytes()
            .map_err(|e| FigmaError::Http(e.to_string()))?;
        Ok(image::load_from_memory(&bytes)?.to_rgba8())
    }

    fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value, FigmaError> {
        let response = self
            .client
            .get(url)
            .header("X-Figma-Token", &self.token)
            .header("Accept", "application/json")
            .query(query)
            .send()
            .map_err(|e| FigmaError::Http(e.to_string()))?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(FigmaError::NotConfigured);
        }
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(FigmaError::Api { status, body });
        }
        response
            .json::<Value>()
            .map_err(|e| FigmaError::Http(e.to_string()))
    }
}

/// Figma node ids look like `123:45` (instance children extend the shape
/// with `;`); layer names for card slots realistically never contain `:`.
fn looks_like_node_id(value: &str) -> bool {
    value.contains(':')
}

/// JSON Pointer escaping for node ids used as object keys.
fn pointer_escape(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}

fn bounds_from_node(node: &Value) -> Result<NodeBounds, FigmaError> {
    let name = node
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let node_id = match node.get("id").and_then(Value::as_str) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => name.clone(),
    };
    let bbox = node
        .get("absoluteBoundingBox")
        .and_then(Value::as_object)
        .ok_or_else(|| FigmaError::MissingBounds(node_id.clone()))?;
    let field = |key: &str| bbox.get(key).and_then(Value::as_f64).unwrap_or(0.0);
    Ok(NodeBounds {
        node_id,
        name,
        x: field("x"),
        y: field("y"),
        width: field("width"),
        height: field("height"),
    })
}

/// Pre-order search for a layer by trimmed name. `include_self` lets a
/// lookup match the frame itself (used for full-frame backgrounds).
fn find_by_name<'a>(node: &'a Value, target: &str, include_self: bool) -> Option<&'a Value> {
    let target = target.trim();
    if include_self && node_name(node) == Some(target) {
        return Some(node);
    }
    let children = node.get("children").and_then(Value::as_array)?;
    for child in children {
        if node_name(child) == Some(target) {
            return Some(child);
        }
        if let Some(found) = find_by_name(child, target, false) {
            return Some(found);
        }
    }
    None
}

fn node_name(node: &Value) -> Option<&str> {
    node.get("name").and_then(Value::as_str).map(str::trim)
}
