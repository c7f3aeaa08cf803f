//! The document: canvas settings, ordered layers and editor state.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use kurbo::{Point, Size, Vec2};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::layers::{
    Layer, LayerId, TextAlign, TextContent, TextLine, Transform, generate_id,
};

/// Screen pixels per inch used for unit conversion.
pub const PPI: f64 = 72.0;
pub const MM_PER_IN: f64 = 25.4;

const STAR_ICON: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24" fill="currentColor"><path d="M12 2L15.09 8.26L22 9.27L17 14.14L18.18 21.02L12 17.77L5.82 21.02L7 14.14L2 9.27L8.91 8.26L12 2Z" /></svg>"#;
const DEMO_IMAGE: &str = "https://images.unsplash.com/photo-1618005182384-a83a8bd57fbe?q=80&w=1000&auto=format&fit=crop";

/// Errors raised while importing or validating a document.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Invalid document JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid canvas size {width}x{height}")]
    InvalidCanvas { width: f64, height: f64 },
    #[error("Layer at index {0} has an empty id")]
    EmptyLayerId(usize),
    #[error("Duplicate layer id: {0}")]
    DuplicateLayerId(LayerId),
    #[error("Layer {layer} references missing parent {parent}")]
    MissingParent { layer: LayerId, parent: LayerId },
    #[error("Group {group} references missing child {child}")]
    MissingChild { group: LayerId, child: LayerId },
    #[error("Layer {0} has a non-finite transform")]
    InvalidTransform(LayerId),
    #[error("Layer {0} has a non-finite opacity")]
    InvalidOpacity(LayerId),
}

pub type DocumentResult<T> = Result<T, DocumentError>;

/// Current time as an RFC 3339 string.
pub fn now_timestamp() -> String {
    OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    pub id: String,
    pub version: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub source_group: String,
}

impl Meta {
    fn fresh() -> Self {
        let now = now_timestamp();
        Self {
            id: generate_id("doc"),
            version: "1.0.0".to_string(),
            created_at: now.clone(),
            updated_at: now,
            source_group: "SM".to_string(),
        }
    }
}

/// Measurement unit shown to the user for canvas dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    #[default]
    Px,
    In,
    Mm,
}

impl Unit {
    /// Convert pixels into this unit.
    pub fn from_px(self, px: f64) -> f64 {
        match self {
            Unit::Px => px,
            Unit::In => px / PPI,
            Unit::Mm => px / PPI * MM_PER_IN,
        }
    }

    /// Convert a value in this unit into pixels.
    pub fn to_px(self, value: f64) -> f64 {
        match self {
            Unit::Px => value,
            Unit::In => value * PPI,
            Unit::Mm => value / MM_PER_IN * PPI,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasSettings {
    /// Design width in pixels.
    pub width: f64,
    /// Design height in pixels.
    pub height: f64,
    #[serde(default = "default_dpi")]
    pub dpi: f64,
    #[serde(default = "default_zoom")]
    pub zoom: f64,
    /// Viewport offset of the canvas in screen pixels.
    #[serde(default)]
    pub pan: Point,
    #[serde(default)]
    pub unit: Unit,
}

fn default_dpi() -> f64 {
    72.0
}

fn default_zoom() -> f64 {
    1.0
}

impl CanvasSettings {
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn pan_offset(&self) -> Vec2 {
        self.pan.to_vec2()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DocumentInfo {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub industries: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub suitability: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontAsset {
    pub source: String,
    #[serde(default)]
    pub loaded: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Assets {
    #[serde(default)]
    pub images: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub fonts: BTreeMap<String, FontAsset>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiState {
    #[serde(default = "default_theme")]
    pub theme: String,
}

fn default_theme() -> String {
    "light".to_string()
}

impl Default for UiState {
    fn default() -> Self {
        Self { theme: default_theme() }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorState {
    /// Selected layer ids in selection order; the first is the primary.
    #[serde(default)]
    pub selected_layer_ids: Vec<LayerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hovered_layer_id: Option<LayerId>,
    #[serde(default)]
    pub ui: UiState,
}

/// The whole editable document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub meta: Meta,
    pub canvas: CanvasSettings,
    #[serde(default)]
    pub document: DocumentInfo,
    /// Back-to-front; index 0 is the back-most layer.
    pub layers: Vec<Layer>,
    #[serde(default)]
    pub assets: Assets,
    #[serde(default)]
    pub editor: EditorState,
}

impl Document {
    /// The starter document shown at session start and after reset.
    pub fn default_template() -> Self {
        let mut title = TextLine::new("Design Editor", "Inter", 80.0);
        title.bold = true;
        title.color = "#111827".to_string();
        title.line_height = Some(1.1);
        title.letter_spacing = -2.0;
        let mut title_content = TextContent::new(TextAlign::Center, vec![title]);
        title_content.capitalize = true;

        let mut subtitle = TextLine::new("Create stunning visuals in seconds", "Inter", 32.0);
        subtitle.color = "#4B5563".to_string();
        subtitle.line_height = Some(1.4);

        let layers = vec![
            Layer::background("#F3F4F6"),
            Layer::text(
                "Main Title",
                Transform::new(Point::new(0.5, 0.3), Size::new(0.8, 0.2), 0.0),
                title_content,
            ),
            Layer::text(
                "Subtitle",
                Transform::new(Point::new(0.5, 0.45), Size::new(0.6, 0.1), 0.0),
                TextContent::new(TextAlign::Center, vec![subtitle]),
            ),
            Layer::image(
                "Demo Image",
                Transform::new(Point::new(0.5, 0.7), Size::new(0.4, 0.3), 0.0),
                DEMO_IMAGE,
            ),
            Layer::vector(
                "Badge Icon",
                Transform::new(Point::new(0.85, 0.15), Size::new(0.1, 0.1), 15.0),
                STAR_ICON.replace("currentColor", "#3B82F6"),
                "#3B82F6",
            ),
            Layer::vector(
                "Star Icon",
                Transform::new(Point::new(0.1, 0.15), Size::new(0.15, 0.15), -10.0),
                STAR_ICON.replace("currentColor", "#F59E0B"),
                "#F59E0B",
            ),
        ];

        let mut assets = Assets::default();
        assets.fonts.insert(
            "Inter".to_string(),
            FontAsset { source: "google".to_string(), loaded: true },
        );

        Self {
            meta: Meta::fresh(),
            canvas: CanvasSettings {
                width: 1080.0,
                height: 1080.0,
                dpi: 72.0,
                zoom: 0.5,
                pan: Point::ORIGIN,
                unit: Unit::Px,
            },
            document: DocumentInfo {
                title: "Untitled Design".to_string(),
                format: "social-media-square".to_string(),
                category: "marketing".to_string(),
                ..Default::default()
            },
            layers,
            assets,
            editor: EditorState::default(),
        }
    }

    /// An empty document of the given size with only a white background.
    pub fn blank(width: f64, height: f64) -> Self {
        let mut doc = Self::default_template();
        doc.canvas.width = width;
        doc.canvas.height = height;
        doc.layers = vec![Layer::background("#FFFFFF")];
        doc.assets = Assets::default();
        doc
    }

    /// Parse and validate a document. Selection ids that name missing layers
    /// are dropped.
    pub fn from_json(json: &str) -> Result<Self, DocumentError> {
        let mut doc: Document = serde_json::from_str(json)?;
        doc.validate()?;
        doc.prune_selection();
        Ok(doc)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Structural validation applied before a document replaces state.
    pub fn validate(&self) -> Result<(), DocumentError> {
        let (width, height) = (self.canvas.width, self.canvas.height);
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(DocumentError::InvalidCanvas { width, height });
        }

        let mut ids = HashSet::new();
        for (index, layer) in self.layers.iter().enumerate() {
            if layer.id.is_empty() {
                return Err(DocumentError::EmptyLayerId(index));
            }
            if !ids.insert(layer.id.as_str()) {
                return Err(DocumentError::DuplicateLayerId(layer.id.clone()));
            }
            if !layer.transform.is_finite() {
                return Err(DocumentError::InvalidTransform(layer.id.clone()));
            }
            if !layer.opacity.is_finite() {
                return Err(DocumentError::InvalidOpacity(layer.id.clone()));
            }
        }

        for layer in &self.layers {
            if let Some(parent) = &layer.parent_id {
                if !ids.contains(parent.as_str()) {
                    return Err(DocumentError::MissingParent {
                        layer: layer.id.clone(),
                        parent: parent.clone(),
                    });
                }
            }
            for child in layer.child_ids() {
                if !ids.contains(child.as_str()) {
                    return Err(DocumentError::MissingChild {
                        group: layer.id.clone(),
                        child: child.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn canvas_size(&self) -> Size {
        self.canvas.size()
    }

    pub fn layer(&self, id: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn layer_mut(&mut self, id: &str) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|l| l.id == id)
    }

    pub fn layer_index(&self, id: &str) -> Option<usize> {
        self.layers.iter().position(|l| l.id == id)
    }

    pub fn background_index(&self) -> Option<usize> {
        self.layers.iter().position(Layer::is_background)
    }

    pub fn selected_ids(&self) -> &[LayerId] {
        &self.editor.selected_layer_ids
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.editor.selected_layer_ids.iter().any(|s| s == id)
    }

    /// Selected layers in z-order (back to front).
    pub fn selected_layers(&self) -> Vec<&Layer> {
        self.layers.iter().filter(|l| self.is_selected(&l.id)).collect()
    }

    /// The first selected layer.
    pub fn primary_selection(&self) -> Option<&Layer> {
        self.editor
            .selected_layer_ids
            .first()
            .and_then(|id| self.layer(id))
    }

    /// Drop selection ids that no longer name a live layer.
    pub fn prune_selection(&mut self) {
        let live: HashSet<&str> = self.layers.iter().map(|l| l.id.as_str()).collect();
        self.editor
            .selected_layer_ids
            .retain(|id| live.contains(id.as_str()));
        let hovered_gone = self
            .editor
            .hovered_layer_id
            .as_ref()
            .is_some_and(|id| !live.contains(id.as_str()));
        if hovered_gone {
            self.editor.hovered_layer_id = None;
        }
    }

    /// Stamp the modification time.
    pub fn touch(&mut self) {
        self.meta.updated_at = now_timestamp();
    }

    /// Resize the canvas while keeping every layer's absolute pixel geometry.
    /// Backgrounds are stretched to cover the new canvas.
    pub fn resize_canvas(&mut self, width: f64, height: f64) -> Result<(), DocumentError> {
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(DocumentError::InvalidCanvas { width, height });
        }
        let scale_x = self.canvas.width / width;
        let scale_y = self.canvas.height / height;

        for layer in &mut self.layers {
            if layer.is_background() {
                layer.transform.position = Point::new(0.5, 0.5);
                layer.transform.size = Size::new(1.0, 1.0);
                continue;
            }
            let t = &mut layer.transform;
            t.position = Point::new(t.position.x * scale_x, t.position.y * scale_y);
            t.size = Size::new(t.size.width * scale_x, t.size.height * scale_y);
        }

        self.canvas.width = width;
        self.canvas.height = height;
        Ok(())
    }

    /// Font families referenced by text layers.
    pub fn fonts_in_use(&self) -> BTreeSet<String> {
        self.layers
            .iter()
            .filter_map(Layer::text_content)
            .flat_map(|text| text.lines.iter().map(|line| line.font.clone()))
            .collect()
    }

    /// Rewrite every text line using `font` to `fallback`.
    pub fn replace_font(&mut self, font: &str, fallback: &str) -> bool {
        let mut changed = false;
        for layer in &mut self.layers {
            if let Some(text) = layer.text_content_mut() {
                changed |= text.replace_font(font, fallback);
            }
        }
        changed
    }

    /// Clear `parentId` back-references to `group_id` and return its members.
    pub(crate) fn detach_children(&mut self, group_id: &str) -> Vec<LayerId> {
        let children = self
            .layer(group_id)
            .map(|g| g.child_ids().to_vec())
            .unwrap_or_default();
        for layer in &mut self.layers {
            if layer.parent_id.as_deref() == Some(group_id) {
                layer.parent_id = None;
            }
        }
        children
    }

    /// Remove a layer, keeping group references and the selection
    /// consistent. Returns the removed layer.
    pub(crate) fn remove_layer(&mut self, id: &str) -> Option<Layer> {
        let index = self.layer_index(id)?;
        if self.layers[index].is_group() {
            self.detach_children(id);
        }
        let removed = self.layers.remove(index);
        if let Some(parent_id) = &removed.parent_id {
            if let Some(children) = self.layer_mut(parent_id).and_then(|p| p.children.as_mut()) {
                children.retain(|child| child != id);
            }
        }
        self.prune_selection();
        Some(removed)
    }

    /// Whether a layer can currently be picked or modified by the user.
    pub fn is_interactive(&self, layer: &Layer) -> bool {
        layer.visible && !layer.locked
    }
}
