//! Layer definitions for the document.

mod background;
mod image;
mod text;
mod vector;

pub use background::{BackgroundContent, Fill, FillKind};
pub use image::{Crop, ImageContent, decode_data_url};
pub use text::{TextAlign, TextContent, TextLine, TextOutline};
pub use vector::{VectorContent, recolor_svg, svg_natural_size};

use kurbo::{Point, Rect, Size};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry;

/// Unique identifier for a layer.
pub type LayerId = String;

/// Generate a fresh id with the given prefix, e.g. `layer_1b4e...`.
pub fn generate_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4().simple())
}

/// Placement of a layer in normalized canvas space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// Center, as fractions of canvas width/height.
    pub position: Point,
    /// Extent, as fractions of canvas width/height.
    pub size: Size,
    /// Degrees clockwise about the center. Not wrapped.
    #[serde(default)]
    pub rotation: f64,
}

impl Transform {
    pub fn new(position: Point, size: Size, rotation: f64) -> Self {
        Self { position, size, rotation }
    }

    /// A transform covering the whole canvas.
    pub fn full_canvas() -> Self {
        Self::new(Point::new(0.5, 0.5), Size::new(1.0, 1.0), 0.0)
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.size.is_finite() && self.rotation.is_finite()
    }
}

/// Kind of a layer, derived from its content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayerKind {
    Background,
    Text,
    Image,
    Vector,
    Group,
}

impl LayerKind {
    /// Numeric type code used by the catalog export format.
    pub fn code(self) -> u8 {
        match self {
            LayerKind::Vector => 0,
            LayerKind::Text => 1,
            LayerKind::Image => 2,
            LayerKind::Background => 3,
            LayerKind::Group => 4,
        }
    }
}

/// Kind-specific layer payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LayerContent {
    Background(BackgroundContent),
    Text(TextContent),
    Image(ImageContent),
    #[serde(rename = "svg")]
    Vector(VectorContent),
    Group,
}

/// Optional outline drawn around a layer's box after its content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerStroke {
    pub color: String,
    /// Width in canvas pixels.
    pub width: f64,
}

/// One positioned content element of the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    pub id: LayerId,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub locked: bool,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    pub transform: Transform,
    pub content: LayerContent,
    /// Back-reference to the owning group, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<LayerId>,
    /// Member ids of a group layer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<LayerId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<LayerStroke>,
}

fn default_true() -> bool {
    true
}

fn default_opacity() -> f64 {
    1.0
}

/// Clamp an opacity into [0, 1]; non-finite values become fully opaque.
pub fn clamp_opacity(opacity: f64) -> f64 {
    if opacity.is_finite() { opacity.clamp(0.0, 1.0) } else { 1.0 }
}

impl Layer {
    /// Create a visible, unlocked, opaque layer with a fresh id.
    pub fn new(name: impl Into<String>, transform: Transform, content: LayerContent) -> Self {
        let prefix = if matches!(content, LayerContent::Group) { "group" } else { "layer" };
        Self {
            id: generate_id(prefix),
            name: name.into(),
            visible: true,
            locked: false,
            opacity: 1.0,
            transform,
            content,
            parent_id: None,
            children: None,
            stroke: None,
        }
    }

    /// A locked full-canvas solid background.
    pub fn background(color: impl Into<String>) -> Self {
        let mut layer = Self::new(
            "Background",
            Transform::full_canvas(),
            LayerContent::Background(BackgroundContent::solid(color)),
        );
        layer.locked = true;
        layer
    }

    pub fn text(name: impl Into<String>, transform: Transform, content: TextContent) -> Self {
        Self::new(name, transform, LayerContent::Text(content))
    }

    pub fn image(name: impl Into<String>, transform: Transform, src: impl Into<String>) -> Self {
        Self::new(name, transform, LayerContent::Image(ImageContent::new(src)))
    }

    pub fn vector(
        name: impl Into<String>,
        transform: Transform,
        xml: impl Into<String>,
        color: impl Into<String>,
    ) -> Self {
        Self::new(name, transform, LayerContent::Vector(VectorContent::new(xml, color)))
    }

    /// A group layer over the given children.
    pub fn group(transform: Transform, children: Vec<LayerId>) -> Self {
        let mut layer = Self::new("Group", transform, LayerContent::Group);
        layer.children = Some(children);
        layer
    }

    pub fn kind(&self) -> LayerKind {
        match self.content {
            LayerContent::Background(_) => LayerKind::Background,
            LayerContent::Text(_) => LayerKind::Text,
            LayerContent::Image(_) => LayerKind::Image,
            LayerContent::Vector(_) => LayerKind::Vector,
            LayerContent::Group => LayerKind::Group,
        }
    }

    pub fn is_background(&self) -> bool {
        self.kind() == LayerKind::Background
    }

    pub fn is_group(&self) -> bool {
        self.kind() == LayerKind::Group
    }

    /// Group member ids, empty for non-groups.
    pub fn child_ids(&self) -> &[LayerId] {
        self.children.as_deref().unwrap_or(&[])
    }

    /// Replace the id with a fresh one of the same prefix.
    pub fn regenerate_id(&mut self) {
        let prefix = if self.is_group() { "group" } else { "layer" };
        self.id = generate_id(prefix);
    }

    pub fn set_opacity(&mut self, opacity: f64) {
        self.opacity = clamp_opacity(opacity);
    }

    /// Whether a normalized point hits this layer.
    pub fn hit_test(&self, point: Point, canvas: Size) -> bool {
        geometry::hit_test(point, &self.transform, canvas)
    }

    /// Rotation-aware bounding box in normalized coordinates.
    pub fn aabb(&self, canvas: Size) -> Rect {
        geometry::compute_aabb(&self.transform, canvas)
    }

    /// Unrotated box in canvas pixels.
    pub fn pixel_rect(&self, canvas: Size) -> Rect {
        let center = geometry::point_to_pixels(self.transform.position, canvas);
        let size = Size::new(
            self.transform.size.width * canvas.width,
            self.transform.size.height * canvas.height,
        );
        Rect::from_center_size(center, size)
    }

    pub fn text_content(&self) -> Option<&TextContent> {
        match &self.content {
            LayerContent::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn text_content_mut(&mut self) -> Option<&mut TextContent> {
        match &mut self.content {
            LayerContent::Text(text) => Some(text),
            _ => None,
        }
    }
}
