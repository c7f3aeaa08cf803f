//! Document renderer.

use kurbo::{Affine, Point, Rect, Size};
use layerforge_core::color::{parse_color, parse_color_or_black};
use layerforge_core::document::Document;
use layerforge_core::layers::{Layer, LayerContent, LayerId, TextAlign, TextContent};
use peniko::Color;
use thiserror::Error;

use crate::assets::{AssetCache, AssetState};
use crate::surface::{Surface, TextStyle};

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Invalid output size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },
    #[error("SVG error: {0}")]
    Svg(String),
    #[error("Encode failed: {0}")]
    Encode(String),
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RendererError>;

const IMAGE_PLACEHOLDER: Color = Color::from_rgba8(0xcc, 0xcc, 0xcc, 255);
const PLACEHOLDER_LABEL: Color = Color::from_rgba8(0x66, 0x66, 0x66, 255);
const VECTOR_PLACEHOLDER: Color = Color::from_rgba8(0, 0, 0, 26);
const PLACEHOLDER_FONT_SIZE: f64 = 12.0;

/// Text currently handed to the inline editor; it is not drawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditTarget {
    Layer(LayerId),
    Line { layer_id: LayerId, line: usize },
}

impl EditTarget {
    fn hides(&self, layer_id: &str, line: usize) -> bool {
        match self {
            EditTarget::Layer(id) => id == layer_id,
            EditTarget::Line { layer_id: id, line: l } => id == layer_id && *l == line,
        }
    }
}

/// Context for a single render pass.
pub struct RenderContext<'a> {
    /// The document to render.
    pub document: &'a Document,
    /// Physical pixels per design pixel.
    pub scale: f64,
    pub editing: Option<EditTarget>,
}

impl<'a> RenderContext<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document, scale: 1.0, editing: None }
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_editing(mut self, editing: Option<EditTarget>) -> Self {
        self.editing = editing;
        self
    }

    /// Target size in physical pixels: `round(canvas × scale)`.
    pub fn output_size(&self) -> RenderResult<(u32, u32)> {
        let canvas = self.document.canvas_size();
        let width = (canvas.width * self.scale).round();
        let height = (canvas.height * self.scale).round();
        if !width.is_finite() || !height.is_finite() || width < 1.0 || height < 1.0 {
            return Err(RendererError::InvalidSize {
                width: width.max(0.0) as u32,
                height: height.max(0.0) as u32,
            });
        }
        Ok((width as u32, height as u32))
    }
}

/// Draws documents onto a [`Surface`], back to front.
///
/// The renderer only reads the document. Image and vector rasters come from
/// its [`AssetCache`]; assets that are not decoded yet are requested and
/// drawn as placeholders until a later pass.
#[derive(Default)]
pub struct Renderer {
    assets: AssetCache,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_assets(assets: AssetCache) -> Self {
        Self { assets }
    }

    pub fn assets(&self) -> &AssetCache {
        &self.assets
    }

    pub fn assets_mut(&mut self) -> &mut AssetCache {
        &mut self.assets
    }

    /// Request every asset the document references without drawing.
    pub fn prefetch(&mut self, doc: &Document) {
        for layer in doc.layers.iter().filter(|l| l.visible) {
            match &layer.content {
                LayerContent::Image(image) => {
                    self.assets.image(&image.src);
                }
                LayerContent::Vector(vector) if !vector.xml.is_empty() => {
                    self.assets.vector(&layer.id, vector);
                }
                _ => {}
            }
        }
    }

    pub fn render<S: Surface + ?Sized>(&mut self, ctx: &RenderContext, surface: &mut S) {
        let doc = ctx.document;
        let canvas = doc.canvas_size();

        surface.clear();
        surface.save();
        surface.transform(Affine::scale(ctx.scale));
        for layer in doc.layers.iter().filter(|l| l.visible) {
            self.render_layer(layer, canvas, ctx.editing.as_ref(), surface);
        }
        surface.restore();
    }

    fn render_layer<S: Surface + ?Sized>(
        &mut self,
        layer: &Layer,
        canvas: Size,
        editing: Option<&EditTarget>,
        surface: &mut S,
    ) {
        let t = &layer.transform;
        let w = t.size.width * canvas.width;
        let h = t.size.height * canvas.height;
        let center = Point::new(t.position.x * canvas.width, t.position.y * canvas.height);
        let rect = Rect::new(-w / 2.0, -h / 2.0, w / 2.0, h / 2.0);

        surface.save();
        surface.transform(Affine::translate(center.to_vec2()) * Affine::rotate(t.rotation.to_radians()));
        surface.set_opacity(layer.opacity);

        let stroked = match &layer.content {
            LayerContent::Background(background) => {
                if let Some(color) = background.primary_color() {
                    surface.fill_rect(rect, parse_color_or_black(color));
                }
                false
            }
            LayerContent::Text(text) => {
                render_text(&layer.id, text, rect, editing, surface);
                true
            }
            LayerContent::Image(image) => {
                match self.assets.image(&image.src) {
                    AssetState::Ready(raster) => {
                        let src = image.crop.map(|crop| {
                            crop.to_source_rect(f64::from(raster.width()), f64::from(raster.height()))
                        });
                        surface.draw_raster(&raster, src, rect);
                    }
                    AssetState::Pending => {
                        surface.fill_rect(rect, IMAGE_PLACEHOLDER);
                        let label = TextStyle::new("sans-serif", PLACEHOLDER_FONT_SIZE, PLACEHOLDER_LABEL)
                            .with_align(TextAlign::Center);
                        surface.draw_text("Loading...", Point::new(0.0, -PLACEHOLDER_FONT_SIZE / 2.0), &label);
                    }
                    AssetState::Failed => surface.fill_rect(rect, IMAGE_PLACEHOLDER),
                }
                true
            }
            LayerContent::Vector(vector) => {
                let state = if vector.xml.is_empty() {
                    AssetState::Failed
                } else {
                    self.assets.vector(&layer.id, vector)
                };
                match state {
                    AssetState::Ready(raster) => surface.draw_raster(&raster, None, rect),
                    _ => surface.fill_rect(rect, VECTOR_PLACEHOLDER),
                }
                true
            }
            LayerContent::Group => false,
        };

        if stroked {
            if let Some(stroke) = layer.stroke.as_ref().filter(|s| s.width > 0.0) {
                surface.stroke_rect(rect, parse_color_or_black(&stroke.color), stroke.width);
            }
        }
        surface.restore();
    }
}

fn render_text<S: Surface + ?Sized>(
    layer_id: &str,
    text: &TextContent,
    rect: Rect,
    editing: Option<&EditTarget>,
    surface: &mut S,
) {
    let x = match text.align {
        TextAlign::Left => rect.x0,
        TextAlign::Center => 0.0,
        TextAlign::Right => rect.x1,
    };
    let outline = text.outline.as_ref().and_then(|o| {
        let color = parse_color(&o.color)?;
        (o.width > 0.0).then_some((color, o.width))
    });

    let offsets = text.line_offsets(rect.height());
    for (index, (line, offset)) in text.lines.iter().zip(offsets).enumerate() {
        if editing.is_some_and(|target| target.hides(layer_id, index)) {
            continue;
        }
        let style = TextStyle {
            font_family: line.font.clone(),
            font_size: line.font_size,
            bold: line.bold,
            italic: line.italic,
            color: parse_color_or_black(&line.color),
            align: text.align,
            letter_spacing: line.letter_spacing,
            outline,
        };
        surface.draw_text(&text.display_text(line), Point::new(x, rect.y0 + offset), &style);
    }
}
