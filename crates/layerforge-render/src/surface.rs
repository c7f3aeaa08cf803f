//! The 2D drawing surface the renderer targets.

use std::sync::Arc;

use kurbo::{Affine, Point, Rect};
use layerforge_core::layers::TextAlign;
use peniko::Color;
use tiny_skia::{IntSize, Pixmap};

/// Style for one run of text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub font_family: String,
    pub font_size: f64,
    pub bold: bool,
    pub italic: bool,
    pub color: Color,
    /// Horizontal anchor: the draw origin is the left edge, center or right
    /// edge of the run.
    pub align: TextAlign,
    /// Extra advance between glyphs, in pixels.
    pub letter_spacing: f64,
    /// Glyph outline color and width.
    pub outline: Option<(Color, f64)>,
}

impl TextStyle {
    pub fn new(font_family: impl Into<String>, font_size: f64, color: Color) -> Self {
        Self {
            font_family: font_family.into(),
            font_size,
            bold: false,
            italic: false,
            color,
            align: TextAlign::Left,
            letter_spacing: 0.0,
            outline: None,
        }
    }

    pub fn with_align(mut self, align: TextAlign) -> Self {
        self.align = align;
        self
    }
}

/// A decoded RGBA raster, shared between the asset cache and surfaces.
#[derive(Debug, Clone)]
pub struct Raster(Arc<Pixmap>);

impl Raster {
    pub fn new(pixmap: Pixmap) -> Self {
        Self(Arc::new(pixmap))
    }

    /// Build from straight (non-premultiplied) RGBA8 pixels.
    pub fn from_rgba8(width: u32, height: u32, mut data: Vec<u8>) -> Option<Self> {
        for px in data.chunks_exact_mut(4) {
            let a = u16::from(px[3]);
            for channel in &mut px[..3] {
                *channel = ((u16::from(*channel) * a + 127) / 255) as u8;
            }
        }
        let size = IntSize::from_wh(width, height)?;
        Pixmap::from_vec(data, size).map(Self::new)
    }

    pub fn width(&self) -> u32 {
        self.0.width()
    }

    pub fn height(&self) -> u32 {
        self.0.height()
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.0
    }
}

/// Minimal immediate-mode drawing target.
///
/// Coordinates pass through the current transform, which starts as the
/// identity and is changed with [`Surface::transform`]. `save`/`restore`
/// bracket both the transform and the opacity.
pub trait Surface {
    /// Size of the target in physical pixels.
    fn size(&self) -> (u32, u32);

    /// Clear the whole target to transparent, ignoring the transform.
    fn clear(&mut self);

    fn save(&mut self);

    fn restore(&mut self);

    /// Post-multiply the current transform.
    fn transform(&mut self, affine: Affine);

    /// Multiply the current opacity.
    fn set_opacity(&mut self, opacity: f64);

    fn fill_rect(&mut self, rect: Rect, color: Color);

    fn stroke_rect(&mut self, rect: Rect, color: Color, width: f64);

    /// Draw a single line of text with its top at `origin.y`.
    fn draw_text(&mut self, text: &str, origin: Point, style: &TextStyle);

    /// Draw `src` (in raster pixels, the whole raster when `None`) scaled
    /// into `dest`.
    fn draw_raster(&mut self, raster: &Raster, src: Option<Rect>, dest: Rect);
}
