//! CPU rasterizing surface backed by tiny-skia.

use std::fmt::Write;
use std::sync::Arc;

use kurbo::{Affine, Point, Rect};
use layerforge_core::color::to_hex;
use layerforge_core::layers::TextAlign;
use peniko::Color;
use tiny_skia::{FilterQuality, IntRect, Paint, PathBuilder, Pixmap, PixmapPaint, Stroke, Transform};
use usvg::fontdb;

use crate::renderer::{RenderResult, RendererError};
use crate::surface::{Raster, Surface, TextStyle};

fn to_skia(affine: Affine) -> Transform {
    let [a, b, c, d, e, f] = affine.as_coeffs();
    Transform::from_row(a as f32, b as f32, c as f32, d as f32, e as f32, f as f32)
}

fn to_skia_rect(rect: Rect) -> Option<tiny_skia::Rect> {
    let rect = rect.abs();
    tiny_skia::Rect::from_ltrb(rect.x0 as f32, rect.y0 as f32, rect.x1 as f32, rect.y1 as f32)
}

fn paint_for(color: Color, opacity: f64) -> Paint<'static> {
    let rgba = color.to_rgba8();
    let alpha = (f64::from(rgba.a) * opacity).round().clamp(0.0, 255.0) as u8;
    let mut paint = Paint::default();
    paint.set_color_rgba8(rgba.r, rgba.g, rgba.b, alpha);
    paint.anti_alias = true;
    paint
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Surface drawing into an owned [`Pixmap`].
///
/// Text goes through usvg's text layout with the given font database, so
/// glyphs only appear for families the database can resolve.
pub struct PixmapSurface {
    pixmap: Pixmap,
    fonts: Arc<fontdb::Database>,
    transform: Affine,
    opacity: f64,
    stack: Vec<(Affine, f64)>,
}

impl PixmapSurface {
    pub fn new(width: u32, height: u32, fonts: Arc<fontdb::Database>) -> RenderResult<Self> {
        let pixmap = Pixmap::new(width, height).ok_or(RendererError::InvalidSize { width, height })?;
        Ok(Self {
            pixmap,
            fonts,
            transform: Affine::IDENTITY,
            opacity: 1.0,
            stack: Vec::new(),
        })
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub fn into_pixmap(self) -> Pixmap {
        self.pixmap
    }

    fn text_svg(text: &str, style: &TextStyle, opacity: f64) -> String {
        let anchor = match style.align {
            TextAlign::Left => "start",
            TextAlign::Center => "middle",
            TextAlign::Right => "end",
        };
        let fill = style.color.to_rgba8();
        let mut svg = String::with_capacity(256 + text.len());
        let _ = write!(
            svg,
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"1\" height=\"1\"><g opacity=\"{opacity}\">\
             <text x=\"0\" y=\"0\" dominant-baseline=\"text-before-edge\" text-anchor=\"{anchor}\" \
             font-family=\"{family}\" font-size=\"{size}\" font-weight=\"{weight}\" font-style=\"{slant}\" \
             letter-spacing=\"{spacing}\" fill=\"{color}\" fill-opacity=\"{alpha}\"",
            family = escape_xml(&style.font_family),
            size = style.font_size,
            weight = if style.bold { "bold" } else { "normal" },
            slant = if style.italic { "italic" } else { "normal" },
            spacing = style.letter_spacing,
            color = to_hex(Color::from_rgba8(fill.r, fill.g, fill.b, 255)),
            alpha = f64::from(fill.a) / 255.0,
        );
        if let Some((color, width)) = style.outline {
            let _ = write!(svg, " stroke=\"{}\" stroke-width=\"{}\"", to_hex(color), width);
        }
        let _ = write!(svg, ">{}</text></g></svg>", escape_xml(text));
        svg
    }
}

impl Surface for PixmapSurface {
    fn size(&self) -> (u32, u32) {
        (self.pixmap.width(), self.pixmap.height())
    }

    fn clear(&mut self) {
        self.pixmap.fill(tiny_skia::Color::TRANSPARENT);
    }

    fn save(&mut self) {
        self.stack.push((self.transform, self.opacity));
    }

    fn restore(&mut self) {
        if let Some((transform, opacity)) = self.stack.pop() {
            self.transform = transform;
            self.opacity = opacity;
        }
    }

    fn transform(&mut self, affine: Affine) {
        self.transform = self.transform * affine;
    }

    fn set_opacity(&mut self, opacity: f64) {
        self.opacity *= opacity.clamp(0.0, 1.0);
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        let Some(rect) = to_skia_rect(rect) else {
            return;
        };
        let paint = paint_for(color, self.opacity);
        self.pixmap.fill_rect(rect, &paint, to_skia(self.transform), None);
    }

    fn stroke_rect(&mut self, rect: Rect, color: Color, width: f64) {
        let Some(rect) = to_skia_rect(rect) else {
            return;
        };
        let path = PathBuilder::from_rect(rect);
        let stroke = Stroke { width: width as f32, ..Stroke::default() };
        let paint = paint_for(color, self.opacity);
        self.pixmap.stroke_path(&path, &paint, &stroke, to_skia(self.transform), None);
    }

    fn draw_text(&mut self, text: &str, origin: Point, style: &TextStyle) {
        if text.trim().is_empty() {
            return;
        }
        let svg = Self::text_svg(text, style, self.opacity);
        let options = usvg::Options {
            fontdb: Arc::clone(&self.fonts),
            ..usvg::Options::default()
        };
        match usvg::Tree::from_str(&svg, &options) {
            Ok(tree) => {
                let transform = to_skia(self.transform * Affine::translate(origin.to_vec2()));
                resvg::render(&tree, transform, &mut self.pixmap.as_mut());
            }
            Err(e) => log::warn!("Failed to lay out text: {}", e),
        }
    }

    fn draw_raster(&mut self, raster: &Raster, src: Option<Rect>, dest: Rect) {
        let source = raster.pixmap();
        let cropped;
        let (image, src_w, src_h) = match src {
            Some(src) => {
                let x = src.x0.round().max(0.0) as i32;
                let y = src.y0.round().max(0.0) as i32;
                let w = src.width().round().max(1.0) as u32;
                let h = src.height().round().max(1.0) as u32;
                let Some(region) = IntRect::from_xywh(x, y, w, h).and_then(|r| source.clone_rect(r)) else {
                    return;
                };
                cropped = region;
                (cropped.as_ref(), f64::from(w), f64::from(h))
            }
            None => (source.as_ref(), f64::from(source.width()), f64::from(source.height())),
        };

        let placement = Affine::translate((dest.x0, dest.y0))
            * Affine::scale_non_uniform(dest.width() / src_w, dest.height() / src_h);
        let paint = PixmapPaint {
            opacity: self.opacity as f32,
            quality: FilterQuality::Bilinear,
            ..PixmapPaint::default()
        };
        self.pixmap
            .draw_pixmap(0, 0, image, &paint, to_skia(self.transform * placement), None);
    }
}
