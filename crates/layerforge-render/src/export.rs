//! Raster export and live-view scale.

use std::str::FromStr;

use image::ImageEncoder;
use layerforge_core::document::Document;
use tiny_skia::Pixmap;

use crate::fonts::FontBook;
use crate::pixmap::PixmapSurface;
use crate::renderer::{RenderContext, RenderResult, Renderer, RendererError};

const JPEG_QUALITY: u8 = 92;

/// Raster output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Png,
    Jpeg,
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(ExportFormat::Png),
            "jpg" | "jpeg" => Ok(ExportFormat::Jpeg),
            other => Err(format!("unknown export format '{}'", other)),
        }
    }
}

/// Scale for the live view: `dpr × zoom`, shrunk so neither physical
/// dimension of the buffer exceeds `max_buffer_px`.
pub fn live_scale(dpr: f64, zoom: f64, width: f64, height: f64, max_buffer_px: u32) -> f64 {
    let scale = dpr * zoom;
    let longest = width.max(height) * scale;
    let limit = f64::from(max_buffer_px);
    if longest > limit && longest > 0.0 {
        scale * limit / longest
    } else {
        scale
    }
}

/// Render `doc` at `scale` into a new pixmap, waiting for every asset to
/// finish decoding first.
pub fn render_pixmap(
    renderer: &mut Renderer,
    doc: &Document,
    scale: f64,
    fonts: &FontBook,
) -> RenderResult<Pixmap> {
    let ctx = RenderContext::new(doc).with_scale(scale);
    let (width, height) = ctx.output_size()?;

    renderer.prefetch(doc);
    renderer.assets_mut().resolve_pending();

    let mut surface = PixmapSurface::new(width, height, fonts.database())?;
    renderer.render(&ctx, &mut surface);
    log::info!("Rendered {}x{} at scale {}", width, height, scale);
    Ok(surface.into_pixmap())
}

/// Straight-alpha RGBA8 pixels of a pixmap.
pub fn pixmap_to_rgba(pixmap: &Pixmap) -> Vec<u8> {
    let mut rgba = Vec::with_capacity(pixmap.data().len());
    for px in pixmap.pixels() {
        let c = px.demultiply();
        rgba.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    rgba
}

pub fn encode_png(pixmap: &Pixmap) -> RenderResult<Vec<u8>> {
    let rgba = pixmap_to_rgba(pixmap);
    let mut png_data = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut png_data, pixmap.width(), pixmap.height());
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder
            .write_header()
            .map_err(|e| RendererError::Encode(e.to_string()))?;
        writer
            .write_image_data(&rgba)
            .map_err(|e| RendererError::Encode(e.to_string()))?;
    }
    Ok(png_data)
}

/// JPEG of a pixmap composited onto white.
pub fn encode_jpeg(pixmap: &Pixmap) -> RenderResult<Vec<u8>> {
    let mut rgb = Vec::with_capacity(pixmap.width() as usize * pixmap.height() as usize * 3);
    for px in pixmap.pixels() {
        // Premultiplied over white: c + 255 × (1 − a).
        let inv = 255 - u16::from(px.alpha());
        for channel in [px.red(), px.green(), px.blue()] {
            rgb.push((u16::from(channel) + inv).min(255) as u8);
        }
    }

    let mut buf = std::io::Cursor::new(Vec::new());
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY)
        .write_image(&rgb, pixmap.width(), pixmap.height(), image::ExtendedColorType::Rgb8)
        .map_err(|e| RendererError::Encode(e.to_string()))?;
    Ok(buf.into_inner())
}

pub fn export_png(renderer: &mut Renderer, doc: &Document, scale: f64, fonts: &FontBook) -> RenderResult<Vec<u8>> {
    encode_png(&render_pixmap(renderer, doc, scale, fonts)?)
}

pub fn export_jpeg(renderer: &mut Renderer, doc: &Document, scale: f64, fonts: &FontBook) -> RenderResult<Vec<u8>> {
    encode_jpeg(&render_pixmap(renderer, doc, scale, fonts)?)
}

/// Render and encode in one step.
pub fn export(
    renderer: &mut Renderer,
    doc: &Document,
    scale: f64,
    format: ExportFormat,
    fonts: &FontBook,
) -> RenderResult<Vec<u8>> {
    match format {
        ExportFormat::Png => export_png(renderer, doc, scale, fonts),
        ExportFormat::Jpeg => export_jpeg(renderer, doc, scale, fonts),
    }
}
