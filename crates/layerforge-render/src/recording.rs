//! A surface that records draw calls instead of rasterizing them.

use kurbo::{Affine, Point, Rect};
use peniko::Color;

use crate::surface::{Raster, Surface, TextStyle};

/// One recorded primitive with the transform and opacity in effect.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Clear,
    FillRect { rect: Rect, color: Color, transform: Affine, opacity: f64 },
    StrokeRect { rect: Rect, color: Color, width: f64, transform: Affine, opacity: f64 },
    Text { text: String, origin: Point, style: TextStyle, transform: Affine, opacity: f64 },
    Raster { size: (u32, u32), src: Option<Rect>, dest: Rect, transform: Affine, opacity: f64 },
}

impl DrawCommand {
    /// Device-space center of the primitive's rectangle, if it has one.
    pub fn device_center(&self) -> Option<Point> {
        match self {
            DrawCommand::FillRect { rect, transform, .. }
            | DrawCommand::StrokeRect { rect, transform, .. }
            | DrawCommand::Raster { dest: rect, transform, .. } => Some(*transform * rect.center()),
            DrawCommand::Text { origin, transform, .. } => Some(*transform * *origin),
            DrawCommand::Clear => None,
        }
    }
}

/// Display-list surface. Useful for tests and for hosts that replay draw
/// calls onto their own canvas.
#[derive(Debug, Clone)]
pub struct RecordingSurface {
    width: u32,
    height: u32,
    transform: Affine,
    opacity: f64,
    stack: Vec<(Affine, f64)>,
    commands: Vec<DrawCommand>,
}

impl RecordingSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            transform: Affine::IDENTITY,
            opacity: 1.0,
            stack: Vec::new(),
            commands: Vec::new(),
        }
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn into_commands(self) -> Vec<DrawCommand> {
        self.commands
    }

    /// Nesting depth of unmatched `save` calls.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }
}

impl Surface for RecordingSurface {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn clear(&mut self) {
        self.commands.push(DrawCommand::Clear);
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
        self.commands.push(DrawCommand::FillRect {
            rect,
            color,
            transform: self.transform,
            opacity: self.opacity,
        });
    }

    fn stroke_rect(&mut self, rect: Rect, color: Color, width: f64) {
        self.commands.push(DrawCommand::StrokeRect {
            rect,
            color,
            width,
            transform: self.transform,
            opacity: self.opacity,
        });
    }

    fn draw_text(&mut self, text: &str, origin: Point, style: &TextStyle) {
        self.commands.push(DrawCommand::Text {
            text: text.to_string(),
            origin,
            style: style.clone(),
            transform: self.transform,
            opacity: self.opacity,
        });
    }

    fn draw_raster(&mut self, raster: &Raster, src: Option<Rect>, dest: Rect) {
        self.commands.push(DrawCommand::Raster {
            size: (raster.width(), raster.height()),
            src,
            dest,
            transform: self.transform,
            opacity: self.opacity,
        });
    }
}
