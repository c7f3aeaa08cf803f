//! Camera module for pan/zoom transforms between the viewport and the canvas.

use kurbo::{Affine, Point, Size, Vec2};
use serde::{Deserialize, Serialize};

use crate::config::EditorConfig;
use crate::document::CanvasSettings;

/// Camera maps viewport (screen) pixels to canvas pixels.
///
/// `pan` is the screen position of the canvas origin and `zoom` the number
/// of screen pixels per canvas pixel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub pan: Vec2,
    pub zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            pan: Vec2::ZERO,
            zoom: 1.0,
            min_zoom: 0.1,
            max_zoom: 5.0,
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Camera matching the document's stored viewport.
    pub fn from_canvas(canvas: &CanvasSettings, config: &EditorConfig) -> Self {
        Self {
            pan: canvas.pan_offset(),
            zoom: config.clamp_zoom(canvas.zoom),
            min_zoom: config.min_zoom,
            max_zoom: config.max_zoom,
        }
    }

    /// Canvas-to-screen transform.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.pan) * Affine::scale(self.zoom)
    }

    /// Screen-to-canvas transform.
    pub fn inverse_transform(&self) -> Affine {
        Affine::scale(1.0 / self.zoom) * Affine::translate(-self.pan)
    }

    pub fn screen_to_canvas(&self, screen: Point) -> Point {
        self.inverse_transform() * screen
    }

    pub fn canvas_to_screen(&self, canvas: Point) -> Point {
        self.transform() * canvas
    }

    /// Convert a screen-space distance into canvas pixels.
    pub fn screen_len_to_canvas(&self, len: f64) -> f64 {
        len / self.zoom
    }

    /// Set the zoom level, clamped to the allowed range.
    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = if zoom.is_finite() {
            zoom.clamp(self.min_zoom, self.max_zoom)
        } else {
            self.zoom
        };
    }

    /// Zoom by `factor`, keeping `screen_point` fixed over the same canvas
    /// location.
    pub fn zoom_at(&mut self, screen_point: Point, factor: f64) {
        let anchor = self.screen_to_canvas(screen_point);
        self.set_zoom(self.zoom * factor);
        let moved = self.canvas_to_screen(anchor);
        self.pan += screen_point - moved;
    }

    /// Keep at least `margin` screen pixels of the canvas inside the
    /// viewport on every side.
    pub fn clamp_pan(&mut self, viewport: Size, canvas: Size, margin: f64) {
        let scaled = Size::new(canvas.width * self.zoom, canvas.height * self.zoom);
        let margin_x = margin.min(scaled.width);
        let margin_y = margin.min(scaled.height);
        let min_x = margin_x - scaled.width;
        let max_x = (viewport.width - margin_x).max(min_x);
        let min_y = margin_y - scaled.height;
        let max_y = (viewport.height - margin_y).max(min_y);
        self.pan = Vec2::new(self.pan.x.clamp(min_x, max_x), self.pan.y.clamp(min_y, max_y));
    }
}
