//! Manipulation handles bound to the primary selection.

use kurbo::{Point, Size, Vec2};
use serde::{Deserialize, Serialize};

use crate::config::EditorConfig;
use crate::document::Document;
use crate::geometry::{self, ResizeHandle};
use crate::layers::Layer;

/// Type of selection handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandleKind {
    Resize(ResizeHandle),
    /// Rotation handle, placed above the top edge.
    Rotate,
}

/// A handle with its position in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Handle {
    pub position: Point,
    pub kind: HandleKind,
}

impl Handle {
    pub fn new(position: Point, kind: HandleKind) -> Self {
        Self { position, kind }
    }

    /// Check if a canvas-pixel point hits this handle. `radius` is already
    /// converted to canvas pixels.
    pub fn hit_test(&self, point: Point, radius: f64) -> bool {
        let d = point - self.position;
        d.x.abs() <= radius && d.y.abs() <= radius
    }
}

/// Handles for a single layer, rotated with it.
///
/// `zoom` converts the screen-space rotate-handle offset into canvas pixels.
pub fn layer_handles(layer: &Layer, canvas: Size, zoom: f64, config: &EditorConfig) -> Vec<Handle> {
    let t = &layer.transform;
    let center = geometry::point_to_pixels(t.position, canvas);
    let hw = t.size.width * canvas.width / 2.0;
    let hh = t.size.height * canvas.height / 2.0;
    let place = |x: f64, y: f64| center + geometry::rotate_vec(Vec2::new(x, y), t.rotation);

    let mut handles: Vec<Handle> = ResizeHandle::ALL
        .iter()
        .map(|&handle| {
            let (sx, sy) = handle.direction();
            Handle::new(place(sx * hw, sy * hh), HandleKind::Resize(handle))
        })
        .collect();

    let offset = config.rotate_handle_offset / zoom;
    handles.push(Handle::new(place(0.0, -hh - offset), HandleKind::Rotate));
    handles
}

/// Handles for the current selection: present only when exactly one
/// unlocked layer is selected.
pub fn selection_handles(doc: &Document, zoom: f64, config: &EditorConfig) -> Vec<Handle> {
    let [id] = doc.selected_ids() else {
        return Vec::new();
    };
    match doc.layer(id) {
        Some(layer) if !layer.locked => layer_handles(layer, doc.canvas_size(), zoom, config),
        _ => Vec::new(),
    }
}

/// Find the handle under a canvas-pixel point. The rotate handle wins over
/// resize handles when both are in reach.
pub fn hit_test_handles(
    doc: &Document,
    point: Point,
    zoom: f64,
    config: &EditorConfig,
) -> Option<HandleKind> {
    let radius = (config.handle_size / 2.0 + config.handle_hit_tolerance) / zoom;
    let handles = selection_handles(doc, zoom, config);
    handles
        .iter()
        .rev()
        .find(|handle| handle.hit_test(point, radius))
        .map(|handle| handle.kind)
}

/// CSS-style cursor name for a handle, accounting for layer rotation.
pub fn cursor_for(kind: HandleKind, rotation: f64) -> &'static str {
    const CURSORS: [&str; 4] = ["ns-resize", "nesw-resize", "ew-resize", "nwse-resize"];
    let HandleKind::Resize(handle) = kind else {
        return "grab";
    };
    let base = match handle {
        ResizeHandle::N | ResizeHandle::S => 0,
        ResizeHandle::NE | ResizeHandle::SW => 1,
        ResizeHandle::E | ResizeHandle::W => 2,
        ResizeHandle::NW | ResizeHandle::SE => 3,
    };
    let steps = (rotation / 45.0).round().rem_euclid(4.0) as usize;
    CURSORS[(base + steps) % 4]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::Transform;

    fn doc_with_selected(rotation: f64) -> (Document, String) {
        let mut doc = Document::blank(1000.0, 1000.0);
        let layer = Layer::image(
            "Photo",
            Transform::new(Point::new(0.5, 0.5), Size::new(0.2, 0.1), rotation),
            "a.png",
        );
        let id = layer.id.clone();
        doc.layers.push(layer);
        doc.editor.selected_layer_ids = vec![id.clone()];
        (doc, id)
    }

    #[test]
    fn test_handles_positions() {
        let (doc, _) = doc_with_selected(0.0);
        let config = EditorConfig::default();
        let handles = selection_handles(&doc, 1.0, &config);
        assert_eq!(handles.len(), 9);

        let se = handles
            .iter()
            .find(|h| h.kind == HandleKind::Resize(ResizeHandle::SE))
            .unwrap();
        assert!((se.position.x - 600.0).abs() < 1e-9);
        assert!((se.position.y - 550.0).abs() < 1e-9);

        let rotate = handles.iter().find(|h| h.kind == HandleKind::Rotate).unwrap();
        assert!((rotate.position.y - (450.0 - 25.0)).abs() < 1e-9);
    }

    #[test]
    fn test_handles_follow_rotation() {
        let (doc, _) = doc_with_selected(90.0);
        let config = EditorConfig::default();
        let handles = selection_handles(&doc, 1.0, &config);
        let rotate = handles.iter().find(|h| h.kind == HandleKind::Rotate).unwrap();
        // Top edge now faces +x.
        assert!((rotate.position.x - (500.0 + 50.0 + 25.0)).abs() < 1e-9);
        assert!((rotate.position.y - 500.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_handles_for_multi_or_locked() {
        let (mut doc, id) = doc_with_selected(0.0);
        let config = EditorConfig::default();
        doc.editor.selected_layer_ids.push(doc.layers[0].id.clone());
        assert!(selection_handles(&doc, 1.0, &config).is_empty());

        doc.editor.selected_layer_ids = vec![id.clone()];
        doc.layer_mut(&id).unwrap().locked = true;
        assert!(selection_handles(&doc, 1.0, &config).is_empty());
    }

    #[test]
    fn test_hit_test_scales_with_zoom() {
        let (doc, _) = doc_with_selected(0.0);
        let config = EditorConfig::default();
        let near = Point::new(607.0, 557.0);
        assert_eq!(
            hit_test_handles(&doc, near, 1.0, &config),
            Some(HandleKind::Resize(ResizeHandle::SE))
        );
        assert_eq!(
            hit_test_handles(&doc, near, 2.0, &config),
            None
        );
        assert_eq!(hit_test_handles(&doc, Point::new(500.0, 500.0), 1.0, &config), None);
    }

    #[test]
    fn test_cursor_for_rotated_handles() {
        assert_eq!(cursor_for(HandleKind::Resize(ResizeHandle::E), 0.0), "ew-resize");
        assert_eq!(cursor_for(HandleKind::Resize(ResizeHandle::E), 90.0), "ns-resize");
        assert_eq!(cursor_for(HandleKind::Resize(ResizeHandle::N), -45.0), "nwse-resize");
        assert_eq!(cursor_for(HandleKind::Rotate, 10.0), "grab");
    }
}
