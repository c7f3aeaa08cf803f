//! Direct-manipulation state machine.
//!
//! Pointer and keyboard input is turned into store mutations. Frames inside
//! a gesture are applied without history; pointer-up commits one entry for
//! the whole gesture.

use kurbo::{Point, Rect, Size, Vec2};

use crate::actions;
use crate::camera::Camera;
use crate::config::EditorConfig;
use crate::document::Document;
use crate::geometry::{self, Frame, ResizeHandle, RotationTracker};
use crate::input::{ClickTracker, Key, Modifiers, MouseButton, PointerInput};
use crate::layers::{Layer, LayerContent, LayerId, Transform};
use crate::selection::{self, HandleKind};
use crate::store::{DocumentPatch, LayerPatch, Store};

/// Externally visible state of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionState {
    Idle,
    Selecting,
    Dragging,
    Resizing,
    Rotating,
    Panning,
}

/// Notifications for the host.
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionOutput {
    SelectionChanged(Vec<LayerId>),
    CursorChanged(&'static str),
    /// Hand the layer to the inline text editor.
    TextEditRequested { layer_id: LayerId },
}

#[derive(Debug, Clone, PartialEq)]
pub enum GestureKind {
    Marquee { additive: bool },
    Drag,
    Resize(ResizeHandle),
    Rotate,
    Pan,
}

/// Everything a gesture needs between pointer-down and pointer-up.
#[derive(Debug, Clone)]
pub struct GestureContext {
    pub kind: GestureKind,
    pub start_screen: Point,
    /// Pointer at gesture start, in canvas pixels.
    pub start_canvas: Point,
    pub current_canvas: Point,
    /// Starting centers of every layer a drag moves.
    pub origins: Vec<(LayerId, Point)>,
    /// Layer and starting transform for resize/rotate.
    pub target: Option<(LayerId, Transform)>,
    pub rotation: Option<RotationTracker>,
    pub start_pan: Vec2,
    /// Selection kept by an additive marquee.
    pub base_selection: Vec<LayerId>,
    /// Whether layer state changed since pointer-down.
    pub mutated: bool,
}

impl GestureContext {
    fn new(kind: GestureKind, start_screen: Point, start_canvas: Point) -> Self {
        Self {
            kind,
            start_screen,
            start_canvas,
            current_canvas: start_canvas,
            origins: Vec::new(),
            target: None,
            rotation: None,
            start_pan: Vec2::ZERO,
            base_selection: Vec::new(),
            mutated: false,
        }
    }
}

/// Pointer/keyboard interaction engine for one editor view.
pub struct Interaction {
    config: EditorConfig,
    gesture: Option<GestureContext>,
    clicks: ClickTracker,
    pan_key_held: bool,
    viewport: Size,
    cursor: &'static str,
}

impl Interaction {
    pub fn new(config: EditorConfig) -> Self {
        Self {
            clicks: ClickTracker::new(&config),
            viewport: Size::new(config.viewport_width, config.viewport_height),
            config,
            gesture: None,
            pan_key_held: false,
            cursor: "default",
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn viewport(&self) -> Size {
        self.viewport
    }

    /// Size of the host viewport in screen pixels, used to clamp panning.
    pub fn set_viewport(&mut self, viewport: Size) {
        self.viewport = viewport;
    }

    pub fn state(&self) -> InteractionState {
        match self.gesture.as_ref().map(|g| &g.kind) {
            None => InteractionState::Idle,
            Some(GestureKind::Marquee { .. }) => InteractionState::Selecting,
            Some(GestureKind::Drag) => InteractionState::Dragging,
            Some(GestureKind::Resize(_)) => InteractionState::Resizing,
            Some(GestureKind::Rotate) => InteractionState::Rotating,
            Some(GestureKind::Pan) => InteractionState::Panning,
        }
    }

    pub fn gesture(&self) -> Option<&GestureContext> {
        self.gesture.as_ref()
    }

    /// The live marquee rectangle in canvas pixels.
    pub fn marquee_rect(&self) -> Option<Rect> {
        let gesture = self.gesture.as_ref()?;
        match gesture.kind {
            GestureKind::Marquee { .. } => {
                Some(Rect::from_points(gesture.start_canvas, gesture.current_canvas))
            }
            _ => None,
        }
    }

    fn camera(&self, doc: &Document) -> Camera {
        Camera::from_canvas(&doc.canvas, &self.config)
    }

    fn set_cursor(&mut self, cursor: &'static str, out: &mut Vec<InteractionOutput>) {
        if self.cursor != cursor {
            self.cursor = cursor;
            out.push(InteractionOutput::CursorChanged(cursor));
        }
    }

    pub fn pointer_down(&mut self, store: &mut Store, input: PointerInput) -> Vec<InteractionOutput> {
        let mut out = Vec::new();
        if self.gesture.is_some() {
            return out;
        }

        let doc = store.get();
        let camera = self.camera(doc);
        let canvas = doc.canvas_size();
        let point = camera.screen_to_canvas(input.position);
        let normalized = geometry::point_to_normalized(point, canvas);

        let pan_requested = input.button == MouseButton::Middle
            || (input.button == MouseButton::Left && self.pan_key_held);
        if pan_requested {
            let mut gesture = GestureContext::new(GestureKind::Pan, input.position, point);
            gesture.start_pan = camera.pan;
            self.gesture = Some(gesture);
            self.set_cursor("grabbing", &mut out);
            return out;
        }
        if input.button != MouseButton::Left {
            return out;
        }

        let double_click = self.clicks.register(input.position, input.time);
        let handle = selection::hit_test_handles(doc, point, camera.zoom, &self.config);

        if double_click {
            if handle == Some(HandleKind::Rotate) {
                if let Some(layer) = doc.primary_selection() {
                    let id = layer.id.clone();
                    store.update_layer(&id, LayerPatch::new().rotation(0.0), true);
                    return out;
                }
            }
            if let Some(layer) = top_layer_at(doc, normalized) {
                if matches!(layer.content, LayerContent::Text(_)) {
                    let layer_id = layer.id.clone();
                    if !doc.is_selected(&layer_id) || doc.selected_ids().len() != 1 {
                        store.select(vec![layer_id.clone()]);
                        out.push(InteractionOutput::SelectionChanged(vec![layer_id.clone()]));
                    }
                    out.push(InteractionOutput::TextEditRequested { layer_id });
                    return out;
                }
            }
        }

        if let Some(kind) = handle {
            self.begin_handle_gesture(doc, kind, input.position, point);
            let rotation = doc.primary_selection().map_or(0.0, |l| l.transform.rotation);
            self.set_cursor(selection::cursor_for(kind, rotation), &mut out);
            return out;
        }

        match top_layer_at(doc, normalized).map(|l| promote_to_group(doc, &l.id)) {
            Some(hit) => self.begin_drag(store, hit, input, point, &mut out),
            None => self.begin_marquee(store, input, point, &mut out),
        }
        out
    }

    fn begin_handle_gesture(&mut self, doc: &Document, kind: HandleKind, screen: Point, point: Point) {
        let Some(layer) = doc.primary_selection() else {
            return;
        };
        let gesture_kind = match kind {
            HandleKind::Resize(handle) => GestureKind::Resize(handle),
            HandleKind::Rotate => GestureKind::Rotate,
        };
        let mut gesture = GestureContext::new(gesture_kind, screen, point);
        if kind == HandleKind::Rotate {
            let center = geometry::point_to_pixels(layer.transform.position, doc.canvas_size());
            gesture.rotation = Some(RotationTracker::begin(point, center, layer.transform.rotation));
        }
        gesture.target = Some((layer.id.clone(), layer.transform));
        self.gesture = Some(gesture);
    }

    fn begin_drag(
        &mut self,
        store: &mut Store,
        hit: LayerId,
        input: PointerInput,
        point: Point,
        out: &mut Vec<InteractionOutput>,
    ) {
        let current = store.get().selected_ids().to_vec();
        let selection = if input.modifiers.shift {
            if current.contains(&hit) {
                current.iter().filter(|id| **id != hit).cloned().collect()
            } else {
                let mut next = current.clone();
                next.push(hit);
                next
            }
        } else {
            vec![hit]
        };
        if selection != current {
            store.select(selection.clone());
            out.push(InteractionOutput::SelectionChanged(selection.clone()));
        }
        if selection.is_empty() {
            return;
        }

        let mut gesture = GestureContext::new(GestureKind::Drag, input.position, point);
        if input.modifiers.alt {
            let clones = clone_selection(store);
            if !clones.is_empty() {
                gesture.mutated = true;
                out.push(InteractionOutput::SelectionChanged(clones));
            }
        }

        let doc = store.get();
        let roots: Vec<LayerId> = doc
            .selected_layers()
            .into_iter()
            .filter(|l| !l.is_background() && !l.locked)
            .map(|l| l.id.clone())
            .collect();
        gesture.origins = actions::collect_with_children(&doc.layers, &roots)
            .into_iter()
            .map(|l| (l.id, l.transform.position))
            .collect();
        self.gesture = Some(gesture);
        self.set_cursor("grabbing", out);
    }

    fn begin_marquee(
        &mut self,
        store: &mut Store,
        input: PointerInput,
        point: Point,
        out: &mut Vec<InteractionOutput>,
    ) {
        let additive = input.modifiers.shift;
        let mut gesture = GestureContext::new(GestureKind::Marquee { additive }, input.position, point);
        if additive {
            gesture.base_selection = store.get().selected_ids().to_vec();
        } else if !store.get().selected_ids().is_empty() {
            store.select(Vec::new());
            out.push(InteractionOutput::SelectionChanged(Vec::new()));
        }
        self.gesture = Some(gesture);
        self.set_cursor("crosshair", out);
    }

    pub fn pointer_move(&mut self, store: &mut Store, input: PointerInput) -> Vec<InteractionOutput> {
        let mut out = Vec::new();
        let doc = store.get();
        let camera = self.camera(doc);
        let point = camera.screen_to_canvas(input.position);

        let Some(mut gesture) = self.gesture.take() else {
            self.hover(store, point, camera.zoom, &mut out);
            return out;
        };
        gesture.current_canvas = point;

        match gesture.kind.clone() {
            GestureKind::Pan => {
                let mut camera = camera;
                camera.pan = gesture.start_pan + (input.position - gesture.start_screen);
                camera.clamp_pan(self.viewport, doc.canvas_size(), self.config.pan_margin);
                let mut canvas = doc.canvas.clone();
                canvas.pan = camera.pan.to_point();
                if canvas != doc.canvas {
                    store.set_state(DocumentPatch::new().with_canvas(canvas), false, false);
                    gesture.mutated = true;
                }
            }
            GestureKind::Drag => self.drag_frame(store, &mut gesture),
            GestureKind::Resize(handle) => {
                Self::resize_frame(store, &mut gesture, handle, input.modifiers, &self.config)
            }
            GestureKind::Rotate => Self::rotate_frame(store, &mut gesture),
            GestureKind::Marquee { additive } => {
                Self::marquee_frame(store, &gesture, additive, &mut out)
            }
        }

        self.gesture = Some(gesture);
        out
    }

    fn hover(&mut self, store: &mut Store, point: Point, zoom: f64, out: &mut Vec<InteractionOutput>) {
        let doc = store.get();
        let canvas = doc.canvas_size();
        let handle = selection::hit_test_handles(doc, point, zoom, &self.config);
        let hovered = top_layer_at(doc, geometry::point_to_normalized(point, canvas))
            .map(|l| promote_to_group(doc, &l.id));

        let cursor = match (handle, &hovered) {
            (Some(kind), _) => {
                let rotation = doc.primary_selection().map_or(0.0, |l| l.transform.rotation);
                selection::cursor_for(kind, rotation)
            }
            (None, Some(_)) => "move",
            (None, None) if self.pan_key_held => "grab",
            (None, None) => "default",
        };

        if doc.editor.hovered_layer_id != hovered {
            let mut editor = doc.editor.clone();
            editor.hovered_layer_id = hovered;
            store.set_state(DocumentPatch::new().with_editor(editor), false, false);
        }
        self.set_cursor(cursor, out);
    }

    fn drag_frame(&self, store: &mut Store, gesture: &mut GestureContext) {
        let canvas = store.get().canvas_size();
        let delta_px = gesture.current_canvas - gesture.start_canvas;
        let delta = Vec2::new(
            geometry::to_normalized(delta_px.x, canvas.width),
            geometry::to_normalized(delta_px.y, canvas.height),
        );
        let updates = gesture
            .origins
            .iter()
            .map(|(id, origin)| (id.clone(), LayerPatch::new().position(*origin + delta)))
            .collect();
        if store.update_layers(updates, false) > 0 && delta != Vec2::ZERO {
            gesture.mutated = true;
        }
    }

    fn resize_frame(
        store: &mut Store,
        gesture: &mut GestureContext,
        handle: ResizeHandle,
        modifiers: Modifiers,
        config: &EditorConfig,
    ) {
        let Some((id, start)) = gesture.target.clone() else {
            return;
        };
        let canvas = store.get().canvas_size();
        let start_px = Frame::new(
            geometry::point_to_pixels(start.position, canvas),
            Size::new(start.size.width * canvas.width, start.size.height * canvas.height),
        );
        let min_px = Size::new(config.min_size * canvas.width, config.min_size * canvas.height);
        let frame = geometry::resize_rotated(
            handle,
            gesture.current_canvas - gesture.start_canvas,
            start_px,
            start.rotation,
            modifiers.shift,
            min_px,
        );

        let patch = LayerPatch::new()
            .position(geometry::point_to_normalized(frame.position, canvas))
            .size(Size::new(
                geometry::to_normalized(frame.size.width, canvas.width),
                geometry::to_normalized(frame.size.height, canvas.height),
            ));
        if store.update_layer(&id, patch, false) {
            gesture.mutated = true;
        }
    }

    fn rotate_frame(store: &mut Store, gesture: &mut GestureContext) {
        let (Some((id, start)), Some(tracker)) = (gesture.target.clone(), gesture.rotation) else {
            return;
        };
        let center = geometry::point_to_pixels(start.position, store.get().canvas_size());
        let rotation = tracker.rotation_at(gesture.current_canvas, center);
        if store.update_layer(&id, LayerPatch::new().rotation(rotation), false) {
            gesture.mutated = true;
        }
    }

    fn marquee_frame(
        store: &mut Store,
        gesture: &GestureContext,
        additive: bool,
        out: &mut Vec<InteractionOutput>,
    ) {
        let doc = store.get();
        let canvas = doc.canvas_size();
        let rect = Rect::from_points(
            geometry::point_to_normalized(gesture.start_canvas, canvas),
            geometry::point_to_normalized(gesture.current_canvas, canvas),
        );
        let hits = marquee_hits(doc, rect);

        let mut selection = if additive { gesture.base_selection.clone() } else { Vec::new() };
        for id in hits {
            if !selection.contains(&id) {
                selection.push(id);
            }
        }
        if selection.as_slice() != doc.selected_ids() {
            let mut editor = doc.editor.clone();
            editor.selected_layer_ids = selection.clone();
            store.set_state(DocumentPatch::new().with_editor(editor), false, false);
            out.push(InteractionOutput::SelectionChanged(selection));
        }
    }

    pub fn pointer_up(&mut self, store: &mut Store, input: PointerInput) -> Vec<InteractionOutput> {
        let mut out = Vec::new();
        let Some(gesture) = self.gesture.take() else {
            return out;
        };

        match gesture.kind {
            GestureKind::Drag | GestureKind::Resize(_) | GestureKind::Rotate => {
                if gesture.mutated {
                    store.commit();
                    log::debug!("Committed {:?} gesture", gesture.kind);
                }
            }
            GestureKind::Marquee { .. } => {
                let selection = store.get().selected_ids().to_vec();
                store.select(selection);
            }
            GestureKind::Pan => {
                if gesture.mutated {
                    let canvas = store.get().canvas.clone();
                    store.set_state(DocumentPatch::new().with_canvas(canvas), true, false);
                }
            }
        }

        let doc = store.get();
        let camera = self.camera(doc);
        self.hover(store, camera.screen_to_canvas(input.position), camera.zoom, &mut out);
        out
    }

    pub fn key_down(&mut self, store: &mut Store, key: Key, modifiers: Modifiers) -> Vec<InteractionOutput> {
        let mut out = Vec::new();
        if key == Key::Space {
            self.pan_key_held = true;
            if self.gesture.is_none() {
                self.set_cursor("grab", &mut out);
            }
            return out;
        }
        if self.gesture.is_some() {
            return out;
        }

        match key {
            Key::Escape => {
                if !store.get().selected_ids().is_empty() {
                    store.select(Vec::new());
                    out.push(InteractionOutput::SelectionChanged(Vec::new()));
                }
            }
            Key::Delete | Key::Backspace => {
                if actions::delete_selected(store) > 0 {
                    out.push(InteractionOutput::SelectionChanged(store.get().selected_ids().to_vec()));
                }
            }
            _ => {
                if let Some((dx, dy)) = key.arrow_direction() {
                    let step = if modifiers.shift {
                        self.config.nudge_step_large_px
                    } else {
                        self.config.nudge_step_px
                    };
                    actions::nudge_selected(store, Vec2::new(dx * step, dy * step));
                }
            }
        }
        out
    }

    pub fn key_up(&mut self, key: Key) -> Vec<InteractionOutput> {
        let mut out = Vec::new();
        if key == Key::Space {
            self.pan_key_held = false;
            if self.gesture.is_none() {
                self.set_cursor("default", &mut out);
            }
        }
        out
    }

    /// Set the zoom level, clamped to the configured range. Not undoable.
    pub fn set_zoom(&self, store: &mut Store, zoom: f64) {
        let mut canvas = store.get().canvas.clone();
        canvas.zoom = self.config.clamp_zoom(zoom);
        store.set_state(DocumentPatch::new().with_canvas(canvas), true, false);
    }

    /// Zoom by `factor` about a screen point, e.g. for wheel input.
    pub fn zoom_at(&self, store: &mut Store, screen: Point, factor: f64) {
        let doc = store.get();
        let mut camera = self.camera(doc);
        camera.zoom_at(screen, factor);
        let mut canvas = doc.canvas.clone();
        canvas.zoom = camera.zoom;
        canvas.pan = camera.pan.to_point();
        store.set_state(DocumentPatch::new().with_canvas(canvas), true, false);
    }
}

/// Front-most interactive layer under a normalized point.
fn top_layer_at(doc: &Document, point: Point) -> Option<&Layer> {
    let canvas = doc.canvas_size();
    doc.layers
        .iter()
        .rev()
        .find(|l| doc.is_interactive(l) && !l.is_background() && l.hit_test(point, canvas))
}

/// Walk `parentId` links up to the outermost group.
fn promote_to_group(doc: &Document, id: &str) -> LayerId {
    let mut current = id.to_string();
    for _ in 0..doc.layers.len() {
        match doc.layer(&current).and_then(|l| l.parent_id.clone()) {
            Some(parent) if doc.layer(&parent).is_some() => current = parent,
            _ => break,
        }
    }
    current
}

/// Visible, unlocked, non-background layers whose AABB meets a normalized
/// drag rectangle, in z-order.
pub fn marquee_hits(doc: &Document, rect: Rect) -> Vec<LayerId> {
    let canvas = doc.canvas_size();
    doc.layers
        .iter()
        .filter(|l| doc.is_interactive(l) && !l.is_background())
        .filter(|l| geometry::rect_intersects(rect, l.aabb(canvas)))
        .map(|l| l.id.clone())
        .collect()
}

/// Clone the movable selection in place and select the clones, without
/// history. Returns the clone ids.
fn clone_selection(store: &mut Store) -> Vec<LayerId> {
    let doc = store.get();
    let roots: Vec<LayerId> = doc
        .selected_layers()
        .into_iter()
        .filter(|l| !l.is_background() && !l.locked)
        .map(|l| l.id.clone())
        .collect();
    if roots.is_empty() {
        return Vec::new();
    }
    let source = actions::collect_with_children(&doc.layers, &roots);
    let (copies, clone_ids) = actions::clone_layers(&source, &roots, 0.0, "");

    let mut layers = doc.layers.clone();
    layers.extend(copies);
    let mut editor = doc.editor.clone();
    editor.selected_layer_ids = clone_ids.clone();
    store.set_state(DocumentPatch::new().with_layers(layers).with_editor(editor), false, false);
    clone_ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    use crate::layers::{TextAlign, TextContent, TextLine};

    const EPS: f64 = 1e-9;

    fn image_at(x: f64, y: f64, w: f64, h: f64, rotation: f64) -> Layer {
        Layer::image(
            "Photo",
            Transform::new(Point::new(x, y), Size::new(w, h), rotation),
            "a.png",
        )
    }

    /// A 1000x1000 canvas at zoom 1 with no pan, so screen == canvas pixels.
    fn setup(layers: Vec<Layer>) -> (Store, Interaction, Vec<LayerId>) {
        let mut doc = Document::blank(1000.0, 1000.0);
        doc.canvas.zoom = 1.0;
        let ids = layers.iter().map(|l| l.id.clone()).collect();
        doc.layers.extend(layers);
        let config = EditorConfig::default();
        (Store::new(doc, &config), Interaction::new(config), ids)
    }

    fn press(engine: &mut Interaction, store: &mut Store, x: f64, y: f64) -> Vec<InteractionOutput> {
        engine.pointer_down(store, PointerInput::primary(Point::new(x, y)))
    }

    fn drag(engine: &mut Interaction, store: &mut Store, x: f64, y: f64) {
        engine.pointer_move(store, PointerInput::primary(Point::new(x, y)));
    }

    fn release(engine: &mut Interaction, store: &mut Store, x: f64, y: f64) {
        engine.pointer_up(store, PointerInput::primary(Point::new(x, y)));
    }

    #[test]
    fn test_click_selects_topmost() {
        let (mut store, mut engine, ids) = setup(vec![
            image_at(0.5, 0.5, 0.4, 0.4, 0.0),
            image_at(0.5, 0.5, 0.2, 0.2, 0.0),
        ]);
        let out = press(&mut engine, &mut store, 500.0, 500.0);
        assert!(out.contains(&InteractionOutput::SelectionChanged(vec![ids[1].clone()])));
        assert_eq!(engine.state(), InteractionState::Dragging);
        release(&mut engine, &mut store, 500.0, 500.0);

        press(&mut engine, &mut store, 320.0, 320.0);
        assert_eq!(store.get().selected_ids(), &[ids[0].clone()]);
        assert!(!store.can_undo());
    }

    #[test]
    fn test_shift_click_toggles() {
        let (mut store, mut engine, ids) = setup(vec![
            image_at(0.2, 0.2, 0.1, 0.1, 0.0),
            image_at(0.8, 0.8, 0.1, 0.1, 0.0),
        ]);
        press(&mut engine, &mut store, 200.0, 200.0);
        release(&mut engine, &mut store, 200.0, 200.0);

        let shift = |x, y| PointerInput::primary(Point::new(x, y)).with_modifiers(Modifiers::SHIFT);
        engine.pointer_down(&mut store, shift(800.0, 800.0));
        engine.pointer_up(&mut store, shift(800.0, 800.0));
        assert_eq!(store.get().selected_ids(), &ids[..]);

        engine.pointer_down(&mut store, shift(200.0, 200.0));
        engine.pointer_up(&mut store, shift(200.0, 200.0));
        assert_eq!(store.get().selected_ids(), &[ids[1].clone()]);
    }

    #[test]
    fn test_plain_click_on_member_replaces_selection() {
        let (mut store, mut engine, ids) = setup(vec![
            image_at(0.2, 0.2, 0.1, 0.1, 0.0),
            image_at(0.8, 0.8, 0.1, 0.1, 0.0),
        ]);
        store.select(ids.clone());

        let out = press(&mut engine, &mut store, 200.0, 200.0);
        release(&mut engine, &mut store, 200.0, 200.0);
        assert!(out.contains(&InteractionOutput::SelectionChanged(vec![ids[0].clone()])));
        assert_eq!(store.get().selected_ids(), &[ids[0].clone()]);
        assert!(!store.can_undo());
    }

    #[test]
    fn test_rotated_layer_hit() {
        let (mut store, mut engine, ids) = setup(vec![image_at(0.5, 0.5, 0.4, 0.04, 90.0)]);
        // Inside the unrotated box but outside the rotated one.
        press(&mut engine, &mut store, 650.0, 500.0);
        assert!(store.get().selected_ids().is_empty());
        release(&mut engine, &mut store, 650.0, 500.0);

        press(&mut engine, &mut store, 500.0, 650.0);
        assert_eq!(store.get().selected_ids(), &[ids[0].clone()]);
    }

    #[test]
    fn test_drag_commits_one_history_entry() {
        let (mut store, mut engine, ids) = setup(vec![image_at(0.5, 0.5, 0.2, 0.2, 0.0)]);
        press(&mut engine, &mut store, 500.0, 500.0);
        for step in 1..=10 {
            drag(&mut engine, &mut store, 500.0 + step as f64 * 10.0, 500.0);
        }
        assert_eq!(store.history().len(), 1);
        release(&mut engine, &mut store, 600.0, 500.0);

        assert_eq!(store.history().len(), 2);
        let position = store.layer(&ids[0]).unwrap().transform.position;
        assert!((position.x - 0.6).abs() < EPS);
        assert!((position.y - 0.5).abs() < EPS);
        assert_eq!(engine.state(), InteractionState::Idle);

        store.undo();
        assert!((store.layer(&ids[0]).unwrap().transform.position.x - 0.5).abs() < EPS);
    }

    #[test]
    fn test_click_without_move_creates_no_history() {
        let (mut store, mut engine, _) = setup(vec![image_at(0.5, 0.5, 0.2, 0.2, 0.0)]);
        press(&mut engine, &mut store, 500.0, 500.0);
        release(&mut engine, &mut store, 500.0, 500.0);
        assert!(!store.can_undo());
    }

    #[test]
    fn test_click_on_moved_child_selects_group() {
        let (mut store, mut engine, ids) = setup(vec![
            image_at(0.2, 0.2, 0.1, 0.1, 0.0),
            image_at(0.4, 0.2, 0.1, 0.1, 0.0),
        ]);
        store.select(ids.clone());
        let group_id = actions::group_selected(&mut store).unwrap();
        // The group box stays where it was computed.
        store.update_layer(&ids[0], LayerPatch::new().position(Point::new(0.8, 0.8)), true);
        store.select(Vec::new());

        press(&mut engine, &mut store, 800.0, 800.0);
        assert_eq!(store.get().selected_ids(), &[group_id.clone()]);
        drag(&mut engine, &mut store, 850.0, 800.0);
        release(&mut engine, &mut store, 850.0, 800.0);

        let doc = store.get();
        assert!((doc.layer(&ids[0]).unwrap().transform.position.x - 0.85).abs() < EPS);
        assert!((doc.layer(&ids[1]).unwrap().transform.position.x - 0.45).abs() < EPS);
        assert!((doc.layer(&group_id).unwrap().transform.position.x - 0.35).abs() < EPS);
    }

    #[test]
    fn test_resize_from_corner_handle() {
        let (mut store, mut engine, ids) = setup(vec![image_at(0.5, 0.5, 0.2, 0.2, 0.0)]);
        store.select(ids.clone());

        press(&mut engine, &mut store, 600.0, 600.0);
        assert_eq!(engine.state(), InteractionState::Resizing);
        drag(&mut engine, &mut store, 700.0, 650.0);
        release(&mut engine, &mut store, 700.0, 650.0);

        let t = store.layer(&ids[0]).unwrap().transform;
        assert!((t.size.width - 0.3).abs() < EPS);
        assert!((t.size.height - 0.25).abs() < EPS);
        // North-west corner stays at (0.4, 0.4).
        assert!((t.position.x - t.size.width / 2.0 - 0.4).abs() < EPS);
        assert!((t.position.y - t.size.height / 2.0 - 0.4).abs() < EPS);
        assert_eq!(store.history().len(), 2);
    }

    #[test]
    fn test_resize_with_shift_keeps_aspect() {
        let (mut store, mut engine, ids) = setup(vec![image_at(0.5, 0.5, 0.2, 0.1, 0.0)]);
        store.select(ids.clone());

        press(&mut engine, &mut store, 600.0, 550.0);
        let input = PointerInput::primary(Point::new(700.0, 560.0)).with_modifiers(Modifiers::SHIFT);
        engine.pointer_move(&mut store, input);
        engine.pointer_up(&mut store, input);

        let t = store.layer(&ids[0]).unwrap().transform;
        assert!((t.size.width / t.size.height - 2.0).abs() < EPS);
        assert!((t.size.width - 0.3).abs() < EPS);
    }

    #[test]
    fn test_resize_clamps_to_min_size() {
        let (mut store, mut engine, ids) = setup(vec![image_at(0.5, 0.5, 0.2, 0.2, 0.0)]);
        store.select(ids.clone());
        press(&mut engine, &mut store, 600.0, 500.0);
        drag(&mut engine, &mut store, 100.0, 500.0);
        release(&mut engine, &mut store, 100.0, 500.0);
        let t = store.layer(&ids[0]).unwrap().transform;
        assert!((t.size.width - 0.01).abs() < EPS);
        assert!((t.position.x - 0.405).abs() < EPS);
    }

    #[test]
    fn test_rotate_handle_follows_pointer() {
        let (mut store, mut engine, ids) = setup(vec![image_at(0.5, 0.5, 0.2, 0.2, 0.0)]);
        store.select(ids.clone());

        // Rotate handle sits 25px above the top edge.
        press(&mut engine, &mut store, 500.0, 375.0);
        assert_eq!(engine.state(), InteractionState::Rotating);
        drag(&mut engine, &mut store, 625.0, 500.0);
        release(&mut engine, &mut store, 625.0, 500.0);

        let rotation = store.layer(&ids[0]).unwrap().transform.rotation;
        assert!((rotation - 90.0).abs() < 1e-6);
        assert_eq!(store.history().len(), 2);
    }

    #[test]
    fn test_marquee_full_canvas_selects_all_interactive() {
        let mut locked = image_at(0.3, 0.3, 0.1, 0.1, 0.0);
        locked.locked = true;
        let mut hidden = image_at(0.6, 0.6, 0.1, 0.1, 0.0);
        hidden.visible = false;
        let (mut store, mut engine, ids) = setup(vec![
            image_at(0.2, 0.8, 0.1, 0.1, 30.0),
            locked,
            hidden,
            image_at(0.9, 0.1, 0.1, 0.1, 0.0),
        ]);

        let doc = store.get();
        assert_eq!(
            marquee_hits(doc, Rect::new(0.0, 0.0, 1.0, 1.0)),
            vec![ids[0].clone(), ids[3].clone()]
        );

        // Pointer events outside the canvas, off every layer.
        press(&mut engine, &mut store, -10.0, -10.0);
        assert_eq!(engine.state(), InteractionState::Selecting);
        drag(&mut engine, &mut store, 1010.0, 1010.0);
        assert!(engine.marquee_rect().is_some());
        release(&mut engine, &mut store, 1010.0, 1010.0);

        assert_eq!(store.get().selected_ids(), &[ids[0].clone(), ids[3].clone()]);
        assert!(!store.can_undo());
    }

    #[test]
    fn test_marquee_with_shift_unions() {
        let (mut store, mut engine, ids) = setup(vec![
            image_at(0.1, 0.1, 0.1, 0.1, 0.0),
            image_at(0.9, 0.9, 0.1, 0.1, 0.0),
        ]);
        store.select(vec![ids[0].clone()]);
        let shift = |x, y| PointerInput::primary(Point::new(x, y)).with_modifiers(Modifiers::SHIFT);
        engine.pointer_down(&mut store, shift(700.0, 700.0));
        engine.pointer_move(&mut store, shift(990.0, 990.0));
        engine.pointer_up(&mut store, shift(990.0, 990.0));
        assert_eq!(store.get().selected_ids(), &ids[..]);
    }

    #[test]
    fn test_click_on_empty_clears_selection() {
        let (mut store, mut engine, ids) = setup(vec![image_at(0.1, 0.1, 0.1, 0.1, 0.0)]);
        store.select(ids);
        let out = press(&mut engine, &mut store, 800.0, 800.0);
        assert!(out.contains(&InteractionOutput::SelectionChanged(Vec::new())));
        assert!(store.get().selected_ids().is_empty());
    }

    #[test]
    fn test_alt_drag_clones() {
        let (mut store, mut engine, ids) = setup(vec![image_at(0.5, 0.5, 0.2, 0.2, 0.0)]);
        let input = PointerInput::primary(Point::new(500.0, 500.0)).with_modifiers(Modifiers::ALT);
        engine.pointer_down(&mut store, input);
        drag(&mut engine, &mut store, 600.0, 500.0);
        release(&mut engine, &mut store, 600.0, 500.0);

        let doc = store.get();
        assert_eq!(doc.layers.len(), 3);
        assert!((doc.layer(&ids[0]).unwrap().transform.position.x - 0.5).abs() < EPS);
        let clone = doc.layers.last().unwrap();
        assert_ne!(clone.id, ids[0]);
        assert!((clone.transform.position.x - 0.6).abs() < EPS);
        assert_eq!(doc.selected_ids(), &[clone.id.clone()]);
        assert_eq!(store.history().len(), 2);
    }

    #[test]
    fn test_double_click_text_requests_edit() {
        let line = TextLine::new("Hello", "Inter", 40.0);
        let text = Layer::text(
            "Title",
            Transform::new(Point::new(0.5, 0.5), Size::new(0.4, 0.1), 0.0),
            TextContent::new(TextAlign::Center, vec![line]),
        );
        let (mut store, mut engine, ids) = setup(vec![text]);
        let t0 = Instant::now();
        let at = |t| PointerInput::primary(Point::new(500.0, 500.0)).at(t);

        engine.pointer_down(&mut store, at(t0));
        engine.pointer_up(&mut store, at(t0));
        let out = engine.pointer_down(&mut store, at(t0 + Duration::from_millis(150)));
        assert!(out.contains(&InteractionOutput::TextEditRequested { layer_id: ids[0].clone() }));
        assert_eq!(engine.state(), InteractionState::Idle);
    }

    #[test]
    fn test_double_click_rotate_handle_resets_rotation() {
        let (mut store, mut engine, ids) = setup(vec![image_at(0.5, 0.5, 0.2, 0.2, 0.0)]);
        store.select(ids.clone());
        let t0 = Instant::now();
        let at = |t| PointerInput::primary(Point::new(500.0, 375.0)).at(t);

        engine.pointer_down(&mut store, at(t0));
        engine.pointer_move(&mut store, PointerInput::primary(Point::new(625.0, 500.0)).at(t0));
        engine.pointer_up(&mut store, PointerInput::primary(Point::new(625.0, 500.0)).at(t0));
        assert!(store.layer(&ids[0]).unwrap().transform.rotation.abs() > 1.0);

        // The rotate handle now sits to the right of the center.
        let at = |t| PointerInput::primary(Point::new(625.0, 500.0)).at(t);
        engine.pointer_down(&mut store, at(t0 + Duration::from_millis(100)));
        engine.pointer_up(&mut store, at(t0 + Duration::from_millis(100)));
        engine.pointer_down(&mut store, at(t0 + Duration::from_millis(200)));
        assert_eq!(store.layer(&ids[0]).unwrap().transform.rotation, 0.0);
    }

    #[test]
    fn test_keyboard_actions() {
        let (mut store, mut engine, ids) = setup(vec![
            image_at(0.5, 0.5, 0.1, 0.1, 0.0),
            image_at(0.2, 0.2, 0.1, 0.1, 0.0),
        ]);
        store.select(vec![ids[0].clone()]);

        engine.key_down(&mut store, Key::ArrowRight, Modifiers::NONE);
        engine.key_down(&mut store, Key::ArrowDown, Modifiers::SHIFT);
        let position = store.layer(&ids[0]).unwrap().transform.position;
        assert!((position.x - 0.501).abs() < EPS);
        assert!((position.y - 0.51).abs() < EPS);

        let out = engine.key_down(&mut store, Key::Escape, Modifiers::NONE);
        assert_eq!(out, vec![InteractionOutput::SelectionChanged(Vec::new())]);

        store.select(vec![ids[1].clone()]);
        engine.key_down(&mut store, Key::Delete, Modifiers::NONE);
        assert!(store.layer(&ids[1]).is_none());
        assert!(store.get().selected_ids().is_empty());
    }

    #[test]
    fn test_pan_with_space_held() {
        let (mut store, mut engine, _) = setup(vec![]);
        engine.set_viewport(Size::new(1200.0, 1200.0));
        engine.key_down(&mut store, Key::Space, Modifiers::NONE);
        press(&mut engine, &mut store, 100.0, 100.0);
        assert_eq!(engine.state(), InteractionState::Panning);
        drag(&mut engine, &mut store, 150.0, 80.0);
        release(&mut engine, &mut store, 150.0, 80.0);
        engine.key_up(Key::Space);

        assert_eq!(store.get().canvas.pan, Point::new(50.0, -20.0));
        assert!(!store.can_undo());
    }

    #[test]
    fn test_pan_is_clamped() {
        let (mut store, mut engine, _) = setup(vec![]);
        engine.set_viewport(Size::new(800.0, 600.0));
        let middle = |x, y| PointerInput::new(Point::new(x, y), MouseButton::Middle, Modifiers::NONE);
        engine.pointer_down(&mut store, middle(0.0, 0.0));
        engine.pointer_move(&mut store, middle(5000.0, 0.0));
        engine.pointer_up(&mut store, middle(5000.0, 0.0));
        assert_eq!(store.get().canvas.pan.x, 700.0);
    }

    #[test]
    fn test_viewport_starts_from_config() {
        let config = EditorConfig::from_json(r#"{ "viewport_width": 640, "viewport_height": 480 }"#).unwrap();
        let mut engine = Interaction::new(config);
        assert_eq!(engine.viewport(), Size::new(640.0, 480.0));
        engine.set_viewport(Size::new(1024.0, 768.0));
        assert_eq!(engine.viewport(), Size::new(1024.0, 768.0));
    }

    #[test]
    fn test_set_zoom_clamps() {
        let (mut store, engine, _) = setup(vec![]);
        engine.set_zoom(&mut store, 50.0);
        assert_eq!(store.get().canvas.zoom, 5.0);
        engine.set_zoom(&mut store, 0.0);
        assert_eq!(store.get().canvas.zoom, 0.1);
        assert!(!store.can_undo());
    }

    #[test]
    fn test_screen_points_respect_zoom() {
        let (mut store, mut engine, ids) = setup(vec![image_at(0.5, 0.5, 0.1, 0.1, 0.0)]);
        engine.set_zoom(&mut store, 0.5);
        press(&mut engine, &mut store, 250.0, 250.0);
        assert_eq!(store.get().selected_ids(), &[ids[0].clone()]);
    }
}
