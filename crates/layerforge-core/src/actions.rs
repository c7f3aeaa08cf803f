//! Compound layer operations built on the store's merge API.
//!
//! Every action reads the current document, builds the new layer list and
//! applies it with a single history-producing `set_state`.

use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use kurbo::{Point, Rect, Vec2};

use crate::config::EditorConfig;
use crate::document::Document;
use crate::geometry;
use crate::layers::{Layer, LayerId, Transform};
use crate::store::{DocumentPatch, Store};

/// Edge or center line used by [`align_selected`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignEdge {
    Left,
    Center,
    Right,
    Top,
    Middle,
    Bottom,
}

impl FromStr for AlignEdge {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "left" => Ok(AlignEdge::Left),
            "center" => Ok(AlignEdge::Center),
            "right" => Ok(AlignEdge::Right),
            "top" => Ok(AlignEdge::Top),
            "middle" => Ok(AlignEdge::Middle),
            "bottom" => Ok(AlignEdge::Bottom),
            other => Err(format!("Unknown align edge: {}", other)),
        }
    }
}

/// Distribution strategy used by [`distribute_selected`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistributeMode {
    /// Equal spacing between centers along x.
    Horizontal,
    /// Equal spacing between centers along y.
    Vertical,
    /// Equal gaps between edges along x.
    HorizontalSpacing,
    /// Equal gaps between edges along y.
    VerticalSpacing,
}

impl DistributeMode {
    fn is_horizontal(self) -> bool {
        matches!(self, DistributeMode::Horizontal | DistributeMode::HorizontalSpacing)
    }
}

impl FromStr for DistributeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "horizontal" => Ok(DistributeMode::Horizontal),
            "vertical" => Ok(DistributeMode::Vertical),
            "horizontal-spacing" => Ok(DistributeMode::HorizontalSpacing),
            "vertical-spacing" => Ok(DistributeMode::VerticalSpacing),
            other => Err(format!("Unknown distribute mode: {}", other)),
        }
    }
}

/// Target of [`move_to_extreme`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZExtreme {
    Front,
    Back,
}

/// Selected layers that layout actions may move, in z-order.
fn movable_selection(doc: &Document) -> Vec<&Layer> {
    doc.selected_layers()
        .into_iter()
        .filter(|l| !l.is_background() && !l.locked)
        .collect()
}

/// Move a layer and, for groups, every descendant by `delta`.
fn translate_with_children(layers: &mut [Layer], id: &str, delta: Vec2) {
    let mut pending = vec![id.to_string()];
    let mut seen = HashSet::new();
    while let Some(current) = pending.pop() {
        if !seen.insert(current.clone()) {
            continue;
        }
        if let Some(layer) = layers.iter_mut().find(|l| l.id == current) {
            layer.transform.position += delta;
            pending.extend(layer.child_ids().iter().cloned());
        }
    }
}

/// Ids of `ids` plus every group descendant, in z-order.
pub fn collect_with_children(layers: &[Layer], ids: &[LayerId]) -> Vec<Layer> {
    let mut wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
    let mut pending: Vec<&str> = wanted.iter().copied().collect();
    while let Some(id) = pending.pop() {
        if let Some(layer) = layers.iter().find(|l| l.id == id) {
            for child in layer.child_ids() {
                if wanted.insert(child.as_str()) {
                    pending.push(child.as_str());
                }
            }
        }
    }
    layers
        .iter()
        .filter(|l| wanted.contains(l.id.as_str()))
        .cloned()
        .collect()
}

/// Deep-copy `source` with fresh ids.
///
/// Group membership inside the copied set is remapped; references to layers
/// outside it are dropped. Every copy is offset by `offset` on both axes
/// and each copy of a `roots` entry gets `suffix` appended to its name.
/// Returns the copies in source order and the new ids of the roots.
pub fn clone_layers(
    source: &[Layer],
    roots: &[LayerId],
    offset: f64,
    suffix: &str,
) -> (Vec<Layer>, Vec<LayerId>) {
    let root_set: HashSet<&str> = roots.iter().map(String::as_str).collect();
    let mut remap: HashMap<LayerId, LayerId> = HashMap::new();
    let mut clones: Vec<Layer> = source.to_vec();

    for layer in &mut clones {
        let old = layer.id.clone();
        layer.regenerate_id();
        if root_set.contains(old.as_str()) && !suffix.is_empty() {
            layer.name = format!("{}{}", layer.name, suffix);
        }
        remap.insert(old, layer.id.clone());
    }

    for layer in &mut clones {
        layer.parent_id = layer.parent_id.as_ref().and_then(|p| remap.get(p).cloned());
        if let Some(children) = layer.children.as_mut() {
            *children = children.iter().filter_map(|c| remap.get(c).cloned()).collect();
        }
        layer.transform.position += Vec2::new(offset, offset);
    }

    let new_roots = roots.iter().filter_map(|id| remap.get(id).cloned()).collect();
    (clones, new_roots)
}

/// Group the selected non-background layers.
///
/// The group's transform is the union of the members' unrotated rectangles
/// and is not recomputed afterwards. The group is inserted right after the
/// front-most member and becomes the selection.
pub fn group_selected(store: &mut Store) -> Option<LayerId> {
    let doc = store.get();
    let members: Vec<&Layer> = doc
        .selected_layers()
        .into_iter()
        .filter(|l| !l.is_background())
        .collect();
    if members.len() < 2 {
        return None;
    }

    let bounds = geometry::union_rect(members.iter().map(|l| &l.transform))?;
    let child_ids: Vec<LayerId> = members.iter().map(|l| l.id.clone()).collect();
    let insert_after = members
        .iter()
        .filter_map(|l| doc.layer_index(&l.id))
        .max()?;

    let group = Layer::group(
        Transform::new(bounds.center(), bounds.size(), 0.0),
        child_ids.clone(),
    );
    let group_id = group.id.clone();

    let mut layers = doc.layers.clone();
    for layer in &mut layers {
        if let Some(children) = layer.children.as_mut() {
            children.retain(|c| !child_ids.contains(c));
        }
        if child_ids.contains(&layer.id) {
            layer.parent_id = Some(group_id.clone());
        }
    }
    layers.insert(insert_after + 1, group);

    let mut editor = doc.editor.clone();
    editor.selected_layer_ids = vec![group_id.clone()];
    store.set_state(DocumentPatch::new().with_layers(layers).with_editor(editor), true, true);
    log::debug!("Grouped {} layers into {}", child_ids.len(), group_id);
    Some(group_id)
}

/// Dissolve every selected group; its former members become the selection.
pub fn ungroup_selected(store: &mut Store) -> Vec<LayerId> {
    let mut doc = store.snapshot();
    let groups: Vec<LayerId> = doc
        .selected_layers()
        .into_iter()
        .filter(|l| l.is_group())
        .map(|l| l.id.clone())
        .collect();
    if groups.is_empty() {
        return Vec::new();
    }

    let mut released = Vec::new();
    for group_id in &groups {
        released.extend(doc.detach_children(group_id));
        doc.remove_layer(group_id);
    }
    released.retain(|id| doc.layer(id).is_some());

    doc.editor.selected_layer_ids = released.clone();
    store.set_state(
        DocumentPatch::new().with_layers(doc.layers).with_editor(doc.editor),
        true,
        true,
    );
    released
}

/// Align the selection to its combined extremes. Needs two or more
/// movable layers.
pub fn align_selected(store: &mut Store, edge: AlignEdge) -> bool {
    let doc = store.get();
    let selected = movable_selection(doc);
    if selected.len() < 2 {
        return false;
    }
    let rects: Vec<(LayerId, Rect)> = selected
        .iter()
        .map(|l| (l.id.clone(), geometry::unrotated_rect(&l.transform)))
        .collect();

    let min_x = rects.iter().map(|(_, r)| r.x0).fold(f64::INFINITY, f64::min);
    let max_x = rects.iter().map(|(_, r)| r.x1).fold(f64::NEG_INFINITY, f64::max);
    let min_y = rects.iter().map(|(_, r)| r.y0).fold(f64::INFINITY, f64::min);
    let max_y = rects.iter().map(|(_, r)| r.y1).fold(f64::NEG_INFINITY, f64::max);

    let mut layers = doc.layers.clone();
    for (id, rect) in &rects {
        let center = rect.center();
        let target = match edge {
            AlignEdge::Left => Point::new(min_x + rect.width() / 2.0, center.y),
            AlignEdge::Right => Point::new(max_x - rect.width() / 2.0, center.y),
            AlignEdge::Center => Point::new((min_x + max_x) / 2.0, center.y),
            AlignEdge::Top => Point::new(center.x, min_y + rect.height() / 2.0),
            AlignEdge::Bottom => Point::new(center.x, max_y - rect.height() / 2.0),
            AlignEdge::Middle => Point::new(center.x, (min_y + max_y) / 2.0),
        };
        translate_with_children(&mut layers, id, target - center);
    }

    store.set_state(DocumentPatch::new().with_layers(layers), true, true);
    true
}

/// Distribute the selection along one axis. Needs three or more movable
/// layers; the two outermost stay in place.
pub fn distribute_selected(store: &mut Store, mode: DistributeMode) -> bool {
    let doc = store.get();
    let mut selected: Vec<(LayerId, f64, f64)> = movable_selection(doc)
        .iter()
        .map(|l| {
            let t = &l.transform;
            if mode.is_horizontal() {
                (l.id.clone(), t.position.x, t.size.width)
            } else {
                (l.id.clone(), t.position.y, t.size.height)
            }
        })
        .collect();
    if selected.len() < 3 {
        return false;
    }
    selected.sort_by(|a, b| a.1.total_cmp(&b.1));

    let count = selected.len();
    let targets: Vec<f64> = match mode {
        DistributeMode::Horizontal | DistributeMode::Vertical => {
            let first = selected[0].1;
            let step = (selected[count - 1].1 - first) / (count - 1) as f64;
            (0..count).map(|i| first + step * i as f64).collect()
        }
        DistributeMode::HorizontalSpacing | DistributeMode::VerticalSpacing => {
            let start = selected[0].1 - selected[0].2 / 2.0;
            let end = selected[count - 1].1 + selected[count - 1].2 / 2.0;
            let total: f64 = selected.iter().map(|(_, _, extent)| extent).sum();
            let gap = (end - start - total) / (count - 1) as f64;

            let mut cursor = start;
            selected
                .iter()
                .map(|(_, _, extent)| {
                    let center = cursor + extent / 2.0;
                    cursor += extent + gap;
                    center
                })
                .collect()
        }
    };

    let mut layers = doc.layers.clone();
    for ((id, center, _), target) in selected.iter().zip(targets) {
        let shift = target - center;
        let delta = if mode.is_horizontal() {
            Vec2::new(shift, 0.0)
        } else {
            Vec2::new(0.0, shift)
        };
        translate_with_children(&mut layers, id, delta);
    }

    store.set_state(DocumentPatch::new().with_layers(layers), true, true);
    true
}

/// Move a layer to the front of the stack, or to just in front of the
/// background. The background itself never moves.
pub fn move_to_extreme(store: &mut Store, id: &str, direction: ZExtreme) -> bool {
    let doc = store.get();
    let Some(index) = doc.layer_index(id) else {
        return false;
    };
    if doc.layers[index].is_background() {
        return false;
    }

    let mut layers = doc.layers.clone();
    let layer = layers.remove(index);
    match direction {
        ZExtreme::Front => layers.push(layer),
        ZExtreme::Back => {
            let slot = layers
                .iter()
                .position(Layer::is_background)
                .map_or(0, |bg| bg + 1);
            layers.insert(slot, layer);
        }
    }
    store.set_state(DocumentPatch::new().with_layers(layers), true, true);
    true
}

/// Swap a layer with its neighbour `delta` slots away (±1). Refuses to
/// swap with the background or past either end.
pub fn move_layer(store: &mut Store, id: &str, delta: isize) -> bool {
    let doc = store.get();
    let Some(index) = doc.layer_index(id) else {
        return false;
    };
    let Some(target) = index.checked_add_signed(delta) else {
        return false;
    };
    if target >= doc.layers.len()
        || doc.layers[target].is_background()
        || doc.layers[index].is_background()
    {
        return false;
    }

    let mut layers = doc.layers.clone();
    layers.swap(index, target);
    store.set_state(DocumentPatch::new().with_layers(layers), true, true);
    true
}

/// Duplicate the selected layers (groups with their members), offset by
/// `duplicate_offset`. The copies become the selection.
pub fn duplicate_selected(store: &mut Store, config: &EditorConfig) -> Vec<LayerId> {
    let doc = store.get();
    let roots: Vec<LayerId> = doc
        .selected_layers()
        .into_iter()
        .filter(|l| !l.is_background())
        .map(|l| l.id.clone())
        .collect();
    if roots.is_empty() {
        return Vec::new();
    }

    let source = collect_with_children(&doc.layers, &roots);
    let (copies, new_roots) = clone_layers(&source, &roots, config.duplicate_offset, " (Copy)");
    insert_and_select(store, copies, new_roots.clone());
    new_roots
}

fn insert_and_select(store: &mut Store, copies: Vec<Layer>, selection: Vec<LayerId>) {
    let doc = store.get();
    let mut layers = doc.layers.clone();
    layers.extend(copies);
    let mut editor = doc.editor.clone();
    editor.selected_layer_ids = selection;
    store.set_state(DocumentPatch::new().with_layers(layers).with_editor(editor), true, true);
}

/// Remove every selected unlocked layer. Returns how many were removed.
pub fn delete_selected(store: &mut Store) -> usize {
    let mut doc = store.snapshot();
    let ids: Vec<LayerId> = doc
        .selected_layers()
        .into_iter()
        .filter(|l| !l.locked)
        .map(|l| l.id.clone())
        .collect();
    let removed = ids.iter().filter(|id| doc.remove_layer(id).is_some()).count();
    if removed == 0 {
        return 0;
    }
    store.set_state(
        DocumentPatch::new().with_layers(doc.layers).with_editor(doc.editor),
        true,
        true,
    );
    removed
}

/// Select every visible, unlocked, top-level non-background layer.
pub fn select_all(store: &mut Store) {
    let ids = store
        .get()
        .layers
        .iter()
        .filter(|l| l.visible && !l.locked && !l.is_background() && l.parent_id.is_none())
        .map(|l| l.id.clone())
        .collect();
    store.select(ids);
}

/// Move every selected unlocked layer by a canvas-pixel delta.
pub fn nudge_selected(store: &mut Store, delta_px: Vec2) -> bool {
    let doc = store.get();
    let ids: Vec<LayerId> = movable_selection(doc).iter().map(|l| l.id.clone()).collect();
    if ids.is_empty() {
        return false;
    }
    let canvas = doc.canvas_size();
    let delta = Vec2::new(
        geometry::to_normalized(delta_px.x, canvas.width),
        geometry::to_normalized(delta_px.y, canvas.height),
    );
    let mut layers = doc.layers.clone();
    for id in &ids {
        translate_with_children(&mut layers, id, delta);
    }
    store.set_state(DocumentPatch::new().with_layers(layers), true, true);
    true
}

/// Copied layers awaiting paste.
#[derive(Debug, Clone, Default)]
pub struct Clipboard {
    layers: Vec<Layer>,
    roots: Vec<LayerId>,
}

impl Clipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Store deep copies of the selection. Returns how many layers were
    /// copied.
    pub fn copy(&mut self, doc: &Document) -> usize {
        let roots: Vec<LayerId> = doc
            .selected_layers()
            .into_iter()
            .filter(|l| !l.is_background())
            .map(|l| l.id.clone())
            .collect();
        if roots.is_empty() {
            return 0;
        }
        self.layers = collect_with_children(&doc.layers, &roots);
        self.roots = roots;
        self.roots.len()
    }

    /// Copy, then delete the selection.
    pub fn cut(&mut self, store: &mut Store) -> usize {
        let copied = self.copy(store.get());
        if copied > 0 {
            delete_selected(store);
        }
        copied
    }

    /// Insert fresh copies offset from the clipboard originals and select
    /// them.
    pub fn paste(&self, store: &mut Store, config: &EditorConfig) -> Vec<LayerId> {
        if self.is_empty() {
            return Vec::new();
        }
        let (copies, new_roots) = clone_layers(&self.layers, &self.roots, config.paste_offset, "");
        insert_and_select(store, copies, new_roots.clone());
        new_roots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Size;

    const EPS: f64 = 1e-9;

    fn image_at(x: f64, y: f64, w: f64, h: f64) -> Layer {
        Layer::image(
            "Photo",
            Transform::new(Point::new(x, y), Size::new(w, h), 0.0),
            "a.png",
        )
    }

    fn store_with(layers: Vec<Layer>) -> (Store, Vec<LayerId>) {
        let mut doc = Document::blank(1000.0, 1000.0);
        let ids = layers.iter().map(|l| l.id.clone()).collect();
        doc.layers.extend(layers);
        (Store::new(doc, &EditorConfig::default()), ids)
    }

    fn position(store: &Store, id: &str) -> Point {
        store.layer(id).unwrap().transform.position
    }

    #[test]
    fn test_group_and_ungroup_round_trip() {
        let (mut store, ids) = store_with(vec![
            image_at(0.2, 0.2, 0.2, 0.2),
            image_at(0.6, 0.5, 0.2, 0.4),
            image_at(0.9, 0.9, 0.1, 0.1),
        ]);
        let order_before: Vec<LayerId> = store.get().layers.iter().map(|l| l.id.clone()).collect();
        store.select(vec![ids[0].clone(), ids[1].clone()]);

        let group_id = group_selected(&mut store).unwrap();
        let doc = store.get();
        let group = doc.layer(&group_id).unwrap();
        assert_eq!(doc.layer_index(&group_id), Some(3));
        assert!((group.transform.position.x - 0.4).abs() < EPS);
        assert!((group.transform.position.y - 0.4).abs() < EPS);
        assert!((group.transform.size.width - 0.6).abs() < EPS);
        assert!((group.transform.size.height - 0.6).abs() < EPS);
        assert_eq!(group.child_ids(), &ids[..2]);
        assert_eq!(doc.layer(&ids[0]).unwrap().parent_id.as_deref(), Some(group_id.as_str()));
        assert_eq!(doc.selected_ids(), &[group_id.clone()]);

        let released = ungroup_selected(&mut store);
        assert_eq!(released, ids[..2].to_vec());
        let doc = store.get();
        let order_after: Vec<LayerId> = doc.layers.iter().map(|l| l.id.clone()).collect();
        assert_eq!(order_after, order_before);
        assert!(doc.layers.iter().all(|l| l.parent_id.is_none()));
        assert_eq!(doc.selected_ids(), &ids[..2]);
    }

    #[test]
    fn test_group_needs_two_non_background() {
        let (mut store, ids) = store_with(vec![image_at(0.5, 0.5, 0.1, 0.1)]);
        let bg = store.get().layers[0].id.clone();
        store.select(vec![bg, ids[0].clone()]);
        assert!(group_selected(&mut store).is_none());
        assert!(!store.can_undo());
    }

    #[test]
    fn test_align_left() {
        let (mut store, ids) = store_with(vec![
            image_at(0.2, 0.3, 0.2, 0.1),
            image_at(0.4, 0.6, 0.2, 0.1),
        ]);
        store.select(ids.clone());
        assert!(align_selected(&mut store, AlignEdge::Left));
        assert!((position(&store, &ids[0]).x - 0.2).abs() < EPS);
        assert!((position(&store, &ids[1]).x - 0.2).abs() < EPS);
        assert!((position(&store, &ids[1]).y - 0.6).abs() < EPS);
    }

    #[test]
    fn test_align_middle_and_bottom() {
        let (mut store, ids) = store_with(vec![
            image_at(0.2, 0.2, 0.1, 0.2),
            image_at(0.6, 0.7, 0.1, 0.2),
        ]);
        store.select(ids.clone());
        align_selected(&mut store, AlignEdge::Middle);
        assert!((position(&store, &ids[0]).y - 0.45).abs() < EPS);
        assert!((position(&store, &ids[1]).y - 0.45).abs() < EPS);

        align_selected(&mut store, AlignEdge::Bottom);
        assert!((position(&store, &ids[0]).y - 0.45).abs() < EPS);
    }

    #[test]
    fn test_align_moves_group_members() {
        let (mut store, ids) = store_with(vec![
            image_at(0.2, 0.2, 0.1, 0.1),
            image_at(0.4, 0.2, 0.1, 0.1),
            image_at(0.8, 0.8, 0.1, 0.1),
        ]);
        store.select(vec![ids[0].clone(), ids[1].clone()]);
        let group_id = group_selected(&mut store).unwrap();
        store.select(vec![group_id, ids[2].clone()]);

        align_selected(&mut store, AlignEdge::Right);
        assert!((position(&store, &ids[1]).x - 0.8).abs() < EPS);
        assert!((position(&store, &ids[0]).x - 0.6).abs() < EPS);
    }

    #[test]
    fn test_distribute_centers_keeps_even_spacing() {
        let (mut store, ids) = store_with(vec![
            image_at(0.1, 0.5, 0.1, 0.1),
            image_at(0.5, 0.5, 0.1, 0.1),
            image_at(0.9, 0.5, 0.1, 0.1),
        ]);
        store.select(ids.clone());
        assert!(distribute_selected(&mut store, DistributeMode::Horizontal));
        assert!((position(&store, &ids[1]).x - 0.5).abs() < EPS);
    }

    #[test]
    fn test_distribute_centers_moves_middle() {
        let (mut store, ids) = store_with(vec![
            image_at(0.5, 0.1, 0.1, 0.1),
            image_at(0.5, 0.3, 0.1, 0.1),
            image_at(0.5, 0.9, 0.1, 0.1),
        ]);
        store.select(ids.clone());
        distribute_selected(&mut store, DistributeMode::Vertical);
        assert!((position(&store, &ids[1]).y - 0.5).abs() < EPS);
        assert!((position(&store, &ids[2]).y - 0.9).abs() < EPS);
    }

    #[test]
    fn test_distribute_spacing_equalizes_gaps() {
        let (mut store, ids) = store_with(vec![
            image_at(0.1, 0.5, 0.2, 0.1),
            image_at(0.35, 0.5, 0.1, 0.1),
            image_at(0.85, 0.5, 0.3, 0.1),
        ]);
        store.select(ids.clone());
        distribute_selected(&mut store, DistributeMode::HorizontalSpacing);
        // Span 0.0..1.0, extents 0.6, gap 0.2.
        assert!((position(&store, &ids[0]).x - 0.1).abs() < EPS);
        assert!((position(&store, &ids[1]).x - 0.45).abs() < EPS);
        assert!((position(&store, &ids[2]).x - 0.85).abs() < EPS);
    }

    #[test]
    fn test_distribute_needs_three() {
        let (mut store, ids) = store_with(vec![image_at(0.1, 0.5, 0.1, 0.1), image_at(0.5, 0.5, 0.1, 0.1)]);
        store.select(ids);
        assert!(!distribute_selected(&mut store, DistributeMode::Horizontal));
    }

    #[test]
    fn test_z_order_respects_background() {
        let (mut store, ids) = store_with(vec![
            image_at(0.1, 0.1, 0.1, 0.1),
            image_at(0.2, 0.2, 0.1, 0.1),
            image_at(0.3, 0.3, 0.1, 0.1),
        ]);
        let bg = store.get().layers[0].id.clone();

        assert!(move_to_extreme(&mut store, &ids[2], ZExtreme::Back));
        assert_eq!(store.get().layer_index(&ids[2]), Some(1));
        assert_eq!(store.get().layer_index(&bg), Some(0));

        assert!(move_to_extreme(&mut store, &ids[2], ZExtreme::Front));
        assert_eq!(store.get().layer_index(&ids[2]), Some(3));

        assert!(!move_layer(&mut store, &ids[0], -1));
        assert!(move_layer(&mut store, &ids[0], 1));
        assert_eq!(store.get().layer_index(&ids[0]), Some(2));
        assert!(!move_layer(&mut store, &ids[2], 1));
        assert!(!move_to_extreme(&mut store, &bg, ZExtreme::Front));
    }

    #[test]
    fn test_duplicate_selected() {
        let (mut store, ids) = store_with(vec![image_at(0.3, 0.3, 0.1, 0.1)]);
        store.select(ids.clone());
        let copies = duplicate_selected(&mut store, &EditorConfig::default());
        assert_eq!(copies.len(), 1);
        assert_ne!(copies[0], ids[0]);

        let copy = store.layer(&copies[0]).unwrap();
        assert_eq!(copy.name, "Photo (Copy)");
        assert!((copy.transform.position.x - 0.35).abs() < EPS);
        assert_eq!(store.get().selected_ids(), &copies[..]);
        assert_eq!(store.get().layers.last().unwrap().id, copies[0]);
    }

    #[test]
    fn test_duplicate_group_remaps_members() {
        let (mut store, ids) = store_with(vec![image_at(0.2, 0.2, 0.1, 0.1), image_at(0.4, 0.4, 0.1, 0.1)]);
        store.select(ids.clone());
        group_selected(&mut store).unwrap();
        let copies = duplicate_selected(&mut store, &EditorConfig::default());
        assert_eq!(copies.len(), 1);

        let doc = store.get();
        assert_eq!(doc.layers.len(), 7);
        let group = doc.layer(&copies[0]).unwrap();
        assert_eq!(group.child_ids().len(), 2);
        for child in group.child_ids() {
            assert!(!ids.contains(child));
            assert_eq!(doc.layer(child).unwrap().parent_id.as_deref(), Some(copies[0].as_str()));
        }
        assert!(doc.validate().is_ok());
    }

    #[test]
    fn test_clipboard_paste_offsets_from_originals() {
        let (mut store, ids) = store_with(vec![image_at(0.3, 0.3, 0.1, 0.1)]);
        let config = EditorConfig::default();
        let mut clipboard = Clipboard::new();
        store.select(ids.clone());
        assert_eq!(clipboard.copy(store.get()), 1);

        let first = clipboard.paste(&mut store, &config);
        let second = clipboard.paste(&mut store, &config);
        assert_ne!(first, second);
        assert!((position(&store, &first[0]).x - 0.32).abs() < EPS);
        assert!((position(&store, &second[0]).x - 0.32).abs() < EPS);
        assert_eq!(store.get().selected_ids(), &second[..]);
    }

    #[test]
    fn test_cut_removes_selection() {
        let (mut store, ids) = store_with(vec![image_at(0.3, 0.3, 0.1, 0.1)]);
        let mut clipboard = Clipboard::new();
        store.select(ids.clone());
        assert_eq!(clipboard.cut(&mut store), 1);
        assert!(store.layer(&ids[0]).is_none());
        let pasted = clipboard.paste(&mut store, &EditorConfig::default());
        assert!(store.layer(&pasted[0]).is_some());
    }

    #[test]
    fn test_delete_selected_skips_locked() {
        let (mut store, ids) = store_with(vec![image_at(0.3, 0.3, 0.1, 0.1), image_at(0.6, 0.6, 0.1, 0.1)]);
        let bg = store.get().layers[0].id.clone();
        store.select(vec![bg.clone(), ids[0].clone(), ids[1].clone()]);
        assert_eq!(delete_selected(&mut store), 2);
        assert!(store.layer(&bg).is_some());
        assert_eq!(store.get().selected_ids(), &[bg]);
    }

    #[test]
    fn test_select_all_skips_background_hidden_and_locked() {
        let mut hidden = image_at(0.1, 0.1, 0.1, 0.1);
        hidden.visible = false;
        let mut locked = image_at(0.2, 0.2, 0.1, 0.1);
        locked.locked = true;
        let (mut store, ids) = store_with(vec![hidden, locked, image_at(0.3, 0.3, 0.1, 0.1)]);
        select_all(&mut store);
        assert_eq!(store.get().selected_ids(), &[ids[2].clone()]);
    }

    #[test]
    fn test_nudge_selected_in_pixels() {
        let (mut store, ids) = store_with(vec![image_at(0.5, 0.5, 0.1, 0.1)]);
        store.select(ids.clone());
        assert!(nudge_selected(&mut store, Vec2::new(10.0, -1.0)));
        assert!((position(&store, &ids[0]).x - 0.51).abs() < EPS);
        assert!((position(&store, &ids[0]).y - 0.499).abs() < EPS);
    }
}
