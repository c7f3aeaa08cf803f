//! The document store: the single owner of the working document.
//!
//! All mutation goes through the merge API here so history snapshots,
//! timestamps, persistence and change notification stay consistent.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use kurbo::{Point, Size};

use crate::config::EditorConfig;
use crate::document::{Assets, CanvasSettings, Document, DocumentError, DocumentInfo, EditorState, Meta};
use crate::history::History;
use crate::layers::{Layer, LayerContent, LayerId, LayerStroke, Transform, clamp_opacity};
use crate::storage::Storage;

type Listener = Box<dyn FnMut(&Document)>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, Rc<RefCell<Listener>>)>,
}

/// Handle returned by [`Store::subscribe`].
///
/// Dropping the handle keeps the listener registered; call
/// [`Subscription::unsubscribe`] to remove it.
#[must_use = "keep the subscription to be able to unsubscribe"]
pub struct Subscription {
    id: u64,
    listeners: Weak<RefCell<Listeners>>,
}

impl Subscription {
    /// Remove the listener. Returns false if the store is gone or the
    /// listener was already removed.
    pub fn unsubscribe(self) -> bool {
        let Some(listeners) = self.listeners.upgrade() else {
            return false;
        };
        let mut listeners = listeners.borrow_mut();
        let before = listeners.entries.len();
        listeners.entries.retain(|(id, _)| *id != self.id);
        listeners.entries.len() != before
    }
}

/// Partial replacement of top-level document sections.
#[derive(Debug, Clone, Default)]
pub struct DocumentPatch {
    pub meta: Option<Meta>,
    pub canvas: Option<CanvasSettings>,
    pub document: Option<DocumentInfo>,
    pub layers: Option<Vec<Layer>>,
    pub assets: Option<Assets>,
    pub editor: Option<EditorState>,
}

impl DocumentPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// A patch replacing every section of the document.
    pub fn replace_all(document: Document) -> Self {
        Self {
            meta: Some(document.meta),
            canvas: Some(document.canvas),
            document: Some(document.document),
            layers: Some(document.layers),
            assets: Some(document.assets),
            editor: Some(document.editor),
        }
    }

    pub fn with_meta(mut self, meta: Meta) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn with_canvas(mut self, canvas: CanvasSettings) -> Self {
        self.canvas = Some(canvas);
        self
    }

    pub fn with_document(mut self, document: DocumentInfo) -> Self {
        self.document = Some(document);
        self
    }

    pub fn with_layers(mut self, layers: Vec<Layer>) -> Self {
        self.layers = Some(layers);
        self
    }

    pub fn with_assets(mut self, assets: Assets) -> Self {
        self.assets = Some(assets);
        self
    }

    pub fn with_editor(mut self, editor: EditorState) -> Self {
        self.editor = Some(editor);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.meta.is_none()
            && self.canvas.is_none()
            && self.document.is_none()
            && self.layers.is_none()
            && self.assets.is_none()
            && self.editor.is_none()
    }

    /// Whether the patch leaves content alone and only changes the view.
    pub fn is_view_only(&self) -> bool {
        self.meta.is_none() && self.document.is_none() && self.layers.is_none() && self.assets.is_none()
    }
}

/// Partial changes to a single layer.
///
/// `position`, `size` and `rotation` apply after `transform`, so a patch
/// can move a layer without restating its whole transform.
#[derive(Debug, Clone, Default)]
pub struct LayerPatch {
    pub name: Option<String>,
    pub visible: Option<bool>,
    pub locked: Option<bool>,
    pub opacity: Option<f64>,
    pub transform: Option<Transform>,
    pub position: Option<Point>,
    pub size: Option<Size>,
    pub rotation: Option<f64>,
    pub content: Option<LayerContent>,
    pub parent_id: Option<Option<LayerId>>,
    pub stroke: Option<Option<LayerStroke>>,
}

impl LayerPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = Some(visible);
        self
    }

    pub fn locked(mut self, locked: bool) -> Self {
        self.locked = Some(locked);
        self
    }

    pub fn opacity(mut self, opacity: f64) -> Self {
        self.opacity = Some(opacity);
        self
    }

    pub fn transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn position(mut self, position: Point) -> Self {
        self.position = Some(position);
        self
    }

    pub fn size(mut self, size: Size) -> Self {
        self.size = Some(size);
        self
    }

    pub fn rotation(mut self, rotation: f64) -> Self {
        self.rotation = Some(rotation);
        self
    }

    pub fn content(mut self, content: LayerContent) -> Self {
        self.content = Some(content);
        self
    }

    pub fn parent_id(mut self, parent_id: Option<LayerId>) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn stroke(mut self, stroke: Option<LayerStroke>) -> Self {
        self.stroke = Some(stroke);
        self
    }

    fn apply(self, layer: &mut Layer) {
        if let Some(name) = self.name {
            layer.name = name;
        }
        if let Some(visible) = self.visible {
            layer.visible = visible;
        }
        if let Some(locked) = self.locked {
            layer.locked = locked;
        }
        if let Some(opacity) = self.opacity {
            layer.set_opacity(opacity);
        }
        if let Some(transform) = self.transform {
            layer.transform = transform;
        }
        if let Some(position) = self.position {
            layer.transform.position = position;
        }
        if let Some(size) = self.size {
            layer.transform.size = size;
        }
        if let Some(rotation) = self.rotation {
            layer.transform.rotation = rotation;
        }
        if let Some(content) = self.content {
            layer.content = content;
        }
        if let Some(parent_id) = self.parent_id {
            layer.parent_id = parent_id;
        }
        if let Some(stroke) = self.stroke {
            layer.stroke = stroke;
        }
    }
}

/// Owner of the working document, its history and its subscribers.
pub struct Store {
    document: Document,
    history: History,
    listeners: Rc<RefCell<Listeners>>,
    storage: Option<Box<dyn Storage>>,
    storage_key: String,
}

impl Store {
    /// Create a store over `document` without persistence.
    pub fn new(document: Document, config: &EditorConfig) -> Self {
        Self {
            history: History::new(document.clone(), config.history_capacity),
            document,
            listeners: Rc::new(RefCell::new(Listeners::default())),
            storage: None,
            storage_key: config.storage_key.clone(),
        }
    }

    /// Create a store backed by `storage`, resuming the persisted document
    /// when it loads cleanly and starting from the default template
    /// otherwise.
    pub fn with_storage(storage: Box<dyn Storage>, config: &EditorConfig) -> Self {
        let document = match storage.load(&config.storage_key) {
            Ok(document) => {
                log::info!("Resumed document {}", document.meta.id);
                document
            }
            Err(e) => {
                log::debug!("Starting from default template: {}", e);
                Document::default_template()
            }
        };
        let mut store = Self::new(document, config);
        store.storage = Some(storage);
        store
    }

    /// The current document.
    pub fn get(&self) -> &Document {
        &self.document
    }

    /// A deep copy of the current document.
    pub fn snapshot(&self) -> Document {
        self.document.clone()
    }

    pub fn layer(&self, id: &str) -> Option<&Layer> {
        self.document.layer(id)
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Register a listener called after every change.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: FnMut(&Document) + 'static,
    {
        let mut listeners = self.listeners.borrow_mut();
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners
            .entries
            .push((id, Rc::new(RefCell::new(Box::new(listener) as Listener))));
        Subscription {
            id,
            listeners: Rc::downgrade(&self.listeners),
        }
    }

    /// Merge `patch` into the document.
    ///
    /// Stale selection ids are pruned and opacities clamped. Content changes
    /// stamp `updatedAt`. With `history` a snapshot is recorded; with
    /// `persist` the result is written to storage. Listeners are always
    /// notified.
    ///
    /// A patch touching only `canvas` and `editor` is a view change
    /// (selection, hover, pan, zoom). Without `history` it is folded into
    /// the current snapshot so a later undo returns to it.
    pub fn set_state(&mut self, patch: DocumentPatch, persist: bool, history: bool) {
        let view_only = patch.is_view_only();
        let DocumentPatch { meta, canvas, document, layers, assets, editor } = patch;
        if let Some(meta) = meta {
            self.document.meta = meta;
        }
        if let Some(canvas) = canvas {
            self.document.canvas = canvas;
        }
        if let Some(document) = document {
            self.document.document = document;
        }
        if let Some(mut layers) = layers {
            for layer in &mut layers {
                layer.opacity = clamp_opacity(layer.opacity);
            }
            self.document.layers = layers;
        }
        if let Some(assets) = assets {
            self.document.assets = assets;
        }
        if let Some(editor) = editor {
            self.document.editor = editor;
        }

        self.document.prune_selection();
        if !view_only {
            self.document.touch();
        } else if !history {
            self.sync_view_state();
        }
        self.finish_mutation(persist, history);
    }

    /// Copy selection, hover, zoom and pan into the snapshot at the history
    /// cursor, leaving its layers alone.
    fn sync_view_state(&mut self) {
        let current = self.history.current_mut();
        current.editor = self.document.editor.clone();
        current.canvas.zoom = self.document.canvas.zoom;
        current.canvas.pan = self.document.canvas.pan;
        current.prune_selection();
    }

    /// Apply `patch` to one layer. Intermediate gesture frames pass
    /// `history = false`; those frames are not persisted either.
    pub fn update_layer(&mut self, id: &str, patch: LayerPatch, history: bool) -> bool {
        self.update_layers(vec![(id.to_string(), patch)], history) > 0
    }

    /// Apply several layer patches as one change. Returns how many layers
    /// were found and updated.
    pub fn update_layers(&mut self, updates: Vec<(LayerId, LayerPatch)>, history: bool) -> usize {
        let mut updated = 0;
        for (id, patch) in updates {
            if let Some(layer) = self.document.layer_mut(&id) {
                patch.apply(layer);
                updated += 1;
            }
        }
        if updated > 0 {
            self.document.touch();
            self.finish_mutation(history, history);
        }
        updated
    }

    /// Append a layer at the front of the stack.
    pub fn add_layer(&mut self, mut layer: Layer) -> LayerId {
        layer.opacity = clamp_opacity(layer.opacity);
        let id = layer.id.clone();
        self.document.layers.push(layer);
        self.document.touch();
        self.finish_mutation(true, true);
        id
    }

    /// Remove a layer, pruning it from the selection and from group
    /// references.
    pub fn delete_layer(&mut self, id: &str) -> bool {
        if self.document.remove_layer(id).is_none() {
            return false;
        }
        self.document.touch();
        self.finish_mutation(true, true);
        true
    }

    /// Replace the selection. Selection changes are not undoable.
    pub fn select(&mut self, ids: Vec<LayerId>) {
        let mut editor = self.document.editor.clone();
        editor.selected_layer_ids = ids;
        self.set_state(DocumentPatch::new().with_editor(editor), true, false);
    }

    /// Record the current document as one history entry and persist it.
    /// Gestures call this once at pointer-up.
    pub fn commit(&mut self) {
        self.history.push(self.document.clone());
        self.persist();
        log::debug!("Committed history entry {}", self.history.cursor());
    }

    /// Validate `json` and replace the whole document with it. On failure
    /// the current document is left untouched.
    pub fn import_json(&mut self, json: &str) -> Result<(), DocumentError> {
        let document = Document::from_json(json).inspect_err(|e| {
            log::warn!("Import rejected: {}", e);
        })?;
        self.set_state(DocumentPatch::replace_all(document), true, true);
        Ok(())
    }

    pub fn undo(&mut self) -> bool {
        let Some(snapshot) = self.history.undo() else {
            return false;
        };
        self.document = snapshot.clone();
        self.persist();
        self.notify();
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(snapshot) = self.history.redo() else {
            return false;
        };
        self.document = snapshot.clone();
        self.persist();
        self.notify();
        true
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Return to the default template with a fresh history.
    pub fn reset(&mut self) {
        self.document = Document::default_template();
        self.history.reset(self.document.clone());
        self.persist();
        self.notify();
    }

    fn finish_mutation(&mut self, persist: bool, history: bool) {
        if history {
            self.history.push(self.document.clone());
        }
        if persist {
            self.persist();
        }
        self.notify();
    }

    fn persist(&self) {
        let Some(storage) = &self.storage else {
            return;
        };
        if let Err(e) = storage.save(&self.storage_key, &self.document) {
            log::warn!("Failed to persist document: {}", e);
        }
    }

    /// Call every listener with the current document. Hosts use this when
    /// something outside the document changed, such as a finished decode.
    pub fn notify(&self) {
        let listeners: Vec<Rc<RefCell<Listener>>> = self
            .listeners
            .borrow()
            .entries
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in listeners {
            if let Ok(mut listener) = listener.try_borrow_mut() {
                listener(&self.document);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStorage, Storage};
    use std::cell::Cell;

    fn store() -> Store {
        Store::new(Document::default_template(), &EditorConfig::default())
    }

    #[test]
    fn test_undo_restores_exact_document() {
        let mut store = store();
        let before = store.snapshot();
        let id = store.get().layers[1].id.clone();

        store.update_layer(&id, LayerPatch::new().position(Point::new(0.1, 0.1)), true);
        let after = store.snapshot();
        assert_ne!(before, after);

        assert!(store.undo());
        assert_eq!(store.get(), &before);
        assert!(store.redo());
        assert_eq!(store.get(), &after);
    }

    #[test]
    fn test_undo_after_selection_restores_exact_document() {
        let mut store = store();
        let id = store.get().layers[1].id.clone();
        store.select(vec![id.clone()]);
        let before = store.snapshot();

        store.update_layer(&id, LayerPatch::new().rotation(30.0), true);
        assert!(store.undo());
        assert_eq!(store.get(), &before);
        assert_eq!(store.get().selected_ids(), &[id]);
    }

    #[test]
    fn test_view_changes_survive_undo() {
        let mut store = store();
        let id = store.get().layers[1].id.clone();
        let mut canvas = store.get().canvas.clone();
        canvas.zoom = 2.0;
        canvas.pan = Point::new(40.0, -20.0);
        store.set_state(DocumentPatch::new().with_canvas(canvas), true, false);
        let before = store.snapshot();
        assert!(!store.can_undo());

        store.update_layer(&id, LayerPatch::new().opacity(0.5), true);
        assert!(store.undo());
        assert_eq!(store.get(), &before);
    }

    #[test]
    fn test_gesture_frames_stay_out_of_snapshot() {
        let mut store = store();
        let before = store.snapshot();
        let id = store.get().layers[1].id.clone();

        store.update_layer(&id, LayerPatch::new().position(Point::new(0.2, 0.2)), false);
        store.select(vec![id.clone()]);
        store.commit();
        assert!(store.undo());
        assert_eq!(store.get().layers, before.layers);
        assert_eq!(store.get().selected_ids(), &[id]);
    }

    #[test]
    fn test_new_mutation_discards_redo() {
        let mut store = store();
        let id = store.get().layers[1].id.clone();
        store.update_layer(&id, LayerPatch::new().rotation(10.0), true);
        store.undo();
        assert!(store.can_redo());
        store.update_layer(&id, LayerPatch::new().rotation(20.0), true);
        assert!(!store.can_redo());
        assert!(!store.redo());
    }

    #[test]
    fn test_undo_past_bounds_is_noop() {
        let mut store = store();
        assert!(!store.undo());
        assert!(!store.redo());
    }

    #[test]
    fn test_intermediate_updates_skip_history() {
        let mut store = store();
        let id = store.get().layers[1].id.clone();
        for i in 0..10 {
            store.update_layer(&id, LayerPatch::new().position(Point::new(0.01 * i as f64, 0.5)), false);
        }
        assert_eq!(store.history().len(), 1);
        store.commit();
        assert_eq!(store.history().len(), 2);
        store.undo();
        assert_eq!(store.layer(&id).unwrap().transform.position, Point::new(0.5, 0.3));
    }

    #[test]
    fn test_opacity_clamped_on_write() {
        let mut store = store();
        let id = store.get().layers[1].id.clone();
        store.update_layer(&id, LayerPatch::new().opacity(3.0), true);
        assert_eq!(store.layer(&id).unwrap().opacity, 1.0);

        let mut layers = store.get().layers.clone();
        layers[1].opacity = -1.0;
        store.set_state(DocumentPatch::new().with_layers(layers), true, true);
        assert_eq!(store.layer(&id).unwrap().opacity, 0.0);
    }

    #[test]
    fn test_delete_prunes_selection() {
        let mut store = store();
        let a = store.get().layers[1].id.clone();
        let b = store.get().layers[2].id.clone();
        store.select(vec![a.clone(), b.clone()]);
        assert!(store.delete_layer(&a));
        assert_eq!(store.get().editor.selected_layer_ids, vec![b]);
        assert!(!store.delete_layer(&a));
    }

    #[test]
    fn test_selection_is_not_undoable() {
        let mut store = store();
        let a = store.get().layers[1].id.clone();
        store.select(vec![a]);
        assert!(!store.can_undo());
    }

    #[test]
    fn test_add_layer_appends_to_front() {
        let mut store = store();
        let layer = Layer::image("Photo", Transform::full_canvas(), "photo.png");
        let id = store.add_layer(layer);
        assert_eq!(store.get().layers.last().unwrap().id, id);
        assert!(store.can_undo());
    }

    #[test]
    fn test_every_mutation_stamps_updated_at() {
        let mut store = store();
        let mut meta = store.get().meta.clone();
        meta.updated_at = "1970-01-01T00:00:00Z".to_string();
        store.set_state(DocumentPatch::new().with_meta(meta), false, false);
        assert_ne!(store.get().meta.updated_at, "1970-01-01T00:00:00Z");
    }

    #[test]
    fn test_subscribe_and_unsubscribe() {
        let mut store = store();
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let subscription = store.subscribe(move |_| counter.set(counter.get() + 1));

        store.select(vec![]);
        store.reset();
        assert_eq!(calls.get(), 2);

        assert!(subscription.unsubscribe());
        store.select(vec![]);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_import_failure_leaves_state_untouched() {
        let mut store = store();
        let before = store.snapshot();
        assert!(store.import_json("{ broken").is_err());
        assert_eq!(store.get(), &before);

        let mut other = Document::default_template();
        other.document.title = "Imported".to_string();
        store.import_json(&other.to_json().unwrap()).unwrap();
        assert_eq!(store.get().document.title, "Imported");
        assert!(store.undo());
        assert_eq!(store.get().document.title, "Untitled Design");
    }

    #[test]
    fn test_persistence_round_trip() {
        let config = EditorConfig::default();
        let storage = MemoryStorage::new();
        let mut doc = Document::default_template();
        doc.document.title = "Saved".to_string();
        storage.save(&config.storage_key, &doc).unwrap();

        let store = Store::with_storage(Box::new(storage), &config);
        assert_eq!(store.get().document.title, "Saved");

        let fresh = Store::with_storage(Box::new(MemoryStorage::new()), &config);
        assert_eq!(fresh.get().document.title, "Untitled Design");
    }

    #[test]
    fn test_reset_clears_history() {
        let mut store = store();
        let id = store.get().layers[1].id.clone();
        store.update_layer(&id, LayerPatch::new().rotation(45.0), true);
        store.reset();
        assert!(!store.can_undo());
        assert_eq!(store.get().layers.len(), 6);
    }
}
