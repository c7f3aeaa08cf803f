//! Frame coalescing.

use std::cell::Cell;
use std::rc::Rc;

use layerforge_core::store::{Store, Subscription};

/// Collapses any number of redraw requests into one frame per tick.
///
/// The host calls [`FrameScheduler::take_frame`] once per display refresh
/// and renders only when it returns true.
#[derive(Debug, Clone, Default)]
pub struct FrameScheduler {
    dirty: Rc<Cell<bool>>,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.dirty.set(true);
    }

    pub fn is_pending(&self) -> bool {
        self.dirty.get()
    }

    /// Whether a frame should be drawn this tick. Clears the request.
    pub fn take_frame(&self) -> bool {
        self.dirty.replace(false)
    }

    /// Request a frame after every store change.
    pub fn attach(&self, store: &Store) -> Subscription {
        let dirty = Rc::clone(&self.dirty);
        store.subscribe(move |_| dirty.set(true))
    }
}
