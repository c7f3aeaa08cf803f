//! LayerForge Core Library
//!
//! Document model, coordinate math, undoable store and the direct
//! manipulation engine for the LayerForge design editor.

pub mod actions;
pub mod camera;
pub mod color;
pub mod config;
pub mod document;
pub mod export;
pub mod geometry;
pub mod history;
pub mod input;
pub mod interaction;
pub mod layers;
pub mod selection;
pub mod storage;
pub mod store;

pub use actions::{AlignEdge, Clipboard, DistributeMode, ZExtreme};
pub use camera::Camera;
pub use config::EditorConfig;
pub use document::{Document, DocumentError, DocumentResult};
pub use export::{ElementGeometry, element_geometry, payload_base64};
pub use history::History;
pub use input::{Key, Modifiers, MouseButton, PointerInput};
pub use interaction::{Interaction, InteractionOutput, InteractionState};
pub use layers::{Layer, LayerContent, LayerId, LayerKind, Transform};
pub use selection::{Handle, HandleKind};
pub use storage::{MemoryStorage, Storage, StorageError, StorageResult};
pub use store::{DocumentPatch, LayerPatch, Store, Subscription};
