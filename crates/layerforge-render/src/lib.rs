//! LayerForge Render Library
//!
//! Surface abstraction, asset pipeline and the document renderer used for
//! both the live view and raster export.

pub mod assets;
pub mod export;
pub mod fonts;
mod pixmap;
pub mod recording;
mod renderer;
pub mod scheduler;
pub mod surface;

pub use assets::{AssetCache, AssetError, AssetKey, AssetState};
pub use export::{ExportFormat, export, export_jpeg, export_png, live_scale, render_pixmap};
pub use fonts::FontBook;
pub use pixmap::PixmapSurface;
pub use recording::{DrawCommand, RecordingSurface};
pub use renderer::{EditTarget, RenderContext, RenderResult, Renderer, RendererError};
pub use scheduler::FrameScheduler;
pub use surface::{Raster, Surface, TextStyle};
