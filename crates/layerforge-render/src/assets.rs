//! Decoded raster cache for image and vector layers.
//!
//! Decoding happens on a worker thread. The render thread asks for an asset
//! and gets its current state back immediately; completed decodes are
//! drained with [`AssetCache::poll`].

use std::collections::HashMap;
use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use layerforge_core::layers::{LayerId, VectorContent, decode_data_url};
use thiserror::Error;
use tiny_skia::Pixmap;

use crate::surface::Raster;

/// Long-edge size vector icons are rasterized at, at minimum.
pub const VECTOR_RASTER_SIZE: f64 = 512.0;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("Unsupported image source: {0}")]
    Unsupported(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Decode failed: {0}")]
    Decode(String),
}

pub type AssetResult<T> = Result<T, AssetError>;

/// Cache key. Vector entries are tied to the layer and the exact recolored
/// markup they were rasterized from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AssetKey {
    Image(String),
    Vector { layer_id: LayerId, color: String, fingerprint: String },
}

impl AssetKey {
    pub fn vector(layer_id: &str, content: &VectorContent) -> Self {
        AssetKey::Vector {
            layer_id: layer_id.to_string(),
            color: content.color.clone(),
            fingerprint: content.fingerprint(),
        }
    }

    fn vector_layer(&self) -> Option<&str> {
        match self {
            AssetKey::Vector { layer_id, .. } => Some(layer_id),
            AssetKey::Image(_) => None,
        }
    }
}

/// Where an asset is in its lifecycle.
#[derive(Debug, Clone)]
pub enum AssetState {
    Pending,
    Ready(Raster),
    /// Decoding failed; the layer keeps its placeholder.
    Failed,
}

enum Job {
    Image(String),
    Vector(String),
}

type Completion = (AssetKey, AssetResult<Raster>);

/// Asset cache with a background decoder.
pub struct AssetCache {
    entries: HashMap<AssetKey, AssetState>,
    jobs: Option<Sender<(AssetKey, Job)>>,
    completions: Receiver<Completion>,
    in_flight: usize,
    worker: Option<JoinHandle<()>>,
}

impl Default for AssetCache {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetCache {
    pub fn new() -> Self {
        let (job_tx, job_rx) = mpsc::channel::<(AssetKey, Job)>();
        let (done_tx, done_rx) = mpsc::channel::<Completion>();

        let worker = thread::Builder::new()
            .name("layerforge-assets".to_string())
            .spawn(move || {
                for (key, job) in job_rx {
                    let result = match job {
                        Job::Image(src) => load_image(&src),
                        Job::Vector(xml) => rasterize_svg(&xml),
                    };
                    if done_tx.send((key, result)).is_err() {
                        break;
                    }
                }
            });

        let worker = match worker {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::error!("Failed to start asset decoder: {}", e);
                None
            }
        };

        Self {
            entries: HashMap::new(),
            jobs: worker.as_ref().map(|_| job_tx),
            completions: done_rx,
            in_flight: 0,
            worker,
        }
    }

    /// State of an image source, requesting its decode on first use.
    pub fn image(&mut self, src: &str) -> AssetState {
        let key = AssetKey::Image(src.to_string());
        self.get_or_request(key, || Job::Image(src.to_string()))
    }

    /// State of a vector layer's raster, requesting it on first use.
    pub fn vector(&mut self, layer_id: &str, content: &VectorContent) -> AssetState {
        let key = AssetKey::vector(layer_id, content);
        self.get_or_request(key, || Job::Vector(content.recolored()))
    }

    pub fn state(&self, key: &AssetKey) -> Option<&AssetState> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of requests the worker has not answered yet.
    pub fn pending(&self) -> usize {
        self.in_flight
    }

    fn get_or_request(&mut self, key: AssetKey, job: impl FnOnce() -> Job) -> AssetState {
        if let Some(state) = self.entries.get(&key) {
            return state.clone();
        }

        let sent = match &self.jobs {
            Some(jobs) => jobs.send((key.clone(), job())).is_ok(),
            None => false,
        };
        let state = if sent {
            self.in_flight += 1;
            AssetState::Pending
        } else {
            log::warn!("Asset decoder unavailable, dropping request");
            AssetState::Failed
        };
        self.entries.insert(key, state.clone());
        state
    }

    /// Drain finished decodes. Returns true when any entry changed, so the
    /// host can notify the store and schedule a frame.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Ok((key, result)) = self.completions.try_recv() {
            self.finish(key, result);
            changed = true;
        }
        changed
    }

    /// Block until every requested asset is ready or failed.
    pub fn resolve_pending(&mut self) {
        while self.in_flight > 0 {
            match self.completions.recv() {
                Ok((key, result)) => self.finish(key, result),
                Err(_) => {
                    log::error!("Asset decoder stopped with {} requests pending", self.in_flight);
                    break;
                }
            }
        }
    }

    fn finish(&mut self, key: AssetKey, result: AssetResult<Raster>) {
        self.in_flight = self.in_flight.saturating_sub(1);
        let state = match result {
            Ok(raster) => AssetState::Ready(raster),
            Err(e) => {
                match &key {
                    AssetKey::Image(src) => log::warn!("Failed to decode image {}: {}", src, e),
                    AssetKey::Vector { layer_id, .. } => {
                        log::warn!("Failed to rasterize vector layer {}: {}", layer_id, e)
                    }
                }
                AssetState::Failed
            }
        };

        // Older rasters of the same vector layer are dead once a newer one lands.
        if matches!(state, AssetState::Ready(_)) {
            if let Some(layer_id) = key.vector_layer() {
                let stale: Vec<AssetKey> = self
                    .entries
                    .keys()
                    .filter(|k| k.vector_layer() == Some(layer_id) && **k != key)
                    .cloned()
                    .collect();
                for k in stale {
                    self.entries.remove(&k);
                }
            }
        }
        self.entries.insert(key, state);
    }
}

impl Drop for AssetCache {
    fn drop(&mut self) {
        self.jobs = None;
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// Decode an image source: a base64 `data:` URL or a local file path.
pub fn load_image(src: &str) -> AssetResult<Raster> {
    let bytes = if src.starts_with("data:") {
        decode_data_url(src).ok_or_else(|| AssetError::Decode("malformed data URL".to_string()))?
    } else if let Some(path) = src.strip_prefix("file://") {
        std::fs::read(Path::new(path))?
    } else if src.contains("://") {
        return Err(AssetError::Unsupported(src.to_string()));
    } else {
        std::fs::read(Path::new(src))?
    };

    let decoded = image::load_from_memory(&bytes).map_err(|e| AssetError::Decode(e.to_string()))?;
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    Raster::from_rgba8(width, height, rgba.into_raw())
        .ok_or_else(|| AssetError::Decode(format!("invalid image size {}x{}", width, height)))
}

/// Rasterize SVG markup with its long edge at least [`VECTOR_RASTER_SIZE`].
pub fn rasterize_svg(xml: &str) -> AssetResult<Raster> {
    let tree = usvg::Tree::from_str(xml, &usvg::Options::default())
        .map_err(|e| AssetError::Decode(e.to_string()))?;
    let size = tree.size();
    let (width, height) = (f64::from(size.width()), f64::from(size.height()));
    let long = width.max(height);
    let scale = if long < VECTOR_RASTER_SIZE { VECTOR_RASTER_SIZE / long } else { 1.0 };

    let px_w = (width * scale).ceil().max(1.0) as u32;
    let px_h = (height * scale).ceil().max(1.0) as u32;
    let mut pixmap = Pixmap::new(px_w, px_h)
        .ok_or_else(|| AssetError::Decode(format!("invalid raster size {}x{}", px_w, px_h)))?;
    resvg::render(
        &tree,
        tiny_skia::Transform::from_scale(scale as f32, scale as f32),
        &mut pixmap.as_mut(),
    );
    Ok(Raster::new(pixmap))
}
