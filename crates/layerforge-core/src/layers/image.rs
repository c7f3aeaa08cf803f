//! Raster image content.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use kurbo::Rect;
use serde::{Deserialize, Serialize};

/// Crop rectangle as fractions of the source's natural size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Crop {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Crop {
    /// The crop in source pixels for an image of the given natural size.
    pub fn to_source_rect(&self, natural_width: f64, natural_height: f64) -> Rect {
        Rect::new(
            self.x * natural_width,
            self.y * natural_height,
            (self.x + self.width) * natural_width,
            (self.y + self.height) * natural_height,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageContent {
    /// Source URL, file path or `data:` URL.
    pub src: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crop: Option<Crop>,
}

impl ImageContent {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            crop: None,
        }
    }
}

/// Decode the payload of a base64 `data:` URL.
///
/// Returns `None` for anything that is not a base64 data URL.
pub fn decode_data_url(src: &str) -> Option<Vec<u8>> {
    let rest = src.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    if !header.ends_with(";base64") {
        return None;
    }
    STANDARD.decode(payload.trim()).ok()
}
