//! Per-layer pixel geometry for the external catalog format.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::layers::{Layer, LayerContent, LayerId, decode_data_url};

/// Pixel placement of one layer as the catalog exporter consumes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementGeometry {
    pub id: LayerId,
    #[serde(rename = "type")]
    pub type_code: u8,
    /// Unrotated top-left corner.
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    /// Degrees, as stored on the layer.
    pub angle: f64,
    pub opacity: f64,
}

impl ElementGeometry {
    pub fn from_layer(layer: &Layer, doc: &Document) -> Self {
        let rect = layer.pixel_rect(doc.canvas_size());
        Self {
            id: layer.id.clone(),
            type_code: layer.kind().code(),
            left: rect.x0,
            top: rect.y0,
            width: rect.width(),
            height: rect.height(),
            angle: layer.transform.rotation,
            opacity: layer.opacity,
        }
    }
}

/// Geometry for every layer, back to front.
pub fn element_geometry(doc: &Document) -> Vec<ElementGeometry> {
    doc.layers
        .iter()
        .map(|layer| ElementGeometry::from_layer(layer, doc))
        .collect()
}

/// Embedded payload for raster and vector layers.
///
/// Vector layers carry their markup; image layers carry the decoded bytes
/// of a `data:` source. Remote or file sources have no inline payload.
pub fn payload_base64(layer: &Layer) -> Option<String> {
    match &layer.content {
        LayerContent::Vector(vector) => Some(STANDARD.encode(vector.xml.as_bytes())),
        LayerContent::Image(image) => decode_data_url(&image.src).map(|bytes| STANDARD.encode(bytes)),
        _ => None,
    }
}
