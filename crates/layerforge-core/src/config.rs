//! Editor configuration.

use serde::{Deserialize, Serialize};

/// Tunable constants shared by the store, the interaction engine and the
/// renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Maximum number of history snapshots kept.
    pub history_capacity: usize,
    /// Smallest normalized width/height a resize may produce.
    pub min_size: f64,
    /// Arrow-key nudge in canvas pixels.
    pub nudge_step_px: f64,
    /// Arrow-key nudge with Shift held.
    pub nudge_step_large_px: f64,
    /// Normalized offset applied to duplicated layers.
    pub duplicate_offset: f64,
    /// Normalized offset applied to pasted layers.
    pub paste_offset: f64,
    /// Largest physical buffer dimension for the live view.
    pub max_buffer_px: u32,
    /// Handle square size in screen pixels.
    pub handle_size: f64,
    /// Extra slop around handles when hit testing.
    pub handle_hit_tolerance: f64,
    /// Distance of the rotate handle above the top edge, in screen pixels.
    pub rotate_handle_offset: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Screen pixels of canvas that must stay visible while panning.
    pub pan_margin: f64,
    /// Viewport assumed until the host reports its real size.
    pub viewport_width: f64,
    pub viewport_height: f64,
    pub double_click_ms: u64,
    pub double_click_distance: f64,
    /// Font substituted when a requested family is unavailable.
    pub fallback_font: String,
    /// Storage key of the persisted working document.
    pub storage_key: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_capacity: 50,
            min_size: 0.01,
            nudge_step_px: 1.0,
            nudge_step_large_px: 10.0,
            duplicate_offset: 0.05,
            paste_offset: 0.02,
            max_buffer_px: 4096,
            handle_size: 8.0,
            handle_hit_tolerance: 4.0,
            rotate_handle_offset: 25.0,
            min_zoom: 0.1,
            max_zoom: 5.0,
            pan_margin: 100.0,
            viewport_width: 1280.0,
            viewport_height: 800.0,
            double_click_ms: 500,
            double_click_distance: 5.0,
            fallback_font: "Arial".to_string(),
            storage_key: "design_editor_state".to_string(),
        }
    }
}

impl EditorConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Clamp a zoom level into the configured range.
    pub fn clamp_zoom(&self, zoom: f64) -> f64 {
        zoom.clamp(self.min_zoom, self.max_zoom)
    }
}
