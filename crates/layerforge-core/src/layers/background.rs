//! Background fill content.

use serde::{Deserialize, Serialize};

/// Fill style. Only solid fills are drawn; gradient fills render with their
/// first color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillKind {
    #[default]
    Solid,
    Linear,
    Radial,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    #[serde(rename = "type", default)]
    pub kind: FillKind,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub angle: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackgroundContent {
    pub fill: Fill,
}

impl BackgroundContent {
    pub fn solid(color: impl Into<String>) -> Self {
        Self {
            fill: Fill {
                kind: FillKind::Solid,
                colors: vec![color.into()],
                angle: 0.0,
            },
        }
    }

    /// The color the background is painted with, if any.
    pub fn primary_color(&self) -> Option<&str> {
        self.fill.colors.first().map(String::as_str)
    }
}
