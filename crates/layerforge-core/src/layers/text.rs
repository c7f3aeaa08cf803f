//! Multi-line text content.

use serde::{Deserialize, Serialize};

/// Default line height multiplier when a line does not specify one.
pub const DEFAULT_LINE_HEIGHT: f64 = 1.2;

/// Horizontal alignment of every line in the box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// Stroke drawn around glyph outlines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextOutline {
    pub color: String,
    pub width: f64,
}

/// A single styled line of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextLine {
    pub text: String,
    #[serde(default = "default_font")]
    pub font: String,
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_height: Option<f64>,
    #[serde(default)]
    pub letter_spacing: f64,
}

fn default_font() -> String {
    "Inter".to_string()
}

fn default_font_size() -> f64 {
    16.0
}

fn default_color() -> String {
    "#000000".to_string()
}

impl TextLine {
    pub fn new(text: impl Into<String>, font: impl Into<String>, font_size: f64) -> Self {
        Self {
            text: text.into(),
            font: font.into(),
            font_size,
            bold: false,
            italic: false,
            color: default_color(),
            line_height: None,
            letter_spacing: 0.0,
        }
    }

    /// Height of the strip this line occupies: `fontSize × lineHeight`.
    pub fn strip_height(&self) -> f64 {
        self.font_size * self.line_height.unwrap_or(DEFAULT_LINE_HEIGHT)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    #[serde(default)]
    pub align: TextAlign,
    /// Render every line uppercased.
    #[serde(default)]
    pub capitalize: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outline: Option<TextOutline>,
    #[serde(default)]
    pub lines: Vec<TextLine>,
}

impl TextContent {
    pub fn new(align: TextAlign, lines: Vec<TextLine>) -> Self {
        Self {
            align,
            capitalize: false,
            outline: None,
            lines,
        }
    }

    /// Total stacked height of all lines in canvas pixels.
    pub fn block_height(&self) -> f64 {
        self.lines.iter().map(TextLine::strip_height).sum()
    }

    /// The string drawn for a line, after the capitalize transform.
    pub fn display_text(&self, line: &TextLine) -> String {
        if self.capitalize {
            line.text.to_uppercase()
        } else {
            line.text.clone()
        }
    }

    /// Top of each line strip relative to the box top, with the block
    /// vertically centered in a box of `box_height` pixels.
    pub fn line_offsets(&self, box_height: f64) -> Vec<f64> {
        let mut y = (box_height - self.block_height()) / 2.0;
        self.lines
            .iter()
            .map(|line| {
                let top = y;
                y += line.strip_height();
                top
            })
            .collect()
    }

    /// Replace `font` with `fallback` on every line; returns whether any
    /// line changed.
    pub fn replace_font(&mut self, font: &str, fallback: &str) -> bool {
        let mut changed = false;
        for line in &mut self.lines {
            if line.font == font {
                line.font = fallback.to_string();
                changed = true;
            }
        }
        changed
    }
}
