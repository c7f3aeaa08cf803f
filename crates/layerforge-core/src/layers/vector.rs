//! Vector icon content (SVG markup with a single tint color).

use kurbo::Size;
use serde::{Deserialize, Serialize};

/// Number of leading markup characters that feed the cache fingerprint.
const FINGERPRINT_PREFIX_CHARS: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorContent {
    pub xml: String,
    #[serde(default = "default_color")]
    pub color: String,
}

fn default_color() -> String {
    "#000000".to_string()
}

impl VectorContent {
    pub fn new(xml: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            xml: xml.into(),
            color: color.into(),
        }
    }

    /// Markup with every fill/stroke attribute set to the tint color.
    pub fn recolored(&self) -> String {
        recolor_svg(&self.xml, &self.color)
    }

    /// Cheap change detector: the first characters plus the total length.
    pub fn fingerprint(&self) -> String {
        let prefix: String = self.xml.chars().take(FINGERPRINT_PREFIX_CHARS).collect();
        format!("{}{}", prefix, self.xml.len())
    }
}

/// Replace the value of every `fill="..."` and `stroke="..."` attribute.
pub fn recolor_svg(xml: &str, color: &str) -> String {
    if !xml.contains("<svg") {
        return xml.to_string();
    }
    let filled = replace_attribute(xml, "fill", color);
    replace_attribute(&filled, "stroke", color)
}

fn replace_attribute(xml: &str, attr: &str, value: &str) -> String {
    let needle = format!("{attr}=\"");
    let mut out = String::with_capacity(xml.len());
    let mut rest = xml;
    while let Some(start) = rest.find(&needle) {
        let value_start = start + needle.len();
        let Some(len) = rest[value_start..].find('"') else {
            break;
        };
        out.push_str(&rest[..value_start]);
        out.push_str(value);
        out.push('"');
        rest = &rest[value_start + len + 1..];
    }
    out.push_str(rest);
    out
}

/// Natural size of SVG markup from its `viewBox`, falling back to numeric
/// `width`/`height` attributes.
pub fn svg_natural_size(xml: &str) -> Option<Size> {
    if let Some(view_box) = attribute_value(xml, "viewBox") {
        let parts: Vec<f64> = view_box
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|s| !s.is_empty())
            .filter_map(|s| s.parse().ok())
            .collect();
        if parts.len() == 4 {
            return Some(Size::new(parts[2], parts[3]));
        }
    }

    let width = parse_length(attribute_value(xml, "width")?)?;
    let height = parse_length(attribute_value(xml, "height")?)?;
    Some(Size::new(width, height))
}

/// Value of the first `name="..."` or `name='...'` attribute that is not
/// part of a longer attribute name.
fn attribute_value<'a>(xml: &'a str, name: &str) -> Option<&'a str> {
    let mut search_from = 0;
    while let Some(found) = xml[search_from..].find(name) {
        let start = search_from + found;
        let after = start + name.len();
        search_from = after;

        let preceded_ok = xml[..start]
            .chars()
            .next_back()
            .is_some_and(char::is_whitespace);
        let rest = &xml[after..];
        let Some(rest) = rest.strip_prefix('=') else {
            continue;
        };
        if !preceded_ok {
            continue;
        }
        let quote = rest.chars().next()?;
        if quote != '"' && quote != '\'' {
            continue;
        }
        let body = &rest[1..];
        let end = body.find(quote)?;
        return Some(&body[..end]);
    }
    None
}

fn parse_length(value: &str) -> Option<f64> {
    let numeric = value.trim().trim_end_matches("px");
    numeric.parse().ok()
}
