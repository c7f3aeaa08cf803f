//! Font availability against the system font database.

use std::sync::Arc;

use layerforge_core::document::Document;
use layerforge_core::store::{DocumentPatch, Store};
use usvg::fontdb;

/// CSS generic families; always resolvable.
const GENERIC_FAMILIES: &[&str] = &["serif", "sans-serif", "monospace", "cursive", "fantasy"];

/// Installed fonts, shared with the text rasterizer.
#[derive(Clone)]
pub struct FontBook {
    db: Arc<fontdb::Database>,
}

impl Default for FontBook {
    fn default() -> Self {
        Self::empty()
    }
}

impl FontBook {
    /// A book with no fonts. Only generic families resolve.
    pub fn empty() -> Self {
        Self { db: Arc::new(fontdb::Database::new()) }
    }

    /// Load every font installed on the system.
    pub fn system() -> Self {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        log::debug!("Loaded {} font faces", db.len());
        Self { db: Arc::new(db) }
    }

    /// Register a font from memory, e.g. an embedded or downloaded file.
    pub fn load_font_data(&mut self, data: Vec<u8>) {
        Arc::make_mut(&mut self.db).load_font_data(data);
    }

    pub fn database(&self) -> Arc<fontdb::Database> {
        Arc::clone(&self.db)
    }

    pub fn has_family(&self, family: &str) -> bool {
        if GENERIC_FAMILIES.iter().any(|g| g.eq_ignore_ascii_case(family)) {
            return true;
        }
        self.db
            .faces()
            .any(|face| face.families.iter().any(|(name, _)| name.eq_ignore_ascii_case(family)))
    }

    /// Fonts used by text layers that are not installed, sorted.
    pub fn missing_fonts(&self, doc: &Document) -> Vec<String> {
        doc.fonts_in_use()
            .into_iter()
            .filter(|font| !self.has_family(font))
            .collect()
    }

    /// Rewrite every text line using a missing font to `fallback`, as one
    /// history entry. Returns the fonts that were replaced.
    pub fn apply_fallback(&self, store: &mut Store, fallback: &str) -> Vec<String> {
        let missing = self.missing_fonts(store.get());
        if missing.is_empty() {
            return missing;
        }

        let mut doc = store.snapshot();
        let mut replaced = Vec::new();
        for font in missing {
            if font != fallback && doc.replace_font(&font, fallback) {
                log::warn!("Font '{}' is not available, using '{}'", font, fallback);
                replaced.push(font);
            }
        }
        if !replaced.is_empty() {
            store.set_state(DocumentPatch::new().with_layers(doc.layers), true, true);
        }
        replaced
    }
}
