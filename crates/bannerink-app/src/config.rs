//! Session configuration.

use bannerink_core::document::{DISPLAY_BOX, Document, ResolutionPreset};
use bannerink_core::storage::DEFAULT_AUTOSAVE_DEBOUNCE_MS;
use std::path::PathBuf;
use std::time::Duration;

/// Settings for an editing session.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Where projects are saved. `None` uses the platform data directory.
    pub storage_dir: Option<PathBuf>,
    /// Base directory for relative image paths.
    pub image_root: Option<PathBuf>,
    /// Quiet period before an autosave.
    pub autosave_debounce: Duration,
    /// Longer side of the on-screen canvas in logical pixels.
    pub display_box: f64,
    /// Resolution for new projects.
    pub default_resolution: ResolutionPreset,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage_dir: None,
            image_root: None,
            autosave_debounce: Duration::from_millis(DEFAULT_AUTOSAVE_DEBOUNCE_MS),
            display_box: DISPLAY_BOX,
            default_resolution: ResolutionPreset::default(),
        }
    }
}

impl AppConfig {
    /// Logical canvas size for a preset under this configuration.
    pub fn canvas_size(&self, preset: ResolutionPreset) -> kurbo::Size {
        preset.logical_canvas_size(self.display_box)
    }

    /// A blank project at the configured default resolution.
    pub fn new_document(&self) -> Document {
        let mut document = Document::new();
        let mut settings = document.export_settings();
        settings.resolution = self.default_resolution;
        document.set_export_settings(settings);
        document.set_canvas_size(self.canvas_size(self.default_resolution));
        document
    }
}
