//! JSON shape exchanged with the project persistence API.
//!
//! The payload carries primitive fields only: images are referenced by id
//! and resolved back into [`ImageRef`]s by the caller's image catalog.

use crate::color::Background;
use crate::document::{Document, ExportSettings, GridSize, ImageId, ImageRef, TextOverlay};
use serde::{Deserialize, Serialize};

/// Project fields as sent to / received from the projects endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectPayload {
    #[serde(default)]
    pub images: Vec<ImageId>,
    #[serde(default)]
    pub grid_size: GridSize,
    #[serde(default = "default_background")]
    pub background_color: Background,
    #[serde(default)]
    pub text_overlays: Vec<TextOverlay>,
    #[serde(default)]
    pub export_settings: ExportSettings,
}

fn default_background() -> Background {
    Document::new().background()
}

impl Document {
    /// Snapshot the document in wire form.
    pub fn to_payload(&self) -> ProjectPayload {
        ProjectPayload {
            images: self.images().iter().map(|image| image.id.clone()).collect(),
            grid_size: self.grid(),
            background_color: self.background(),
            text_overlays: self.text_overlays().to_vec(),
            export_settings: self.export_settings(),
        }
    }

    /// Rebuild a document from wire form.
    ///
    /// `resolve` maps image ids to references; ids it cannot resolve are
    /// dropped. Out-of-range grid and quality values are clamped.
    pub fn from_payload(
        id: impl Into<String>,
        name: impl Into<String>,
        payload: ProjectPayload,
        mut resolve: impl FnMut(&ImageId) -> Option<ImageRef>,
    ) -> Self {
        let mut doc = Document::new().with_name(name);
        doc.id = id.into();

        let images = payload.images.iter().filter_map(|image_id| {
            let resolved = resolve(image_id);
            if resolved.is_none() {
                log::warn!("Dropping unknown image {image_id} from project {}", doc.id);
            }
            resolved
        });
        let images: Vec<ImageRef> = images.collect();
        doc.add_images(images);

        if !payload.grid_size.is_valid() {
            log::warn!("Clamping out-of-range grid {}", payload.grid_size);
        }
        doc.set_grid(payload.grid_size.rows, payload.grid_size.cols);
        doc.set_background(payload.background_color);
        doc.set_export_settings(payload.export_settings);
        for overlay in payload.text_overlays {
            let id = overlay.id;
            if !doc.insert_text_overlay(overlay) {
                log::warn!("Skipping blank or duplicate text overlay {id}");
            }
        }
        doc.mark_all_changed();
        doc
    }
}
