//! Scriptable document edits.

use crate::error::{AppError, AppResult};
use bannerink_core::color::Background;
use bannerink_core::document::{Document, ExportFormat, ImageRef, OverlayId, ResolutionPreset, TextOverlay, TextStyle};
use bannerink_core::loader::{MAX_IMAGE_BYTES, ResourceLoadError};
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// One user action on the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EditCommand {
    /// Append an image to the end of the list
    AddImage {
        id: String,
        uri: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        byte_size: Option<u64>,
    },
    /// Remove the image at `index`; later images move up a cell
    RemoveImage { index: usize },
    /// Reorder the image list
    MoveImage { from: usize, to: usize },
    /// Change the grid (clamped)
    SetGrid { rows: u32, cols: u32 },
    SetBackground { color: Background },
    /// Add a text overlay. Blank text is ignored.
    AddText {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        style: Option<TextStyle>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        position: Option<Point>,
    },
    UpdateText {
        id: OverlayId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        style: Option<TextStyle>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        position: Option<Point>,
    },
    RemoveText { id: OverlayId },
    /// Change export settings; omitted fields keep their value
    SetExport {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        format: Option<ExportFormat>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        quality: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        resolution: Option<ResolutionPreset>,
    },
}

impl EditCommand {
    /// Parse a JSON array of commands.
    pub fn parse_script(json: &str) -> AppResult<Vec<EditCommand>> {
        Ok(serde_json::from_str(json)?)
    }

    /// Apply the edit to `doc`.
    pub fn apply(self, doc: &mut Document) -> AppResult<()> {
        match self {
            EditCommand::AddImage {
                id,
                uri,
                name,
                byte_size,
            } => {
                let byte_size = byte_size.unwrap_or(0);
                if byte_size > MAX_IMAGE_BYTES {
                    return Err(ResourceLoadError::TooLarge { uri, size: byte_size }.into());
                }
                let mut image = ImageRef::new(id, uri).with_byte_size(byte_size);
                if let Some(name) = name {
                    image = image.with_name(name);
                }
                doc.add_images([image]);
            }
            EditCommand::RemoveImage { index } => {
                doc.remove_image(index)
                    .ok_or_else(|| AppError::Command(format!("no image at index {index}")))?;
            }
            EditCommand::MoveImage { from, to } => {
                if from == to && from < doc.images().len() {
                    return Ok(());
                }
                if !doc.move_image(from, to) {
                    return Err(AppError::Command(format!(
                        "cannot move image {from} to {to} in a list of {}",
                        doc.images().len()
                    )));
                }
            }
            EditCommand::SetGrid { rows, cols } => {
                let applied = doc.set_grid(rows, cols);
                if (applied.rows, applied.cols) != (rows, cols) {
                    log::info!("Grid {rows}x{cols} clamped to {applied}");
                }
            }
            EditCommand::SetBackground { color } => doc.set_background(color),
            EditCommand::AddText { text, style, position } => {
                let mut overlay = TextOverlay::new(text, style.unwrap_or_default());
                if let Some(position) = position {
                    overlay.position = position;
                }
                if !doc.insert_text_overlay(overlay) {
                    log::debug!("Ignoring blank text overlay");
                }
            }
            EditCommand::UpdateText {
                id,
                text,
                style,
                position,
            } => {
                let updated = doc.update_text_overlay(id, |overlay| {
                    if let Some(text) = text {
                        overlay.text = text;
                    }
                    if let Some(style) = style {
                        overlay.style = style;
                    }
                    if let Some(position) = position {
                        overlay.position = position;
                    }
                });
                if !updated {
                    return Err(AppError::Command(format!("no text overlay {id}")));
                }
            }
            EditCommand::RemoveText { id } => {
                doc.remove_text_overlay(id)
                    .ok_or_else(|| AppError::Command(format!("no text overlay {id}")))?;
            }
            EditCommand::SetExport {
                format,
                quality,
                resolution,
            } => {
                let mut settings = doc.export_settings();
                if let Some(format) = format {
                    settings.format = format;
                }
                if let Some(quality) = quality {
                    settings.quality = quality;
                }
                if let Some(resolution) = resolution {
                    settings.resolution = resolution;
                }
                doc.set_export_settings(settings);
            }
        }
        Ok(())
    }
}
