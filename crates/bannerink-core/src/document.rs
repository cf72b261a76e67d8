//! Banner document model and state management.
//!
//! The [`Document`] is the authoritative, serializable state of one banner.
//! It carries no drawing handles; every mutation records what changed so the
//! render synchronizer can update only the affected layers.

use crate::color::{Background, ColorParseError, Rgba};
use kurbo::{Point, Size};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Smallest allowed row/column count.
pub const MIN_GRID_DIM: u32 = 1;
/// Largest allowed row/column count.
pub const MAX_GRID_DIM: u32 = 6;
/// Lowest accepted JPEG quality.
pub const MIN_QUALITY: u32 = 10;
/// Highest accepted JPEG quality.
pub const MAX_QUALITY: u32 = 100;
/// The longer side of the on-screen canvas, in display pixels.
pub const DISPLAY_BOX: f64 = 600.0;

/// Validation failures for document values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Grid {rows}x{cols} is outside 1..=6")]
    GridOutOfBounds { rows: u32, cols: u32 },
    #[error("Quality {0} is outside 10..=100")]
    QualityOutOfBounds(u32),
    #[error("Canvas size {width}x{height} must be positive and finite")]
    InvalidCanvasSize { width: f64, height: f64 },
    #[error("Unknown resolution preset: {0}")]
    UnknownResolution(String),
    #[error("Unknown export format: {0}")]
    UnknownFormat(String),
    #[error(transparent)]
    Color(#[from] ColorParseError),
}

/// Number of rows and columns in the image grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridSize {
    pub rows: u32,
    pub cols: u32,
}

impl Default for GridSize {
    fn default() -> Self {
        Self { rows: 2, cols: 2 }
    }
}

impl GridSize {
    /// Build a grid size with both dimensions clamped into the allowed range.
    pub fn clamped(rows: u32, cols: u32) -> Self {
        Self {
            rows: rows.clamp(MIN_GRID_DIM, MAX_GRID_DIM),
            cols: cols.clamp(MIN_GRID_DIM, MAX_GRID_DIM),
        }
    }

    /// This grid with out-of-range dimensions clamped.
    pub fn sanitized(self) -> Self {
        Self::clamped(self.rows, self.cols)
    }

    pub fn is_valid(&self) -> bool {
        (MIN_GRID_DIM..=MAX_GRID_DIM).contains(&self.rows)
            && (MIN_GRID_DIM..=MAX_GRID_DIM).contains(&self.cols)
    }

    /// Number of cells, i.e. the maximum number of placed images.
    pub fn capacity(&self) -> usize {
        self.rows as usize * self.cols as usize
    }
}

impl fmt::Display for GridSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

/// Identity of an uploaded image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageId(pub String);

impl ImageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reference to an image resource owned by the blob store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub id: ImageId,
    /// Where to fetch the bytes from (path, `file://` or `data:` URI).
    pub source_uri: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub byte_size: u64,
}

impl ImageRef {
    pub fn new(id: impl Into<String>, source_uri: impl Into<String>) -> Self {
        let id = ImageId::new(id);
        Self {
            display_name: id.0.clone(),
            id,
            source_uri: source_uri.into(),
            byte_size: 0,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    pub fn with_byte_size(mut self, size: u64) -> Self {
        self.byte_size = size;
        self
    }
}

/// Stable identity of a text overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OverlayId(pub Uuid);

impl OverlayId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OverlayId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OverlayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// Visual style of a text overlay. Applied verbatim to its drawable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextStyle {
    pub font_family: String,
    pub font_size: f64,
    pub color: Rgba,
    pub font_weight: FontWeight,
    pub font_style: FontStyle,
    pub text_align: TextAlign,
    pub background_color: Background,
    /// Space between the text and the edge of its background box.
    pub padding: f64,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_family: "Arial".to_string(),
            font_size: 24.0,
            color: Rgba::black(),
            font_weight: FontWeight::Normal,
            font_style: FontStyle::Normal,
            text_align: TextAlign::Left,
            background_color: Background::Transparent,
            padding: 10.0,
        }
    }
}

impl TextStyle {
    pub fn is_bold(&self) -> bool {
        self.font_weight == FontWeight::Bold
    }

    pub fn is_italic(&self) -> bool {
        self.font_style == FontStyle::Italic
    }
}

/// A free-floating text element positioned in logical canvas coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextOverlay {
    pub id: OverlayId,
    pub text: String,
    pub style: TextStyle,
    pub position: Point,
}

impl TextOverlay {
    /// Where new overlays are dropped.
    pub const DEFAULT_POSITION: Point = Point::new(50.0, 50.0);

    pub fn new(text: impl Into<String>, style: TextStyle) -> Self {
        Self {
            id: OverlayId::new(),
            text: text.into(),
            style,
            position: Self::DEFAULT_POSITION,
        }
    }
}

/// Output encoding of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExportFormat {
    /// Lossless, keeps transparency.
    #[default]
    #[serde(rename = "png")]
    Png,
    /// Lossy, transparency is flattened.
    #[serde(rename = "jpg", alias = "jpeg")]
    Jpeg,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpeg => "jpg",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Png => "image/png",
            ExportFormat::Jpeg => "image/jpeg",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(ExportFormat::Png),
            "jpg" | "jpeg" => Ok(ExportFormat::Jpeg),
            _ => Err(ValidationError::UnknownFormat(s.to_string())),
        }
    }
}

/// Named export resolutions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ResolutionPreset {
    #[serde(rename = "1080p")]
    Hd1080,
    #[default]
    #[serde(rename = "2K")]
    Square2k,
    #[serde(rename = "4K")]
    Square4k,
}

impl ResolutionPreset {
    pub fn all() -> &'static [ResolutionPreset] {
        &[
            ResolutionPreset::Hd1080,
            ResolutionPreset::Square2k,
            ResolutionPreset::Square4k,
        ]
    }

    /// Target pixel dimensions `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            ResolutionPreset::Hd1080 => (1920, 1080),
            ResolutionPreset::Square2k => (2048, 2048),
            ResolutionPreset::Square4k => (4096, 4096),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ResolutionPreset::Hd1080 => "1080p",
            ResolutionPreset::Square2k => "2K",
            ResolutionPreset::Square4k => "4K",
        }
    }

    /// On-screen canvas size with this preset's aspect ratio, whose longer
    /// side is `display_box` pixels.
    pub fn logical_canvas_size(&self, display_box: f64) -> Size {
        let (width, height) = self.dimensions();
        let aspect = width as f64 / height as f64;
        if aspect >= 1.0 {
            Size::new(display_box, display_box / aspect)
        } else {
            Size::new(display_box * aspect, display_box)
        }
    }
}

impl fmt::Display for ResolutionPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ResolutionPreset {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|preset| preset.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::UnknownResolution(s.to_string()))
    }
}

/// How the banner is rasterized on export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub format: ExportFormat,
    /// JPEG quality, ignored for PNG.
    pub quality: u32,
    pub resolution: ResolutionPreset,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            format: ExportFormat::Png,
            quality: 90,
            resolution: ResolutionPreset::Square2k,
        }
    }
}

impl ExportSettings {
    /// Clamp a quality value into the accepted range.
    pub fn clamp_quality(quality: u32) -> u32 {
        quality.clamp(MIN_QUALITY, MAX_QUALITY)
    }

    pub fn sanitized(mut self) -> Self {
        self.quality = Self::clamp_quality(self.quality);
        self
    }
}

/// Aspects of a document touched since the last sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChangeSet {
    pub canvas_size: bool,
    pub background: bool,
    /// Image list or grid size.
    pub images: bool,
    pub text: bool,
}

impl ChangeSet {
    /// Every aspect changed (initial mount, project switch).
    pub const ALL: ChangeSet = ChangeSet {
        canvas_size: true,
        background: true,
        images: true,
        text: true,
    };

    pub const NONE: ChangeSet = ChangeSet {
        canvas_size: false,
        background: false,
        images: false,
        text: false,
    };

    pub fn is_empty(&self) -> bool {
        *self == Self::NONE
    }
}

impl BitOr for ChangeSet {
    type Output = ChangeSet;

    fn bitor(self, rhs: Self) -> Self::Output {
        ChangeSet {
            canvas_size: self.canvas_size || rhs.canvas_size,
            background: self.background || rhs.background,
            images: self.images || rhs.images,
            text: self.text || rhs.text,
        }
    }
}

impl BitOrAssign for ChangeSet {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = *self | rhs;
    }
}

/// A banner document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Project identity used as the storage key.
    pub id: String,
    /// Project name (used for export filenames).
    pub name: String,
    grid: GridSize,
    background: Background,
    images: Vec<ImageRef>,
    text_overlays: Vec<TextOverlay>,
    canvas_size: Size,
    export_settings: ExportSettings,
    /// Changes not yet applied to the composition surface.
    #[serde(skip, default = "all_changed")]
    changes: ChangeSet,
}

fn all_changed() -> ChangeSet {
    ChangeSet::ALL
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a new document with a 2x2 grid on a white background.
    pub fn new() -> Self {
        let export_settings = ExportSettings::default();
        Self {
            id: Uuid::new_v4().to_string(),
            name: "Untitled".to_string(),
            grid: GridSize::default(),
            background: Background::Solid(Rgba::white()),
            images: Vec::new(),
            text_overlays: Vec::new(),
            canvas_size: export_settings.resolution.logical_canvas_size(DISPLAY_BOX),
            export_settings,
            changes: ChangeSet::ALL,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn grid(&self) -> GridSize {
        self.grid
    }

    pub fn background(&self) -> Background {
        self.background
    }

    pub fn images(&self) -> &[ImageRef] {
        &self.images
    }

    /// Images that receive a grid cell (the first `rows * cols`).
    pub fn placed_images(&self) -> &[ImageRef] {
        let count = self.images.len().min(self.grid.sanitized().capacity());
        &self.images[..count]
    }

    pub fn text_overlays(&self) -> &[TextOverlay] {
        &self.text_overlays
    }

    pub fn text_overlay(&self, id: OverlayId) -> Option<&TextOverlay> {
        self.text_overlays.iter().find(|overlay| overlay.id == id)
    }

    /// Logical (display) canvas size.
    pub fn canvas_size(&self) -> Size {
        self.canvas_size
    }

    pub fn export_settings(&self) -> ExportSettings {
        self.export_settings
    }

    /// Drain the pending change set.
    pub fn take_changes(&mut self) -> ChangeSet {
        std::mem::take(&mut self.changes)
    }

    pub fn pending_changes(&self) -> ChangeSet {
        self.changes
    }

    /// Mark every aspect as changed so the next sync rebuilds the surface.
    pub fn mark_all_changed(&mut self) {
        self.changes = ChangeSet::ALL;
    }

    /// Append images to the end of the list.
    pub fn add_images(&mut self, images: impl IntoIterator<Item = ImageRef>) -> usize {
        let before = self.images.len();
        self.images.extend(images);
        let added = self.images.len() - before;
        if added > 0 {
            self.changes.images = true;
        }
        added
    }

    /// Remove the image at `index`; later images shift forward one cell.
    pub fn remove_image(&mut self, index: usize) -> Option<ImageRef> {
        if index >= self.images.len() {
            return None;
        }
        self.changes.images = true;
        Some(self.images.remove(index))
    }

    /// Move an image to a different position in the list.
    pub fn move_image(&mut self, from: usize, to: usize) -> bool {
        if from >= self.images.len() || to >= self.images.len() || from == to {
            return false;
        }
        let image = self.images.remove(from);
        self.images.insert(to, image);
        self.changes.images = true;
        true
    }

    /// Set the grid, clamping both dimensions. Returns the grid actually applied.
    pub fn set_grid(&mut self, rows: u32, cols: u32) -> GridSize {
        let grid = GridSize::clamped(rows, cols);
        if grid != self.grid {
            self.grid = grid;
            self.changes.images = true;
        }
        grid
    }

    pub fn set_background(&mut self, background: Background) {
        if background != self.background {
            self.background = background;
            self.changes.background = true;
        }
    }

    /// Add a text overlay at the default position.
    ///
    /// Blank text is ignored.
    pub fn add_text_overlay(&mut self, text: &str, style: TextStyle) -> Option<OverlayId> {
        let overlay = TextOverlay::new(text, style);
        let id = overlay.id;
        self.insert_text_overlay(overlay).then_some(id)
    }

    /// Insert an overlay as-is, keeping its identity.
    ///
    /// Returns false for blank text or an id that is already present.
    pub fn insert_text_overlay(&mut self, overlay: TextOverlay) -> bool {
        if overlay.text.trim().is_empty() || self.text_overlay(overlay.id).is_some() {
            return false;
        }
        self.text_overlays.push(overlay);
        self.changes.text = true;
        true
    }

    pub fn remove_text_overlay(&mut self, id: OverlayId) -> Option<TextOverlay> {
        let index = self.text_overlays.iter().position(|overlay| overlay.id == id)?;
        self.changes.text = true;
        Some(self.text_overlays.remove(index))
    }

    /// Edit an overlay in place. The identity is preserved.
    pub fn update_text_overlay(&mut self, id: OverlayId, edit: impl FnOnce(&mut TextOverlay)) -> bool {
        let Some(overlay) = self.text_overlays.iter_mut().find(|overlay| overlay.id == id) else {
            return false;
        };
        edit(overlay);
        overlay.id = id;
        self.changes.text = true;
        true
    }

    /// Store a position that came from dragging the overlay on the surface.
    ///
    /// The surface already shows this position, so no text re-sync is scheduled.
    pub fn record_overlay_position(&mut self, id: OverlayId, position: Point) -> bool {
        match self.text_overlays.iter_mut().find(|overlay| overlay.id == id) {
            Some(overlay) => {
                overlay.position = position;
                true
            }
            None => false,
        }
    }

    /// Apply export settings. Quality is clamped; the canvas follows the
    /// aspect ratio of the resolution preset.
    pub fn set_export_settings(&mut self, settings: ExportSettings) {
        let settings = settings.sanitized();
        if settings.resolution != self.export_settings.resolution {
            self.set_canvas_size(settings.resolution.logical_canvas_size(DISPLAY_BOX));
        }
        self.export_settings = settings;
    }

    pub fn set_canvas_size(&mut self, size: Size) {
        if size != self.canvas_size {
            self.canvas_size = size;
            self.changes.canvas_size = true;
        }
    }

    /// Check every bounded field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.grid.is_valid() {
            return Err(ValidationError::GridOutOfBounds {
                rows: self.grid.rows,
                cols: self.grid.cols,
            });
        }
        let quality = self.export_settings.quality;
        if !(MIN_QUALITY..=MAX_QUALITY).contains(&quality) {
            return Err(ValidationError::QualityOutOfBounds(quality));
        }
        let Size { width, height } = self.canvas_size;
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(ValidationError::InvalidCanvasSize { width, height });
        }
        Ok(())
    }

    /// Clamp out-of-range values into bounds.
    pub fn sanitize(&mut self) {
        let grid = self.grid.sanitized();
        if grid != self.grid {
            self.grid = grid;
            self.changes.images = true;
        }
        self.export_settings = self.export_settings.sanitized();
        let Size { width, height } = self.canvas_size;
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            self.set_canvas_size(self.export_settings.resolution.logical_canvas_size(DISPLAY_BOX));
        }
    }

    /// Serialize the document to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize a document from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
