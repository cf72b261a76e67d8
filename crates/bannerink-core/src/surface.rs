//! Retained composition surface.
//!
//! [`DrawSurface`] is the narrow interface the editor needs from a retained
//! drawing library: add, remove, reorder and query drawables by layer kind.
//! [`Composition`] sits on top of it and owns the layering rules: at most one
//! background fill, always at the back, images above it, text on top.

use crate::color::{Background, Rgba};
use crate::document::{ImageId, OverlayId, TextOverlay, TextStyle};
use crate::layout::Placement;
use crate::loader::Bitmap;
use crate::viewport::clamp_zoom;
use kurbo::{Point, Rect, Size, Vec2};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Largest surface edge accepted on mount, in logical pixels.
pub const MAX_SURFACE_DIM: f64 = 8192.0;
/// Wrapping width of a text box in logical pixels.
pub const TEXT_BOX_WIDTH: f64 = 200.0;
/// Line height as a multiple of the font size.
pub const TEXT_LINE_HEIGHT: f64 = 1.16;
/// Average glyph advance as a multiple of the font size, for wrap estimates.
pub const TEXT_CHAR_WIDTH: f64 = 0.55;

/// Estimate how many lines `text` occupies when wrapped to `width`.
///
/// Words are packed greedily using an average glyph advance; a word longer
/// than a line is broken across lines. Always at least one line.
pub fn estimate_text_lines(text: &str, font_size: f64, width: f64) -> usize {
    let advance = font_size * TEXT_CHAR_WIDTH;
    let per_line = if advance > 0.0 && width.is_finite() && width > 0.0 {
        ((width / advance).floor() as usize).max(1)
    } else {
        usize::MAX
    };

    let mut total = 0;
    for line in text.lines() {
        let mut rows = 1;
        let mut used: usize = 0;
        for word in line.split(' ') {
            let len = word.chars().count();
            let gap = usize::from(used > 0);
            if used.saturating_add(gap).saturating_add(len) <= per_line {
                used += gap + len;
                continue;
            }
            if used > 0 {
                rows += 1;
            }
            let broken = len.saturating_sub(1) / per_line;
            rows += broken;
            used = len - broken * per_line;
        }
        total += rows;
    }
    total.max(1)
}

/// The drawing surface could not be created.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SurfaceInitError {
    #[error("Invalid surface size {width}x{height}")]
    InvalidSize { width: f64, height: f64 },
    #[error("Surface size {width}x{height} exceeds the 8192 limit")]
    TooLarge { width: f64, height: f64 },
    #[error("Drawing backend unavailable: {0}")]
    Backend(String),
}

/// A surface operation was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SurfaceError {
    #[error("Unknown drawable {0}")]
    UnknownDrawable(DrawableId),
    #[error("Drawable {0} is not interactive")]
    NotSelectable(DrawableId),
    #[error("Invalid scale factors {sx}x{sy}")]
    InvalidScale { sx: f64, sy: f64 },
    #[error("Layering invariant violated: {0}")]
    Invariant(String),
}

/// Opaque handle to a drawable on a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DrawableId(u64);

impl DrawableId {
    /// For surface implementations that allocate their own handles.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for DrawableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Layer class of a drawable, in back-to-front order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LayerKind {
    Background,
    Image,
    Text,
}

/// What a drawable paints.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawableContent {
    /// Full-canvas solid fill.
    Fill { color: Rgba, size: Size },
    /// A decoded image placed in a grid slot.
    Image {
        image_id: ImageId,
        slot: usize,
        bitmap: Bitmap,
        /// Top-left corner in logical coordinates.
        origin: Point,
        scale_x: f64,
        scale_y: f64,
    },
    /// A free-floating text box.
    Text {
        overlay_id: OverlayId,
        text: String,
        style: TextStyle,
        /// Top-left corner in logical coordinates.
        origin: Point,
        /// Unscaled wrapping width.
        width: f64,
        scale_x: f64,
        scale_y: f64,
    },
}

impl DrawableContent {
    pub fn kind(&self) -> LayerKind {
        match self {
            DrawableContent::Fill { .. } => LayerKind::Background,
            DrawableContent::Image { .. } => LayerKind::Image,
            DrawableContent::Text { .. } => LayerKind::Text,
        }
    }

    /// Text content for a given overlay, positioned at the overlay's position.
    pub fn text(overlay: &TextOverlay) -> Self {
        DrawableContent::Text {
            overlay_id: overlay.id,
            text: overlay.text.clone(),
            style: overlay.style.clone(),
            origin: overlay.position,
            width: TEXT_BOX_WIDTH,
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }

    /// Image content for a computed placement.
    pub fn image(placement: &Placement, bitmap: Bitmap) -> Self {
        DrawableContent::Image {
            image_id: placement.image_id.clone(),
            slot: placement.slot,
            bitmap,
            origin: Point::new(placement.left, placement.top),
            scale_x: placement.scale_x,
            scale_y: placement.scale_y,
        }
    }

    /// Bounding box in logical coordinates.
    ///
    /// Text height is estimated with [`estimate_text_lines`]; exact wrapping
    /// is only known to the rasterizer.
    pub fn compute_bounds(&self) -> Rect {
        match self {
            DrawableContent::Fill { size, .. } => Rect::from_origin_size(Point::ZERO, *size),
            DrawableContent::Image {
                bitmap,
                origin,
                scale_x,
                scale_y,
                ..
            } => {
                let size = bitmap.size();
                Rect::from_origin_size(*origin, Size::new(size.width * scale_x, size.height * scale_y))
            }
            DrawableContent::Text {
                text,
                style,
                origin,
                width,
                scale_x,
                scale_y,
                ..
            } => {
                let lines = estimate_text_lines(text, style.font_size, *width) as f64;
                let mut size = Size::new(*width, lines * style.font_size * TEXT_LINE_HEIGHT);
                if !style.background_color.is_transparent() {
                    size.width += style.padding * 2.0;
                    size.height += style.padding * 2.0;
                }
                Rect::from_origin_size(*origin, Size::new(size.width * scale_x, size.height * scale_y))
            }
        }
    }

    fn translate(&mut self, delta: Vec2) {
        match self {
            DrawableContent::Fill { .. } => {}
            DrawableContent::Image { origin, .. } | DrawableContent::Text { origin, .. } => {
                *origin += delta;
            }
        }
    }

    fn scale(&mut self, sx: f64, sy: f64) {
        match self {
            DrawableContent::Fill { .. } => {}
            DrawableContent::Image { scale_x, scale_y, .. } | DrawableContent::Text { scale_x, scale_y, .. } => {
                *scale_x *= sx;
                *scale_y *= sy;
            }
        }
    }
}

/// An object living on a surface.
#[derive(Debug, Clone)]
pub struct Drawable {
    id: DrawableId,
    pub content: DrawableContent,
    /// Whether the user can pick, drag and resize it.
    pub selectable: bool,
    bounds: Rect,
}

impl Drawable {
    pub fn new(id: DrawableId, content: DrawableContent, selectable: bool) -> Self {
        let bounds = content.compute_bounds();
        Self {
            id,
            content,
            selectable,
            bounds,
        }
    }

    pub fn id(&self) -> DrawableId {
        self.id
    }

    pub fn kind(&self) -> LayerKind {
        self.content.kind()
    }

    /// Cached bounds as of the last [`Drawable::update_coords`].
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Recompute the cached bounds from the current content.
    pub fn update_coords(&mut self) {
        self.bounds = self.content.compute_bounds();
    }
}

/// Retained-mode drawing surface.
pub trait DrawSurface {
    /// Add a drawable on top of everything else.
    fn add(&mut self, content: DrawableContent, selectable: bool) -> DrawableId;

    fn remove(&mut self, id: DrawableId) -> Option<Drawable>;

    /// Move a drawable to the back. Returns false if it does not exist.
    fn send_to_back(&mut self, id: DrawableId) -> bool;

    /// Move a drawable to the front. Returns false if it does not exist.
    fn bring_to_front(&mut self, id: DrawableId) -> bool;

    /// Drawables of one kind, back to front.
    fn query(&self, kind: LayerKind) -> Vec<DrawableId>;

    fn get(&self, id: DrawableId) -> Option<&Drawable>;

    fn get_mut(&mut self, id: DrawableId) -> Option<&mut Drawable>;

    /// All drawables, back to front.
    fn ordered(&self) -> Box<dyn Iterator<Item = &Drawable> + '_>;

    /// The surface's own fill, painted beneath every drawable.
    fn set_fill(&mut self, fill: Option<Rgba>);

    fn fill(&self) -> Option<Rgba>;

    fn resize(&mut self, size: Size);

    /// Logical size.
    fn size(&self) -> Size;

    /// Display-only scale.
    fn set_zoom(&mut self, zoom: f64);

    fn zoom(&self) -> f64;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory [`DrawSurface`] used on screen and for export.
#[derive(Debug, Clone)]
pub struct RetainedSurface {
    drawables: HashMap<DrawableId, Drawable>,
    /// Back to front.
    z_order: Vec<DrawableId>,
    next_id: u64,
    fill: Option<Rgba>,
    size: Size,
    zoom: f64,
}

impl RetainedSurface {
    pub fn new(size: Size) -> Self {
        Self {
            drawables: HashMap::new(),
            z_order: Vec::new(),
            next_id: 1,
            fill: None,
            size,
            zoom: 1.0,
        }
    }
}

impl DrawSurface for RetainedSurface {
    fn add(&mut self, content: DrawableContent, selectable: bool) -> DrawableId {
        let id = DrawableId(self.next_id);
        self.next_id += 1;
        self.drawables.insert(id, Drawable::new(id, content, selectable));
        self.z_order.push(id);
        id
    }

    fn remove(&mut self, id: DrawableId) -> Option<Drawable> {
        self.z_order.retain(|&other| other != id);
        self.drawables.remove(&id)
    }

    fn send_to_back(&mut self, id: DrawableId) -> bool {
        if !self.drawables.contains_key(&id) {
            return false;
        }
        self.z_order.retain(|&other| other != id);
        self.z_order.insert(0, id);
        true
    }

    fn bring_to_front(&mut self, id: DrawableId) -> bool {
        if !self.drawables.contains_key(&id) {
            return false;
        }
        self.z_order.retain(|&other| other != id);
        self.z_order.push(id);
        true
    }

    fn query(&self, kind: LayerKind) -> Vec<DrawableId> {
        self.ordered()
            .filter(|drawable| drawable.kind() == kind)
            .map(Drawable::id)
            .collect()
    }

    fn get(&self, id: DrawableId) -> Option<&Drawable> {
        self.drawables.get(&id)
    }

    fn get_mut(&mut self, id: DrawableId) -> Option<&mut Drawable> {
        self.drawables.get_mut(&id)
    }

    fn ordered(&self) -> Box<dyn Iterator<Item = &Drawable> + '_> {
        Box::new(self.z_order.iter().filter_map(|id| self.drawables.get(id)))
    }

    fn set_fill(&mut self, fill: Option<Rgba>) {
        self.fill = fill;
    }

    fn fill(&self) -> Option<Rgba> {
        self.fill
    }

    fn resize(&mut self, size: Size) {
        self.size = size;
    }

    fn size(&self) -> Size {
        self.size
    }

    fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom;
    }

    fn zoom(&self) -> f64 {
        self.zoom
    }

    fn len(&self) -> usize {
        self.z_order.len()
    }
}

/// Geometry read back from a committed interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum Readback {
    /// A text box moved or resized; its position belongs in the document.
    Text { overlay_id: OverlayId, position: Point },
    /// An image moved or resized. Image geometry lives on the surface only.
    Image { image_id: ImageId, slot: usize, bounds: Rect },
}

fn check_size(size: Size) -> Result<(), SurfaceInitError> {
    let Size { width, height } = size;
    if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
        return Err(SurfaceInitError::InvalidSize { width, height });
    }
    if width > MAX_SURFACE_DIM || height > MAX_SURFACE_DIM {
        return Err(SurfaceInitError::TooLarge { width, height });
    }
    Ok(())
}

/// A mounted surface plus the layering rules of a banner.
#[derive(Debug)]
pub struct Composition<S: DrawSurface = RetainedSurface> {
    surface: S,
    image_slots: HashMap<usize, DrawableId>,
    text_drawables: HashMap<OverlayId, DrawableId>,
}

impl Composition<RetainedSurface> {
    /// Acquire a fresh in-memory surface of the given logical size.
    pub fn mount(size: Size) -> Result<Self, SurfaceInitError> {
        Self::with_surface(RetainedSurface::new(size))
    }
}

impl<S: DrawSurface> Composition<S> {
    /// Wrap an existing surface. The surface should be empty.
    pub fn with_surface(surface: S) -> Result<Self, SurfaceInitError> {
        check_size(surface.size())?;
        log::debug!("Mounted composition surface {:?}", surface.size());
        Ok(Self {
            surface,
            image_slots: HashMap::new(),
            text_drawables: HashMap::new(),
        })
    }

    /// Give the surface back, ending the composition.
    pub fn release(self) -> S {
        self.surface
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn logical_size(&self) -> Size {
        self.surface.size()
    }

    pub fn zoom(&self) -> f64 {
        self.surface.zoom()
    }

    /// True when nothing would be painted.
    pub fn is_empty(&self) -> bool {
        self.surface.is_empty() && self.surface.fill().is_none()
    }

    /// Replace the background. A transparent background leaves no fill.
    pub fn set_background(&mut self, background: Background) {
        for id in self.surface.query(LayerKind::Background) {
            self.surface.remove(id);
        }
        match background {
            Background::Solid(color) => {
                let size = self.surface.size();
                let id = self.surface.add(DrawableContent::Fill { color, size }, false);
                self.surface.send_to_back(id);
                self.surface.set_fill(Some(color));
            }
            Background::Transparent => self.surface.set_fill(None),
        }
        self.enforce_layers();
    }

    /// Change the logical size and stretch the background fill to match.
    pub fn resize(&mut self, size: Size) -> Result<(), SurfaceInitError> {
        check_size(size)?;
        self.surface.resize(size);
        for id in self.surface.query(LayerKind::Background) {
            if let Some(drawable) = self.surface.get_mut(id) {
                if let DrawableContent::Fill { size: fill_size, .. } = &mut drawable.content {
                    *fill_size = size;
                }
                drawable.update_coords();
            }
        }
        Ok(())
    }

    /// Remove every image drawable.
    pub fn clear_images(&mut self) {
        for id in self.surface.query(LayerKind::Image) {
            self.surface.remove(id);
        }
        self.image_slots.clear();
    }

    /// Put a loaded image in its slot, replacing whatever occupied the slot.
    pub fn place_image(&mut self, placement: &Placement, bitmap: Bitmap) -> DrawableId {
        if let Some(previous) = self.image_slots.remove(&placement.slot) {
            self.surface.remove(previous);
        }
        let id = self.surface.add(DrawableContent::image(placement, bitmap), true);
        self.image_slots.insert(placement.slot, id);
        self.enforce_layers();
        id
    }

    /// Rebuild text drawables one-to-one from the overlays.
    pub fn sync_text(&mut self, overlays: &[TextOverlay]) {
        for id in self.surface.query(LayerKind::Text) {
            self.surface.remove(id);
        }
        self.text_drawables.clear();
        for overlay in overlays {
            let id = self.surface.add(DrawableContent::text(overlay), true);
            self.text_drawables.insert(overlay.id, id);
        }
        self.enforce_layers();
    }

    /// Set display zoom. Returns the clamped value.
    pub fn set_zoom(&mut self, zoom: f64) -> f64 {
        let zoom = clamp_zoom(zoom);
        self.surface.set_zoom(zoom);
        zoom
    }

    /// Front-most selectable drawable under a screen-space point.
    pub fn hit_test(&self, screen_point: Point) -> Option<DrawableId> {
        let zoom = self.surface.zoom();
        let point = Point::new(screen_point.x / zoom, screen_point.y / zoom);
        let ordered: Vec<&Drawable> = self.surface.ordered().collect();
        ordered
            .into_iter()
            .rev()
            .find(|drawable| drawable.selectable && drawable.bounds().contains(point))
            .map(Drawable::id)
    }

    fn interactive(&mut self, id: DrawableId) -> Result<&mut Drawable, SurfaceError> {
        let drawable = self.surface.get_mut(id).ok_or(SurfaceError::UnknownDrawable(id))?;
        if !drawable.selectable {
            return Err(SurfaceError::NotSelectable(id));
        }
        Ok(drawable)
    }

    /// Move a drawable by a logical-space delta.
    pub fn drag(&mut self, id: DrawableId, delta: Vec2) -> Result<(), SurfaceError> {
        self.interactive(id)?.content.translate(delta);
        Ok(())
    }

    /// Resize a drawable by multiplying its scale.
    pub fn scale_drawable(&mut self, id: DrawableId, sx: f64, sy: f64) -> Result<(), SurfaceError> {
        if !(sx.is_finite() && sy.is_finite() && sx > 0.0 && sy > 0.0) {
            return Err(SurfaceError::InvalidScale { sx, sy });
        }
        self.interactive(id)?.content.scale(sx, sy);
        Ok(())
    }

    /// Finish an interaction: refresh cached geometry and report it.
    pub fn commit_interaction(&mut self, id: DrawableId) -> Result<Readback, SurfaceError> {
        let drawable = self.interactive(id)?;
        drawable.update_coords();
        let bounds = drawable.bounds();
        match &drawable.content {
            DrawableContent::Text { overlay_id, origin, .. } => Ok(Readback::Text {
                overlay_id: *overlay_id,
                position: *origin,
            }),
            DrawableContent::Image { image_id, slot, .. } => Ok(Readback::Image {
                image_id: image_id.clone(),
                slot: *slot,
                bounds,
            }),
            DrawableContent::Fill { .. } => Err(SurfaceError::NotSelectable(id)),
        }
    }

    pub fn background_drawables(&self) -> Vec<DrawableId> {
        self.surface.query(LayerKind::Background)
    }

    pub fn image_drawables(&self) -> Vec<DrawableId> {
        self.surface.query(LayerKind::Image)
    }

    pub fn text_drawables(&self) -> Vec<DrawableId> {
        self.surface.query(LayerKind::Text)
    }

    /// Occupied grid slots, ascending.
    pub fn image_slots(&self) -> Vec<usize> {
        let mut slots: Vec<usize> = self.image_slots.keys().copied().collect();
        slots.sort_unstable();
        slots
    }

    pub fn text_drawable(&self, overlay: OverlayId) -> Option<DrawableId> {
        self.text_drawables.get(&overlay).copied()
    }

    /// Restore back-to-front order: backgrounds, images, text.
    ///
    /// Relative order inside each class is kept.
    fn enforce_layers(&mut self) {
        for id in self.surface.query(LayerKind::Text) {
            self.surface.bring_to_front(id);
        }
        for id in self.surface.query(LayerKind::Background).into_iter().rev() {
            self.surface.send_to_back(id);
        }
    }

    /// Verify the layering rules.
    pub fn check_invariants(&self) -> Result<(), SurfaceError> {
        let backgrounds = self.surface.query(LayerKind::Background);
        if backgrounds.len() > 1 {
            return Err(SurfaceError::Invariant(format!(
                "{} background drawables",
                backgrounds.len()
            )));
        }
        if backgrounds.is_empty() != self.surface.fill().is_none() {
            return Err(SurfaceError::Invariant(
                "surface fill and background drawable disagree".to_string(),
            ));
        }
        let mut previous = LayerKind::Background;
        for drawable in self.surface.ordered() {
            if drawable.kind() < previous {
                return Err(SurfaceError::Invariant(format!(
                    "{:?} drawable {} above {:?}",
                    drawable.kind(),
                    drawable.id(),
                    previous
                )));
            }
            previous = drawable.kind();
        }
        if self.image_slots.len() != self.surface.query(LayerKind::Image).len() {
            return Err(SurfaceError::Invariant("untracked image drawable".to_string()));
        }
        if self.text_drawables.len() != self.surface.query(LayerKind::Text).len() {
            return Err(SurfaceError::Invariant("untracked text drawable".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::GridSize;
    use crate::layout::{cell_for_index, place_in_cell};

    fn placement(slot: usize, canvas: Size) -> Placement {
        let cell = cell_for_index(slot, GridSize { rows: 2, cols: 2 }, canvas).unwrap();
        place_in_cell(ImageId::new(format!("img{slot}")), &cell, Size::new(40.0, 20.0)).unwrap()
    }

    fn bitmap() -> Bitmap {
        Bitmap::solid(40, 20, [0, 0, 255, 255]).unwrap()
    }

    fn kinds(comp: &Composition) -> Vec<LayerKind> {
        comp.surface().ordered().map(Drawable::kind).collect()
    }

    #[test]
    fn test_mount_rejects_bad_sizes() {
        assert!(matches!(
            Composition::mount(Size::new(0.0, 100.0)),
            Err(SurfaceInitError::InvalidSize { .. })
        ));
        assert!(matches!(
            Composition::mount(Size::new(f64::NAN, 100.0)),
            Err(SurfaceInitError::InvalidSize { .. })
        ));
        assert!(matches!(
            Composition::mount(Size::new(9000.0, 100.0)),
            Err(SurfaceInitError::TooLarge { .. })
        ));
        let comp = Composition::mount(Size::new(600.0, 600.0)).unwrap();
        assert!(comp.is_empty());
    }

    #[test]
    fn test_background_stays_at_back() {
        let canvas = Size::new(600.0, 600.0);
        let mut comp = Composition::mount(canvas).unwrap();
        comp.sync_text(&[TextOverlay::new("Hi", TextStyle::default())]);
        comp.place_image(&placement(0, canvas), bitmap());
        comp.set_background(Background::Solid(Rgba::rgb(255, 0, 0)));
        comp.place_image(&placement(1, canvas), bitmap());
        comp.set_background(Background::Solid(Rgba::white()));

        assert_eq!(
            kinds(&comp),
            [LayerKind::Background, LayerKind::Image, LayerKind::Image, LayerKind::Text]
        );
        assert_eq!(comp.background_drawables().len(), 1);
        assert_eq!(comp.surface().fill(), Some(Rgba::white()));
        comp.check_invariants().unwrap();
    }

    #[test]
    fn test_transparent_background_leaves_no_fill() {
        let mut comp = Composition::mount(Size::new(300.0, 200.0)).unwrap();
        comp.set_background(Background::Solid(Rgba::black()));
        comp.set_background(Background::Transparent);
        assert!(comp.background_drawables().is_empty());
        assert_eq!(comp.surface().fill(), None);
        assert!(comp.is_empty());
        comp.check_invariants().unwrap();
    }

    #[test]
    fn test_place_image_replaces_slot() {
        let canvas = Size::new(600.0, 600.0);
        let mut comp = Composition::mount(canvas).unwrap();
        let first = comp.place_image(&placement(2, canvas), bitmap());
        let second = comp.place_image(&placement(2, canvas), bitmap());
        assert_ne!(first, second);
        assert_eq!(comp.image_drawables(), [second]);
        assert_eq!(comp.image_slots(), [2]);
        comp.clear_images();
        assert!(comp.image_drawables().is_empty());
        comp.check_invariants().unwrap();
    }

    #[test]
    fn test_sync_text_matches_overlays() {
        let mut comp = Composition::mount(Size::new(600.0, 600.0)).unwrap();
        let a = TextOverlay::new("A", TextStyle::default());
        let b = TextOverlay::new("B", TextStyle::default());
        comp.sync_text(&[a.clone(), b.clone()]);
        assert_eq!(comp.text_drawables().len(), 2);
        comp.sync_text(&[b.clone()]);
        assert_eq!(comp.text_drawables().len(), 1);
        assert!(comp.text_drawable(a.id).is_none());
        assert!(comp.text_drawable(b.id).is_some());
    }

    #[test]
    fn test_resize_refits_background() {
        let mut comp = Composition::mount(Size::new(600.0, 600.0)).unwrap();
        comp.set_background(Background::Solid(Rgba::white()));
        comp.resize(Size::new(600.0, 337.5)).unwrap();
        let id = comp.background_drawables()[0];
        let bounds = comp.surface().get(id).unwrap().bounds();
        assert_eq!(bounds, Rect::new(0.0, 0.0, 600.0, 337.5));
        assert!(comp.resize(Size::new(-1.0, 10.0)).is_err());
    }

    #[test]
    fn test_hit_test_respects_zoom_and_selectability() {
        let canvas = Size::new(600.0, 600.0);
        let mut comp = Composition::mount(canvas).unwrap();
        comp.set_background(Background::Solid(Rgba::white()));
        let image = comp.place_image(&placement(0, canvas), bitmap());

        let center = comp.surface().get(image).unwrap().bounds().center();
        assert_eq!(comp.hit_test(center), Some(image));

        assert_eq!(comp.set_zoom(2.0), 2.0);
        assert_eq!(comp.hit_test(Point::new(center.x * 2.0, center.y * 2.0)), Some(image));
        // Only the background is under this point, and it is not selectable.
        assert_eq!(comp.hit_test(Point::new(1190.0, 1190.0)), None);
        assert_eq!(comp.set_zoom(10.0), 3.0);
        assert_eq!(comp.logical_size(), canvas);
    }

    #[test]
    fn test_estimate_text_lines() {
        assert_eq!(estimate_text_lines("", 24.0, TEXT_BOX_WIDTH), 1);
        assert_eq!(estimate_text_lines("Hello", 24.0, TEXT_BOX_WIDTH), 1);
        assert_eq!(estimate_text_lines("Hello\nworld", 24.0, TEXT_BOX_WIDTH), 2);
        // 15 average glyphs fit in 200px at 24px.
        assert_eq!(estimate_text_lines(&"x".repeat(40), 24.0, TEXT_BOX_WIDTH), 3);
        assert_eq!(estimate_text_lines("Summer sale starts today", 24.0, TEXT_BOX_WIDTH), 2);
        assert_eq!(estimate_text_lines("Summer sale starts today", 12.0, TEXT_BOX_WIDTH), 1);
    }

    #[test]
    fn test_wrapped_text_is_hit_on_later_lines() {
        let mut comp = Composition::mount(Size::new(600.0, 600.0)).unwrap();
        let overlay = TextOverlay::new("Summer sale starts today with fifty percent off all", TextStyle::default());
        comp.sync_text(std::slice::from_ref(&overlay));
        let id = comp.text_drawable(overlay.id).unwrap();

        let bounds = comp.surface().get(id).unwrap().bounds();
        assert_eq!(bounds.width(), TEXT_BOX_WIDTH);
        assert!(bounds.height() > 24.0 * TEXT_LINE_HEIGHT * 2.0);
        // Second rendered line.
        assert_eq!(comp.hit_test(Point::new(60.0, 91.76)), Some(id));
        assert_eq!(comp.hit_test(Point::new(60.0, 170.0)), None);
    }

    #[test]
    fn test_drag_commit_refreshes_bounds() {
        let mut comp = Composition::mount(Size::new(600.0, 600.0)).unwrap();
        let overlay = TextOverlay::new("Drag me", TextStyle::default());
        comp.sync_text(std::slice::from_ref(&overlay));
        let id = comp.text_drawable(overlay.id).unwrap();

        comp.drag(id, Vec2::new(100.0, 20.0)).unwrap();
        let readback = comp.commit_interaction(id).unwrap();
        assert_eq!(
            readback,
            Readback::Text {
                overlay_id: overlay.id,
                position: Point::new(150.0, 70.0)
            }
        );
        assert_eq!(comp.hit_test(Point::new(160.0, 80.0)), Some(id));
        assert_eq!(comp.hit_test(Point::new(55.0, 55.0)), None);
    }

    #[test]
    fn test_scale_drawable_validates_factors() {
        let canvas = Size::new(600.0, 600.0);
        let mut comp = Composition::mount(canvas).unwrap();
        let image = comp.place_image(&placement(0, canvas), bitmap());
        let before = comp.surface().get(image).unwrap().bounds();

        assert!(comp.scale_drawable(image, 0.0, 1.0).is_err());
        comp.scale_drawable(image, 2.0, 2.0).unwrap();
        let Readback::Image { bounds, slot, .. } = comp.commit_interaction(image).unwrap() else {
            panic!("expected image readback");
        };
        assert_eq!(slot, 0);
        assert!((bounds.width() - before.width() * 2.0).abs() < 1e-9);

        comp.set_background(Background::Solid(Rgba::white()));
        let fill = comp.background_drawables()[0];
        assert_eq!(comp.drag(fill, Vec2::new(1.0, 1.0)), Err(SurfaceError::NotSelectable(fill)));
    }
}
