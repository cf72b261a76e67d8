//! Document-to-surface reconciliation.
//!
//! The synchronizer turns a [`ChangeSet`] into the minimal set of surface
//! mutations. Image relayouts bump a generation counter; every load request
//! carries the generation it was issued for, and completions from an older
//! generation are dropped without touching the surface.

use crate::document::{ChangeSet, Document, GridSize, ImageRef};
use crate::layout::{cell_for_index, place_in_cell};
use crate::loader::{Bitmap, ResourceLoadError};
use crate::surface::{Composition, DrawSurface, DrawableId, SurfaceInitError};
use kurbo::Size;
use std::collections::HashSet;
use std::fmt;

/// Monotonic layout generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Generation(u64);

impl Generation {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// An image that should be fetched and placed in `slot`.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadRequest {
    pub slot: usize,
    pub image: ImageRef,
    pub generation: Generation,
}

/// The result of running a [`LoadRequest`].
#[derive(Debug, Clone)]
pub struct LoadCompletion {
    pub request: LoadRequest,
    pub result: Result<Bitmap, ResourceLoadError>,
}

/// What happened to a completion.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// The image is on the surface.
    Placed(DrawableId),
    /// The layout moved on; the surface was not touched.
    Stale,
    /// The load failed; the slot stays empty.
    Failed(ResourceLoadError),
}

/// Applies document changes to a composition.
#[derive(Debug, Default)]
pub struct RenderSynchronizer {
    generation: Generation,
    /// Slots of the current generation still waiting for a completion.
    pending: HashSet<usize>,
    grid: GridSize,
    canvas: Size,
}

impl RenderSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Outstanding loads of the current generation.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn is_settled(&self) -> bool {
        self.pending.is_empty()
    }

    /// Forget in-flight work. Later completions are treated as stale.
    pub fn reset(&mut self) {
        self.generation = self.generation.next();
        self.pending.clear();
    }

    /// Rebuild everything, e.g. right after mounting a surface.
    pub fn full_sync<S: DrawSurface>(
        &mut self,
        doc: &Document,
        composition: &mut Composition<S>,
    ) -> Result<Vec<LoadRequest>, SurfaceInitError> {
        self.apply(doc, ChangeSet::ALL, composition)
    }

    /// Apply `changes` and return the image loads the caller must start.
    pub fn apply<S: DrawSurface>(
        &mut self,
        doc: &Document,
        changes: ChangeSet,
        composition: &mut Composition<S>,
    ) -> Result<Vec<LoadRequest>, SurfaceInitError> {
        if changes.is_empty() {
            return Ok(Vec::new());
        }
        log::debug!("Applying {changes:?}");

        if changes.canvas_size {
            composition.resize(doc.canvas_size())?;
        }
        if changes.background {
            composition.set_background(doc.background());
        }
        let requests = if changes.images || changes.canvas_size {
            self.relayout(doc, composition)
        } else {
            Vec::new()
        };
        if changes.text {
            composition.sync_text(doc.text_overlays());
        }
        Ok(requests)
    }

    fn relayout<S: DrawSurface>(&mut self, doc: &Document, composition: &mut Composition<S>) -> Vec<LoadRequest> {
        self.generation = self.generation.next();
        self.pending.clear();
        self.grid = doc.grid().sanitized();
        self.canvas = doc.canvas_size();
        composition.clear_images();

        let requests: Vec<LoadRequest> = doc
            .placed_images()
            .iter()
            .enumerate()
            .map(|(slot, image)| LoadRequest {
                slot,
                image: image.clone(),
                generation: self.generation,
            })
            .collect();
        self.pending.extend(requests.iter().map(|request| request.slot));

        let skipped = doc.images().len() - requests.len();
        if skipped > 0 {
            log::debug!("{skipped} image(s) do not fit the {} grid", self.grid);
        }
        log::debug!("Layout {} requests {} image(s)", self.generation, requests.len());
        requests
    }

    /// Apply one finished load. Must be called one completion at a time.
    pub fn complete<S: DrawSurface>(&mut self, completion: LoadCompletion, composition: &mut Composition<S>) -> LoadOutcome {
        let LoadCompletion { request, result } = completion;
        if request.generation != self.generation || !self.pending.remove(&request.slot) {
            log::debug!(
                "Discarding stale load of {} for {} (current {})",
                request.image.id,
                request.generation,
                self.generation
            );
            return LoadOutcome::Stale;
        }

        let bitmap = match result {
            Ok(bitmap) => bitmap,
            Err(err) => {
                log::warn!("Image {} left empty: {err}", request.image.id);
                return LoadOutcome::Failed(err);
            }
        };

        let placement = cell_for_index(request.slot, self.grid, self.canvas)
            .and_then(|cell| place_in_cell(request.image.id.clone(), &cell, bitmap.size()));
        match placement {
            Some(placement) => LoadOutcome::Placed(composition.place_image(&placement, bitmap)),
            None => {
                let err = ResourceLoadError::Decode {
                    uri: request.image.source_uri,
                    reason: "image has no usable size".to_string(),
                };
                log::warn!("{err}");
                LoadOutcome::Failed(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{Background, Rgba};
    use crate::document::{ResolutionPreset, TextStyle};
    use crate::surface::{DrawableContent, LayerKind};

    fn image(id: &str) -> ImageRef {
        ImageRef::new(id, format!("{id}.png"))
    }

    fn loaded(request: &LoadRequest) -> LoadCompletion {
        LoadCompletion {
            request: request.clone(),
            result: Ok(Bitmap::solid(64, 48, [200, 10, 10, 255]).unwrap()),
        }
    }

    fn mounted(doc: &Document) -> Composition {
        Composition::mount(doc.canvas_size()).unwrap()
    }

    fn placed_ids(comp: &Composition) -> Vec<String> {
        let mut placed: Vec<(usize, String)> = comp
            .surface()
            .ordered()
            .filter_map(|drawable| match &drawable.content {
                DrawableContent::Image { image_id, slot, .. } => Some((*slot, image_id.to_string())),
                _ => None,
            })
            .collect();
        placed.sort();
        placed.into_iter().map(|(_, id)| id).collect()
    }

    #[test]
    fn test_full_sync_builds_all_layers() {
        let mut doc = Document::new();
        doc.add_images([image("a"), image("b"), image("c")]);
        doc.add_text_overlay("Hello", TextStyle::default());
        let mut comp = mounted(&doc);
        let mut sync = RenderSynchronizer::new();

        let requests = sync.full_sync(&doc, &mut comp).unwrap();
        assert_eq!(requests.len(), 3);
        assert_eq!(sync.pending(), 3);

        // Completions arrive out of order.
        for request in requests.iter().rev() {
            assert!(matches!(sync.complete(loaded(request), &mut comp), LoadOutcome::Placed(_)));
        }
        assert!(sync.is_settled());
        assert_eq!(comp.background_drawables().len(), 1);
        assert_eq!(comp.image_drawables().len(), 3);
        assert_eq!(comp.text_drawables().len(), 1);
        assert_eq!(comp.image_slots(), [0, 1, 2]);
        comp.check_invariants().unwrap();
    }

    #[test]
    fn test_stale_generation_is_discarded() {
        let mut doc = Document::new();
        doc.add_images([image("a"), image("b")]);
        let mut comp = mounted(&doc);
        let mut sync = RenderSynchronizer::new();

        let old = sync.full_sync(&doc, &mut comp).unwrap();
        doc.take_changes();
        doc.set_grid(1, 1);
        let new = sync.apply(&doc, doc.pending_changes(), &mut comp).unwrap();
        assert_eq!(new.len(), 1);
        assert!(new[0].generation > old[0].generation);

        assert_eq!(sync.complete(loaded(&old[1]), &mut comp), LoadOutcome::Stale);
        assert_eq!(sync.complete(loaded(&old[0]), &mut comp), LoadOutcome::Stale);
        assert!(comp.image_drawables().is_empty());

        assert!(matches!(sync.complete(loaded(&new[0]), &mut comp), LoadOutcome::Placed(_)));
        // A duplicate completion for the same slot is ignored too.
        assert_eq!(sync.complete(loaded(&new[0]), &mut comp), LoadOutcome::Stale);
        assert_eq!(comp.image_drawables().len(), 1);
    }

    #[test]
    fn test_failed_load_leaves_slot_empty() {
        let mut doc = Document::new();
        doc.add_images([image("a"), image("broken"), image("c")]);
        let mut comp = mounted(&doc);
        let mut sync = RenderSynchronizer::new();

        let requests = sync.full_sync(&doc, &mut comp).unwrap();
        for request in &requests {
            let completion = if request.image.id.as_str() == "broken" {
                LoadCompletion {
                    request: request.clone(),
                    result: Err(ResourceLoadError::NotFound("broken.png".to_string())),
                }
            } else {
                loaded(request)
            };
            sync.complete(completion, &mut comp);
        }
        assert!(sync.is_settled());
        assert_eq!(comp.image_slots(), [0, 2]);
        comp.check_invariants().unwrap();
    }

    #[test]
    fn test_background_change_touches_only_background() {
        let mut doc = Document::new();
        doc.add_images([image("a")]);
        doc.add_text_overlay("Keep", TextStyle::default());
        let mut comp = mounted(&doc);
        let mut sync = RenderSynchronizer::new();
        let requests = sync.full_sync(&doc, &mut comp).unwrap();
        doc.take_changes();
        sync.complete(loaded(&requests[0]), &mut comp);
        let image_before = comp.image_drawables();
        let text_before = comp.text_drawables();
        let generation = sync.generation();

        doc.set_background(Background::Solid(Rgba::rgb(0, 128, 0)));
        let changes = doc.take_changes();
        let requests = sync.apply(&doc, changes, &mut comp).unwrap();
        assert!(requests.is_empty());
        assert_eq!(sync.generation(), generation);
        assert_eq!(comp.image_drawables(), image_before);
        assert_eq!(comp.text_drawables(), text_before);
        assert_eq!(comp.surface().fill(), Some(Rgba::rgb(0, 128, 0)));

        doc.set_background(Background::Transparent);
        let changes = doc.take_changes();
        sync.apply(&doc, changes, &mut comp).unwrap();
        assert!(comp.background_drawables().is_empty());
        comp.check_invariants().unwrap();
    }

    #[test]
    fn test_layer_order_survives_any_sequence() {
        let mut doc = Document::new();
        doc.add_images([image("a"), image("b"), image("c"), image("d")]);
        let mut comp = mounted(&doc);
        let mut sync = RenderSynchronizer::new();
        let mut requests = sync.full_sync(&doc, &mut comp).unwrap();
        doc.take_changes();

        let backgrounds = [
            Background::Transparent,
            Background::Solid(Rgba::black()),
            Background::Solid(Rgba::white()),
        ];
        for step in 0..12usize {
            match step % 4 {
                0 => doc.set_background(backgrounds[step % 3]),
                1 => {
                    doc.add_text_overlay(&format!("t{step}"), TextStyle::default());
                }
                2 => {
                    if let Some(request) = requests.pop() {
                        sync.complete(loaded(&request), &mut comp);
                    }
                }
                _ => {
                    doc.set_grid(1 + (step as u32 % 3), 2);
                }
            }
            let changes = doc.take_changes();
            requests.extend(sync.apply(&doc, changes, &mut comp).unwrap());
            comp.check_invariants().unwrap();

            let ordered: Vec<LayerKind> = comp.surface().ordered().map(|d| d.kind()).collect();
            let background_count = ordered.iter().filter(|&&k| k == LayerKind::Background).count();
            assert!(background_count <= 1);
            if background_count == 1 {
                assert_eq!(ordered[0], LayerKind::Background);
            }
            assert_eq!(background_count == 1, !doc.background().is_transparent());
        }
        for request in requests {
            sync.complete(loaded(&request), &mut comp);
        }
        comp.check_invariants().unwrap();
    }

    #[test]
    fn test_removing_image_reflows_slots() {
        let mut doc = Document::new();
        doc.add_images([image("a"), image("b"), image("c")]);
        let mut comp = mounted(&doc);
        let mut sync = RenderSynchronizer::new();
        for request in sync.full_sync(&doc, &mut comp).unwrap() {
            sync.complete(loaded(&request), &mut comp);
        }
        doc.take_changes();
        assert_eq!(placed_ids(&comp), ["a", "b", "c"]);

        doc.remove_image(0);
        let changes = doc.take_changes();
        let requests = sync.apply(&doc, changes, &mut comp).unwrap();
        let slots: Vec<(usize, &str)> = requests.iter().map(|r| (r.slot, r.image.id.as_str())).collect();
        assert_eq!(slots, [(0, "b"), (1, "c")]);
        for request in &requests {
            sync.complete(loaded(request), &mut comp);
        }
        assert_eq!(placed_ids(&comp), ["b", "c"]);
        assert_eq!(comp.image_slots(), [0, 1]);
    }

    #[test]
    fn test_resolution_change_resizes_and_relayouts() {
        let mut doc = Document::new();
        doc.add_images([image("a")]);
        let mut comp = mounted(&doc);
        let mut sync = RenderSynchronizer::new();
        sync.full_sync(&doc, &mut comp).unwrap();
        doc.take_changes();

        let mut settings = doc.export_settings();
        settings.resolution = ResolutionPreset::Hd1080;
        doc.set_export_settings(settings);
        let changes = doc.take_changes();
        let requests = sync.apply(&doc, changes, &mut comp).unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(comp.logical_size(), Size::new(600.0, 337.5));
        let fill = comp.background_drawables()[0];
        assert_eq!(comp.surface().get(fill).unwrap().bounds().height(), 337.5);
    }

    #[test]
    fn test_reset_makes_in_flight_loads_stale() {
        let mut doc = Document::new();
        doc.add_images([image("a")]);
        let mut comp = mounted(&doc);
        let mut sync = RenderSynchronizer::new();
        let requests = sync.full_sync(&doc, &mut comp).unwrap();
        sync.reset();
        assert!(sync.is_settled());
        assert_eq!(sync.complete(loaded(&requests[0]), &mut comp), LoadOutcome::Stale);
    }
}
