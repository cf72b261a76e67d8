//! Editing session.
//!
//! Owns one document and, while mounted, the composition surface that shows
//! it. Image loads run as tokio tasks; their results come back through a
//! single channel and are applied to the surface one at a time.

use crate::command::EditCommand;
use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use bannerink_core::document::Document;
use bannerink_core::loader::{ImageSource, ResourceLoadError};
use bannerink_core::notice::{NoticeBoard, NoticeKind};
use bannerink_core::storage::{AutoSaveManager, Storage, StorageError};
use bannerink_core::surface::{Composition, DrawableId, Readback, SurfaceError};
use bannerink_core::sync::{LoadCompletion, LoadOutcome, LoadRequest, RenderSynchronizer};
use bannerink_core::viewport::Viewport;
use bannerink_render::{ExportRenderer, ExportedImage};
use kurbo::{Point, Vec2};
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

pub struct EditorSession<St: Storage> {
    document: Document,
    /// Present between `mount` and `unmount`.
    composition: Option<Composition>,
    sync: RenderSynchronizer,
    viewport: Viewport,
    notices: NoticeBoard,
    autosave: AutoSaveManager<St>,
    source: Arc<dyn ImageSource>,
    completions_tx: UnboundedSender<LoadCompletion>,
    completions_rx: UnboundedReceiver<LoadCompletion>,
    exporter: ExportRenderer,
    display_box: f64,
}

impl<St: Storage> EditorSession<St> {
    pub fn new(document: Document, source: Arc<dyn ImageSource>, storage: Arc<St>, config: &AppConfig) -> Self {
        let (completions_tx, completions_rx) = unbounded_channel();
        let mut autosave = AutoSaveManager::new(storage).with_debounce(config.autosave_debounce);
        autosave.set_document_id(Some(document.id.clone()));
        let mut session = Self {
            document,
            composition: None,
            sync: RenderSynchronizer::new(),
            viewport: Viewport::new(),
            notices: NoticeBoard::new(),
            autosave,
            source,
            completions_tx,
            completions_rx,
            exporter: ExportRenderer::new(),
            display_box: config.display_box,
        };
        session.fit_canvas();
        session
    }

    /// Keep the logical canvas inside the configured display box.
    fn fit_canvas(&mut self) {
        let preset = self.document.export_settings().resolution;
        self.document.set_canvas_size(preset.logical_canvas_size(self.display_box));
    }

    /// Acquire a drawing surface and build the whole composition on it.
    ///
    /// Returns false if the surface could not be created. The session stays
    /// usable; the failure is posted as a notice.
    pub fn mount(&mut self) -> bool {
        if self.composition.is_some() {
            return true;
        }
        let mut composition = match Composition::mount(self.document.canvas_size()) {
            Ok(composition) => composition,
            Err(err) => {
                log::error!("Failed to mount canvas: {err}");
                self.notices.push(NoticeKind::Surface, err.to_string());
                return false;
            }
        };
        composition.set_zoom(self.viewport.zoom);

        match self.sync.full_sync(&self.document, &mut composition) {
            Ok(requests) => {
                self.document.take_changes();
                self.notices.clear_kind(NoticeKind::Surface);
                self.composition = Some(composition);
                self.dispatch(requests);
                log::info!("Mounted canvas for {}", self.document.id);
                true
            }
            Err(err) => {
                log::error!("Failed to build canvas: {err}");
                self.notices.push(NoticeKind::Surface, err.to_string());
                false
            }
        }
    }

    /// Release the drawing surface. Loads still in flight are discarded.
    pub fn unmount(&mut self) {
        if let Some(composition) = self.composition.take() {
            drop(composition.release());
            log::info!("Released canvas for {}", self.document.id);
        }
        self.sync.reset();
        self.document.mark_all_changed();
    }

    pub fn is_mounted(&self) -> bool {
        self.composition.is_some()
    }

    /// Apply an edit to the document and bring the surface up to date.
    pub fn edit(&mut self, command: EditCommand) -> AppResult<()> {
        if let Err(err) = command.apply(&mut self.document) {
            if let AppError::Load(load) = &err {
                self.notices.push(NoticeKind::Load, load.to_string());
            }
            return Err(err);
        }
        self.autosave.mark_dirty();
        self.sync();
        Ok(())
    }

    /// Push pending document changes to the surface.
    pub fn sync(&mut self) {
        self.fit_canvas();
        let Some(composition) = self.composition.as_mut() else {
            return;
        };
        let changes = self.document.take_changes();
        match self.sync.apply(&self.document, changes, composition) {
            Ok(requests) => self.dispatch(requests),
            Err(err) => {
                log::error!("Canvas update failed: {err}");
                self.notices.push(NoticeKind::Surface, err.to_string());
            }
        }
    }

    fn dispatch(&self, requests: Vec<LoadRequest>) {
        for request in requests {
            let load = self.source.load(&request.image);
            let tx = self.completions_tx.clone();
            tokio::spawn(async move {
                // A panicking source still has to resolve its slot.
                let result = match tokio::spawn(load).await {
                    Ok(result) => result,
                    Err(err) => {
                        log::error!("Image load for {} aborted: {err}", request.image.id);
                        Err(ResourceLoadError::Decode {
                            uri: request.image.display_name.clone(),
                            reason: err.to_string(),
                        })
                    }
                };
                if tx.send(LoadCompletion { request, result }).is_err() {
                    log::debug!("Session closed before a load finished");
                }
            });
        }
    }

    fn apply_completion(&mut self, completion: LoadCompletion) -> LoadOutcome {
        let Some(composition) = self.composition.as_mut() else {
            return LoadOutcome::Stale;
        };
        let name = completion.request.image.display_name.clone();
        let outcome = self.sync.complete(completion, composition);
        if let LoadOutcome::Failed(err) = &outcome {
            self.notices.push(NoticeKind::Load, format!("{name}: {err}"));
        }
        outcome
    }

    /// Apply every load that has already finished. Returns how many were handled.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(completion) = self.completions_rx.try_recv() {
            self.apply_completion(completion);
            handled += 1;
        }
        handled
    }

    /// Wait until every load of the current layout has been applied.
    pub async fn settle(&mut self) {
        while self.composition.is_some() && !self.sync.is_settled() {
            match self.completions_rx.recv().await {
                Some(completion) => {
                    self.apply_completion(completion);
                }
                None => break,
            }
        }
    }

    /// Loads of the current layout not yet applied.
    pub fn pending_loads(&self) -> usize {
        self.sync.pending()
    }

    pub fn set_zoom(&mut self, zoom: f64) -> f64 {
        let zoom = self.viewport.set_zoom(zoom);
        if let Some(composition) = self.composition.as_mut() {
            composition.set_zoom(zoom);
        }
        zoom
    }

    pub fn zoom_in(&mut self) -> f64 {
        let zoom = self.viewport.zoom_in();
        self.set_zoom(zoom)
    }

    pub fn zoom_out(&mut self) -> f64 {
        let zoom = self.viewport.zoom_out();
        self.set_zoom(zoom)
    }

    /// The selectable drawable under a screen position.
    pub fn pick(&self, screen_point: Point) -> Option<DrawableId> {
        self.composition.as_ref()?.hit_test(screen_point)
    }

    fn composition_mut(&mut self, id: DrawableId) -> AppResult<&mut Composition> {
        self.composition
            .as_mut()
            .ok_or_else(|| AppError::Surface(SurfaceError::UnknownDrawable(id)))
    }

    /// Drag by a pointer movement in screen pixels.
    pub fn drag(&mut self, id: DrawableId, screen_delta: Vec2) -> AppResult<()> {
        let delta = self.viewport.screen_delta_to_logical(screen_delta);
        self.composition_mut(id)?.drag(id, delta)?;
        Ok(())
    }

    pub fn scale(&mut self, id: DrawableId, sx: f64, sy: f64) -> AppResult<()> {
        self.composition_mut(id)?.scale_drawable(id, sx, sy)?;
        Ok(())
    }

    /// Finish a drag or resize. A moved text overlay is written back to the
    /// document; image adjustments stay on the surface until the next layout.
    pub fn commit(&mut self, id: DrawableId) -> AppResult<Readback> {
        let readback = self.composition_mut(id)?.commit_interaction(id)?;
        if let Readback::Text { overlay_id, position } = &readback {
            if self.document.record_overlay_position(*overlay_id, *position) {
                self.autosave.mark_dirty();
            }
        }
        Ok(readback)
    }

    /// Rasterize the current composition with the document's export settings.
    pub fn export(&mut self) -> AppResult<ExportedImage> {
        let settings = self.document.export_settings();
        match self.exporter.render(self.composition.as_ref(), &settings) {
            Ok(exported) => {
                self.notices.clear_kind(NoticeKind::Export);
                Ok(exported)
            }
            Err(err) => {
                log::error!("Export failed: {err}");
                self.notices.push(NoticeKind::Export, err.to_string());
                Err(err.into())
            }
        }
    }

    fn report_storage_error(&mut self, err: &StorageError) {
        let kind = match err {
            StorageError::Validation(_) => NoticeKind::Validation,
            _ => NoticeKind::Storage,
        };
        self.notices.push(kind, err.to_string());
    }

    /// Save if edits have paused for the debounce window. Returns true if a
    /// save ran.
    pub async fn autosave_tick(&mut self) -> bool {
        match self.autosave.maybe_save(&self.document).await {
            Ok(saved) => saved,
            Err(err) => {
                self.report_storage_error(&err);
                false
            }
        }
    }

    /// Save right away, skipping the debounce.
    pub async fn save_now(&mut self) -> AppResult<()> {
        if let Err(err) = self.autosave.save(&self.document).await {
            self.report_storage_error(&err);
            return Err(err.into());
        }
        Ok(())
    }

    /// Switch to another project. The surface, if mounted, is rebuilt.
    pub fn replace_document(&mut self, document: Document) {
        self.document = document;
        self.document.mark_all_changed();
        self.autosave.set_document_id(Some(self.document.id.clone()));
        self.sync.reset();
        self.notices.clear_kind(NoticeKind::Load);
        self.sync();
    }

    /// Open a saved project.
    pub async fn open(&mut self, id: &str) -> AppResult<()> {
        let document = match self.autosave.load(id).await {
            Ok(document) => document,
            Err(err) => {
                self.report_storage_error(&err);
                return Err(err.into());
            }
        };
        self.replace_document(document);
        Ok(())
    }

    /// Reopen the most recently saved project. Returns false if there is none.
    pub async fn restore_last(&mut self) -> bool {
        match self.autosave.load_last().await {
            Some(document) => {
                self.replace_document(document);
                true
            }
            None => false,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn composition(&self) -> Option<&Composition> {
        self.composition.as_ref()
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn notices(&self) -> &NoticeBoard {
        &self.notices
    }

    pub fn notices_mut(&mut self) -> &mut NoticeBoard {
        &mut self.notices
    }

    pub fn autosave(&self) -> &AutoSaveManager<St> {
        &self.autosave
    }
}
