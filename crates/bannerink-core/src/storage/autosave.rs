//! Debounced autosave.
//!
//! Every edit marks the project dirty and pushes a single save deadline
//! further out. The save only happens once edits pause for the debounce
//! window.

use crate::document::Document;
use crate::storage::{FileStorage, Storage, StorageError, StorageResult};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Quiet period after the last edit before saving.
pub const DEFAULT_AUTOSAVE_DEBOUNCE_MS: u64 = 1500;

/// Key for the most recently saved project.
pub const LAST_DOCUMENT_KEY: &str = "__last_document__";

/// Dirty flag plus one pending save deadline.
pub struct AutoSaveManager<S: Storage> {
    storage: Arc<S>,
    debounce: Duration,
    dirty: bool,
    /// When the pending save becomes due. `None` means nothing is scheduled.
    deadline: Option<Instant>,
    last_save: Option<Instant>,
    current_doc_id: Option<String>,
}

impl<S: Storage> AutoSaveManager<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self {
            storage,
            debounce: Duration::from_millis(DEFAULT_AUTOSAVE_DEBOUNCE_MS),
            dirty: false,
            deadline: None,
            last_save: None,
            current_doc_id: None,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Record an edit and reschedule the save.
    pub fn mark_dirty(&mut self) {
        self.mark_dirty_at(Instant::now());
    }

    /// Record an edit made at `now`. Any previously scheduled save is replaced.
    pub fn mark_dirty_at(&mut self, now: Instant) {
        self.dirty = true;
        self.deadline = Some(now + self.debounce);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn last_save(&self) -> Option<Instant> {
        self.last_save
    }

    pub fn set_document_id(&mut self, id: Option<String>) {
        self.current_doc_id = id;
    }

    pub fn document_id(&self) -> Option<&str> {
        self.current_doc_id.as_deref()
    }

    pub fn should_save(&self) -> bool {
        self.should_save_at(Instant::now())
    }

    /// Dirty and the deadline has passed.
    pub fn should_save_at(&self, now: Instant) -> bool {
        self.dirty && self.deadline.is_some_and(|deadline| now >= deadline)
    }

    /// Save if the debounce window has elapsed. Returns true if a save ran.
    pub async fn maybe_save(&mut self, document: &Document) -> StorageResult<bool> {
        self.maybe_save_at(document, Instant::now()).await
    }

    pub async fn maybe_save_at(&mut self, document: &Document, now: Instant) -> StorageResult<bool> {
        if !self.should_save_at(now) {
            return Ok(false);
        }
        self.save(document).await?;
        Ok(true)
    }

    /// Validate and save immediately.
    ///
    /// An invalid document is not written: the project stays dirty, the
    /// schedule is dropped until the next edit, and whatever was saved
    /// before is kept.
    pub async fn save(&mut self, document: &Document) -> StorageResult<()> {
        if let Err(err) = document.validate() {
            log::warn!("Skipping save of {}: {err}", document.id);
            self.deadline = None;
            return Err(StorageError::Validation(err));
        }

        let doc_id = self.current_doc_id.clone().unwrap_or_else(|| document.id.clone());
        self.storage.save(&doc_id, document).await?;
        self.storage.save(LAST_DOCUMENT_KEY, document).await?;
        log::debug!("Saved project {doc_id}");

        self.last_save = Some(Instant::now());
        self.dirty = false;
        self.deadline = None;
        Ok(())
    }

    pub async fn load(&mut self, id: &str) -> StorageResult<Document> {
        let doc = self.storage.load(id).await?;
        self.current_doc_id = Some(id.to_string());
        self.dirty = false;
        self.deadline = None;
        Ok(doc)
    }

    /// The most recently saved project, if any.
    pub async fn load_last(&mut self) -> Option<Document> {
        match self.storage.load(LAST_DOCUMENT_KEY).await {
            Ok(doc) => {
                self.current_doc_id = Some(doc.id.clone());
                self.dirty = false;
                self.deadline = None;
                Some(doc)
            }
            Err(StorageError::NotFound(_)) => None,
            Err(err) => {
                log::warn!("Could not restore last project: {err}");
                None
            }
        }
    }

    pub async fn delete(&self, id: &str) -> StorageResult<()> {
        self.storage.delete(id).await
    }

    /// Saved project ids, without the last-project entry.
    pub async fn list_documents(&self) -> StorageResult<Vec<String>> {
        let mut ids = self.storage.list().await?;
        ids.retain(|id| id != LAST_DOCUMENT_KEY);
        Ok(ids)
    }

    pub async fn exists(&self, id: &str) -> StorageResult<bool> {
        self.storage.exists(id).await
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }
}

/// File storage in the platform data directory.
pub fn create_default_storage() -> StorageResult<Arc<FileStorage>> {
    Ok(Arc::new(FileStorage::default_location()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ExportSettings;
    use crate::storage::MemoryStorage;
    use crate::storage::testing::block_on;

    fn manager() -> AutoSaveManager<MemoryStorage> {
        AutoSaveManager::new(Arc::new(MemoryStorage::new()))
    }

    #[test]
    fn test_clean_manager_does_not_save() {
        let manager = manager();
        assert!(!manager.is_dirty());
        assert!(!manager.should_save());
        assert_eq!(manager.debounce(), Duration::from_millis(1500));
    }

    #[test]
    fn test_edits_push_the_deadline_out() {
        let mut manager = manager();
        let start = Instant::now();
        manager.mark_dirty_at(start);
        assert!(!manager.should_save_at(start + Duration::from_millis(1000)));

        manager.mark_dirty_at(start + Duration::from_millis(1000));
        assert!(!manager.should_save_at(start + Duration::from_millis(1600)));
        assert!(manager.should_save_at(start + Duration::from_millis(2500)));
    }

    #[test]
    fn test_maybe_save_waits_for_quiet_period() {
        let mut manager = manager();
        let doc = Document::new();
        let start = Instant::now();
        manager.mark_dirty_at(start);

        assert!(!block_on(manager.maybe_save_at(&doc, start)).unwrap());
        assert!(!block_on(manager.exists(&doc.id)).unwrap());

        assert!(block_on(manager.maybe_save_at(&doc, start + Duration::from_secs(2))).unwrap());
        assert!(!manager.is_dirty());
        assert!(manager.deadline().is_none());
        assert!(block_on(manager.exists(&doc.id)).unwrap());
    }

    #[test]
    fn test_invalid_document_is_not_saved() {
        let mut manager = manager();
        let mut doc = Document::new().with_name("First");
        manager.mark_dirty();
        block_on(manager.save(&doc)).unwrap();

        // Bypass the clamping setter to get an out-of-range value.
        let mut raw: serde_json::Value = serde_json::from_str(&doc.to_json().unwrap()).unwrap();
        raw["export_settings"]["quality"] = serde_json::json!(150);
        raw["name"] = serde_json::json!("Second");
        doc = Document::from_json(&raw.to_string()).unwrap();
        assert_eq!(doc.export_settings(), ExportSettings { quality: 150, ..doc.export_settings() });

        manager.mark_dirty();
        let result = block_on(manager.save(&doc));
        assert!(matches!(result, Err(StorageError::Validation(_))));
        assert!(manager.is_dirty());
        assert!(manager.deadline().is_none());

        let stored = block_on(manager.storage().load(&doc.id)).unwrap();
        assert_eq!(stored.name, "First");
    }

    #[test]
    fn test_load_last() {
        let mut manager = manager();
        let doc = Document::new().with_name("Holiday promo");
        manager.mark_dirty();
        block_on(manager.save(&doc)).unwrap();

        let mut restored = AutoSaveManager::new(Arc::clone(manager.storage()));
        let loaded = block_on(restored.load_last()).unwrap();
        assert_eq!(loaded.name, "Holiday promo");
        assert_eq!(restored.document_id(), Some(doc.id.as_str()));
    }

    #[test]
    fn test_list_excludes_last_document_key() {
        let mut manager = manager();
        manager.mark_dirty();
        block_on(manager.save(&Document::new())).unwrap();
        let list = block_on(manager.list_documents()).unwrap();
        assert_eq!(list.len(), 1);
        assert!(!list.contains(&LAST_DOCUMENT_KEY.to_string()));
    }
}
