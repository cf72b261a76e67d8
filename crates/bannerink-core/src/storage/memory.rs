//! In-memory storage.

use super::{BoxFuture, Storage, StorageError, StorageResult, decode};
use crate::document::Document;
use std::collections::HashMap;
use std::sync::RwLock;

/// Keeps serialized projects in a map. Used by tests and one-shot CLI runs.
#[derive(Default)]
pub struct MemoryStorage {
    projects: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_error(e: impl std::fmt::Display) -> StorageError {
    StorageError::Other(format!("Lock error: {e}"))
}

impl Storage for MemoryStorage {
    fn save(&self, id: &str, document: &Document) -> BoxFuture<'_, StorageResult<()>> {
        let id = id.to_string();
        let json = document.to_json();
        Box::pin(async move {
            let json = json.map_err(|e| StorageError::Serialization(e.to_string()))?;
            self.projects.write().map_err(lock_error)?.insert(id, json);
            Ok(())
        })
    }

    fn load(&self, id: &str) -> BoxFuture<'_, StorageResult<Document>> {
        let id = id.to_string();
        Box::pin(async move {
            let projects = self.projects.read().map_err(lock_error)?;
            let json = projects.get(&id).ok_or_else(|| StorageError::NotFound(id.clone()))?;
            decode(json, &id)
        })
    }

    fn delete(&self, id: &str) -> BoxFuture<'_, StorageResult<()>> {
        let id = id.to_string();
        Box::pin(async move {
            self.projects.write().map_err(lock_error)?.remove(&id);
            Ok(())
        })
    }

    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>> {
        Box::pin(async move { Ok(self.projects.read().map_err(lock_error)?.keys().cloned().collect()) })
    }

    fn exists(&self, id: &str) -> BoxFuture<'_, StorageResult<bool>> {
        let id = id.to_string();
        Box::pin(async move { Ok(self.projects.read().map_err(lock_error)?.contains_key(&id)) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ImageRef;
    use crate::storage::testing::block_on;

    #[test]
    fn test_save_and_load() {
        let storage = MemoryStorage::new();
        let mut doc = Document::new().with_name("Spring sale");
        doc.add_images([ImageRef::new("a", "a.png")]);
        doc.set_grid(3, 1);

        block_on(storage.save(&doc.id, &doc)).unwrap();
        let loaded = block_on(storage.load(&doc.id)).unwrap();
        assert_eq!(loaded.id, doc.id);
        assert_eq!(loaded.name, "Spring sale");
        assert_eq!(loaded.grid(), doc.grid());
        assert_eq!(loaded.images(), doc.images());
    }

    #[test]
    fn test_not_found() {
        let storage = MemoryStorage::new();
        let result = block_on(storage.load("nonexistent"));
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_exists_delete_list() {
        let storage = MemoryStorage::new();
        let doc = Document::new();

        assert!(!block_on(storage.exists("p1")).unwrap());
        block_on(storage.save("p1", &doc)).unwrap();
        block_on(storage.save("p2", &doc)).unwrap();
        assert!(block_on(storage.exists("p1")).unwrap());

        let mut list = block_on(storage.list()).unwrap();
        list.sort();
        assert_eq!(list, ["p1", "p2"]);

        block_on(storage.delete("p1")).unwrap();
        assert!(!block_on(storage.exists("p1")).unwrap());
    }
}
