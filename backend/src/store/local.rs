//! On-disk dataset registry.
//!
//! One pretty-printed JSON file per saved summary, named after its id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::DEFAULT_STORE_DIR;
use crate::error::{StoreError, StoreResult};

use super::{SaveDatasetRequest, SaveDatasetResponse};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredDataset {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub dataset: SaveDatasetRequest,
}

pub struct LocalStore {
    dir: PathBuf,
    datasets: HashMap<String, StoredDataset>,
}

impl LocalStore {
    pub fn new() -> Self {
        Self::with_dir(DEFAULT_STORE_DIR)
    }

    /// Open a store, loading whatever is already saved in `dir`.
    pub fn with_dir(dir: impl AsRef<Path>) -> Self {
        let mut store = Self {
            dir: dir.as_ref().to_path_buf(),
            datasets: HashMap::new(),
        };
        store.load_all();
        store
    }

    fn load_all(&mut self) {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return;
        };

        for path in entries.flatten().map(|e| e.path()) {
            if path.extension().is_some_and(|e| e == "json") {
                // Unreadable files are skipped
                if let Ok(stored) = fs::read_to_string(&path)
                    .map_err(StoreError::from)
                    .and_then(|c| serde_json::from_str::<StoredDataset>(&c).map_err(StoreError::from))
                {
                    self.datasets.insert(stored.id.clone(), stored);
                }
            }
        }
    }

    /// Saved summaries, newest first.
    pub fn list(&self) -> Vec<&StoredDataset> {
        let mut all: Vec<_> = self.datasets.values().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        all
    }

    pub fn get(&self, id: &str) -> StoreResult<&StoredDataset> {
        self.datasets
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    pub fn save(&mut self, request: SaveDatasetRequest) -> StoreResult<SaveDatasetResponse> {
        fs::create_dir_all(&self.dir)?;

        let id = generate_id(&request.name);
        let stored = StoredDataset {
            id: id.clone(),
            created_at: Utc::now(),
            dataset: request,
        };

        let content = serde_json::to_string_pretty(&stored)?;
        fs::write(self.path_for(&id), content)?;
        self.datasets.insert(id.clone(), stored);

        Ok(SaveDatasetResponse {
            success: true,
            dataset_id: Some(id),
            message: Some("Dataset saved successfully".to_string()),
            error: None,
        })
    }

    pub fn delete(&mut self, id: &str) -> StoreResult<()> {
        if !self.datasets.contains_key(id) {
            return Err(StoreError::NotFound(id.to_string()));
        }
        // The entry stays listed until its file is gone
        fs::remove_file(self.path_for(id))?;
        self.datasets.remove(id);
        Ok(())
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }
}

impl Default for LocalStore {
    fn default() -> Self {
        Self::new()
    }
}

/// `{slug}-{8 hex chars}`, e.g. `sales-performance-1f0c2a9b`.
fn generate_id(name: &str) -> String {
    let slug = name
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    let slug = if slug.is_empty() { "dataset".to_string() } else { slug };

    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", slug, &suffix[..8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::samples;
    use tempfile::tempdir;

    fn request(key: &str) -> SaveDatasetRequest {
        SaveDatasetRequest::from_dataset(&samples::get(key).unwrap(), None)
    }

    #[test]
    fn test_save_get_and_reload() {
        let dir = tempdir().unwrap();
        let mut store = LocalStore::with_dir(dir.path());

        let response = store.save(request("sales")).unwrap();
        assert!(response.success);
        let id = response.dataset_id.unwrap();
        assert!(id.starts_with("sales-performance-"));

        let reopened = LocalStore::with_dir(dir.path());
        let stored = reopened.get(&id).unwrap();
        assert_eq!(stored.dataset.row_count, 6);
        assert_eq!(stored.dataset, request("sales"));
    }

    #[test]
    fn test_list_and_delete() {
        let dir = tempdir().unwrap();
        let mut store = LocalStore::with_dir(dir.path());

        let first = store.save(request("stock")).unwrap().dataset_id.unwrap();
        store.save(request("website")).unwrap();
        assert_eq!(store.list().len(), 2);

        store.delete(&first).unwrap();
        assert_eq!(store.list().len(), 1);
        assert!(matches!(store.get(&first), Err(StoreError::NotFound(_))));
        assert!(matches!(store.delete(&first), Err(StoreError::NotFound(_))));
        assert!(!dir.path().join(format!("{}.json", first)).exists());
    }

    #[test]
    fn test_failed_delete_keeps_entry() {
        let dir = tempdir().unwrap();
        let mut store = LocalStore::with_dir(dir.path());
        let id = store.save(request("survey")).unwrap().dataset_id.unwrap();

        // a directory in place of the entry file cannot be removed as a file
        let path = dir.path().join(format!("{}.json", id));
        fs::remove_file(&path).unwrap();
        fs::create_dir(&path).unwrap();

        assert!(matches!(store.delete(&id), Err(StoreError::Io(_))));
        assert!(store.get(&id).is_ok());
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn test_ignores_foreign_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), "hello").unwrap();
        fs::write(dir.path().join("broken.json"), "{").unwrap();

        assert!(LocalStore::with_dir(dir.path()).list().is_empty());
    }

    #[test]
    fn test_id_slug() {
        assert!(generate_id("E-commerce Metrics").starts_with("e-commerce-metrics-"));
        assert!(generate_id("***").starts_with("dataset-"));
    }
}
