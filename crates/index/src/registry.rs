//! Registry of files already embedded into an index.
//!
//! Keyed by the SHA-256 of each file's bytes so renamed but unchanged files
//! are still recognised.

use askfaq_core::{AppError, AppResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// What one processed file produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedFile {
    pub path: PathBuf,
    pub doc_ids: Vec<String>,
    pub embedded_at: DateTime<Utc>,
}

/// `content_hash -> ProcessedFile`, persisted as one JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessedRegistry {
    files: BTreeMap<String, ProcessedFile>,
}

/// SHA-256 of a file's contents as lowercase hex.
pub fn compute_file_hash(path: &Path) -> AppResult<String> {
    let bytes = fs::read(path)
        .map_err(|e| AppError::Ingest(format!("Failed to read {:?}: {}", path, e)))?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

impl ProcessedRegistry {
    /// Load the registry at `path`; a missing file is an empty registry.
    pub fn load(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let registry: Self = serde_json::from_str(&content).map_err(|e| {
            AppError::Ingest(format!("Failed to parse registry at {:?}: {}", path, e))
        })?;

        tracing::debug!("Loaded registry with {} files from {:?}", registry.len(), path);
        Ok(registry)
    }

    pub fn save(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;

        tracing::debug!("Saved registry with {} files to {:?}", self.len(), path);
        Ok(())
    }

    pub fn is_processed(&self, content_hash: &str) -> bool {
        self.files.contains_key(content_hash)
    }

    pub fn get(&self, content_hash: &str) -> Option<&ProcessedFile> {
        self.files.get(content_hash)
    }

    /// Record that the file with `content_hash` produced `doc_ids`.
    ///
    /// Any earlier record for the same hash or the same path is replaced.
    /// Returns the document ids those records held, if there were any.
    pub fn record(
        &mut self,
        content_hash: String,
        path: PathBuf,
        doc_ids: Vec<String>,
    ) -> Option<Vec<String>> {
        let mut replaced: Option<Vec<String>> = None;
        self.files.retain(|hash, file| {
            if *hash != content_hash && file.path != path {
                return true;
            }
            replaced
                .get_or_insert_with(Vec::new)
                .extend(file.doc_ids.iter().cloned());
            false
        });

        self.files.insert(
            content_hash,
            ProcessedFile {
                path,
                doc_ids,
                embedded_at: Utc::now(),
            },
        );
        replaced
    }

    /// Drop `doc_id` from every record; records left with no ids are removed.
    ///
    /// Returns how many records referenced `doc_id`.
    pub fn forget_document(&mut self, doc_id: &str) -> usize {
        let mut touched = 0;
        for file in self.files.values_mut() {
            let before = file.doc_ids.len();
            file.doc_ids.retain(|id| id != doc_id);
            if file.doc_ids.len() != before {
                touched += 1;
            }
        }
        self.files.retain(|_, file| !file.doc_ids.is_empty());
        touched
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_compute_file_hash() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a.txt");
        let b = temp.path().join("b.txt");
        fs::write(&a, "same").unwrap();
        fs::write(&b, "same").unwrap();

        let hash = compute_file_hash(&a).unwrap();
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, compute_file_hash(&b).unwrap());
        assert!(compute_file_hash(&temp.path().join("missing")).is_err());
    }

    #[test]
    fn test_record_and_save_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("index").join("processed.json");

        let mut registry = ProcessedRegistry::load(&path).unwrap();
        assert!(registry.is_empty());

        assert!(registry
            .record("h1".to_string(), "faq.txt".into(), vec!["d1".to_string()])
            .is_none());
        registry.save(&path).unwrap();

        let loaded = ProcessedRegistry::load(&path).unwrap();
        assert!(loaded.is_processed("h1"));
        assert!(!loaded.is_processed("h2"));
        assert_eq!(loaded.get("h1").unwrap().doc_ids, vec!["d1"]);
        assert_eq!(loaded, registry);
    }

    #[test]
    fn test_record_replaces_previous() {
        let mut registry = ProcessedRegistry::default();
        registry.record("h1".to_string(), "a".into(), vec!["old".to_string()]);
        let previous = registry.record("h1".to_string(), "a".into(), vec!["new".to_string()]);
        assert_eq!(previous, Some(vec!["old".to_string()]));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_record_drops_stale_hash_for_same_path() {
        let mut registry = ProcessedRegistry::default();
        registry.record("h1".to_string(), "docs/faq.txt".into(), vec!["d1".to_string()]);
        registry.record("h2".to_string(), "docs/other.txt".into(), vec!["d2".to_string()]);

        let previous = registry.record(
            "h3".to_string(),
            "docs/faq.txt".into(),
            vec!["d1".to_string()],
        );
        assert_eq!(previous, Some(vec!["d1".to_string()]));
        assert_eq!(registry.len(), 2);
        assert!(!registry.is_processed("h1"));
        assert!(registry.is_processed("h2"));
        assert!(registry.is_processed("h3"));
    }

    #[test]
    fn test_forget_document() {
        let mut registry = ProcessedRegistry::default();
        registry.record("h1".to_string(), "a".into(), vec!["d1".to_string()]);
        registry.record(
            "h2".to_string(),
            "b".into(),
            vec!["d1".to_string(), "d2".to_string()],
        );

        assert_eq!(registry.forget_document("d1"), 2);
        assert!(!registry.is_processed("h1"));
        assert_eq!(registry.get("h2").unwrap().doc_ids, vec!["d2"]);
        assert_eq!(registry.forget_document("unknown"), 0);
    }

    #[test]
    fn test_load_malformed() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("processed.json");
        fs::write(&path, "[1, 2]").unwrap();
        assert!(matches!(
            ProcessedRegistry::load(&path),
            Err(AppError::Ingest(_))
        ));
    }
}
