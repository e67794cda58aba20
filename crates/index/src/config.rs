//! Index location and manifest management.
//!
//! Each named index lives in `.askfaq/index/<name>/` next to an
//! `index.yaml` manifest recording the dimension and embedding settings it
//! was built with.

use askfaq_core::config::EmbeddingSettings;
use askfaq_core::{AppConfig, AppError, AppResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Settings an index was created with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    /// Name of the index
    pub name: String,

    /// Fixed vector dimension
    pub dimension: usize,

    /// Embedding settings used to produce the stored vectors
    pub embedding: EmbeddingSettings,

    /// When the manifest was first written
    pub created_at: DateTime<Utc>,
}

impl IndexManifest {
    /// Manifest describing the index selected by `config`.
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            name: config.index_name.clone(),
            dimension: config.dimension,
            embedding: config.embedding.clone(),
            created_at: Utc::now(),
        }
    }

    /// Check that `other` describes vectors compatible with this index.
    pub fn validate_consistency(&self, other: &Self) -> AppResult<()> {
        if self.dimension != other.dimension {
            return Err(AppError::DimensionMismatch {
                expected: self.dimension,
                actual: other.dimension,
            });
        }

        if self.embedding.provider != other.embedding.provider {
            return Err(AppError::Config(format!(
                "Index '{}' was built with embedding provider '{}', not '{}'",
                self.name, self.embedding.provider, other.embedding.provider
            )));
        }

        if self.embedding.model != other.embedding.model {
            return Err(AppError::Config(format!(
                "Index '{}' was built with embedding model '{}', not '{}'",
                self.name, self.embedding.model, other.embedding.model
            )));
        }

        Ok(())
    }
}

/// Load the manifest for an index, if one has been written.
pub fn load_manifest(workspace: &Path, index_name: &str) -> AppResult<Option<IndexManifest>> {
    let path = get_manifest_path(workspace, index_name);
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(&path)
        .map_err(|e| AppError::Config(format!("Failed to read manifest at {:?}: {}", path, e)))?;

    let mut manifest: IndexManifest = serde_yaml::from_str(&content)
        .map_err(|e| AppError::Config(format!("Failed to parse manifest at {:?}: {}", path, e)))?;

    // The directory name is authoritative
    manifest.name = index_name.to_string();

    tracing::debug!("Loaded manifest for index '{}'", index_name);
    Ok(Some(manifest))
}

/// Save the manifest for an index.
pub fn save_manifest(workspace: &Path, manifest: &IndexManifest) -> AppResult<()> {
    let path = get_manifest_path(workspace, &manifest.name);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| AppError::Config(format!("Failed to create index directory: {}", e)))?;
    }

    let yaml = serde_yaml::to_string(manifest)?;
    fs::write(&path, yaml)
        .map_err(|e| AppError::Config(format!("Failed to write manifest to {:?}: {}", path, e)))?;

    tracing::debug!("Saved manifest for index '{}'", manifest.name);
    Ok(())
}

/// Ensure the on-disk manifest agrees with `config`, writing one if absent.
pub fn ensure_manifest(config: &AppConfig) -> AppResult<IndexManifest> {
    let requested = IndexManifest::from_app_config(config);

    match load_manifest(&config.workspace, &config.index_name)? {
        Some(existing) => {
            existing.validate_consistency(&requested)?;
            Ok(existing)
        }
        None => {
            save_manifest(&config.workspace, &requested)?;
            Ok(requested)
        }
    }
}

/// Validate `config` against the on-disk manifest without writing one.
pub fn check_manifest(config: &AppConfig) -> AppResult<()> {
    if let Some(existing) = load_manifest(&config.workspace, &config.index_name)? {
        existing.validate_consistency(&IndexManifest::from_app_config(config))?;
    }
    Ok(())
}

/// Get the directory holding a named index.
pub fn get_index_dir(workspace: &Path, index_name: &str) -> PathBuf {
    workspace.join(".askfaq").join("index").join(index_name)
}

/// Get the base path of the index file pair (`faq.index` / `faq.json`).
pub fn get_index_base(workspace: &Path, index_name: &str) -> PathBuf {
    get_index_dir(workspace, index_name).join("faq")
}

/// Get the manifest path for an index.
pub fn get_manifest_path(workspace: &Path, index_name: &str) -> PathBuf {
    get_index_dir(workspace, index_name).join("index.yaml")
}

/// Get the processed-file registry path for an index.
pub fn get_registry_path(workspace: &Path, index_name: &str) -> PathBuf {
    get_index_dir(workspace, index_name).join("processed.json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_in(workspace: &Path) -> AppConfig {
        AppConfig {
            workspace: workspace.to_path_buf(),
            index_name: "faq".to_string(),
            dimension: 8,
            embedding: EmbeddingSettings {
                dimensions: 8,
                ..EmbeddingSettings::default()
            },
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_paths() {
        let ws = Path::new("/ws");
        assert_eq!(
            get_index_base(ws, "faq"),
            PathBuf::from("/ws/.askfaq/index/faq/faq")
        );
        assert_eq!(
            get_registry_path(ws, "faq"),
            PathBuf::from("/ws/.askfaq/index/faq/processed.json")
        );
    }

    #[test]
    fn test_load_missing_manifest() {
        let temp = TempDir::new().unwrap();
        assert!(load_manifest(temp.path(), "nope").unwrap().is_none());
    }

    #[test]
    fn test_ensure_manifest_writes_then_validates() {
        let temp = TempDir::new().unwrap();
        let config = config_in(temp.path());

        let first = ensure_manifest(&config).unwrap();
        assert_eq!(first.dimension, 8);
        assert!(get_manifest_path(temp.path(), "faq").exists());

        let again = ensure_manifest(&config).unwrap();
        assert_eq!(again, first);
    }

    #[test]
    fn test_ensure_manifest_rejects_new_dimension() {
        let temp = TempDir::new().unwrap();
        let config = config_in(temp.path());
        ensure_manifest(&config).unwrap();

        let changed = AppConfig {
            dimension: 16,
            ..config_in(temp.path())
        };
        assert!(matches!(
            ensure_manifest(&changed),
            Err(AppError::DimensionMismatch {
                expected: 8,
                actual: 16
            })
        ));
    }

    #[test]
    fn test_check_manifest_does_not_write() {
        let temp = TempDir::new().unwrap();
        let config = config_in(temp.path());

        check_manifest(&config).unwrap();
        assert!(!get_manifest_path(temp.path(), "faq").exists());
    }

    #[test]
    fn test_validate_consistency_model_mismatch() {
        let temp = TempDir::new().unwrap();
        let a = IndexManifest::from_app_config(&config_in(temp.path()));
        let mut b = a.clone();
        b.embedding.model = "other".to_string();

        let err = a.validate_consistency(&b).unwrap_err();
        assert!(err.to_string().contains("embedding model"));
    }
}
