//! Configuration management for askfaq.
//!
//! Configuration is assembled from several sources, later ones winning:
//! - Built-in defaults
//! - Config file (`.askfaq/config.yaml`)
//! - Environment variables
//! - Command-line flags
//!
//! All state lives under the workspace's `.askfaq/` directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Embedding providers the index knows how to build.
pub const KNOWN_EMBEDDING_PROVIDERS: [&str; 1] = ["hashing"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .askfaq/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Name of the index under .askfaq/index/
    pub index_name: String,

    /// Fixed vector dimension of the index
    pub dimension: usize,

    /// Embedding provider settings
    pub embedding: EmbeddingSettings,

    /// Log level override
    pub log_level: Option<String>,

    /// Log output format
    pub log_format: LogFormat,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,
}

/// Embedding provider settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    /// Provider name (e.g. "hashing")
    pub provider: String,

    /// Model identifier reported by the provider
    pub model: String,

    /// Output dimensions; must equal the index dimension
    pub dimensions: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "hashing".to_string(),
            model: "hashing-v1".to_string(),
            dimensions: 384,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    workspace: Option<WorkspaceSection>,
    index: Option<IndexSection>,
    embedding: Option<EmbeddingSection>,
    logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceSection {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexSection {
    name: Option<String>,
    dimension: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EmbeddingSection {
    provider: Option<String>,
    model: Option<String>,
    dimensions: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    color: Option<bool>,
    format: Option<LogFormat>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            index_name: "default".to_string(),
            dimension: 384, // all-MiniLM-L6-v2 output size
            embedding: EmbeddingSettings::default(),
            log_level: None,
            log_format: LogFormat::default(),
            verbose: false,
            no_color: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the YAML file and the environment.
    ///
    /// Environment variables:
    /// - `ASKFAQ_WORKSPACE`: Override workspace path
    /// - `ASKFAQ_CONFIG`: Path to config file
    /// - `ASKFAQ_INDEX`: Index name
    /// - `ASKFAQ_DIMENSION`: Vector dimension
    /// - `ASKFAQ_EMBEDDING_PROVIDER`: Embedding provider name
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use askfaq_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Index: {}", config.index_name);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_from(None, None)
    }

    /// Load configuration, locating the workspace and config file from the
    /// given paths before falling back to the environment.
    pub fn load_from(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) =
            workspace.or_else(|| std::env::var_os("ASKFAQ_WORKSPACE").map(PathBuf::from))
        {
            config.workspace = workspace;
        }

        if let Some(config_file) =
            config_file.or_else(|| std::env::var_os("ASKFAQ_CONFIG").map(PathBuf::from))
        {
            config.config_file = Some(config_file);
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.askfaq_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(index) = std::env::var("ASKFAQ_INDEX") {
            config.index_name = index;
        }

        if let Ok(dimension) = std::env::var("ASKFAQ_DIMENSION") {
            config.dimension = dimension.parse().map_err(|e| {
                AppError::Config(format!("Invalid ASKFAQ_DIMENSION '{}': {}", dimension, e))
            })?;
            config.embedding.dimensions = config.dimension;
        }

        if let Ok(provider) = std::env::var("ASKFAQ_EMBEDDING_PROVIDER") {
            config.embedding.provider = provider;
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(path) = config_file.workspace.and_then(|ws| ws.path) {
            result.workspace = PathBuf::from(path);
        }

        if let Some(index) = config_file.index {
            if let Some(name) = index.name {
                result.index_name = name;
            }
            if let Some(dimension) = index.dimension {
                result.dimension = dimension;
                // Embedding output follows the index unless overridden below
                result.embedding.dimensions = dimension;
            }
        }

        if let Some(embedding) = config_file.embedding {
            if let Some(provider) = embedding.provider {
                result.embedding.provider = provider;
            }
            if let Some(model) = embedding.model {
                result.embedding.model = model;
            }
            if let Some(dimensions) = embedding.dimensions {
                result.embedding.dimensions = dimensions;
            }
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
            if let Some(format) = logging.format {
                result.log_format = format;
            }
        }

        tracing::debug!("Merged config file {:?}", path);
        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over the file and environment.
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        index_name: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(index_name) = index_name {
            self.index_name = index_name;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .askfaq directory.
    pub fn askfaq_dir(&self) -> PathBuf {
        self.workspace.join(".askfaq")
    }

    /// Ensure the .askfaq directory exists.
    pub fn ensure_askfaq_dir(&self) -> AppResult<()> {
        let dir = self.askfaq_dir();
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                AppError::Config(format!("Failed to create .askfaq directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Validate the assembled configuration.
    pub fn validate(&self) -> AppResult<()> {
        if self.dimension == 0 {
            return Err(AppError::Config(
                "Index dimension must be greater than zero".to_string(),
            ));
        }

        if self.index_name.is_empty()
            || self.index_name.contains(['/', '\\'])
            || self.index_name == ".."
        {
            return Err(AppError::Config(format!(
                "Invalid index name: {:?}",
                self.index_name
            )));
        }

        if !KNOWN_EMBEDDING_PROVIDERS.contains(&self.embedding.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding.provider,
                KNOWN_EMBEDDING_PROVIDERS.join(", ")
            )));
        }

        if self.embedding.dimensions != self.dimension {
            return Err(AppError::Config(format!(
                "Embedding dimensions ({}) do not match index dimension ({})",
                self.embedding.dimensions, self.dimension
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.index_name, "default");
        assert_eq!(config.dimension, 384);
        assert_eq!(config.embedding.provider, "hashing");
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(!config.verbose);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_askfaq_dir() {
        let config = AppConfig::default();
        assert!(config.askfaq_dir().ends_with(".askfaq"));
    }

    #[test]
    fn test_with_overrides() {
        let overridden = AppConfig::default().with_overrides(
            None,
            None,
            Some("admissions".to_string()),
            None,
            true,
            false,
        );

        assert_eq!(overridden.index_name, "admissions");
        assert!(overridden.verbose);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_merge_yaml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(
            &path,
            "index:\n  name: tuition\n  dimension: 8\nlogging:\n  level: warn\n  color: false\n  format: json\n",
        )
        .unwrap();

        let merged = AppConfig::default().merge_yaml(&path).unwrap();
        assert_eq!(merged.index_name, "tuition");
        assert_eq!(merged.dimension, 8);
        assert_eq!(merged.embedding.dimensions, 8);
        assert_eq!(merged.log_level.as_deref(), Some("warn"));
        assert!(merged.no_color);
        assert_eq!(merged.log_format, LogFormat::Json);
        assert!(merged.validate().is_ok());
    }

    #[test]
    fn test_load_from_workspace_reads_its_config() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(".askfaq");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("config.yaml"),
            "index:\n  name: support\n  dimension: 8\n",
        )
        .unwrap();

        let config = AppConfig::load_from(Some(temp.path().to_path_buf()), None).unwrap();
        assert_eq!(config.workspace, temp.path());
        assert_eq!(config.dimension, 8);
        assert_eq!(config.embedding.dimensions, 8);
    }

    #[test]
    fn test_load_from_missing_workspace() {
        let temp = TempDir::new().unwrap();
        let result = AppConfig::load_from(Some(temp.path().join("absent")), None);
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_validate_zero_dimension() {
        let config = AppConfig {
            dimension: 0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_unknown_provider() {
        let mut config = AppConfig::default();
        config.embedding.provider = "unknown".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_dimension_disagreement() {
        let mut config = AppConfig::default();
        config.embedding.dimensions = 768;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("do not match"));
    }

    #[test]
    fn test_validate_rejects_path_like_index_name() {
        let config = AppConfig {
            index_name: "../escape".to_string(),
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
