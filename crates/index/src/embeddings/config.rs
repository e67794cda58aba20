//! Embedding configuration derived from the application settings.

use askfaq_core::config::EmbeddingSettings;
use askfaq_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Runtime configuration handed to `create_provider`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// Provider name: "hashing", or one of the external providers
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Whether to normalize embeddings to unit length
    #[serde(default = "default_normalize")]
    pub normalize: bool,

    /// Maximum number of texts sent to the provider per call
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_normalize() -> bool {
    true
}

fn default_batch_size() -> usize {
    64
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self::from(&EmbeddingSettings::default())
    }
}

impl From<&EmbeddingSettings> for EmbeddingConfig {
    fn from(settings: &EmbeddingSettings) -> Self {
        Self {
            provider: settings.provider.clone(),
            model: settings.model.clone(),
            dimensions: settings.dimensions,
            normalize: default_normalize(),
            batch_size: default_batch_size(),
        }
    }
}

impl EmbeddingConfig {
    pub fn validate(&self) -> AppResult<()> {
        if self.dimensions == 0 {
            return Err(AppError::Embedding(
                "Embedding dimensions must be greater than zero".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(AppError::Embedding(
                "Embedding batch size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EmbeddingConfig::default();
        assert_eq!(config.provider, "hashing");
        assert_eq!(config.model, "hashing-v1");
        assert_eq!(config.dimensions, 384);
        assert!(config.normalize);
        assert_eq!(config.batch_size, 64);
    }

    #[test]
    fn test_from_settings() {
        let settings = EmbeddingSettings {
            provider: "hashing".to_string(),
            model: "custom".to_string(),
            dimensions: 16,
        };
        let config = EmbeddingConfig::from(&settings);
        assert_eq!(config.model, "custom");
        assert_eq!(config.dimensions, 16);
    }

    #[test]
    fn test_yaml_defaults_for_optional_fields() {
        let config: EmbeddingConfig =
            serde_yaml::from_str("provider: hashing\nmodel: hashing-v1\ndimensions: 8\n").unwrap();
        assert!(config.normalize);
        assert_eq!(config.batch_size, 64);
    }

    #[test]
    fn test_validate_rejects_zero() {
        let config = EmbeddingConfig {
            batch_size: 0,
            ..EmbeddingConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
