//! Embedding provider trait and factory.

use crate::embeddings::config::EmbeddingConfig;
use crate::embeddings::providers::hashing::HashingProvider;
use askfaq_core::{AppError, AppResult};
use std::sync::Arc;

/// Providers that run outside this process and are not bundled.
pub const EXTERNAL_PROVIDERS: [&str; 3] = ["openai", "ollama", "sentence-transformers"];

/// Trait for embedding providers.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "hashing")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Generate embeddings for multiple texts in a batch.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text (convenience method).
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Embedding("No embedding returned".to_string()))
    }
}

/// Create an embedding provider based on configuration.
pub fn create_provider(config: &EmbeddingConfig) -> AppResult<Arc<dyn EmbeddingProvider>> {
    config.validate()?;

    match config.provider.as_str() {
        "hashing" => {
            let provider = HashingProvider::new(config.model.clone(), config.dimensions)
                .with_normalize(config.normalize);
            Ok(Arc::new(provider))
        }

        name if EXTERNAL_PROVIDERS.contains(&name) => Err(AppError::Embedding(format!(
            "Embedding provider '{}' runs as an external service and is not bundled. \
             Compute embeddings elsewhere and use 'askfaq import', or use the 'hashing' provider.",
            name
        ))),

        _ => Err(AppError::Embedding(format!(
            "Unknown embedding provider: '{}'. Supported providers: hashing",
            config.provider
        ))),
    }
}

/// Embed `texts` in slices of at most `batch_size`, preserving order.
pub async fn embed_all(
    provider: &dyn EmbeddingProvider,
    texts: &[String],
    batch_size: usize,
) -> AppResult<Vec<Vec<f32>>> {
    let mut embeddings = Vec::with_capacity(texts.len());

    for batch in texts.chunks(batch_size.max(1)) {
        let vectors = provider.embed_batch(batch).await?;
        if vectors.len() != batch.len() {
            return Err(AppError::Embedding(format!(
                "Provider '{}' returned {} embeddings for {} texts",
                provider.provider_name(),
                vectors.len(),
                batch.len()
            )));
        }
        embeddings.extend(vectors);
    }

    tracing::debug!(
        "Embedded {} texts with provider '{}' (model: {})",
        texts.len(),
        provider.provider_name(),
        provider.model_name()
    );

    Ok(embeddings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_hashing_provider() {
        let config = EmbeddingConfig {
            dimensions: 32,
            ..EmbeddingConfig::default()
        };

        let provider = create_provider(&config).unwrap();
        assert_eq!(provider.provider_name(), "hashing");
        assert_eq!(provider.model_name(), "hashing-v1");
        assert_eq!(provider.dimensions(), 32);
    }

    #[test]
    fn test_create_external_provider() {
        let config = EmbeddingConfig {
            provider: "openai".to_string(),
            ..EmbeddingConfig::default()
        };

        let err = create_provider(&config).unwrap_err();
        assert!(matches!(err, AppError::Embedding(_)));
        assert!(err.to_string().contains("external service"));
    }

    #[test]
    fn test_create_unknown_provider() {
        let config = EmbeddingConfig {
            provider: "unknown".to_string(),
            ..EmbeddingConfig::default()
        };

        let result = create_provider(&config);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Unknown embedding provider"));
    }

    #[tokio::test]
    async fn test_embed_all_batches_in_order() {
        let provider = HashingProvider::new("hashing-v1".to_string(), 16);
        let texts: Vec<String> = (0..5).map(|i| format!("question number {}", i)).collect();

        let batched = embed_all(&provider, &texts, 2).await.unwrap();
        let single = provider.embed_batch(&texts).await.unwrap();
        assert_eq!(batched, single);
    }

    #[tokio::test]
    async fn test_provider_embed_single() {
        let provider = create_provider(&EmbeddingConfig::default()).unwrap();
        let embedding = provider.embed("test text").await.unwrap();
        assert_eq!(embedding.len(), 384);
    }
}
