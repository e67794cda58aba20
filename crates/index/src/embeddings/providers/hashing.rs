//! Offline embedding provider based on feature hashing.

use crate::embeddings::provider::EmbeddingProvider;
use askfaq_core::AppResult;

/// Deterministic provider that hashes words and character trigrams into
/// `dimensions` signed buckets.
///
/// Texts sharing vocabulary land close together under L2, which is enough
/// to exercise the index end to end without a hosted model.
#[derive(Debug)]
pub struct HashingProvider {
    model: String,
    dimensions: usize,
    normalize: bool,
}

impl HashingProvider {
    pub fn new(model: String, dimensions: usize) -> Self {
        Self {
            model,
            dimensions,
            normalize: true,
        }
    }

    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimensions];
        if self.dimensions == 0 {
            return embedding;
        }

        let lower = text.to_lowercase();
        let tokens = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| t.chars().count() > 1);

        for token in tokens {
            self.accumulate(&mut embedding, token.as_bytes(), 1.0);

            let chars: Vec<char> = token.chars().collect();
            for window in chars.windows(3) {
                let trigram: String = window.iter().collect();
                self.accumulate(&mut embedding, trigram.as_bytes(), 0.5);
            }
        }

        if self.normalize {
            let norm = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm > 0.0 {
                embedding.iter_mut().for_each(|v| *v /= norm);
            }
        }

        embedding
    }

    fn accumulate(&self, embedding: &mut [f32], feature: &[u8], weight: f32) {
        let hash = fnv1a(feature);
        let bucket = (hash % self.dimensions as u64) as usize;
        // High bit picks the sign so unrelated features tend to cancel
        let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
        embedding[bucket] += sign * weight;
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325u64, |acc, &b| {
        (acc ^ b as u64).wrapping_mul(0x0100_0000_01b3)
    })
}

#[async_trait::async_trait]
impl EmbeddingProvider for HashingProvider {
    fn provider_name(&self) -> &str {
        "hashing"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }
}
