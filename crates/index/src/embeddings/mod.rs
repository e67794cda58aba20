//! Embedding providers that turn text into index vectors.

pub mod config;
pub mod provider;
pub mod providers;

pub use config::EmbeddingConfig;
pub use provider::{create_provider, embed_all, EmbeddingProvider};
