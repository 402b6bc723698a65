//! Embedding generation for semantic search and retrieval.

mod huggingface;
mod openai;

pub use huggingface::HuggingFaceEmbedder;
pub use openai::OpenAIEmbedder;

use crate::config::{api_key_from_env, EmbeddingProvider, EmbeddingSettings};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Trait for embedding generation.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the embedding dimensions.
    fn dimensions(&self) -> usize;
}

/// Create the configured embedder.
///
/// Fails with an authentication error when the provider's token is missing.
pub fn create_embedder(
    settings: &EmbeddingSettings,
    timeout: Duration,
) -> Result<Arc<dyn Embedder>> {
    let api_key = api_key_from_env(settings.api_key_env())?;
    let dimensions = settings.dimensions as usize;

    let embedder: Arc<dyn Embedder> = match settings.provider {
        EmbeddingProvider::HuggingFace => Arc::new(HuggingFaceEmbedder::new(
            &settings.model,
            dimensions,
            &api_key,
            settings.api_base.as_deref(),
            timeout,
        )?),
        EmbeddingProvider::OpenAI => Arc::new(OpenAIEmbedder::new(
            &settings.model,
            dimensions,
            &api_key,
            settings.api_base.as_deref(),
            timeout,
        )?),
    };

    Ok(embedder)
}
