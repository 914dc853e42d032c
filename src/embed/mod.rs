//! Embedding providers.
//!
//! The vector backend only works when queries are embedded with the same model
//! that embedded the corpus, so every provider reports its output dimension and
//! vectors of any other length are rejected.

mod http;
#[cfg(feature = "local-embeddings")]
mod local;

pub use http::HttpEmbedder;
#[cfg(feature = "local-embeddings")]
pub use local::LocalEmbedder;

use crate::config::{EmbeddingConfig, EmbeddingProviderKind};
use crate::error::{RagError, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Turns text into fixed-length vectors.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts, preserving order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    /// Length of every vector this provider returns.
    fn dimension(&self) -> usize;
}

/// Build the provider selected in `config`.
pub fn from_config(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.provider {
        EmbeddingProviderKind::Http => Ok(Arc::new(HttpEmbedder::new(config.clone())?)),
        #[cfg(feature = "local-embeddings")]
        EmbeddingProviderKind::Local => Ok(Arc::new(LocalEmbedder::load(
            &config.model,
            config.dimension,
        )?)),
        #[cfg(not(feature = "local-embeddings"))]
        EmbeddingProviderKind::Local => Err(RagError::Config(
            "local embeddings need the `local-embeddings` feature".to_string(),
        )),
    }
}

/// Reject vectors whose length differs from `expected`.
pub(crate) fn check_dimension(vector: &[f32], expected: usize) -> Result<()> {
    if vector.len() != expected {
        return Err(RagError::backend(
            "embedding",
            format!(
                "model returned {} dimensions, expected {}",
                vector.len(),
                expected
            ),
        ));
    }
    Ok(())
}
