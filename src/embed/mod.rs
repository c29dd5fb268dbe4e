//! Embedding generation
//!
//! This module provides an abstraction over embedding models with:
//! - A trait for different embedding backends
//! - Local embedding support via fastembed
//! - An HTTP embedding backend
//! - Batch processing for efficiency

#[cfg(feature = "local-embed")]
mod fastembed_impl;
mod http_backend;

#[cfg(feature = "local-embed")]
pub use fastembed_impl::*;
pub use http_backend::*;

use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;

/// Trait for embedding providers
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;

    /// Get the embedding dimension
    fn dimension(&self) -> usize;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Create an embedder based on configuration
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Box<dyn Embedder>> {
    match config.backend.as_str() {
        "http" => Ok(Box::new(HttpEmbedder::new(config)?)),
        "local" => create_local_embedder(config),
        other => Err(Error::Config(format!(
            "Unsupported embedding backend '{}'",
            other
        ))),
    }
}

#[cfg(feature = "local-embed")]
fn create_local_embedder(config: &EmbeddingConfig) -> Result<Box<dyn Embedder>> {
    Ok(Box::new(FastEmbedder::new(config)?))
}

#[cfg(not(feature = "local-embed"))]
fn create_local_embedder(_config: &EmbeddingConfig) -> Result<Box<dyn Embedder>> {
    Err(Error::Embedding(
        "Local embeddings unavailable. Enable the 'local-embed' feature or set embedding.backend = \"http\".".to_string(),
    ))
}

/// Embed a single text (used for questions)
pub async fn embed_one(embedder: &dyn Embedder, text: &str) -> Result<Vec<f32>> {
    embedder
        .embed(vec![text.to_string()])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| Error::Embedding("No embedding returned".to_string()))
}

/// Helper to embed in batches
pub async fn embed_in_batches(
    embedder: &dyn Embedder,
    texts: Vec<String>,
    batch_size: usize,
) -> Result<Vec<Vec<f32>>> {
    let mut all_embeddings = Vec::with_capacity(texts.len());

    for chunk in texts.chunks(batch_size.max(1)) {
        let batch_texts: Vec<String> = chunk.to_vec();
        let expected = batch_texts.len();
        let embeddings = embedder.embed(batch_texts).await?;
        if embeddings.len() != expected {
            return Err(Error::Embedding(format!(
                "Embedder returned {} vectors for {} inputs",
                embeddings.len(),
                expected
            )));
        }
        all_embeddings.extend(embeddings);
    }

    Ok(all_embeddings)
}
