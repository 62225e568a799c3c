//! Embedding generation
//!
//! This module provides an abstraction over embedding providers with:
//! - A trait for different embedding backends
//! - An OpenAI-compatible HTTP backend
//! - A local fastembed backend (feature `local-embed`)

mod http_backend;

#[cfg(feature = "local-embed")]
mod fastembed_impl;

pub use http_backend::*;

#[cfg(feature = "local-embed")]
pub use fastembed_impl::*;

use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// Trait for embedding providers
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts. The i-th output vector corresponds to the
    /// i-th input text.
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;

    /// Get the embedding dimension
    fn dimension(&self) -> usize;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Create an embedder based on configuration.
///
/// Selecting a provider happens once at startup; the vector collection's
/// dimension is bound to the returned embedder for the process lifetime.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    match config.provider.as_str() {
        "openai" => {
            let api_key = std::env::var(&config.api_key_env).map_err(|_| {
                Error::Config(format!(
                    "Embedding provider 'openai' requires {} to be set",
                    config.api_key_env
                ))
            })?;
            info!("Using OpenAI-compatible embeddings with model: {}", config.model);
            Ok(Arc::new(HttpEmbedder::new(config, &api_key)?))
        }
        #[cfg(feature = "local-embed")]
        "local" => {
            info!("Using local embeddings with model: {}", config.model);
            Ok(Arc::new(FastEmbedder::new(config)?))
        }
        #[cfg(not(feature = "local-embed"))]
        "local" => Err(Error::Config(
            "Embedding provider 'local' requires the local-embed feature".to_string(),
        )),
        other => Err(Error::Config(format!(
            "No embedding provider configured (got '{}')",
            other
        ))),
    }
}
