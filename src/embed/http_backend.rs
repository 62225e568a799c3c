//! OpenAI-compatible HTTP embedding backend

use super::Embedder;
use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

#[derive(Debug, Clone, Serialize)]
struct EmbeddingsRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Clone, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Embedder backed by an OpenAI-compatible `/v1/embeddings` endpoint
pub struct HttpEmbedder {
    client: Client,
    base_url: Url,
    api_key: String,
    model: String,
    dimension: usize,
    retries: usize,
}

impl HttpEmbedder {
    pub fn new(config: &EmbeddingConfig, api_key: &str) -> Result<Self> {
        let base_url = Url::parse(&config.api_base)?;
        let timeout = Duration::from_secs(30);
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            api_key: api_key.to_string(),
            model: config.model.clone(),
            dimension: config.resolved_dimension()?,
            retries: 2,
        })
    }

    fn endpoint(&self) -> Result<Url> {
        self.base_url
            .join("/v1/embeddings")
            .map_err(|e| Error::Config(format!("Invalid embedding API URL: {}", e)))
    }

    async fn send_with_retry(&self, body: &EmbeddingsRequest) -> Result<EmbeddingsResponse> {
        let url = self.endpoint()?;
        let mut last_err: Option<Error> = None;

        for attempt in 0..=self.retries {
            let request = self
                .client
                .post(url.clone())
                .bearer_auth(&self.api_key)
                .json(body);

            match request.send().await {
                Ok(response) => match response.error_for_status() {
                    Ok(ok) => return Ok(ok.json::<EmbeddingsResponse>().await?),
                    Err(e) => last_err = Some(Error::Embedding(e.to_string())),
                },
                Err(e) => last_err = Some(Error::Embedding(e.to_string())),
            }

            if attempt < self.retries {
                tokio::time::sleep(Duration::from_millis(200 * (attempt + 1) as u64)).await;
            }
        }

        Err(last_err
            .unwrap_or_else(|| Error::Embedding("Embedding request failed".to_string())))
    }

    fn validate_dimensions(&self, embeddings: &[Vec<f32>]) -> Result<()> {
        if let Some(mismatch) = embeddings.iter().find(|vec| vec.len() != self.dimension) {
            return Err(Error::Embedding(format!(
                "Embedding dimension mismatch for model '{}': expected {}, got {}",
                self.model,
                self.dimension,
                mismatch.len()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts via HTTP backend", texts.len());

        let request = EmbeddingsRequest {
            model: self.model.clone(),
            input: texts,
        };

        let response = self.send_with_retry(&request).await?;
        let embeddings: Vec<Vec<f32>> =
            response.data.into_iter().map(|d| d.embedding).collect();
        self.validate_dimensions(&embeddings)?;
        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
