//! Embedding providers.
//!
//! The retrieval pipeline only needs "text in, unit-length vector out"; the
//! model behind it is a collaborator. `OllamaEmbeddingProvider` talks to a
//! locally running Ollama server.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::error::{EmbeddingError, Result};
use crate::similarity::normalize;
use crate::{DEFAULT_DIMENSION, Embedding};

/// Trait for embedding providers.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Get the name of this provider.
    fn name(&self) -> &str;

    /// Length of every vector this provider produces.
    fn dimension(&self) -> usize;

    /// Whether the provider can currently serve requests.
    fn is_ready(&self) -> bool;

    /// Embed `text` into a normalized vector of `dimension()` floats.
    ///
    /// Fails with [`EmbeddingError::NotInitialized`] when the provider is not
    /// ready.
    async fn embed(&self, text: &str) -> Result<Embedding>;
}

/// Embedding provider backed by Ollama's `/api/embeddings` endpoint.
pub struct OllamaEmbeddingProvider {
    base_url: String,
    model: String,
    dimension: usize,
    client: reqwest::Client,
}

impl OllamaEmbeddingProvider {
    /// Create a provider for `model` served from `base_url`.
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            dimension: DEFAULT_DIMENSION,
            client: reqwest::Client::new(),
        }
    }

    /// Set the expected output dimension.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddingProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn is_ready(&self) -> bool {
        !self.model.is_empty() && self.dimension > 0
    }

    async fn embed(&self, text: &str) -> Result<Embedding> {
        if !self.is_ready() {
            return Err(EmbeddingError::NotInitialized);
        }

        debug!("Generating embedding with model: {}", self.model);

        let body = serde_json::json!({
            "model": self.model,
            "prompt": text,
        });

        let response = self
            .client
            .post(format!("{}/api/embeddings", self.base_url))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::ApiRequest(format!(
                "status {status}: {error_text}"
            )));
        }

        let result: OllamaEmbeddingResponse = response.json().await?;
        let mut embedding = result.embedding;

        if embedding.is_empty() {
            return Err(EmbeddingError::InvalidResponse(
                "no embedding in response".to_string(),
            ));
        }
        if embedding.len() != self.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimension,
                actual: embedding.len(),
            });
        }

        normalize(&mut embedding);
        Ok(embedding)
    }
}

/// Ollama API response format.
#[derive(Debug, Deserialize)]
struct OllamaEmbeddingResponse {
    #[serde(default)]
    embedding: Vec<f32>,
}
