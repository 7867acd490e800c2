//! Configuration for the clinical pipeline.
//!
//! Every field is optional in a config file; missing sections fall back to
//! their defaults.

use std::path::{Path, PathBuf};

use clinrag_embeddings::DEFAULT_DIMENSION;
use clinrag_search::SearchConfig;
use clinrag_synthesis::{OllamaConfig, SynthesisConfig};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default embedding model tag.
pub const DEFAULT_EMBEDDING_MODEL: &str = "all-minilm";

/// Configuration for the clinical pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Hybrid search and fusion settings.
    pub search: SearchConfig,

    /// Synthesis and guardrail settings.
    pub synthesis: SynthesisConfig,

    /// Generative model server.
    pub generator: OllamaConfig,

    /// Embedding model server.
    pub embedding: EmbeddingConfig,

    /// JSON file of guideline chunks with precomputed embeddings.
    pub corpus_path: Option<PathBuf>,

    /// JSON file of high-risk terms.
    pub high_risk_terms_path: Option<PathBuf>,
}

impl PipelineConfig {
    /// Load a configuration from a TOML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Set the search configuration.
    pub fn with_search(mut self, search: SearchConfig) -> Self {
        self.search = search;
        self
    }

    /// Set the synthesis configuration.
    pub fn with_synthesis(mut self, synthesis: SynthesisConfig) -> Self {
        self.synthesis = synthesis;
        self
    }

    /// Set the generator configuration.
    pub fn with_generator(mut self, generator: OllamaConfig) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_corpus_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.corpus_path = Some(path.into());
        self
    }

    pub fn with_high_risk_terms_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.high_risk_terms_path = Some(path.into());
        self
    }
}

/// Configuration for the embedding provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub base_url: String,

    /// Model to use for embeddings. Must match the model the corpus was
    /// embedded with.
    pub model: String,

    pub dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: clinrag_synthesis::config::DEFAULT_OLLAMA_URL.to_string(),
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            dimension: DEFAULT_DIMENSION,
        }
    }
}
