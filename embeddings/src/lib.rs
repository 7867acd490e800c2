//! # Embeddings
//!
//! Query embeddings and vector similarity for the offline guideline
//! retrieval pipeline.
//!
//! ## Features
//!
//! - **Embedding Providers**: Turn text into fixed-dimension, unit-length vectors
//! - **Similarity Search**: Cosine top-k over stored chunk embeddings
//! - **Ollama Backend**: A provider backed by a locally running Ollama server
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Embeddings System                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  EmbeddingProvider ──► Embedding ──► SimilarityIndex            │
//! │       │                                   │                     │
//! │       ▼                                   ▼                     │
//! │  OllamaEmbeddingProvider            SimilarityResult            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod index;
pub mod provider;
pub mod similarity;

pub use error::{EmbeddingError, Result};
pub use index::SimilarityIndex;
pub use provider::{EmbeddingProvider, OllamaEmbeddingProvider};
pub use similarity::{SimilarityResult, cosine_similarity, find_top_k, normalize};

/// A dense vector embedding.
pub type Embedding = Vec<f32>;

/// Dimension of the default sentence embedding model (all-MiniLM-L6-v2).
pub const DEFAULT_DIMENSION: usize = 384;
