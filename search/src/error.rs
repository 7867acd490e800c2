//! Error types for guideline search.

use thiserror::Error;

/// Result type alias for search operations.
pub type Result<T> = std::result::Result<T, SearchError>;

/// Errors that can occur while searching the guideline corpus.
///
/// [`crate::HybridSearch`] never returns these to its caller: a failing
/// source degrades to an empty candidate list.
#[derive(Error, Debug)]
pub enum SearchError {
    /// Embedding generation failed.
    #[error("embedding error: {0}")]
    Embedding(#[from] clinrag_embeddings::EmbeddingError),

    /// A candidate source failed.
    #[error("source error: {0}")]
    Source(String),

    /// Duplicate chunk id in the corpus.
    #[error("duplicate chunk id: {0}")]
    DuplicateChunk(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
