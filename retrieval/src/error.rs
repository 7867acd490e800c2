//! Error types for the clinical pipeline.

use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, RetrievalError>;

/// Errors that can occur while assembling the pipeline.
///
/// Queries themselves do not fail: source and generator faults are absorbed
/// below this layer.
#[derive(Error, Debug)]
pub enum RetrievalError {
    /// Search layer error, e.g. a malformed corpus or term table.
    #[error("search error: {0}")]
    Search(#[from] clinrag_search::SearchError),

    /// Embedding error.
    #[error("embedding error: {0}")]
    Embedding(#[from] clinrag_embeddings::EmbeddingError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Config file could not be parsed.
    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
