//! Error types for synthesis.

use thiserror::Error;

/// Result type alias for synthesis operations.
pub type Result<T> = std::result::Result<T, SynthesisError>;

/// Errors raised by generators.
///
/// The orchestrator and guardrail never return these. They become a
/// terminal `Error` state or a fail-open guardrail verdict.
#[derive(Error, Debug)]
pub enum SynthesisError {
    /// The generation was cancelled.
    #[error("generation cancelled")]
    Cancelled,

    /// The generator reported a fault.
    #[error("generation failed: {0}")]
    Generation(String),

    /// The generator returned something that is not a valid response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
