//! Candidate source interfaces.
//!
//! The storage engine behind each source is a collaborator. Both sources
//! return at most `top_k` candidates ranked best first with 1-based
//! `source_rank`. An empty list is a normal outcome.

use async_trait::async_trait;

use crate::candidate::Candidate;
use crate::error::Result;

/// Nearest-neighbour search over chunk embeddings.
#[async_trait]
pub trait VectorSource: Send + Sync {
    async fn search_vector(&self, vector: &[f32], top_k: usize) -> Result<Vec<Candidate>>;
}

/// Lexical search over chunk text.
#[async_trait]
pub trait KeywordSource: Send + Sync {
    async fn search_keyword(&self, query: &str, top_k: usize) -> Result<Vec<Candidate>>;
}
