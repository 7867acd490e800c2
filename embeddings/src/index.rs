//! In-memory similarity index over chunk embeddings.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::Embedding;
use crate::error::{EmbeddingError, Result};
use crate::similarity::{SimilarityResult, find_top_k, normalize};

/// A similarity index for fast vector lookups.
///
/// Embeddings are normalized on insert so cosine similarity reduces to a
/// dot product over unit vectors.
#[derive(Debug, Clone)]
pub struct SimilarityIndex {
    entries: HashMap<String, Embedding>,
    dimension: usize,
}

impl SimilarityIndex {
    /// Create a new similarity index for vectors of `dimension` floats.
    pub fn new(dimension: usize) -> Self {
        Self {
            entries: HashMap::new(),
            dimension,
        }
    }

    /// Expected dimension of stored and query vectors.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Add (or replace) an embedding in the index.
    pub fn add(&mut self, id: impl Into<String>, mut embedding: Embedding) -> Result<()> {
        let id = id.into();

        if embedding.len() != self.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimension,
                actual: embedding.len(),
            });
        }

        normalize(&mut embedding);
        debug!("Added embedding to index: {id}");
        self.entries.insert(id, embedding);

        Ok(())
    }

    /// Remove an embedding from the index.
    pub fn remove(&mut self, id: &str) -> Option<Embedding> {
        self.entries.remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Search for the `k` embeddings most similar to `query`.
    pub fn search(&self, query: &[f32], k: usize, min_score: f32) -> Result<Vec<SimilarityResult>> {
        if query.len() != self.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut query = query.to_vec();
        normalize(&mut query);

        find_top_k(
            &query,
            self.entries.iter().map(|(id, e)| (id.as_str(), e)),
            k,
            min_score,
        )
    }

    /// Clear the index.
    pub fn clear(&mut self) {
        self.entries.clear();
        info!("Cleared similarity index");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_index_add_and_contains() {
        let mut index = SimilarityIndex::new(3);
        index.add("item1", vec![1.0, 0.0, 0.0]).unwrap();

        assert!(index.contains("item1"));
        assert!(!index.contains("item2"));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_index_search() {
        let mut index = SimilarityIndex::new(3);
        index.add("a", vec![2.0, 0.0, 0.0]).unwrap();
        index.add("b", vec![0.0, 1.0, 0.0]).unwrap();
        index.add("c", vec![0.7, 0.7, 0.0]).unwrap();

        let results = index.search(&[1.0, 0.0, 0.0], 2, 0.0).unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "a");
        assert!((results[0].score - 1.0).abs() < 1e-6);
        assert_eq!(results[1].id, "c");
    }

    #[test]
    fn test_dimension_mismatch_on_add_and_search() {
        let mut index = SimilarityIndex::new(3);
        assert!(index.add("bad", vec![1.0, 0.0]).is_err());
        assert!(index.search(&[1.0], 1, 0.0).is_err());
    }
}
