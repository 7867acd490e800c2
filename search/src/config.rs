//! Configuration for hybrid search.

use serde::{Deserialize, Serialize};

use crate::fusion::{DEFAULT_RRF_K, FusionWeights, RrfFusion};

/// Configuration for hybrid search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// RRF constant; higher values flatten the head of each ranking.
    pub rrf_k: usize,

    /// Multiplier for vector-source contributions.
    pub vector_weight: f64,

    /// Multiplier for keyword-source contributions.
    pub keyword_weight: f64,

    /// Number of candidates requested from each source.
    pub candidate_k: usize,

    /// Number of fused results kept.
    pub top_k: usize,

    /// Vector hits whose trimmed content is shorter than this are skipped.
    pub min_vector_content_chars: usize,

    /// The vector source fetches `candidate_k * vector_oversample` raw hits
    /// before filtering.
    pub vector_oversample: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            rrf_k: DEFAULT_RRF_K,
            vector_weight: 1.0,
            keyword_weight: 1.0,
            candidate_k: 15,
            top_k: 10,
            min_vector_content_chars: 50,
            vector_oversample: 3,
        }
    }
}

impl SearchConfig {
    /// Set the fused output size.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Set the per-source candidate count.
    pub fn with_candidate_k(mut self, candidate_k: usize) -> Self {
        self.candidate_k = candidate_k;
        self
    }

    /// Set the per-source fusion weights.
    pub fn with_weights(mut self, vector_weight: f64, keyword_weight: f64) -> Self {
        self.vector_weight = vector_weight;
        self.keyword_weight = keyword_weight;
        self
    }

    /// The fusion engine described by this configuration.
    pub fn fusion(&self) -> RrfFusion {
        RrfFusion::new(self.rrf_k).with_weights(FusionWeights {
            vector: self.vector_weight,
            keyword: self.keyword_weight,
        })
    }
}
