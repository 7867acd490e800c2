//! Reciprocal Rank Fusion of the vector and keyword rankings.
//!
//! ```text
//! score(id) = vector_weight / (k + vector_rank) + keyword_weight / (k + keyword_rank)
//! ```
//!
//! - `k` is a constant (default 60) that flattens the head of each ranking.
//! - Ranks are 1-based list positions; a source that did not return an id
//!   contributes 0.
//! - An id returned by both sources sums both terms, so chunks found by both
//!   modalities rise above chunks found by one.
//! - The payload for an id comes from the first list that contains it. The
//!   vector list is read first.
//! - Ordering is score descending, then payload source (vector first), then
//!   id ascending.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use serde::{Deserialize, Serialize};

use crate::candidate::{Candidate, FusedResult, SourceKind};

/// Default RRF constant.
pub const DEFAULT_RRF_K: usize = 60;

/// Multiplicative per-source weights applied before summing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionWeights {
    pub vector: f64,
    pub keyword: f64,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            vector: 1.0,
            keyword: 1.0,
        }
    }
}

/// Reciprocal Rank Fusion with a fixed `k` and per-source weights.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RrfFusion {
    k: usize,
    weights: FusionWeights,
}

impl Default for RrfFusion {
    fn default() -> Self {
        Self::new(DEFAULT_RRF_K)
    }
}

impl RrfFusion {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            weights: FusionWeights::default(),
        }
    }

    pub fn with_weights(mut self, weights: FusionWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn weights(&self) -> FusionWeights {
        self.weights
    }

    /// Contribution of a single 1-based `rank` under `weight`.
    pub fn contribution(&self, rank: usize, weight: f64) -> f64 {
        weight / (self.k + rank) as f64
    }

    /// Fuse two ranked lists into at most `limit` results.
    ///
    /// If an id appears more than once in the same list only its first
    /// (best) position counts.
    pub fn fuse(
        &self,
        vector: &[Candidate],
        keyword: &[Candidate],
        limit: usize,
    ) -> Vec<FusedResult> {
        if limit == 0 {
            return Vec::new();
        }

        let mut scores: HashMap<&str, Accumulator<'_>> = HashMap::new();

        let lists = [
            (SourceKind::Vector, vector, self.weights.vector),
            (SourceKind::Keyword, keyword, self.weights.keyword),
        ];

        for (source, list, weight) in lists {
            for (idx, candidate) in list.iter().enumerate() {
                let rank = idx + 1;
                let contribution = self.contribution(rank, weight);

                match scores.entry(candidate.id.as_str()) {
                    Entry::Occupied(mut slot) => {
                        let acc = slot.get_mut();
                        let source_rank = acc.rank_mut(source);
                        if source_rank.is_some() {
                            continue;
                        }
                        *source_rank = Some(rank);
                        acc.score += contribution;
                    }
                    Entry::Vacant(slot) => {
                        let mut acc = Accumulator {
                            candidate,
                            score: contribution,
                            origin: source,
                            vector_rank: None,
                            keyword_rank: None,
                        };
                        *acc.rank_mut(source) = Some(rank);
                        slot.insert(acc);
                    }
                }
            }
        }

        let mut fused: Vec<FusedResult> = scores
            .into_values()
            .map(|acc| FusedResult {
                candidate: acc.candidate.clone(),
                fusion_score: acc.score,
                origin: acc.origin,
                vector_rank: acc.vector_rank,
                keyword_rank: acc.keyword_rank,
            })
            .collect();

        fused.sort_by(|a, b| {
            b.fusion_score
                .total_cmp(&a.fusion_score)
                .then_with(|| a.origin.cmp(&b.origin))
                .then_with(|| a.candidate.id.cmp(&b.candidate.id))
        });
        fused.truncate(limit);

        fused
    }
}

/// Fuse with `k = 60` and unit weights.
pub fn fuse(vector: &[Candidate], keyword: &[Candidate], limit: usize) -> Vec<FusedResult> {
    RrfFusion::default().fuse(vector, keyword, limit)
}

struct Accumulator<'a> {
    candidate: &'a Candidate,
    score: f64,
    origin: SourceKind,
    vector_rank: Option<usize>,
    keyword_rank: Option<usize>,
}

impl Accumulator<'_> {
    fn rank_mut(&mut self, source: SourceKind) -> &mut Option<usize> {
        match source {
            SourceKind::Vector => &mut self.vector_rank,
            SourceKind::Keyword => &mut self.keyword_rank,
        }
    }
}
