//! Hybrid search: embed, query both sources concurrently, fuse.
//!
//! A failing embedder or source never fails the search. Its list is
//! replaced by an empty one and the other source carries the ranking.

use std::sync::Arc;
use std::time::Instant;

use clinrag_embeddings::EmbeddingProvider;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::candidate::{Candidate, FusedResult};
use crate::config::SearchConfig;
use crate::fusion::RrfFusion;
use crate::source::{KeywordSource, VectorSource};

/// Which sources feed the fused ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    VectorOnly,
    KeywordOnly,
    #[default]
    Hybrid,
}

impl SearchMode {
    pub const ALL: [SearchMode; 3] = [
        SearchMode::VectorOnly,
        SearchMode::KeywordOnly,
        SearchMode::Hybrid,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SearchMode::VectorOnly => "vector_only",
            SearchMode::KeywordOnly => "keyword_only",
            SearchMode::Hybrid => "hybrid",
        }
    }

    fn uses_vector(self) -> bool {
        matches!(self, SearchMode::VectorOnly | SearchMode::Hybrid)
    }

    fn uses_keyword(self) -> bool {
        matches!(self, SearchMode::KeywordOnly | SearchMode::Hybrid)
    }
}

/// Raw per-source lists alongside the fused ranking.
#[derive(Debug, Clone, Default)]
pub struct HybridHits {
    pub vector: Vec<Candidate>,
    pub keyword: Vec<Candidate>,
    pub fused: Vec<FusedResult>,
    pub elapsed_ms: u64,
}

/// Hybrid vector + keyword search over shared candidate sources.
#[derive(Clone)]
pub struct HybridSearch {
    embedder: Arc<dyn EmbeddingProvider>,
    vector: Arc<dyn VectorSource>,
    keyword: Arc<dyn KeywordSource>,
    config: SearchConfig,
    fusion: RrfFusion,
}

impl HybridSearch {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        vector: Arc<dyn VectorSource>,
        keyword: Arc<dyn KeywordSource>,
    ) -> Self {
        Self::with_config(embedder, vector, keyword, SearchConfig::default())
    }

    pub fn with_config(
        embedder: Arc<dyn EmbeddingProvider>,
        vector: Arc<dyn VectorSource>,
        keyword: Arc<dyn KeywordSource>,
        config: SearchConfig,
    ) -> Self {
        let fusion = config.fusion();
        Self {
            embedder,
            vector,
            keyword,
            config,
            fusion,
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Fused hybrid ranking for `query`.
    pub async fn search(&self, query: &str) -> Vec<FusedResult> {
        self.search_mode(query, SearchMode::Hybrid).await.fused
    }

    /// Search using only the sources selected by `mode`.
    #[instrument(level = "debug", skip(self))]
    pub async fn search_mode(&self, query: &str, mode: SearchMode) -> HybridHits {
        let started = Instant::now();
        let candidate_k = self.config.candidate_k;

        let vector_side = async {
            if mode.uses_vector() {
                self.vector_candidates(query, candidate_k).await
            } else {
                Vec::new()
            }
        };
        let keyword_side = async {
            if mode.uses_keyword() {
                self.keyword_candidates(query, candidate_k).await
            } else {
                Vec::new()
            }
        };

        let (vector, keyword) = tokio::join!(vector_side, keyword_side);
        let fused = self.fusion.fuse(&vector, &keyword, self.config.top_k);
        let elapsed_ms = started.elapsed().as_millis() as u64;

        debug!(
            "{} search: {} vector, {} keyword, {} fused in {elapsed_ms}ms",
            mode.as_str(),
            vector.len(),
            keyword.len(),
            fused.len()
        );

        HybridHits {
            vector,
            keyword,
            fused,
            elapsed_ms,
        }
    }

    async fn vector_candidates(&self, query: &str, top_k: usize) -> Vec<Candidate> {
        let embedding = match self.embedder.embed(query).await {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!("Embedding failed, skipping vector search: {e}");
                return Vec::new();
            }
        };

        match self.vector.search_vector(&embedding, top_k).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!("Vector search failed: {e}");
                Vec::new()
            }
        }
    }

    async fn keyword_candidates(&self, query: &str, top_k: usize) -> Vec<Candidate> {
        match self.keyword.search_keyword(query, top_k).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!("Keyword search failed: {e}");
                Vec::new()
            }
        }
    }
}
