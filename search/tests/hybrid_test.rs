//! Integration tests for hybrid search.
//!
//! These tests verify that:
//! - Both sources are fused with RRF into one deterministic ranking
//! - A failing embedder or source degrades to the other source
//! - Search modes select the expected sources
//! - The in-memory corpus works end to end with the scanner

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use clinrag_embeddings::{Embedding, EmbeddingError, EmbeddingProvider};
use clinrag_search::{
    Candidate, GuidelineChunk, GuidelineCorpus, HighRiskScanner, HighRiskTerm, HybridSearch,
    KeywordSource, SearchConfig, SearchError, SearchMode, Severity, SourceKind, VectorSource,
};
use pretty_assertions::assert_eq;

struct FixedEmbedder {
    vector: Embedding,
    fail: bool,
}

impl FixedEmbedder {
    fn new(vector: Embedding) -> Arc<Self> {
        Arc::new(Self {
            vector,
            fail: false,
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            vector: Vec::new(),
            fail: true,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for FixedEmbedder {
    fn name(&self) -> &str {
        "fixed"
    }

    fn dimension(&self) -> usize {
        self.vector.len()
    }

    fn is_ready(&self) -> bool {
        !self.fail
    }

    async fn embed(&self, _text: &str) -> clinrag_embeddings::Result<Embedding> {
        if self.fail {
            return Err(EmbeddingError::NotInitialized);
        }
        Ok(self.vector.clone())
    }
}

/// Returns a fixed ranking from either interface and counts calls.
struct ScriptedSource {
    ids: Vec<&'static str>,
    fail: bool,
    calls: AtomicUsize,
}

impl ScriptedSource {
    fn new(ids: &[&'static str]) -> Arc<Self> {
        Arc::new(Self {
            ids: ids.to_vec(),
            fail: false,
            calls: AtomicUsize::new(0),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            ids: Vec::new(),
            fail: true,
            calls: AtomicUsize::new(0),
        })
    }

    fn ranked(&self, top_k: usize) -> clinrag_search::Result<Vec<Candidate>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(SearchError::Source("index unavailable".to_string()));
        }
        Ok(self
            .ids
            .iter()
            .take(top_k)
            .enumerate()
            .map(|(idx, id)| Candidate::new(*id, format!("passage {id}"), idx + 1))
            .collect())
    }
}

#[async_trait]
impl VectorSource for ScriptedSource {
    async fn search_vector(
        &self,
        _vector: &[f32],
        top_k: usize,
    ) -> clinrag_search::Result<Vec<Candidate>> {
        self.ranked(top_k)
    }
}

#[async_trait]
impl KeywordSource for ScriptedSource {
    async fn search_keyword(
        &self,
        _query: &str,
        top_k: usize,
    ) -> clinrag_search::Result<Vec<Candidate>> {
        self.ranked(top_k)
    }
}

fn ids(results: &[clinrag_search::FusedResult]) -> Vec<&str> {
    results.iter().map(clinrag_search::FusedResult::id).collect()
}

#[tokio::test]
async fn test_snake_bite_fusion_order() {
    let search = HybridSearch::new(
        FixedEmbedder::new(vec![1.0, 0.0]),
        ScriptedSource::new(&["A", "B"]),
        ScriptedSource::new(&["B", "C"]),
    );

    let results = search.search("snake bite").await;
    assert_eq!(ids(&results), vec!["B", "A", "C"]);

    let b = &results[0];
    assert!(b.found_by_both());
    assert!((b.fusion_score - (1.0 / 62.0 + 1.0 / 61.0)).abs() < 1e-12);
    assert_eq!(results[1].origin, SourceKind::Vector);
    assert_eq!(results[2].origin, SourceKind::Keyword);
}

#[tokio::test]
async fn test_failing_keyword_source_degrades_to_vector() {
    let keyword = ScriptedSource::failing();
    let search = HybridSearch::new(
        FixedEmbedder::new(vec![1.0, 0.0]),
        ScriptedSource::new(&["A", "B"]),
        keyword.clone(),
    );

    let results = search.search("fever").await;
    assert_eq!(ids(&results), vec!["A", "B"]);
    assert_eq!(keyword.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failing_embedder_skips_vector_source() {
    let vector = ScriptedSource::new(&["A"]);
    let search = HybridSearch::new(
        FixedEmbedder::failing(),
        vector.clone(),
        ScriptedSource::new(&["K1", "K2"]),
    );

    let results = search.search("fever").await;
    assert_eq!(ids(&results), vec!["K1", "K2"]);
    assert_eq!(vector.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_everything_failing_is_an_empty_ranking() {
    let search = HybridSearch::new(
        FixedEmbedder::failing(),
        ScriptedSource::failing(),
        ScriptedSource::failing(),
    );
    assert!(search.search("fever").await.is_empty());
}

#[tokio::test]
async fn test_search_modes_select_sources() {
    let vector = ScriptedSource::new(&["A", "B"]);
    let keyword = ScriptedSource::new(&["B", "C"]);
    let search = HybridSearch::new(
        FixedEmbedder::new(vec![1.0, 0.0]),
        vector.clone(),
        keyword.clone(),
    );

    let hits = search.search_mode("q", SearchMode::VectorOnly).await;
    assert_eq!(ids(&hits.fused), vec!["A", "B"]);
    assert!(hits.keyword.is_empty());

    let hits = search.search_mode("q", SearchMode::KeywordOnly).await;
    assert_eq!(ids(&hits.fused), vec!["B", "C"]);
    assert!(hits.vector.is_empty());

    assert_eq!(vector.calls.load(Ordering::SeqCst), 1);
    assert_eq!(keyword.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_config_limits_fetch_and_output() {
    let config = SearchConfig::default().with_candidate_k(2).with_top_k(3);
    let search = HybridSearch::with_config(
        FixedEmbedder::new(vec![1.0, 0.0]),
        ScriptedSource::new(&["A", "B", "C", "D"]),
        ScriptedSource::new(&["E", "F", "G"]),
        config,
    );

    let hits = search.search_mode("q", SearchMode::Hybrid).await;
    assert_eq!(hits.vector.len(), 2);
    assert_eq!(hits.keyword.len(), 2);
    assert_eq!(ids(&hits.fused), vec!["A", "E", "B"]);
}

#[tokio::test]
async fn test_corpus_end_to_end_with_alerts() {
    let mut corpus = GuidelineCorpus::new(3);
    corpus
        .add_chunk(
            GuidelineChunk::new(
                "bite-first-aid",
                "Snake bite first aid: immobilise the limb and refer immediately to hospital.",
            )
            .with_page(88)
            .with_headings(["Emergencies", "Snake Bite"]),
            Some(vec![1.0, 0.0, 0.0]),
        )
        .unwrap();
    corpus
        .add_chunk(
            GuidelineChunk::new(
                "bite-danger",
                "Danger signs after a bite include difficulty breathing and bleeding gums.",
            )
            .with_page(89)
            .with_headings(["Emergencies", "Snake Bite", "Danger Signs"]),
            Some(vec![0.8, 0.6, 0.0]),
        )
        .unwrap();
    corpus
        .add_chunk(
            GuidelineChunk::new(
                "diarrhoea",
                "Give oral rehydration salts for diarrhoea with some dehydration present.",
            ),
            Some(vec![0.0, 0.0, 1.0]),
        )
        .unwrap();
    let corpus = Arc::new(corpus);

    let search = HybridSearch::new(
        FixedEmbedder::new(vec![1.0, 0.0, 0.0]),
        corpus.clone(),
        corpus,
    );
    let results = search.search("snake bite").await;

    assert_eq!(results[0].id(), "bite-first-aid");
    assert!(results[0].found_by_both());
    assert_eq!(results[0].candidate.page, Some(88));

    let scanner = HighRiskScanner::new([
        HighRiskTerm::new("refer immediately", "Referral", Severity::High),
        HighRiskTerm::new("difficulty breathing", "Respiratory", Severity::High),
        HighRiskTerm::new("bleeding", "Haemorrhage", Severity::Medium),
    ]);
    let alerts = scanner.detect(&results);
    let terms: Vec<_> = alerts.iter().map(|a| a.term.as_str()).collect();
    assert_eq!(
        terms,
        vec!["difficulty breathing", "refer immediately", "bleeding"]
    );
}
