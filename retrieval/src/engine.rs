//! Clinical pipeline implementation.

use std::sync::Arc;
use std::time::Instant;

use clinrag_embeddings::{EmbeddingProvider, OllamaEmbeddingProvider};
use clinrag_search::{
    FusedResult, GuidelineCorpus, HighRiskAlert, HighRiskScanner, HybridSearch, KeywordSource,
    SearchMode, VectorSource,
};
use clinrag_synthesis::{
    Generator, GeneratorHandle, OllamaGenerator, SynthesisHandle, SynthesisOrchestrator,
    SynthesisOutcome,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::compare::ModeComparison;
use crate::config::PipelineConfig;
use crate::error::{Result, RetrievalError};

/// Retrieval results for a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<FusedResult>,
    pub alerts: Vec<HighRiskAlert>,
    pub search_ms: u64,
}

/// Wall-clock timings for a full query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timings {
    pub search_ms: u64,

    /// Zero when no synthesis ran.
    pub synthesis_ms: u64,

    pub total_ms: u64,
}

/// Retrieval results plus the synthesis outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub query: String,
    pub results: Vec<FusedResult>,
    pub alerts: Vec<HighRiskAlert>,

    /// `None` when the pipeline has no generator.
    pub synthesis: Option<SynthesisOutcome>,

    pub timings: Timings,
}

/// Retrieval results delivered up front, with synthesis still running.
pub struct StreamingQuery {
    pub search: SearchResponse,

    /// `None` when the pipeline has no generator.
    pub synthesis: Option<SynthesisHandle>,
}

/// Offline clinical pipeline.
///
/// Brain 1 (hybrid search plus the danger-sign scanner) always runs and
/// always returns. Brain 2 (synthesis plus guardrail) is optional and runs
/// only on the fused results Brain 1 produced.
pub struct ClinicalPipeline {
    config: PipelineConfig,
    search: HybridSearch,
    scanner: Arc<HighRiskScanner>,
    synthesis: Option<SynthesisOrchestrator>,
}

impl ClinicalPipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> ClinicalPipelineBuilder {
        ClinicalPipelineBuilder::new()
    }

    /// Assemble a pipeline backed by Ollama and the files named in `config`.
    ///
    /// The corpus file is required. The term table is optional; without it
    /// no alerts are raised.
    pub async fn from_config(config: PipelineConfig) -> Result<Self> {
        info!("Initializing clinical pipeline");

        let corpus_path = config
            .corpus_path
            .clone()
            .ok_or_else(|| RetrievalError::Config("corpus_path is not set".to_string()))?;
        let mut corpus =
            GuidelineCorpus::new(config.embedding.dimension).with_config(&config.search);
        corpus.load_json(&tokio::fs::read_to_string(&corpus_path).await?)?;

        let scanner = match &config.high_risk_terms_path {
            Some(path) => HighRiskScanner::from_json(&tokio::fs::read_to_string(path).await?)?,
            None => {
                warn!("No high-risk term table configured; alerts are disabled");
                HighRiskScanner::default()
            }
        };

        let embedder = OllamaEmbeddingProvider::new(
            config.embedding.base_url.clone(),
            config.embedding.model.clone(),
        )
        .with_dimension(config.embedding.dimension);
        let generator = OllamaGenerator::new(config.generator.clone());

        Self::builder()
            .with_corpus(Arc::new(corpus))
            .with_embedder(Arc::new(embedder))
            .with_scanner(scanner)
            .with_generator(Arc::new(generator))
            .with_config(config)
            .build()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn scanner(&self) -> &HighRiskScanner {
        &self.scanner
    }

    /// Whether synthesis is available at all.
    pub fn has_generator(&self) -> bool {
        self.synthesis.is_some()
    }

    /// Hybrid search and alert detection, without synthesis.
    #[instrument(skip(self))]
    pub async fn search_only(&self, query: &str) -> SearchResponse {
        let started = Instant::now();
        let results = self.search.search(query).await;
        let alerts = self.scanner.detect(&results);
        let search_ms = elapsed_ms(started);

        debug!(
            "Search returned {} results, {} alerts in {search_ms}ms",
            results.len(),
            alerts.len()
        );

        SearchResponse {
            query: query.to_string(),
            results,
            alerts,
            search_ms,
        }
    }

    /// Full pipeline: search, alerts, then synthesis to completion.
    #[instrument(skip(self))]
    pub async fn query(&self, query: &str) -> QueryResponse {
        let started = Instant::now();
        let search = self.search_only(query).await;

        let synthesis_started = Instant::now();
        let synthesis = match &self.synthesis {
            Some(orchestrator) => Some(
                orchestrator
                    .synthesize(query, &search.results, &search.alerts)
                    .await,
            ),
            None => None,
        };
        let synthesis_ms = if synthesis.is_some() {
            elapsed_ms(synthesis_started)
        } else {
            0
        };

        if let Some(outcome) = &synthesis {
            debug!("Synthesis ended in state {}", outcome.state.name());
        }

        QueryResponse {
            query: search.query,
            results: search.results,
            alerts: search.alerts,
            synthesis,
            timings: Timings {
                search_ms: search.search_ms,
                synthesis_ms,
                total_ms: elapsed_ms(started),
            },
        }
    }

    /// Search, then start synthesis in the background.
    ///
    /// Results and alerts are returned immediately; synthesis states are
    /// observed and cancelled through the returned handle.
    pub async fn query_streaming(&self, query: &str) -> StreamingQuery {
        let search = self.search_only(query).await;
        let synthesis = self.synthesis.as_ref().map(|orchestrator| {
            orchestrator.start(query, search.results.clone(), search.alerts.clone())
        });
        StreamingQuery { search, synthesis }
    }

    /// Run `query` through every search mode and compare what each found.
    #[instrument(skip(self))]
    pub async fn compare_modes(&self, query: &str) -> ModeComparison {
        let mut runs = Vec::with_capacity(SearchMode::ALL.len());
        for mode in SearchMode::ALL {
            runs.push((mode, self.search.search_mode(query, mode).await));
        }
        ModeComparison::from_runs(query, &runs, &self.scanner)
    }

    /// [`Self::compare_modes`] over a batch of queries, in order.
    pub async fn compare_batch<S: AsRef<str>>(&self, queries: &[S]) -> Vec<ModeComparison> {
        let mut comparisons = Vec::with_capacity(queries.len());
        for query in queries {
            comparisons.push(self.compare_modes(query.as_ref()).await);
        }
        comparisons
    }
}

/// Builder for the clinical pipeline.
pub struct ClinicalPipelineBuilder {
    config: PipelineConfig,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    vector: Option<Arc<dyn VectorSource>>,
    keyword: Option<Arc<dyn KeywordSource>>,
    scanner: HighRiskScanner,
    generator: Option<GeneratorHandle>,
}

impl ClinicalPipelineBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            embedder: None,
            vector: None,
            keyword: None,
            scanner: HighRiskScanner::default(),
            generator: None,
        }
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the query embedder.
    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_vector_source(mut self, source: Arc<dyn VectorSource>) -> Self {
        self.vector = Some(source);
        self
    }

    pub fn with_keyword_source(mut self, source: Arc<dyn KeywordSource>) -> Self {
        self.keyword = Some(source);
        self
    }

    /// Use one corpus as both the vector and the keyword source.
    pub fn with_corpus(mut self, corpus: Arc<GuidelineCorpus>) -> Self {
        self.vector = Some(corpus.clone());
        self.keyword = Some(corpus);
        self
    }

    pub fn with_scanner(mut self, scanner: HighRiskScanner) -> Self {
        self.scanner = scanner;
        self
    }

    /// Enable synthesis with `generator`.
    pub fn with_generator(self, generator: Arc<dyn Generator>) -> Self {
        self.with_generator_handle(GeneratorHandle::new(generator))
    }

    /// Enable synthesis with a generator shared with other components.
    pub fn with_generator_handle(mut self, generator: GeneratorHandle) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Build the pipeline.
    pub fn build(self) -> Result<ClinicalPipeline> {
        let embedder = self
            .embedder
            .ok_or_else(|| RetrievalError::Config("an embedder is required".to_string()))?;
        let vector = self
            .vector
            .ok_or_else(|| RetrievalError::Config("a vector source is required".to_string()))?;
        let keyword = self
            .keyword
            .ok_or_else(|| RetrievalError::Config("a keyword source is required".to_string()))?;

        let search =
            HybridSearch::with_config(embedder, vector, keyword, self.config.search.clone());
        let synthesis = self
            .generator
            .map(|generator| SynthesisOrchestrator::new(generator, self.config.synthesis.clone()));

        info!(
            "Clinical pipeline ready: {} high-risk terms, synthesis {}",
            self.scanner.len(),
            if synthesis.is_some() { "enabled" } else { "disabled" }
        );

        Ok(ClinicalPipeline {
            config: self.config,
            search,
            scanner: Arc::new(self.scanner),
            synthesis,
        })
    }
}

impl Default for ClinicalPipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}
