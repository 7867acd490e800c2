//! In-memory guideline corpus serving both candidate sources.
//!
//! Chunks carry their text, page and heading path. Only `content` chunks
//! are searchable; `metadata` chunks (title pages, tables of contents) are
//! stored but never returned.

use std::collections::HashMap;

use async_trait::async_trait;
use clinrag_embeddings::{Embedding, SimilarityIndex};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::candidate::Candidate;
use crate::config::SearchConfig;
use crate::error::{Result, SearchError};
use crate::keyword::KeywordIndex;
use crate::source::{KeywordSource, VectorSource};

/// Kind of chunk produced by document ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkCategory {
    #[default]
    Content,
    Metadata,
}

/// One chunk of a guideline document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuidelineChunk {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub headings: Vec<String>,
    #[serde(default)]
    pub category: ChunkCategory,
}

impl GuidelineChunk {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            page: None,
            headings: Vec::new(),
            category: ChunkCategory::Content,
        }
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_headings<I, S>(mut self, headings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.headings = headings.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_category(mut self, category: ChunkCategory) -> Self {
        self.category = category;
        self
    }

    fn is_searchable(&self) -> bool {
        self.category == ChunkCategory::Content
    }

    fn to_candidate(&self, source_rank: usize) -> Candidate {
        Candidate {
            id: self.id.clone(),
            content: self.content.clone(),
            page: self.page,
            headings: self.headings.clone(),
            source_rank,
        }
    }
}

/// Chunk store with a vector index and a BM25 keyword index.
#[derive(Debug, Clone)]
pub struct GuidelineCorpus {
    chunks: HashMap<String, GuidelineChunk>,
    vectors: SimilarityIndex,
    keywords: KeywordIndex,
    min_vector_content_chars: usize,
    vector_oversample: usize,
}

impl GuidelineCorpus {
    /// Create an empty corpus for embeddings of `dimension` floats.
    pub fn new(dimension: usize) -> Self {
        let defaults = SearchConfig::default();
        Self {
            chunks: HashMap::new(),
            vectors: SimilarityIndex::new(dimension),
            keywords: KeywordIndex::new(),
            min_vector_content_chars: defaults.min_vector_content_chars,
            vector_oversample: defaults.vector_oversample,
        }
    }

    /// Apply the vector filtering settings from `config`.
    pub fn with_config(mut self, config: &SearchConfig) -> Self {
        self.min_vector_content_chars = config.min_vector_content_chars;
        self.vector_oversample = config.vector_oversample.max(1);
        self
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&GuidelineChunk> {
        self.chunks.get(id)
    }

    /// Add a chunk, optionally with its precomputed embedding.
    ///
    /// Chunks without an embedding are reachable through keyword search only.
    pub fn add_chunk(&mut self, chunk: GuidelineChunk, embedding: Option<Embedding>) -> Result<()> {
        if self.chunks.contains_key(&chunk.id) {
            return Err(SearchError::DuplicateChunk(chunk.id));
        }

        if let Some(embedding) = embedding {
            self.vectors.add(chunk.id.clone(), embedding)?;
        }
        if chunk.is_searchable() {
            self.keywords.add(chunk.id.clone(), &chunk.content);
        }

        debug!("Added chunk {} ({:?})", chunk.id, chunk.category);
        self.chunks.insert(chunk.id.clone(), chunk);
        Ok(())
    }

    /// Load chunks from a JSON array of [`GuidelineChunk`] objects, each
    /// optionally carrying an `embedding` array.
    pub fn load_json(&mut self, json: &str) -> Result<usize> {
        #[derive(Deserialize)]
        struct Row {
            #[serde(flatten)]
            chunk: GuidelineChunk,
            #[serde(default)]
            embedding: Option<Embedding>,
        }

        let rows: Vec<Row> = serde_json::from_str(json)?;
        let count = rows.len();
        for row in rows {
            self.add_chunk(row.chunk, row.embedding)?;
        }

        info!("Loaded {count} guideline chunks");
        Ok(count)
    }

    fn passes_vector_filter(&self, chunk: &GuidelineChunk) -> bool {
        chunk.is_searchable()
            && chunk.content.trim().chars().count() >= self.min_vector_content_chars
    }
}

#[async_trait]
impl VectorSource for GuidelineCorpus {
    async fn search_vector(&self, vector: &[f32], top_k: usize) -> Result<Vec<Candidate>> {
        if top_k == 0 || self.vectors.is_empty() {
            return Ok(Vec::new());
        }

        let fetch = top_k.saturating_mul(self.vector_oversample);
        let raw = self.vectors.search(vector, fetch, f32::MIN)?;

        let candidates: Vec<Candidate> = raw
            .iter()
            .filter_map(|hit| self.chunks.get(&hit.id))
            .filter(|chunk| self.passes_vector_filter(chunk))
            .take(top_k)
            .enumerate()
            .map(|(idx, chunk)| chunk.to_candidate(idx + 1))
            .collect();

        debug!("Vector search: {} raw hits, {} kept", raw.len(), candidates.len());
        Ok(candidates)
    }
}

#[async_trait]
impl KeywordSource for GuidelineCorpus {
    async fn search_keyword(&self, query: &str, top_k: usize) -> Result<Vec<Candidate>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let candidates: Vec<Candidate> = self
            .keywords
            .search(query, top_k)
            .iter()
            .filter_map(|(id, _)| self.chunks.get(id))
            .enumerate()
            .map(|(idx, chunk)| chunk.to_candidate(idx + 1))
            .collect();

        debug!("Keyword search: {} hits", candidates.len());
        Ok(candidates)
    }
}
