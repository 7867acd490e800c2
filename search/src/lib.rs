//! # Guideline Search
//!
//! Hybrid retrieval over a clinical guideline corpus ("Brain 1").
//!
//! ## Features
//!
//! - **Candidate Sources**: Vector and keyword lookups behind async traits
//! - **Rank Fusion**: Reciprocal Rank Fusion with per-source weights
//! - **High-Risk Scanner**: Deterministic danger-sign detection over results
//! - **Guideline Corpus**: In-memory chunk store implementing both sources
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Hybrid Search                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  query ──► EmbeddingProvider ──► VectorSource ──┐               │
//! │    │                                            ├──► RrfFusion  │
//! │    └──────────────────────────► KeywordSource ──┘       │       │
//! │                                                         ▼       │
//! │                                         HighRiskScanner         │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use clinrag_search::{HybridSearch, HighRiskScanner};
//!
//! let search = HybridSearch::new(embedder, corpus.clone(), corpus);
//! let results = search.search("snake bite first aid").await;
//! let alerts = scanner.detect(&results);
//! ```

pub mod candidate;
pub mod config;
pub mod corpus;
pub mod error;
pub mod fusion;
pub mod hybrid;
pub mod keyword;
pub mod risk;
pub mod source;

pub use candidate::{Candidate, FusedResult, SourceKind};
pub use config::SearchConfig;
pub use corpus::{ChunkCategory, GuidelineChunk, GuidelineCorpus};
pub use error::{Result, SearchError};
pub use fusion::{DEFAULT_RRF_K, FusionWeights, RrfFusion, fuse};
pub use hybrid::{HybridHits, HybridSearch, SearchMode};
pub use keyword::KeywordIndex;
pub use risk::{HighRiskAlert, HighRiskScanner, HighRiskTerm, Severity};
pub use source::{KeywordSource, VectorSource};
