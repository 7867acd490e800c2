//! # Clinical Pipeline
//!
//! This crate wires the offline clinical pipeline together:
//!
//! - **Brain 1**: Hybrid vector + keyword search over guideline chunks,
//!   fused with reciprocal rank fusion, plus danger-sign detection
//! - **Brain 2**: Grounded synthesis with a guardrail pass (optional)
//! - **Comparison**: Vector-only vs keyword-only vs hybrid runs per query
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       Clinical Pipeline                         │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐           │
//! │  │  Embedding   │  │   Vector     │  │   Keyword    │           │
//! │  │   Provider   │  │   Source     │  │   Source     │           │
//! │  └──────────────┘  └──────────────┘  └──────────────┘           │
//! │         │                │                  │                   │
//! │         └────────────────┼──────────────────┘                   │
//! │                          ▼                                      │
//! │                  ┌──────────────┐      ┌──────────────┐         │
//! │                  │  RRF Fusion  │ ───► │  High-Risk   │         │
//! │                  │   (K = 60)   │      │   Scanner    │         │
//! │                  └──────────────┘      └──────────────┘         │
//! │                          │                                      │
//! │                          ▼                                      │
//! │                  ┌──────────────┐                               │
//! │                  │  Synthesis   │                               │
//! │                  │ + Guardrail  │                               │
//! │                  └──────────────┘                               │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use clinrag_retrieval::{ClinicalPipeline, PipelineConfig};
//!
//! let config = PipelineConfig::from_path("clinrag.toml")?;
//! let pipeline = ClinicalPipeline::from_config(config).await?;
//!
//! let response = pipeline.query("child with fast breathing and chest indrawing").await;
//! for alert in &response.alerts {
//!     println!("{}: {}", alert.severity, alert.term);
//! }
//! ```

pub mod compare;
pub mod config;
pub mod engine;
pub mod error;

pub use compare::{ComparisonSummary, ModeComparison, ModeReport, ModeSummary};
pub use config::{EmbeddingConfig, PipelineConfig};
pub use engine::{
    ClinicalPipeline, ClinicalPipelineBuilder, QueryResponse, SearchResponse, StreamingQuery,
    Timings,
};
pub use error::{Result, RetrievalError};

// Re-export from dependencies for convenience
pub use clinrag_search::{FusedResult, HighRiskAlert, SearchMode, Severity};
pub use clinrag_synthesis::{SynthesisHandle, SynthesisOutcome, SynthesisState};
