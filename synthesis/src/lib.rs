//! # Grounded Synthesis
//!
//! Turns fused guideline excerpts into a clinical summary with a generative
//! model ("Brain 2"), then checks the summary with a second guardrail pass.
//!
//! Every failure here is advisory. A generator that is missing, slow or
//! wrong ends one attempt in `Refused` or `Error`, or marks a `Success` as
//! not validated; retrieval results are never affected.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Synthesis Orchestrator                      │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  query + FusedResult[] + HighRiskAlert[]                        │
//! │                  │                                              │
//! │                  ▼                                              │
//! │           synthesis_prompt ──► GeneratorLease ──► deltas        │
//! │                                      │                          │
//! │                                      ▼                          │
//! │                           GuardrailValidator                    │
//! │                                      │                          │
//! │                                      ▼                          │
//! │          Success(summary, guardrail_passed) | Refused | Error   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use clinrag_synthesis::{GeneratorHandle, OllamaConfig, OllamaGenerator, SynthesisOrchestrator};
//!
//! let generator = GeneratorHandle::new(Arc::new(OllamaGenerator::new(OllamaConfig::default())));
//! let orchestrator = SynthesisOrchestrator::new(generator, SynthesisConfig::default());
//!
//! let mut handle = orchestrator.start(query, results, alerts);
//! while let Some(state) = handle.next_state().await {
//!     render(&state);
//! }
//! ```

pub mod config;
pub mod error;
pub mod generator;
pub mod guardrail;
pub mod ollama;
pub mod orchestrator;
pub mod prompts;
pub mod state;

pub use config::{GuardrailConfig, OllamaConfig, SynthesisConfig};
pub use error::{Result, SynthesisError};
pub use generator::{GenerationRequest, Generator, GeneratorHandle, GeneratorLease, TextStream};
pub use guardrail::{Criterion, GuardrailResult, GuardrailValidator, parse_guardrail_response};
pub use ollama::OllamaGenerator;
pub use orchestrator::{SynthesisHandle, SynthesisOrchestrator, SynthesisOutcome};
pub use prompts::{format_alerts, format_context, guardrail_prompt, synthesis_prompt};
pub use state::{CANCELLED, NOT_AVAILABLE, RefusalReason, SynthesisState};
