//! Configuration for synthesis, the guardrail and the Ollama generator.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default Ollama server address.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Default generative model tag.
pub const DEFAULT_GENERATION_MODEL: &str = "hf.co/unsloth/medgemma-1.5-4b-it-GGUF:Q4_K_M";

/// Settings for the synthesis pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Token limit for the summary.
    pub max_tokens: u32,

    /// Sampling temperature. Kept low for clinical accuracy.
    pub temperature: f32,

    /// Character budget for guideline excerpts in the prompt.
    pub context_chars: usize,

    /// Stream deltas and emit partial text as it arrives.
    pub streaming: bool,

    /// Validate the summary with a second guardrail pass.
    pub run_guardrail: bool,

    /// Minimum interval between partial-text emissions.
    pub min_emit_interval_ms: u64,

    pub guardrail: GuardrailConfig,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            max_tokens: 512,
            temperature: 0.3,
            context_chars: 4000,
            streaming: true,
            run_guardrail: true,
            min_emit_interval_ms: 50,
            guardrail: GuardrailConfig::default(),
        }
    }
}

impl SynthesisConfig {
    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    pub fn with_guardrail(mut self, run_guardrail: bool) -> Self {
        self.run_guardrail = run_guardrail;
        self
    }

    pub fn with_context_chars(mut self, context_chars: usize) -> Self {
        self.context_chars = context_chars;
        self
    }

    pub fn with_min_emit_interval(mut self, interval: Duration) -> Self {
        self.min_emit_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn min_emit_interval(&self) -> Duration {
        Duration::from_millis(self.min_emit_interval_ms)
    }
}

/// Settings for the guardrail pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardrailConfig {
    pub max_tokens: u32,
    pub temperature: f32,

    /// Character budget for guideline excerpts. Never smaller than the
    /// synthesis budget in practice.
    pub context_chars: usize,
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self {
            max_tokens: 300,
            temperature: 0.1,
            context_chars: 4000,
        }
    }
}

/// Connection and sampling settings for an Ollama server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,

    /// Timeout for a whole generate request.
    pub request_timeout_secs: u64,

    /// Timeout for the readiness check.
    pub ready_timeout_secs: u64,

    pub top_p: f32,
    pub repeat_penalty: f32,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            model: DEFAULT_GENERATION_MODEL.to_string(),
            request_timeout_secs: 120,
            ready_timeout_secs: 5,
            top_p: 0.9,
            repeat_penalty: 1.1,
        }
    }
}

impl OllamaConfig {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            ..Self::default()
        }
    }
}
