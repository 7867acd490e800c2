//! Guardrail validation: a second generation pass that critiques a summary
//! against the guideline excerpts it was generated from.
//!
//! The validator is fail-open. If the generator is unavailable or faults,
//! the result is `passed = true` with a reason saying why validation did
//! not happen, so an existing summary is never hidden by a validator error.

use std::collections::BTreeMap;

use clinrag_search::FusedResult;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::GuardrailConfig;
use crate::generator::{GenerationRequest, Generator, GeneratorHandle};
use crate::prompts::guardrail_prompt;

/// The fixed validation criteria.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Criterion {
    Grounding,
    Accuracy,
    Completeness,
    NoFabrication,
    AppropriateScope,
}

impl Criterion {
    pub const ALL: [Criterion; 5] = [
        Criterion::Grounding,
        Criterion::Accuracy,
        Criterion::Completeness,
        Criterion::NoFabrication,
        Criterion::AppropriateScope,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Criterion::Grounding => "GROUNDING",
            Criterion::Accuracy => "ACCURACY",
            Criterion::Completeness => "COMPLETENESS",
            Criterion::NoFabrication => "NO_FABRICATION",
            Criterion::AppropriateScope => "APPROPRIATE_SCOPE",
        }
    }

    fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == label)
    }
}

impl std::fmt::Display for Criterion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a guardrail pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardrailResult {
    pub passed: bool,
    pub reason: Option<String>,

    /// Verdict per criterion. Criteria without a line in the response are
    /// absent.
    pub criteria: BTreeMap<Criterion, bool>,

    pub raw_response: String,
}

impl GuardrailResult {
    fn fail_open(reason: String) -> Self {
        Self {
            passed: true,
            reason: Some(reason),
            criteria: BTreeMap::new(),
            raw_response: String::new(),
        }
    }

    /// Whether the verdict came from an actual validation pass.
    pub fn was_validated(&self) -> bool {
        !self.raw_response.is_empty()
    }
}

/// Parse a guardrail response.
///
/// Each line of the form `LABEL: verdict ...` is read; `=` and a spaced
/// ` - ` also separate label from verdict. Labels are
/// uppercased with list numbering and markdown markers stripped, and spaces
/// or hyphens become underscores. A verdict is PASS only when its first
/// token is exactly `PASS` ignoring case. The first line for a label wins.
/// `passed` comes from the `OVERALL` line alone and is false when there is
/// none.
pub fn parse_guardrail_response(raw: &str) -> GuardrailResult {
    let mut criteria = BTreeMap::new();
    let mut overall: Option<bool> = None;
    let mut reason: Option<String> = None;

    for line in raw.lines() {
        let Some((label, rest)) = split_label(line) else {
            continue;
        };

        match normalize_label(label).as_str() {
            "OVERALL" => {
                overall.get_or_insert_with(|| is_pass(rest));
            }
            "REASON" => {
                let text = rest.trim();
                if reason.is_none() && !text.is_empty() {
                    reason = Some(text.to_string());
                }
            }
            other => {
                if let Some(criterion) = Criterion::from_label(other) {
                    criteria.entry(criterion).or_insert_with(|| is_pass(rest));
                }
            }
        }
    }

    GuardrailResult {
        passed: overall.unwrap_or(false),
        reason,
        criteria,
        raw_response: raw.to_string(),
    }
}

fn split_label(line: &str) -> Option<(&str, &str)> {
    match line.find([':', '=']) {
        Some(at) => Some((&line[..at], &line[at + 1..])),
        None => line.split_once(" - "),
    }
}

fn normalize_label(label: &str) -> String {
    label
        .trim()
        .trim_start_matches(|c: char| c.is_ascii_digit() || c == '.' || c == ')')
        .trim_matches(|c: char| c.is_whitespace() || matches!(c, '*' | '#' | '-' | '_'))
        .to_uppercase()
        .replace([' ', '-'], "_")
}

fn is_pass(verdict: &str) -> bool {
    verdict
        .split_whitespace()
        .next()
        .map(|token| {
            token.trim_matches(|c: char| {
                matches!(c, '[' | ']' | '*' | '(' | ')' | '.' | ',' | ';' | ':' | '-')
            })
        })
        .is_some_and(|token| token.eq_ignore_ascii_case("PASS"))
}

/// Runs the guardrail pass on a shared generator.
#[derive(Debug, Clone)]
pub struct GuardrailValidator {
    generator: GeneratorHandle,
    config: GuardrailConfig,
}

impl GuardrailValidator {
    pub fn new(generator: GeneratorHandle, config: GuardrailConfig) -> Self {
        Self { generator, config }
    }

    pub fn config(&self) -> &GuardrailConfig {
        &self.config
    }

    /// Validate `summary` against `sources`, waiting for exclusive use of
    /// the generator.
    pub async fn validate(
        &self,
        query: &str,
        summary: &str,
        sources: &[FusedResult],
    ) -> GuardrailResult {
        let lease = self.generator.lease().await;
        self.validate_on(&*lease, query, summary, sources).await
    }

    /// Validate using a generator the caller already holds exclusively.
    pub async fn validate_on(
        &self,
        generator: &dyn Generator,
        query: &str,
        summary: &str,
        sources: &[FusedResult],
    ) -> GuardrailResult {
        if !generator.is_ready().await {
            warn!("Guardrail skipped: generator not available");
            return GuardrailResult::fail_open(
                "guardrail skipped: generator not available".to_string(),
            );
        }

        let prompt = guardrail_prompt(query, summary, sources, self.config.context_chars);
        let request =
            GenerationRequest::new(prompt, self.config.max_tokens, self.config.temperature);

        match generator.generate(&request).await {
            Ok(response) => {
                let result = parse_guardrail_response(&response);
                debug!(
                    "Guardrail verdict: passed={}, {} criteria",
                    result.passed,
                    result.criteria.len()
                );
                result
            }
            Err(e) => {
                warn!("Guardrail errored, failing open: {e}");
                GuardrailResult::fail_open(format!("guardrail errored: {e}"))
            }
        }
    }
}
