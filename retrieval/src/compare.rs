//! Search-mode comparison.
//!
//! Runs the same query through vector-only, keyword-only and hybrid search
//! and records what each mode surfaced. Used to check that fusion actually
//! draws on both sources.

use std::collections::HashSet;
use std::fmt::Write as _;

use clinrag_search::{FusedResult, HighRiskScanner, HybridHits, SearchMode};
use serde::{Deserialize, Serialize};

/// Number of leading results compared across modes.
pub const COMPARE_WINDOW: usize = 5;

/// Number of leading results checked for a heading.
const HEADED_WINDOW: usize = 3;

/// Label used when the top result carries no heading.
pub const NO_HEADING: &str = "(no heading)";

/// What one search mode returned for a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeReport {
    pub mode: SearchMode,
    pub result_count: usize,

    /// Last two heading levels of the top result.
    pub top_heading: Option<String>,

    /// Alerts detected in the first [`COMPARE_WINDOW`] results.
    pub alert_count: usize,

    /// Whether any of the first three results carries a heading.
    pub has_headed_results: bool,

    pub latency_ms: u64,
}

impl ModeReport {
    fn new(mode: SearchMode, hits: &HybridHits, scanner: &HighRiskScanner) -> Self {
        let top = window(&hits.fused, COMPARE_WINDOW);
        Self {
            mode,
            result_count: hits.fused.len(),
            top_heading: hits.fused.first().and_then(short_heading),
            alert_count: scanner.detect(top).len(),
            has_headed_results: window(&hits.fused, HEADED_WINDOW)
                .iter()
                .any(|r| !r.candidate.headings.is_empty()),
            latency_ms: hits.elapsed_ms,
        }
    }

    pub fn heading_label(&self) -> &str {
        self.top_heading.as_deref().unwrap_or(NO_HEADING)
    }
}

/// Comparison of all search modes for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeComparison {
    pub query: String,
    pub modes: Vec<ModeReport>,

    /// Ids in the vector-only top five that keyword-only did not return
    /// there.
    pub vector_unique: usize,

    /// Ids in the keyword-only top five that vector-only did not return
    /// there.
    pub keyword_unique: usize,

    /// Whether the hybrid top five shares at least one id with each
    /// single-source top five.
    pub hybrid_diverse: bool,
}

impl ModeComparison {
    /// Build a comparison from one run per mode. Modes without a run count
    /// as having returned nothing.
    pub fn from_runs(
        query: impl Into<String>,
        runs: &[(SearchMode, HybridHits)],
        scanner: &HighRiskScanner,
    ) -> Self {
        let vector_ids = top_ids(runs, SearchMode::VectorOnly);
        let keyword_ids = top_ids(runs, SearchMode::KeywordOnly);
        let hybrid_ids = top_ids(runs, SearchMode::Hybrid);

        let hybrid_diverse = !hybrid_ids.is_disjoint(&vector_ids)
            && !hybrid_ids.is_disjoint(&keyword_ids);

        Self {
            query: query.into(),
            modes: runs
                .iter()
                .map(|(mode, hits)| ModeReport::new(*mode, hits, scanner))
                .collect(),
            vector_unique: vector_ids.difference(&keyword_ids).count(),
            keyword_unique: keyword_ids.difference(&vector_ids).count(),
            hybrid_diverse,
        }
    }

    pub fn mode(&self, mode: SearchMode) -> Option<&ModeReport> {
        self.modes.iter().find(|r| r.mode == mode)
    }
}

/// Per-mode aggregate over a batch of comparisons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeSummary {
    pub mode: SearchMode,
    pub avg_latency_ms: f64,

    /// Queries whose first three results include a headed chunk.
    pub queries_with_headings: usize,
}

/// Aggregate over a batch of comparisons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonSummary {
    pub queries_evaluated: usize,

    /// Queries where hybrid drew from both sources.
    pub diverse_count: usize,

    pub modes: Vec<ModeSummary>,
}

impl ComparisonSummary {
    pub fn from_comparisons(comparisons: &[ModeComparison]) -> Self {
        let total = comparisons.len();
        let modes = SearchMode::ALL
            .into_iter()
            .map(|mode| {
                let reports: Vec<&ModeReport> =
                    comparisons.iter().filter_map(|c| c.mode(mode)).collect();
                let avg_latency_ms = if reports.is_empty() {
                    0.0
                } else {
                    reports.iter().map(|r| r.latency_ms as f64).sum::<f64>() / reports.len() as f64
                };
                ModeSummary {
                    mode,
                    avg_latency_ms,
                    queries_with_headings: reports.iter().filter(|r| r.has_headed_results).count(),
                }
            })
            .collect();

        Self {
            queries_evaluated: total,
            diverse_count: comparisons.iter().filter(|c| c.hybrid_diverse).count(),
            modes,
        }
    }

    /// Percentage of queries where hybrid drew from both sources, rounded
    /// down.
    pub fn diverse_percent(&self) -> usize {
        if self.queries_evaluated == 0 {
            0
        } else {
            self.diverse_count * 100 / self.queries_evaluated
        }
    }

    pub fn mode(&self, mode: SearchMode) -> Option<&ModeSummary> {
        self.modes.iter().find(|m| m.mode == mode)
    }

    /// Render the batch as a markdown report: one summary table and one row
    /// per query.
    pub fn to_markdown(&self, comparisons: &[ModeComparison]) -> String {
        let mut out = String::from("# Search Mode Comparison\n\n");
        let _ = writeln!(out, "| Metric | Vector | Keyword | Hybrid |");
        let _ = writeln!(out, "|---|---|---|---|");

        let cell = |mode: SearchMode, f: &dyn Fn(&ModeSummary) -> String| {
            self.mode(mode).map(f).unwrap_or_else(|| "-".to_string())
        };
        let latency = |m: &ModeSummary| format!("{:.0}ms", m.avg_latency_ms);
        let headed = |m: &ModeSummary| {
            format!("{}/{}", m.queries_with_headings, self.queries_evaluated)
        };
        let _ = writeln!(
            out,
            "| Avg latency | {} | {} | {} |",
            cell(SearchMode::VectorOnly, &latency),
            cell(SearchMode::KeywordOnly, &latency),
            cell(SearchMode::Hybrid, &latency),
        );
        let _ = writeln!(
            out,
            "| Queries with headed top-3 | {} | {} | {} |",
            cell(SearchMode::VectorOnly, &headed),
            cell(SearchMode::KeywordOnly, &headed),
            cell(SearchMode::Hybrid, &headed),
        );
        let _ = writeln!(
            out,
            "| Hybrid draws from both sources | - | - | {}/{} ({}%) |",
            self.diverse_count,
            self.queries_evaluated,
            self.diverse_percent()
        );

        out.push_str("\n## Per-query results\n\n");
        let _ = writeln!(
            out,
            "| # | Query | Vector top | Keyword top | Hybrid top | Alerts (V/K/H) | Diverse |"
        );
        let _ = writeln!(out, "|---|---|---|---|---|---|---|");
        for (i, comparison) in comparisons.iter().enumerate() {
            let heading = |mode| {
                comparison
                    .mode(mode)
                    .map_or(NO_HEADING, ModeReport::heading_label)
                    .chars()
                    .take(30)
                    .collect::<String>()
            };
            let alerts = |mode| comparison.mode(mode).map_or(0, |r| r.alert_count);
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} | {} | {}/{}/{} | {} |",
                i + 1,
                comparison.query,
                heading(SearchMode::VectorOnly),
                heading(SearchMode::KeywordOnly),
                heading(SearchMode::Hybrid),
                alerts(SearchMode::VectorOnly),
                alerts(SearchMode::KeywordOnly),
                alerts(SearchMode::Hybrid),
                if comparison.hybrid_diverse { "Yes" } else { "No" },
            );
        }
        out
    }
}

fn window(results: &[FusedResult], n: usize) -> &[FusedResult] {
    &results[..results.len().min(n)]
}

fn top_ids(runs: &[(SearchMode, HybridHits)], mode: SearchMode) -> HashSet<&str> {
    runs.iter()
        .find(|(m, _)| *m == mode)
        .map(|(_, hits)| window(&hits.fused, COMPARE_WINDOW))
        .unwrap_or_default()
        .iter()
        .map(FusedResult::id)
        .collect()
}

fn short_heading(result: &FusedResult) -> Option<String> {
    let headings = &result.candidate.headings;
    if headings.is_empty() {
        return None;
    }
    let start = headings.len().saturating_sub(2);
    Some(headings[start..].join(" > "))
}
