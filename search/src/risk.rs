//! Deterministic high-risk term detection.
//!
//! The scanner lowercases all retrieved content into one blob and reports
//! every curated term that occurs in it as a plain substring. There is no
//! stemming and no word-boundary check, so "shock" also fires inside
//! "aftershock". Matching must stay at least this permissive.
//!
//! Alerts are ordered HIGH before MEDIUM and alphabetically by term within
//! a tier, regardless of the order of the input results.

use std::cmp::Ordering;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::candidate::FusedResult;
use crate::error::Result;

/// Alert severity. `High` sorts before `Medium`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    #[serde(rename = "HIGH", alias = "High", alias = "high")]
    High,
    #[serde(rename = "MEDIUM", alias = "Medium", alias = "medium")]
    Medium,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the curated term table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighRiskTerm {
    pub term: String,
    pub category: String,
    pub severity: Severity,
}

impl HighRiskTerm {
    pub fn new(term: impl Into<String>, category: impl Into<String>, severity: Severity) -> Self {
        Self {
            term: term.into(),
            category: category.into(),
            severity,
        }
    }
}

/// A term detected in the retrieved content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighRiskAlert {
    pub term: String,
    pub category: String,
    pub severity: Severity,
}

/// Scanner over a term table loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct HighRiskScanner {
    terms: Vec<ScanTerm>,
}

#[derive(Debug, Clone)]
struct ScanTerm {
    needle: String,
    term: HighRiskTerm,
}

impl HighRiskScanner {
    /// Build a scanner from the term table. Blank terms are dropped.
    pub fn new(terms: impl IntoIterator<Item = HighRiskTerm>) -> Self {
        let terms: Vec<ScanTerm> = terms
            .into_iter()
            .filter_map(|term| {
                let needle = term.term.trim().to_lowercase();
                if needle.is_empty() {
                    warn!("Skipping blank high-risk term in category {:?}", term.category);
                    None
                } else {
                    Some(ScanTerm { needle, term })
                }
            })
            .collect();

        info!("High-risk scanner loaded {} terms", terms.len());
        Self { terms }
    }

    /// Load the term table from a JSON array of `{term, category, severity}`.
    pub fn from_json(json: &str) -> Result<Self> {
        let terms: Vec<HighRiskTerm> = serde_json::from_str(json)?;
        Ok(Self::new(terms))
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Detect terms in the content of fused results.
    pub fn detect(&self, results: &[FusedResult]) -> Vec<HighRiskAlert> {
        self.detect_in(results.iter().map(FusedResult::content))
    }

    /// Detect terms in arbitrary content strings.
    pub fn detect_in<'a, I>(&self, contents: I) -> Vec<HighRiskAlert>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let blob = contents
            .into_iter()
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join(" ");

        if blob.is_empty() {
            return Vec::new();
        }

        let mut seen: HashSet<&str> = HashSet::new();
        let mut alerts: Vec<HighRiskAlert> = Vec::new();

        for scan in &self.terms {
            if seen.contains(scan.needle.as_str()) || !blob.contains(&scan.needle) {
                continue;
            }
            seen.insert(scan.needle.as_str());
            alerts.push(HighRiskAlert {
                term: scan.term.term.clone(),
                category: scan.term.category.clone(),
                severity: scan.term.severity,
            });
        }

        alerts.sort_by(compare_alerts);
        debug!("Detected {} high-risk alerts", alerts.len());
        alerts
    }
}

fn compare_alerts(a: &HighRiskAlert, b: &HighRiskAlert) -> Ordering {
    a.severity
        .cmp(&b.severity)
        .then_with(|| a.term.to_lowercase().cmp(&b.term.to_lowercase()))
        .then_with(|| a.term.cmp(&b.term))
}
