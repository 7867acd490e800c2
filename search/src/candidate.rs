//! Candidate and fused result types.
//!
//! A [`Candidate`] is one chunk as ranked by a single source. Sources rank by
//! position only; raw similarity or BM25 scores never cross the source
//! boundary. A [`FusedResult`] wraps a candidate with its fused score and
//! the rank it held in each source.

use serde::{Deserialize, Serialize};

/// Which candidate source produced a ranking.
///
/// The ordering doubles as fusion tie-break priority: vector first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Vector,
    Keyword,
}

/// A chunk returned by one candidate source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Opaque chunk identifier.
    pub id: String,

    /// Chunk text.
    pub content: String,

    /// Page number in the source document, if known.
    pub page: Option<u32>,

    /// Heading path from the document root down to this chunk.
    pub headings: Vec<String>,

    /// 1-based position in the producing source's ranking.
    pub source_rank: usize,
}

impl Candidate {
    /// Create a candidate with no page or headings.
    pub fn new(id: impl Into<String>, content: impl Into<String>, source_rank: usize) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            page: None,
            headings: Vec::new(),
            source_rank,
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

    /// Headings joined as `A > B > C`, or `General` when there are none.
    pub fn heading_path(&self) -> String {
        if self.headings.is_empty() {
            "General".to_string()
        } else {
            self.headings.join(" > ")
        }
    }
}

/// A candidate after reciprocal rank fusion.
///
/// `fusion_score` is a monotonic rank proxy, not a calibrated confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedResult {
    /// Payload taken from the first source that listed this id.
    pub candidate: Candidate,

    /// Summed weighted reciprocal rank contributions.
    pub fusion_score: f64,

    /// Source that supplied the payload.
    pub origin: SourceKind,

    /// Rank in the vector list, if present there.
    pub vector_rank: Option<usize>,

    /// Rank in the keyword list, if present there.
    pub keyword_rank: Option<usize>,
}

impl FusedResult {
    pub fn id(&self) -> &str {
        &self.candidate.id
    }

    pub fn content(&self) -> &str {
        &self.candidate.content
    }

    /// Whether both sources returned this chunk.
    pub fn found_by_both(&self) -> bool {
        self.vector_rank.is_some() && self.keyword_rank.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn heading_path_defaults_to_general() {
        let c = Candidate::new("c1", "text", 1);
        assert_eq!(c.heading_path(), "General");

        let c = c.with_headings(["Chapter 3", "Malaria", "Danger Signs"]);
        assert_eq!(c.heading_path(), "Chapter 3 > Malaria > Danger Signs");
    }

    #[test]
    fn vector_sorts_before_keyword() {
        assert!(SourceKind::Vector < SourceKind::Keyword);
    }
}
