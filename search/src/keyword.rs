//! In-memory BM25 keyword index.
//!
//! Query terms are OR-ed: a chunk matches if it contains any query token.
//! Tokens are lowercase alphanumeric runs; there is no stemming.

use std::collections::{HashMap, HashSet};

const BM25_K1: f64 = 1.2;
const BM25_B: f64 = 0.75;

/// Split text into lowercase alphanumeric tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Inverted index with BM25 scoring.
#[derive(Debug, Clone, Default)]
pub struct KeywordIndex {
    /// token -> (document slot, term frequency)
    postings: HashMap<String, Vec<(usize, u32)>>,
    doc_ids: Vec<String>,
    doc_lengths: Vec<usize>,
    total_length: usize,
}

impl KeywordIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.doc_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc_ids.is_empty()
    }

    /// Index `text` under `id`.
    pub fn add(&mut self, id: impl Into<String>, text: &str) {
        let slot = self.doc_ids.len();
        let tokens = tokenize(text);

        let mut frequencies: HashMap<String, u32> = HashMap::new();
        for token in &tokens {
            *frequencies.entry(token.clone()).or_default() += 1;
        }
        for (token, tf) in frequencies {
            self.postings.entry(token).or_default().push((slot, tf));
        }

        self.doc_ids.push(id.into());
        self.doc_lengths.push(tokens.len());
        self.total_length += tokens.len();
    }

    /// Return up to `k` `(id, score)` pairs, best first.
    ///
    /// Equal scores are ordered by id.
    pub fn search(&self, query: &str, k: usize) -> Vec<(String, f64)> {
        if self.is_empty() || k == 0 {
            return Vec::new();
        }

        let n = self.doc_ids.len() as f64;
        let avg_len = (self.total_length as f64 / n).max(1.0);
        let mut scores: HashMap<usize, f64> = HashMap::new();
        let mut seen: HashSet<String> = HashSet::new();

        for token in tokenize(query) {
            if !seen.insert(token.clone()) {
                continue;
            }
            let Some(postings) = self.postings.get(&token) else {
                continue;
            };

            let df = postings.len() as f64;
            let idf = (1.0 + (n - df + 0.5) / (df + 0.5)).ln();

            for &(slot, tf) in postings {
                let tf = f64::from(tf);
                let len = self.doc_lengths[slot] as f64;
                let norm = tf + BM25_K1 * (1.0 - BM25_B + BM25_B * len / avg_len);
                *scores.entry(slot).or_default() += idf * tf * (BM25_K1 + 1.0) / norm;
            }
        }

        let mut ranked: Vec<(String, f64)> = scores
            .into_iter()
            .map(|(slot, score)| (self.doc_ids[slot].clone(), score))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(k);
        ranked
    }
}
