//! TF-IDF matching of free text against the known condition labels.
//!
//! Follows scikit-learn's `TfidfVectorizer` defaults: lowercase, tokens of two
//! or more word characters, smoothed idf `ln((1 + n) / (1 + df)) + 1`, L2
//! normalized rows. Rows with identical condition text score identically, so
//! only distinct conditions are scored, kept in first-appearance order.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

fn token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\w\w+\b").expect("valid token regex"))
}

pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    token_re()
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

type SparseVec = Vec<(usize, f64)>;

#[derive(Debug, Clone, Default)]
pub struct TfidfIndex {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    conditions: Vec<(String, SparseVec)>,
}

impl TfidfIndex {
    /// `documents` is one entry per dataset row, in row order.
    pub fn fit<'a>(documents: impl IntoIterator<Item = &'a str>) -> Self {
        let mut row_count = 0usize;
        let mut distinct: Vec<(String, usize)> = Vec::new();
        let mut position: HashMap<&'a str, usize> = HashMap::new();

        for doc in documents {
            row_count += 1;
            match position.get(doc) {
                Some(&i) => distinct[i].1 += 1,
                None => {
                    position.insert(doc, distinct.len());
                    distinct.push((doc.to_string(), 1));
                }
            }
        }

        let mut vocabulary: HashMap<String, usize> = HashMap::new();
        let mut doc_freq: Vec<usize> = Vec::new();
        let tokenized: Vec<Vec<String>> = distinct.iter().map(|(text, _)| tokenize(text)).collect();

        for (tokens, (_, rows)) in tokenized.iter().zip(distinct.iter()) {
            let mut seen: Vec<usize> = Vec::new();
            for token in tokens {
                let next = vocabulary.len();
                let id = *vocabulary.entry(token.clone()).or_insert(next);
                if id == doc_freq.len() {
                    doc_freq.push(0);
                }
                if !seen.contains(&id) {
                    seen.push(id);
                    doc_freq[id] += rows;
                }
            }
        }

        let n = row_count as f64;
        let idf: Vec<f64> = doc_freq
            .iter()
            .map(|df| ((1.0 + n) / (1.0 + *df as f64)).ln() + 1.0)
            .collect();

        let conditions = distinct
            .into_iter()
            .zip(tokenized)
            .map(|((text, _), tokens)| {
                let vector = weigh(tokens.iter().filter_map(|t| vocabulary.get(t).copied()), &idf);
                (text, vector)
            })
            .collect();

        Self {
            vocabulary,
            idf,
            conditions,
        }
    }

    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }

    /// Best matching condition, or `None` when the query shares no term with
    /// any condition.
    pub fn best_match(&self, query: &str) -> Option<(&str, f64)> {
        let ids = tokenize(query)
            .into_iter()
            .filter_map(|t| self.vocabulary.get(&t).copied());
        let query_vec = weigh(ids, &self.idf);
        if query_vec.is_empty() {
            return None;
        }
        let query_map: HashMap<usize, f64> = query_vec.into_iter().collect();

        let mut best: Option<(&str, f64)> = None;
        for (text, vector) in &self.conditions {
            let score: f64 = vector
                .iter()
                .filter_map(|(id, w)| query_map.get(id).map(|q| q * w))
                .sum();
            if score > best.map_or(0.0, |(_, s)| s) {
                best = Some((text.as_str(), score));
            }
        }
        best
    }
}

/// Term counts × idf, L2 normalized.
fn weigh(ids: impl Iterator<Item = usize>, idf: &[f64]) -> SparseVec {
    let mut counts: HashMap<usize, f64> = HashMap::new();
    for id in ids {
        *counts.entry(id).or_insert(0.0) += 1.0;
    }
    let mut vector: SparseVec = counts
        .into_iter()
        .map(|(id, tf)| (id, tf * idf[id]))
        .collect();
    let norm = vector.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
    if norm > 0.0 {
        for (_, w) in vector.iter_mut() {
            *w /= norm;
        }
    }
    vector.sort_by_key(|(id, _)| *id);
    vector
}
