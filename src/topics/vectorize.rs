//! Document-term matrix construction.
//!
//! Tokens are runs of two or more word characters, lowercased. Stopwords are
//! dropped before counting. Terms outside `[min_df, max_df * n_docs]`
//! document frequency are pruned. The vocabulary is sorted so that column
//! order (and therefore tie-breaking downstream) is deterministic.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::stopwords::is_stopword;

static RE_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w\w+\b").expect("token regex"));

/// Cell values of the matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermWeighting {
    /// Smoothed tf-idf with L2-normalized rows.
    TfIdf,
    /// Raw term counts.
    Counts,
}

#[derive(Debug, Clone)]
pub struct VectorizerSettings {
    pub min_df: usize,
    /// Upper document-frequency bound as a share of documents; `None` disables it.
    pub max_df: Option<f64>,
    pub extra_stopwords: Vec<String>,
}

impl Default for VectorizerSettings {
    fn default() -> Self {
        Self {
            min_df: 2,
            max_df: Some(0.9),
            extra_stopwords: Vec::new(),
        }
    }
}

/// Sparse rows: one `(column, value)` list per document.
#[derive(Debug, Clone, Default)]
pub struct DocTermMatrix {
    pub rows: Vec<Vec<(usize, f64)>>,
    pub vocabulary: Vec<String>,
}

impl DocTermMatrix {
    pub fn n_docs(&self) -> usize {
        self.rows.len()
    }

    pub fn n_terms(&self) -> usize {
        self.vocabulary.len()
    }

    /// Sum of all cell values.
    pub fn total(&self) -> f64 {
        self.rows.iter().flatten().map(|(_, v)| *v).sum()
    }
}

pub fn tokenize(text: &str) -> Vec<String> {
    RE_TOKEN
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

pub fn vectorize(
    docs: &[&str],
    weighting: TermWeighting,
    settings: &VectorizerSettings,
) -> DocTermMatrix {
    let extra: HashSet<String> = settings
        .extra_stopwords
        .iter()
        .map(|s| s.trim().to_lowercase())
        .collect();

    let counted: Vec<BTreeMap<String, usize>> = docs
        .iter()
        .map(|d| {
            let mut m = BTreeMap::new();
            for tok in tokenize(d) {
                if is_stopword(&tok) || extra.contains(&tok) {
                    continue;
                }
                *m.entry(tok).or_insert(0) += 1;
            }
            m
        })
        .collect();

    let n = docs.len();
    let mut df: BTreeMap<&str, usize> = BTreeMap::new();
    for m in &counted {
        for term in m.keys() {
            *df.entry(term.as_str()).or_insert(0) += 1;
        }
    }

    let max_docs = match settings.max_df {
        Some(share) if share > 0.0 && share <= 1.0 => share * n as f64,
        _ => f64::INFINITY,
    };
    let kept: BTreeSet<&str> = df
        .iter()
        .filter(|(_, &c)| c >= settings.min_df.max(1) && (c as f64) <= max_docs)
        .map(|(t, _)| *t)
        .collect();

    let vocabulary: Vec<String> = kept.iter().map(|t| t.to_string()).collect();
    if vocabulary.is_empty() {
        return DocTermMatrix {
            rows: vec![Vec::new(); n],
            vocabulary,
        };
    }
    let column: BTreeMap<&str, usize> = kept.iter().enumerate().map(|(i, t)| (*t, i)).collect();

    let idf: Vec<f64> = vocabulary
        .iter()
        .map(|t| {
            let d = df.get(t.as_str()).copied().unwrap_or(0) as f64;
            ((1.0 + n as f64) / (1.0 + d)).ln() + 1.0
        })
        .collect();

    let rows = counted
        .iter()
        .map(|m| {
            let mut row: Vec<(usize, f64)> = m
                .iter()
                .filter_map(|(t, &c)| column.get(t.as_str()).map(|&j| (j, c as f64)))
                .collect();
            if weighting == TermWeighting::TfIdf {
                for (j, v) in row.iter_mut() {
                    *v *= idf[*j];
                }
                let norm = row.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
                if norm > 0.0 {
                    for (_, v) in row.iter_mut() {
                        *v /= norm;
                    }
                }
            }
            row
        })
        .collect();

    DocTermMatrix { rows, vocabulary }
}
