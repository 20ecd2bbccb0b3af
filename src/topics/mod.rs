//! # Topics
//! Unsupervised topic extraction over normalized tweet text.
//!
//! Pipeline: drop empty documents → short-circuit below `min_documents` →
//! vectorize (stopwords, `min_df`, `max_df`) → clamp `k` to the document
//! count → fit a `TopicModel` (retrying once with a single topic on failure)
//! → rank each topic's term weights → hard-assign each document to its
//! heaviest topic.
//!
//! The assignment is descriptive; a tweet's topic is only its strongest
//! weight in a soft model.

pub mod lda;
pub mod nmf;
pub mod stopwords;
pub mod vectorize;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::DecompositionError;
use vectorize::{vectorize, DocTermMatrix, TermWeighting, VectorizerSettings};

/// Fewer non-empty documents than this yields no topics.
pub const MIN_DOCUMENTS: usize = 5;

/// Soft model output: `doc_topic` is docs × k, `topic_term` is k × terms.
#[derive(Debug, Clone)]
pub struct Factorization {
    pub doc_topic: Vec<Vec<f64>>,
    pub topic_term: Vec<Vec<f64>>,
}

/// A decomposition backend. Implementations must be deterministic for a
/// given input (seeded randomness only).
pub trait TopicModel: Send + Sync {
    fn name(&self) -> &'static str;
    /// Cell values the model expects in its input matrix.
    fn weighting(&self) -> TermWeighting;
    fn fit(&self, x: &DocTermMatrix, k: usize) -> Result<Factorization, DecompositionError>;
}

/// Configurable backend choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicBackend {
    /// NMF over tf-idf.
    #[default]
    Nmf,
    /// LDA over raw counts.
    Lda,
}

impl TopicBackend {
    pub fn model(&self, max_iter: usize, seed: u64) -> Box<dyn TopicModel> {
        match self {
            TopicBackend::Nmf => Box::new(nmf::Nmf {
                max_iter,
                seed,
                ..Default::default()
            }),
            TopicBackend::Lda => Box::new(lda::Lda {
                iterations: max_iter,
                seed,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub index: usize,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TopicStatus {
    Extracted,
    /// The requested count failed; one topic was fitted instead.
    SingleTopicFallback,
    InsufficientDocuments,
    EmptyVocabulary,
    DecompositionFailed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicSummary {
    pub backend: String,
    pub status: TopicStatus,
    pub topics: Vec<Topic>,
    /// Aligned with the input documents; `None` for empty documents or
    /// when no topics were produced.
    pub assignments: Vec<Option<usize>>,
}

impl TopicSummary {
    pub fn empty(backend: &str, status: TopicStatus, n_docs: usize) -> Self {
        Self {
            backend: backend.to_string(),
            status,
            topics: Vec::new(),
            assignments: vec![None; n_docs],
        }
    }
}

pub struct TopicExtractor {
    model: Box<dyn TopicModel>,
    pub min_documents: usize,
    pub vectorizer: VectorizerSettings,
}

impl TopicExtractor {
    pub fn new(model: Box<dyn TopicModel>) -> Self {
        Self {
            model,
            min_documents: MIN_DOCUMENTS,
            vectorizer: VectorizerSettings::default(),
        }
    }

    pub fn with_settings(
        model: Box<dyn TopicModel>,
        min_documents: usize,
        vectorizer: VectorizerSettings,
    ) -> Self {
        Self {
            model,
            min_documents,
            vectorizer,
        }
    }

    pub fn backend(&self) -> &'static str {
        self.model.name()
    }

    /// Extract up to `k` topics with `keywords` terms each.
    ///
    /// Thin input is not an error: it comes back as an empty summary with a
    /// status. `Err` only when the single-topic retry fails as well.
    pub fn extract(
        &self,
        docs: &[String],
        k: usize,
        keywords: usize,
    ) -> Result<TopicSummary, DecompositionError> {
        let backend = self.model.name();
        let kept: Vec<(usize, &str)> = docs
            .iter()
            .enumerate()
            .filter(|(_, d)| !d.trim().is_empty())
            .map(|(i, d)| (i, d.as_str()))
            .collect();

        if kept.len() < self.min_documents.max(1) {
            debug!(target: "topics", docs = kept.len(), "too few documents for topics");
            return Ok(TopicSummary::empty(
                backend,
                TopicStatus::InsufficientDocuments,
                docs.len(),
            ));
        }

        let texts: Vec<&str> = kept.iter().map(|(_, d)| *d).collect();
        let x = vectorize(&texts, self.model.weighting(), &self.vectorizer);
        if x.n_terms() == 0 {
            debug!(target: "topics", docs = kept.len(), "empty vocabulary");
            return Ok(TopicSummary::empty(
                backend,
                TopicStatus::EmptyVocabulary,
                docs.len(),
            ));
        }

        let k = k.clamp(1, kept.len());
        let (fit, status) = match self.model.fit(&x, k) {
            Ok(f) => (f, TopicStatus::Extracted),
            Err(e) if k > 1 => {
                warn!(target: "topics", backend, k, error = %e, "decomposition failed, retrying with one topic");
                (self.model.fit(&x, 1)?, TopicStatus::SingleTopicFallback)
            }
            Err(e) => return Err(e),
        };

        let topics = fit
            .topic_term
            .iter()
            .enumerate()
            .map(|(index, weights)| Topic {
                index,
                keywords: top_terms(weights, &x.vocabulary, keywords),
            })
            .collect();

        let mut assignments = vec![None; docs.len()];
        for ((orig, _), row) in kept.iter().zip(&fit.doc_topic) {
            assignments[*orig] = argmax(row);
        }

        Ok(TopicSummary {
            backend: backend.to_string(),
            status,
            topics,
            assignments,
        })
    }
}

/// Top `n` terms by weight, descending; ties by column (alphabetical) order.
fn top_terms(weights: &[f64], vocabulary: &[String], n: usize) -> Vec<String> {
    let mut idx: Vec<usize> = (0..weights.len().min(vocabulary.len())).collect();
    idx.sort_by(|&a, &b| weights[b].total_cmp(&weights[a]).then(a.cmp(&b)));
    idx.into_iter()
        .take(n)
        .map(|i| vocabulary[i].clone())
        .collect()
}

/// First index of the maximum weight.
fn argmax(row: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in row.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_terms_breaks_ties_alphabetically() {
        let vocab: Vec<String> = ["alpha", "beta", "gamma"].iter().map(|s| s.to_string()).collect();
        assert_eq!(top_terms(&[0.5, 0.9, 0.5], &vocab, 2), vec!["beta", "alpha"]);
        assert_eq!(top_terms(&[0.5, 0.9, 0.5], &vocab, 10).len(), 3);
    }

    #[test]
    fn argmax_prefers_first_maximum() {
        assert_eq!(argmax(&[0.1, 0.7, 0.7]), Some(1));
        assert_eq!(argmax(&[]), None);
    }
}
