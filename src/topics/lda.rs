//! Latent Dirichlet allocation over raw counts, fitted by collapsed Gibbs
//! sampling with symmetric priors `alpha = beta = 1/k`.

use rand::{rngs::StdRng, Rng, SeedableRng};

use super::vectorize::{DocTermMatrix, TermWeighting};
use super::{Factorization, TopicModel};
use crate::error::DecompositionError;

#[derive(Debug, Clone)]
pub struct Lda {
    pub iterations: usize,
    pub seed: u64,
}

impl Default for Lda {
    fn default() -> Self {
        Self {
            iterations: 200,
            seed: 42,
        }
    }
}

impl TopicModel for Lda {
    fn name(&self) -> &'static str {
        "lda"
    }

    fn weighting(&self) -> TermWeighting {
        TermWeighting::Counts
    }

    fn fit(&self, x: &DocTermMatrix, k: usize) -> Result<Factorization, DecompositionError> {
        let (n, m) = (x.n_docs(), x.n_terms());
        if k == 0 || n == 0 || m == 0 {
            return Err(DecompositionError::Degenerate(format!(
                "{n} docs × {m} terms, k = {k}"
            )));
        }
        let alpha = 1.0 / k as f64;
        let beta = 1.0 / k as f64;
        let mut rng = StdRng::seed_from_u64(self.seed);

        // (doc, term) per token occurrence
        let mut tokens: Vec<(usize, usize)> = Vec::new();
        for (d, row) in x.rows.iter().enumerate() {
            for &(t, c) in row {
                for _ in 0..(c.round().max(0.0) as usize) {
                    tokens.push((d, t));
                }
            }
        }
        if tokens.is_empty() {
            return Err(DecompositionError::Degenerate("no tokens".into()));
        }

        let mut n_dk = vec![vec![0usize; k]; n];
        let mut n_kw = vec![vec![0usize; m]; k];
        let mut n_k = vec![0usize; k];
        let mut z: Vec<usize> = Vec::with_capacity(tokens.len());
        for &(d, t) in &tokens {
            let topic = rng.random_range(0..k);
            z.push(topic);
            n_dk[d][topic] += 1;
            n_kw[topic][t] += 1;
            n_k[topic] += 1;
        }

        let vbeta = m as f64 * beta;
        let mut p = vec![0.0f64; k];
        for _ in 0..self.iterations.max(1) {
            for (idx, &(d, t)) in tokens.iter().enumerate() {
                let old = z[idx];
                n_dk[d][old] -= 1;
                n_kw[old][t] -= 1;
                n_k[old] -= 1;

                let mut total = 0.0;
                for topic in 0..k {
                    let w = (n_dk[d][topic] as f64 + alpha) * (n_kw[topic][t] as f64 + beta)
                        / (n_k[topic] as f64 + vbeta);
                    total += w;
                    p[topic] = total;
                }
                if !total.is_finite() || total <= 0.0 {
                    return Err(DecompositionError::NonFinite);
                }

                let u = rng.random::<f64>() * total;
                let new = p.iter().position(|&c| u < c).unwrap_or(k - 1);
                z[idx] = new;
                n_dk[d][new] += 1;
                n_kw[new][t] += 1;
                n_k[new] += 1;
            }
        }

        let doc_topic = n_dk
            .iter()
            .map(|row| {
                let len: usize = row.iter().sum();
                let denom = len as f64 + k as f64 * alpha;
                row.iter().map(|&c| (c as f64 + alpha) / denom).collect()
            })
            .collect();
        let topic_term = n_kw
            .iter()
            .map(|row| row.iter().map(|&c| c as f64 + beta).collect())
            .collect();

        Ok(Factorization {
            doc_topic,
            topic_term,
        })
    }
}
