//! Non-negative matrix factorization, `X ≈ W·H`, Frobenius loss,
//! multiplicative updates. `X` stays sparse; `W` is docs × k, `H` is k × terms.

use rand::{rngs::StdRng, Rng, SeedableRng};

use super::vectorize::{DocTermMatrix, TermWeighting};
use super::{Factorization, TopicModel};
use crate::error::DecompositionError;

const EPS: f64 = 1e-10;
const CHECK_EVERY: usize = 10;

#[derive(Debug, Clone)]
pub struct Nmf {
    pub max_iter: usize,
    pub tol: f64,
    pub seed: u64,
}

impl Default for Nmf {
    fn default() -> Self {
        Self {
            max_iter: 200,
            tol: 1e-4,
            seed: 42,
        }
    }
}

type Mat = Vec<Vec<f64>>;

fn zeros(r: usize, c: usize) -> Mat {
    vec![vec![0.0; c]; r]
}

/// `Wᵀ·X` (k × m).
fn wt_x(x: &DocTermMatrix, w: &Mat, k: usize, m: usize) -> Mat {
    let mut out = zeros(k, m);
    for (i, row) in x.rows.iter().enumerate() {
        for &(j, v) in row {
            for c in 0..k {
                out[c][j] += w[i][c] * v;
            }
        }
    }
    out
}

/// `X·Hᵀ` (n × k).
fn x_ht(x: &DocTermMatrix, h: &Mat, k: usize) -> Mat {
    x.rows
        .iter()
        .map(|row| {
            let mut acc = vec![0.0; k];
            for &(j, v) in row {
                for c in 0..k {
                    acc[c] += v * h[c][j];
                }
            }
            acc
        })
        .collect()
}

/// `Aᵀ·A` for a tall matrix (k × k).
fn gram_cols(a: &Mat, k: usize) -> Mat {
    let mut out = zeros(k, k);
    for row in a {
        for c in 0..k {
            for d in 0..k {
                out[c][d] += row[c] * row[d];
            }
        }
    }
    out
}

/// `B·Bᵀ` for a wide matrix (k × k).
fn gram_rows(b: &Mat, k: usize) -> Mat {
    let mut out = zeros(k, k);
    for c in 0..k {
        for d in 0..k {
            out[c][d] = b[c].iter().zip(&b[d]).map(|(x, y)| x * y).sum();
        }
    }
    out
}

/// ‖X − WH‖_F via ‖X‖² − 2·tr(Wᵀ X Hᵀ) + tr(WᵀW · HHᵀ).
fn loss(x_sq: f64, w: &Mat, xht: &Mat, wtw: &Mat, hht: &Mat, k: usize) -> f64 {
    let cross: f64 = w
        .iter()
        .zip(xht)
        .map(|(a, b)| a.iter().zip(b).map(|(p, q)| p * q).sum::<f64>())
        .sum();
    let mut quad = 0.0;
    for c in 0..k {
        for d in 0..k {
            quad += wtw[c][d] * hht[c][d];
        }
    }
    (x_sq - 2.0 * cross + quad).max(0.0).sqrt()
}

fn all_finite(m: &Mat) -> bool {
    m.iter().flatten().all(|v| v.is_finite())
}

impl TopicModel for Nmf {
    fn name(&self) -> &'static str {
        "nmf"
    }

    fn weighting(&self) -> TermWeighting {
        TermWeighting::TfIdf
    }

    fn fit(&self, x: &DocTermMatrix, k: usize) -> Result<Factorization, DecompositionError> {
        let (n, m) = (x.n_docs(), x.n_terms());
        if k == 0 || n == 0 || m == 0 {
            return Err(DecompositionError::Degenerate(format!(
                "{n} docs × {m} terms, k = {k}"
            )));
        }
        let mean = x.total() / (n * m) as f64;
        if !(mean > 0.0) || !mean.is_finite() {
            return Err(DecompositionError::Degenerate("matrix has no mass".into()));
        }
        let x_sq: f64 = x.rows.iter().flatten().map(|(_, v)| v * v).sum();

        let scale = (mean / k as f64).sqrt();
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut w: Mat = (0..n)
            .map(|_| (0..k).map(|_| scale * rng.random::<f64>()).collect())
            .collect();
        let mut h: Mat = (0..k)
            .map(|_| (0..m).map(|_| scale * rng.random::<f64>()).collect())
            .collect();

        let mut first_err: Option<f64> = None;
        let mut prev_err = f64::INFINITY;
        let mut converged = false;

        for it in 0..self.max_iter.max(1) {
            // H ← H ∘ (WᵀX) / (WᵀW·H)
            let wtx = wt_x(x, &w, k, m);
            let wtw = gram_cols(&w, k);
            for c in 0..k {
                for j in 0..m {
                    let denom: f64 = (0..k).map(|d| wtw[c][d] * h[d][j]).sum::<f64>() + EPS;
                    h[c][j] *= wtx[c][j] / denom;
                }
            }

            // W ← W ∘ (XHᵀ) / (W·HHᵀ)
            let xht = x_ht(x, &h, k);
            let hht = gram_rows(&h, k);
            for i in 0..n {
                let wi = w[i].clone();
                for c in 0..k {
                    let denom: f64 = (0..k).map(|d| wi[d] * hht[d][c]).sum::<f64>() + EPS;
                    w[i][c] *= xht[i][c] / denom;
                }
            }

            if (it + 1) % CHECK_EVERY == 0 {
                let err = loss(x_sq, &w, &xht, &gram_cols(&w, k), &hht, k);
                if !err.is_finite() {
                    return Err(DecompositionError::NonFinite);
                }
                let base = *first_err.get_or_insert(err);
                if base > 0.0 && (prev_err - err) / base < self.tol {
                    converged = true;
                    break;
                }
                prev_err = err;
            }
        }

        if !all_finite(&w) || !all_finite(&h) {
            return Err(DecompositionError::NonFinite);
        }
        if !converged {
            tracing::debug!(target: "topics", k, max_iter = self.max_iter, "nmf hit iteration limit");
        }

        Ok(Factorization {
            doc_topic: w,
            topic_term: h,
        })
    }
}
