//! Randomized truncated SVD for sparse rating matrices.
//!
//! ## Algorithm
//! Halko-Martinsson-Tropp range finder:
//! 1. Sketch the column space: Y = A·Ω with Ω a seeded random n×l matrix,
//!    where l = min(k + oversamples, min(m, n))
//! 2. Orthonormalize: Q = qr(Y).Q, refined by a few power iterations
//! 3. Project: B = Qᵀ·A (l×n, small and dense)
//! 4. Dense SVD of B = Ub·Σ·Vᵀ, then U = Q·Ub
//! 5. Keep the k largest singular values
//!
//! Only A·X and Aᵀ·X products touch the sparse matrix, so it is never
//! densified. Output mirrors scikit-learn's `TruncatedSVD`: user factors
//! are U·Σ and item factors are the rows of V.
//!
//! ## Learning Goals
//! - Interop between `sprs` (sparse) and `nalgebra` (dense)
//! - Deterministic randomness with a seeded `StdRng`

use crate::error::{Result, SourceError};
use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sprs::CsMat;
use tracing::debug;

/// Truncated SVD settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TruncatedSvd {
    /// Latent rank k
    pub rank: usize,
    /// Extra sketch columns beyond k
    pub oversamples: usize,
    /// Power iterations for the range finder
    pub power_iterations: usize,
    /// Seed for the random sketch
    pub seed: u64,
}

impl Default for TruncatedSvd {
    fn default() -> Self {
        Self {
            rank: 20,
            oversamples: 10,
            power_iterations: 5,
            seed: 42,
        }
    }
}

/// Rank-k factors of a user×item matrix
#[derive(Debug, Clone)]
pub struct Factorization {
    /// m×k, row i is user i's latent vector (U·Σ)
    pub user_factors: DMatrix<f64>,
    /// n×k, row j is item j's latent vector (V)
    pub item_factors: DMatrix<f64>,
    /// Descending
    pub singular_values: Vec<f64>,
}

impl Factorization {
    pub fn rank(&self) -> usize {
        self.singular_values.len()
    }

    /// Score every item (column) for one user (row)
    pub fn score_row(&self, row: usize) -> Vec<f64> {
        let user = self.user_factors.row(row).transpose();
        let scores = &self.item_factors * user;
        scores.iter().copied().collect()
    }
}

impl TruncatedSvd {
    pub fn new(rank: usize) -> Self {
        Self {
            rank,
            ..Self::default()
        }
    }

    pub fn with_oversamples(mut self, oversamples: usize) -> Self {
        self.oversamples = oversamples;
        self
    }

    pub fn with_power_iterations(mut self, iterations: usize) -> Self {
        self.power_iterations = iterations;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Factor a CSR matrix.
    ///
    /// Fails with `InsufficientData` when the rank is 0, the matrix has no
    /// entries, or the rank exceeds min(rows, cols). The rank is never
    /// reduced to fit.
    pub fn factor(&self, a: &CsMat<f64>) -> Result<Factorization> {
        let (m, n) = (a.rows(), a.cols());
        let k = self.rank;
        if k == 0 || a.nnz() == 0 || k > m.min(n) {
            return Err(SourceError::InsufficientData {
                rows: m,
                cols: n,
                rank: k,
            });
        }
        let l = (k + self.oversamples).min(m.min(n));

        let mut rng = StdRng::seed_from_u64(self.seed);
        let omega = DMatrix::from_fn(n, l, |_, _| rng.random_range(-1.0..1.0));

        let mut q = sparse_mul(a, &omega).qr().q();
        for _ in 0..self.power_iterations {
            let z = sparse_transpose_mul(a, &q).qr().q();
            q = sparse_mul(a, &z).qr().q();
        }

        // B = Qᵀ·A, computed as (Aᵀ·Q)ᵀ
        let b = sparse_transpose_mul(a, &q).transpose();
        let svd = b
            .try_svd(true, true, f64::EPSILON, 0)
            .ok_or_else(|| SourceError::Factorization("SVD did not converge".to_string()))?;
        let u_b = svd
            .u
            .ok_or_else(|| {
                SourceError::Factorization("missing left singular vectors".to_string())
            })?;
        let v_t = svd
            .v_t
            .ok_or_else(|| {
                SourceError::Factorization("missing right singular vectors".to_string())
            })?;
        let sigma = svd.singular_values;

        let mut order: Vec<usize> = (0..sigma.len()).collect();
        order.sort_by(|&i, &j| sigma[j].total_cmp(&sigma[i]));
        order.truncate(k);

        let u = &q * &u_b;
        let user_factors = DMatrix::from_fn(m, k, |i, c| u[(i, order[c])] * sigma[order[c]]);
        let item_factors = DMatrix::from_fn(n, k, |j, c| v_t[(order[c], j)]);
        let singular_values: Vec<f64> = order.iter().map(|&i| sigma[i]).collect();

        debug!(
            "Factored {}x{} matrix ({} nnz) at rank {} with sketch width {}",
            m,
            n,
            a.nnz(),
            k,
            l
        );

        Ok(Factorization {
            user_factors,
            item_factors,
            singular_values,
        })
    }
}

/// A·D for a CSR matrix A (m×n) and dense D (n×l)
fn sparse_mul(a: &CsMat<f64>, d: &DMatrix<f64>) -> DMatrix<f64> {
    let mut out = DMatrix::zeros(a.rows(), d.ncols());
    for (row, vec) in a.outer_iterator().enumerate() {
        for (col, &val) in vec.iter() {
            for j in 0..d.ncols() {
                out[(row, j)] += val * d[(col, j)];
            }
        }
    }
    out
}

/// Aᵀ·D for a CSR matrix A (m×n) and dense D (m×l)
fn sparse_transpose_mul(a: &CsMat<f64>, d: &DMatrix<f64>) -> DMatrix<f64> {
    let mut out = DMatrix::zeros(a.cols(), d.ncols());
    for (row, vec) in a.outer_iterator().enumerate() {
        for (col, &val) in vec.iter() {
            for j in 0..d.ncols() {
                out[(col, j)] += val * d[(row, j)];
            }
        }
    }
    out
}
