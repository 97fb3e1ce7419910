//! Error types for candidate sources.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    /// The matrix cannot support the requested latent rank
    #[error("Insufficient data: {rows}x{cols} matrix cannot be factored at rank {rank}")]
    InsufficientData {
        rows: usize,
        cols: usize,
        rank: usize,
    },

    /// The dense SVD step did not converge
    #[error("Factorization failed: {0}")]
    Factorization(String),
}

pub type Result<T> = std::result::Result<T, SourceError>;
