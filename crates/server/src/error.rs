//! Errors surfaced by the recommendation engine.
//!
//! None of these is fatal: each one ends a single request, and callers
//! usually retry with a simpler ranking (cold start).

use data_loader::{DataLoadError, ItemRef};
use sources::SourceError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    /// Malformed or out-of-range rating input; nothing was written
    #[error("Invalid rating: {0}")]
    Validation(String),

    /// The rated item is not in its catalog
    #[error("Unknown item: {0}")]
    UnknownItem(ItemRef),

    /// The interaction matrix is too small for the configured rank
    #[error("Insufficient data: {rows}x{cols} matrix cannot be factored at rank {rank}")]
    InsufficientData {
        rows: usize,
        cols: usize,
        rank: usize,
    },

    /// The dense SVD step failed
    #[error("Factorization failed: {0}")]
    Factorization(String),

    /// A candidate filter failed
    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("Data error: {0}")]
    Data(DataLoadError),

    /// A rating store lock was poisoned by a panicking writer
    #[error("Rating store unavailable: {0}")]
    Poisoned(String),
}

impl From<DataLoadError> for EngineError {
    fn from(err: DataLoadError) -> Self {
        match err {
            DataLoadError::ValidationError(reason) => EngineError::Validation(reason),
            other => EngineError::Data(other),
        }
    }
}

impl From<SourceError> for EngineError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::InsufficientData { rows, cols, rank } => {
                EngineError::InsufficientData { rows, cols, rank }
            }
            SourceError::Factorization(reason) => EngineError::Factorization(reason),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
