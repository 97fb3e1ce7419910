//! Error types for the data-loader crate.
//!
//! Loading errors carry the file and line they came from; validation
//! errors are the ones the engine hands back to callers as rejected writes.

use thiserror::Error;

/// Errors that can occur during data loading, parsing and rating validation
#[derive(Error, Debug)]
pub enum DataLoadError {
    /// File could not be found or opened
    #[error("Failed to open file: {path}")]
    FileNotFound { path: String },

    /// I/O error occurred while reading file
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Row in a data file couldn't be parsed
    ///
    /// This variant stores context about where the error occurred
    #[error("Parse error at line {line} in {file}: {reason}")]
    ParseError {
        file: String,
        line: usize,
        reason: String,
    },

    /// A data field had an invalid value
    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    /// Malformed or out-of-range rating input
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

impl DataLoadError {
    /// Build a `ParseError` from a csv error, keeping the line number when the
    /// csv reader knows it.
    pub(crate) fn from_csv(file: &str, err: csv::Error) -> Self {
        let line = err
            .position()
            .map(|pos| pos.line() as usize)
            .unwrap_or(0);
        DataLoadError::ParseError {
            file: file.to_string(),
            line,
            reason: err.to_string(),
        }
    }
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, DataLoadError>;
