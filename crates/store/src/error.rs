//! Error types for the store crate.

use cutflow::FilterError;
use thiserror::Error;

/// Errors that can occur while saving or loading cut-flow state files
#[derive(Error, Debug)]
pub enum StoreError {
    /// File could not be found
    #[error("Failed to open file: {path}")]
    FileNotFound { path: String },

    /// I/O error occurred while reading or writing a file
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// File content is not valid JSON
    #[error("JSON error in {path}: {source}")]
    JsonError {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// File content is valid JSON but not a list of state records,
    /// or the records violate the counter invariants
    #[error("Invalid cut-flow state in {path}: {source}")]
    InvalidState {
        path: String,
        #[source]
        source: FilterError,
    },

    /// Lists read from different files could not be merged
    #[error("Merge failed: {0}")]
    MergeError(#[from] FilterError),
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, StoreError>;
