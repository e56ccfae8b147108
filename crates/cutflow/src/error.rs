//! Error types for the cutflow crate.
//!
//! Every variant is a programming error surfaced at the point of the
//! offending call. Nothing in this crate performs I/O, so there is no
//! transient failure mode and nothing is retried.

use thiserror::Error;

/// Errors raised while combining or rebuilding filters.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    /// A dynamically decoded value was not of the expected kind
    /// (e.g. a state record that is not an object, or a list that is not an array)
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: String,
    },

    /// Two filters with different names were added together
    #[error("Attempting to add filters with different names: '{left}' and '{right}'")]
    NameMismatch { left: String, right: String },

    /// Two filter lists of different lengths were merged
    #[error("Cannot merge filter lists of different lengths ({left} vs {right})")]
    LengthMismatch { left: usize, right: usize },

    /// The `details` mappings of two same-named filters carry different keys
    #[error(
        "Details of filter '{name}' do not match: only left {left_only:?}, only right {right_only:?}"
    )]
    DetailKeyMismatch {
        name: String,
        left_only: Vec<String>,
        right_only: Vec<String>,
    },

    /// The count-function tallies of two same-named filters carry different labels
    #[error(
        "Count functions of filter '{name}' do not match: only left {left_only:?}, only right {right_only:?}"
    )]
    CountFuncKeyMismatch {
        name: String,
        left_only: Vec<String>,
        right_only: Vec<String>,
    },

    /// A state record violates the counter invariants
    #[error("Invalid state for filter '{name}': {reason}")]
    InvalidState { name: String, reason: String },
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, FilterError>;
