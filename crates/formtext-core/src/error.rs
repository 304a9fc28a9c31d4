//! Typed errors for the core algorithms.

use thiserror::Error;

/// Rejected vector input.
///
/// Returned by the neighbor ranker and by embedding pooling, where
/// proceeding with empty, ragged, or non-finite vectors would produce meaningless
/// similarity scores.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("no vectors supplied")]
    Empty,

    #[error("vector for '{id}' has zero dimensions")]
    ZeroDimension { id: String },

    #[error("vector for '{id}' has {found} dimensions, expected {expected}")]
    DimensionMismatch {
        id: String,
        expected: usize,
        found: usize,
    },

    #[error("vector for '{id}' has a non-finite component")]
    NonFinite { id: String },
}
