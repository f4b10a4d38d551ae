//! Error types for the core data structures.

use thiserror::Error;

/// Error type for basis, partition and block-matrix construction.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A permutation array is not a bijection on `0..n`.
    #[error("invalid permutation for {context}: {detail}")]
    InvalidPermutation { context: &'static str, detail: String },

    /// Sector offsets are not a monotone partition of the basis range.
    #[error("invalid sector partition for {context}: {detail}")]
    InvalidPartition { context: &'static str, detail: String },

    /// Two sizes that must agree do not.
    #[error("{context}: expected size {expected}, got {actual}")]
    SizeMismatch {
        context: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
