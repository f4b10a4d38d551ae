//! Error types for the wavefunction-transformation subsystem.
//!
//! Consistency violations surface as values of this enum and the sweep
//! engine decides whether to abort or report. Only the post-transform
//! norm drift is softer: it is logged and the run continues.

use thiserror::Error;

use crate::options::{GrowthSide, SweepPhase};

/// Error type for factory, strategy and contraction operations.
#[derive(Error, Debug)]
pub enum WftError {
    /// Unsupported symmetry/restart combination or invalid parameters.
    #[error("unsupported configuration: {0}")]
    Config(String),

    /// The history stack for a growth side was popped while empty.
    #[error("history stack for the {side} side is empty")]
    EmptyStack { side: GrowthSide },

    /// A pushed growth direction contradicts the current sweep phase.
    #[error("growth direction {direction} does not match sweep phase {phase}")]
    DirectionMismatch {
        phase: SweepPhase,
        direction: SweepPhase,
    },

    /// Two dimensions that must agree for a contraction do not.
    #[error("{context}: expected size {expected}, got {actual}")]
    SizeMismatch {
        context: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A vector norm fell below the minimal usable threshold.
    #[error("{context}: norm {norm:.3e} is below threshold {threshold:.1e}")]
    NormTooSmall {
        context: &'static str,
        norm: f64,
        threshold: f64,
    },

    /// Checkpoint file could not be written or read.
    #[error("checkpoint i/o failed: {0}")]
    Checkpoint(#[from] anyhow::Error),

    /// Invalid basis or vector construction bubbled up from the core.
    #[error(transparent)]
    Core(#[from] dmrg_core::CoreError),
}

/// Result type alias for transformation operations.
pub type Result<T> = std::result::Result<T, WftError>;
