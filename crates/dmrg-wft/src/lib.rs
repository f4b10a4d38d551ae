//! Wavefunction transformation between renormalization-group steps.
//!
//! After each truncation step of a DMRG-style sweep, the previous ground
//! state can be carried into the next step's basis instead of restarting
//! the eigensolver from a random vector. This crate implements that
//! transformation: a factory that records basis-truncation snapshots on
//! per-side stacks as the sweep advances, arms a transformation window
//! when the growth direction turns around, and contracts the stored
//! transforms against the old state to produce the new trial vector.
//!
//! The entry point is [`WaveFunctionTransformation`], driven by the sweep
//! loop through `set_stage`, `push`, `trigger_on`, `set_initial_vector`
//! and `trigger_off`. Factory state survives restarts through the HDF5
//! [`checkpoint`] layer.

pub mod accel;
pub mod checkpoint;
pub mod combined;
pub mod error;
pub mod factory;
pub mod local;
pub mod options;
pub mod random;
pub mod snapshot;
pub mod stack;
pub mod strategy;
pub mod su2;

pub use combined::CombinedWave;
pub use error::{Result, WftError};
pub use factory::WaveFunctionTransformation;
pub use options::{GrowthSide, SweepPhase, WftOptions, WftParams};
pub use snapshot::TransformSnapshot;
pub use stack::TransformStack;
pub use strategy::{strategy_for, WftStrategy};
