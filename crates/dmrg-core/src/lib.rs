//! Foundation types for DMRG-style renormalization-group solvers.
//!
//! This crate holds the data objects shared by solver components: a
//! scalar abstraction over `f64` and `Complex64`, symmetry-sector basis
//! descriptions with their permutations, the left/right/super basis
//! triple of a lattice bipartition, block-diagonal transform matrices,
//! sector-partitioned state vectors, and the index pack/unpack arithmetic
//! used to address product bases.

pub mod basis;
pub mod block_diag;
pub mod error;
pub mod lrs;
pub mod pack;
pub mod qn;
pub mod scalar;
pub mod vector;

pub use basis::SectorBasis;
pub use block_diag::BlockDiagonalMatrix;
pub use error::{CoreError, Result};
pub use lrs::LeftRightSuper;
pub use pack::PackIndices;
pub use qn::Qn;
pub use scalar::Scalar;
pub use vector::SectorVector;
