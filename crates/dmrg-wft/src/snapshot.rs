//! Basis-truncation snapshots as handed over by the sweep engine.

use mdarray::DTensor;

use dmrg_core::{BlockDiagonalMatrix, Qn, Scalar};

/// One truncation step's output: the block-diagonal basis transform plus
/// the right singular vectors, singular values and sector labels of the
/// SVD that produced it. Immutable once pushed into the history.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformSnapshot<T: Scalar> {
    transform: BlockDiagonalMatrix<T>,
    vts: Vec<DTensor<T, 2>>,
    svals: Vec<Vec<f64>>,
    qns: Vec<Qn>,
}

impl<T: Scalar> TransformSnapshot<T> {
    pub fn new(
        transform: BlockDiagonalMatrix<T>,
        vts: Vec<DTensor<T, 2>>,
        svals: Vec<Vec<f64>>,
        qns: Vec<Qn>,
    ) -> Self {
        Self {
            transform,
            vts,
            svals,
            qns,
        }
    }

    /// Snapshot with no blocks; the state of a cleared transform slot.
    pub fn empty() -> Self {
        Self {
            transform: BlockDiagonalMatrix::empty(),
            vts: Vec::new(),
            svals: Vec::new(),
            qns: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.transform.is_empty()
    }

    pub fn transform(&self) -> &BlockDiagonalMatrix<T> {
        &self.transform
    }

    pub fn vts(&self) -> &[DTensor<T, 2>] {
        &self.vts
    }

    pub fn svals(&self) -> &[Vec<f64>] {
        &self.svals
    }

    pub fn qns(&self) -> &[Qn] {
        &self.qns
    }
}
