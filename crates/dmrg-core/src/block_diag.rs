//! Block-diagonal matrices over symmetry sectors.

use mdarray::DTensor;

use crate::scalar::Scalar;

/// A block-diagonal dense matrix, one dense block per symmetry sector.
///
/// This is the shape of a basis-truncation transform: states of different
/// sectors never mix, so the full matrix is the direct sum of per-sector
/// blocks. Row/column offsets are the cumulative block dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockDiagonalMatrix<T: Scalar> {
    blocks: Vec<DTensor<T, 2>>,
    row_offsets: Vec<usize>,
    col_offsets: Vec<usize>,
}

impl<T: Scalar> BlockDiagonalMatrix<T> {
    pub fn from_blocks(blocks: Vec<DTensor<T, 2>>) -> Self {
        let mut row_offsets = Vec::with_capacity(blocks.len() + 1);
        let mut col_offsets = Vec::with_capacity(blocks.len() + 1);
        row_offsets.push(0);
        col_offsets.push(0);
        for block in &blocks {
            row_offsets.push(row_offsets.last().unwrap() + block.dim(0));
            col_offsets.push(col_offsets.last().unwrap() + block.dim(1));
        }
        Self {
            blocks,
            row_offsets,
            col_offsets,
        }
    }

    /// Identity transform with the given per-sector dimensions.
    pub fn identity(sizes: &[usize]) -> Self {
        let blocks = sizes
            .iter()
            .map(|&s| {
                DTensor::<T, 2>::from_fn([s, s], |idx| {
                    if idx[0] == idx[1] {
                        T::one()
                    } else {
                        T::zero()
                    }
                })
            })
            .collect();
        Self::from_blocks(blocks)
    }

    /// Matrix with no blocks; the cleared state of a transform slot.
    pub fn empty() -> Self {
        Self::from_blocks(Vec::new())
    }

    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn rows(&self) -> usize {
        *self.row_offsets.last().unwrap()
    }

    pub fn cols(&self) -> usize {
        *self.col_offsets.last().unwrap()
    }

    pub fn block(&self, b: usize) -> &DTensor<T, 2> {
        &self.blocks[b]
    }

    pub fn blocks(&self) -> &[DTensor<T, 2>] {
        &self.blocks
    }

    pub fn row_offset(&self, b: usize) -> usize {
        self.row_offsets[b]
    }

    pub fn col_offset(&self, b: usize) -> usize {
        self.col_offsets[b]
    }

    /// Scatters the blocks into one dense matrix. The contraction engine
    /// works on the dense form so that a single GEMM covers all sectors.
    pub fn to_dense(&self) -> DTensor<T, 2> {
        let mut dense = DTensor::<T, 2>::from_elem([self.rows(), self.cols()], T::zero());
        for (b, block) in self.blocks.iter().enumerate() {
            let (r0, c0) = (self.row_offsets[b], self.col_offsets[b]);
            for i in 0..block.dim(0) {
                for j in 0..block.dim(1) {
                    dense[[r0 + i, c0 + j]] = block[[i, j]];
                }
            }
        }
        dense
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex64;

    fn two_block_matrix<T: Scalar>() -> BlockDiagonalMatrix<T> {
        let a = DTensor::<T, 2>::from_fn([2, 2], |idx| T::from_f64((idx[0] * 2 + idx[1]) as f64));
        let b = DTensor::<T, 2>::from_fn([1, 3], |idx| T::from_f64(10.0 + idx[1] as f64));
        BlockDiagonalMatrix::from_blocks(vec![a, b])
    }

    fn offsets_and_dense_generic<T: Scalar>() {
        let m = two_block_matrix::<T>();
        assert_eq!(m.num_blocks(), 2);
        assert_eq!(m.rows(), 3);
        assert_eq!(m.cols(), 5);
        assert_eq!(m.row_offset(1), 2);
        assert_eq!(m.col_offset(1), 2);

        let dense = m.to_dense();
        assert_eq!(dense[[0, 1]], T::from_f64(1.0));
        assert_eq!(dense[[2, 4]], T::from_f64(12.0));
        // off-block entries stay zero
        assert_eq!(dense[[0, 3]], T::zero());
        assert_eq!(dense[[2, 0]], T::zero());
    }

    crate::scalar_tests!(offsets_and_dense, offsets_and_dense_generic);

    #[test]
    fn identity_blocks() {
        let m = BlockDiagonalMatrix::<f64>::identity(&[2, 3]);
        let dense = m.to_dense();
        assert_eq!(m.rows(), 5);
        for i in 0..5 {
            for j in 0..5 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_eq!(dense[[i, j]], expected);
            }
        }
    }

    #[test]
    fn empty_matrix() {
        let m = BlockDiagonalMatrix::<Complex64>::empty();
        assert!(m.is_empty());
        assert_eq!(m.rows(), 0);
        assert_eq!(m.cols(), 0);
    }
}
