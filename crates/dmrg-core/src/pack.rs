//! Divide/remainder packing of composite basis indices.
//!
//! A composite index over a product basis `A ⊗ B` is flattened as
//! `packed = a + b * size_of_A`. The pack/unpack pair must be exact
//! inverses over the declared ranges: the contraction engine routes every
//! amplitude through these, and an off-by-one corrupts the transformed
//! state without any error surfacing.

/// Packs and unpacks a two-factor composite index with a fixed size for
/// the fast-running factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackIndices {
    size: usize,
}

impl PackIndices {
    /// `size` is the dimension of the fast-running (first) factor.
    pub fn new(size: usize) -> Self {
        assert!(size > 0, "PackIndices requires a nonzero factor size");
        Self { size }
    }

    #[inline]
    pub fn pack(&self, a: usize, b: usize) -> usize {
        a + b * self.size
    }

    #[inline]
    pub fn unpack(&self, packed: usize) -> (usize, usize) {
        (packed % self.size, packed / self.size)
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }
}
