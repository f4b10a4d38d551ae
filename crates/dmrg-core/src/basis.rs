//! Symmetry-sector-partitioned basis description.

use crate::error::{CoreError, Result};
use crate::qn::Qn;

/// A basis whose states are sorted by symmetry sector.
///
/// States carry two orderings: the *natural* order (tensor-product order
/// of the underlying factors) and the *sorted* order in which states of
/// one sector are contiguous. `permutation` maps sorted positions to
/// natural positions; `inverse_permutation` is its inverse. `offsets`
/// delimits the sector ranges in sorted order and `qns` labels them.
#[derive(Debug, Clone, PartialEq)]
pub struct SectorBasis {
    permutation: Vec<usize>,
    inverse: Vec<usize>,
    offsets: Vec<usize>,
    qns: Vec<Qn>,
    sites: Vec<usize>,
}

impl SectorBasis {
    /// Builds a basis from its permutation, sector offsets, sector labels
    /// and the lattice sites it covers.
    pub fn new(
        permutation: Vec<usize>,
        offsets: Vec<usize>,
        qns: Vec<Qn>,
        sites: Vec<usize>,
    ) -> Result<Self> {
        let n = permutation.len();

        let mut inverse = vec![usize::MAX; n];
        for (sorted, &natural) in permutation.iter().enumerate() {
            if natural >= n {
                return Err(CoreError::InvalidPermutation {
                    context: "sector basis",
                    detail: format!("entry {} out of range for size {}", natural, n),
                });
            }
            if inverse[natural] != usize::MAX {
                return Err(CoreError::InvalidPermutation {
                    context: "sector basis",
                    detail: format!("entry {} appears twice", natural),
                });
            }
            inverse[natural] = sorted;
        }

        if offsets.first() != Some(&0) || offsets.last() != Some(&n) {
            return Err(CoreError::InvalidPartition {
                context: "sector basis",
                detail: format!("offsets must span 0..={}, got {:?}", n, offsets),
            });
        }
        if offsets.windows(2).any(|w| w[0] > w[1]) {
            return Err(CoreError::InvalidPartition {
                context: "sector basis",
                detail: format!("offsets must be non-decreasing, got {:?}", offsets),
            });
        }
        if qns.len() + 1 != offsets.len() {
            return Err(CoreError::SizeMismatch {
                context: "sector labels",
                expected: offsets.len() - 1,
                actual: qns.len(),
            });
        }

        Ok(Self {
            permutation,
            inverse,
            offsets,
            qns,
            sites,
        })
    }

    /// Single-sector basis in natural order, used for bases that carry no
    /// symmetry bookkeeping.
    pub fn natural(size: usize, sites: Vec<usize>) -> Self {
        Self {
            permutation: (0..size).collect(),
            inverse: (0..size).collect(),
            offsets: vec![0, size],
            qns: vec![Qn::zero()],
            sites,
        }
    }

    pub fn size(&self) -> usize {
        self.permutation.len()
    }

    pub fn num_sectors(&self) -> usize {
        self.qns.len()
    }

    /// Natural position of the `i`-th sorted state.
    #[inline]
    pub fn permutation(&self, i: usize) -> usize {
        self.permutation[i]
    }

    /// Sorted position of the `i`-th natural state.
    #[inline]
    pub fn inverse_permutation(&self, i: usize) -> usize {
        self.inverse[i]
    }

    /// Start of sector `p` in sorted order.
    pub fn offset(&self, p: usize) -> usize {
        self.offsets[p]
    }

    pub fn sector_size(&self, p: usize) -> usize {
        self.offsets[p + 1] - self.offsets[p]
    }

    pub fn qn(&self, p: usize) -> &Qn {
        &self.qns[p]
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    pub fn qns(&self) -> &[Qn] {
        &self.qns
    }

    pub fn permutation_vec(&self) -> &[usize] {
        &self.permutation
    }

    /// Lattice sites covered by this basis, in order.
    pub fn sites(&self) -> &[usize] {
        &self.sites
    }
}
