//! The composite left/right/super basis triple of one lattice bipartition.

use crate::basis::SectorBasis;
use crate::error::{CoreError, Result};

/// Left block basis, right block basis, and their product (super) basis.
///
/// The super basis is the tensor product of left and right, re-sorted by
/// symmetry sector; its permutation is what routes amplitudes between the
/// sorted and product orders during a transform.
#[derive(Debug, Clone, PartialEq)]
pub struct LeftRightSuper {
    left: SectorBasis,
    right: SectorBasis,
    super_basis: SectorBasis,
}

impl LeftRightSuper {
    pub fn new(left: SectorBasis, right: SectorBasis, super_basis: SectorBasis) -> Result<Self> {
        if left.size() * right.size() != super_basis.size() {
            return Err(CoreError::SizeMismatch {
                context: "super basis",
                expected: left.size() * right.size(),
                actual: super_basis.size(),
            });
        }
        Ok(Self {
            left,
            right,
            super_basis,
        })
    }

    pub fn left(&self) -> &SectorBasis {
        &self.left
    }

    pub fn right(&self) -> &SectorBasis {
        &self.right
    }

    pub fn super_basis(&self) -> &SectorBasis {
        &self.super_basis
    }
}
