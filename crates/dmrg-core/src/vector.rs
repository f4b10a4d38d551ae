//! State vectors partitioned into symmetry sectors.

use crate::error::{CoreError, Result};
use crate::scalar::Scalar;

/// An amplitude vector over a sector-sorted basis, storing only the
/// populated sectors.
///
/// Each populated sector is a contiguous slice with a recorded global
/// offset and effective size; unpopulated sectors hold no storage and
/// read as zero. This is the input and output type of every transform.
#[derive(Debug, Clone, PartialEq)]
pub struct SectorVector<T: Scalar> {
    offsets: Vec<usize>,
    data: Vec<Vec<T>>,
    nonzero: Vec<usize>,
}

impl<T: Scalar> SectorVector<T> {
    /// Builds a vector over the given sector partition with the listed
    /// sectors populated and zero-filled.
    pub fn zeroed(offsets: Vec<usize>, sectors: &[usize]) -> Result<Self> {
        if offsets.first() != Some(&0) || offsets.windows(2).any(|w| w[0] > w[1]) {
            return Err(CoreError::InvalidPartition {
                context: "sector vector",
                detail: format!("offsets must be non-decreasing from 0, got {:?}", offsets),
            });
        }
        let num_sectors = offsets.len() - 1;
        let mut data = vec![Vec::new(); num_sectors];
        let mut nonzero = Vec::with_capacity(sectors.len());
        for &s in sectors {
            if s >= num_sectors {
                return Err(CoreError::SizeMismatch {
                    context: "sector index",
                    expected: num_sectors,
                    actual: s,
                });
            }
            data[s] = vec![T::zero(); offsets[s + 1] - offsets[s]];
            nonzero.push(s);
        }
        nonzero.sort_unstable();
        nonzero.dedup();
        Ok(Self {
            offsets,
            data,
            nonzero,
        })
    }

    /// Populates sector `s` with `values`; the length must equal the
    /// sector's partition size.
    pub fn set_sector(&mut self, s: usize, values: Vec<T>) -> Result<()> {
        if s >= self.num_partitions() {
            return Err(CoreError::SizeMismatch {
                context: "sector index",
                expected: self.num_partitions(),
                actual: s,
            });
        }
        let expected = self.offsets[s + 1] - self.offsets[s];
        if values.len() != expected {
            return Err(CoreError::SizeMismatch {
                context: "sector data",
                expected,
                actual: values.len(),
            });
        }
        if self.data[s].is_empty() && expected > 0 {
            self.nonzero.push(s);
            self.nonzero.sort_unstable();
        }
        self.data[s] = values;
        Ok(())
    }

    /// Total dimension of the underlying basis.
    pub fn size(&self) -> usize {
        *self.offsets.last().unwrap()
    }

    pub fn num_partitions(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Number of populated sectors.
    pub fn sectors(&self) -> usize {
        self.nonzero.len()
    }

    /// Global sector index of the `i`-th populated sector.
    pub fn sector(&self, i: usize) -> usize {
        self.nonzero[i]
    }

    pub fn is_populated(&self, s: usize) -> bool {
        !self.data[s].is_empty()
    }

    /// Global offset of sector `s` in sorted order.
    pub fn offset(&self, s: usize) -> usize {
        self.offsets[s]
    }

    /// Stored length of sector `s` (zero when unpopulated).
    pub fn effective_size(&self, s: usize) -> usize {
        self.data[s].len()
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Contiguous amplitudes of a populated sector.
    pub fn slice(&self, s: usize) -> &[T] {
        &self.data[s]
    }

    pub fn slice_mut(&mut self, s: usize) -> &mut [T] {
        &mut self.data[s]
    }

    /// Euclidean norm over all populated sectors.
    pub fn norm(&self) -> f64 {
        self.sum_abs_sq().sqrt()
    }

    pub fn sum_abs_sq(&self) -> f64 {
        self.nonzero
            .iter()
            .flat_map(|&s| self.data[s].iter())
            .map(|x| x.abs_sq())
            .sum()
    }
}
