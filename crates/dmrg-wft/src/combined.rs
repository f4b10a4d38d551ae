//! The active transform pair driving the current transformation window.

use dmrg_core::{BlockDiagonalMatrix, LeftRightSuper, Scalar, SectorBasis};

use crate::options::GrowthSide;
use crate::snapshot::TransformSnapshot;

/// Active snapshot for each growth side plus the composite basis the
/// snapshots refer to.
///
/// The factory mutates this in place as the sweep advances: `push` and
/// the window-arming pop install snapshots, and closing the window clears
/// both sides while re-seeding the basis reference.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedWave<T: Scalar> {
    system: TransformSnapshot<T>,
    environ: TransformSnapshot<T>,
    lrs: LeftRightSuper,
}

impl<T: Scalar> CombinedWave<T> {
    pub fn new() -> Self {
        let point = SectorBasis::natural(1, Vec::new());
        Self {
            system: TransformSnapshot::empty(),
            environ: TransformSnapshot::empty(),
            lrs: LeftRightSuper::new(point.clone(), point.clone(), point)
                .expect("1x1 composite basis is always valid"),
        }
    }

    pub fn from_parts(
        system: TransformSnapshot<T>,
        environ: TransformSnapshot<T>,
        lrs: LeftRightSuper,
    ) -> Self {
        Self {
            system,
            environ,
            lrs,
        }
    }

    pub fn set_wave(&mut self, side: GrowthSide, wave: TransformSnapshot<T>) {
        match side {
            GrowthSide::System => self.system = wave,
            GrowthSide::Environ => self.environ = wave,
        }
    }

    pub fn set_lrs(&mut self, lrs: &LeftRightSuper) {
        self.lrs = lrs.clone();
    }

    /// Drops both active snapshots; the basis reference stays until the
    /// caller re-seeds it.
    pub fn clear(&mut self) {
        self.system = TransformSnapshot::empty();
        self.environ = TransformSnapshot::empty();
    }

    pub fn wave(&self, side: GrowthSide) -> &TransformSnapshot<T> {
        match side {
            GrowthSide::System => &self.system,
            GrowthSide::Environ => &self.environ,
        }
    }

    pub fn transform(&self, side: GrowthSide) -> &BlockDiagonalMatrix<T> {
        self.wave(side).transform()
    }

    /// Composite basis of the step the active snapshots were taken at.
    pub fn lrs(&self) -> &LeftRightSuper {
        &self.lrs
    }
}

impl<T: Scalar> Default for CombinedWave<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dmrg_core::BlockDiagonalMatrix;

    #[test]
    fn set_and_clear_sides() {
        let mut combined = CombinedWave::<f64>::new();
        assert!(combined.wave(GrowthSide::System).is_empty());

        let snap = TransformSnapshot::new(
            BlockDiagonalMatrix::identity(&[3]),
            Vec::new(),
            Vec::new(),
            Vec::new(),
        );
        combined.set_wave(GrowthSide::System, snap.clone());
        assert_eq!(combined.transform(GrowthSide::System).rows(), 3);
        assert!(combined.wave(GrowthSide::Environ).is_empty());

        combined.set_wave(GrowthSide::Environ, snap);
        combined.clear();
        assert!(combined.wave(GrowthSide::System).is_empty());
        assert!(combined.wave(GrowthSide::Environ).is_empty());
    }

    #[test]
    fn lrs_survives_clear() {
        let mut combined = CombinedWave::<f64>::new();
        let lrs = LeftRightSuper::new(
            SectorBasis::natural(2, vec![0]),
            SectorBasis::natural(2, vec![1]),
            SectorBasis::natural(4, vec![0, 1]),
        )
        .unwrap();
        combined.set_lrs(&lrs);
        combined.clear();
        assert_eq!(combined.lrs().super_basis().size(), 4);
    }
}
