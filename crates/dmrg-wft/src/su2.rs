//! Transform strategy for non-abelian (SU(2)) runs.

use dmrg_core::{LeftRightSuper, Scalar, SectorVector};

use crate::accel;
use crate::combined::CombinedWave;
use crate::error::{Result, WftError};
use crate::options::{SweepPhase, WftOptions};
use crate::strategy::WftStrategy;

/// SU(2)-symmetry transform path.
///
/// The multiplet structure lives in the sector bases themselves, so the
/// contraction is shared with the abelian path. The two-site sweep
/// variant is not supported together with SU(2).
pub struct WftSu2;

impl WftSu2 {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WftSu2 {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Scalar> WftStrategy<T> for WftSu2 {
    fn transform_vector(
        &self,
        dest: &mut SectorVector<T>,
        src: &SectorVector<T>,
        combined: &CombinedWave<T>,
        lrs: &LeftRightSuper,
        nk: &[usize],
        options: WftOptions,
    ) -> Result<()> {
        if options.two_site {
            return Err(WftError::Config(
                "SU(2) symmetry does not support the two-site sweep".to_string(),
            ));
        }

        for ii in 0..dest.sectors() {
            let i0 = dest.sector(ii);
            for jj in 0..src.sectors() {
                let i0_src = src.sector(jj);
                match options.phase {
                    SweepPhase::ExpandEnviron => {
                        accel::environ_from_infinite(dest, i0, src, i0_src, lrs, nk, combined)?
                    }
                    SweepPhase::ExpandSystem => {
                        accel::system_from_infinite(dest, i0, src, i0_src, lrs, nk, combined)?
                    }
                    SweepPhase::InitialGrowth => {
                        return Err(WftError::Config(
                            "vector transform requested during initial growth".to_string(),
                        ))
                    }
                }
            }
        }
        Ok(())
    }
}
