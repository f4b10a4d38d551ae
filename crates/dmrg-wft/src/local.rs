//! Transform strategy for abelian-symmetry runs.

use dmrg_core::{LeftRightSuper, Scalar, SectorVector};

use crate::accel;
use crate::combined::CombinedWave;
use crate::error::{Result, WftError};
use crate::options::{SweepPhase, WftOptions};
use crate::strategy::WftStrategy;

/// Abelian ("local" symmetry) transform path.
///
/// Dispatches on the sweep phase: growing into the environment routes
/// through the environment contraction, growing into the system through
/// its mirror. Every (destination, source) sector pair is contracted;
/// contributions accumulate, so a source with several stored sectors
/// feeds them all into each destination sector.
pub struct WftLocal;

impl WftLocal {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WftLocal {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Scalar> WftStrategy<T> for WftLocal {
    fn transform_vector(
        &self,
        dest: &mut SectorVector<T>,
        src: &SectorVector<T>,
        combined: &CombinedWave<T>,
        lrs: &LeftRightSuper,
        nk: &[usize],
        options: WftOptions,
    ) -> Result<()> {
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
