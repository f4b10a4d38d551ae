//! The strategy contract shared by the abelian and SU(2) transform paths.

use dmrg_core::{LeftRightSuper, Scalar, SectorVector};

use crate::combined::CombinedWave;
use crate::error::Result;
use crate::local::WftLocal;
use crate::options::WftOptions;
use crate::su2::WftSu2;

/// One capability: transform a state vector given the active transform
/// snapshots and the local degree-of-freedom counts of the grown sites.
///
/// Implementations must preserve the vector norm within the factory's
/// tolerance and must reject malformed basis/vector size combinations
/// instead of truncating.
pub trait WftStrategy<T: Scalar> {
    fn transform_vector(
        &self,
        dest: &mut SectorVector<T>,
        src: &SectorVector<T>,
        combined: &CombinedWave<T>,
        lrs: &LeftRightSuper,
        nk: &[usize],
        options: WftOptions,
    ) -> Result<()>;
}

/// Selects the strategy once, at factory construction.
pub fn strategy_for<T: Scalar>(su2: bool) -> Box<dyn WftStrategy<T> + Send + Sync> {
    if su2 {
        Box::new(WftSu2::new())
    } else {
        Box::new(WftLocal::new())
    }
}
