//! Random trial-vector synthesis for steps without a usable transform.

use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

use dmrg_core::{Scalar, SectorVector};

use crate::error::{Result, WftError};

/// A sector whose random draw sums below this norm is rejected; the draw
/// would rescale into numerical noise.
const MIN_RANDOM_NORM: f64 = 1e-5;

/// Fills every populated sector of `v` with an independently normalized
/// random state.
pub fn fill_random<T, R>(rng: &mut R, v: &mut SectorVector<T>) -> Result<()>
where
    T: Scalar,
    R: Rng + ?Sized,
{
    for s in 0..v.num_partitions() {
        if v.is_populated(s) {
            fill_random_sector(rng, v, s)?;
        }
    }
    Ok(())
}

/// Fills one sector with standard-normal draws (independent real and
/// imaginary parts for complex scalars) and rescales it to unit norm.
pub fn fill_random_sector<T, R>(rng: &mut R, v: &mut SectorVector<T>, s: usize) -> Result<()>
where
    T: Scalar,
    R: Rng + ?Sized,
{
    let mut sum_sq = 0.0;
    for value in v.slice_mut(s).iter_mut() {
        let draw = if T::is_complex_type() {
            let re: f64 = StandardNormal.sample(rng);
            let im: f64 = StandardNormal.sample(rng);
            T::from_re_im(re, im)
        } else {
            T::from_re_im(StandardNormal.sample(rng), 0.0)
        };
        *value = draw;
        sum_sq += draw.abs_sq();
    }

    let norm = sum_sq.sqrt();
    if norm < MIN_RANDOM_NORM {
        return Err(WftError::NormTooSmall {
            context: "random sector fill",
            norm,
            threshold: MIN_RANDOM_NORM,
        });
    }

    let scale = T::from_f64(1.0 / norm);
    for value in v.slice_mut(s).iter_mut() {
        *value = *value * scale;
    }
    Ok(())
}
