//! Block contraction engine behind the vector transforms.
//!
//! Both operations map one stored sector of the source vector into one
//! stored sector of the destination. The source amplitudes are unpacked
//! through the previous composite-basis permutation into one dense
//! matrix per local state, each matrix is pushed through two chained
//! GEMMs against the side transforms, and the product is scattered
//! through the new composite-basis permutation. The per-local-state
//! blocks are independent of each other; the GEMM backend is free to
//! thread inside each call.
//!
//! All dimension relations are checked up front and violations are
//! returned as errors: a silent truncation here would corrupt the
//! transformed state without any signal.

use mdarray::DTensor;
use mdarray_linalg::contract::MatmulBuilder;
use mdarray_linalg::Contract;
use mdarray_linalg_faer::Faer;

use dmrg_core::{LeftRightSuper, PackIndices, Scalar, SectorVector};

use crate::combined::CombinedWave;
use crate::error::{Result, WftError};
use crate::options::GrowthSide;

/// Product of the local degree-of-freedom counts of the sites grown in
/// one step.
pub fn volume_of(nk: &[usize]) -> usize {
    nk.iter().product()
}

fn adjoint<T: Scalar>(m: &DTensor<T, 2>) -> DTensor<T, 2> {
    DTensor::<T, 2>::from_fn([m.dim(1), m.dim(0)], |idx| m[[idx[1], idx[0]]].conj())
}

fn check_size(context: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(WftError::SizeMismatch {
            context,
            expected,
            actual,
        });
    }
    Ok(())
}

fn check_nonzero(context: &'static str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(WftError::SizeMismatch {
            context,
            expected: 1,
            actual: 0,
        });
    }
    Ok(())
}

/// Transform used when the sweep grows into the environment block.
///
/// The source sector is reshaped into matrices
/// `psi[k] : (reduced left) x (previous right)`, contracted as
/// `ws . (psi[k] . we)`, and scattered into the destination through the
/// new super and right permutations.
pub fn environ_from_infinite<T: Scalar>(
    dest: &mut SectorVector<T>,
    i0_dest: usize,
    src: &SectorVector<T>,
    i0_src: usize,
    lrs: &LeftRightSuper,
    nk: &[usize],
    combined: &CombinedWave<T>,
) -> Result<()> {
    let volume = volume_of(nk);
    check_nonzero("local-state volume", volume)?;

    let old = combined.lrs();
    let old_left = old.left().size();
    let old_right = old.right().size();
    check_nonzero("previous left basis", old_left)?;
    check_nonzero("destination right basis", lrs.right().size())?;
    check_size(
        "source vector vs previous super basis",
        old.super_basis().size(),
        src.size(),
    )?;
    check_size(
        "destination vector vs super basis",
        lrs.super_basis().size(),
        dest.size(),
    )?;
    if old_left % volume != 0 {
        return Err(WftError::SizeMismatch {
            context: "previous left basis vs local-state volume",
            expected: (old_left / volume) * volume,
            actual: old_left,
        });
    }
    let i2p_size = old_left / volume;

    let ws = combined.transform(GrowthSide::System).to_dense();
    let we = combined.transform(GrowthSide::Environ).to_dense();
    check_size("system transform columns", i2p_size, ws.dim(1))?;
    check_size("environment transform rows", old_right, we.dim(0))?;

    let nip = lrs.super_basis().size() / lrs.right().size();
    check_size("destination left basis vs system transform rows", ws.dim(0), nip)?;
    let jp_size = we.dim(1);
    let new_right = lrs.right().size();
    if new_right % volume != 0 || new_right / volume != jp_size {
        return Err(WftError::SizeMismatch {
            context: "destination right basis vs environment transform columns",
            expected: jp_size * volume,
            actual: new_right,
        });
    }

    // Gather the source sector into one dense matrix per local state.
    let pack_super = PackIndices::new(old_left);
    let pack_left = PackIndices::new(i2p_size);
    let mut psi: Vec<DTensor<T, 2>> = (0..volume)
        .map(|_| DTensor::<T, 2>::from_elem([i2p_size, old_right], T::zero()))
        .collect();
    let src_offset = src.offset(i0_src);
    let src_slice = src.slice(i0_src);
    for (x, &value) in src_slice.iter().enumerate() {
        let (alpha, jp2) = pack_super.unpack(old.super_basis().permutation(src_offset + x));
        let (ip2, kp) = pack_left.unpack(old.left().permutation(alpha));
        psi[kp][[ip2, jp2]] = psi[kp][[ip2, jp2]] + value;
    }

    let results: Vec<DTensor<T, 2>> = psi
        .iter()
        .map(|psi_k| {
            let tmp = Faer.matmul(psi_k, &we).eval();
            Faer.matmul(&ws, &tmp).eval()
        })
        .collect();

    // Scatter through the new composite basis.
    let pack_new_super = PackIndices::new(nip);
    let pack_new_right = PackIndices::new(volume);
    let dest_offset = dest.offset(i0_dest);
    let super_basis = lrs.super_basis();
    let right_basis = lrs.right();
    for (x, value) in dest.slice_mut(i0_dest).iter_mut().enumerate() {
        let (ip, beta) = pack_new_super.unpack(super_basis.permutation(dest_offset + x));
        let (kp, jp) = pack_new_right.unpack(right_basis.permutation(beta));
        *value = *value + results[kp][[ip, jp]];
    }

    Ok(())
}

/// Mirror transform used when the sweep grows into the system block.
///
/// The source sector is reshaped into `psi[k] : (previous left) x
/// (reduced right)`, contracted with the conjugate transposes as
/// `wsᴴ . (psi[k] . weᴴ)`, and scattered through the new super and left
/// permutations.
pub fn system_from_infinite<T: Scalar>(
    dest: &mut SectorVector<T>,
    i0_dest: usize,
    src: &SectorVector<T>,
    i0_src: usize,
    lrs: &LeftRightSuper,
    nk: &[usize],
    combined: &CombinedWave<T>,
) -> Result<()> {
    let volume = volume_of(nk);
    check_nonzero("local-state volume", volume)?;

    let old = combined.lrs();
    let old_left = old.left().size();
    let old_right = old.right().size();
    check_nonzero("previous left basis", old_left)?;
    check_nonzero("destination left basis", lrs.left().size())?;
    check_size(
        "source vector vs previous super basis",
        old.super_basis().size(),
        src.size(),
    )?;
    check_size(
        "destination vector vs super basis",
        lrs.super_basis().size(),
        dest.size(),
    )?;

    let ws = combined.transform(GrowthSide::System).to_dense();
    let we = combined.transform(GrowthSide::Environ).to_dense();
    check_size("system transform rows", old_left, ws.dim(0))?;
    let jpr_size = we.dim(1);
    if old_right % volume != 0 || old_right / volume != jpr_size {
        return Err(WftError::SizeMismatch {
            context: "previous right basis vs environment transform columns",
            expected: jpr_size * volume,
            actual: old_right,
        });
    }

    let new_left = lrs.left().size();
    let new_right = lrs.super_basis().size() / new_left;
    check_size("destination right basis vs environment transform rows", we.dim(0), new_right)?;
    let is_size = ws.dim(1);
    if new_left % volume != 0 || new_left / volume != is_size {
        return Err(WftError::SizeMismatch {
            context: "destination left basis vs system transform columns",
            expected: is_size * volume,
            actual: new_left,
        });
    }
    let nip = new_left / volume;

    // Gather the source sector into one dense matrix per local state.
    let pack_super = PackIndices::new(old_left);
    let pack_right = PackIndices::new(volume);
    let mut psi: Vec<DTensor<T, 2>> = (0..volume)
        .map(|_| DTensor::<T, 2>::from_elem([old_left, jpr_size], T::zero()))
        .collect();
    let src_offset = src.offset(i0_src);
    let src_slice = src.slice(i0_src);
    for (x, &value) in src_slice.iter().enumerate() {
        let (ip, jp) = pack_super.unpack(old.super_basis().permutation(src_offset + x));
        let (jpl, jpr) = pack_right.unpack(old.right().permutation(jp));
        psi[jpl][[ip, jpr]] = psi[jpl][[ip, jpr]] + value;
    }

    let ws_adj = adjoint(&ws);
    let we_adj = adjoint(&we);
    let results: Vec<DTensor<T, 2>> = psi
        .iter()
        .map(|psi_k| {
            let tmp = Faer.matmul(psi_k, &we_adj).eval();
            Faer.matmul(&ws_adj, &tmp).eval()
        })
        .collect();

    // Scatter through the new composite basis.
    let pack_new_super = PackIndices::new(new_left);
    let pack_new_left = PackIndices::new(nip);
    let dest_offset = dest.offset(i0_dest);
    let super_basis = lrs.super_basis();
    let left_basis = lrs.left();
    for (x, value) in dest.slice_mut(i0_dest).iter_mut().enumerate() {
        let (isn, jen) = pack_new_super.unpack(super_basis.permutation(dest_offset + x));
        let (is, jpl) = pack_new_left.unpack(left_basis.permutation(isn));
        *value = *value + results[jpl][[is, jen]];
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::TransformSnapshot;
    use approx::assert_relative_eq;
    use dmrg_core::{BlockDiagonalMatrix, SectorBasis};
    use num_complex::Complex64;

    fn lrs_1d(left: usize, right: usize) -> LeftRightSuper {
        LeftRightSuper::new(
            SectorBasis::natural(left, vec![0]),
            SectorBasis::natural(right, vec![1]),
            SectorBasis::natural(left * right, vec![0, 1]),
        )
        .unwrap()
    }

    fn snapshot_from_dense<T: Scalar>(block: DTensor<T, 2>) -> TransformSnapshot<T> {
        TransformSnapshot::new(
            BlockDiagonalMatrix::from_blocks(vec![block]),
            Vec::new(),
            Vec::new(),
            Vec::new(),
        )
    }

    fn combined_with<T: Scalar>(
        ws: DTensor<T, 2>,
        we: DTensor<T, 2>,
        lrs: &LeftRightSuper,
    ) -> CombinedWave<T> {
        let mut combined = CombinedWave::new();
        combined.set_wave(GrowthSide::System, snapshot_from_dense(ws));
        combined.set_wave(GrowthSide::Environ, snapshot_from_dense(we));
        combined.set_lrs(lrs);
        combined
    }

    fn identity2<T: Scalar>() -> DTensor<T, 2> {
        DTensor::<T, 2>::from_fn([2, 2], |idx| {
            if idx[0] == idx[1] {
                T::one()
            } else {
                T::zero()
            }
        })
    }

    fn one1<T: Scalar>() -> DTensor<T, 2> {
        DTensor::<T, 2>::from_elem([1, 1], T::one())
    }

    fn vector_with<T: Scalar>(values: &[f64]) -> SectorVector<T> {
        let mut v = SectorVector::<T>::zeroed(vec![0, values.len()], &[0]).unwrap();
        v.set_sector(0, values.iter().map(|&x| T::from_f64(x)).collect())
            .unwrap();
        v
    }

    fn environ_identity_generic<T: Scalar>() {
        let lrs = lrs_1d(2, 1);
        let combined = combined_with::<T>(identity2(), one1(), &lrs);
        let src = vector_with::<T>(&[0.6, 0.8]);
        let mut dest = SectorVector::<T>::zeroed(vec![0, 2], &[0]).unwrap();

        environ_from_infinite(&mut dest, 0, &src, 0, &lrs, &[1], &combined).unwrap();
        assert_eq!(dest.slice(0), src.slice(0));
    }

    dmrg_core::scalar_tests!(environ_identity_passthrough, environ_identity_generic);

    fn system_identity_generic<T: Scalar>() {
        let lrs = lrs_1d(2, 1);
        let combined = combined_with::<T>(identity2(), one1(), &lrs);
        let src = vector_with::<T>(&[0.6, 0.8]);
        let mut dest = SectorVector::<T>::zeroed(vec![0, 2], &[0]).unwrap();

        system_from_infinite(&mut dest, 0, &src, 0, &lrs, &[1], &combined).unwrap();
        assert_eq!(dest.slice(0), src.slice(0));
    }

    dmrg_core::scalar_tests!(system_identity_passthrough, system_identity_generic);

    #[test]
    fn environ_contracts_both_transforms() {
        // volume 2: old left 4 reduces to 2, environment transform is a
        // plain scale by 2.
        let old = lrs_1d(4, 1);
        let new = lrs_1d(2, 2);
        let ws = DTensor::<f64, 2>::from_fn([2, 2], |idx| (idx[0] * 2 + idx[1] + 1) as f64);
        let we = DTensor::<f64, 2>::from_elem([1, 1], 2.0);
        let combined = combined_with(ws, we, &old);

        let src = vector_with::<f64>(&[1.0, 0.5, 0.25, 0.125]);
        let mut dest = SectorVector::<f64>::zeroed(vec![0, 4], &[0]).unwrap();
        environ_from_infinite(&mut dest, 0, &src, 0, &new, &[2], &combined).unwrap();

        // psi[k] holds (src[2k], src[2k+1]); result[k] = ws . psi[k] * 2
        let expected = [4.0, 10.0, 1.0, 2.5];
        for (got, want) in dest.slice(0).iter().zip(expected) {
            assert_relative_eq!(*got, want, epsilon = 1e-12);
        }
    }

    #[test]
    fn system_path_conjugates_the_transforms() {
        let lrs = lrs_1d(2, 1);
        let ws = identity2::<Complex64>();
        let we = DTensor::<Complex64, 2>::from_elem([1, 1], Complex64::new(0.0, 2.0));
        let combined = combined_with(ws, we, &lrs);

        let src = vector_with::<Complex64>(&[0.5, 0.25]);
        let mut dest = SectorVector::<Complex64>::zeroed(vec![0, 2], &[0]).unwrap();
        system_from_infinite(&mut dest, 0, &src, 0, &lrs, &[1], &combined).unwrap();

        // weᴴ multiplies by conj(2i) = -2i
        assert_eq!(dest.slice(0)[0], Complex64::new(0.0, -1.0));
        assert_eq!(dest.slice(0)[1], Complex64::new(0.0, -0.5));
    }

    fn rotation2(theta: f64) -> DTensor<f64, 2> {
        let (sin, cos) = theta.sin_cos();
        DTensor::<f64, 2>::from_fn([2, 2], |idx| match (idx[0], idx[1]) {
            (0, 0) | (1, 1) => cos,
            (0, 1) => -sin,
            _ => sin,
        })
    }

    #[test]
    fn mixing_rotations_preserve_the_norm() {
        // volume 2: each local-state block is rotated independently
        let old = lrs_1d(4, 1);
        let new = lrs_1d(2, 2);
        let combined = combined_with(rotation2(0.3), one1(), &old);
        let src = vector_with::<f64>(&[0.6, 0.8, 0.3, -0.4]);
        let mut dest = SectorVector::<f64>::zeroed(vec![0, 4], &[0]).unwrap();
        environ_from_infinite(&mut dest, 0, &src, 0, &new, &[2], &combined).unwrap();
        assert_ne!(dest.slice(0), src.slice(0));
        assert!((dest.norm() - src.norm()).abs() <= 1e-5 * src.norm());

        // rotations on both sides, pushed through both directions
        let lrs = lrs_1d(2, 2);
        let combined = combined_with(rotation2(0.7), rotation2(-0.4), &lrs);
        let src = vector_with::<f64>(&[0.5, -0.25, 0.125, 1.0]);

        let mut dest = SectorVector::<f64>::zeroed(vec![0, 4], &[0]).unwrap();
        environ_from_infinite(&mut dest, 0, &src, 0, &lrs, &[1], &combined).unwrap();
        assert_ne!(dest.slice(0), src.slice(0));
        assert!((dest.norm() - src.norm()).abs() <= 1e-5 * src.norm());

        let mut dest = SectorVector::<f64>::zeroed(vec![0, 4], &[0]).unwrap();
        system_from_infinite(&mut dest, 0, &src, 0, &lrs, &[1], &combined).unwrap();
        assert_ne!(dest.slice(0), src.slice(0));
        assert!((dest.norm() - src.norm()).abs() <= 1e-5 * src.norm());
    }

    #[test]
    fn permuted_super_basis_is_routed_exactly() {
        // identity transforms and identical old/new bases: amplitudes
        // must pass through untouched even when the super basis sorts
        // its states in a nontrivial order
        use dmrg_core::Qn;
        let super_basis = SectorBasis::new(
            vec![2, 0, 3, 1],
            vec![0, 2, 4],
            vec![Qn::new(vec![0]), Qn::new(vec![1])],
            vec![0, 1],
        )
        .unwrap();
        let lrs = LeftRightSuper::new(
            SectorBasis::natural(2, vec![0]),
            SectorBasis::natural(2, vec![1]),
            super_basis,
        )
        .unwrap();
        let combined = combined_with::<f64>(identity2(), identity2(), &lrs);

        let mut src = SectorVector::<f64>::zeroed(vec![0, 2, 4], &[0]).unwrap();
        src.set_sector(0, vec![0.7, 0.3]).unwrap();
        let mut dest = SectorVector::<f64>::zeroed(vec![0, 2, 4], &[0]).unwrap();

        environ_from_infinite(&mut dest, 0, &src, 0, &lrs, &[1], &combined).unwrap();
        assert_eq!(dest.slice(0), src.slice(0));

        let mut dest2 = SectorVector::<f64>::zeroed(vec![0, 2, 4], &[0]).unwrap();
        system_from_infinite(&mut dest2, 0, &src, 0, &lrs, &[1], &combined).unwrap();
        assert_eq!(dest2.slice(0), src.slice(0));
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let lrs = lrs_1d(2, 1);
        // system transform with the wrong column count
        let ws = DTensor::<f64, 2>::from_elem([2, 3], 1.0);
        let combined = combined_with(ws, one1(), &lrs);
        let src = vector_with::<f64>(&[0.6, 0.8]);
        let mut dest = SectorVector::<f64>::zeroed(vec![0, 2], &[0]).unwrap();

        let err = environ_from_infinite(&mut dest, 0, &src, 0, &lrs, &[1], &combined);
        assert!(matches!(err, Err(WftError::SizeMismatch { .. })));
        // the failed call must not have touched the destination
        assert!(dest.slice(0).iter().all(|&x| x == 0.0));
    }

    #[test]
    fn volume_of_empty_is_one() {
        assert_eq!(volume_of(&[]), 1);
        assert_eq!(volume_of(&[2, 3]), 6);
        assert_eq!(volume_of(&[2, 0]), 0);
    }
}
