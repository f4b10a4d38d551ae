//! Common scalar trait for the solver's numeric kernels.
//!
//! Unifies `f64` and `Complex64` so that vectors, block matrices and the
//! contraction engine are written once. The `ComplexFloat` and
//! `ComplexField` supertraits are what let generic code hand matrices to
//! the Faer matmul backend; `ComplexFloat` also supplies `conj`.

use std::fmt::Debug;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub};

use faer_traits::ComplexField;
use num_complex::{Complex64, ComplexFloat};
use num_traits::{MulAdd, One, Zero};

/// Scalar trait for state vectors and basis transforms.
pub trait Scalar:
    Clone
    + Copy
    + Debug
    + Default
    + PartialEq
    + Zero
    + One
    + Add<Output = Self>
    + AddAssign
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + ComplexFloat
    + ComplexField
    + MulAdd<Output = Self>
    + Sum
    + Send
    + Sync
    + 'static
{
    /// Square of the absolute value (for complex numbers, |z|^2).
    fn abs_sq(self) -> f64;

    /// Absolute value as f64.
    fn abs_val(self) -> f64 {
        self.abs_sq().sqrt()
    }

    /// Create from an f64 value.
    fn from_f64(val: f64) -> Self;

    /// Create from real and imaginary parts; the imaginary part is
    /// dropped for real scalar types.
    fn from_re_im(re: f64, im: f64) -> Self;

    /// Real part as f64.
    fn real_f64(&self) -> f64;

    /// Imaginary part as f64 (zero for real types).
    fn imag_f64(&self) -> f64;

    /// Widen to `Complex64` for storage layers that branch on the
    /// runtime scalar kind.
    fn to_c64(&self) -> Complex64 {
        Complex64::new(self.real_f64(), self.imag_f64())
    }

    /// Narrow from `Complex64`; for real types the imaginary part is
    /// dropped.
    fn from_c64(val: Complex64) -> Self {
        Self::from_re_im(val.re, val.im)
    }

    /// Check if this type is complex.
    fn is_complex_type() -> bool;
}

impl Scalar for f64 {
    #[inline]
    fn abs_sq(self) -> f64 {
        self * self
    }

    #[inline]
    fn abs_val(self) -> f64 {
        self.abs()
    }

    #[inline]
    fn from_f64(val: f64) -> Self {
        val
    }

    #[inline]
    fn from_re_im(re: f64, _im: f64) -> Self {
        re
    }

    #[inline]
    fn real_f64(&self) -> f64 {
        *self
    }

    #[inline]
    fn imag_f64(&self) -> f64 {
        0.0
    }

    #[inline]
    fn is_complex_type() -> bool {
        false
    }
}

impl Scalar for Complex64 {
    #[inline]
    fn abs_sq(self) -> f64 {
        self.norm_sqr()
    }

    #[inline]
    fn abs_val(self) -> f64 {
        self.norm()
    }

    #[inline]
    fn from_f64(val: f64) -> Self {
        Complex64::new(val, 0.0)
    }

    #[inline]
    fn from_re_im(re: f64, im: f64) -> Self {
        Complex64::new(re, im)
    }

    #[inline]
    fn real_f64(&self) -> f64 {
        self.re
    }

    #[inline]
    fn imag_f64(&self) -> f64 {
        self.im
    }

    #[inline]
    fn is_complex_type() -> bool {
        true
    }
}

/// Macro to generate f64 and Complex64 test variants from a generic test
/// function.
#[macro_export]
macro_rules! scalar_tests {
    ($name:ident, $test_fn:ident) => {
        paste::paste! {
            #[test]
            fn [<$name _f64>]() {
                $test_fn::<f64>();
            }

            #[test]
            fn [<$name _c64>]() {
                $test_fn::<num_complex::Complex64>();
            }
        }
    };
}
