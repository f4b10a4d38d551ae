//! Quantum-number labels for symmetry sectors.

use std::fmt;

/// An ordered list of conserved integer quantum numbers (e.g. particle
/// number and total Sz) identifying one symmetry sector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Qn {
    numbers: Vec<i64>,
}

impl Qn {
    pub fn new(numbers: Vec<i64>) -> Self {
        Self { numbers }
    }

    /// Sector with no conserved quantities; compares equal to any other
    /// such sector.
    pub fn zero() -> Self {
        Self { numbers: Vec::new() }
    }

    pub fn numbers(&self) -> &[i64] {
        &self.numbers
    }

    pub fn len(&self) -> usize {
        self.numbers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty()
    }
}

impl fmt::Display for Qn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, n) in self.numbers.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", n)?;
        }
        write!(f, ")")
    }
}

impl From<Vec<i64>> for Qn {
    fn from(numbers: Vec<i64>) -> Self {
        Self::new(numbers)
    }
}
