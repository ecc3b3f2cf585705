//! Symbolic weights: lexicographically ordered priority scores.
//!
//! A weight carries one slot per strength level. Comparing two weights
//! compares the most significant slot first, so any amount of violation at a
//! stronger level outweighs any amount at a weaker level.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use crate::expression::Coefficient;
use crate::{approx_eq, near_zero};

/// Number of slots in a symbolic weight, one per strength level.
pub const LEVELS: usize = 5;

/// A fixed-length vector of reals used as a priority score.
///
/// Slot 0 is the most significant.
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SymbolicWeight {
    slots: [f64; LEVELS],
}

impl SymbolicWeight {
    /// All-zero weight.
    pub const fn zero() -> Self {
        Self { slots: [0.0; LEVELS] }
    }

    /// Weight with every slot set to `value`.
    pub const fn splat(value: f64) -> Self {
        Self { slots: [value; LEVELS] }
    }

    /// Unit weight for an error variable of the given strength level.
    ///
    /// Level `l` writes 1.0 into slot `LEVELS - l`. Levels outside
    /// `1..=LEVELS` produce a zero weight.
    pub fn for_level(level: usize) -> Self {
        let mut weight = Self::zero();
        if (1..=LEVELS).contains(&level) {
            weight.slots[LEVELS - level] = 1.0;
        }
        weight
    }

    /// The raw slot values.
    pub fn slots(&self) -> &[f64; LEVELS] {
        &self.slots
    }

    /// Value of a single slot, or `None` past the last level.
    pub fn slot(&self, index: usize) -> Option<f64> {
        self.slots.get(index).copied()
    }

    /// Slot-wise absolute value.
    pub fn abs(mut self) -> Self {
        for slot in &mut self.slots {
            *slot = slot.abs();
        }
        self
    }

    /// True when every slot is within epsilon of zero.
    pub fn is_zero(&self) -> bool {
        self.slots.iter().all(|s| near_zero(*s))
    }
}

impl From<[f64; LEVELS]> for SymbolicWeight {
    fn from(slots: [f64; LEVELS]) -> Self {
        Self { slots }
    }
}

impl From<f64> for SymbolicWeight {
    fn from(value: f64) -> Self {
        Self::splat(value)
    }
}

impl PartialEq for SymbolicWeight {
    fn eq(&self, other: &Self) -> bool {
        self.slots
            .iter()
            .zip(other.slots.iter())
            .all(|(a, b)| approx_eq(*a, *b))
    }
}

impl PartialOrd for SymbolicWeight {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        for (a, b) in self.slots.iter().zip(other.slots.iter()) {
            if approx_eq(*a, *b) {
                continue;
            }
            return a.partial_cmp(b);
        }
        Some(Ordering::Equal)
    }
}

impl Add for SymbolicWeight {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

impl AddAssign for SymbolicWeight {
    fn add_assign(&mut self, rhs: Self) {
        for (a, b) in self.slots.iter_mut().zip(rhs.slots.iter()) {
            *a += *b;
        }
    }
}

impl Sub for SymbolicWeight {
    type Output = Self;

    fn sub(mut self, rhs: Self) -> Self {
        self -= rhs;
        self
    }
}

impl SubAssign for SymbolicWeight {
    fn sub_assign(&mut self, rhs: Self) {
        for (a, b) in self.slots.iter_mut().zip(rhs.slots.iter()) {
            *a -= *b;
        }
    }
}

impl Mul<f64> for SymbolicWeight {
    type Output = Self;

    fn mul(mut self, rhs: f64) -> Self {
        self *= rhs;
        self
    }
}

impl MulAssign<f64> for SymbolicWeight {
    fn mul_assign(&mut self, rhs: f64) {
        for slot in &mut self.slots {
            *slot *= rhs;
        }
    }
}

impl Neg for SymbolicWeight {
    type Output = Self;

    fn neg(self) -> Self {
        self * -1.0
    }
}

impl Coefficient for SymbolicWeight {
    fn zero() -> Self {
        SymbolicWeight::zero()
    }

    fn one() -> Self {
        SymbolicWeight::splat(1.0)
    }

    fn scaled(&self, factor: f64) -> Self {
        *self * factor
    }

    fn approx_zero(&self) -> bool {
        self.is_zero()
    }

    fn approx_eq(&self, other: &Self) -> bool {
        self == other
    }

    fn is_negative(&self) -> bool {
        matches!(self.partial_cmp(&Self::zero()), Some(Ordering::Less))
    }
}

impl fmt::Display for SymbolicWeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, slot) in self.slots.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", slot)?;
        }
        write!(f, "]")
    }
}
