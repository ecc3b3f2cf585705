//! Constraint strengths and relations.

use std::fmt;

use crate::weight::{SymbolicWeight, LEVELS};

/// Priority of a constraint, `1..=REQUIRED`.
///
/// Required constraints hold exactly. Every lower level is approximated, and
/// any violation at a stronger level dominates any violation at a weaker one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Strength(u8);

impl Strength {
    pub const REQUIRED: Strength = Strength(LEVELS as u8);
    pub const STRONG: Strength = Strength(4);
    pub const MEDIUM: Strength = Strength(3);
    pub const WEAK: Strength = Strength(2);
    pub const MIN: Strength = Strength(1);

    /// Create a strength from a raw level, clamped into `1..=REQUIRED`.
    pub fn new(level: u8) -> Self {
        Self(level.clamp(Self::MIN.0, Self::REQUIRED.0))
    }

    pub fn level(&self) -> u8 {
        self.0
    }

    pub fn is_required(&self) -> bool {
        *self >= Self::REQUIRED
    }

    /// The next weaker level, saturating at [`Strength::MIN`].
    pub fn weaker(&self) -> Self {
        Self::new(self.0.saturating_sub(1))
    }

    /// Unit weight an error variable of this strength contributes to the
    /// objective.
    pub fn weight(&self) -> SymbolicWeight {
        SymbolicWeight::for_level(self.0 as usize)
    }
}

impl Default for Strength {
    fn default() -> Self {
        Self::REQUIRED
    }
}

impl fmt::Display for Strength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Strength::REQUIRED => f.write_str("required"),
            Strength::STRONG => f.write_str("strong"),
            Strength::MEDIUM => f.write_str("medium"),
            Strength::WEAK => f.write_str("weak"),
            Strength(level) => write!(f, "level {}", level),
        }
    }
}

/// The relation of a constraint (equality or inequality).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Relation {
    LessOrEqual,
    GreaterOrEqual,
    Equal,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Relation::LessOrEqual => f.write_str("<="),
            Relation::GreaterOrEqual => f.write_str(">="),
            Relation::Equal => f.write_str("=="),
        }
    }
}
