//! Declarative box constraints.
//!
//! A [`Constraint`] relates an attribute of one box to an (optional)
//! attribute of another:
//!
//! ```text
//! left.attr <relation> multiplier × right.attr + constant
//! ```
//!
//! Attributes resolve to variables through the fixed mapping each box owns
//! in its [`BoxVars`].

use std::fmt;

use crate::error::SolverError;
use crate::expression::Expression;
use crate::strength::{Relation, Strength};
use crate::variable::{Variable, VariableAllocator};

/// A geometric attribute of a box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Attribute {
    Left,
    Right,
    Top,
    Bottom,
    Width,
    Height,
}

impl Attribute {
    pub const ALL: [Attribute; 6] = [
        Attribute::Left,
        Attribute::Right,
        Attribute::Top,
        Attribute::Bottom,
        Attribute::Width,
        Attribute::Height,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Attribute::Left => "Left",
            Attribute::Right => "Right",
            Attribute::Top => "Top",
            Attribute::Bottom => "Bottom",
            Attribute::Width => "Width",
            Attribute::Height => "Height",
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The six variables a box-like entity owns.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BoxVars {
    pub left: Variable,
    pub right: Variable,
    pub top: Variable,
    pub bottom: Variable,
    pub width: Variable,
    pub height: Variable,
}

impl BoxVars {
    /// Allocate variables named `label.Left`, `label.Right`, ...
    pub fn new(alloc: &mut VariableAllocator, label: &str) -> Self {
        let mut var = |attr: Attribute| alloc.normal(format!("{}.{}", label, attr));
        Self {
            left: var(Attribute::Left),
            right: var(Attribute::Right),
            top: var(Attribute::Top),
            bottom: var(Attribute::Bottom),
            width: var(Attribute::Width),
            height: var(Attribute::Height),
        }
    }

    /// Resolve an attribute to the variable that stands for it.
    pub fn get(&self, attribute: Attribute) -> &Variable {
        match attribute {
            Attribute::Left => &self.left,
            Attribute::Right => &self.right,
            Attribute::Top => &self.top,
            Attribute::Bottom => &self.bottom,
            Attribute::Width => &self.width,
            Attribute::Height => &self.height,
        }
    }

    /// `Width = Right - Left` and `Height = Bottom - Top`, as
    /// `(lhs, rhs)` pairs. Both must be registered as required before any
    /// other constraint references the box.
    pub fn structural_constraints(&self) -> [(Expression, Expression); 2] {
        [
            (Expression::from(&self.width), &self.right - &self.left),
            (Expression::from(&self.height), &self.bottom - &self.top),
        ]
    }
}

/// A box and one of its attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Anchor {
    pub vars: BoxVars,
    pub attribute: Attribute,
}

impl Anchor {
    pub fn new(vars: &BoxVars, attribute: Attribute) -> Self {
        Self {
            vars: vars.clone(),
            attribute,
        }
    }

    pub fn variable(&self) -> &Variable {
        self.vars.get(self.attribute)
    }
}

/// `left <relation> multiplier × right + constant` at a given strength.
///
/// Only the constant may change after construction, to support resize and
/// drag edits.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    left: Option<Anchor>,
    right: Option<Anchor>,
    relation: Relation,
    multiplier: f64,
    constant: f64,
    strength: Strength,
}

impl Constraint {
    pub fn new(
        left: Option<Anchor>,
        relation: Relation,
        right: Option<Anchor>,
        multiplier: f64,
        constant: f64,
        strength: Strength,
    ) -> Self {
        Self {
            left,
            right,
            relation,
            multiplier,
            constant,
            strength,
        }
    }

    /// `vars.attribute <relation> constant`.
    pub fn pin(
        vars: &BoxVars,
        attribute: Attribute,
        relation: Relation,
        constant: f64,
        strength: Strength,
    ) -> Self {
        Self::new(
            Some(Anchor::new(vars, attribute)),
            relation,
            None,
            0.0,
            constant,
            strength,
        )
    }

    /// `a.attr_a <relation> multiplier × b.attr_b + constant`.
    #[allow(clippy::too_many_arguments)]
    pub fn relate(
        a: &BoxVars,
        attr_a: Attribute,
        relation: Relation,
        b: &BoxVars,
        attr_b: Attribute,
        multiplier: f64,
        constant: f64,
        strength: Strength,
    ) -> Self {
        Self::new(
            Some(Anchor::new(a, attr_a)),
            relation,
            Some(Anchor::new(b, attr_b)),
            multiplier,
            constant,
            strength,
        )
    }

    pub fn left(&self) -> Option<&Anchor> {
        self.left.as_ref()
    }

    pub fn right(&self) -> Option<&Anchor> {
        self.right.as_ref()
    }

    pub fn relation(&self) -> Relation {
        self.relation
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    pub fn constant(&self) -> f64 {
        self.constant
    }

    pub fn strength(&self) -> Strength {
        self.strength
    }

    pub fn set_constant(&mut self, constant: f64) {
        self.constant = constant;
    }

    /// Variable of the left-hand attribute.
    pub fn left_variable(&self) -> Result<&Variable, SolverError> {
        self.left
            .as_ref()
            .map(Anchor::variable)
            .ok_or(SolverError::InvalidConstraint)
    }

    pub fn right_variable(&self) -> Option<&Variable> {
        self.right.as_ref().map(Anchor::variable)
    }

    /// Both sides as expressions: `(left, multiplier × right + constant)`.
    pub fn to_expressions(&self) -> Result<(Expression, Expression), SolverError> {
        let lhs = Expression::from(self.left_variable()?);
        let mut rhs = Expression::from_constant(self.constant);
        if let Some(var) = self.right_variable() {
            rhs.add_variable(var.clone(), self.multiplier);
        }
        Ok((lhs, rhs))
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.left {
            Some(anchor) => write!(f, "{}", anchor.variable().name())?,
            None => f.write_str("<none>")?,
        }
        write!(f, " {} ", self.relation)?;
        if let Some(var) = self.right_variable() {
            write!(f, "{} * {} + ", self.multiplier, var.name())?;
        }
        write!(f, "{} ({})", self.constant, self.strength)
    }
}
