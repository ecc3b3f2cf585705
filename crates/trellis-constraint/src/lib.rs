//! Incremental constraint solving for Trellis layouts.
//!
//! This crate implements:
//! - Symbolic weights and strengths for prioritised constraints
//! - Linear expressions over session-scoped variables
//! - An incremental simplex tableau (primal Phase 1/2 and dual re-solve)
//!
//! A typical session allocates variables from a [`Tableau`], adds constraints,
//! reads results, and then edits the constants of optional equalities:
//!
//! ```
//! use trellis_constraint::{Relation, Strength, Tableau};
//!
//! let mut tableau = Tableau::new();
//! let x = tableau.new_variable("x");
//! tableau.add_constraint(x.clone().into(), Relation::Equal, 20.0.into(), Strength::STRONG)?;
//! tableau.update_constraint(&x, 44.0)?;
//! tableau.finish_updates()?;
//! assert_eq!(tableau.get_result(&x)?, Some(44.0));
//! # Ok::<(), trellis_constraint::SolverError>(())
//! ```

mod constraint;
mod error;
mod expression;
mod strength;
mod tableau;
mod variable;
mod weight;

pub use constraint::{Anchor, Attribute, BoxVars, Constraint};
pub use error::SolverError;
pub use expression::{Coefficient, Expression};
pub use strength::{Relation, Strength};
pub use tableau::{EditRecord, Tableau};
pub use variable::{Variable, VariableAllocator, VariableKind};
pub use weight::{SymbolicWeight, LEVELS};

/// Tolerance for every approximate comparison in the solver.
pub const EPSILON: f64 = 1e-6;

pub(crate) fn near_zero(value: f64) -> bool {
    value.abs() < EPSILON
}

pub(crate) fn approx_eq(a: f64, b: f64) -> bool {
    near_zero(a - b)
}
