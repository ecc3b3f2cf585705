//! Error types for the constraint solver.

use thiserror::Error;

/// Errors raised while adding, editing or solving constraints.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    /// A REQUIRED constraint cannot hold together with the ones already added.
    #[error("Required constraint is infeasible")]
    Infeasible,

    /// The objective can decrease without bound.
    #[error("Objective function is unbounded")]
    Unbounded,

    /// The dual simplex found a row that no pivot can repair.
    #[error("Tableau cannot be restored to feasibility")]
    Unsolvable,

    #[error("No edit record for variable {name}")]
    UnknownEditVariable { name: String },

    #[error("Constraint has no left-hand attribute")]
    InvalidConstraint,

    #[error("Cannot pivot {entering} into the basis in place of {exiting}")]
    InvalidPivot { entering: String, exiting: String },
}
