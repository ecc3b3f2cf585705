//! Error types for window layout.

use thiserror::Error;
use trellis_constraint::SolverError;

/// Errors during layout computation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    #[error(transparent)]
    Solver(#[from] SolverError),

    #[error("No box labelled {label}")]
    UnknownBox { label: String },

    #[error("A box labelled {label} already exists")]
    DuplicateBox { label: String },

    #[error("Invalid window size {width}x{height}")]
    InvalidSize { width: f64, height: f64 },
}
