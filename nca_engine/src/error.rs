//! Engine error types.
//!
//! Shape problems are rejected when a grid, kernel or engine is built,
//! never mid-run. Numeric problems are not errors: they propagate until
//! clipping.

use thiserror::Error;

/// Root error type for engine construction and frame validation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Inconsistent dimensions (even kernel, ragged rows, cell outside grid, ...).
    #[error("shape error: {0}")]
    Shape(String),

    /// A stored frame violates the [0, 1] / constant-shape invariants.
    #[error("invariant violation: {0}")]
    Invariant(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
