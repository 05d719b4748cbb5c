//! Error types for the sampler core and the constraint transforms.

use thiserror::Error;

/// Raised by a [`Model`](crate::model::Model) when a position lies outside the
/// support of the target density.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct DomainError(pub String);

impl DomainError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

#[derive(Error, Debug)]
pub enum HmcError {
    #[error("Posterior is improper (step size search exceeded 1e7 at {step_size:e}). Please check your model.")]
    ImproperPosterior { step_size: f64 },

    #[error("No acceptably small step size could be found (step size reached 0). Perhaps the posterior is not continuous?")]
    StepSizeCollapsed,

    #[error("Log density evaluation failed: {0}")]
    Domain(#[from] DomainError),

    #[error("Dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("Warmup of {found} iterations does not match the {expected} the adaptation windows were laid out for")]
    WarmupMismatch { expected: usize, found: usize },

    #[error("Inverse metric is not positive definite")]
    NotPositiveDefinite,

    #[error("Inverse metric is not symmetric")]
    NotSymmetric,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type HmcResult<T> = Result<T, HmcError>;

/// Failures of the constrained <-> unconstrained transforms.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConstraintError {
    #[error("Value {value} is outside of [{lb}, {ub}]")]
    OutOfBounds { value: f64, lb: f64, ub: f64 },

    #[error("Value {0} is negative")]
    Negative(f64),

    #[error("Vector is not in ascending order")]
    NotOrdered,

    #[error("Vector is not positive and in ascending order")]
    NotPositiveOrdered,

    #[error("Vector is not a valid simplex (sum = {sum})")]
    NotSimplex { sum: f64 },

    #[error("Vector is not a unit vector (squared norm = {squared_norm})")]
    NotUnitVector { squared_norm: f64 },

    #[error("Matrix is not positive definite")]
    NotPositiveDefinite,

    #[error("Matrix must be non-empty and square, found {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },

    #[error("Scale {0} must be positive and finite")]
    InvalidScale(f64),

    #[error("Requested {requested} unconstrained values but only {available} remain")]
    Exhausted { requested: usize, available: usize },
}
