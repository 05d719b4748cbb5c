//! The phase-space point integrated by the sampler.

use nalgebra::DVector;

/// Position, momentum and the log density / gradient cached at the position.
///
/// The cached fields describe `q` only after [`Hamiltonian::init`] or
/// [`Hamiltonian::update_potential_gradient`] has run on the point. Assigning `q` directly
/// leaves them stale until one of those is called again.
///
/// [`Hamiltonian::init`]: crate::hamiltonian::Hamiltonian::init
/// [`Hamiltonian::update_potential_gradient`]: crate::hamiltonian::Hamiltonian::update_potential_gradient
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseSpacePoint {
    /// Unconstrained position.
    pub q: DVector<f64>,
    /// Momentum.
    pub p: DVector<f64>,
    /// Log density at `q`.
    pub log_density: f64,
    /// Gradient of the log density at `q`.
    pub grad: DVector<f64>,
}

impl PhaseSpacePoint {
    /// A point at the origin with zero momentum. Cached values are unset.
    pub fn new(dim: usize) -> Self {
        Self::from_position(DVector::zeros(dim))
    }

    pub fn from_position(q: DVector<f64>) -> Self {
        let dim = q.len();
        Self {
            q,
            p: DVector::zeros(dim),
            log_density: f64::NAN,
            grad: DVector::zeros(dim),
        }
    }

    pub fn dim(&self) -> usize {
        self.q.len()
    }

    /// Copies every field of `other` into `self`, reusing the existing buffers.
    pub fn copy_from(&mut self, other: &PhaseSpacePoint) {
        self.q.copy_from(&other.q);
        self.p.copy_from(&other.p);
        self.log_density = other.log_density;
        self.grad.copy_from(&other.grad);
    }

    pub fn negate_momentum(&mut self) {
        self.p.neg_mut();
    }
}
