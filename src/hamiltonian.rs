//! The Hamiltonian `H(q, p) = -log pi(q) + 0.5 p' M^-1 p` over a model and a metric.

use crate::error::{DomainError, HmcError, HmcResult};
use crate::metric::Metric;
use crate::model::Model;
use crate::point::PhaseSpacePoint;
use log::warn;
use nalgebra::DVector;
use rand::Rng;
use std::sync::Arc;

/// Pairs a shared, read-only model with an adaptable metric.
///
/// The metric may be replaced between iterations through [`Hamiltonian::set_metric`]. It is
/// never touched while a trajectory is being integrated.
#[derive(Debug)]
pub struct Hamiltonian<M, Me> {
    model: Arc<M>,
    metric: Me,
}

impl<M: Model, Me: Metric> Hamiltonian<M, Me> {
    /// Fails if the metric and the model disagree on the dimension.
    pub fn new(model: Arc<M>, metric: Me) -> HmcResult<Self> {
        if model.dim() != metric.dim() {
            return Err(HmcError::DimensionMismatch {
                expected: model.dim(),
                found: metric.dim(),
            });
        }
        Ok(Self { model, metric })
    }

    pub fn dim(&self) -> usize {
        self.model.dim()
    }

    pub fn model(&self) -> &Arc<M> {
        &self.model
    }

    pub fn metric(&self) -> &Me {
        &self.metric
    }

    /// Swaps in a new metric of the same dimension.
    pub fn set_metric(&mut self, metric: Me) -> HmcResult<()> {
        if metric.dim() != self.dim() {
            return Err(HmcError::DimensionMismatch {
                expected: self.dim(),
                found: metric.dim(),
            });
        }
        self.metric = metric;
        Ok(())
    }

    /// Recomputes the cached log density and gradient at `z.q`.
    ///
    /// Touches `z.log_density` and `z.grad` only. Domain errors and non-finite log densities
    /// or gradients are returned to the caller: a chain that cannot be initialized cannot
    /// continue.
    pub fn init(&self, z: &mut PhaseSpacePoint) -> HmcResult<()> {
        let lp = self.model.log_density_and_grad(&z.q, &mut z.grad)?;
        if !lp.is_finite() {
            return Err(DomainError::new(format!(
                "log density is {lp} at the initial position"
            ))
            .into());
        }
        if z.grad.iter().any(|g| !g.is_finite()) {
            return Err(DomainError::new(
                "gradient is not finite at the initial position",
            )
            .into());
        }
        z.log_density = lp;
        Ok(())
    }

    /// Recomputes the cached log density and gradient after a position update.
    ///
    /// Domain errors and non-finite log densities or gradients are absorbed: the log density
    /// becomes `-inf` and the gradient `NaN`, so the energy of the point evaluates to `+inf`.
    pub fn update_potential_gradient(&self, z: &mut PhaseSpacePoint) {
        match self.model.log_density_and_grad(&z.q, &mut z.grad) {
            Ok(lp) if lp.is_finite() && z.grad.iter().all(|g| g.is_finite()) => {
                z.log_density = lp;
            }
            Ok(lp) => {
                warn!("Proposal will be rejected, log density {lp} or its gradient is not finite");
                z.log_density = f64::NEG_INFINITY;
                z.grad.fill(f64::NAN);
            }
            Err(e) => {
                warn!("Proposal will be rejected, log density not evaluable: {e}");
                z.log_density = f64::NEG_INFINITY;
                z.grad.fill(f64::NAN);
            }
        }
    }

    /// Draws `z.p` from `N(0, M)`. No other field is touched.
    pub fn sample_momentum<R: Rng + ?Sized>(&self, z: &mut PhaseSpacePoint, rng: &mut R) {
        self.metric.sample_momentum(&mut z.p, rng);
    }

    pub fn kinetic_energy(&self, z: &PhaseSpacePoint) -> f64 {
        self.metric.kinetic_energy(&z.p)
    }

    /// `M^-1 p`, the time derivative of the position.
    pub fn velocity(&self, z: &PhaseSpacePoint) -> DVector<f64> {
        self.metric.velocity(&z.p)
    }

    /// Total energy of `z` from its cached log density. `NaN` is reported as `+inf`.
    pub fn h(&self, z: &PhaseSpacePoint) -> f64 {
        let h = -z.log_density + self.kinetic_energy(z);
        if h.is_nan() {
            f64::INFINITY
        } else {
            h
        }
    }
}
