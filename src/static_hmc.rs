//! Hamiltonian Monte Carlo with a fixed integration time.

use crate::integrator::Integrator;
use crate::metric::Metric;
use crate::model::Model;
use crate::sampler::{TrajectoryStrategy, Transition, TransitionContext};
use rand::Rng;
use std::f64::consts::PI;

/// Energy errors above this flag a transition as divergent.
const MAX_DELTA_H: f64 = 1000.0;

/**
Integrates for a fixed time `T`, taking `L = max(1, floor(T / nominal))` leapfrog steps,
followed by a Metropolis correction.

`L` is recomputed from the nominal step size whenever it changes, so jittering the step
size varies the realized integration time around `T`.
*/
#[derive(Debug, Clone, PartialEq)]
pub struct StaticHmc {
    integration_time: f64,
    n_leapfrog: usize,
}

impl Default for StaticHmc {
    fn default() -> Self {
        Self::new(2.0 * PI)
    }
}

impl StaticHmc {
    pub fn new(integration_time: f64) -> Self {
        Self {
            integration_time,
            n_leapfrog: 1,
        }
    }

    pub fn integration_time(&self) -> f64 {
        self.integration_time
    }

    pub fn n_leapfrog(&self) -> usize {
        self.n_leapfrog
    }

    fn compute_n_leapfrog(&self, nominal_stepsize: f64) -> usize {
        let steps = (self.integration_time / nominal_stepsize).floor();
        if steps.is_finite() && steps >= 1.0 {
            steps as usize
        } else {
            1
        }
    }
}

impl TrajectoryStrategy for StaticHmc {
    fn build_transition<M, Me, I, R>(
        &mut self,
        ctx: &mut TransitionContext<'_, M, Me, I>,
        rng: &mut R,
    ) -> Transition
    where
        M: Model,
        Me: Metric,
        I: Integrator,
        R: Rng + ?Sized,
    {
        let start = ctx.z.clone();
        let h0 = ctx.hamiltonian.h(ctx.z);

        for _ in 0..self.n_leapfrog {
            ctx.integrator.evolve(ctx.z, ctx.hamiltonian, ctx.epsilon);
        }

        let h = ctx.hamiltonian.h(ctx.z);
        let accept_prob = if h0 - h > 0.0 { 1.0 } else { (h0 - h).exp() };

        let energy = if accept_prob < rng.gen::<f64>() {
            ctx.z.copy_from(&start);
            h0
        } else {
            h
        };

        Transition {
            accept_stat: accept_prob,
            n_leapfrog: self.n_leapfrog,
            divergent: h - h0 > MAX_DELTA_H,
            energy,
        }
    }

    fn update_integration_params(&mut self, nominal_stepsize: f64) {
        self.n_leapfrog = self.compute_n_leapfrog(nominal_stepsize);
    }

    fn diagnostic_names(&self) -> Vec<String> {
        vec!["int_time__".to_string()]
    }

    fn diagnostic_values(&self) -> Vec<f64> {
        vec![self.integration_time]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributions::{HalfNormal, IsotropicGaussian};
    use crate::hamiltonian::Hamiltonian;
    use crate::integrator::Leapfrog;
    use crate::metric::UnitMetric;
    use crate::point::PhaseSpacePoint;
    use nalgebra::DVector;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use std::sync::Arc;

    #[test]
    fn steps_follow_nominal_stepsize() {
        let mut s = StaticHmc::new(1.0);
        s.update_integration_params(0.3);
        assert_eq!(s.n_leapfrog(), 3);
        s.update_integration_params(5.0);
        assert_eq!(s.n_leapfrog(), 1);
        s.update_integration_params(0.0);
        assert_eq!(s.n_leapfrog(), 1);
    }

    #[test]
    fn rejects_when_trajectory_leaves_support() {
        let ham = Hamiltonian::new(Arc::new(HalfNormal { sigma: 1.0 }), UnitMetric::new(1)).unwrap();
        let mut z = PhaseSpacePoint::from_position(DVector::from_vec(vec![0.1]));
        z.p[0] = -5.0;
        ham.init(&mut z).unwrap();
        let start = z.clone();

        let mut strategy = StaticHmc::new(1.0);
        strategy.update_integration_params(0.5);
        let mut ctx = TransitionContext {
            z: &mut z,
            hamiltonian: &ham,
            integrator: &Leapfrog,
            epsilon: 0.5,
        };
        let mut rng = SmallRng::seed_from_u64(0);
        let t = strategy.build_transition(&mut ctx, &mut rng);

        assert_eq!(t.accept_stat, 0.0);
        assert!(t.divergent);
        assert_eq!(z, start);
    }

    #[test]
    fn tiny_steps_are_almost_always_accepted() {
        let ham = Hamiltonian::new(
            Arc::new(IsotropicGaussian::new(DVector::zeros(2), 1.0)),
            UnitMetric::new(2),
        )
        .unwrap();
        let mut strategy = StaticHmc::new(0.5);
        strategy.update_integration_params(0.01);
        let mut rng = SmallRng::seed_from_u64(4);

        let mut z = PhaseSpacePoint::from_position(DVector::from_vec(vec![0.5, -0.5]));
        let mut total = 0.0;
        for _ in 0..50 {
            ham.sample_momentum(&mut z, &mut rng);
            ham.init(&mut z).unwrap();
            let mut ctx = TransitionContext {
                z: &mut z,
                hamiltonian: &ham,
                integrator: &Leapfrog,
                epsilon: 0.01,
            };
            let t = strategy.build_transition(&mut ctx, &mut rng);
            assert_eq!(t.n_leapfrog, 50);
            assert!(!t.divergent);
            total += t.accept_stat;
        }
        assert!(total / 50.0 > 0.99);
    }
}
