//! Symplectic integrators.

use crate::hamiltonian::Hamiltonian;
use crate::metric::Metric;
use crate::model::Model;
use crate::point::PhaseSpacePoint;

/// A time-reversible, volume-preserving integrator split into the usual
/// momentum / position / momentum sub-steps.
///
/// Every sub-step mutates `z` in place:
/// - `begin_update_p` and `end_update_p` read `z.grad` and write `z.p`;
/// - `update_q` reads `z.p`, writes `z.q` and refreshes `z.log_density` and `z.grad`.
///
/// Non-finite log densities or gradients are never raised here. They flow into the
/// energy of the point and are dealt with by the caller.
pub trait Integrator {
    fn begin_update_p<M: Model, Me: Metric>(
        &self,
        z: &mut PhaseSpacePoint,
        hamiltonian: &Hamiltonian<M, Me>,
        epsilon: f64,
    );

    fn update_q<M: Model, Me: Metric>(
        &self,
        z: &mut PhaseSpacePoint,
        hamiltonian: &Hamiltonian<M, Me>,
        epsilon: f64,
    );

    fn end_update_p<M: Model, Me: Metric>(
        &self,
        z: &mut PhaseSpacePoint,
        hamiltonian: &Hamiltonian<M, Me>,
        epsilon: f64,
    );

    /// One full step of size `epsilon`. Expects `z.log_density` and `z.grad` to be in sync
    /// with `z.q`, and leaves them in sync.
    fn evolve<M: Model, Me: Metric>(
        &self,
        z: &mut PhaseSpacePoint,
        hamiltonian: &Hamiltonian<M, Me>,
        epsilon: f64,
    ) {
        self.begin_update_p(z, hamiltonian, 0.5 * epsilon);
        self.update_q(z, hamiltonian, epsilon);
        self.end_update_p(z, hamiltonian, 0.5 * epsilon);
    }
}

/// The explicit leapfrog (Störmer-Verlet) scheme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Leapfrog;

impl Integrator for Leapfrog {
    fn begin_update_p<M: Model, Me: Metric>(
        &self,
        z: &mut PhaseSpacePoint,
        _hamiltonian: &Hamiltonian<M, Me>,
        epsilon: f64,
    ) {
        z.p.axpy(epsilon, &z.grad, 1.0);
    }

    fn update_q<M: Model, Me: Metric>(
        &self,
        z: &mut PhaseSpacePoint,
        hamiltonian: &Hamiltonian<M, Me>,
        epsilon: f64,
    ) {
        let v = hamiltonian.velocity(z);
        z.q.axpy(epsilon, &v, 1.0);
        hamiltonian.update_potential_gradient(z);
    }

    fn end_update_p<M: Model, Me: Metric>(
        &self,
        z: &mut PhaseSpacePoint,
        _hamiltonian: &Hamiltonian<M, Me>,
        epsilon: f64,
    ) {
        z.p.axpy(epsilon, &z.grad, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributions::{Gaussian, Rosenbrock2D, StandardNormal};
    use crate::metric::{DenseMetric, DiagMetric, UnitMetric};
    use approx::{assert_relative_eq, relative_eq};
    use nalgebra::{DMatrix, DVector};
    use proptest::prelude::*;
    use std::sync::Arc;

    fn dense_gaussian() -> Hamiltonian<Gaussian, DenseMetric> {
        let cov = DMatrix::from_row_slice(2, 2, &[2.0, 0.5, 0.5, 1.0]);
        let model = Gaussian::new(DVector::from_vec(vec![0.5, -0.5]), cov).unwrap();
        let metric = DenseMetric::new(DMatrix::from_row_slice(2, 2, &[1.2, 0.2, 0.2, 0.7])).unwrap();
        Hamiltonian::new(Arc::new(model), metric).unwrap()
    }

    #[test]
    fn one_step_on_standard_normal() {
        let ham = Hamiltonian::new(Arc::new(StandardNormal::new(1)), UnitMetric::new(1)).unwrap();
        let mut z = PhaseSpacePoint::from_position(DVector::from_vec(vec![1.0]));
        z.p[0] = 0.5;
        ham.init(&mut z).unwrap();
        Leapfrog.evolve(&mut z, &ham, 0.1);
        // p_half = 0.5 - 0.05 * 1.0 = 0.45, q = 1.045, p = 0.45 - 0.05 * 1.045
        assert_relative_eq!(z.q[0], 1.045, epsilon = 1e-14);
        assert_relative_eq!(z.p[0], 0.39775, epsilon = 1e-14);
        assert_relative_eq!(z.log_density, -0.5 * 1.045 * 1.045, epsilon = 1e-14);
    }

    #[test]
    fn small_steps_nearly_conserve_energy() {
        let ham = Hamiltonian::new(
            Arc::new(Rosenbrock2D { a: 1.0, b: 5.0 }),
            DiagMetric::new(DVector::from_vec(vec![0.5, 0.2])).unwrap(),
        )
        .unwrap();
        let mut z = PhaseSpacePoint::from_position(DVector::from_vec(vec![0.8, 0.7]));
        z.p = DVector::from_vec(vec![0.3, -0.2]);
        ham.init(&mut z).unwrap();
        let h0 = ham.h(&z);
        for _ in 0..200 {
            Leapfrog.evolve(&mut z, &ham, 1e-3);
        }
        assert!((ham.h(&z) - h0).abs() < 1e-4);
    }

    proptest! {
        #[test]
        fn reversible_under_momentum_negation(
            q in prop::collection::vec(-2.0..2.0f64, 2),
            p in prop::collection::vec(-2.0..2.0f64, 2),
            epsilon in 0.01..0.5f64,
        ) {
            let ham = dense_gaussian();
            let mut z = PhaseSpacePoint::from_position(DVector::from_vec(q));
            z.p = DVector::from_vec(p);
            ham.init(&mut z).unwrap();
            let start = z.clone();

            Leapfrog.evolve(&mut z, &ham, epsilon);
            z.negate_momentum();
            Leapfrog.evolve(&mut z, &ham, epsilon);
            z.negate_momentum();

            prop_assert!(relative_eq!(z.q, start.q, epsilon = 1e-10, max_relative = 1e-10));
            prop_assert!(relative_eq!(z.p, start.p, epsilon = 1e-10, max_relative = 1e-10));
        }

        #[test]
        fn negative_step_undoes_positive_step(
            q in prop::collection::vec(-2.0..2.0f64, 2),
            p in prop::collection::vec(-2.0..2.0f64, 2),
            epsilon in 0.01..0.5f64,
        ) {
            let ham = dense_gaussian();
            let mut z = PhaseSpacePoint::from_position(DVector::from_vec(q));
            z.p = DVector::from_vec(p);
            ham.init(&mut z).unwrap();
            let start = z.clone();

            Leapfrog.evolve(&mut z, &ham, epsilon);
            Leapfrog.evolve(&mut z, &ham, -epsilon);

            prop_assert!(relative_eq!(z.q, start.q, epsilon = 1e-10, max_relative = 1e-10));
            prop_assert!(relative_eq!(z.p, start.p, epsilon = 1e-10, max_relative = 1e-10));
        }
    }
}
