//! Euclidean metrics (mass matrices) defining the kinetic energy.
//!
//! Each metric stores the *inverse* mass matrix `M^-1`. Momenta are drawn from
//! `N(0, M)`, the kinetic energy is `0.5 * p' M^-1 p` and the velocity is `M^-1 p`.

use crate::callbacks::{join_values, Writer};
use crate::error::{HmcError, HmcResult};
use nalgebra::{DMatrix, DVector};
use rand::Rng;
use rand_distr::StandardNormal;
use std::fmt::Debug;
use std::io;

/// A mass-matrix metric.
pub trait Metric: Clone + Debug {
    fn dim(&self) -> usize;

    /// `0.5 * p' M^-1 p`.
    fn kinetic_energy(&self, p: &DVector<f64>) -> f64;

    /// Derivative of the kinetic energy with respect to the momentum, `M^-1 p`.
    fn velocity(&self, p: &DVector<f64>) -> DVector<f64>;

    /// Overwrites `p` with a draw from `N(0, M)`.
    fn sample_momentum<R: Rng + ?Sized>(&self, p: &mut DVector<f64>, rng: &mut R);

    /// Dumps the inverse mass matrix, one line per structural component.
    fn write_metric(&self, writer: &mut dyn Writer) -> io::Result<()>;

    /// Diagnostic names, one per free entry of the inverse mass matrix.
    fn param_names(&self) -> Vec<String>;

    /// Diagnostic values, aligned with [`Metric::param_names`].
    fn params(&self) -> Vec<f64>;
}

/// Largest asymmetry accepted in a dense inverse metric, relative to its largest entry.
const SYMMETRY_TOLERANCE: f64 = 1e-8;

fn fill_standard_normal<R: Rng + ?Sized>(v: &mut DVector<f64>, rng: &mut R) {
    v.iter_mut().for_each(|x| *x = rng.sample(StandardNormal));
}

/// The identity mass matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitMetric {
    dim: usize,
}

impl UnitMetric {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

impl Metric for UnitMetric {
    fn dim(&self) -> usize {
        self.dim
    }

    fn kinetic_energy(&self, p: &DVector<f64>) -> f64 {
        0.5 * p.norm_squared()
    }

    fn velocity(&self, p: &DVector<f64>) -> DVector<f64> {
        p.clone()
    }

    fn sample_momentum<R: Rng + ?Sized>(&self, p: &mut DVector<f64>, rng: &mut R) {
        fill_standard_normal(p, rng);
    }

    fn write_metric(&self, writer: &mut dyn Writer) -> io::Result<()> {
        writer.message("No free parameters for unit metric")
    }

    fn param_names(&self) -> Vec<String> {
        Vec::new()
    }

    fn params(&self) -> Vec<f64> {
        Vec::new()
    }
}

/// A diagonal inverse mass matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagMetric {
    inv_diag: DVector<f64>,
}

impl DiagMetric {
    /// Every diagonal entry must be positive and finite.
    pub fn new(inv_diag: DVector<f64>) -> HmcResult<Self> {
        if inv_diag.iter().any(|&x| !(x > 0.0 && x.is_finite())) {
            return Err(HmcError::NotPositiveDefinite);
        }
        Ok(Self { inv_diag })
    }

    pub fn identity(dim: usize) -> Self {
        Self {
            inv_diag: DVector::from_element(dim, 1.0),
        }
    }

    pub fn inv_diag(&self) -> &DVector<f64> {
        &self.inv_diag
    }
}

impl Metric for DiagMetric {
    fn dim(&self) -> usize {
        self.inv_diag.len()
    }

    fn kinetic_energy(&self, p: &DVector<f64>) -> f64 {
        0.5 * p.dot(&p.component_mul(&self.inv_diag))
    }

    fn velocity(&self, p: &DVector<f64>) -> DVector<f64> {
        p.component_mul(&self.inv_diag)
    }

    fn sample_momentum<R: Rng + ?Sized>(&self, p: &mut DVector<f64>, rng: &mut R) {
        for (p_i, m_inv) in p.iter_mut().zip(self.inv_diag.iter()) {
            let u: f64 = rng.sample(StandardNormal);
            *p_i = u / m_inv.sqrt();
        }
    }

    fn write_metric(&self, writer: &mut dyn Writer) -> io::Result<()> {
        writer.message("Diagonal elements of inverse mass matrix:")?;
        writer.message(&join_values(self.inv_diag.as_slice()))
    }

    fn param_names(&self) -> Vec<String> {
        (0..self.inv_diag.len())
            .map(|i| format!("inv_metric[{i}]"))
            .collect()
    }

    fn params(&self) -> Vec<f64> {
        self.inv_diag.iter().copied().collect()
    }
}

/// A dense inverse mass matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseMetric {
    inv: DMatrix<f64>,
    /// `L'^-1` for the Cholesky factor `M^-1 = L L'`. Maps `N(0, I)` draws to `N(0, M)`.
    momentum_factor: DMatrix<f64>,
}

impl DenseMetric {
    /// Fails unless `inv` is square, symmetric and positive definite.
    pub fn new(inv: DMatrix<f64>) -> HmcResult<Self> {
        if inv.nrows() != inv.ncols() {
            return Err(HmcError::DimensionMismatch {
                expected: inv.nrows(),
                found: inv.ncols(),
            });
        }
        let scale = inv.abs().max().max(1.0);
        if (&inv - inv.transpose()).abs().max() > SYMMETRY_TOLERANCE * scale {
            return Err(HmcError::NotSymmetric);
        }
        let n = inv.nrows();
        let l = inv
            .clone()
            .cholesky()
            .ok_or(HmcError::NotPositiveDefinite)?
            .l();
        let momentum_factor = l
            .transpose()
            .solve_upper_triangular(&DMatrix::identity(n, n))
            .ok_or(HmcError::NotPositiveDefinite)?;
        Ok(Self {
            inv,
            momentum_factor,
        })
    }

    pub fn identity(dim: usize) -> Self {
        Self {
            inv: DMatrix::identity(dim, dim),
            momentum_factor: DMatrix::identity(dim, dim),
        }
    }

    pub fn inv(&self) -> &DMatrix<f64> {
        &self.inv
    }
}

impl Metric for DenseMetric {
    fn dim(&self) -> usize {
        self.inv.nrows()
    }

    fn kinetic_energy(&self, p: &DVector<f64>) -> f64 {
        0.5 * p.dot(&(&self.inv * p))
    }

    fn velocity(&self, p: &DVector<f64>) -> DVector<f64> {
        &self.inv * p
    }

    fn sample_momentum<R: Rng + ?Sized>(&self, p: &mut DVector<f64>, rng: &mut R) {
        let mut u = DVector::zeros(p.len());
        fill_standard_normal(&mut u, rng);
        p.gemv(1.0, &self.momentum_factor, &u, 0.0);
    }

    fn write_metric(&self, writer: &mut dyn Writer) -> io::Result<()> {
        writer.message("Elements of inverse mass matrix:")?;
        for row in self.inv.row_iter() {
            let row: Vec<f64> = row.iter().copied().collect();
            writer.message(&join_values(&row))?;
        }
        Ok(())
    }

    fn param_names(&self) -> Vec<String> {
        let n = self.inv.nrows();
        (0..n)
            .flat_map(|i| (0..=i).map(move |j| format!("inv_metric[{i},{j}]")))
            .collect()
    }

    fn params(&self) -> Vec<f64> {
        let n = self.inv.nrows();
        (0..n)
            .flat_map(|i| (0..=i).map(move |j| (i, j)))
            .map(|(i, j)| self.inv[(i, j)])
            .collect()
    }
}
