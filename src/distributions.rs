/*!
# Target Distributions

A handful of ready-made [`Model`] targets. They are useful for trying out the sampler and
serve as the reference densities in this crate's tests.

All log densities are unnormalized.

## Example

```rust
use adaptive_hmc::distributions::IsotropicGaussian;
use adaptive_hmc::model::Model;
use nalgebra::DVector;

let target = IsotropicGaussian::new(DVector::from_vec(vec![1.0, -1.0]), 2.0);
let q = DVector::from_vec(vec![1.0, -1.0]);
assert_eq!(target.log_density(&q).unwrap(), 0.0);
```
*/

use crate::error::{DomainError, HmcError, HmcResult};
use crate::model::Model;
use nalgebra::{DMatrix, DVector};

/// Standard normal in `dim` dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StandardNormal {
    pub dim: usize,
}

impl StandardNormal {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

impl Model for StandardNormal {
    fn dim(&self) -> usize {
        self.dim
    }

    fn log_density_and_grad(
        &self,
        q: &DVector<f64>,
        grad: &mut DVector<f64>,
    ) -> Result<f64, DomainError> {
        grad.copy_from(q);
        grad.neg_mut();
        Ok(-0.5 * q.norm_squared())
    }
}

/**
An isotropic Gaussian with mean `mean` and the same standard deviation `std` in every
coordinate.

```rust
use adaptive_hmc::distributions::IsotropicGaussian;
use adaptive_hmc::model::Model;
use nalgebra::DVector;

let target = IsotropicGaussian::new(DVector::zeros(3), 3.0);
let grad = target.gradient(&DVector::from_vec(vec![9.0, 0.0, -9.0])).unwrap();
assert_eq!(grad.as_slice(), &[-1.0, 0.0, 1.0]);
```
*/
#[derive(Debug, Clone, PartialEq)]
pub struct IsotropicGaussian {
    pub mean: DVector<f64>,
    pub std: f64,
}

impl IsotropicGaussian {
    pub fn new(mean: DVector<f64>, std: f64) -> Self {
        Self { mean, std }
    }
}

impl Model for IsotropicGaussian {
    fn dim(&self) -> usize {
        self.mean.len()
    }

    fn log_density_and_grad(
        &self,
        q: &DVector<f64>,
        grad: &mut DVector<f64>,
    ) -> Result<f64, DomainError> {
        let var = self.std * self.std;
        let diff = q - &self.mean;
        grad.copy_from(&diff);
        *grad /= -var;
        Ok(-0.5 * diff.norm_squared() / var)
    }
}

/// A multivariate Gaussian with full covariance.
///
/// The precision matrix is computed once on construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Gaussian {
    pub mean: DVector<f64>,
    pub cov: DMatrix<f64>,
    precision: DMatrix<f64>,
}

impl Gaussian {
    /// Fails if `cov` is not square with the same size as `mean`, or if it is not
    /// positive definite.
    pub fn new(mean: DVector<f64>, cov: DMatrix<f64>) -> HmcResult<Self> {
        if cov.nrows() != mean.len() || cov.ncols() != mean.len() {
            return Err(HmcError::DimensionMismatch {
                expected: mean.len(),
                found: cov.nrows().max(cov.ncols()),
            });
        }
        let precision = cov
            .clone()
            .cholesky()
            .ok_or(HmcError::NotPositiveDefinite)?
            .inverse();
        Ok(Self {
            mean,
            cov,
            precision,
        })
    }

    pub fn precision(&self) -> &DMatrix<f64> {
        &self.precision
    }
}

impl Model for Gaussian {
    fn dim(&self) -> usize {
        self.mean.len()
    }

    fn log_density_and_grad(
        &self,
        q: &DVector<f64>,
        grad: &mut DVector<f64>,
    ) -> Result<f64, DomainError> {
        let diff = q - &self.mean;
        let scaled = &self.precision * &diff;
        let lp = -0.5 * diff.dot(&scaled);
        grad.copy_from(&scaled);
        grad.neg_mut();
        Ok(lp)
    }
}

/// The banana-shaped Rosenbrock density `-((a - x)^2 + b (y - x^2)^2)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rosenbrock2D {
    pub a: f64,
    pub b: f64,
}

impl Model for Rosenbrock2D {
    fn dim(&self) -> usize {
        2
    }

    fn log_density_and_grad(
        &self,
        q: &DVector<f64>,
        grad: &mut DVector<f64>,
    ) -> Result<f64, DomainError> {
        let (x, y) = (q[0], q[1]);
        let r = y - x * x;
        grad[0] = 2.0 * (self.a - x) + 4.0 * self.b * x * r;
        grad[1] = -2.0 * self.b * r;
        Ok(-((self.a - x).powi(2) + self.b * r * r))
    }
}

/// A one dimensional half-normal with scale `sigma`, supported on `[0, inf)`.
///
/// Positions below zero are reported as a [`DomainError`], which makes this a convenient
/// target for exercising divergence handling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HalfNormal {
    pub sigma: f64,
}

impl Model for HalfNormal {
    fn dim(&self) -> usize {
        1
    }

    fn log_density_and_grad(
        &self,
        q: &DVector<f64>,
        grad: &mut DVector<f64>,
    ) -> Result<f64, DomainError> {
        let x = q[0];
        if x < 0.0 {
            return Err(DomainError(format!(
                "half-normal variate must be non-negative, found {x}"
            )));
        }
        let var = self.sigma * self.sigma;
        grad[0] = -x / var;
        Ok(-0.5 * x * x / var)
    }
}

/// The improper uniform density on all of `R^dim`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flat {
    pub dim: usize,
}

impl Model for Flat {
    fn dim(&self) -> usize {
        self.dim
    }

    fn log_density_and_grad(
        &self,
        _q: &DVector<f64>,
        grad: &mut DVector<f64>,
    ) -> Result<f64, DomainError> {
        grad.fill(0.0);
        Ok(0.0)
    }
}
