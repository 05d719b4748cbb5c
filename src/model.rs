//! The target density the sampler draws from.

use crate::error::DomainError;
use nalgebra::DVector;

/// A log density over an unconstrained parameter vector, together with its gradient.
///
/// Implement this trait for your model. The sampler only ever reads from a model, so a
/// single instance can be shared between chains behind an `Arc`.
///
/// # Example
///
/// ```rust
/// use adaptive_hmc::error::DomainError;
/// use adaptive_hmc::model::Model;
/// use nalgebra::DVector;
///
/// /// Exponential(1) on the log scale, including the Jacobian of exp().
/// struct LogExponential;
///
/// impl Model for LogExponential {
///     fn dim(&self) -> usize {
///         1
///     }
///
///     fn log_density_and_grad(
///         &self,
///         q: &DVector<f64>,
///         grad: &mut DVector<f64>,
///     ) -> Result<f64, DomainError> {
///         grad[0] = 1.0 - q[0].exp();
///         Ok(q[0] - q[0].exp())
///     }
/// }
///
/// let lp = LogExponential.log_density(&DVector::from_vec(vec![0.0])).unwrap();
/// assert_eq!(lp, -1.0);
/// ```
pub trait Model {
    /// Number of unconstrained parameters.
    fn dim(&self) -> usize;

    /// Returns the (unnormalized) log density at `q` and writes its gradient into `grad`.
    ///
    /// `grad` has length [`Model::dim`]. Return a [`DomainError`] when `q` lies outside
    /// the support of the density.
    fn log_density_and_grad(
        &self,
        q: &DVector<f64>,
        grad: &mut DVector<f64>,
    ) -> Result<f64, DomainError>;

    fn log_density(&self, q: &DVector<f64>) -> Result<f64, DomainError> {
        let mut grad = DVector::zeros(q.len());
        self.log_density_and_grad(q, &mut grad)
    }

    fn gradient(&self, q: &DVector<f64>) -> Result<DVector<f64>, DomainError> {
        let mut grad = DVector::zeros(q.len());
        self.log_density_and_grad(q, &mut grad)?;
        Ok(grad)
    }
}
