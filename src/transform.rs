/*!
# Constraint Transforms

Bijections between constrained parameters and the unconstrained vector the sampler works on.

[`UnconstrainingWriter`] validates constrained values and appends their unconstrained
representation. [`ConstrainingReader`] walks an unconstrained slice in the same order, maps
each piece back and accumulates the log absolute Jacobian determinant of the constraining
map into [`ConstrainingReader::lp`].

| Constraint | Unconstrained value |
|---|---|
| `x > lb` | `ln(x - lb)` |
| `x < ub` | `ln(ub - x)` |
| `lb < x < ub` | `logit((x - lb) / (ub - lb))` |
| offset / multiplier | `(x - offset) / multiplier` |
| correlation in `(-1, 1)` | `atanh(x)` |
| probability in `(0, 1)` | `logit(x)` |
| ordered | `x[0]`, then `ln(x[k] - x[k-1])` |
| positive ordered | `ln(x[0])`, then `ln(x[k] - x[k-1])` |
| unit vector | `x` |
| simplex of size `K` | `K - 1` stick-breaking logits |
| covariance matrix | Cholesky factor, log of its diagonal |

## Example

```rust
use adaptive_hmc::transform::{ConstrainingReader, UnconstrainingWriter};
use nalgebra::DVector;

let mut writer = UnconstrainingWriter::new();
writer.scalar_lb(3.0, 1.0).unwrap();
writer.simplex(&DVector::from_vec(vec![0.2, 0.3, 0.5])).unwrap();
assert_eq!(writer.data().len(), 3);

let mut reader = ConstrainingReader::new(writer.data());
let sigma = reader.scalar_lb(1.0).unwrap();
let theta = reader.simplex(3).unwrap();
assert!((sigma - 3.0).abs() < 1e-12);
assert!((theta.sum() - 1.0).abs() < 1e-12);
assert_eq!(reader.available(), 0);
```
*/

use crate::error::ConstraintError;
use nalgebra::{DMatrix, DVector};

/// Tolerance for sum-to-one and unit-norm checks.
pub const CONSTRAINT_TOLERANCE: f64 = 1e-8;

pub type ConstraintResult<T> = Result<T, ConstraintError>;

fn logit(u: f64) -> f64 {
    (u / (1.0 - u)).ln()
}

fn inv_logit(y: f64) -> f64 {
    if y < 0.0 {
        let e = y.exp();
        e / (1.0 + e)
    } else {
        1.0 / (1.0 + (-y).exp())
    }
}

/// `ln(1 + exp(a))` without overflow.
fn log1p_exp(a: f64) -> f64 {
    if a > 0.0 {
        a + (-a).exp().ln_1p()
    } else {
        a.exp().ln_1p()
    }
}

/// `ln(inv_logit(y)) + ln(1 - inv_logit(y))`, the log derivative of `inv_logit`.
fn log_inv_logit_jacobian(y: f64) -> f64 {
    -log1p_exp(-y) - log1p_exp(y)
}

fn check_bounds(value: f64, lb: f64, ub: f64) -> ConstraintResult<()> {
    if value >= lb && value <= ub {
        Ok(())
    } else {
        Err(ConstraintError::OutOfBounds { value, lb, ub })
    }
}

fn check_scale(multiplier: f64) -> ConstraintResult<()> {
    if multiplier > 0.0 && multiplier.is_finite() {
        Ok(())
    } else {
        Err(ConstraintError::InvalidScale(multiplier))
    }
}

fn is_ascending(x: &DVector<f64>) -> bool {
    x.as_slice().windows(2).all(|w| w[1] > w[0])
}

/// Appends unconstrained values. Every method validates its input first and leaves the
/// buffer untouched on error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnconstrainingWriter {
    data: Vec<f64>,
}

impl UnconstrainingWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f64> {
        self.data
    }

    pub fn into_vector(self) -> DVector<f64> {
        DVector::from_vec(self.data)
    }

    pub fn scalar(&mut self, x: f64) -> ConstraintResult<()> {
        self.data.push(x);
        Ok(())
    }

    pub fn scalar_pos(&mut self, x: f64) -> ConstraintResult<()> {
        if !(x >= 0.0) {
            return Err(ConstraintError::Negative(x));
        }
        self.data.push(x.ln());
        Ok(())
    }

    pub fn scalar_lb(&mut self, x: f64, lb: f64) -> ConstraintResult<()> {
        if lb == f64::NEG_INFINITY {
            return self.scalar(x);
        }
        check_bounds(x, lb, f64::INFINITY)?;
        self.data.push((x - lb).ln());
        Ok(())
    }

    pub fn scalar_ub(&mut self, x: f64, ub: f64) -> ConstraintResult<()> {
        if ub == f64::INFINITY {
            return self.scalar(x);
        }
        check_bounds(x, f64::NEG_INFINITY, ub)?;
        self.data.push((ub - x).ln());
        Ok(())
    }

    pub fn scalar_lub(&mut self, x: f64, lb: f64, ub: f64) -> ConstraintResult<()> {
        match (lb == f64::NEG_INFINITY, ub == f64::INFINITY) {
            (true, true) => self.scalar(x),
            (true, false) => self.scalar_ub(x, ub),
            (false, true) => self.scalar_lb(x, lb),
            (false, false) => {
                check_bounds(x, lb, ub)?;
                self.data.push(logit((x - lb) / (ub - lb)));
                Ok(())
            }
        }
    }

    pub fn scalar_offset_multiplier(
        &mut self,
        x: f64,
        offset: f64,
        multiplier: f64,
    ) -> ConstraintResult<()> {
        check_scale(multiplier)?;
        self.data.push((x - offset) / multiplier);
        Ok(())
    }

    pub fn corr(&mut self, x: f64) -> ConstraintResult<()> {
        check_bounds(x, -1.0, 1.0)?;
        self.data.push(x.atanh());
        Ok(())
    }

    pub fn prob(&mut self, x: f64) -> ConstraintResult<()> {
        check_bounds(x, 0.0, 1.0)?;
        self.data.push(logit(x));
        Ok(())
    }

    pub fn vector(&mut self, x: &DVector<f64>) -> ConstraintResult<()> {
        self.data.extend(x.iter());
        Ok(())
    }

    pub fn vector_lb(&mut self, x: &DVector<f64>, lb: f64) -> ConstraintResult<()> {
        if lb != f64::NEG_INFINITY {
            for &xi in x.iter() {
                check_bounds(xi, lb, f64::INFINITY)?;
            }
        }
        for &xi in x.iter() {
            self.scalar_lb(xi, lb)?;
        }
        Ok(())
    }

    pub fn vector_ub(&mut self, x: &DVector<f64>, ub: f64) -> ConstraintResult<()> {
        if ub != f64::INFINITY {
            for &xi in x.iter() {
                check_bounds(xi, f64::NEG_INFINITY, ub)?;
            }
        }
        for &xi in x.iter() {
            self.scalar_ub(xi, ub)?;
        }
        Ok(())
    }

    pub fn vector_lub(&mut self, x: &DVector<f64>, lb: f64, ub: f64) -> ConstraintResult<()> {
        for &xi in x.iter() {
            check_bounds(xi, lb, ub)?;
        }
        for &xi in x.iter() {
            self.scalar_lub(xi, lb, ub)?;
        }
        Ok(())
    }

    pub fn ordered(&mut self, x: &DVector<f64>) -> ConstraintResult<()> {
        if !is_ascending(x) {
            return Err(ConstraintError::NotOrdered);
        }
        if let Some(&first) = x.iter().next() {
            self.data.push(first);
        }
        self.push_log_diffs(x);
        Ok(())
    }

    pub fn positive_ordered(&mut self, x: &DVector<f64>) -> ConstraintResult<()> {
        if !is_ascending(x) || x.iter().next().is_some_and(|&first| !(first >= 0.0)) {
            return Err(ConstraintError::NotPositiveOrdered);
        }
        if let Some(&first) = x.iter().next() {
            self.data.push(first.ln());
        }
        self.push_log_diffs(x);
        Ok(())
    }

    fn push_log_diffs(&mut self, x: &DVector<f64>) {
        self.data
            .extend(x.as_slice().windows(2).map(|w| (w[1] - w[0]).ln()));
    }

    pub fn unit_vector(&mut self, x: &DVector<f64>) -> ConstraintResult<()> {
        let squared_norm = x.norm_squared();
        if x.is_empty() || (1.0 - squared_norm).abs() > CONSTRAINT_TOLERANCE {
            return Err(ConstraintError::NotUnitVector { squared_norm });
        }
        self.data.extend(x.iter());
        Ok(())
    }

    /// Writes `K - 1` values for a simplex of size `K`.
    pub fn simplex(&mut self, x: &DVector<f64>) -> ConstraintResult<()> {
        let sum = x.sum();
        if x.is_empty()
            || x.iter().any(|&xi| !(xi >= 0.0))
            || (1.0 - sum).abs() > CONSTRAINT_TOLERANCE
        {
            return Err(ConstraintError::NotSimplex { sum });
        }

        let km1 = x.len() - 1;
        let mut y = vec![0.0; km1];
        let mut stick_len = x[km1];
        for k in (0..km1).rev() {
            stick_len += x[k];
            let z_k = x[k] / stick_len;
            y[k] = logit(z_k) + ((km1 - k) as f64).ln();
        }
        self.data.extend(y);
        Ok(())
    }

    /// Writes `K (K + 1) / 2` values: per row of the Cholesky factor, the entries left of
    /// the diagonal followed by the log of the diagonal entry.
    pub fn cov_matrix(&mut self, x: &DMatrix<f64>) -> ConstraintResult<()> {
        let k = x.nrows();
        if k == 0 || x.ncols() != k {
            return Err(ConstraintError::NotSquare {
                rows: x.nrows(),
                cols: x.ncols(),
            });
        }
        if (x - x.transpose()).abs().max() > CONSTRAINT_TOLERANCE {
            return Err(ConstraintError::NotPositiveDefinite);
        }
        let l = x
            .clone()
            .cholesky()
            .ok_or(ConstraintError::NotPositiveDefinite)?
            .l();
        for m in 0..k {
            for n in 0..m {
                self.data.push(l[(m, n)]);
            }
            self.data.push(l[(m, m)].ln());
        }
        Ok(())
    }
}

/// Reads constrained values back from an unconstrained slice, in the order they were
/// written.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstrainingReader<'a> {
    data: &'a [f64],
    pos: usize,
    lp: f64,
}

impl<'a> ConstrainingReader<'a> {
    pub fn new(data: &'a [f64]) -> Self {
        Self { data, pos: 0, lp: 0.0 }
    }

    /// Accumulated log absolute Jacobian determinant.
    pub fn lp(&self) -> f64 {
        self.lp
    }

    /// Unconstrained values not yet read.
    pub fn available(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n: usize) -> ConstraintResult<&'a [f64]> {
        if n > self.available() {
            return Err(ConstraintError::Exhausted {
                requested: n,
                available: self.available(),
            });
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn next_value(&mut self) -> ConstraintResult<f64> {
        Ok(self.take(1)?[0])
    }

    pub fn scalar(&mut self) -> ConstraintResult<f64> {
        self.next_value()
    }

    pub fn scalar_pos(&mut self) -> ConstraintResult<f64> {
        let y = self.next_value()?;
        self.lp += y;
        Ok(y.exp())
    }

    pub fn scalar_lb(&mut self, lb: f64) -> ConstraintResult<f64> {
        let y = self.next_value()?;
        if lb == f64::NEG_INFINITY {
            return Ok(y);
        }
        self.lp += y;
        Ok(lb + y.exp())
    }

    pub fn scalar_ub(&mut self, ub: f64) -> ConstraintResult<f64> {
        let y = self.next_value()?;
        if ub == f64::INFINITY {
            return Ok(y);
        }
        self.lp += y;
        Ok(ub - y.exp())
    }

    pub fn scalar_lub(&mut self, lb: f64, ub: f64) -> ConstraintResult<f64> {
        match (lb == f64::NEG_INFINITY, ub == f64::INFINITY) {
            (true, true) => self.scalar(),
            (true, false) => self.scalar_ub(ub),
            (false, true) => self.scalar_lb(lb),
            (false, false) => {
                let y = self.next_value()?;
                self.lp += (ub - lb).ln() + log_inv_logit_jacobian(y);
                Ok(lb + (ub - lb) * inv_logit(y))
            }
        }
    }

    pub fn scalar_offset_multiplier(&mut self, offset: f64, multiplier: f64) -> ConstraintResult<f64> {
        check_scale(multiplier)?;
        let y = self.next_value()?;
        self.lp += multiplier.ln();
        Ok(offset + multiplier * y)
    }

    pub fn corr(&mut self) -> ConstraintResult<f64> {
        let y = self.next_value()?;
        let x = y.tanh();
        self.lp += (1.0 - x * x).ln();
        Ok(x)
    }

    pub fn prob(&mut self) -> ConstraintResult<f64> {
        let y = self.next_value()?;
        self.lp += log_inv_logit_jacobian(y);
        Ok(inv_logit(y))
    }

    pub fn vector(&mut self, n: usize) -> ConstraintResult<DVector<f64>> {
        Ok(DVector::from_row_slice(self.take(n)?))
    }

    pub fn vector_lb(&mut self, lb: f64, n: usize) -> ConstraintResult<DVector<f64>> {
        self.check_available(n)?;
        let x: Vec<f64> = (0..n).map(|_| self.scalar_lb(lb)).collect::<Result<_, _>>()?;
        Ok(DVector::from_vec(x))
    }

    pub fn vector_ub(&mut self, ub: f64, n: usize) -> ConstraintResult<DVector<f64>> {
        self.check_available(n)?;
        let x: Vec<f64> = (0..n).map(|_| self.scalar_ub(ub)).collect::<Result<_, _>>()?;
        Ok(DVector::from_vec(x))
    }

    pub fn vector_lub(&mut self, lb: f64, ub: f64, n: usize) -> ConstraintResult<DVector<f64>> {
        self.check_available(n)?;
        let x: Vec<f64> = (0..n)
            .map(|_| self.scalar_lub(lb, ub))
            .collect::<Result<_, _>>()?;
        Ok(DVector::from_vec(x))
    }

    fn check_available(&self, n: usize) -> ConstraintResult<()> {
        if n > self.available() {
            Err(ConstraintError::Exhausted {
                requested: n,
                available: self.available(),
            })
        } else {
            Ok(())
        }
    }

    pub fn ordered(&mut self, n: usize) -> ConstraintResult<DVector<f64>> {
        let y = self.take(n)?;
        let mut x = DVector::zeros(n);
        for (k, &yk) in y.iter().enumerate() {
            x[k] = if k == 0 { yk } else { x[k - 1] + yk.exp() };
        }
        self.lp += y.iter().skip(1).sum::<f64>();
        Ok(x)
    }

    pub fn positive_ordered(&mut self, n: usize) -> ConstraintResult<DVector<f64>> {
        let y = self.take(n)?;
        let mut x = DVector::zeros(n);
        for (k, &yk) in y.iter().enumerate() {
            x[k] = if k == 0 { yk.exp() } else { x[k - 1] + yk.exp() };
        }
        self.lp += y.iter().sum::<f64>();
        Ok(x)
    }

    pub fn unit_vector(&mut self, n: usize) -> ConstraintResult<DVector<f64>> {
        let y = DVector::from_row_slice(self.take(n)?);
        let squared_norm = y.norm_squared();
        if !(squared_norm > 0.0) {
            return Err(ConstraintError::NotUnitVector { squared_norm });
        }
        self.lp -= 0.5 * squared_norm;
        Ok(&y / squared_norm.sqrt())
    }

    /// Reads `k - 1` values into a simplex of size `k`.
    pub fn simplex(&mut self, k: usize) -> ConstraintResult<DVector<f64>> {
        if k == 0 {
            return Err(ConstraintError::NotSimplex { sum: 0.0 });
        }
        let km1 = k - 1;
        let y = self.take(km1)?;
        let mut x = DVector::zeros(k);
        let mut stick_len = 1.0;
        for (i, &yi) in y.iter().enumerate() {
            let adj_y = yi - ((km1 - i) as f64).ln();
            x[i] = stick_len * inv_logit(adj_y);
            self.lp += stick_len.ln() - log1p_exp(-adj_y) - log1p_exp(adj_y);
            stick_len -= x[i];
        }
        x[km1] = stick_len;
        Ok(x)
    }

    /// Reads `k (k + 1) / 2` values into a `k x k` covariance matrix.
    pub fn cov_matrix(&mut self, k: usize) -> ConstraintResult<DMatrix<f64>> {
        if k == 0 {
            return Err(ConstraintError::NotSquare { rows: 0, cols: 0 });
        }
        let y = self.take(k * (k + 1) / 2)?;
        let mut l = DMatrix::zeros(k, k);
        let mut i = 0;
        for m in 0..k {
            for n in 0..m {
                l[(m, n)] = y[i];
                i += 1;
            }
            l[(m, m)] = y[i].exp();
            i += 1;
        }

        self.lp += k as f64 * std::f64::consts::LN_2;
        for j in 0..k {
            self.lp += (k - j + 1) as f64 * l[(j, j)].ln();
        }
        Ok(&l * l.transpose())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Log of the numerical derivative of a scalar constraining map.
    fn numeric_log_jacobian(f: impl Fn(f64) -> f64, y: f64) -> f64 {
        let h = 1e-6;
        ((f(y + h) - f(y - h)) / (2.0 * h)).abs().ln()
    }

    /// Reads one value from `y` and compares both the value and the accumulated log
    /// Jacobian with `constrain`.
    fn check_scalar(read: fn(&mut ConstrainingReader) -> f64, constrain: fn(f64) -> f64) {
        let y = 0.37;
        let data = [y];
        let mut reader = ConstrainingReader::new(&data);
        let x = read(&mut reader);
        assert_relative_eq!(x, constrain(y), epsilon = 1e-12);
        assert_relative_eq!(reader.lp(), numeric_log_jacobian(constrain, y), epsilon = 1e-6);
    }

    #[test]
    fn scalar_jacobians_match_derivatives() {
        check_scalar(
            |r| r.scalar_lub(-1.0, 2.0).unwrap(),
            |y| -1.0 + 3.0 * inv_logit(y),
        );
        check_scalar(|r| r.scalar_lb(1.0).unwrap(), |y| 1.0 + y.exp());
        check_scalar(|r| r.scalar_ub(1.0).unwrap(), |y| 1.0 - y.exp());
        check_scalar(|r| r.scalar_pos().unwrap(), f64::exp);
        check_scalar(|r| r.corr().unwrap(), f64::tanh);
        check_scalar(|r| r.prob().unwrap(), inv_logit);
        check_scalar(
            |r| r.scalar_offset_multiplier(2.0, 0.5).unwrap(),
            |y| 2.0 + 0.5 * y,
        );
    }

    #[test]
    fn bounds_violations_are_reported() {
        let mut w = UnconstrainingWriter::new();
        assert_eq!(w.scalar_pos(-1.0), Err(ConstraintError::Negative(-1.0)));
        assert_eq!(
            w.scalar_lub(3.0, 0.0, 1.0),
            Err(ConstraintError::OutOfBounds {
                value: 3.0,
                lb: 0.0,
                ub: 1.0
            })
        );
        assert!(w.corr(1.5).is_err());
        assert!(w.prob(-0.1).is_err());
        assert_eq!(
            w.scalar_offset_multiplier(1.0, 0.0, 0.0),
            Err(ConstraintError::InvalidScale(0.0))
        );
        // Nothing is written on failure, not even the valid prefix of a vector.
        assert!(w
            .vector_lb(&DVector::from_vec(vec![2.0, 0.5]), 1.0)
            .is_err());
        assert!(w.data().is_empty());
    }

    #[test]
    fn ordered_vectors_round_trip() {
        let x = DVector::from_vec(vec![-1.0, 0.5, 0.75, 3.0]);
        let mut w = UnconstrainingWriter::new();
        w.ordered(&x).unwrap();
        w.positive_ordered(&DVector::from_vec(vec![0.1, 0.2, 5.0])).unwrap();
        assert_eq!(w.data()[0], -1.0);
        assert_relative_eq!(w.data()[4], 0.1f64.ln(), epsilon = 1e-14);

        let mut r = ConstrainingReader::new(w.data());
        assert_relative_eq!(r.ordered(4).unwrap(), x, epsilon = 1e-12);
        let lp_after_ordered = r.lp();
        assert_relative_eq!(
            lp_after_ordered,
            (1.5f64).ln() + (0.25f64).ln() + (2.25f64).ln(),
            epsilon = 1e-12
        );
        assert_relative_eq!(
            r.positive_ordered(3).unwrap(),
            DVector::from_vec(vec![0.1, 0.2, 5.0]),
            epsilon = 1e-12
        );

        assert_eq!(
            w.ordered(&DVector::from_vec(vec![1.0, 1.0])),
            Err(ConstraintError::NotOrdered)
        );
        assert_eq!(
            w.positive_ordered(&DVector::from_vec(vec![-0.5, 1.0])),
            Err(ConstraintError::NotPositiveOrdered)
        );
    }

    #[test]
    fn simplex_round_trip() {
        let x = DVector::from_vec(vec![0.1, 0.6, 0.05, 0.25]);
        let mut w = UnconstrainingWriter::new();
        w.simplex(&x).unwrap();
        assert_eq!(w.data().len(), 3);

        let mut r = ConstrainingReader::new(w.data());
        let back = r.simplex(4).unwrap();
        assert_relative_eq!(back, x, epsilon = 1e-12);
        assert!(r.lp().is_finite());

        // The uniform simplex maps to the origin.
        let mut w = UnconstrainingWriter::new();
        w.simplex(&DVector::from_element(5, 0.2)).unwrap();
        assert!(w.data().iter().all(|y| y.abs() < 1e-12));

        assert!(matches!(
            UnconstrainingWriter::new().simplex(&DVector::from_vec(vec![0.5, 0.6])),
            Err(ConstraintError::NotSimplex { .. })
        ));
    }

    #[test]
    fn unit_vector_round_trip() {
        let x = DVector::from_vec(vec![0.6, 0.0, -0.8]);
        let mut w = UnconstrainingWriter::new();
        w.unit_vector(&x).unwrap();
        let mut r = ConstrainingReader::new(w.data());
        assert_relative_eq!(r.unit_vector(3).unwrap(), x, epsilon = 1e-12);
        assert_relative_eq!(r.lp(), -0.5, epsilon = 1e-12);

        assert!(matches!(
            w.unit_vector(&DVector::from_vec(vec![1.0, 1.0])),
            Err(ConstraintError::NotUnitVector { .. })
        ));
    }

    #[test]
    fn cov_matrix_round_trip() {
        let x = DMatrix::from_row_slice(3, 3, &[4.0, 1.0, 0.5, 1.0, 2.0, 0.3, 0.5, 0.3, 1.5]);
        let mut w = UnconstrainingWriter::new();
        w.cov_matrix(&x).unwrap();
        assert_eq!(w.data().len(), 6);
        assert_relative_eq!(w.data()[0], 2.0f64.ln(), epsilon = 1e-12);

        let mut r = ConstrainingReader::new(w.data());
        assert_relative_eq!(r.cov_matrix(3).unwrap(), x, epsilon = 1e-10);

        assert_eq!(
            w.cov_matrix(&DMatrix::zeros(2, 3)),
            Err(ConstraintError::NotSquare { rows: 2, cols: 3 })
        );
        assert_eq!(
            w.cov_matrix(&DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 1.0])),
            Err(ConstraintError::NotPositiveDefinite)
        );
    }

    #[test]
    fn bounded_vectors_round_trip() {
        let x = DVector::from_vec(vec![0.2, 0.9, 0.5]);
        let mut w = UnconstrainingWriter::new();
        w.vector(&x).unwrap();
        w.vector_lb(&x, 0.0).unwrap();
        w.vector_ub(&x, 1.0).unwrap();
        w.vector_lub(&x, 0.0, 1.0).unwrap();

        let mut r = ConstrainingReader::new(w.data());
        assert_eq!(r.vector(3).unwrap(), x);
        assert_relative_eq!(r.vector_lb(0.0, 3).unwrap(), x, epsilon = 1e-12);
        assert_relative_eq!(r.vector_ub(1.0, 3).unwrap(), x, epsilon = 1e-12);
        assert_relative_eq!(r.vector_lub(0.0, 1.0, 3).unwrap(), x, epsilon = 1e-12);
        assert!(r.vector(1).is_err());
    }
}
