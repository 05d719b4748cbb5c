/*!
# Warmup Adaptation

Online tuning of the step size and the metric during warmup.

- [`StepsizeAdaptation`] runs Nesterov dual averaging on the acceptance statistic.
- [`WindowedAdaptation`] schedules metric estimation into an initial fast buffer, a series
  of doubling slow windows and a terminal fast buffer.
- [`VarAdaptation`] and [`CovarAdaptation`] estimate a diagonal or dense inverse metric
  from the draws of each slow window. [`FixedMetric`] never updates.

```text
|<- init_buffer ->|<- w ->|<-- 2w -->|<---- 4w ---->|<- term_buffer ->|
```
*/

use crate::metric::{DenseMetric, DiagMetric, Metric};
use crate::settings::AdaptSettings;
use log::{info, warn};
use nalgebra::{DMatrix, DVector};

/// Dual-averaging step-size adaptation.
#[derive(Debug, Clone, PartialEq)]
pub struct StepsizeAdaptation {
    counter: f64,
    s_bar: f64,
    x_bar: f64,
    mu: f64,
    delta: f64,
    gamma: f64,
    kappa: f64,
    t0: f64,
}

impl Default for StepsizeAdaptation {
    fn default() -> Self {
        Self::new(0.8, 0.05, 0.75, 10.0)
    }
}

impl StepsizeAdaptation {
    /// `delta` is the target acceptance statistic, `gamma` the shrinkage towards `mu`,
    /// `kappa` the decay of the iterate averaging and `t0` the early-iteration damping.
    pub fn new(delta: f64, gamma: f64, kappa: f64, t0: f64) -> Self {
        Self {
            counter: 0.0,
            s_bar: 0.0,
            x_bar: 0.0,
            mu: 0.5,
            delta,
            gamma,
            kappa,
            t0,
        }
    }

    pub fn from_settings(settings: &AdaptSettings) -> Self {
        Self::new(settings.delta, settings.gamma, settings.kappa, settings.t0)
    }

    pub fn restart(&mut self) {
        self.counter = 0.0;
        self.s_bar = 0.0;
        self.x_bar = 0.0;
    }

    /// The log step size iterates are shrunk towards. Usually `ln(10 * epsilon)`.
    pub fn set_mu(&mut self, mu: f64) {
        self.mu = mu;
    }

    pub fn mu(&self) -> f64 {
        self.mu
    }

    pub fn delta(&self) -> f64 {
        self.delta
    }

    /// Updates the running averages with one acceptance statistic and returns the next step
    /// size. Statistics above 1 are clipped.
    pub fn learn_stepsize(&mut self, adapt_stat: f64) -> f64 {
        self.counter += 1.0;
        let adapt_stat = adapt_stat.min(1.0);

        let eta = 1.0 / (self.counter + self.t0);
        self.s_bar = (1.0 - eta) * self.s_bar + eta * (self.delta - adapt_stat);

        let x = self.mu - self.s_bar * self.counter.sqrt() / self.gamma;
        let x_eta = self.counter.powf(-self.kappa);
        self.x_bar = (1.0 - x_eta) * self.x_bar + x_eta * x;

        x.exp()
    }

    /// The averaged step size, or `None` if nothing has been learned since the last restart.
    pub fn complete_adaptation(&self) -> Option<f64> {
        if self.counter == 0.0 {
            None
        } else {
            Some(self.x_bar.exp())
        }
    }
}

/// Running mean and per-coordinate variance.
#[derive(Debug, Clone, PartialEq)]
pub struct WelfordVarEstimator {
    num_samples: usize,
    mean: DVector<f64>,
    m2: DVector<f64>,
}

impl WelfordVarEstimator {
    pub fn new(dim: usize) -> Self {
        Self {
            num_samples: 0,
            mean: DVector::zeros(dim),
            m2: DVector::zeros(dim),
        }
    }

    pub fn restart(&mut self) {
        self.num_samples = 0;
        self.mean.fill(0.0);
        self.m2.fill(0.0);
    }

    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    pub fn add_sample(&mut self, q: &DVector<f64>) {
        self.num_samples += 1;
        let delta = q - &self.mean;
        self.mean.axpy(1.0 / self.num_samples as f64, &delta, 1.0);
        self.m2 += (q - &self.mean).component_mul(&delta);
    }

    pub fn sample_mean(&self) -> &DVector<f64> {
        &self.mean
    }

    /// Unbiased sample variance. Zero with fewer than two samples.
    pub fn sample_variance(&self) -> DVector<f64> {
        if self.num_samples > 1 {
            &self.m2 / (self.num_samples - 1) as f64
        } else {
            DVector::zeros(self.m2.len())
        }
    }
}

/// Running mean and full covariance.
#[derive(Debug, Clone, PartialEq)]
pub struct WelfordCovarEstimator {
    num_samples: usize,
    mean: DVector<f64>,
    m2: DMatrix<f64>,
}

impl WelfordCovarEstimator {
    pub fn new(dim: usize) -> Self {
        Self {
            num_samples: 0,
            mean: DVector::zeros(dim),
            m2: DMatrix::zeros(dim, dim),
        }
    }

    pub fn restart(&mut self) {
        self.num_samples = 0;
        self.mean.fill(0.0);
        self.m2.fill(0.0);
    }

    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    pub fn add_sample(&mut self, q: &DVector<f64>) {
        self.num_samples += 1;
        let delta = q - &self.mean;
        self.mean.axpy(1.0 / self.num_samples as f64, &delta, 1.0);
        self.m2 += (q - &self.mean) * delta.transpose();
    }

    pub fn sample_mean(&self) -> &DVector<f64> {
        &self.mean
    }

    /// Unbiased sample covariance. Zero with fewer than two samples.
    pub fn sample_covariance(&self) -> DMatrix<f64> {
        if self.num_samples > 1 {
            &self.m2 / (self.num_samples - 1) as f64
        } else {
            DMatrix::zeros(self.m2.nrows(), self.m2.ncols())
        }
    }
}

/// Warmups shorter than this get no metric adaptation at all.
const MIN_ADAPTIVE_WARMUP: usize = 20;

/// Schedules the slow adaptation windows within warmup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowedAdaptation {
    enabled: bool,
    num_warmup: usize,
    init_buffer: usize,
    term_buffer: usize,
    base_window: usize,
    counter: usize,
    window_size: usize,
    next_window: usize,
}

impl WindowedAdaptation {
    /// Lays out the windows for `num_warmup` iterations.
    ///
    /// When the buffers and the first window do not fit, falls back to 15% initial buffer,
    /// 10% terminal buffer and the remaining 75% as the first slow window.
    pub fn new(
        estimator_name: &str,
        num_warmup: usize,
        init_buffer: usize,
        term_buffer: usize,
        base_window: usize,
    ) -> Self {
        let mut window = Self {
            enabled: false,
            num_warmup,
            init_buffer: 0,
            term_buffer: 0,
            base_window: 0,
            counter: 0,
            window_size: 0,
            next_window: 0,
        };

        if num_warmup < MIN_ADAPTIVE_WARMUP {
            warn!("No {estimator_name} estimation is performed for num_warmup < {MIN_ADAPTIVE_WARMUP}");
            return window;
        }

        window.enabled = true;
        if init_buffer + base_window + term_buffer > num_warmup {
            window.init_buffer = (0.15 * num_warmup as f64) as usize;
            window.term_buffer = (0.1 * num_warmup as f64) as usize;
            window.base_window = num_warmup - (window.init_buffer + window.term_buffer);
            warn!(
                "There aren't enough warmup iterations to fit the three stages of adaptation \
                 as currently configured. Reducing each adaptation stage to 15%/75%/10% of \
                 the given number of warmup iterations: init_buffer = {}, adapt_window = {}, \
                 term_buffer = {}",
                window.init_buffer, window.base_window, window.term_buffer
            );
        } else {
            window.init_buffer = init_buffer;
            window.term_buffer = term_buffer;
            window.base_window = base_window;
        }
        window.restart();
        window
    }

    pub fn from_settings(estimator_name: &str, num_warmup: usize, settings: &AdaptSettings) -> Self {
        Self::new(
            estimator_name,
            num_warmup,
            settings.init_buffer,
            settings.term_buffer,
            settings.window,
        )
    }

    pub fn restart(&mut self) {
        self.counter = 0;
        self.window_size = self.base_window;
        self.next_window = (self.init_buffer + self.window_size).saturating_sub(1);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Warmup length the windows were laid out for.
    pub fn num_warmup(&self) -> usize {
        self.num_warmup
    }

    pub fn counter(&self) -> usize {
        self.counter
    }

    pub fn init_buffer(&self) -> usize {
        self.init_buffer
    }

    pub fn term_buffer(&self) -> usize {
        self.term_buffer
    }

    pub fn base_window(&self) -> usize {
        self.base_window
    }

    /// Last iteration of the current slow window.
    pub fn next_window(&self) -> usize {
        self.next_window
    }

    /// Whether the current iteration falls inside a slow window.
    pub fn adaptation_window(&self) -> bool {
        self.enabled
            && self.counter >= self.init_buffer
            && self.counter < self.num_warmup - self.term_buffer
            && self.counter != self.num_warmup
    }

    /// Whether the current iteration closes a slow window.
    pub fn end_adaptation_window(&self) -> bool {
        self.enabled && self.counter == self.next_window && self.counter != self.num_warmup
    }

    /// Doubles the window size. The last slow window is stretched to the terminal buffer
    /// when another doubled window would not fit after it.
    pub fn compute_next_window(&mut self) {
        let last = (self.num_warmup - self.term_buffer).saturating_sub(1);
        if self.next_window == last {
            return;
        }

        self.window_size *= 2;
        self.next_window = self.counter + self.window_size;

        if self.next_window != last {
            let next_window_boundary = self.next_window + 2 * self.window_size;
            if next_window_boundary >= self.num_warmup - self.term_buffer {
                self.next_window = last;
            }
        }
    }

    pub fn increment(&mut self) {
        self.counter += 1;
    }
}

/// Learns a metric from the draws of the slow windows.
pub trait MetricAdaptation<Me: Metric> {
    /// Feeds one warmup draw. Returns the new metric when a slow window just closed.
    fn learn_metric(&mut self, q: &DVector<f64>) -> Option<Me>;

    /// Warmup length this adaptation is scheduled for, if it depends on one.
    fn num_warmup(&self) -> Option<usize> {
        None
    }
}

/// Shrinks `n` draws of a variance estimate towards `1e-3`.
fn regularize(n: f64, estimate: f64, identity: f64) -> f64 {
    (n / (n + 5.0)) * estimate + 1e-3 * (5.0 / (n + 5.0)) * identity
}

/// Estimates a [`DiagMetric`] from the per-coordinate variance of each slow window.
#[derive(Debug, Clone, PartialEq)]
pub struct VarAdaptation {
    window: WindowedAdaptation,
    estimator: WelfordVarEstimator,
}

impl VarAdaptation {
    pub fn new(dim: usize, window: WindowedAdaptation) -> Self {
        Self {
            window,
            estimator: WelfordVarEstimator::new(dim),
        }
    }

    pub fn from_settings(dim: usize, num_warmup: usize, settings: &AdaptSettings) -> Self {
        Self::new(
            dim,
            WindowedAdaptation::from_settings("variance", num_warmup, settings),
        )
    }

    pub fn window(&self) -> &WindowedAdaptation {
        &self.window
    }
}

impl MetricAdaptation<DiagMetric> for VarAdaptation {
    fn num_warmup(&self) -> Option<usize> {
        Some(self.window.num_warmup())
    }

    fn learn_metric(&mut self, q: &DVector<f64>) -> Option<DiagMetric> {
        if self.window.adaptation_window() {
            self.estimator.add_sample(q);
        }

        if !self.window.end_adaptation_window() {
            self.window.increment();
            return None;
        }

        self.window.compute_next_window();
        let n = self.estimator.num_samples() as f64;
        let var = self
            .estimator
            .sample_variance()
            .map(|v| regularize(n, v, 1.0));
        self.estimator.restart();
        self.window.increment();

        info!(
            "Variance window closed at iteration {}, next window ends at {}",
            self.window.counter(),
            self.window.next_window()
        );
        match DiagMetric::new(var) {
            Ok(metric) => Some(metric),
            Err(e) => {
                warn!("Discarding estimated metric: {e}");
                None
            }
        }
    }
}

/// Estimates a [`DenseMetric`] from the covariance of each slow window.
#[derive(Debug, Clone, PartialEq)]
pub struct CovarAdaptation {
    window: WindowedAdaptation,
    estimator: WelfordCovarEstimator,
}

impl CovarAdaptation {
    pub fn new(dim: usize, window: WindowedAdaptation) -> Self {
        Self {
            window,
            estimator: WelfordCovarEstimator::new(dim),
        }
    }

    pub fn from_settings(dim: usize, num_warmup: usize, settings: &AdaptSettings) -> Self {
        Self::new(
            dim,
            WindowedAdaptation::from_settings("covariance", num_warmup, settings),
        )
    }

    pub fn window(&self) -> &WindowedAdaptation {
        &self.window
    }
}

impl MetricAdaptation<DenseMetric> for CovarAdaptation {
    fn num_warmup(&self) -> Option<usize> {
        Some(self.window.num_warmup())
    }

    fn learn_metric(&mut self, q: &DVector<f64>) -> Option<DenseMetric> {
        if self.window.adaptation_window() {
            self.estimator.add_sample(q);
        }

        if !self.window.end_adaptation_window() {
            self.window.increment();
            return None;
        }

        self.window.compute_next_window();
        let n = self.estimator.num_samples() as f64;
        let dim = q.len();
        let covar = self.estimator.sample_covariance();
        // The Welford update is only symmetric up to rounding.
        let covar = DMatrix::from_fn(dim, dim, |i, j| {
            let c = 0.5 * (covar[(i, j)] + covar[(j, i)]);
            regularize(n, c, if i == j { 1.0 } else { 0.0 })
        });
        self.estimator.restart();
        self.window.increment();

        info!(
            "Covariance window closed at iteration {}, next window ends at {}",
            self.window.counter(),
            self.window.next_window()
        );
        match DenseMetric::new(covar) {
            Ok(metric) => Some(metric),
            Err(e) => {
                warn!("Discarding estimated metric: {e}");
                None
            }
        }
    }
}

/// Leaves the metric as configured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FixedMetric;

impl<Me: Metric> MetricAdaptation<Me> for FixedMetric {
    fn learn_metric(&mut self, _q: &DVector<f64>) -> Option<Me> {
        None
    }
}
