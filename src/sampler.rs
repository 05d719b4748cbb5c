/*!
# Base Hamiltonian Monte Carlo Sampler

[`BaseHmc`] owns everything a single chain integrates: the phase-space point, the
[`Hamiltonian`] (model and metric), the integrator and the step size. How a trajectory is
built from that state is delegated to a [`TrajectoryStrategy`], for example
[`StaticHmc`](crate::static_hmc::StaticHmc).

The sampler never moves itself between warmup and sampling. Phase changes are driven from
outside, usually by a [`WarmupController`](crate::warmup::WarmupController):

```text
Uninitialized --init_stepsize--> StepsizeSearch --> (previous phase)
Uninitialized --start_iterating--> Iterating --freeze--> Frozen
```

Random numbers are never owned by the sampler. Every operation that needs them borrows the
chain's generator for the duration of the call.

## Example

```rust
use adaptive_hmc::distributions::StandardNormal;
use adaptive_hmc::integrator::Leapfrog;
use adaptive_hmc::metric::UnitMetric;
use adaptive_hmc::sampler::BaseHmc;
use adaptive_hmc::static_hmc::StaticHmc;
use adaptive_hmc::stepsize::StepSize;
use nalgebra::DVector;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::sync::Arc;

let mut rng = SmallRng::seed_from_u64(42);
let mut sampler = BaseHmc::new(
    Arc::new(StandardNormal::new(2)),
    UnitMetric::new(2),
    Leapfrog,
    StaticHmc::default(),
)
.unwrap()
.with_stepsize(StepSize::new(1.0));

sampler.seed(&DVector::from_vec(vec![0.5, -0.5])).unwrap();
sampler.init_stepsize(&mut rng).unwrap();
sampler.start_iterating();

let sample = sampler.transition(&mut rng).unwrap();
assert_eq!(sample.position.len(), 2);
assert_eq!(
    sampler.diagnostic_names().len(),
    sampler.diagnostic_values().len()
);
```
*/

use crate::callbacks::Writer;
use crate::error::{HmcError, HmcResult};
use crate::hamiltonian::Hamiltonian;
use crate::integrator::Integrator;
use crate::metric::Metric;
use crate::model::Model;
use crate::point::PhaseSpacePoint;
use crate::stepsize::StepSize;
use log::{debug, info, warn};
use nalgebra::DVector;
use rand::Rng;
use std::io;
use std::sync::Arc;

/// Step sizes above this are taken as evidence of an improper posterior.
pub const MAX_STEPSIZE: f64 = 1e7;

/// Log of the single-step acceptance probability targeted by the step-size search.
fn search_target() -> f64 {
    0.8f64.ln()
}

/// Where a sampler is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    StepsizeSearch,
    Iterating,
    Frozen,
}

/// What a trajectory strategy reports about one transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    /// Acceptance statistic in `[0, 1]`, consumed by step-size adaptation.
    pub accept_stat: f64,
    pub n_leapfrog: usize,
    pub divergent: bool,
    /// Energy of the point the chain ends up at.
    pub energy: f64,
}

impl Default for Transition {
    fn default() -> Self {
        Self {
            accept_stat: 0.0,
            n_leapfrog: 0,
            divergent: false,
            energy: f64::NAN,
        }
    }
}

/// One draw of the chain.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub position: DVector<f64>,
    pub log_density: f64,
    pub accept_stat: f64,
}

/// The state a [`TrajectoryStrategy`] works on during one transition.
///
/// On entry `z` carries fresh momentum and a log density / gradient in sync with `z.q`.
/// The strategy must leave `z` at the chain's next state, again in sync.
pub struct TransitionContext<'a, M, Me, I> {
    pub z: &'a mut PhaseSpacePoint,
    pub hamiltonian: &'a Hamiltonian<M, Me>,
    pub integrator: &'a I,
    /// Jittered step size for this transition.
    pub epsilon: f64,
}

/// Builds a trajectory from the state prepared by [`BaseHmc::transition`].
pub trait TrajectoryStrategy {
    fn build_transition<M, Me, I, R>(
        &mut self,
        ctx: &mut TransitionContext<'_, M, Me, I>,
        rng: &mut R,
    ) -> Transition
    where
        M: Model,
        Me: Metric,
        I: Integrator,
        R: Rng + ?Sized;

    /// Called whenever the nominal step size changes.
    fn update_integration_params(&mut self, _nominal_stepsize: f64) {}

    fn diagnostic_names(&self) -> Vec<String> {
        Vec::new()
    }

    /// Aligned with [`TrajectoryStrategy::diagnostic_names`].
    fn diagnostic_values(&self) -> Vec<f64> {
        Vec::new()
    }
}

/// The strategy-independent part of an HMC sampler. See the [module docs](self).
#[derive(Debug)]
pub struct BaseHmc<M, Me, I, S> {
    z: PhaseSpacePoint,
    hamiltonian: Hamiltonian<M, Me>,
    integrator: I,
    strategy: S,
    stepsize: StepSize,
    phase: Phase,
    last_transition: Transition,
}

impl<M, Me, I, S> BaseHmc<M, Me, I, S>
where
    M: Model,
    Me: Metric,
    I: Integrator,
    S: TrajectoryStrategy,
{
    pub fn new(model: Arc<M>, metric: Me, integrator: I, mut strategy: S) -> HmcResult<Self> {
        let hamiltonian = Hamiltonian::new(model, metric)?;
        let stepsize = StepSize::default();
        strategy.update_integration_params(stepsize.nominal());
        Ok(Self {
            z: PhaseSpacePoint::new(hamiltonian.dim()),
            hamiltonian,
            integrator,
            strategy,
            stepsize,
            phase: Phase::Uninitialized,
            last_transition: Transition::default(),
        })
    }

    /// Replaces the whole step-size state, bypassing the setter checks.
    pub fn with_stepsize(mut self, stepsize: StepSize) -> Self {
        self.stepsize = stepsize;
        self.strategy.update_integration_params(stepsize.nominal());
        self
    }

    /// Moves the chain to `q` and synchronizes the cached log density and gradient.
    pub fn seed(&mut self, q: &DVector<f64>) -> HmcResult<()> {
        if q.len() != self.z.dim() {
            return Err(HmcError::DimensionMismatch {
                expected: self.z.dim(),
                found: q.len(),
            });
        }
        self.z.q.copy_from(q);
        self.init_hamiltonian()
    }

    /// Re-synchronizes the cached log density and gradient with `z.q`. Call this after
    /// assigning the position through [`BaseHmc::z_mut`].
    pub fn init_hamiltonian(&mut self) -> HmcResult<()> {
        self.hamiltonian.init(&mut self.z)
    }

    /// Searches for a step size whose single leapfrog step has an acceptance probability
    /// near 0.8, doubling or halving the nominal step size.
    ///
    /// Nominal step sizes of exactly `0` or above [`MAX_STEPSIZE`] are left alone. The
    /// point is restored to its state before the search, on success and on failure. On
    /// failure the nominal step size is unchanged.
    ///
    /// # Errors
    ///
    /// [`HmcError::ImproperPosterior`] if the step size grows beyond [`MAX_STEPSIZE`],
    /// [`HmcError::StepSizeCollapsed`] if it shrinks to `0`, and
    /// [`HmcError::Domain`] if the current position cannot be evaluated.
    pub fn init_stepsize<R: Rng + ?Sized>(&mut self, rng: &mut R) -> HmcResult<()> {
        if self.phase == Phase::Frozen {
            warn!("Sampler is frozen, skipping step size search");
            return Ok(());
        }
        let nominal = self.stepsize.nominal();
        if nominal == 0.0 || nominal > MAX_STEPSIZE {
            debug!("Skipping step size search from degenerate step size {nominal}");
            return Ok(());
        }

        let previous = self.phase;
        self.phase = Phase::StepsizeSearch;
        let snapshot = self.z.clone();
        let found = self.search_stepsize(&snapshot, nominal, rng);
        self.z.copy_from(&snapshot);
        self.phase = previous;

        let epsilon = found?;
        info!("Step size search finished: {nominal} -> {epsilon}");
        self.stepsize.set_nominal(epsilon);
        self.strategy.update_integration_params(epsilon);
        Ok(())
    }

    fn search_stepsize<R: Rng + ?Sized>(
        &mut self,
        snapshot: &PhaseSpacePoint,
        mut epsilon: f64,
        rng: &mut R,
    ) -> HmcResult<f64> {
        let target = search_target();
        let delta_h = self.trial_step(snapshot, epsilon, rng)?;
        let grow = delta_h > target;

        loop {
            let delta_h = self.trial_step(snapshot, epsilon, rng)?;
            debug!("Step size search: epsilon = {epsilon}, H0 - H = {delta_h}");

            // Written as negations so a NaN energy error stops the search.
            if grow && !(delta_h > target) {
                break;
            }
            if !grow && !(delta_h < target) {
                break;
            }

            epsilon = if grow { 2.0 * epsilon } else { 0.5 * epsilon };

            if epsilon > MAX_STEPSIZE {
                return Err(HmcError::ImproperPosterior {
                    step_size: epsilon,
                });
            }
            if epsilon == 0.0 {
                return Err(HmcError::StepSizeCollapsed);
            }
        }
        Ok(epsilon)
    }

    /// Restores `snapshot`, draws momentum and takes one step. Returns `H0 - H`.
    fn trial_step<R: Rng + ?Sized>(
        &mut self,
        snapshot: &PhaseSpacePoint,
        epsilon: f64,
        rng: &mut R,
    ) -> HmcResult<f64> {
        self.z.copy_from(snapshot);
        self.hamiltonian.sample_momentum(&mut self.z, rng);
        self.hamiltonian.init(&mut self.z)?;
        let h0 = self.hamiltonian.h(&self.z);
        self.integrator.evolve(&mut self.z, &self.hamiltonian, epsilon);
        let h = self.hamiltonian.h(&self.z);
        Ok(h0 - h)
    }

    /// Draws this iteration's jittered step size.
    pub fn sample_stepsize<R: Rng + ?Sized>(&mut self, rng: &mut R) -> f64 {
        self.stepsize.sample(rng)
    }

    /// Advances the chain by one transition.
    ///
    /// Jitters the step size, draws fresh momentum, re-initializes the point and hands it
    /// to the strategy. The outcome is kept for [`BaseHmc::last_transition`] and the
    /// diagnostics.
    pub fn transition<R: Rng + ?Sized>(&mut self, rng: &mut R) -> HmcResult<Sample> {
        let epsilon = self.sample_stepsize(rng);
        self.hamiltonian.sample_momentum(&mut self.z, rng);
        self.hamiltonian.init(&mut self.z)?;

        let mut ctx = TransitionContext {
            z: &mut self.z,
            hamiltonian: &self.hamiltonian,
            integrator: &self.integrator,
            epsilon,
        };
        let transition = self.strategy.build_transition(&mut ctx, rng);
        if transition.divergent {
            debug!("Divergent transition at step size {epsilon}");
        }
        self.last_transition = transition;

        Ok(Sample {
            position: self.z.q.clone(),
            log_density: self.z.log_density,
            accept_stat: transition.accept_stat,
        })
    }

    pub fn nominal_stepsize(&self) -> f64 {
        self.stepsize.nominal()
    }

    /// Ignored unless `e > 0`, or while frozen.
    pub fn set_nominal_stepsize(&mut self, e: f64) {
        if self.phase == Phase::Frozen {
            warn!("Sampler is frozen, ignoring new step size {e}");
            return;
        }
        self.stepsize.set_nominal(e);
        self.strategy
            .update_integration_params(self.stepsize.nominal());
    }

    pub fn current_stepsize(&self) -> f64 {
        self.stepsize.current()
    }

    pub fn stepsize_jitter(&self) -> f64 {
        self.stepsize.jitter()
    }

    /// Ignored unless `0 < j < 1`.
    pub fn set_stepsize_jitter(&mut self, j: f64) {
        self.stepsize.set_jitter(j);
    }

    pub fn metric(&self) -> &Me {
        self.hamiltonian.metric()
    }

    /// Replaces the metric between iterations. Ignored while frozen.
    pub fn set_metric(&mut self, metric: Me) -> HmcResult<()> {
        if self.phase == Phase::Frozen {
            warn!("Sampler is frozen, ignoring new metric");
            return Ok(());
        }
        self.hamiltonian.set_metric(metric)
    }

    pub fn z(&self) -> &PhaseSpacePoint {
        &self.z
    }

    pub fn z_mut(&mut self) -> &mut PhaseSpacePoint {
        &mut self.z
    }

    pub fn hamiltonian(&self) -> &Hamiltonian<M, Me> {
        &self.hamiltonian
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn strategy_mut(&mut self) -> &mut S {
        &mut self.strategy
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn start_iterating(&mut self) {
        if self.phase != Phase::Frozen {
            self.phase = Phase::Iterating;
        }
    }

    /// Enters the sampling phase. Step size and metric no longer change afterwards.
    pub fn freeze(&mut self) {
        self.phase = Phase::Frozen;
    }

    pub fn last_transition(&self) -> &Transition {
        &self.last_transition
    }

    pub fn write_sampler_stepsize(&self, writer: &mut dyn Writer) -> io::Result<()> {
        writer.message(&format!("Step size = {}", self.stepsize.nominal()))
    }

    pub fn write_sampler_metric(&self, writer: &mut dyn Writer) -> io::Result<()> {
        self.hamiltonian.metric().write_metric(writer)
    }

    pub fn write_sampler_state(&self, writer: &mut dyn Writer) -> io::Result<()> {
        self.write_sampler_stepsize(writer)?;
        self.write_sampler_metric(writer)
    }

    /// `stepsize__`, then one name per free metric entry, then the strategy's own names.
    pub fn diagnostic_names(&self) -> Vec<String> {
        let mut names = vec!["stepsize__".to_string()];
        names.extend(self.hamiltonian.metric().param_names());
        names.extend(self.strategy.diagnostic_names());
        names
    }

    /// Aligned with [`BaseHmc::diagnostic_names`].
    pub fn diagnostic_values(&self) -> Vec<f64> {
        let mut values = vec![self.stepsize.current()];
        values.extend(self.hamiltonian.metric().params());
        values.extend(self.strategy.diagnostic_values());
        values
    }
}
