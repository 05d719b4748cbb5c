/*!
# Chain Driver

A [`Chain`] bundles one [`BaseHmc`] sampler with its [`WarmupController`] and its own
random number generator. [`run_chain`] takes it through warmup and sampling. [`run_chains`]
does the same for many chains in parallel, one chain per rayon task.

Chains never share mutable state. The only thing two chains have in common is the seed
their generators are derived from.

## Example

```rust
use adaptive_hmc::core::{init_with_seed, run_chains, Chain};
use adaptive_hmc::distributions::StandardNormal;
use adaptive_hmc::settings::HmcSettings;
use std::sync::Arc;

let settings = HmcSettings::default().with_num_warmup(100).with_num_samples(50);
let model = Arc::new(StandardNormal::new(2));
let mut chains: Vec<_> = init_with_seed(2, 2, settings.seed)
    .iter()
    .enumerate()
    .map(|(id, q0)| Chain::static_diag_e(model.clone(), &settings, id as u64, q0).unwrap())
    .collect();

let draws = run_chains(&mut chains, settings.num_warmup, settings.num_samples).unwrap();
assert_eq!(draws.len(), 2);
assert_eq!(draws[0].shape(), (50, 2));
```
*/

use crate::adaptation::{CovarAdaptation, FixedMetric, MetricAdaptation, VarAdaptation};
use crate::error::{HmcError, HmcResult};
use crate::integrator::{Integrator, Leapfrog};
use crate::metric::{DenseMetric, DiagMetric, Metric, UnitMetric};
use crate::model::Model;
use crate::sampler::{BaseHmc, TrajectoryStrategy};
use crate::settings::HmcSettings;
use crate::static_hmc::StaticHmc;
use crate::stepsize::StepSize;
use crate::warmup::WarmupController;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use nalgebra as na;
use rand::rngs::SmallRng;
use rand::{thread_rng, Rng, SeedableRng};
use rayon::prelude::*;
use std::sync::Arc;

/// One chain: a sampler, the warmup that tunes it and the generator it draws from.
#[derive(Debug)]
pub struct Chain<M, Me, I, S, A> {
    pub sampler: BaseHmc<M, Me, I, S>,
    pub warmup: WarmupController<A>,
    pub chain_id: u64,
    rng: SmallRng,
}

impl<M, Me, I, S, A> Chain<M, Me, I, S, A>
where
    M: Model,
    Me: Metric,
    I: Integrator,
    S: TrajectoryStrategy,
    A: MetricAdaptation<Me>,
{
    /// The chain's generator is seeded with `seed + chain_id + 1`.
    pub fn new(
        sampler: BaseHmc<M, Me, I, S>,
        warmup: WarmupController<A>,
        seed: u64,
        chain_id: u64,
    ) -> Self {
        let rng = SmallRng::seed_from_u64(seed.wrapping_add(chain_id).wrapping_add(1));
        Self {
            sampler,
            warmup,
            chain_id,
            rng,
        }
    }

    pub fn dim(&self) -> usize {
        self.sampler.z().dim()
    }

    pub fn rng_mut(&mut self) -> &mut SmallRng {
        &mut self.rng
    }

    /// Runs warmup followed by sampling, calling `on_draw` after every iteration.
    ///
    /// With adaptation engaged, `n_warmup` must be the warmup length the metric adaptation
    /// was scheduled for.
    fn run_with<F: FnMut()>(
        &mut self,
        n_warmup: usize,
        n_samples: usize,
        mut on_draw: F,
    ) -> HmcResult<na::DMatrix<f64>> {
        if self.warmup.is_engaged() {
            if let Some(expected) = self.warmup.metric_adaptation().num_warmup() {
                if expected != n_warmup {
                    return Err(HmcError::WarmupMismatch {
                        expected,
                        found: n_warmup,
                    });
                }
            }
        }
        self.warmup.engage(&mut self.sampler, &mut self.rng)?;
        for _ in 0..n_warmup {
            self.warmup.transition(&mut self.sampler, &mut self.rng)?;
            on_draw();
        }
        self.warmup.disengage(&mut self.sampler);

        let mut out = na::DMatrix::<f64>::zeros(n_samples, self.dim());
        for i in 0..n_samples {
            let sample = self.sampler.transition(&mut self.rng)?;
            out.row_mut(i).copy_from(&sample.position.transpose());
            on_draw();
        }
        Ok(out)
    }
}

/// Builds a sampler from `settings` and seeds it at `q0`.
fn static_sampler<M: Model, Me: Metric>(
    model: Arc<M>,
    metric: Me,
    settings: &HmcSettings,
    q0: &na::DVector<f64>,
) -> HmcResult<BaseHmc<M, Me, Leapfrog, StaticHmc>> {
    let mut sampler = BaseHmc::new(
        model,
        metric,
        Leapfrog,
        StaticHmc::new(settings.integration_time),
    )?
    .with_stepsize(StepSize::new(settings.stepsize));
    sampler.set_stepsize_jitter(settings.stepsize_jitter);
    sampler.seed(q0)?;
    Ok(sampler)
}

impl<M: Model> Chain<M, UnitMetric, Leapfrog, StaticHmc, FixedMetric> {
    /// Static HMC with a unit metric. Only the step size is adapted.
    pub fn static_unit_e(
        model: Arc<M>,
        settings: &HmcSettings,
        chain_id: u64,
        q0: &na::DVector<f64>,
    ) -> HmcResult<Self> {
        let metric = UnitMetric::new(model.dim());
        let sampler = static_sampler(model, metric, settings, q0)?;
        let warmup = WarmupController::new(&settings.adapt, FixedMetric);
        Ok(Self::new(sampler, warmup, settings.seed, chain_id))
    }
}

impl<M: Model> Chain<M, DiagMetric, Leapfrog, StaticHmc, VarAdaptation> {
    /// Static HMC with a diagonal metric learned during warmup.
    pub fn static_diag_e(
        model: Arc<M>,
        settings: &HmcSettings,
        chain_id: u64,
        q0: &na::DVector<f64>,
    ) -> HmcResult<Self> {
        let dim = model.dim();
        let sampler = static_sampler(model, DiagMetric::identity(dim), settings, q0)?;
        let adaptation = VarAdaptation::from_settings(dim, settings.num_warmup, &settings.adapt);
        let warmup = WarmupController::new(&settings.adapt, adaptation);
        Ok(Self::new(sampler, warmup, settings.seed, chain_id))
    }
}

impl<M: Model> Chain<M, DenseMetric, Leapfrog, StaticHmc, CovarAdaptation> {
    /// Static HMC with a dense metric learned during warmup.
    pub fn static_dense_e(
        model: Arc<M>,
        settings: &HmcSettings,
        chain_id: u64,
        q0: &na::DVector<f64>,
    ) -> HmcResult<Self> {
        let dim = model.dim();
        let sampler = static_sampler(model, DenseMetric::identity(dim), settings, q0)?;
        let adaptation = CovarAdaptation::from_settings(dim, settings.num_warmup, &settings.adapt);
        let warmup = WarmupController::new(&settings.adapt, adaptation);
        Ok(Self::new(sampler, warmup, settings.seed, chain_id))
    }
}

/// Runs `n_warmup` warmup iterations, then collects `n_samples` draws (one per row).
pub fn run_chain<M, Me, I, S, A>(
    chain: &mut Chain<M, Me, I, S, A>,
    n_warmup: usize,
    n_samples: usize,
) -> HmcResult<na::DMatrix<f64>>
where
    M: Model,
    Me: Metric,
    I: Integrator,
    S: TrajectoryStrategy,
    A: MetricAdaptation<Me>,
{
    chain.run_with(n_warmup, n_samples, || {})
}

/// Like [`run_chain`], advancing `pb` once per iteration, warmup included.
pub fn run_chain_with_progress<M, Me, I, S, A>(
    chain: &mut Chain<M, Me, I, S, A>,
    n_warmup: usize,
    n_samples: usize,
    pb: &ProgressBar,
) -> HmcResult<na::DMatrix<f64>>
where
    M: Model,
    Me: Metric,
    I: Integrator,
    S: TrajectoryStrategy,
    A: MetricAdaptation<Me>,
{
    pb.set_length((n_warmup + n_samples) as u64);
    chain.run_with(n_warmup, n_samples, || pb.inc(1))
}

/// Runs every chain on the rayon thread pool. Fails with the first chain error.
pub fn run_chains<M, Me, I, S, A>(
    chains: &mut [Chain<M, Me, I, S, A>],
    n_warmup: usize,
    n_samples: usize,
) -> HmcResult<Vec<na::DMatrix<f64>>>
where
    M: Model + Send + Sync,
    Me: Metric + Send,
    I: Integrator + Send,
    S: TrajectoryStrategy + Send,
    A: MetricAdaptation<Me> + Send,
{
    chains
        .par_iter_mut()
        .map(|chain| run_chain(chain, n_warmup, n_samples))
        .collect()
}

/// Like [`run_chains`], with one progress bar per chain.
pub fn run_chains_with_progress<M, Me, I, S, A>(
    chains: &mut [Chain<M, Me, I, S, A>],
    n_warmup: usize,
    n_samples: usize,
) -> HmcResult<Vec<na::DMatrix<f64>>>
where
    M: Model + Send + Sync,
    Me: Metric + Send,
    I: Integrator + Send,
    S: TrajectoryStrategy + Send,
    A: MetricAdaptation<Me> + Send,
{
    let multi = MultiProgress::new();
    let pb_style = ProgressStyle::default_bar()
        .template("{prefix} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");

    chains
        .par_iter_mut()
        .map(|chain| {
            let pb = multi.add(ProgressBar::new((n_warmup + n_samples) as u64));
            pb.set_prefix(format!("Chain {}", chain.chain_id));
            pb.set_style(pb_style.clone());

            let draws = run_chain_with_progress(chain, n_warmup, n_samples, &pb);

            match &draws {
                Ok(_) => pb.finish_with_message("Done!"),
                Err(e) => pb.abandon_with_message(e.to_string()),
            }
            draws
        })
        .collect()
}

/// `n` initial positions in `d` dimensions, drawn uniformly from `(-2, 2)`.
pub fn init(n: usize, d: usize) -> Vec<na::DVector<f64>> {
    let rng = SmallRng::seed_from_u64(thread_rng().gen::<u64>());
    uniform_init(n, d, rng)
}

/// Same as [`init`], but deterministic.
pub fn init_with_seed(n: usize, d: usize, seed: u64) -> Vec<na::DVector<f64>> {
    uniform_init(n, d, SmallRng::seed_from_u64(seed))
}

fn uniform_init(n: usize, d: usize, mut rng: SmallRng) -> Vec<na::DVector<f64>> {
    (0..n)
        .map(|_| na::DVector::from_fn(d, |_, _| rng.gen_range(-2.0..2.0)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distributions::{Gaussian, IsotropicGaussian, StandardNormal};
    use crate::settings::AdaptSettings;

    fn column_mean(draws: &na::DMatrix<f64>, j: usize) -> f64 {
        draws.column(j).mean()
    }

    #[test]
    fn init_is_in_range_and_reproducible() {
        let a = init_with_seed(4, 3, 11);
        let b = init_with_seed(4, 3, 11);
        assert_eq!(a, b);
        assert_eq!(a.len(), 4);
        assert!(a
            .iter()
            .all(|q| q.len() == 3 && q.iter().all(|&x| (-2.0..2.0).contains(&x))));
        assert_eq!(init(2, 5)[1].len(), 5);
    }

    #[test]
    fn same_seed_same_draws() {
        let settings = HmcSettings::default()
            .with_num_warmup(50)
            .with_num_samples(30)
            .with_seed(3);
        let model = Arc::new(StandardNormal::new(2));
        let q0 = na::DVector::from_vec(vec![0.5, 0.5]);

        let mut a = Chain::static_diag_e(model.clone(), &settings, 0, &q0).unwrap();
        let mut b = Chain::static_diag_e(model.clone(), &settings, 0, &q0).unwrap();
        let mut c = Chain::static_diag_e(model, &settings, 1, &q0).unwrap();

        let da = run_chain(&mut a, 50, 30).unwrap();
        let db = run_chain(&mut b, 50, 30).unwrap();
        let dc = run_chain(&mut c, 50, 30).unwrap();
        assert_eq!(da, db);
        assert_ne!(da, dc);
    }

    #[test]
    fn parallel_chains_recover_the_mean() {
        let settings = HmcSettings::default()
            .with_num_warmup(300)
            .with_num_samples(500)
            .with_integration_time(1.5)
            .with_stepsize_jitter(0.1);
        let model = Arc::new(IsotropicGaussian::new(
            na::DVector::from_vec(vec![3.0, -1.0]),
            1.0,
        ));
        let mut chains: Vec<_> = init_with_seed(4, 2, 5)
            .iter()
            .enumerate()
            .map(|(id, q0)| Chain::static_diag_e(model.clone(), &settings, id as u64, q0).unwrap())
            .collect();

        let draws = run_chains(&mut chains, settings.num_warmup, settings.num_samples).unwrap();
        assert_eq!(draws.len(), 4);
        for d in draws.iter() {
            assert_eq!(d.shape(), (500, 2));
            assert!((column_mean(d, 0) - 3.0).abs() < 0.4);
            assert!((column_mean(d, 1) + 1.0).abs() < 0.4);
        }
        for chain in chains.iter() {
            assert_eq!(chain.sampler.phase(), crate::sampler::Phase::Frozen);
        }
    }

    #[test]
    fn dense_chain_samples_correlated_gaussian() {
        let cov = na::DMatrix::from_row_slice(2, 2, &[1.0, 0.9, 0.9, 1.0]);
        let model = Arc::new(Gaussian::new(na::DVector::zeros(2), cov).unwrap());
        let settings = HmcSettings::default()
            .with_num_warmup(400)
            .with_num_samples(800)
            .with_integration_time(1.5);
        let q0 = na::DVector::from_vec(vec![1.0, -1.0]);
        let mut chain = Chain::static_dense_e(model, &settings, 0, &q0).unwrap();
        let pb = ProgressBar::hidden();
        let draws = run_chain_with_progress(&mut chain, 400, 800, &pb).unwrap();

        assert_eq!(pb.position(), 1200);
        let x = draws.column(0);
        let y = draws.column(1);
        let (mx, my) = (x.mean(), y.mean());
        let cov_xy = x
            .iter()
            .zip(y.iter())
            .map(|(a, b)| (a - mx) * (b - my))
            .sum::<f64>()
            / (draws.nrows() - 1) as f64;
        assert!(cov_xy > 0.6 && cov_xy < 1.2, "{cov_xy}");
    }

    #[test]
    fn chain_errors_surface() {
        let model = Arc::new(crate::distributions::Flat { dim: 1 });
        let settings = HmcSettings::default().with_num_warmup(10);
        let mut chain =
            Chain::static_unit_e(model, &settings, 0, &na::DVector::zeros(1)).unwrap();
        assert!(matches!(
            run_chain(&mut chain, settings.num_warmup, 10),
            Err(HmcError::ImproperPosterior { .. })
        ));
    }

    #[test]
    fn warmup_length_must_match_the_window_schedule() {
        let settings = HmcSettings::default().with_num_warmup(200);
        let model = Arc::new(StandardNormal::new(2));
        let q0 = na::DVector::from_vec(vec![0.5, -0.5]);

        for n_warmup in [60, 2000] {
            let mut chain = Chain::static_diag_e(model.clone(), &settings, 0, &q0).unwrap();
            assert!(matches!(
                run_chain(&mut chain, n_warmup, 10),
                Err(HmcError::WarmupMismatch {
                    expected: 200,
                    found
                }) if found == n_warmup
            ));
            assert_eq!(chain.sampler.phase(), crate::sampler::Phase::Uninitialized);
        }

        // Fixed metrics have no schedule, and disengaged warmup never adapts.
        let mut unit = Chain::static_unit_e(model.clone(), &settings, 0, &q0).unwrap();
        assert!(run_chain(&mut unit, 60, 10).is_ok());
        let disengaged = settings.clone().with_adapt(AdaptSettings {
            engaged: false,
            ..AdaptSettings::default()
        });
        let mut diag = Chain::static_diag_e(model, &disengaged, 0, &q0).unwrap();
        assert!(run_chain(&mut diag, 60, 10).is_ok());
    }
}
