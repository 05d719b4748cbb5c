//! Drives a [`BaseHmc`] through warmup: step-size search, adaptation, then freezing.

use crate::adaptation::{MetricAdaptation, StepsizeAdaptation};
use crate::error::HmcResult;
use crate::integrator::Integrator;
use crate::metric::Metric;
use crate::model::Model;
use crate::sampler::{BaseHmc, Sample, TrajectoryStrategy};
use crate::settings::AdaptSettings;
use log::info;
use rand::Rng;

/// Tunes the step size by dual averaging and the metric with `A` while warmup lasts.
///
/// ```rust
/// use adaptive_hmc::adaptation::VarAdaptation;
/// use adaptive_hmc::distributions::IsotropicGaussian;
/// use adaptive_hmc::integrator::Leapfrog;
/// use adaptive_hmc::metric::DiagMetric;
/// use adaptive_hmc::sampler::{BaseHmc, Phase};
/// use adaptive_hmc::settings::AdaptSettings;
/// use adaptive_hmc::static_hmc::StaticHmc;
/// use adaptive_hmc::warmup::WarmupController;
/// use nalgebra::DVector;
/// use rand::rngs::SmallRng;
/// use rand::SeedableRng;
/// use std::sync::Arc;
///
/// let target = IsotropicGaussian::new(DVector::zeros(2), 2.0);
/// let mut sampler = BaseHmc::new(Arc::new(target), DiagMetric::identity(2), Leapfrog, StaticHmc::default()).unwrap();
/// sampler.seed(&DVector::from_vec(vec![1.0, -1.0])).unwrap();
///
/// let settings = AdaptSettings::default();
/// let mut warmup = WarmupController::new(&settings, VarAdaptation::from_settings(2, 100, &settings));
/// let mut rng = SmallRng::seed_from_u64(1);
///
/// warmup.engage(&mut sampler, &mut rng).unwrap();
/// for _ in 0..100 {
///     warmup.transition(&mut sampler, &mut rng).unwrap();
/// }
/// warmup.disengage(&mut sampler);
/// assert_eq!(sampler.phase(), Phase::Frozen);
/// ```
#[derive(Debug, Clone)]
pub struct WarmupController<A> {
    stepsize_adaptation: StepsizeAdaptation,
    metric_adaptation: A,
    engaged: bool,
    adapting: bool,
}

impl<A> WarmupController<A> {
    pub fn new(settings: &AdaptSettings, metric_adaptation: A) -> Self {
        Self {
            stepsize_adaptation: StepsizeAdaptation::from_settings(settings),
            metric_adaptation,
            engaged: settings.engaged,
            adapting: false,
        }
    }

    pub fn stepsize_adaptation(&self) -> &StepsizeAdaptation {
        &self.stepsize_adaptation
    }

    pub fn metric_adaptation(&self) -> &A {
        &self.metric_adaptation
    }

    /// Whether [`WarmupController::engage`] starts adaptation.
    pub fn is_engaged(&self) -> bool {
        self.engaged
    }

    /// Whether warmup transitions currently tune the sampler.
    pub fn is_adapting(&self) -> bool {
        self.adapting
    }

    /// Starts warmup.
    ///
    /// With adaptation engaged: centers dual averaging on ten times the configured step
    /// size and runs the step-size search. The sampler then starts iterating either way.
    pub fn engage<M, Me, I, S, R>(
        &mut self,
        sampler: &mut BaseHmc<M, Me, I, S>,
        rng: &mut R,
    ) -> HmcResult<()>
    where
        M: Model,
        Me: Metric,
        I: Integrator,
        S: TrajectoryStrategy,
        R: Rng + ?Sized,
    {
        if self.engaged {
            self.stepsize_adaptation
                .set_mu((10.0 * sampler.nominal_stepsize()).ln());
            self.stepsize_adaptation.restart();
            sampler.init_stepsize(rng)?;
            self.adapting = true;
        }
        sampler.start_iterating();
        Ok(())
    }

    /// One warmup transition followed by step-size and metric learning.
    ///
    /// A new metric triggers a fresh step-size search and restarts dual averaging around the
    /// step size it finds.
    pub fn transition<M, Me, I, S, R>(
        &mut self,
        sampler: &mut BaseHmc<M, Me, I, S>,
        rng: &mut R,
    ) -> HmcResult<Sample>
    where
        M: Model,
        Me: Metric,
        I: Integrator,
        S: TrajectoryStrategy,
        A: MetricAdaptation<Me>,
        R: Rng + ?Sized,
    {
        let sample = sampler.transition(rng)?;
        if !self.adapting {
            return Ok(sample);
        }

        let epsilon = self.stepsize_adaptation.learn_stepsize(sample.accept_stat);
        sampler.set_nominal_stepsize(epsilon);

        if let Some(metric) = self.metric_adaptation.learn_metric(&sample.position) {
            sampler.set_metric(metric)?;
            sampler.init_stepsize(rng)?;
            self.stepsize_adaptation
                .set_mu((10.0 * sampler.nominal_stepsize()).ln());
            self.stepsize_adaptation.restart();
        }
        Ok(sample)
    }

    /// Ends warmup: applies the averaged step size and freezes the sampler.
    pub fn disengage<M, Me, I, S>(&mut self, sampler: &mut BaseHmc<M, Me, I, S>)
    where
        M: Model,
        Me: Metric,
        I: Integrator,
        S: TrajectoryStrategy,
    {
        if self.adapting {
            if let Some(epsilon) = self.stepsize_adaptation.complete_adaptation() {
                sampler.set_nominal_stepsize(epsilon);
            }
            info!(
                "Adaptation terminated, step size = {}",
                sampler.nominal_stepsize()
            );
        }
        self.adapting = false;
        sampler.freeze();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adaptation::{FixedMetric, VarAdaptation};
    use crate::distributions::IsotropicGaussian;
    use crate::integrator::Leapfrog;
    use crate::metric::{DiagMetric, UnitMetric};
    use crate::sampler::Phase;
    use crate::static_hmc::StaticHmc;
    use crate::stepsize::StepSize;
    use nalgebra::DVector;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use std::sync::Arc;

    #[test]
    fn disengaged_warmup_only_iterates() {
        let settings = AdaptSettings {
            engaged: false,
            ..AdaptSettings::default()
        };
        let mut sampler = BaseHmc::new(
            Arc::new(IsotropicGaussian::new(DVector::zeros(1), 1.0)),
            UnitMetric::new(1),
            Leapfrog,
            StaticHmc::default(),
        )
        .unwrap()
        .with_stepsize(StepSize::new(0.3));
        sampler.seed(&DVector::zeros(1)).unwrap();

        let mut warmup = WarmupController::new(&settings, FixedMetric);
        let mut rng = SmallRng::seed_from_u64(2);
        warmup.engage(&mut sampler, &mut rng).unwrap();
        assert_eq!(sampler.phase(), Phase::Iterating);
        assert!(!warmup.is_adapting());
        for _ in 0..20 {
            warmup.transition(&mut sampler, &mut rng).unwrap();
        }
        warmup.disengage(&mut sampler);
        assert_eq!(sampler.nominal_stepsize(), 0.3);
        assert_eq!(sampler.phase(), Phase::Frozen);
    }

    #[test]
    fn adapts_metric_to_target_scale() {
        let settings = AdaptSettings::default();
        let num_warmup = 600;
        let mut sampler = BaseHmc::new(
            Arc::new(IsotropicGaussian::new(DVector::zeros(2), 3.0)),
            DiagMetric::identity(2),
            Leapfrog,
            StaticHmc::new(2.0),
        )
        .unwrap()
        .with_stepsize(StepSize::new(1.0));
        sampler.seed(&DVector::from_vec(vec![1.0, 1.0])).unwrap();

        let mut warmup =
            WarmupController::new(&settings, VarAdaptation::from_settings(2, num_warmup, &settings));
        let mut rng = SmallRng::seed_from_u64(17);
        warmup.engage(&mut sampler, &mut rng).unwrap();
        assert!(warmup.is_adapting());
        for _ in 0..num_warmup {
            warmup.transition(&mut sampler, &mut rng).unwrap();
        }
        warmup.disengage(&mut sampler);

        // Variance 9 in both coordinates.
        let inv = sampler.metric().inv_diag();
        assert!(inv.iter().all(|&v| v > 3.0 && v < 27.0), "{inv}");
        let e = sampler.nominal_stepsize();
        assert!(e > 0.05 && e < 20.0, "{e}");
        assert_eq!(sampler.phase(), Phase::Frozen);

        // Frozen samplers keep their step size.
        let frozen = sampler.nominal_stepsize();
        sampler.set_nominal_stepsize(frozen * 2.0);
        assert_eq!(sampler.nominal_stepsize(), frozen);
    }
}
