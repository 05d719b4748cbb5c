//! Nominal and jittered integrator step sizes.

use rand::Rng;

/// The step-size state of a sampler.
///
/// `nominal` is the tuned value targeted by search and adaptation. `current` is the value
/// actually used for integration and is re-derived from `nominal` on every
/// [`StepSize::sample`].
///
/// ```rust
/// use adaptive_hmc::stepsize::StepSize;
///
/// let mut stepsize = StepSize::new(0.5);
/// stepsize.set_jitter(1.5); // out of range, ignored
/// assert_eq!(stepsize.jitter(), 0.0);
/// stepsize.set_nominal(-1.0); // ignored
/// assert_eq!(stepsize.nominal(), 0.5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepSize {
    nominal: f64,
    current: f64,
    jitter: f64,
}

impl Default for StepSize {
    fn default() -> Self {
        Self {
            nominal: 0.1,
            current: 0.1,
            jitter: 0.0,
        }
    }
}

impl StepSize {
    /// Takes `nominal` as is, without validation.
    pub fn new(nominal: f64) -> Self {
        Self {
            nominal,
            current: nominal,
            jitter: 0.0,
        }
    }

    pub fn nominal(&self) -> f64 {
        self.nominal
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    /// Keeps the previous value unless `e > 0`.
    pub fn set_nominal(&mut self, e: f64) {
        if e > 0.0 {
            self.nominal = e;
        }
    }

    /// Keeps the previous value unless `0 < j < 1`.
    pub fn set_jitter(&mut self, j: f64) {
        if j > 0.0 && j < 1.0 {
            self.jitter = j;
        }
    }

    /// Draws this iteration's step size, `nominal * (1 + jitter * (2u - 1))`.
    pub fn sample<R: Rng + ?Sized>(&mut self, rng: &mut R) -> f64 {
        self.current = self.nominal;
        if self.jitter != 0.0 {
            let u: f64 = rng.gen();
            self.current *= 1.0 + self.jitter * (2.0 * u - 1.0);
        }
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn defaults() {
        let s = StepSize::default();
        assert_eq!((s.nominal(), s.current(), s.jitter()), (0.1, 0.1, 0.0));
    }

    #[test]
    fn no_jitter_means_nominal() {
        let mut rng = SmallRng::seed_from_u64(0);
        let mut s = StepSize::new(0.25);
        for _ in 0..10 {
            assert_eq!(s.sample(&mut rng), 0.25);
        }
    }

    #[test]
    fn nominal_setter_rejects_non_positive() {
        let mut s = StepSize::new(0.3);
        s.set_nominal(0.0);
        s.set_nominal(-2.0);
        s.set_nominal(f64::NAN);
        assert_eq!(s.nominal(), 0.3);
        s.set_nominal(0.7);
        assert_eq!(s.nominal(), 0.7);
    }

    proptest! {
        #[test]
        fn jittered_stepsize_stays_in_band(
            nominal in 1e-3..10.0f64,
            jitter in 0.01..0.99f64,
            seed in any::<u64>(),
        ) {
            let mut rng = SmallRng::seed_from_u64(seed);
            let mut s = StepSize::new(nominal);
            s.set_jitter(jitter);
            prop_assert_eq!(s.jitter(), jitter);
            for _ in 0..50 {
                let e = s.sample(&mut rng);
                prop_assert!(e >= nominal * (1.0 - jitter));
                prop_assert!(e <= nominal * (1.0 + jitter));
                prop_assert_eq!(e, s.current());
            }
        }

        #[test]
        fn out_of_range_jitter_is_ignored(jitter in 0.01..0.99f64) {
            let mut s = StepSize::new(1.0);
            s.set_jitter(jitter);
            s.set_jitter(1.5);
            prop_assert_eq!(s.jitter(), jitter);
            s.set_jitter(-0.2);
            prop_assert_eq!(s.jitter(), jitter);
            s.set_jitter(1.0);
            s.set_jitter(0.0);
            prop_assert_eq!(s.jitter(), jitter);
        }
    }
}
