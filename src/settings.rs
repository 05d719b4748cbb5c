//! Sampler configuration.
//!
//! Both structs deserialize with every field optional, falling back to the defaults below.
//!
//! ```rust
//! use adaptive_hmc::settings::HmcSettings;
//!
//! let settings = HmcSettings::default()
//!     .with_stepsize(0.5)
//!     .with_num_warmup(200)
//!     .with_seed(7);
//! assert_eq!(settings.num_samples, 1000);
//! assert!(settings.adapt.engaged);
//! ```

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Warmup adaptation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptSettings {
    /// Whether step size and metric are tuned during warmup at all.
    pub engaged: bool,
    /// Target acceptance statistic.
    pub delta: f64,
    pub gamma: f64,
    pub kappa: f64,
    pub t0: f64,
    /// Initial fast buffer, in iterations.
    pub init_buffer: usize,
    /// Terminal fast buffer, in iterations.
    pub term_buffer: usize,
    /// First slow window, in iterations.
    pub window: usize,
}

impl Default for AdaptSettings {
    fn default() -> Self {
        Self {
            engaged: true,
            delta: 0.8,
            gamma: 0.05,
            kappa: 0.75,
            t0: 10.0,
            init_buffer: 75,
            term_buffer: 50,
            window: 25,
        }
    }
}

/// Settings for a static HMC run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HmcSettings {
    /// Initial nominal step size.
    pub stepsize: f64,
    pub stepsize_jitter: f64,
    pub integration_time: f64,
    pub num_warmup: usize,
    pub num_samples: usize,
    pub seed: u64,
    pub adapt: AdaptSettings,
}

impl Default for HmcSettings {
    fn default() -> Self {
        Self {
            stepsize: 1.0,
            stepsize_jitter: 0.0,
            integration_time: 2.0 * PI,
            num_warmup: 1000,
            num_samples: 1000,
            seed: 42,
            adapt: AdaptSettings::default(),
        }
    }
}

impl HmcSettings {
    pub fn with_stepsize(mut self, stepsize: f64) -> Self {
        self.stepsize = stepsize;
        self
    }

    pub fn with_stepsize_jitter(mut self, jitter: f64) -> Self {
        self.stepsize_jitter = jitter;
        self
    }

    pub fn with_integration_time(mut self, integration_time: f64) -> Self {
        self.integration_time = integration_time;
        self
    }

    pub fn with_num_warmup(mut self, num_warmup: usize) -> Self {
        self.num_warmup = num_warmup;
        self
    }

    pub fn with_num_samples(mut self, num_samples: usize) -> Self {
        self.num_samples = num_samples;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_adapt(mut self, adapt: AdaptSettings) -> Self {
        self.adapt = adapt;
        self
    }
}
