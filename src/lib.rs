//! Adaptive Hamiltonian Monte Carlo.
//!
//! The sampler core ([`sampler::BaseHmc`]) owns a phase-space point, a metric, a symplectic
//! integrator and a jittered step size. Trajectory strategies such as [`static_hmc::StaticHmc`]
//! plug into it; [`warmup::WarmupController`] tunes it, and [`core`](crate::core) runs chains in parallel.

pub mod adaptation;
pub mod callbacks;
pub mod core;
pub mod distributions;
pub mod error;
pub mod hamiltonian;
pub mod integrator;
pub mod metric;
pub mod model;
pub mod point;
pub mod sampler;
pub mod settings;
pub mod static_hmc;
pub mod stepsize;
pub mod transform;
pub mod warmup;

pub use error::{ConstraintError, DomainError, HmcError, HmcResult};
pub use model::Model;
pub use sampler::BaseHmc;
