//! Samples a correlated 2D Gaussian with four dense-metric chains and prints a summary.

use adaptive_hmc::callbacks::StreamWriter;
use adaptive_hmc::core::{init_with_seed, run_chains_with_progress, Chain};
use adaptive_hmc::distributions::Gaussian;
use adaptive_hmc::settings::HmcSettings;
use nalgebra::{DMatrix, DVector};
use std::error::Error;
use std::sync::Arc;

fn main() -> Result<(), Box<dyn Error>> {
    const N_CHAINS: usize = 4;

    let target = Gaussian::new(
        DVector::from_vec(vec![1.0, -2.0]),
        DMatrix::from_row_slice(2, 2, &[2.0, 1.2, 1.2, 1.0]),
    )?;
    let model = Arc::new(target);
    let settings = HmcSettings::default()
        .with_integration_time(1.5)
        .with_stepsize_jitter(0.1)
        .with_num_warmup(1000)
        .with_num_samples(2000);

    let mut chains = init_with_seed(N_CHAINS, 2, settings.seed)
        .iter()
        .enumerate()
        .map(|(id, q0)| Chain::static_dense_e(model.clone(), &settings, id as u64, q0))
        .collect::<Result<Vec<_>, _>>()?;

    let draws = run_chains_with_progress(&mut chains, settings.num_warmup, settings.num_samples)?;

    let n: usize = draws.iter().map(|d| d.nrows()).sum();
    let mut all = DMatrix::zeros(n, 2);
    let mut row = 0;
    for chain in &draws {
        all.rows_mut(row, chain.nrows()).copy_from(chain);
        row += chain.nrows();
    }
    println!("Generated {} draws from {} chains", n, N_CHAINS);

    let mean = all.row_mean();
    let centered = DMatrix::from_fn(n, 2, |i, j| all[(i, j)] - mean[j]);
    let cov = centered.transpose() * &centered / (n as f64 - 1.0);
    println!("Mean: ({:.3}, {:.3})", mean[0], mean[1]);
    println!(
        "Covariance: [[{:.3}, {:.3}], [{:.3}, {:.3}]]",
        cov[(0, 0)],
        cov[(0, 1)],
        cov[(1, 0)],
        cov[(1, 1)]
    );

    let mut out = StreamWriter::new(std::io::stdout(), "# ");
    for chain in &chains {
        chain.sampler.write_sampler_state(&mut out)?;
    }
    Ok(())
}
