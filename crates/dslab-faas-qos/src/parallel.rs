//! Utilities for running multiple independent simulations in parallel, e.g. parameter sweeps.

use std::sync::mpsc::channel;
use std::sync::Arc;

use itertools::izip;
use threadpool::ThreadPool;

use crate::config::{Config, RawConfig};
use crate::error::SimulationError;
use crate::simulation::ServerlessSimulator;
use crate::stats::{Stats, StatsOptions};

fn run_single(id: usize, config: Config, options: &StatsOptions) -> Result<Stats, SimulationError> {
    let mut sim = ServerlessSimulator::new(config)?;
    sim.set_name(format!("simulation_{}", id));
    sim.generate_trace(false)?;
    Ok(sim.stats_with_options(options))
}

/// Returns copies of the config that differ only in random seed.
pub fn replicate(config: &Config, seeds: &[u64]) -> Vec<Config> {
    seeds
        .iter()
        .map(|seed| Config {
            seed: *seed,
            ..config.clone()
        })
        .collect()
}

/// Runs parallel simulations in a thread pool with `n_workers` worker threads.
///
/// Each simulation owns its random source, timeline and instance pool. Results are returned in the order of
/// `configs`.
pub fn parallel_simulation_n_workers(
    mut configs: Vec<Config>,
    options: StatsOptions,
    n_workers: usize,
) -> Vec<Result<Stats, SimulationError>> {
    assert!(n_workers > 0, "There should be at least one worker.");
    let options = Arc::new(options);
    let pool = ThreadPool::new(n_workers);
    let (tx, rx) = channel();
    let len = configs.len();
    for (id, config) in izip!(0..len, configs.drain(..)) {
        let tx = tx.clone();
        let options = options.clone();
        pool.execute(move || {
            let result = run_single(id, config, options.as_ref());
            // the receiver outlives all workers, so sending can not fail
            tx.send((id, result)).ok();
        });
    }
    let mut results: Vec<_> = rx.iter().take(len).collect();
    results.sort_by_key(|x| x.0);
    results.drain(..).map(|x| x.1).collect()
}

/// Runs parallel simulations in a thread pool with a separate worker for each config.
pub fn parallel_simulation(configs: Vec<Config>, options: StatsOptions) -> Vec<Result<Stats, SimulationError>> {
    let n_workers = configs.len().max(1);
    parallel_simulation_n_workers(configs, options, n_workers)
}

/// Similar to [`parallel_simulation_n_workers`], but for raw configs. Invalid configs produce errors in the
/// corresponding result slots.
pub fn parallel_simulation_raw_n_workers(
    configs: Vec<RawConfig>,
    options: StatsOptions,
    n_workers: usize,
) -> Vec<Result<Stats, SimulationError>> {
    let mut results: Vec<Option<Result<Stats, SimulationError>>> = Vec::with_capacity(configs.len());
    let mut valid = Vec::new();
    for raw in configs {
        match Config::from_raw(raw) {
            Ok(config) => {
                valid.push(config);
                results.push(None);
            }
            Err(e) => results.push(Some(Err(e.into()))),
        }
    }
    let mut valid_results = parallel_simulation_n_workers(valid, options, n_workers.max(1)).into_iter();
    results
        .into_iter()
        .map(|x| match x {
            Some(err) => err,
            None => valid_results
                .next()
                .unwrap_or_else(|| unreachable!("one result is produced for each valid config")),
        })
        .collect()
}
