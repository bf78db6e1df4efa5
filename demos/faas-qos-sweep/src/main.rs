use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::Instant;

use clap::Parser;
use env_logger::Builder;
use log::error;
use serde::Serialize;

use dslab_faas_qos::config::{Config, Termination};
use dslab_faas_qos::parallel::{parallel_simulation_n_workers, replicate};
use dslab_faas_qos::stats::{Stats, StatsOptions};

#[derive(Parser, Debug)]
#[command(about, long_about = None)]
/// Sweeps expiration thresholds of a scale-per-request serverless platform and reports QoS metrics
struct Args {
    /// Path to YAML config, defaults are used if omitted
    #[arg(short, long)]
    config: Option<String>,

    /// Comma-separated expiration thresholds
    #[arg(short, long, value_delimiter = ',', default_values_t = vec![10., 60., 300., 600., 1200.])]
    thresholds: Vec<f64>,

    /// Number of independent replications per threshold
    #[arg(short, long, default_value_t = 1)]
    replications: u64,

    /// Number of worker threads
    #[arg(short, long, default_value_t = 4)]
    workers: usize,

    /// Warm-up period excluded from metrics
    #[arg(long, default_value_t = 0.)]
    skip_init_time: f64,

    /// Save results to YAML file
    #[arg(short, long)]
    output: Option<String>,
}

#[derive(Serialize)]
struct SweepResult {
    expiration_threshold: f64,
    seed: u64,
    stats: Stats,
}

fn main() {
    Builder::from_default_env()
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();

    let args = Args::parse();
    let base = match &args.config {
        Some(path) => match Config::from_yaml(Path::new(path)) {
            Ok(config) => config,
            Err(e) => {
                error!("{}", e);
                std::process::exit(1);
            }
        },
        None => Config {
            termination: Termination::MaxRequests(100000),
            ..Config::exponential(0.9, 1. / 1.991, 1. / 2.244)
        },
    };

    let seeds: Vec<u64> = (0..args.replications).map(|i| base.seed + i).collect();
    let mut configs = Vec::new();
    for threshold in args.thresholds.iter() {
        let config = Config {
            expiration_threshold: *threshold,
            ..base.clone()
        };
        configs.extend(replicate(&config, &seeds));
    }
    let keys: Vec<_> = configs.iter().map(|c| (c.expiration_threshold, c.seed)).collect();
    let options = StatsOptions {
        skip_init_time: args.skip_init_time,
        ..Default::default()
    };

    let t = Instant::now();
    let results = parallel_simulation_n_workers(configs, options, args.workers.max(1));
    println!("Finished {} simulations in {:.2?}", results.len(), t.elapsed());

    println!(
        "{:>12} {:>6} {:>10} {:>12} {:>12} {:>12} {:>12}",
        "threshold", "seed", "requests", "p_cold", "p_reject", "servers", "lifespan"
    );
    let mut rows = Vec::new();
    for ((threshold, seed), result) in keys.into_iter().zip(results) {
        match result {
            Ok(stats) => {
                println!(
                    "{:>12.1} {:>6} {:>10} {:>12.6} {:>12.6} {:>12.4} {:>12.2}",
                    threshold,
                    seed,
                    stats.requests,
                    stats.cold_start_probability,
                    stats.rejection_probability,
                    stats.average_server_count,
                    stats.average_instance_lifespan
                );
                rows.push(SweepResult {
                    expiration_threshold: threshold,
                    seed,
                    stats,
                });
            }
            Err(e) => error!("threshold {} seed {}: {}", threshold, seed, e),
        }
    }

    if let Some(path) = args.output {
        match File::create(&path) {
            Ok(f) => {
                if let Err(e) = serde_yaml::to_writer(f, &rows) {
                    error!("failed to save results to {}: {}", path, e);
                }
            }
            Err(e) => error!("failed to create {}: {}", path, e),
        }
    }
}
