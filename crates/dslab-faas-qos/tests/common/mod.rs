#![allow(dead_code)]

use dslab_faas_qos::config::{Config, Termination};
use dslab_faas_qos::process::ProcessConfig;

pub fn assert_float_eq(x: f64, y: f64, eps: f64) {
    assert!(x > y - eps && x < y + eps, "{} != {} (eps = {})", x, y, eps);
}

/// Config with constant inter-arrival and service times, so that the trace can be computed by hand.
pub fn deterministic_config(interarrival: f64, warm: f64, cold: f64, threshold: f64, requests: u64) -> Config {
    Config {
        arrival_process: ProcessConfig::Deterministic { value: interarrival },
        warm_service_process: ProcessConfig::Deterministic { value: warm },
        cold_service_process: ProcessConfig::Deterministic { value: cold },
        expiration_threshold: threshold,
        termination: Termination::MaxRequests(requests),
        ..Default::default()
    }
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
